// tests/scheduler.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use news_relay::scheduler::run_scheduler;
use tokio::sync::watch;

#[tokio::test(start_paused = true)]
async fn runs_on_each_tick_until_shutdown() {
    let h = Harness::new();
    let feed = StaticFeed::new(items(2));
    let sink = Arc::new(RecordingDelivery::default());
    let p = h.pipeline(
        feed.clone(),
        Arc::new(EchoTranslator::default()),
        sink.clone(),
        settings(5),
    );
    let (tx, rx) = watch::channel(false);

    // Ticks at 0s, 60s, 120s; shutdown lands at 150s.
    let stopper = async {
        tokio::time::sleep(Duration::from_secs(150)).await;
        tx.send(true).unwrap();
    };
    let (runs, _) = tokio::join!(run_scheduler(&p, Duration::from_secs(60), rx), stopper);

    assert_eq!(runs, 3);
    assert_eq!(feed.fetch_count(), 3);
    // Only the first run had anything new.
    assert_eq!(sink.messages().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_runs_send_notice_and_keep_going() {
    let h = Harness::new();
    let feed = StaticFeed::new(Vec::new());
    let sink = Arc::new(RecordingDelivery::default());
    let p = h.pipeline(
        feed.clone(),
        Arc::new(EchoTranslator::default()),
        sink.clone(),
        settings(5),
    );
    let (tx, rx) = watch::channel(false);

    let stopper = async {
        tokio::time::sleep(Duration::from_secs(90)).await;
        tx.send(true).unwrap();
    };
    let (runs, _) = tokio::join!(run_scheduler(&p, Duration::from_secs(60), rx), stopper);

    assert_eq!(runs, 2);
    let sent = sink.messages();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.starts_with("🚨 News relay error:")));
}

#[tokio::test(start_paused = true)]
async fn dropped_sender_stops_scheduler() {
    let h = Harness::new();
    let feed = StaticFeed::new(items(1));
    let p = h.pipeline(
        feed.clone(),
        Arc::new(EchoTranslator::default()),
        Arc::new(RecordingDelivery::default()),
        settings(5),
    );
    let (tx, rx) = watch::channel(false);
    drop(tx);

    let runs = run_scheduler(&p, Duration::from_secs(60), rx).await;
    assert_eq!(runs, 0);
}
