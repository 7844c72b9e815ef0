//! HTTP collector end-to-end: wire decoding, fire-and-forget responses,
//! worker folding and post-run time attribution.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use piglet::profiling::{Collector, DataflowProfiler};

async fn get(url: &str) -> (reqwest::StatusCode, String) {
    let resp = reqwest::get(url).await.expect("collector reachable");
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    (status, body)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_times_message_updates_cost_after_collect() {
    let profiler = Arc::new(Mutex::new(DataflowProfiler::new()));
    let collector = Collector::start(profiler.clone(), 0).await.unwrap();
    let base = collector.base_url();

    // the runtime reports its own start marker, then operator L
    let (status, body) = get(&format!("{base}/times?data=start;-1;;900")).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = get(&format!("{base}/times?data=L;0;start,-1%23;1000")).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    collector.stop(Duration::from_millis(200)).await;

    let mut guard = profiler.lock().unwrap();
    let errors = guard.collect();
    assert!(errors.is_empty(), "all parent times present");
    let node = guard.markov.node("L").expect("L recorded");
    assert_eq!(node.cost.sum, 100, "1000 - timeOf(start, -1)");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sizes_message_updates_markov_directly() {
    let profiler = Arc::new(Mutex::new(DataflowProfiler::new()));
    let collector = Collector::start(profiler.clone(), 0).await.unwrap();
    let base = collector.base_url();

    let (status, body) = get(&format!("{base}/sizes?data=abc:2048;def:4096;")).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, "ok");

    collector.stop(Duration::from_millis(200)).await;

    let guard = profiler.lock().unwrap();
    assert_eq!(guard.markov.node("abc").unwrap().size.sum, 2048);
    assert_eq!(guard.markov.node("def").unwrap().size.sum, 4096);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_payload_still_answers_ok() {
    let profiler = Arc::new(Mutex::new(DataflowProfiler::new()));
    let collector = Collector::start(profiler.clone(), 0).await.unwrap();
    let base = collector.base_url();

    let (status, body) = get(&format!("{base}/times?data=not-a-message")).await;
    assert_eq!(status, reqwest::StatusCode::OK, "client sees transient-free accept");
    assert_eq!(body, "ok");

    collector.stop(Duration::from_millis(100)).await;
    let guard = profiler.lock().unwrap();
    assert!(guard.markov.node("not-a-message").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_duplicate_partition_times_first_write_wins() {
    let profiler = Arc::new(Mutex::new(DataflowProfiler::new()));
    let collector = Collector::start(profiler.clone(), 0).await.unwrap();
    let base = collector.base_url();

    get(&format!("{base}/times?data=L;0;;500")).await;
    get(&format!("{base}/times?data=L;0;;999")).await;
    get(&format!("{base}/times?data=L;1;;700")).await;

    collector.stop(Duration::from_millis(200)).await;

    let mut guard = profiler.lock().unwrap();
    guard.collect();
    let node = guard.markov.node("L").unwrap();
    // partitions 0 (500) and 1 (700); the duplicate 999 was discarded
    assert_eq!(node.cost.count, 2);
    assert_eq!(node.cost.sum, 1200);
}
