//! Integration tests for the callback contract of the Network Manager.
//!
//! These tests drive complete operations through `MemoryTransport` and check
//! what a caller observes:
//! - completion fires exactly once, with code 0 on success and nonzero on failure
//! - progress fractions stay in [0.0, 1.0] and never decrease
//! - the payload arrives before a successful completion
//! - nothing arrives after completion
//!
//! Run with: `cargo test --test callback_contract`

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;

use netmanager::{
    CannedResponse, ErrorCode, Failure, Handlers, ManagerConfig, MemoryTransport, NetworkManager,
    OperationStatus, Request, Response,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Everything a caller can observe for one operation, in order.
#[derive(Debug, Clone, PartialEq)]
enum Event {
    Progress(f64),
    Data(usize),
    Complete { has_value: bool, code: u32 },
}

type EventLog = Arc<Mutex<Vec<Event>>>;

/// Build handlers that append every notification to a shared log.
fn recording_handlers() -> (EventLog, Handlers<Response>) {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let (progress_log, data_log, done_log) = (log.clone(), log.clone(), log.clone());

    let handlers = Handlers::new()
        .on_progress(move |f| progress_log.lock().unwrap().push(Event::Progress(f)))
        .on_data(move |bytes: Bytes| data_log.lock().unwrap().push(Event::Data(bytes.len())))
        .on_complete_with_code(move |value, code| {
            done_log.lock().unwrap().push(Event::Complete {
                has_value: value.is_some(),
                code,
            })
        });

    (log, handlers)
}

fn completions(events: &[Event]) -> Vec<&Event> {
    events
        .iter()
        .filter(|e| matches!(e, Event::Complete { .. }))
        .collect()
}

fn progress_values(events: &[Event]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress(f) => Some(*f),
            _ => None,
        })
        .collect()
}

/// A transport with one route of each interesting kind.
fn transport() -> MemoryTransport {
    MemoryTransport::new()
        .with_route(
            "http://test/large.bin",
            CannedResponse::ok(vec![42u8; 64 * 1024]).with_chunk_size(1000),
        )
        .with_route(
            "http://test/unsized",
            CannedResponse::ok(vec![1u8; 5000])
                .with_chunk_size(700)
                .without_length(),
        )
        .with_route(
            "http://test/slow",
            CannedResponse::ok(vec![0u8; 4000])
                .with_chunk_size(100)
                .with_chunk_delay(Duration::from_millis(5)),
        )
        .with_route(
            "http://test/broken",
            CannedResponse::ok(vec![0u8; 4000])
                .with_chunk_size(500)
                .with_failure(Failure::BreakAfter(2000)),
        )
        .with_route("http://test/down", CannedResponse::unreachable())
        .with_route(
            "http://test/error",
            CannedResponse::with_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom"),
        )
}

fn manager() -> NetworkManager {
    NetworkManager::with_transport(ManagerConfig::default(), Arc::new(transport())).unwrap()
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A successful operation completes exactly once with code 0 and a value.
#[tokio::test]
async fn test_success_completes_once_with_code_zero() {
    let manager = manager();
    let (log, handlers) = recording_handlers();

    let handle = manager.fetch(Request::get("http://test/large.bin").unwrap(), handlers);

    assert_eq!(handle.wait().await, OperationStatus::Succeeded);
    let events = log.lock().unwrap().clone();
    assert_eq!(
        completions(&events),
        vec![&Event::Complete {
            has_value: true,
            code: 0
        }]
    );
}

/// Failed operations complete exactly once with a nonzero code and no value.
#[tokio::test]
async fn test_failures_complete_once_with_nonzero_code() {
    let manager = manager();
    let cases = [
        ("http://test/down", ErrorCode::UNREACHABLE),
        ("http://test/error", ErrorCode::STATUS),
        ("http://test/broken", ErrorCode::TRANSFER),
        ("http://test/missing", ErrorCode::STATUS),
    ];

    for (url, expected) in cases {
        let (log, handlers) = recording_handlers();
        let handle = manager.fetch(Request::get(url).unwrap(), handlers);

        assert_eq!(handle.wait().await, OperationStatus::Failed(expected), "{}", url);
        let events = log.lock().unwrap().clone();
        assert_eq!(
            completions(&events),
            vec![&Event::Complete {
                has_value: false,
                code: expected.value()
            }],
            "{}",
            url
        );
        assert!(!events.iter().any(|e| matches!(e, Event::Data(_))), "{}", url);
    }
}

/// Progress fractions are bounded, non-decreasing, and end at 1.0 on success.
#[tokio::test]
async fn test_progress_is_bounded_and_monotonic() {
    let manager = manager();

    for url in ["http://test/large.bin", "http://test/unsized", "http://test/slow"] {
        let (log, handlers) = recording_handlers();
        let handle = manager.fetch(Request::get(url).unwrap(), handlers);
        handle.wait().await;

        let events = log.lock().unwrap().clone();
        let progress = progress_values(&events);

        assert!(!progress.is_empty(), "{}", url);
        assert!(progress.iter().all(|f| (0.0..=1.0).contains(f)), "{}", url);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{}", url);
        assert_eq!(progress.last().copied(), Some(1.0), "{}", url);
        assert_eq!(handle.progress(), 1.0, "{}", url);
    }
}

/// The number of progress notifications is bounded by the configured step.
#[tokio::test]
async fn test_progress_cardinality_is_bounded() {
    let config = ManagerConfig::default().with_progress_step(0.1);
    let manager = NetworkManager::with_transport(config, Arc::new(transport())).unwrap();
    let (log, handlers) = recording_handlers();

    // 64 KiB in 1000-byte chunks would give 66 chunk events.
    let handle = manager.fetch(Request::get("http://test/large.bin").unwrap(), handlers);
    handle.wait().await;

    let progress = progress_values(&log.lock().unwrap());
    assert!(progress.len() <= 11, "got {} reports", progress.len());
}

/// Unknown length reports only the final fraction.
#[tokio::test]
async fn test_unknown_length_reports_only_completion_fraction() {
    let manager = manager();
    let (log, handlers) = recording_handlers();

    let handle = manager.fetch(Request::get("http://test/unsized").unwrap(), handlers);
    handle.wait().await;

    assert_eq!(progress_values(&log.lock().unwrap()), vec![1.0]);
}

/// On success the order is progress*, then data, then completion.
#[tokio::test]
async fn test_data_arrives_before_completion() {
    let manager = manager();
    let (log, handlers) = recording_handlers();

    let handle = manager.fetch(Request::get("http://test/large.bin").unwrap(), handlers);
    handle.wait().await;

    let events = log.lock().unwrap().clone();
    let n = events.len();
    assert!(n >= 3);
    assert_eq!(events[n - 2], Event::Data(64 * 1024));
    assert!(matches!(events[n - 1], Event::Complete { code: 0, .. }));
    assert!(events[..n - 2]
        .iter()
        .all(|e| matches!(e, Event::Progress(_))));
}

/// The future-style API yields the same payload as the data callback.
#[tokio::test]
async fn test_send_matches_callback_payload() {
    let manager = manager();

    let response = manager
        .send(Request::get("http://test/large.bin").unwrap(), None)
        .await
        .unwrap();

    assert_eq!(response.body().len(), 64 * 1024);
    assert!(response.body().iter().all(|&b| b == 42));
}

/// Cancelling mid-transfer completes once with the cancellation code, and
/// nothing follows.
#[tokio::test]
async fn test_cancel_mid_transfer_terminates_once() {
    let manager = manager();
    let (log, handlers) = recording_handlers();

    let handle = manager.fetch(Request::get("http://test/slow").unwrap(), handlers);
    tokio::time::sleep(Duration::from_millis(30)).await;
    handle.cancel();

    assert_eq!(handle.wait().await, OperationStatus::Cancelled);
    let count_at_completion = log.lock().unwrap().len();

    // Give a misbehaving operation time to emit anything late.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = log.lock().unwrap().clone();

    assert_eq!(events.len(), count_at_completion);
    assert_eq!(
        events.last(),
        Some(&Event::Complete {
            has_value: false,
            code: ErrorCode::CANCELLED.value()
        })
    );
    assert_eq!(completions(&events).len(), 1);
    assert!(!events.iter().any(|e| matches!(e, Event::Data(_))));
}

/// Cancelling after completion changes nothing.
#[tokio::test]
async fn test_cancel_after_completion_is_noop() {
    let manager = manager();
    let (log, handlers) = recording_handlers();

    let handle = manager.fetch(Request::get("http://test/large.bin").unwrap(), handlers);
    assert_eq!(handle.wait().await, OperationStatus::Succeeded);
    let before = log.lock().unwrap().clone();

    handle.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(*log.lock().unwrap(), before);
    assert_eq!(handle.status(), Some(OperationStatus::Succeeded));
}

/// Many concurrent operations each get exactly one completion.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_operations_each_complete_once() {
    let manager = manager();
    let mut runs = Vec::new();

    for i in 0..32 {
        let url = if i % 3 == 0 {
            "http://test/down"
        } else {
            "http://test/large.bin"
        };
        let (log, handlers) = recording_handlers();
        runs.push((log, manager.fetch(Request::get(url).unwrap(), handlers)));
    }

    let statuses = join_all(runs.iter().map(|(_, handle)| handle.wait())).await;

    assert_eq!(
        statuses.iter().filter(|s| s.is_success()).count(),
        32 - 11
    );
    for (log, _) in &runs {
        assert_eq!(completions(&log.lock().unwrap()).len(), 1);
    }
    assert_eq!(manager.in_flight(), 0);
}
