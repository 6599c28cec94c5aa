//! Concurrent dispatch on a multi-threaded runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use errand::{handler_fn, Capability, Errand, Lifetime, Request, RequestHandler, ServiceRegistry};
use errand_test::{CountingResolver, ExecutionLog, RecordingBehavior};
use futures::future::join_all;
use once_cell::sync::OnceCell;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

struct Slow(u64);

impl Request for Slow {
    type Response = u64;
}

struct Fast;

impl Request for Fast {
    type Response = &'static str;
}

fn registry(log: &ExecutionLog) -> ServiceRegistry {
    let registry = ServiceRegistry::new();
    let log = log.clone();
    registry
        .add_handler::<Slow, _>(Lifetime::Singleton, move || {
            let log = log.clone();
            handler_fn(move |request: &Slow, _cancel: &CancellationToken| {
                log.push("slow");
                let value = request.0;
                async move {
                    tokio::time::sleep(Duration::from_millis(value % 5)).await;
                    Ok(value * 2)
                }
            })
        })
        .add_handler::<Fast, _>(Lifetime::Transient, || {
            handler_fn(|_request: &Fast, _cancel: &CancellationToken| async { Ok("fast") })
        });
    registry
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_sends_converge_to_one_entry() {
    let log = ExecutionLog::new();
    let resolver = Arc::new(CountingResolver::new(registry(&log)));
    let errand = Errand::new(resolver.clone());

    let tasks = (0..64u64).map(|value| {
        let errand = errand.clone();
        tokio::spawn(async move { errand.send(Slow(value), &CancellationToken::new()).await })
    });
    let results = join_all(tasks).await;

    for (value, result) in results.into_iter().enumerate() {
        let response = result.unwrap().unwrap();
        assert_eq!(response, value as u64 * 2);
    }
    assert_eq!(errand.cached_handlers(), 1);
    assert_eq!(log.count("slow"), 64);
    assert!(resolver.handler_queries() >= 1);
    assert_eq!(resolver.behavior_queries(), 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_request_types_get_separate_entries() {
    let log = ExecutionLog::new();
    let errand = Errand::new(Arc::new(registry(&log)));
    let cancel = CancellationToken::new();

    let slow = join_all((0..8u64).map(|value| errand.send(Slow(value), &cancel)));
    let fast = join_all((0..8).map(|_| errand.send(Fast, &cancel)));
    let (slow, fast) = tokio::join!(slow, fast);

    assert!(slow.iter().all(|r| r.is_ok()));
    assert!(fast.iter().all(|r| matches!(r, Ok("fast"))));
    assert_eq!(errand.cached_handlers(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_one_caller_leaves_others_untouched() {
    let log = ExecutionLog::new();
    let errand = Errand::new(Arc::new(registry(&log)));
    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let live = CancellationToken::new();

    let (a, b) = tokio::join!(errand.send(Slow(1), &cancelled), errand.send(Slow(2), &live));

    // Without a cancellation-aware behavior the token is only observed, never acted on.
    assert_eq!(a.unwrap(), 2);
    assert_eq!(b.unwrap(), 4);
    assert!(!live.is_cancelled());
}

// ============================================================================
// Re-entrant dispatch
// ============================================================================

struct Outer(u64);

impl Request for Outer {
    type Response = u64;
}

struct Inner(u64);

impl Request for Inner {
    type Response = u64;
}

fn inner_handler() -> impl RequestHandler<Inner> {
    handler_fn(|request: &Inner, _cancel: &CancellationToken| {
        let value = request.0;
        async move { Ok(value * 10) }
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handler_sends_through_same_errand_on_first_use() {
    let installed: Arc<OnceCell<Errand>> = Arc::new(OnceCell::new());
    let registry = Arc::new(ServiceRegistry::new());
    let slot = installed.clone();
    registry
        .add_handler::<Outer, _>(Lifetime::Transient, move || {
            let slot = slot.clone();
            handler_fn(move |request: &Outer, cancel: &CancellationToken| {
                let errand = slot.get().cloned();
                let cancel = cancel.clone();
                let value = request.0;
                async move {
                    match errand {
                        Some(errand) => errand.send(Inner(value), &cancel).await,
                        None => Err(anyhow::anyhow!("errand not installed")),
                    }
                }
            })
        })
        .add_handler::<Inner, _>(Lifetime::Transient, inner_handler);
    let errand = Errand::new(registry);
    installed.set(errand.clone()).unwrap();

    let response = timeout(Duration::from_secs(5), errand.send(Outer(5), &CancellationToken::new()))
        .await
        .expect("nested send did not complete")
        .unwrap();

    assert_eq!(response, 50);
    assert_eq!(errand.cached_handlers(), 2);
}

#[tokio::test]
async fn factory_registers_into_registry_while_resolved() {
    let registry = Arc::new(ServiceRegistry::new());
    let log = ExecutionLog::new();
    let weak = Arc::downgrade(&registry);
    let registered = AtomicBool::new(false);
    let late_log = log.clone();
    registry.add_handler::<Outer, _>(Lifetime::Transient, move || {
        if let Some(registry) = weak.upgrade() {
            if !registered.swap(true, Ordering::SeqCst) {
                let log = late_log.clone();
                registry
                    .add_handler::<Outer, _>(Lifetime::Transient, || {
                        handler_fn(|_request: &Outer, _cancel: &CancellationToken| async {
                            Ok(0)
                        })
                    })
                    .add_handler::<Inner, _>(Lifetime::Transient, inner_handler)
                    .add_behavior::<Outer, _>(Lifetime::Transient, move || {
                        RecordingBehavior::new("late", log.clone())
                    });
            }
        }
        handler_fn(|request: &Outer, _cancel: &CancellationToken| {
            let value = request.0;
            async move { Ok(value) }
        })
    });
    let errand = Errand::new(registry.clone());
    let cancel = CancellationToken::new();

    let response = timeout(Duration::from_secs(5), errand.send(Outer(7), &cancel))
        .await
        .expect("send did not complete")
        .unwrap();

    // The wrapper keeps the handler it was built with; behaviors are looked up per send.
    assert_eq!(response, 7);
    assert_eq!(log.entries(), ["late:before", "late:after"]);
    assert_eq!(registry.lifetimes(&Capability::handler::<Outer>()).len(), 2);
    assert_eq!(errand.send(Outer(8), &cancel).await.unwrap(), 8);
    assert_eq!(errand.send(Inner(2), &cancel).await.unwrap(), 20);
}
