//! Unit tests for the task scheduler

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::application::errors::HandlerError;
use crate::infrastructure::adapters::MemoryTransport;

fn scheduler() -> TaskScheduler {
    TaskScheduler::new(Arc::new(MemoryTransport::new("1", "mybot")), None)
}

fn counting_task(name: &str, counter: Arc<AtomicUsize>) -> RunTaskDefinition {
    RunTaskDefinition::new(name, move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

#[test]
fn test_parse_cron_accepts_five_and_six_fields() {
    assert!(parse_cron("*/5 * * * *").is_ok());
    assert!(parse_cron("0 */5 * * * *").is_ok());
    assert!(parse_cron("not a cron").is_err());
}

#[tokio::test]
async fn test_interval_task_stops_after_cancel() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler.schedule("p", &[counting_task("tick", Arc::clone(&counter)).every_millis(20)]);
    assert_eq!(scheduler.active("p"), vec!["tick"]);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(counter.load(Ordering::SeqCst) >= 2);

    assert_eq!(scheduler.cancel_plugin("p"), 1);
    assert!(scheduler.active("p").is_empty());
    tokio::time::sleep(Duration::from_millis(30)).await;
    let stopped_at = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(counter.load(Ordering::SeqCst), stopped_at);
}

#[tokio::test]
async fn test_immediate_fires_once_without_trigger() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler.schedule("p", &[counting_task("boot", Arc::clone(&counter)).immediate()]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(scheduler.active("p").is_empty());
}

#[tokio::test]
async fn test_interval_does_not_fire_at_registration() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler.schedule("p", &[counting_task("slow", Arc::clone(&counter)).every(Duration::from_secs(60))]);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    scheduler.cancel_plugin("p");
}

#[tokio::test]
async fn test_cron_takes_precedence_over_interval() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    // Yearly cron plus a fast interval: only the cron schedule is used
    let task = counting_task("yearly", Arc::clone(&counter))
        .cron("0 0 0 1 1 *")
        .every_millis(10);
    scheduler.schedule("p", &[task]);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.active("p"), vec!["yearly"]);
    scheduler.cancel_plugin("p");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cron_fires_every_second_until_cancelled() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler.schedule("p", &[counting_task("each-second", Arc::clone(&counter)).cron("* * * * * *")]);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    let fired = counter.load(Ordering::SeqCst);
    assert!((2..=3).contains(&fired), "fired {} times", fired);

    assert_eq!(scheduler.cancel_plugin("p"), 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let stopped_at = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(counter.load(Ordering::SeqCst), stopped_at);
}

#[tokio::test]
async fn test_invalid_cron_falls_back_to_interval() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    let task = counting_task("fallback", Arc::clone(&counter)).cron("nonsense").every_millis(20);
    scheduler.schedule("p", &[task]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(counter.load(Ordering::SeqCst) >= 1);
    scheduler.cancel_plugin("p");
}

#[tokio::test]
async fn test_failing_task_keeps_schedule_alive() {
    let scheduler = scheduler();
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let task = RunTaskDefinition::new("flaky", move |_ctx| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(HandlerError::Failed("nope".to_string()))
        }
    })
    .every_millis(20);
    scheduler.schedule("p", &[task]);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(counter.load(Ordering::SeqCst) >= 2);
    scheduler.cancel_plugin("p");
}

#[tokio::test]
async fn test_cancel_only_touches_own_plugin() {
    let scheduler = scheduler();
    let a = Arc::new(AtomicUsize::new(0));
    let b = Arc::new(AtomicUsize::new(0));
    scheduler.schedule("a", &[counting_task("t", Arc::clone(&a)).every_millis(20)]);
    scheduler.schedule("b", &[counting_task("t", Arc::clone(&b)).every_millis(20)]);

    scheduler.cancel_plugin("a");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(a.load(Ordering::SeqCst), 0);
    assert!(b.load(Ordering::SeqCst) >= 1);
    assert_eq!(scheduler.active("b"), vec!["t"]);
    scheduler.cancel_plugin("b");
}
