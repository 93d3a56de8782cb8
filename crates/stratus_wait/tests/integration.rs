//! Integration tests for the waiter against a simulated remote object.

use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use stratus_wait::{
    Backoff, BoxError, CancelToken, ManualClock, Observation, StateChangeConf, WaitError,
};

/// A remote object that reports `Updating` for a fixed number of reads.
struct RemoteDomain {
    reads: AtomicU32,
    updating_reads: u32,
}

impl RemoteDomain {
    fn new(updating_reads: u32) -> Self {
        Self {
            reads: AtomicU32::new(0),
            updating_reads,
        }
    }

    fn status(&self) -> Result<Observation<u32>, BoxError> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if read < self.updating_reads {
            Ok(Observation::found(read, "Updating"))
        } else {
            Ok(Observation::found(read, "Available"))
        }
    }
}

fn available_conf(timeout: Duration) -> StateChangeConf<u32> {
    StateChangeConf::new(timeout)
        .with_pending(["Updating"])
        .with_target(["Available"])
}

#[test]
fn domain_becomes_available_on_real_clock() {
    let remote = RemoteDomain::new(2);
    let conf = available_conf(Duration::from_secs(5))
        .with_delays(Duration::from_millis(1), Duration::from_millis(5));

    let value = conf.wait(&CancelToken::new(), || remote.status()).unwrap();

    assert_eq!(value, Some(2));
    assert_eq!(remote.reads.load(Ordering::SeqCst), 3);
}

#[test]
fn cancel_from_another_thread_interrupts_wait() {
    let remote = RemoteDomain::new(u32::MAX);
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        canceller.cancel();
    });

    let conf = available_conf(Duration::from_secs(600)).with_poll_interval(Duration::from_secs(60));
    let start = Instant::now();
    let err = conf.wait(&cancel, || remote.status()).unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, WaitError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn concurrent_waits_are_independent() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let remote = Arc::new(RemoteDomain::new(i));
                let conf = available_conf(Duration::from_secs(60));
                let clock = ManualClock::new();
                let value = conf
                    .wait_with_clock(&clock, &CancelToken::new(), || remote.status())
                    .unwrap();
                (value, clock.sleeps().len())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let (value, sleeps) = handle.join().unwrap();
        assert_eq!(value, Some(i as u32));
        assert_eq!(sleeps, i);
    }
}

proptest! {
    #[test]
    fn pending_run_then_target(pending in 0u32..20, min_ms in 1u64..50, max_ms in 50u64..400) {
        let remote = RemoteDomain::new(pending);
        let clock = ManualClock::new();
        let conf = available_conf(Duration::from_secs(3600))
            .with_backoff(Backoff::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms)));

        let value = conf
            .wait_with_clock(&clock, &CancelToken::new(), || remote.status())
            .unwrap();

        prop_assert_eq!(value, Some(pending));
        prop_assert_eq!(remote.reads.load(Ordering::SeqCst), pending + 1);

        let sleeps = clock.sleeps();
        prop_assert_eq!(sleeps.len() as u32, pending);
        for pair in sleeps.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
        for sleep in &sleeps {
            prop_assert!(*sleep <= Duration::from_millis(max_ms));
        }
    }

    #[test]
    fn unknown_status_stops_immediately(status in "[A-Z][a-z]{2,10}") {
        prop_assume!(status != "Updating" && status != "Available");
        let clock = ManualClock::new();
        let mut calls = 0;
        let err = available_conf(Duration::from_secs(60))
            .wait_with_clock(&clock, &CancelToken::new(), || {
                calls += 1;
                Ok::<_, BoxError>(Observation::found(0u32, status.clone()))
            })
            .unwrap_err();

        prop_assert_eq!(calls, 1);
        let is_unexpected = matches!(err, WaitError::UnexpectedState { ref observed, .. } if *observed == status);
        prop_assert!(is_unexpected);
    }
}
