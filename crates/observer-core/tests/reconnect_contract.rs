//! Contract test: failure recovery
//!
//! Constraints verified:
//! - a station that answers once and silently drops forces a link
//!   error within one timeout period
//! - the supervisor restarts discovery after the cooldown and the
//!   station is found again
//! - failures never propagate out of the supervisor

mod common;

use common::{make_frame, spawn_station, test_config};
use observer_core::{readout_channel, Supervisor, SupervisorEvent};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

async fn expect_event<F>(
    events: &mut mpsc::Receiver<SupervisorEvent>,
    what: &str,
    deadline: Duration,
    pred: F,
) -> SupervisorEvent
where
    F: Fn(&SupervisorEvent) -> bool,
{
    tokio::time::timeout(deadline, async {
        loop {
            match events.recv().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("event channel closed while waiting for {what}"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

#[tokio::test]
async fn link_failure_triggers_rediscovery_within_the_cooldown() {
    let config = test_config(16621, 16620);
    let frame = make_frame(72.5, 180);
    let (station, broadcasts) = spawn_station(
        16620,
        16621,
        vec![vec![frame.clone()], vec![frame.clone()]],
    );

    let (frames_tx, mut reader) = readout_channel();
    let (supervisor, mut events) =
        Supervisor::new(config.clone(), frames_tx).expect("supervisor construction");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle =
        tokio::spawn(async move { supervisor.run_with_shutdown(Some(shutdown_rx)).await });

    let established = |e: &SupervisorEvent| matches!(e, SupervisorEvent::LinkEstablished { .. });
    let lost = |e: &SupervisorEvent| matches!(e, SupervisorEvent::LinkLost { .. });

    // first discovery succeeds
    expect_event(&mut events, "first link", Duration::from_secs(10), established).await;
    let connected_at = Instant::now();

    // the silent drop must surface within poll_interval + timeout
    expect_event(&mut events, "link loss", Duration::from_secs(10), lost).await;
    let lost_after = connected_at.elapsed();
    assert!(
        lost_after <= Duration::from_secs(config.poll_interval + config.timeout + 1),
        "link loss must surface within one timeout period (took {lost_after:?})"
    );

    // rediscovery must complete within the cooldown plus slack
    let lost_at = Instant::now();
    expect_event(&mut events, "second link", Duration::from_secs(10), established).await;
    let recovered_after = lost_at.elapsed();
    assert!(
        recovered_after <= Duration::from_secs(config.retry_wait + 2),
        "restart must happen within retry_wait (took {recovered_after:?})"
    );

    assert!(
        broadcasts.load(Ordering::SeqCst) >= 2,
        "rediscovery must re-broadcast"
    );

    // both sessions delivered their frame
    for _ in 0..2 {
        match reader.pop(Duration::from_secs(5)).await {
            observer_core::Readout::Frame(received) => assert_eq!(received, frame),
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    shutdown_tx.send(()).expect("send shutdown");
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("supervisor exits after shutdown")
        .expect("task join");
    assert!(result.is_ok(), "failures never propagate: {result:?}");

    station.abort();
}

#[tokio::test]
async fn bad_frames_do_not_trigger_a_restart() {
    // a short garbage answer is still a frame at the link layer; the
    // poll loop must carry on, not tear the cycle down
    let config = test_config(16623, 16622);
    let garbage = vec![0xde, 0xad, 0xbe, 0xef];
    let good = make_frame(72.5, 180);
    let (station, _broadcasts) =
        spawn_station(16622, 16623, vec![vec![garbage.clone(), good.clone()]]);

    let (frames_tx, mut reader) = readout_channel();
    let (supervisor, mut events) =
        Supervisor::new(config, frames_tx).expect("supervisor construction");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle =
        tokio::spawn(async move { supervisor.run_with_shutdown(Some(shutdown_rx)).await });

    // both frames arrive on the same connection: no LinkLost between
    // them means the bad frame alone did not restart anything
    match reader.pop(Duration::from_secs(10)).await {
        observer_core::Readout::Frame(received) => assert_eq!(received, garbage),
        other => panic!("expected garbage frame, got {other:?}"),
    }

    // at this point the bad frame has been seen and the connection is
    // still up: nothing may have been torn down because of it
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, SupervisorEvent::LinkLost { .. }),
            "a bad frame alone must not restart the link"
        );
    }

    // polling continues undisturbed on the same connection
    match reader.pop(Duration::from_secs(10)).await {
        observer_core::Readout::Frame(received) => assert_eq!(received, good),
        other => panic!("expected good frame, got {other:?}"),
    }

    // decoding the garbage yields no fields but never fails
    assert!(observer_core::decode(&garbage).is_empty());

    shutdown_tx.send(()).expect("send shutdown");
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("supervisor exits after shutdown")
        .expect("task join")
        .expect("clean shutdown");

    station.abort();
}
