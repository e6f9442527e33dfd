//! Integration tests for the bridge read loop and command path.
//!
//! The read loop runs on its own thread, so these tests drive the far end of
//! a `MockTransport` and wait on the event channel. They run under
//! `#[serial]` to keep the timing-sensitive ones from competing for CPU.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use fh2_bridge::{
    Bridge, BridgeEvent, BridgePhase, PanelConfig, Provenance, SendError, StartError, StateField,
};
use fh2_transport::{MockHandle, MockTransport};
use parking_lot::Mutex;
use serial_test::serial;

const WAIT: Duration = Duration::from_secs(2);

/// Helper to create a bridge over a mock transport with a fast poll.
fn mock_bridge() -> (Bridge, MockHandle) {
    let (transport, handle) = MockTransport::new("mock0");
    let config = PanelConfig {
        poll_interval_ms: 10,
        ..Default::default()
    };
    (Bridge::new(&config, Some(Arc::new(transport))), handle)
}

/// Collect events until `done` matches one, failing after `WAIT`.
fn collect_until(
    events: &Receiver<BridgeEvent>,
    done: impl Fn(&BridgeEvent) -> bool,
) -> Vec<BridgeEvent> {
    let mut seen = Vec::new();
    loop {
        let event = events
            .recv_timeout(WAIT)
            .unwrap_or_else(|_| panic!("timed out waiting for event, saw {:?}", seen));
        let finished = done(&event);
        seen.push(event);
        if finished {
            return seen;
        }
    }
}

// ============================================================================
// Read loop
// ============================================================================

#[test]
#[serial]
fn test_reports_update_state_in_order() {
    let (bridge, handle) = mock_bridge();
    let events = bridge.subscribe();
    bridge.start().expect("start should succeed");

    handle.push_line("AG?100;");
    handle.push_line("garbage");
    handle.push_line("ML1050");

    let seen = collect_until(&events, |e| {
        matches!(e, BridgeEvent::Applied(c) if c.field == StateField::MonitorLevel)
    });

    let text: Vec<String> = seen.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        text,
        vec![
            "Received: AG?100;",
            "volume updated by device",
            "Received: garbage",
            "Unhandled: garbage",
            "Received: ML1050",
            "monitor_level updated by device",
        ]
    );

    let state = bridge.state();
    assert_eq!(state.volume.value, 100);
    assert_eq!(state.monitor_level.value, 50);
    assert_eq!(state.monitor_level.source, Provenance::Device);

    bridge.stop();
}

#[test]
#[serial]
fn test_semicolon_framed_reports_without_newline() {
    let (bridge, handle) = mock_bridge();
    let events = bridge.subscribe();
    bridge.start().unwrap();

    handle.push_bytes(b"AG?042;BI1;");

    collect_until(&events, |e| {
        matches!(e, BridgeEvent::Applied(c) if c.field == StateField::BreakIn)
    });
    let state = bridge.state();
    assert_eq!(state.volume.value, 42);
    assert!(state.break_in.value);

    bridge.stop();
}

#[test]
#[serial]
fn test_read_error_closes_bridge() {
    let (bridge, handle) = mock_bridge();
    let events = bridge.subscribe();
    bridge.start().unwrap();

    handle.fail_next_read("device unplugged");

    let seen = collect_until(&events, |e| *e == BridgeEvent::Closed);
    assert!(seen
        .iter()
        .any(|e| matches!(e, BridgeEvent::ReadFailed(msg) if msg.contains("device unplugged"))));
    assert_eq!(bridge.phase(), BridgePhase::Closed);

    // Lines after the failure are never processed.
    handle.push_line("AG?255;");
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(bridge.state().volume.value, 0);

    bridge.stop();
    assert_eq!(handle.close_calls(), 1);
}

#[test]
#[serial]
fn test_state_callback_runs_on_device_report() {
    let (bridge, handle) = mock_bridge();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    bridge.on_state_change(move |change| {
        assert_eq!(change.source, Provenance::Device);
        assert!(change.state.break_in.value);
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let events = bridge.subscribe();
    bridge.start().unwrap();

    handle.push_line("BI1");
    collect_until(&events, |e| matches!(e, BridgeEvent::Applied(_)));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    bridge.stop();
}

#[test]
#[serial]
fn test_sends_while_reading() {
    let (bridge, handle) = mock_bridge();
    let bridge = Arc::new(bridge);
    bridge.start().unwrap();

    let sender = {
        let bridge = Arc::clone(&bridge);
        std::thread::spawn(move || {
            for volume in 0..20u8 {
                bridge.set_volume(volume).unwrap();
            }
        })
    };
    for _ in 0..20 {
        handle.push_line("ML1010");
    }
    sender.join().unwrap();

    assert_eq!(handle.written().len(), 20);
    assert_eq!(handle.written()[19], "AG0019;");
    bridge.stop();
}

#[test]
#[serial]
fn test_last_callback_matches_state() {
    let (bridge, handle) = mock_bridge();
    let bridge = Arc::new(bridge);
    let last = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&last);
    bridge.on_state_change(move |change| *seen.lock() = Some(change.state));
    let events = bridge.subscribe();
    bridge.start().unwrap();

    let writer = {
        let bridge = Arc::clone(&bridge);
        std::thread::spawn(move || {
            for volume in 0..200u8 {
                bridge.set_volume(volume).unwrap();
            }
        })
    };
    for volume in 0..200u8 {
        handle.push_line(&format!("AG?{};", 255 - volume));
    }
    writer.join().unwrap();

    let mut device_updates = 0;
    while device_updates < 200 {
        let event = events.recv_timeout(WAIT).expect("timed out waiting for updates");
        if matches!(event, BridgeEvent::Applied(c) if c.source == Provenance::Device) {
            device_updates += 1;
        }
    }

    assert_eq!(*last.lock(), Some(bridge.state()));
    bridge.stop();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
#[serial]
fn test_stop_closes_transport_once() {
    let (bridge, handle) = mock_bridge();
    bridge.start().unwrap();

    bridge.stop();
    bridge.stop();
    drop(bridge);

    assert_eq!(handle.close_calls(), 1);
}

#[test]
fn test_start_after_stop_fails() {
    let (bridge, _handle) = mock_bridge();
    bridge.stop();
    assert!(matches!(bridge.start(), Err(StartError::Closed)));
}

#[test]
fn test_start_without_transport_is_noop() {
    let bridge = Bridge::new(&PanelConfig::default(), None);
    bridge.start().unwrap();
    assert_eq!(bridge.phase(), BridgePhase::Running);
    assert!(!bridge.is_connected());
}

#[test]
fn test_connect_without_port() {
    let bridge = Bridge::connect(&PanelConfig::default());
    assert!(!bridge.is_connected());
    assert!(bridge.connect_error().is_some());

    let before = bridge.state();
    assert!(matches!(
        bridge.send_command("AG?;"),
        Err(SendError::SendFailed(_))
    ));
    assert_eq!(bridge.state(), before);
}

#[test]
fn test_connect_to_missing_device() {
    let config = PanelConfig {
        port: "/dev/fh2-no-such-port".to_string(),
        ..Default::default()
    };
    let bridge = Bridge::connect(&config);
    assert!(!bridge.is_connected());
    assert!(bridge.connect_error().is_some());

    let before = bridge.state();
    assert!(matches!(
        bridge.send_command("AG?;"),
        Err(SendError::SendFailed(_))
    ));
    assert_eq!(bridge.state(), before);
}

// ============================================================================
// Command path
// ============================================================================

#[test]
fn test_empty_command_never_reaches_transport() {
    let (bridge, handle) = mock_bridge();
    let events = bridge.subscribe();

    assert!(matches!(bridge.send_command(""), Err(SendError::NoCommand)));
    assert_eq!(handle.write_calls(), 0);
    assert_eq!(events.try_recv().unwrap(), BridgeEvent::NoCommand);
}

#[test]
fn test_send_without_transport_fails() {
    let bridge = Bridge::new(&PanelConfig::default(), None);
    let before = bridge.state();

    assert!(matches!(
        bridge.send_command("BI1;"),
        Err(SendError::SendFailed(_))
    ));
    assert_eq!(bridge.state(), before);
}

#[test]
fn test_write_failure_reported() {
    let (bridge, handle) = mock_bridge();
    let events = bridge.subscribe();
    handle.set_fail_writes(true);

    assert!(matches!(
        bridge.send_command("PB01;"),
        Err(SendError::SendFailed(_))
    ));
    assert!(matches!(
        events.try_recv().unwrap(),
        BridgeEvent::SendFailed { ref command, .. } if command == "PB01;"
    ));
}

#[test]
fn test_optimistic_volume() {
    let (bridge, handle) = mock_bridge();

    bridge.set_volume(7).unwrap();

    let state = bridge.state();
    assert_eq!(state.volume.value, 7);
    assert_eq!(state.volume.source, Provenance::Local);
    assert_eq!(handle.written(), vec!["AG0007;"]);
}

#[test]
fn test_optimistic_update_survives_failed_send() {
    let bridge = Bridge::new(&PanelConfig::default(), None);

    assert!(bridge.set_break_in(true).is_err());
    assert!(bridge.state().break_in.value);
    assert_eq!(bridge.state().break_in.source, Provenance::Local);
}

#[test]
fn test_monitor_level_out_of_range() {
    let (bridge, handle) = mock_bridge();
    assert!(matches!(
        bridge.set_monitor_level(101),
        Err(SendError::Invalid(_))
    ));
    assert_eq!(handle.write_calls(), 0);
}

#[test]
fn test_initial_queries_in_order() {
    let (bridge, handle) = mock_bridge();
    bridge.query_initial_values().unwrap();
    assert_eq!(handle.written(), vec!["AG?;", "ML1;", "BI?;"]);
}

#[test]
fn test_initial_queries_all_attempted_on_failure() {
    let (bridge, handle) = mock_bridge();
    handle.set_fail_writes(true);

    assert!(bridge.query_initial_values().is_err());
    assert_eq!(handle.write_calls(), 3);
}

#[test]
fn test_state_written_back_to_config() {
    let (bridge, _handle) = mock_bridge();
    bridge.handle_line("AG?180;");
    bridge.handle_line("BI1");

    let mut config = PanelConfig::default();
    bridge.state().write_into(&mut config);
    assert_eq!(config.volume, 180);
    assert!(config.break_in_enabled);
}
