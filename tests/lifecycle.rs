//! End-to-end lifecycle tests against the simulated peripheral.

use std::time::Duration;

use tokio::sync::mpsc;

use ledlink::protocol::{
    BUTTON_CHARACTERISTIC_UUID, LED_CHARACTERISTIC_UUID, STATE_CHARACTERISTIC_UUID,
};
use ledlink::transport::sim::{SimCall, SimFault, SimulatedPeripheral};
use ledlink::view::{RecordingView, ViewCall};
use ledlink::{
    ConnectionState, ConnectionStatus, Intent, Lifecycle, LifecycleConfig, SwitchId, SwitchState,
};

fn controller(
    peripheral: &SimulatedPeripheral,
    view: &RecordingView,
) -> Lifecycle<SimulatedPeripheral, RecordingView> {
    Lifecycle::new(
        peripheral.clone(),
        view.clone(),
        LifecycleConfig::default(),
    )
}

/// Wait until the peripheral's call log satisfies `pred`.
async fn wait_until(
    peripheral: &SimulatedPeripheral,
    mut pred: impl FnMut(&[SimCall]) -> bool,
) {
    let mut updates = peripheral.updates();
    loop {
        if pred(&peripheral.calls()) {
            return;
        }
        updates.changed().await.expect("peripheral dropped");
    }
}

fn count(calls: &[SimCall], pred: impl Fn(&SimCall) -> bool) -> usize {
    calls.iter().filter(|call| pred(call)).count()
}

#[tokio::test]
async fn happy_path_reaches_ready_with_led_off() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel::<Intent>();
    drop(intents);
    controller.run(receiver).await;

    assert_eq!(controller.state(), ConnectionState::Ready);
    assert!(!controller.mirror().led());
    // The LED is initialized to off exactly once.
    assert_eq!(peripheral.writes(LED_CHARACTERISTIC_UUID), vec![vec![0x00]]);
    // Button notifications were subscribed at connect time.
    let calls = peripheral.calls();
    assert_eq!(
        count(&calls, |c| matches!(
            c,
            SimCall::StartNotifications(uuid) if *uuid == BUTTON_CHARACTERISTIC_UUID
        )),
        1
    );
    assert_eq!(view.statuses().last(), Some(&ConnectionStatus::Connected));
    assert!(view.calls().contains(&ViewCall::DeviceName("LED Board".into())));
}

#[tokio::test]
async fn button_lookup_failure_still_reaches_ready() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    peripheral.inject(SimFault::Characteristic(BUTTON_CHARACTERISTIC_UUID));
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel::<Intent>();
    drop(intents);
    controller.run(receiver).await;

    // Ready despite the failed lookup, and the LED lookup still ran.
    assert_eq!(controller.state(), ConnectionState::Ready);
    assert_eq!(peripheral.writes(LED_CHARACTERISTIC_UUID), vec![vec![0x00]]);
    assert!(view
        .errors()
        .iter()
        .any(|e| e.contains("CHARACTERISTIC_NOT_FOUND")));
    assert_eq!(view.statuses().last(), Some(&ConnectionStatus::Connected));
}

#[tokio::test]
async fn set_led_is_last_write_wins() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel();
    intents.send(Intent::SetLed(true)).unwrap();
    intents.send(Intent::SetLed(false)).unwrap();
    drop(intents);
    controller.run(receiver).await;

    assert_eq!(
        peripheral.writes(LED_CHARACTERISTIC_UUID),
        vec![vec![0x00], vec![0x01], vec![0x00]]
    );
    assert!(!controller.mirror().led());
}

#[tokio::test]
async fn failed_led_write_leaves_mirror_flipped() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel();
    // One fault for the initial off write, one for the toggle.
    peripheral.inject(SimFault::Write);
    peripheral.inject(SimFault::Write);
    intents.send(Intent::ToggleLed).unwrap();
    drop(intents);
    controller.run(receiver).await;

    // The mirror flipped optimistically even though the write failed.
    assert!(controller.mirror().led());
    assert!(view.errors().iter().any(|e| e.contains("WRITE_FAILED")));
}

#[tokio::test]
async fn disconnect_restarts_from_availability_check_and_resets_led() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel();
    let run = controller.run(receiver);

    let script = async {
        wait_until(&peripheral, |calls| {
            count(calls, |c| matches!(c, SimCall::Connect)) == 1
        })
        .await;
        intents.send(Intent::SetLed(true)).unwrap();
        wait_until(&peripheral, |calls| {
            calls.contains(&SimCall::Write(LED_CHARACTERISTIC_UUID, vec![0x01]))
        })
        .await;

        peripheral.drop_connection();

        wait_until(&peripheral, |calls| {
            count(calls, |c| matches!(c, SimCall::Connect)) == 2
        })
        .await;
        drop(intents);
    };
    tokio::join!(run, script);

    let calls = peripheral.calls();
    // Reconnect went back through the availability check.
    assert_eq!(count(&calls, |c| matches!(c, SimCall::Availability)), 2);
    assert_eq!(count(&calls, |c| matches!(c, SimCall::Connect)), 2);

    // LED mirror was reset when the link dropped: the optimistic ON render
    // is followed by a disconnected status and an OFF render.
    let view_calls = view.calls();
    let on = view_calls
        .iter()
        .position(|c| *c == ViewCall::LedButton(true))
        .expect("LED rendered on");
    let disconnected = view_calls[on..]
        .iter()
        .position(|c| *c == ViewCall::ConnectionStatus(ConnectionStatus::Disconnected, None))
        .expect("disconnect rendered")
        + on;
    assert!(view_calls[disconnected..].contains(&ViewCall::LedButton(false)));
    assert_eq!(controller.state(), ConnectionState::Ready);
    assert!(!controller.mirror().led());
}

#[tokio::test(start_paused = true)]
async fn availability_retries_on_fixed_cadence() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    peripheral.script_availability([false, false, false, true]);
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let started = tokio::time::Instant::now();
    let (intents, receiver) = mpsc::unbounded_channel::<Intent>();
    drop(intents);
    controller.run(receiver).await;

    // Three unavailable results, 10 s apart, then success.
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    let calls = peripheral.calls();
    assert_eq!(count(&calls, |c| matches!(c, SimCall::Availability)), 4);
    assert_eq!(
        view.errors()
            .iter()
            .filter(|e| e.contains("UNAVAILABLE"))
            .count(),
        3
    );
    assert_eq!(controller.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn cancelled_selection_is_terminal_until_explicit_retry() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    peripheral.inject(SimFault::RequestDevice);
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel();
    let run = controller.run(receiver);

    let script = async {
        wait_until(&peripheral, |calls| {
            count(calls, |c| matches!(c, SimCall::RequestDevice)) == 1
        })
        .await;
        // No automatic retry happens; the user clicks refresh.
        intents.send(Intent::Refresh).unwrap();
        wait_until(&peripheral, |calls| {
            count(calls, |c| matches!(c, SimCall::Connect)) == 1
        })
        .await;
        drop(intents);
    };
    tokio::join!(run, script);

    let calls = peripheral.calls();
    assert_eq!(count(&calls, |c| matches!(c, SimCall::RequestDevice)), 2);
    assert!(view.errors().iter().any(|e| e.contains("USER_CANCEL")));
    assert_eq!(controller.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn bridge_init_failure_reports_and_stops() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    peripheral.inject(SimFault::Initialize);
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (_intents, receiver) = mpsc::unbounded_channel::<Intent>();
    controller.run(receiver).await;

    assert_eq!(controller.state(), ConnectionState::Uninitialized);
    assert!(view.errors().iter().any(|e| e.contains("INIT_FAILED")));
    assert_eq!(
        count(&peripheral.calls(), |c| matches!(c, SimCall::Availability)),
        0
    );
}

#[tokio::test]
async fn button_notifications_update_switch_mirror() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel::<Intent>();
    let run = controller.run(receiver);

    let script = async {
        wait_until(&peripheral, |calls| {
            count(calls, |c| matches!(c, SimCall::StartNotifications(_))) == 1
        })
        .await;
        // SW1 pressed, SW2 released (notification layout, no header).
        peripheral.push_notification(BUTTON_CHARACTERISTIC_UUID, vec![0x01, 0x00, 0x00, 0x00]);
        // Malformed runt payload is dropped without disturbing the mirror.
        peripheral.push_notification(BUTTON_CHARACTERISTIC_UUID, vec![0x01]);

        while !view
            .calls()
            .contains(&ViewCall::SwitchValue(SwitchId::Sw1, SwitchState::On))
        {
            tokio::task::yield_now().await;
        }
        drop(intents);
    };
    tokio::join!(run, script);

    assert_eq!(
        controller.mirror().switches(),
        (SwitchState::On, SwitchState::Off)
    );
    assert!(view
        .calls()
        .contains(&ViewCall::SwitchValue(SwitchId::Sw1, SwitchState::On)));
    assert!(view
        .calls()
        .contains(&ViewCall::SwitchValue(SwitchId::Sw2, SwitchState::Off)));
}

#[tokio::test]
async fn state_char_push_decodes_with_header_layout() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel();
    let run = controller.run(receiver);

    let script = async {
        wait_until(&peripheral, |calls| {
            count(calls, |c| matches!(c, SimCall::Connect)) == 1
        })
        .await;
        intents.send(Intent::ToggleNotifications).unwrap();
        wait_until(&peripheral, |calls| {
            count(calls, |c| matches!(
                c,
                SimCall::StartNotifications(uuid) if *uuid == STATE_CHARACTERISTIC_UUID
            )) == 1
        })
        .await;

        // Pushed state values keep the 8-byte header their polled reads
        // have: SW1 at offset 8, SW2 at offset 10.
        let mut payload = vec![0u8; 12];
        payload[8] = 0x01;
        peripheral.push_notification(STATE_CHARACTERISTIC_UUID, payload);

        while !view
            .calls()
            .contains(&ViewCall::SwitchValue(SwitchId::Sw1, SwitchState::On))
        {
            tokio::task::yield_now().await;
        }
        drop(intents);
    };
    tokio::join!(run, script);

    assert_eq!(
        controller.mirror().switches(),
        (SwitchState::On, SwitchState::Off)
    );
}

#[tokio::test]
async fn refresh_polls_state_characteristic_with_header_layout() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    let mut payload = vec![0u8; 12];
    payload[8] = 0x01;
    payload[10] = 0x01;
    peripheral.set_read_payload(payload);
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel();
    intents.send(Intent::Refresh).unwrap();
    drop(intents);
    controller.run(receiver).await;

    assert_eq!(
        count(&peripheral.calls(), |c| matches!(
            c,
            SimCall::Read(uuid) if *uuid == STATE_CHARACTERISTIC_UUID
        )),
        1
    );
    assert_eq!(
        controller.mirror().switches(),
        (SwitchState::On, SwitchState::On)
    );
}

#[tokio::test]
async fn toggle_notifications_subscribes_and_unsubscribes_state() {
    let peripheral = SimulatedPeripheral::new("LED Board");
    let view = RecordingView::default();
    let mut controller = controller(&peripheral, &view);

    let (intents, receiver) = mpsc::unbounded_channel();
    intents.send(Intent::ToggleNotifications).unwrap();
    intents.send(Intent::ToggleNotifications).unwrap();
    drop(intents);
    controller.run(receiver).await;

    let calls = peripheral.calls();
    assert_eq!(
        count(&calls, |c| matches!(
            c,
            SimCall::StartNotifications(uuid) if *uuid == STATE_CHARACTERISTIC_UUID
        )),
        1
    );
    assert_eq!(
        count(&calls, |c| matches!(
            c,
            SimCall::StopNotifications(uuid) if *uuid == STATE_CHARACTERISTIC_UUID
        )),
        1
    );
}
