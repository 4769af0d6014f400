//! Demo binary: drives the lifecycle controller against the simulated
//! peripheral with a console view. Useful for eyeballing the full connect,
//! notify, disconnect, reconnect sequence without real hardware.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::info;

use ledlink::infrastructure::logging::init_logger;
use ledlink::protocol::{BUTTON_CHARACTERISTIC_UUID, STATE_CHARACTERISTIC_UUID};
use ledlink::transport::sim::SimulatedPeripheral;
use ledlink::{
    ConnectionStatus, Intent, Lifecycle, LifecycleConfig, SettingsService, SwitchId, SwitchState,
    View,
};

struct ConsoleView;

impl View for ConsoleView {
    fn render_connection_status(&self, status: ConnectionStatus, detail: Option<&str>) {
        match detail {
            Some(detail) => println!("[status] {status:?}: {}", detail.replace('\n', " / ")),
            None => println!("[status] {status:?}"),
        }
    }

    fn render_led_button(&self, on: bool) {
        println!("[led] {}", if on { "ON" } else { "OFF" });
    }

    fn render_switch_value(&self, which: SwitchId, state: SwitchState) {
        println!("[{which:?}] {state}");
    }

    fn render_loading(&self, visible: bool) {
        if visible {
            println!("[ui] loading...");
        }
    }

    fn render_device_name(&self, name: &str) {
        println!("[device] {name}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = SettingsService::new()?;
    let _guard = init_logger(&settings.get().log_settings)?;
    info!("starting ledlink demo against the simulated peripheral");

    let config = LifecycleConfig::from_settings(settings.get())?;
    let peripheral = SimulatedPeripheral::new("LED Board");
    let (intents, receiver) = mpsc::unbounded_channel();
    let mut controller = Lifecycle::new(peripheral.clone(), ConsoleView, config);

    let script = async {
        sleep(Duration::from_millis(200)).await;
        let _ = intents.send(Intent::ToggleLed);

        sleep(Duration::from_millis(200)).await;
        // Someone presses SW1 on the panel.
        peripheral.push_notification(BUTTON_CHARACTERISTIC_UUID, vec![0x01, 0x00, 0x00, 0x00]);

        sleep(Duration::from_millis(200)).await;
        let mut polled = vec![0u8; 12];
        polled[8] = 0x01;
        peripheral.set_read_payload(polled);
        let _ = intents.send(Intent::Refresh);

        sleep(Duration::from_millis(200)).await;
        let _ = intents.send(Intent::ToggleNotifications);

        sleep(Duration::from_millis(200)).await;
        peripheral.push_notification(STATE_CHARACTERISTIC_UUID, vec![0u8; 12]);
        let _ = intents.send(Intent::ToggleLed);

        // Pull the plug and let the controller reconnect on its own.
        sleep(Duration::from_millis(200)).await;
        peripheral.drop_connection();

        sleep(Duration::from_millis(500)).await;
        drop(intents);
    };

    tokio::join!(controller.run(receiver), script);

    info!("demo finished");
    Ok(())
}
