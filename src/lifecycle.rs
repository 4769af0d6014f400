//! Connection lifecycle controller.
//!
//! Drives one BLE link from bridge initialization to a ready, subscribed
//! connection and back through disconnects:
//!
//! ```text
//! Uninitialized -> CheckingAvailability -> AwaitingDeviceSelection
//!     -> Connecting -> DiscoveringService -> Ready -> Disconnected
//!                          ^                              |
//!                          +------------------------------+
//! ```
//!
//! Discovery does not short-circuit: a failed characteristic lookup is
//! reported and the remaining lookups still run, so `Ready` means
//! "best-effort connected", not "fully resolved". Reconnection after a drop
//! is automatic and unconditional; the only retry delay anywhere is the flat
//! availability-check interval.
//!
//! All state for one connection attempt lives in a numbered [`Link`] owned
//! by the controller. When the link drops, the `Link` is dropped with it,
//! taking any still-queued completions along; nothing from a superseded
//! attempt can reach the mirror.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::mirror::DeviceStateMirror;
use crate::domain::models::{ConnectionState, ConnectionStatus, Intent};
use crate::domain::settings::Settings;
use crate::error::{Operation, TransportError};
use crate::protocol;
use crate::transport::{LinkEvent, LinkEvents, Transport};
use crate::view::View;

/// Identifiers and timing for the lifecycle controller.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub service_uuid: Uuid,
    pub state_char_uuid: Uuid,
    pub led_char_uuid: Uuid,
    pub button_char_uuid: Uuid,
    /// Flat retry interval for the availability check.
    pub availability_retry: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            service_uuid: protocol::USER_SERVICE_UUID,
            state_char_uuid: protocol::STATE_CHARACTERISTIC_UUID,
            led_char_uuid: protocol::LED_CHARACTERISTIC_UUID,
            button_char_uuid: protocol::BUTTON_CHARACTERISTIC_UUID,
            availability_retry: Duration::from_secs(10),
        }
    }
}

impl LifecycleConfig {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let parse = |field: &str, value: &str| -> anyhow::Result<Uuid> {
            Uuid::parse_str(value)
                .map_err(|e| anyhow::anyhow!("invalid {field} UUID {value:?}: {e}"))
        };
        Ok(Self {
            service_uuid: parse("service", &settings.ble_service_uuid)?,
            state_char_uuid: parse("state characteristic", &settings.ble_state_char_uuid)?,
            led_char_uuid: parse("LED characteristic", &settings.ble_led_char_uuid)?,
            button_char_uuid: parse("button characteristic", &settings.ble_button_char_uuid)?,
            availability_retry: Duration::from_secs(settings.availability_retry_secs),
        })
    }
}

/// Handles resolved for one connection attempt.
///
/// Any of the characteristics may be missing after a partial discovery;
/// intents that need a missing one report an error instead of running.
struct Link<T: Transport> {
    attempt: u64,
    device: T::Device,
    events: LinkEvents,
    led_char: Option<T::Characteristic>,
    state_char: Option<T::Characteristic>,
    /// Whether the state characteristic is currently subscribed.
    notifying: bool,
}

/// The connection lifecycle controller.
pub struct Lifecycle<T: Transport, V: View> {
    transport: T,
    view: V,
    config: LifecycleConfig,
    state: ConnectionState,
    mirror: DeviceStateMirror,
    attempts: u64,
}

impl<T: Transport, V: View> Lifecycle<T, V> {
    pub fn new(transport: T, view: V, config: LifecycleConfig) -> Self {
        Self {
            transport,
            view,
            config,
            state: ConnectionState::Uninitialized,
            mirror: DeviceStateMirror::new(),
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn mirror(&self) -> &DeviceStateMirror {
        &self.mirror
    }

    /// Drive the controller until the intent channel closes.
    ///
    /// A dropped link reconnects automatically from the availability check;
    /// a terminal error (cancelled picker, failed connect) parks the
    /// controller until the user retries via [`Intent::Refresh`].
    pub async fn run(&mut self, mut intents: mpsc::UnboundedReceiver<Intent>) {
        if let Err(err) = self.transport.initialize().await {
            self.report(&err, false);
            return;
        }

        loop {
            match self.establish().await {
                Some(link) => {
                    if !self.serve(link, &mut intents).await {
                        return;
                    }
                }
                None => {
                    // Terminal error: wait for an explicit retry.
                    loop {
                        match intents.recv().await {
                            Some(Intent::Refresh) => break,
                            Some(intent) => {
                                debug!(?intent, "ignoring intent while not connected")
                            }
                            None => return,
                        }
                    }
                }
            }
        }
    }

    /// One full connection attempt: availability loop, device picker, GATT
    /// connect, discovery. `None` means the attempt ended in a terminal
    /// error.
    async fn establish(&mut self) -> Option<Link<T>> {
        self.transition(ConnectionState::CheckingAvailability);
        loop {
            match self.transport.availability().await {
                Ok(true) => break,
                Ok(false) => {
                    // Flat interval, retried forever.
                    self.report(&TransportError::Unavailable, true);
                    tokio::time::sleep(self.config.availability_retry).await;
                }
                Err(err) => {
                    self.report(&err, false);
                    return None;
                }
            }
        }

        self.transition(ConnectionState::AwaitingDeviceSelection);
        let device = match self.transport.request_device().await {
            Ok(device) => device,
            Err(err) => {
                self.report(&err, false);
                return None;
            }
        };

        self.transition(ConnectionState::Connecting);
        let events = match self.transport.connect(&device).await {
            Ok(events) => events,
            Err(err) => {
                self.report(&err, false);
                return None;
            }
        };

        self.attempts += 1;
        let name = self.transport.device_name(&device);
        info!(attempt = self.attempts, device = %name, "device connected");
        self.view.render_device_name(&name);

        let mut link = Link {
            attempt: self.attempts,
            device,
            events,
            led_char: None,
            state_char: None,
            notifying: false,
        };

        self.transition(ConnectionState::DiscoveringService);
        self.discover(&mut link).await;

        // Best-effort connected: Ready even when some lookups failed.
        self.transition(ConnectionState::Ready);
        Some(link)
    }

    /// Resolve the service and its characteristics. Failures are reported
    /// but never short-circuit the remaining lookups.
    async fn discover(&mut self, link: &mut Link<T>) {
        let service = match self
            .transport
            .primary_service(&link.device, self.config.service_uuid)
            .await
        {
            Ok(service) => service,
            Err(err) => {
                self.report(&err, false);
                return;
            }
        };

        // Button presses arrive as notifications from connect onward.
        match self
            .transport
            .characteristic(&service, self.config.button_char_uuid)
            .await
        {
            Ok(button) => {
                if let Err(err) = self.transport.start_notifications(&button).await {
                    self.report(&err, false);
                }
            }
            Err(err) => self.report(&err, false),
        }

        match self
            .transport
            .characteristic(&service, self.config.led_char_uuid)
            .await
        {
            Ok(led) => {
                // Switch off by default. A failed write is reported but does
                // not block readiness.
                if let Err(err) = self
                    .transport
                    .write(&led, &protocol::led_command(false))
                    .await
                {
                    self.report(&err, false);
                }
                self.mirror.set_led(false, &self.view);
                link.led_char = Some(led);
            }
            Err(err) => self.report(&err, false),
        }

        match self
            .transport
            .characteristic(&service, self.config.state_char_uuid)
            .await
        {
            Ok(state) => link.state_char = Some(state),
            Err(err) => self.report(&err, false),
        }
    }

    /// Ready-state loop. Returns `true` when the link dropped (caller
    /// reconnects) and `false` when the intent channel closed.
    async fn serve(&mut self, mut link: Link<T>, intents: &mut mpsc::UnboundedReceiver<Intent>) -> bool {
        loop {
            tokio::select! {
                event = link.events.recv() => match event {
                    Some(LinkEvent::Notification { characteristic, value }) => {
                        self.on_notification(&link, characteristic, &value);
                    }
                    Some(LinkEvent::Disconnected) | None => {
                        info!(attempt = link.attempt, "link dropped");
                        self.transition(ConnectionState::Disconnected);
                        self.mirror.reset(&self.view);
                        return true;
                    }
                },
                intent = intents.recv() => match intent {
                    Some(intent) => self.on_intent(&mut link, intent).await,
                    None => return false,
                },
            }
        }
    }

    fn on_notification(&mut self, link: &Link<T>, characteristic: Uuid, value: &[u8]) {
        // Button pushes carry the switch words at the head of the payload;
        // the state characteristic keeps the header its polled reads have.
        let decoded = if characteristic == self.config.button_char_uuid {
            protocol::decode_notification(value)
        } else if characteristic == self.config.state_char_uuid {
            protocol::decode_polled(value)
        } else {
            debug!(%characteristic, "notification from unknown characteristic");
            return;
        };

        match decoded {
            Ok(pair) => self.mirror.update_switches(pair, &self.view),
            Err(err) => warn!(
                attempt = link.attempt,
                %characteristic,
                "dropping malformed switch payload: {err}"
            ),
        }
    }

    async fn on_intent(&mut self, link: &mut Link<T>, intent: Intent) {
        match intent {
            Intent::ToggleLed => {
                let desired = self.mirror.toggle_led(&self.view);
                self.write_led(link, desired).await;
            }
            Intent::SetLed(on) => {
                self.mirror.set_led(on, &self.view);
                self.write_led(link, on).await;
            }
            Intent::ToggleNotifications => self.toggle_state_notifications(link).await,
            Intent::Refresh => self.refresh(link).await,
        }
    }

    /// Write the LED command. The mirror has already flipped; a failed
    /// write is reported and leaves it flipped.
    async fn write_led(&mut self, link: &Link<T>, on: bool) {
        let Some(led) = &link.led_char else {
            self.report(
                &TransportError::failure(Operation::Write, "LED characteristic unresolved"),
                false,
            );
            return;
        };
        if let Err(err) = self.transport.write(led, &protocol::led_command(on)).await {
            self.report(&err, false);
        }
    }

    async fn toggle_state_notifications(&mut self, link: &mut Link<T>) {
        let desired = !link.notifying;
        let result = match &link.state_char {
            Some(state) if desired => self.transport.start_notifications(state).await,
            Some(state) => self.transport.stop_notifications(state).await,
            None => {
                self.report(
                    &TransportError::failure(
                        Operation::StartNotifications,
                        "state characteristic unresolved",
                    ),
                    false,
                );
                return;
            }
        };
        match result {
            Ok(()) => {
                link.notifying = desired;
                info!(attempt = link.attempt, enabled = desired, "state notifications toggled");
            }
            Err(err) => self.report(&err, false),
        }
    }

    /// Poll the state characteristic and mirror the decoded switches.
    async fn refresh(&mut self, link: &Link<T>) {
        let Some(state) = &link.state_char else {
            self.report(
                &TransportError::failure(Operation::Read, "state characteristic unresolved"),
                false,
            );
            return;
        };
        match self.transport.read(state).await {
            Ok(value) => match protocol::decode_polled(&value) {
                Ok(pair) => self.mirror.update_switches(pair, &self.view),
                Err(err) => warn!(
                    attempt = link.attempt,
                    "dropping malformed switch payload: {err}"
                ),
            },
            Err(err) => self.report(&err, false),
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!(from = ?self.state, to = ?next, "lifecycle transition");
        self.state = next;
        match next {
            ConnectionState::Ready => {
                self.view.render_loading(false);
                self.view
                    .render_connection_status(ConnectionStatus::Connected, None);
            }
            ConnectionState::Uninitialized => {}
            _ => {
                self.view.render_loading(true);
                self.view
                    .render_connection_status(ConnectionStatus::Disconnected, None);
            }
        }
    }

    /// Uniform error path: log, then render code + message on the status
    /// line. Errors never propagate past here.
    fn report(&self, err: &TransportError, loading: bool) {
        warn!(code = err.code(), "transport error: {err}");
        self.view.render_loading(loading);
        self.view
            .render_connection_status(ConnectionStatus::Error, Some(&err.render()));
    }
}
