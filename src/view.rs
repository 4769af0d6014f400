//! Presentation seam.
//!
//! The core never touches presentation directly; it renders through this
//! trait and receives user intents over a channel. A host application
//! implements [`View`] on top of whatever UI it carries.

use std::sync::{Arc, Mutex};

use crate::domain::models::{ConnectionStatus, SwitchId};
use crate::protocol::SwitchState;

pub trait View {
    /// Update the connection status line. `detail` carries the uniform
    /// error text (code + message) when `status` is [`ConnectionStatus::Error`].
    fn render_connection_status(&self, status: ConnectionStatus, detail: Option<&str>);

    /// Reflect the mirrored LED state on the toggle control.
    fn render_led_button(&self, on: bool);

    /// Show one switch reading.
    fn render_switch_value(&self, which: SwitchId, state: SwitchState);

    /// Show or hide the busy indicator.
    fn render_loading(&self, visible: bool);

    /// Show the connected device's name.
    fn render_device_name(&self, name: &str);
}

/// One recorded render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCall {
    ConnectionStatus(ConnectionStatus, Option<String>),
    LedButton(bool),
    SwitchValue(SwitchId, SwitchState),
    Loading(bool),
    DeviceName(String),
}

/// View that records every render call. Used by the integration tests and
/// handy when bringing up a new transport backend.
#[derive(Clone, Default)]
pub struct RecordingView {
    calls: Arc<Mutex<Vec<ViewCall>>>,
}

impl RecordingView {
    pub fn calls(&self) -> Vec<ViewCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Just the status transitions, in order.
    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ViewCall::ConnectionStatus(status, _) => Some(status),
                _ => None,
            })
            .collect()
    }

    /// The error details rendered so far.
    pub fn errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ViewCall::ConnectionStatus(ConnectionStatus::Error, detail) => detail,
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: ViewCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl View for RecordingView {
    fn render_connection_status(&self, status: ConnectionStatus, detail: Option<&str>) {
        self.push(ViewCall::ConnectionStatus(
            status,
            detail.map(str::to_string),
        ));
    }

    fn render_led_button(&self, on: bool) {
        self.push(ViewCall::LedButton(on));
    }

    fn render_switch_value(&self, which: SwitchId, state: SwitchState) {
        self.push(ViewCall::SwitchValue(which, state));
    }

    fn render_loading(&self, visible: bool) {
        self.push(ViewCall::Loading(visible));
    }

    fn render_device_name(&self, name: &str) {
        self.push(ViewCall::DeviceName(name.to_string()));
    }
}
