//! Core of a control panel for a single BLE "LED + Button" peripheral.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  intents   ┌──────────────────────┐   calls   ┌───────────┐
//! │   View   │ ─────────> │  Lifecycle controller │ ────────> │ Transport │
//! │ (trait)  │ <───────── │  + DeviceStateMirror  │ <──────── │  (trait)  │
//! └──────────┘  renders   └──────────────────────┘   events   └───────────┘
//! ```
//!
//! The controller owns the connection state machine (availability polling,
//! device selection, GATT connect, service discovery, notifications,
//! automatic reconnect) and mirrors the last-known LED and switch states.
//! The Bluetooth bridge and the presentation layer are trait seams supplied
//! by the host; [`transport::sim`] ships an in-process peripheral for tests
//! and demos.
//!
//! ## Modules
//!
//! - [`lifecycle`] - the connection state machine and intent handling
//! - [`protocol`] - service UUIDs, LED command, switch payload decoding
//! - [`transport`] - the consumed Bluetooth bridge surface
//! - [`view`] - the produced presentation surface
//! - [`domain`] - device state mirror, shared models, settings
//! - [`infrastructure`] - logging setup

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod lifecycle;
pub mod protocol;
pub mod transport;
pub mod view;

pub use domain::mirror::DeviceStateMirror;
pub use domain::models::{ConnectionState, ConnectionStatus, Intent, SwitchId};
pub use domain::settings::{LogSettings, Settings, SettingsService};
pub use error::{Operation, TransportError};
pub use lifecycle::{Lifecycle, LifecycleConfig};
pub use protocol::{SwitchPair, SwitchState};
pub use transport::{LinkEvent, Transport};
pub use view::View;
