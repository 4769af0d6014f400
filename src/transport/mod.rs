//! Bluetooth bridge seam.
//!
//! The host environment owns the actual Bluetooth stack; this module maps
//! its capability surface (initialize bridge, availability check, device
//! picker, GATT connect, service/characteristic lookup, read/write/notify,
//! value-changed and disconnected listeners) onto the [`Transport`] trait.
//! Handle types are opaque associated types owned by the implementation.
//!
//! Listener registration is folded into [`Transport::connect`]: it returns
//! the event stream for that connection, and dropping the receiver stands in
//! for removing the listeners.

pub mod sim;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::TransportError;

/// Asynchronous events for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A notifying characteristic pushed a new value.
    Notification { characteristic: Uuid, value: Vec<u8> },
    /// The peripheral dropped the connection (powered off, out of range).
    Disconnected,
}

/// Event stream handed out by [`Transport::connect`], valid until the
/// connection drops.
pub type LinkEvents = mpsc::UnboundedReceiver<LinkEvent>;

/// Host-provided Bluetooth capability.
///
/// All calls are non-blocking and sequential from the controller's point of
/// view; none of them can be cancelled once issued.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Opaque device handle, valid from selection until disconnect.
    type Device;
    /// Opaque service handle, scoped to one connection.
    type Service;
    /// Opaque characteristic handle, scoped to one connection.
    type Characteristic;

    /// Initialize the bridge. Must complete before any other call.
    async fn initialize(&mut self) -> Result<(), TransportError>;

    /// Whether Bluetooth is currently usable. `Ok(false)` is the recoverable
    /// "switched off" case, distinct from a bridge failure.
    async fn availability(&mut self) -> Result<bool, TransportError>;

    /// Open the user-facing device picker and wait for a selection.
    async fn request_device(&mut self) -> Result<Self::Device, TransportError>;

    /// Connect GATT; on success returns the event stream for this link.
    async fn connect(&mut self, device: &Self::Device) -> Result<LinkEvents, TransportError>;

    async fn primary_service(
        &mut self,
        device: &Self::Device,
        service: Uuid,
    ) -> Result<Self::Service, TransportError>;

    async fn characteristic(
        &mut self,
        service: &Self::Service,
        characteristic: Uuid,
    ) -> Result<Self::Characteristic, TransportError>;

    async fn read(&mut self, characteristic: &Self::Characteristic)
        -> Result<Vec<u8>, TransportError>;

    async fn write(
        &mut self,
        characteristic: &Self::Characteristic,
        value: &[u8],
    ) -> Result<(), TransportError>;

    /// Subscribe the characteristic; values arrive as
    /// [`LinkEvent::Notification`] on the link's event stream.
    async fn start_notifications(
        &mut self,
        characteristic: &Self::Characteristic,
    ) -> Result<(), TransportError>;

    async fn stop_notifications(
        &mut self,
        characteristic: &Self::Characteristic,
    ) -> Result<(), TransportError>;

    /// Human-readable name of a selected device.
    fn device_name(&self, device: &Self::Device) -> String;
}
