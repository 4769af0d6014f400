/// Lifecycle controller states, in the order a successful attempt visits
/// them. `Disconnected` loops back to `CheckingAvailability`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    CheckingAvailability,
    AwaitingDeviceSelection,
    Connecting,
    DiscoveringService,
    Ready,
    Disconnected,
}

/// Connection status as rendered by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error,
}

/// Which of the two panel switches a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchId {
    Sw1,
    Sw2,
}

/// User intents emitted by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// "Toggle LED" clicked; resolves to a [`SetLed`](Intent::SetLed)
    /// against the mirrored state.
    ToggleLed,
    /// Direct LED command.
    SetLed(bool),
    /// "Toggle notifications" clicked: subscribe or unsubscribe the state
    /// characteristic.
    ToggleNotifications,
    /// "Refresh" clicked: poll the state characteristic. While no device is
    /// connected this doubles as the explicit retry after a terminal error.
    Refresh,
}
