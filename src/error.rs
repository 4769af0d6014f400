//! Error types for the bridge surface.
//!
//! Every failure the host bridge can report is folded into [`TransportError`],
//! which carries a short machine-readable code plus a human-readable message.
//! The lifecycle controller renders these through one uniform status path on
//! the view; it never propagates them to its caller.

use thiserror::Error;

/// The bridge operation that failed, used for failure codes and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Initialize,
    Availability,
    RequestDevice,
    Connect,
    GetService,
    GetCharacteristic,
    Read,
    Write,
    StartNotifications,
    StopNotifications,
}

impl Operation {
    /// Short status code rendered to the user.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Initialize => "INIT_FAILED",
            Self::Availability => "AVAILABILITY_FAILED",
            Self::RequestDevice => "REQUEST_DEVICE_FAILED",
            Self::Connect => "CONNECT_FAILED",
            Self::GetService => "SERVICE_NOT_FOUND",
            Self::GetCharacteristic => "CHARACTERISTIC_NOT_FOUND",
            Self::Read => "READ_FAILED",
            Self::Write => "WRITE_FAILED",
            Self::StartNotifications => "NOTIFY_START_FAILED",
            Self::StopNotifications => "NOTIFY_STOP_FAILED",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "bridge initialization",
            Self::Availability => "availability check",
            Self::RequestDevice => "device selection",
            Self::Connect => "GATT connect",
            Self::GetService => "service lookup",
            Self::GetCharacteristic => "characteristic lookup",
            Self::Read => "characteristic read",
            Self::Write => "characteristic write",
            Self::StartNotifications => "notification subscribe",
            Self::StopNotifications => "notification unsubscribe",
        }
    }
}

/// Failures surfaced by a [`Transport`](crate::transport::Transport)
/// implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Bluetooth is switched off or the adapter is missing. Recoverable;
    /// the controller retries the availability check on a fixed interval.
    #[error("Bluetooth not available")]
    Unavailable,

    /// The user dismissed the device picker, or no device matched. Terminal
    /// for the current attempt; requires an explicit user retry.
    #[error("device selection cancelled")]
    SelectionCancelled,

    /// Any other bridge failure, tagged with the operation that produced it.
    #[error("{} failed: {message}", .operation.name())]
    Failure {
        operation: Operation,
        message: String,
    },
}

impl TransportError {
    pub fn failure(operation: Operation, message: impl Into<String>) -> Self {
        Self::Failure {
            operation,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "UNAVAILABLE",
            Self::SelectionCancelled => "USER_CANCEL",
            Self::Failure { operation, .. } => operation.code(),
        }
    }

    /// Uniform status text shown to the user: "Error", code, message.
    pub fn render(&self) -> String {
        format!("Error\n{}\n{}", self.code(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_operation_code() {
        let err = TransportError::failure(Operation::Write, "gatt timed out");
        assert_eq!(err.code(), "WRITE_FAILED");
        assert_eq!(err.to_string(), "characteristic write failed: gatt timed out");
    }

    #[test]
    fn render_is_code_then_message() {
        let err = TransportError::Unavailable;
        assert_eq!(err.render(), "Error\nUNAVAILABLE\nBluetooth not available");
    }
}
