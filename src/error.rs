//! Error types
//! Every failure the droid core can surface to a caller.

use thiserror::Error;
use uuid::Uuid;

use crate::core::protocol::FrameError;

/// Failures raised by a radio transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No Bluetooth adapter found")]
    AdapterUnavailable,
    #[error("Device not found with ID: {0}")]
    UnknownPeer(String),
    #[error("Service not found with ID: {0}")]
    UnknownService(String),
    #[error("Characteristic not found with ID: {0}")]
    UnknownCharacteristic(String),
    #[error("Bluetooth error: {0}")]
    Backend(String),
}

/// Droid errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DroidError {
    #[error("Can not find scan data")]
    NoScanData,
    #[error("Can not discover services")]
    NoDiscoverServices,
    #[error("Can not find characteristic")]
    NoCharacteristic,
    #[error("Can not match bluetooth id: {0}")]
    NoBluetoothType(Uuid),
    #[error("Connection attempt was cancelled")]
    Cancelled,
    #[error("Sound index {0} is out of range")]
    InvalidSound(u8),
    #[error("Invalid wait duration: {0} seconds")]
    InvalidDuration(f64),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
