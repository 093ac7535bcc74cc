//! Bluetooth functionality for the droid
//! This module handles all bluetooth operations including scanning,
//! connecting, and exchanging frames with the droid control hub.

mod bluest_transport;
mod commands;
mod connection;
mod constants;
#[cfg(test)]
pub(crate) mod mock;
mod state;
mod transport;
mod types;

// Re-export types that should be publicly accessible
pub use bluest_transport::BluestTransport;
pub use commands::CommandWriter;
pub use connection::{ConnectionManager, ControlLease};
pub use constants::*;
pub use state::{ConnectionEvent, ConnectionState};
pub use transport::{AdvertisementStream, NotificationStream, Transport};
pub use types::{
    Advertisement, CharacteristicId, CharacteristicRole, CharacteristicSet,
    DiscoveredCharacteristic, Notification, PeerId, ServiceId,
};
