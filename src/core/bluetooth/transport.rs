//! Radio transport capability
//! The droid core drives a peripheral only through this trait, so the
//! connection lifecycle and command path never see platform Bluetooth types.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::bluetooth::types::{
    Advertisement, CharacteristicId, DiscoveredCharacteristic, PeerId, ServiceId,
};
use crate::error::TransportError;

/// Lazy, possibly endless sequence of advertisement sightings
pub type AdvertisementStream = BoxStream<'static, Advertisement>;

/// Values notified on one characteristic
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

/// Scan, connect, discover, subscribe and write primitives of a radio link
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start scanning for peripherals advertising any of `service_filter`
    async fn scan(&self, service_filter: &[Uuid]) -> Result<AdvertisementStream, TransportError>;

    /// Stop an ongoing scan. Must not block and must be idempotent.
    fn stop_scan(&self) -> Result<(), TransportError>;

    async fn connect(&self, peer: &PeerId) -> Result<(), TransportError>;

    async fn disconnect(&self, peer: &PeerId) -> Result<(), TransportError>;

    async fn discover_services(
        &self,
        peer: &PeerId,
        service_filter: &[Uuid],
    ) -> Result<Vec<ServiceId>, TransportError>;

    async fn discover_characteristics(
        &self,
        service: &ServiceId,
        characteristic_filter: &[Uuid],
    ) -> Result<Vec<DiscoveredCharacteristic>, TransportError>;

    /// Enable notifications and return the value stream of `characteristic`
    async fn subscribe(
        &self,
        characteristic: &CharacteristicId,
    ) -> Result<NotificationStream, TransportError>;

    /// Acknowledged write of `bytes` to `characteristic`
    async fn write(
        &self,
        characteristic: &CharacteristicId,
        bytes: &[u8],
    ) -> Result<(), TransportError>;
}

/// Adapt a channel receiver into a boxed stream
pub(crate) fn receiver_stream<T: Send + 'static>(
    rx: mpsc::UnboundedReceiver<T>,
) -> BoxStream<'static, T> {
    Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}
