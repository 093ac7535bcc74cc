//! Bluetooth transport backed by bluest
//! Platform handles are kept here and exposed to the droid core only as
//! string identifiers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bluest::{Adapter, Characteristic, Device, Service};
use futures_util::StreamExt;
use log::{debug, error, info};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::transport::{
    AdvertisementStream, NotificationStream, Transport, receiver_stream,
};
use crate::core::bluetooth::types::{
    Advertisement, CharacteristicId, DiscoveredCharacteristic, PeerId, ServiceId,
};
use crate::error::TransportError;

impl From<bluest::Error> for TransportError {
    fn from(e: bluest::Error) -> Self {
        TransportError::Backend(e.to_string())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct BluestTransport {
    adapter: Adapter,
    devices: Arc<Mutex<HashMap<String, Device>>>,
    services: Mutex<HashMap<String, Service>>,
    characteristics: Mutex<HashMap<String, Characteristic>>,
    scan_cancel: Mutex<CancellationToken>,
    notify_cancel: Mutex<CancellationToken>,
}

impl BluestTransport {
    /// Open the default adapter and wait for it to become available
    pub async fn new() -> Result<Self, TransportError> {
        let adapter = Adapter::default()
            .await
            .ok_or(TransportError::AdapterUnavailable)?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available");

        Ok(Self {
            adapter,
            devices: Arc::new(Mutex::new(HashMap::new())),
            services: Mutex::new(HashMap::new()),
            characteristics: Mutex::new(HashMap::new()),
            scan_cancel: Mutex::new(CancellationToken::new()),
            notify_cancel: Mutex::new(CancellationToken::new()),
        })
    }

    fn device(&self, peer: &PeerId) -> Result<Device, TransportError> {
        lock(&self.devices)
            .get(&peer.0)
            .cloned()
            .ok_or_else(|| TransportError::UnknownPeer(peer.0.clone()))
    }

    fn service(&self, service: &ServiceId) -> Result<Service, TransportError> {
        lock(&self.services)
            .get(&service.0)
            .cloned()
            .ok_or_else(|| TransportError::UnknownService(service.0.clone()))
    }

    fn characteristic(
        &self,
        characteristic: &CharacteristicId,
    ) -> Result<Characteristic, TransportError> {
        lock(&self.characteristics)
            .get(&characteristic.0)
            .cloned()
            .ok_or_else(|| TransportError::UnknownCharacteristic(characteristic.0.clone()))
    }

    async fn scan_task(
        adapter: Adapter,
        filter: Vec<Uuid>,
        devices: Arc<Mutex<HashMap<String, Device>>>,
        tx: mpsc::UnboundedSender<Advertisement>,
        started: oneshot::Sender<Result<(), TransportError>>,
        cancel_token: CancellationToken,
    ) {
        info!("Starting bluetooth scan");
        let mut scan_stream = match adapter.scan(&filter).await {
            Ok(stream) => {
                let _ = started.send(Ok(()));
                stream
            }
            Err(e) => {
                error!("Failed to start scan: {}", e);
                let _ = started.send(Err(e.into()));
                return;
            }
        };

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(discovered) => {
                            let id = discovered.device.id().to_string();
                            debug!(
                                "Found device - ID: {}, Name: {:?}, RSSI: {:?}",
                                id, discovered.adv_data.local_name, discovered.rssi
                            );
                            lock(&devices).insert(id.clone(), discovered.device);

                            let sighting = Advertisement {
                                peer: PeerId(id),
                                name: discovered.adv_data.local_name,
                            };
                            if tx.send(sighting).is_err() {
                                break;
                            }
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    }
                }
                _ = cancel_token.cancelled() => {
                    info!("Scan task was cancelled.");
                    break;
                }
            }
        }
    }

    async fn notification_task(
        characteristic: Characteristic,
        tx: mpsc::UnboundedSender<Vec<u8>>,
        enabled: oneshot::Sender<Result<(), TransportError>>,
        cancel_token: CancellationToken,
    ) {
        let mut notification_stream = match characteristic.notify().await {
            Ok(stream) => {
                let _ = enabled.send(Ok(()));
                stream
            }
            Err(e) => {
                let _ = enabled.send(Err(e.into()));
                return;
            }
        };

        loop {
            tokio::select! {
                result = notification_stream.next() => {
                    match result {
                        Some(Ok(value)) => {
                            if tx.send(value).is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            error!("Error in notification stream: {}", e);
                            break;
                        }
                        None => break,
                    }
                }
                _ = cancel_token.cancelled() => break,
            }
        }
        debug!("Notification task for {} ended", characteristic.uuid());
    }
}

#[async_trait]
impl Transport for BluestTransport {
    async fn scan(&self, service_filter: &[Uuid]) -> Result<AdvertisementStream, TransportError> {
        let cancel_token = {
            let mut current = lock(&self.scan_cancel);
            current.cancel();
            *current = CancellationToken::new();
            current.clone()
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let (started_tx, started_rx) = oneshot::channel();
        tokio::spawn(Self::scan_task(
            self.adapter.clone(),
            service_filter.to_vec(),
            self.devices.clone(),
            tx,
            started_tx,
            cancel_token,
        ));

        started_rx
            .await
            .map_err(|_| TransportError::Backend("scan task ended before starting".into()))??;
        info!("Device scan task started.");
        Ok(receiver_stream(rx))
    }

    fn stop_scan(&self) -> Result<(), TransportError> {
        lock(&self.scan_cancel).cancel();
        Ok(())
    }

    async fn connect(&self, peer: &PeerId) -> Result<(), TransportError> {
        let device = self.device(peer)?;
        if device.is_connected().await {
            info!("Device {} already connected", peer);
            return Ok(());
        }
        self.adapter.connect_device(&device).await?;
        Ok(())
    }

    async fn disconnect(&self, peer: &PeerId) -> Result<(), TransportError> {
        {
            let mut current = lock(&self.notify_cancel);
            current.cancel();
            *current = CancellationToken::new();
        }

        let device = self.device(peer)?;
        let prefix = format!("{}/", peer);
        lock(&self.services).retain(|key, _| !key.starts_with(&prefix));
        lock(&self.characteristics).retain(|key, _| !key.starts_with(&prefix));

        if device.is_connected().await {
            self.adapter.disconnect_device(&device).await?;
        } else {
            info!("Device {} not connected", peer);
        }
        Ok(())
    }

    async fn discover_services(
        &self,
        peer: &PeerId,
        service_filter: &[Uuid],
    ) -> Result<Vec<ServiceId>, TransportError> {
        let device = self.device(peer)?;
        let services = if service_filter.is_empty() {
            device.discover_services().await?
        } else {
            let mut services = Vec::new();
            for uuid in service_filter {
                services.extend(device.discover_services_with_uuid(*uuid).await?);
            }
            services
        };

        let mut known = lock(&self.services);
        Ok(services
            .into_iter()
            .map(|service| {
                let id = format!("{}/{}", peer, service.uuid());
                known.insert(id.clone(), service);
                ServiceId(id)
            })
            .collect())
    }

    async fn discover_characteristics(
        &self,
        service: &ServiceId,
        characteristic_filter: &[Uuid],
    ) -> Result<Vec<DiscoveredCharacteristic>, TransportError> {
        let handle = self.service(service)?;
        let characteristics = handle.discover_characteristics().await?;

        let mut known = lock(&self.characteristics);
        Ok(characteristics
            .into_iter()
            .filter(|c| characteristic_filter.is_empty() || characteristic_filter.contains(&c.uuid()))
            .map(|characteristic| {
                let uuid = characteristic.uuid();
                let id = format!("{}/{}", service, uuid);
                known.insert(id.clone(), characteristic);
                DiscoveredCharacteristic {
                    id: CharacteristicId(id),
                    uuid,
                }
            })
            .collect())
    }

    async fn subscribe(
        &self,
        characteristic: &CharacteristicId,
    ) -> Result<NotificationStream, TransportError> {
        let handle = self.characteristic(characteristic)?;
        let cancel_token = lock(&self.notify_cancel).child_token();

        let (tx, rx) = mpsc::unbounded_channel();
        let (enabled_tx, enabled_rx) = oneshot::channel();
        tokio::spawn(Self::notification_task(handle, tx, enabled_tx, cancel_token));

        enabled_rx.await.map_err(|_| {
            TransportError::Backend("notification task ended before enabling".into())
        })??;
        Ok(receiver_stream(rx))
    }

    async fn write(
        &self,
        characteristic: &CharacteristicId,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        let handle = self.characteristic(characteristic)?;
        handle.write(bytes).await?;
        Ok(())
    }
}
