//! In-memory transport for tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::bluetooth::constants::{DROID_NAME, UUID_DROID_SERVICE};
use crate::core::bluetooth::transport::{
    AdvertisementStream, NotificationStream, Transport, receiver_stream,
};
use crate::core::bluetooth::types::{
    Advertisement, CharacteristicId, CharacteristicRole, DiscoveredCharacteristic, PeerId,
    ServiceId,
};
use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Scan,
    StopScan,
    Connect(PeerId),
    Disconnect(PeerId),
    DiscoverServices(PeerId),
    DiscoverCharacteristics(ServiceId),
    Subscribe(CharacteristicId),
    /// Recorded when a write completes
    Write(CharacteristicId),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WriteEvent {
    Begin(CharacteristicId, Vec<u8>),
    End(Vec<u8>),
}

pub(crate) struct MockTransport {
    pub advertisements: Vec<Advertisement>,
    pub services: Vec<ServiceId>,
    pub characteristics: Vec<DiscoveredCharacteristic>,
    pub connect_delay: Duration,
    pub write_delay: Duration,
    pub fail_subscribe: Option<CharacteristicId>,
    calls: Mutex<Vec<Call>>,
    writes: Mutex<Vec<WriteEvent>>,
    notifiers: Mutex<Vec<(CharacteristicId, mpsc::UnboundedSender<Vec<u8>>)>>,
}

impl MockTransport {
    /// A droid that advertises after one unrelated peripheral
    pub fn droid() -> Self {
        let characteristics = CharacteristicRole::ALL
            .iter()
            .map(|role| DiscoveredCharacteristic {
                id: CharacteristicId(format!("{:?}", role)),
                uuid: role.uuid(),
            })
            .collect();

        Self {
            advertisements: vec![
                Advertisement {
                    peer: PeerId("speaker".into()),
                    name: Some("JBL Flip".into()),
                },
                Advertisement {
                    peer: PeerId("droid".into()),
                    name: Some(DROID_NAME.into()),
                },
            ],
            services: vec![ServiceId(format!("droid/{}", UUID_DROID_SERVICE))],
            characteristics,
            connect_delay: Duration::ZERO,
            write_delay: Duration::ZERO,
            fail_subscribe: None,
            calls: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            notifiers: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<WriteEvent> {
        self.writes.lock().unwrap().clone()
    }

    /// Bytes of every completed write, in order
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter_map(|event| match event {
                WriteEvent::End(bytes) => Some(bytes),
                WriteEvent::Begin(..) => None,
            })
            .collect()
    }

    /// Push a value to every subscriber of `characteristic`
    pub fn notify(&self, characteristic: &CharacteristicId, value: &[u8]) {
        for (id, tx) in self.notifiers.lock().unwrap().iter() {
            if id == characteristic {
                let _ = tx.send(value.to_vec());
            }
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn scan(&self, _service_filter: &[Uuid]) -> Result<AdvertisementStream, TransportError> {
        self.record(Call::Scan);
        let sightings = futures_util::stream::iter(self.advertisements.clone())
            .chain(futures_util::stream::pending());
        Ok(sightings.boxed())
    }

    fn stop_scan(&self) -> Result<(), TransportError> {
        self.record(Call::StopScan);
        Ok(())
    }

    async fn connect(&self, peer: &PeerId) -> Result<(), TransportError> {
        self.record(Call::Connect(peer.clone()));
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        Ok(())
    }

    async fn disconnect(&self, peer: &PeerId) -> Result<(), TransportError> {
        self.record(Call::Disconnect(peer.clone()));
        self.notifiers.lock().unwrap().clear();
        Ok(())
    }

    async fn discover_services(
        &self,
        peer: &PeerId,
        _service_filter: &[Uuid],
    ) -> Result<Vec<ServiceId>, TransportError> {
        self.record(Call::DiscoverServices(peer.clone()));
        Ok(self.services.clone())
    }

    async fn discover_characteristics(
        &self,
        service: &ServiceId,
        _characteristic_filter: &[Uuid],
    ) -> Result<Vec<DiscoveredCharacteristic>, TransportError> {
        self.record(Call::DiscoverCharacteristics(service.clone()));
        Ok(self.characteristics.clone())
    }

    async fn subscribe(
        &self,
        characteristic: &CharacteristicId,
    ) -> Result<NotificationStream, TransportError> {
        self.record(Call::Subscribe(characteristic.clone()));
        if self.fail_subscribe.as_ref() == Some(characteristic) {
            return Err(TransportError::Backend("notify refused".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.notifiers
            .lock()
            .unwrap()
            .push((characteristic.clone(), tx));
        Ok(receiver_stream(rx))
    }

    async fn write(
        &self,
        characteristic: &CharacteristicId,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        self.writes
            .lock()
            .unwrap()
            .push(WriteEvent::Begin(characteristic.clone(), bytes.to_vec()));
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        self.writes
            .lock()
            .unwrap()
            .push(WriteEvent::End(bytes.to_vec()));
        self.record(Call::Write(characteristic.clone()));
        Ok(())
    }
}
