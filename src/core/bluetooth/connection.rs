//! Droid connection handling
//! This module drives the transport through scan, connect, discovery and
//! subscription, and tears the link down again. Every step is reported to the
//! connection state machine, and the resulting state is published on a watch
//! channel.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, error, info, trace, warn};
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::DroidConfig;
use crate::core::bluetooth::constants::UUID_DROID_SERVICE;
use crate::core::bluetooth::state::{ConnectionEvent, ConnectionState};
use crate::core::bluetooth::transport::{NotificationStream, Transport};
use crate::core::bluetooth::types::{
    CharacteristicId, CharacteristicRole, CharacteristicSet, DiscoveredCharacteristic,
    Notification, PeerId,
};
use crate::error::DroidError;

/// Handles retained while a peer is known
#[derive(Default)]
struct Session {
    peer: Option<PeerId>,
    characteristics: CharacteristicSet,
    /// Stops the notification forwarders of this session
    notifications: Option<CancellationToken>,
}

/// Connection manager for the droid
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    device_name: String,
    scan_timeout: Option<Duration>,
    state: watch::Sender<ConnectionState>,
    session: RwLock<Session>,
    /// Serializes connect and disconnect
    lifecycle: Mutex<()>,
    /// Shared by in-flight commands, taken exclusively to leave `Ready`
    commands: tokio::sync::RwLock<()>,
    notification_tx: mpsc::UnboundedSender<Notification>,
}

impl ConnectionManager {
    /// Creates a new ConnectionManager. Notifications from every subscribed
    /// characteristic are forwarded to `notification_tx`.
    pub fn new(
        transport: Arc<dyn Transport>,
        config: &DroidConfig,
        notification_tx: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            device_name: config.device_name.clone(),
            scan_timeout: config.scan_timeout(),
            state,
            session: RwLock::new(Session::default()),
            lifecycle: Mutex::new(()),
            commands: tokio::sync::RwLock::new(()),
            notification_tx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every connection state change
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn peer(&self) -> Option<PeerId> {
        self.session().peer.clone()
    }

    pub fn characteristic(&self, role: CharacteristicRole) -> Option<CharacteristicId> {
        self.session().characteristics.get(role).cloned()
    }

    /// Returns the handle command frames are written to.
    ///
    /// Fails with `NoScanData` while no droid has been found and with
    /// `NoCharacteristic` until the connection is ready.
    pub fn control_characteristic(&self) -> Result<CharacteristicId, DroidError> {
        let ready = self.state.borrow().is_ready();
        let session = self.session();
        if session.peer.is_none() {
            return Err(DroidError::NoScanData);
        }
        if !ready {
            return Err(DroidError::NoCharacteristic);
        }
        session
            .characteristics
            .get(CharacteristicRole::Control)
            .cloned()
            .ok_or(DroidError::NoCharacteristic)
    }

    /// Control characteristic plus a guard that keeps the connection `Ready`
    /// until the lease is dropped. `disconnect` waits for outstanding leases.
    pub async fn lease_control(&self) -> Result<ControlLease<'_>, DroidError> {
        let guard = self.commands.read().await;
        let characteristic = self.control_characteristic()?;
        Ok(ControlLease {
            characteristic,
            _guard: guard,
        })
    }

    /// Scan for the droid, connect, discover and subscribe.
    ///
    /// Dropping the returned future while scanning stops the scan and returns
    /// to `Disconnected`. Dropping it later leaves `Failed(Cancelled)`.
    pub async fn connect(&self) -> Result<(), DroidError> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.state().is_ready() {
            info!("Droid already connected.");
            return Ok(());
        }

        if let Some(peer) = self.reset_session() {
            info!("Closing stale link to {} before reconnecting", peer);
            if let Err(e) = self.transport.disconnect(&peer).await {
                warn!("Failed to close stale link to {}: {}", peer, e);
            }
        }
        self.apply(ConnectionEvent::ConnectRequested);

        let mut attempt = ConnectAttempt {
            manager: self,
            finished: false,
        };
        let result = self.establish().await;
        attempt.disarm();

        match result {
            Ok(()) => {
                info!("Connection and setup process completed successfully");
                Ok(())
            }
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
                self.apply(ConnectionEvent::Failed(e.clone()));
                Err(e)
            }
        }
    }

    /// Disconnect from the droid and forget every discovered handle
    pub async fn disconnect(&self) -> Result<(), DroidError> {
        let _lifecycle = self.lifecycle.lock().await;
        let peer = self.session().peer.clone().ok_or(DroidError::NoScanData)?;

        let _commands = self.commands.write().await;
        self.apply(ConnectionEvent::DisconnectRequested);
        let notifications = self.session_mut().notifications.take();
        if let Some(token) = notifications {
            token.cancel();
        }

        info!("Disconnecting from device {}", peer);
        let result = self.transport.disconnect(&peer).await;
        {
            let mut session = self.session_mut();
            session.characteristics.clear();
            session.peer = None;
            info!("Session cleared, releasing device and characteristic handles.");
        }

        match result {
            Ok(()) => {
                self.apply(ConnectionEvent::LinkDown);
                info!("Successfully disconnected");
                Ok(())
            }
            Err(e) => {
                let e = DroidError::from(e);
                error!("Failed to disconnect from {}: {}", peer, e);
                self.apply(ConnectionEvent::Failed(e.clone()));
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<(), DroidError> {
        let peer = self.scan().await?;
        info!("Found {} with ID: {}", self.device_name, peer);
        self.session_mut().peer = Some(peer.clone());
        self.apply(ConnectionEvent::PeerFound(peer.clone()));

        self.apply(ConnectionEvent::LinkRequested);
        info!("Initiating connection to {}...", peer);
        self.transport.connect(&peer).await?;
        self.apply(ConnectionEvent::LinkUp);

        info!("Connection successful, discovering services...");
        let services = self
            .transport
            .discover_services(&peer, &[UUID_DROID_SERVICE])
            .await?;
        if services.len() > 1 {
            warn!("{} droid services discovered, using the first", services.len());
        }
        let service = services
            .into_iter()
            .next()
            .ok_or(DroidError::NoDiscoverServices)?;
        info!("Found droid service: {}", service);
        self.apply(ConnectionEvent::ServicesDiscovered);

        let discovered = self
            .transport
            .discover_characteristics(&service, &CharacteristicRole::uuids())
            .await?;
        {
            let mut session = self.session_mut();
            for characteristic in &discovered {
                if let Some(role) = CharacteristicRole::from_uuid(characteristic.uuid) {
                    info!("Found {:?} characteristic: {}", role, characteristic.uuid);
                    session.characteristics.insert(role, characteristic.id.clone());
                }
            }
        }
        self.apply(ConnectionEvent::CharacteristicsDiscovered);

        info!("Setting up notifications...");
        self.set_notify_values(&discovered).await;
        self.apply(ConnectionEvent::SubscriptionsSettled);
        Ok(())
    }

    /// Wait for the first advertisement carrying the droid name, then stop scanning
    async fn scan(&self) -> Result<PeerId, DroidError> {
        info!("Starting bluetooth scan for {}", self.device_name);
        let mut sightings = self.transport.scan(&[UUID_DROID_SERVICE]).await?;
        let device_name = self.device_name.as_str();

        let search = async {
            while let Some(sighting) = sightings.next().await {
                debug!(
                    "Found device - ID: {}, Name: {:?}",
                    sighting.peer, sighting.name
                );
                if sighting.name.as_deref() == Some(device_name) {
                    return Some(sighting.peer);
                }
            }
            info!("Bluetooth scan stream has ended.");
            None
        };

        let found = match self.scan_timeout {
            Some(limit) => tokio::time::timeout(limit, search)
                .await
                .unwrap_or_else(|_| {
                    warn!("No {} found within {:?}", device_name, limit);
                    None
                }),
            None => search.await,
        };

        info!("Stopping Bluetooth scan.");
        if let Err(e) = self.transport.stop_scan() {
            warn!("Failed to stop scan: {}", e);
        }
        found.ok_or(DroidError::NoScanData)
    }

    /// Attempt a subscription on every characteristic. Individual failures are
    /// logged and skipped.
    async fn set_notify_values(&self, characteristics: &[DiscoveredCharacteristic]) {
        let token = CancellationToken::new();
        self.session_mut().notifications = Some(token.clone());

        for characteristic in characteristics {
            if let Err(e) = self.set_notify_value(characteristic, &token).await {
                warn!(
                    "Skipping notifications for {}: {}",
                    characteristic.uuid, e
                );
            }
        }
    }

    async fn set_notify_value(
        &self,
        characteristic: &DiscoveredCharacteristic,
        token: &CancellationToken,
    ) -> Result<(), DroidError> {
        let role = CharacteristicRole::from_uuid(characteristic.uuid)
            .ok_or(DroidError::NoBluetoothType(characteristic.uuid))?;
        let values = self.transport.subscribe(&characteristic.id).await?;

        tokio::spawn(forward_notifications(
            role,
            values,
            self.notification_tx.clone(),
            token.child_token(),
        ));
        Ok(())
    }

    /// Clear the session, returning the peer a failed attempt left behind
    fn reset_session(&self) -> Option<PeerId> {
        let mut session = self.session_mut();
        if let Some(token) = session.notifications.take() {
            token.cancel();
        }
        session.characteristics.clear();
        session.peer.take()
    }

    /// Feed one event to the state machine and publish the result
    fn apply(&self, event: ConnectionEvent) -> ConnectionState {
        let current = self.state();
        let next = current.clone().transition(event.clone());
        if next == current {
            warn!("Ignoring {:?} while {:?}", event, current);
        } else {
            debug!("Connection state {:?} -> {:?}", current, next);
            self.state.send_replace(next.clone());
        }
        next
    }

    fn session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_mut(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Write access to the control characteristic of a ready connection
pub struct ControlLease<'a> {
    characteristic: CharacteristicId,
    _guard: tokio::sync::RwLockReadGuard<'a, ()>,
}

impl ControlLease<'_> {
    pub fn characteristic(&self) -> &CharacteristicId {
        &self.characteristic
    }
}

/// Settles the state when a connect future is dropped before finishing
struct ConnectAttempt<'a> {
    manager: &'a ConnectionManager,
    finished: bool,
}

impl ConnectAttempt<'_> {
    fn disarm(&mut self) {
        self.finished = true;
    }
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.manager.state() {
            ConnectionState::Scanning => {
                info!("Connect abandoned while scanning, stopping scan.");
                if let Err(e) = self.manager.transport.stop_scan() {
                    warn!("Failed to stop scan: {}", e);
                }
                self.manager.apply(ConnectionEvent::ScanCancelled);
            }
            state => {
                warn!("Connect abandoned while {:?}", state);
                self.manager
                    .apply(ConnectionEvent::Failed(DroidError::Cancelled));
            }
        }
    }
}

/// Forward values of one characteristic until the stream ends or the session closes
async fn forward_notifications(
    role: CharacteristicRole,
    mut values: NotificationStream,
    tx: mpsc::UnboundedSender<Notification>,
    cancel: CancellationToken,
) {
    info!("Listening for {:?} notifications...", role);
    loop {
        tokio::select! {
            value = values.next() => match value {
                Some(value) => {
                    trace!("Received {:?} data: {:?}", role, value);
                    if tx.send(Notification { role, value }).is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = cancel.cancelled() => break,
        }
    }
    info!("{:?} notification stream ended", role);
}
