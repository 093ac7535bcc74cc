//! Connection state machine
//!
//! The lifecycle of the single droid connection is a function of the current
//! state and a connection event. Events are produced by the connection
//! manager from caller intents and transport results; nothing else changes
//! the state.

use crate::core::bluetooth::types::PeerId;
use crate::error::DroidError;

/// Connection states
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConnectionState {
    /// No link, nothing in progress
    #[default]
    Disconnected,
    /// Waiting for a matching advertisement
    Scanning,
    /// Matching peripheral sighted, scan stopped
    Found(PeerId),
    /// Link being established
    Connecting,
    DiscoveringServices,
    DiscoveringCharacteristics,
    /// Enabling notifications on discovered characteristics
    Subscribing,
    /// Commands may be written
    Ready,
    /// Link being torn down
    Disconnecting,
    /// A lifecycle step failed; a fresh connect restarts from scanning
    Failed(DroidError),
}

/// Events that trigger connection state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    // Caller intents
    ConnectRequested,
    DisconnectRequested,
    /// Caller abandoned the scan
    ScanCancelled,

    // Transport results
    PeerFound(PeerId),
    LinkRequested,
    LinkUp,
    ServicesDiscovered,
    CharacteristicsDiscovered,
    /// Every subscription was attempted, successful or not
    SubscriptionsSettled,
    LinkDown,

    Failed(DroidError),
}

impl ConnectionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConnectionState::Failed(_))
    }

    /// Check if a link may exist or is being established
    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Found(_)
                | ConnectionState::Connecting
                | ConnectionState::DiscoveringServices
                | ConnectionState::DiscoveringCharacteristics
                | ConnectionState::Subscribing
        )
    }

    /// Process an event and return the next state
    pub fn transition(self, event: ConnectionEvent) -> Self {
        use ConnectionEvent as E;
        use ConnectionState::*;

        match (self, event) {
            (Disconnected | Failed(_), E::ConnectRequested) => Scanning,

            (Scanning, E::PeerFound(peer)) => Found(peer),
            (Scanning, E::ScanCancelled) => Disconnected,

            (Found(_), E::LinkRequested) => Connecting,
            (Connecting, E::LinkUp) => DiscoveringServices,
            (DiscoveringServices, E::ServicesDiscovered) => DiscoveringCharacteristics,
            (DiscoveringCharacteristics, E::CharacteristicsDiscovered) => Subscribing,
            (Subscribing, E::SubscriptionsSettled) => Ready,

            (state, E::DisconnectRequested) if state.is_connecting() => Disconnecting,
            (Ready | Failed(_), E::DisconnectRequested) => Disconnecting,
            (Disconnecting, E::LinkDown) => Disconnected,

            (Disconnected, E::Failed(_)) => Disconnected,
            (_, E::Failed(reason)) => Failed(reason),

            // Default: stay in current state
            (state, _) => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> PeerId {
        PeerId("droid".into())
    }

    #[test]
    fn test_full_lifecycle() {
        let steps = [
            (ConnectionEvent::ConnectRequested, ConnectionState::Scanning),
            (
                ConnectionEvent::PeerFound(peer()),
                ConnectionState::Found(peer()),
            ),
            (ConnectionEvent::LinkRequested, ConnectionState::Connecting),
            (ConnectionEvent::LinkUp, ConnectionState::DiscoveringServices),
            (
                ConnectionEvent::ServicesDiscovered,
                ConnectionState::DiscoveringCharacteristics,
            ),
            (
                ConnectionEvent::CharacteristicsDiscovered,
                ConnectionState::Subscribing,
            ),
            (ConnectionEvent::SubscriptionsSettled, ConnectionState::Ready),
            (
                ConnectionEvent::DisconnectRequested,
                ConnectionState::Disconnecting,
            ),
            (ConnectionEvent::LinkDown, ConnectionState::Disconnected),
        ];

        let mut state = ConnectionState::default();
        for (event, expected) in steps {
            state = state.transition(event);
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn test_failure_from_any_active_state() {
        let states = [
            ConnectionState::Scanning,
            ConnectionState::Found(peer()),
            ConnectionState::Connecting,
            ConnectionState::DiscoveringServices,
            ConnectionState::DiscoveringCharacteristics,
            ConnectionState::Subscribing,
            ConnectionState::Ready,
            ConnectionState::Disconnecting,
        ];

        for state in states {
            let next = state.transition(ConnectionEvent::Failed(DroidError::NoDiscoverServices));
            assert_eq!(next, ConnectionState::Failed(DroidError::NoDiscoverServices));
        }
    }

    #[test]
    fn test_failed_recovers_only_through_connect() {
        let failed = ConnectionState::Failed(DroidError::NoScanData);

        assert_eq!(
            failed.clone().transition(ConnectionEvent::LinkUp),
            failed.clone()
        );
        assert_eq!(
            failed.transition(ConnectionEvent::ConnectRequested),
            ConnectionState::Scanning
        );
    }

    #[test]
    fn test_scan_cancel_returns_to_disconnected() {
        let next = ConnectionState::Scanning.transition(ConnectionEvent::ScanCancelled);
        assert_eq!(next, ConnectionState::Disconnected);
    }

    #[test]
    fn test_out_of_order_events_are_ignored() {
        assert_eq!(
            ConnectionState::Disconnected.transition(ConnectionEvent::SubscriptionsSettled),
            ConnectionState::Disconnected
        );
        assert_eq!(
            ConnectionState::Ready.transition(ConnectionEvent::ConnectRequested),
            ConnectionState::Ready
        );
        assert_eq!(
            ConnectionState::Scanning.transition(ConnectionEvent::LinkUp),
            ConnectionState::Scanning
        );
        assert_eq!(
            ConnectionState::Disconnected.transition(ConnectionEvent::Failed(DroidError::NoScanData)),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_disconnect_midway_through_discovery() {
        let next = ConnectionState::DiscoveringCharacteristics
            .transition(ConnectionEvent::DisconnectRequested);
        assert_eq!(next, ConnectionState::Disconnecting);

        let next = ConnectionState::Scanning.transition(ConnectionEvent::DisconnectRequested);
        assert_eq!(next, ConnectionState::Scanning);
    }
}
