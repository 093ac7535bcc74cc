//! Defines shared data structures for the Bluetooth module.

use std::fmt;

use uuid::Uuid;

use crate::core::bluetooth::constants::{
    UUID_AUDIO_UPLOAD_CHAR, UUID_BOARD_CONTROL_CHAR, UUID_CONTROL_CHAR,
};

/// Transport handle of a discovered peripheral
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(pub String);

/// Transport handle of a discovered service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceId(pub String);

/// Transport handle of a discovered characteristic
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharacteristicId(pub String);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CharacteristicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One sighting of an advertising peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub peer: PeerId,
    /// Advertised local name, if the advertisement carried one
    pub name: Option<String>,
}

/// A characteristic reported by service discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCharacteristic {
    pub id: CharacteristicId,
    pub uuid: Uuid,
}

/// Logical role of a control hub characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicRole {
    /// Command frames are written here
    Control,
    AudioUpload,
    BoardControl,
}

impl CharacteristicRole {
    pub const ALL: [CharacteristicRole; 3] = [
        CharacteristicRole::AudioUpload,
        CharacteristicRole::Control,
        CharacteristicRole::BoardControl,
    ];

    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Control => UUID_CONTROL_CHAR,
            Self::AudioUpload => UUID_AUDIO_UPLOAD_CHAR,
            Self::BoardControl => UUID_BOARD_CONTROL_CHAR,
        }
    }

    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.uuid() == uuid)
    }

    /// UUIDs of every known role, used as the discovery filter
    pub fn uuids() -> Vec<Uuid> {
        Self::ALL.iter().map(CharacteristicRole::uuid).collect()
    }
}

/// Characteristic handles retained from discovery, keyed by role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacteristicSet {
    control: Option<CharacteristicId>,
    audio_upload: Option<CharacteristicId>,
    board_control: Option<CharacteristicId>,
}

impl CharacteristicSet {
    pub fn insert(&mut self, role: CharacteristicRole, id: CharacteristicId) {
        *self.slot_mut(role) = Some(id);
    }

    pub fn get(&self, role: CharacteristicRole) -> Option<&CharacteristicId> {
        match role {
            CharacteristicRole::Control => self.control.as_ref(),
            CharacteristicRole::AudioUpload => self.audio_upload.as_ref(),
            CharacteristicRole::BoardControl => self.board_control.as_ref(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        CharacteristicRole::ALL
            .iter()
            .all(|role| self.get(*role).is_none())
    }

    fn slot_mut(&mut self, role: CharacteristicRole) -> &mut Option<CharacteristicId> {
        match role {
            CharacteristicRole::Control => &mut self.control,
            CharacteristicRole::AudioUpload => &mut self.audio_upload,
            CharacteristicRole::BoardControl => &mut self.board_control,
        }
    }
}

/// A value pushed by the droid on a subscribed characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub role: CharacteristicRole,
    pub value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_lookup() {
        for role in CharacteristicRole::ALL {
            assert_eq!(CharacteristicRole::from_uuid(role.uuid()), Some(role));
        }
        assert_eq!(CharacteristicRole::from_uuid(Uuid::nil()), None);
        assert_eq!(CharacteristicRole::uuids().len(), 3);
    }

    #[test]
    fn test_characteristic_set() {
        let mut set = CharacteristicSet::default();
        assert!(set.is_empty());

        set.insert(CharacteristicRole::Control, CharacteristicId("c".into()));
        assert_eq!(
            set.get(CharacteristicRole::Control),
            Some(&CharacteristicId("c".into()))
        );
        assert_eq!(set.get(CharacteristicRole::BoardControl), None);

        set.clear();
        assert!(set.is_empty());
    }
}
