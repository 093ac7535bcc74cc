//! Constants used throughout the droid core
//! This module contains the device identity the scanner and discovery steps
//! filter on.

use uuid::Uuid;

/// The advertised name of the droid control hub
pub const DROID_NAME: &str = "w32 ControlHub";

/// The UUID of the control hub service
pub const UUID_DROID_SERVICE: Uuid = Uuid::from_u128(0xd9d9e9e0_aa4e_4797_8151_cb41cedaf2ad);

/// The UUID of the command characteristic (bitsnap)
pub const UUID_CONTROL_CHAR: Uuid = Uuid::from_u128(0xd9d9e9e1_aa4e_4797_8151_cb41cedaf2ad);

/// The UUID of the board control characteristic
pub const UUID_BOARD_CONTROL_CHAR: Uuid = Uuid::from_u128(0xd9d9e9e2_aa4e_4797_8151_cb41cedaf2ad);

/// The UUID of the audio upload characteristic
pub const UUID_AUDIO_UPLOAD_CHAR: Uuid = Uuid::from_u128(0xd9d9e9e3_aa4e_4797_8151_cb41cedaf2ad);

