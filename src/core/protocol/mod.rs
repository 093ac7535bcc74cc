//! Droid wire protocol
//! Checksum, frame layout and command encoding shared by the outbound
//! command path and the inbound telemetry path.

mod checksum;
mod command;
mod frame;

pub use checksum::{checksum, checksum_bytes};
pub use command::{
    DroidCommand, DroidSound, MovementAction, Opcode, Rgb, TurnAction, WHEEL_END_VALUE, WheelRole,
};
pub use frame::{
    Frame, FrameError, MAX_OPCODE, MAX_PAYLOAD_SIZE, MIN_TELEMETRY_SIZE, TELEMETRY_HEADER,
    TELEMETRY_OPCODE, decode, encode,
};
