//! DroidKit library
//! Drive a w32 ControlHub wheeled droid over Bluetooth LE.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod mapping;

pub use config::DroidConfig;
pub use crate::core::protocol::{DroidCommand, DroidSound, MovementAction, Rgb, TurnAction};
pub use crate::core::{ConnectionState, DroidOperator, InputEvent, InputSample};
pub use error::{DroidError, TransportError};
pub use mapping::{StickInputMapper, StickSample};
