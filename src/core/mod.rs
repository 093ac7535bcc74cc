//! Core functionality for driving the droid
//! Wire protocol, Bluetooth lifecycle, input tracking and the operator that
//! ties them together.

pub mod bluetooth;
pub mod input;
pub mod operator;
pub mod protocol;

// Re-export commonly used types
pub use bluetooth::{ConnectionState, Transport};
pub use input::{InputEvent, InputSample, InputState};
pub use operator::DroidOperator;
