//! Input mapping for the droid

pub mod stick;

pub use stick::{StickInputMapper, StickOutput, StickSample};
