//! Droid command encoding
//! This module maps the commands a droid understands onto (opcode, payload)
//! pairs, including the quantization of speeds and steering angles.

use serde::{Deserialize, Serialize};

use super::frame::{Frame, FrameError};
use crate::error::DroidError;

/// Command opcodes understood by the control hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    ChangeLedColor = 9,
    MoveWheel = 10,
    PlaySound = 15,
}

/// First payload byte of a `MoveWheel` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WheelRole {
    Turn = 1,
    Move = 2,
}

/// Wheel value that ends the current movement or steering
pub const WHEEL_END_VALUE: u8 = 128;

/// Drive axis action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MovementAction {
    /// Forward, speed in 0.0..=1.0
    Go(f64),
    /// Backward, speed in 0.0..=1.0
    Back(f64),
    End,
}

impl MovementAction {
    /// Quantized wheel value.
    ///
    /// Speeds that are not strictly positive encode as 0, larger than 1.0 as 1.0.
    pub fn value(&self) -> u8 {
        match *self {
            Self::Go(speed) => {
                if !(speed > 0.0) {
                    return 0;
                }
                let speed = speed.min(1.0);
                (127.0 + (128.0 * speed).round()) as u8
            }
            Self::Back(speed) => {
                if !(speed > 0.0) {
                    return 0;
                }
                let speed = speed.min(1.0);
                (128.0 - (128.0 * speed).round()) as u8
            }
            Self::End => WHEEL_END_VALUE,
        }
    }
}

/// Steering axis action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TurnAction {
    /// Wheel angle in degrees: 0..90 steers right, 90..180 steers left
    Turn(f64),
    End,
}

impl TurnAction {
    /// Quantized wheel value.
    ///
    /// Angles that are not strictly positive encode as 0, larger than 180 as 180.
    pub fn value(&self) -> u8 {
        match *self {
            Self::Turn(degree) => {
                if !(degree > 0.0) {
                    return 0;
                }
                let degree = degree.min(180.0);
                (degree / 180.0 * 255.0).round() as u8
            }
            Self::End => WHEEL_END_VALUE,
        }
    }
}

/// One of the 22 built-in droid sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DroidSound(u8);

impl DroidSound {
    pub const COUNT: u8 = 22;

    pub fn new(index: u8) -> Result<Self, DroidError> {
        if index < Self::COUNT {
            Ok(Self(index))
        } else {
            Err(DroidError::InvalidSound(index))
        }
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    /// Every built-in sound, in index order
    pub fn all() -> impl Iterator<Item = DroidSound> {
        (0..Self::COUNT).map(DroidSound)
    }
}

impl TryFrom<u8> for DroidSound {
    type Error = DroidError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

/// Body LED colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Colour from a `0xRRGGBB` value; bits above 24 are ignored
    pub const fn from_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
        }
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

/// Commands that can be sent to the droid
#[derive(Debug, Clone, PartialEq)]
pub enum DroidCommand {
    Move(MovementAction),
    Turn(TurnAction),
    SetLed(Rgb),
    PlaySound(DroidSound),
    /// Arbitrary command for hardware this crate has no typed command for
    Raw { opcode: u8, payload: Vec<u8> },
}

impl DroidCommand {
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Move(_) | Self::Turn(_) => Opcode::MoveWheel as u8,
            Self::SetLed(_) => Opcode::ChangeLedColor as u8,
            Self::PlaySound(_) => Opcode::PlaySound as u8,
            Self::Raw { opcode, .. } => *opcode,
        }
    }

    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::Move(action) => vec![WheelRole::Move as u8, action.value()],
            Self::Turn(action) => vec![WheelRole::Turn as u8, action.value()],
            Self::SetLed(color) => vec![color.r, color.g, color.b],
            Self::PlaySound(sound) => vec![sound.index()],
            Self::Raw { payload, .. } => payload.clone(),
        }
    }

    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        Frame::new(self.opcode(), &self.payload())
    }
}

impl From<MovementAction> for DroidCommand {
    fn from(action: MovementAction) -> Self {
        Self::Move(action)
    }
}

impl From<TurnAction> for DroidCommand {
    fn from(action: TurnAction) -> Self {
        Self::Turn(action)
    }
}
