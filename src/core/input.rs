//! Droid input handling
//! Tracks the single analog value reported in telemetry frames and publishes
//! value changes and on/off threshold crossings.

use std::sync::{Mutex, PoisonError};

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Raw values strictly above this read as on, strictly below as off
pub const INPUT_THRESHOLD: u8 = 128;

const EVENT_CAPACITY: usize = 64;

/// One reading of the droid input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSample {
    pub raw_value: u8,
}

impl InputSample {
    pub fn new(raw_value: u8) -> Self {
        Self { raw_value }
    }

    pub fn is_on(&self) -> bool {
        self.raw_value > INPUT_THRESHOLD
    }

    /// Raw value scaled to 0.0..=1.0
    pub fn normalized(&self) -> f64 {
        f64::from(self.raw_value) / 255.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    ValueChanged(InputSample),
    StateChanged { is_on: bool },
}

/// What an update changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputTransition {
    pub value_changed: bool,
    pub state_crossed: bool,
}

impl InputTransition {
    fn between(old: InputSample, new: InputSample) -> Self {
        let (old, new) = (old.raw_value, new.raw_value);
        Self {
            value_changed: old != new,
            state_crossed: (old < INPUT_THRESHOLD && new > INPUT_THRESHOLD)
                || (old > INPUT_THRESHOLD && new < INPUT_THRESHOLD),
        }
    }
}

pub struct InputState {
    sample: Mutex<InputSample>,
    events: broadcast::Sender<InputEvent>,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sample: Mutex::new(InputSample::default()),
            events,
        }
    }

    pub fn sample(&self) -> InputSample {
        *self.sample.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InputEvent> {
        self.events.subscribe()
    }

    /// Store a new raw value and publish whatever it changed
    pub fn update(&self, raw_value: u8) -> InputTransition {
        let current = InputSample::new(raw_value);
        let previous = {
            let mut sample = self.sample.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *sample, current)
        };

        let transition = InputTransition::between(previous, current);
        if transition.value_changed {
            debug!("Input value {} -> {}", previous.raw_value, current.raw_value);
            // No receivers is fine
            let _ = self.events.send(InputEvent::ValueChanged(current));
        }
        if transition.state_crossed {
            debug!("Input switched {}", if current.is_on() { "on" } else { "off" });
            let _ = self.events.send(InputEvent::StateChanged {
                is_on: current.is_on(),
            });
        }
        transition
    }
}
