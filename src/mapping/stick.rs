//! Joystick mapping for the droid
//! This module turns pointer positions relative to a stick centre into drive
//! and steer actions, emitting each only when it changes.

use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::DroidConfig;
use crate::core::operator::DroidOperator;
use crate::core::protocol::{MovementAction, TurnAction};

/// Narrowest steering angle the mapper emits, either side
const MIN_TURN_DEGREE: f64 = 30.0;
const MAX_TURN_DEGREE: f64 = 150.0;

/// Pointer offset from the stick centre. Negative `y` is forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StickSample {
    pub x: f64,
    pub y: f64,
}

impl StickSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl MovementAction {
    /// Drive action for a stick position. Speed is the distance from the
    /// centre relative to `radius`, in steps of 0.1.
    pub fn from_stick(sample: StickSample, radius: f64) -> Self {
        let distance = sample.x.hypot(sample.y).round();
        let speed = (distance / radius * 10.0).round() / 10.0;

        if sample.y < 0.0 {
            MovementAction::Go(speed)
        } else if sample.y > 0.0 {
            MovementAction::Back(speed)
        } else {
            MovementAction::End
        }
    }
}

impl TurnAction {
    /// Steer action for a stick position, snapped to 10 degree steps within 30..=150
    pub fn from_stick(sample: StickSample) -> Self {
        let (ax, ay) = (sample.x.abs(), sample.y.abs());
        let mut angle = (ay / ax).atan().to_degrees();
        if angle.is_nan() {
            return TurnAction::End;
        }
        if sample.x < 0.0 {
            angle = 180.0 - angle;
        }

        let snapped = (angle / 10.0).round() * 10.0;
        TurnAction::Turn(snapped.clamp(MIN_TURN_DEGREE, MAX_TURN_DEGREE))
    }
}

/// Actions produced by one sample. `None` means unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickOutput {
    pub drive: Option<MovementAction>,
    pub steer: Option<TurnAction>,
}

/// Maps stick samples to de-duplicated drive and steer actions
#[derive(Debug, Clone)]
pub struct StickInputMapper {
    radius: f64,
    last_drive: Option<MovementAction>,
    last_steer: Option<TurnAction>,
}

impl StickInputMapper {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            last_drive: None,
            last_steer: None,
        }
    }

    pub fn from_config(config: &DroidConfig) -> Self {
        Self::new(config.stick_radius)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn map(&mut self, sample: StickSample) -> StickOutput {
        let drive = MovementAction::from_stick(sample, self.radius);
        let steer = TurnAction::from_stick(sample);

        StickOutput {
            drive: emit_changed(&mut self.last_drive, drive),
            steer: emit_changed(&mut self.last_steer, steer),
        }
    }

    /// Forget the emitted actions so the next sample emits on both axes
    pub fn reset(&mut self) {
        self.last_drive = None;
        self.last_steer = None;
    }

    /// Map every sample and send the resulting commands through `operator`.
    ///
    /// A failed command is logged and the stream keeps going.
    pub async fn run<S>(&mut self, operator: &DroidOperator, mut samples: S)
    where
        S: Stream<Item = StickSample> + Unpin,
    {
        info!("Stick mapper started with radius {}", self.radius);
        while let Some(sample) = samples.next().await {
            let output = self.map(sample);
            if let Some(drive) = output.drive {
                debug!("Stick {:?} -> {:?}", sample, drive);
                if let Err(e) = operator.execute(drive.into()).await {
                    warn!("Failed to send {:?}: {}", drive, e);
                }
            }
            if let Some(steer) = output.steer {
                debug!("Stick {:?} -> {:?}", sample, steer);
                if let Err(e) = operator.execute(steer.into()).await {
                    warn!("Failed to send {:?}: {}", steer, e);
                }
            }
        }
        info!("Stick sample stream ended");
    }
}

fn emit_changed<T: Copy + PartialEq>(last: &mut Option<T>, next: T) -> Option<T> {
    if *last == Some(next) {
        return None;
    }
    *last = Some(next);
    Some(next)
}
