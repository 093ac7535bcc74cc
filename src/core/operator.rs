//! Droid operator
//! This module provides the main interface for driving a droid: connection
//! lifecycle, commands and input events.

use std::sync::Arc;
use std::time::Duration;

use log::{info, trace};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::DroidConfig;
use crate::core::bluetooth::{
    BluestTransport, CommandWriter, ConnectionManager, ConnectionState, Notification, Transport,
};
use crate::core::input::{InputEvent, InputSample, InputState};
use crate::core::protocol::{self, DroidCommand, DroidSound, MovementAction, Rgb, TurnAction};
use crate::error::DroidError;

/// Drives one droid over one transport
pub struct DroidOperator {
    connection: ConnectionManager,
    writer: CommandWriter,
    input: Arc<InputState>,
    telemetry_task: JoinHandle<()>,
}

impl DroidOperator {
    /// Creates a new DroidOperator. Must be called inside a Tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, config: &DroidConfig) -> Self {
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let input = Arc::new(InputState::new());
        let telemetry_task = tokio::spawn(process_telemetry(notification_rx, input.clone()));

        Self {
            connection: ConnectionManager::new(transport.clone(), config, notification_tx),
            writer: CommandWriter::new(transport),
            input,
            telemetry_task,
        }
    }

    /// Operator over the default Bluetooth adapter
    pub async fn bluetooth(config: &DroidConfig) -> Result<Self, DroidError> {
        let transport = BluestTransport::new().await?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub async fn connect(&self) -> Result<(), DroidError> {
        self.connection.connect().await
    }

    pub async fn disconnect(&self) -> Result<(), DroidError> {
        self.connection.disconnect().await
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Latest input reading
    pub fn input(&self) -> InputSample {
        self.input.sample()
    }

    pub fn subscribe_input(&self) -> broadcast::Receiver<InputEvent> {
        self.input.subscribe()
    }

    /// Write one command frame to the control characteristic.
    ///
    /// The connection stays `Ready` until the write completes.
    pub async fn execute(&self, command: DroidCommand) -> Result<(), DroidError> {
        let lease = self.connection.lease_control().await?;
        self.writer.send(lease.characteristic(), &command).await
    }

    /// Write an arbitrary command, for hardware without a typed command
    pub async fn action(&self, opcode: u8, payload: &[u8]) -> Result<(), DroidError> {
        self.execute(DroidCommand::Raw {
            opcode,
            payload: payload.to_vec(),
        })
        .await
    }

    pub async fn go(&self, speed: f64) -> Result<(), DroidError> {
        self.execute(MovementAction::Go(speed).into()).await
    }

    pub async fn back(&self, speed: f64) -> Result<(), DroidError> {
        self.execute(MovementAction::Back(speed).into()).await
    }

    pub async fn turn(&self, degree: f64) -> Result<(), DroidError> {
        self.execute(TurnAction::Turn(degree).into()).await
    }

    pub async fn stop_move(&self) -> Result<(), DroidError> {
        self.execute(MovementAction::End.into()).await
    }

    pub async fn end_turn(&self) -> Result<(), DroidError> {
        self.execute(TurnAction::End.into()).await
    }

    pub async fn set_led(&self, r: u8, g: u8, b: u8) -> Result<(), DroidError> {
        self.execute(DroidCommand::SetLed(Rgb::new(r, g, b))).await
    }

    pub async fn play_sound(&self, index: u8) -> Result<(), DroidError> {
        let sound = DroidSound::new(index)?;
        self.execute(DroidCommand::PlaySound(sound)).await
    }

    /// Suspend the caller for `seconds`. Telemetry keeps flowing meanwhile.
    pub async fn wait(&self, seconds: f64) -> Result<(), DroidError> {
        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|_| DroidError::InvalidDuration(seconds))?;
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

impl Drop for DroidOperator {
    fn drop(&mut self) {
        self.telemetry_task.abort();
    }
}

/// Feed the last payload byte of every valid telemetry frame to the input state
async fn process_telemetry(
    mut notifications: mpsc::UnboundedReceiver<Notification>,
    input: Arc<InputState>,
) {
    info!("Listening for droid telemetry...");
    while let Some(notification) = notifications.recv().await {
        match protocol::decode(&notification.value) {
            Ok(frame) => {
                if let Some(&value) = frame.payload().last() {
                    input.update(value);
                }
            }
            Err(e) => trace!(
                "Ignoring {:?} notification {:02X?}: {}",
                notification.role, notification.value, e
            ),
        }
    }
    info!("Telemetry stream ended");
}
