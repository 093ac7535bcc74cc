//! Droid command writer
//! Encodes commands into frames and writes them to the control characteristic,
//! one frame at a time.

use std::sync::Arc;

use log::{debug, error};
use tokio::sync::Mutex;

use crate::core::bluetooth::transport::Transport;
use crate::core::bluetooth::types::CharacteristicId;
use crate::core::protocol::DroidCommand;
use crate::error::DroidError;

/// Serializes frame writes on the transport
pub struct CommandWriter {
    transport: Arc<dyn Transport>,
    /// Held for the whole write so frames never interleave
    write_lock: Mutex<()>,
}

impl CommandWriter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            write_lock: Mutex::new(()),
        }
    }

    /// Encode `command` and write it to `characteristic`.
    ///
    /// Encoding errors are returned before anything is written.
    pub async fn send(
        &self,
        characteristic: &CharacteristicId,
        command: &DroidCommand,
    ) -> Result<(), DroidError> {
        let bytes = command.to_frame()?.encode();

        let _guard = self.write_lock.lock().await;
        debug!("Sending command {:?}: {:02X?}", command, bytes);
        self.transport
            .write(characteristic, &bytes)
            .await
            .map_err(|e| {
                error!("Failed to write {:?}: {}", command, e);
                DroidError::from(e)
            })
    }
}
