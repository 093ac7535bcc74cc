use anyhow::Result;
use log::{info, warn};

use droidkit::{DroidConfig, DroidOperator, DroidSound, logging};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => DroidConfig::load(path).await?,
        None => DroidConfig::default(),
    };
    info!("Starting droidkit demo for {}", config.device_name);

    let operator = DroidOperator::bluetooth(&config).await?;
    let mut states = operator.subscribe_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            info!("Connection state: {:?}", *states.borrow_and_update());
        }
    });

    let mut input = operator.subscribe_input();
    tokio::spawn(async move {
        while let Ok(event) = input.recv().await {
            info!("Input event: {:?}", event);
        }
    });

    operator.connect().await?;

    let result = run_sequence(&operator).await;
    if let Err(e) = &result {
        warn!("Demo sequence failed: {}", e);
    }

    operator.disconnect().await?;
    info!("Demo finished");
    Ok(result?)
}

async fn run_sequence(operator: &DroidOperator) -> Result<(), droidkit::DroidError> {
    operator.set_led(0, 128, 255).await?;
    if let Some(sound) = DroidSound::all().next() {
        operator.play_sound(sound.index()).await?;
    }

    operator.go(0.5).await?;
    operator.wait(1.5).await?;
    operator.stop_move().await?;

    operator.turn(45.0).await?;
    operator.wait(1.0).await?;
    operator.end_turn().await?;

    operator.set_led(0, 0, 0).await
}
