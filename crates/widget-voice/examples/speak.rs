use std::sync::Arc;
use std::time::Duration;

use widget_gateway::GatewayClient;
use widget_voice::{AudioPlaybackEngine, GatewaySpeech, HeadlessBackend, PlaybackState};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    widget_gateway::init_observability();

    let client = GatewayClient::from_env()?;
    let voice = std::env::var("WIDGET_VOICE").unwrap_or_else(|_| "alloy".to_string());
    let engine = AudioPlaybackEngine::new(
        Arc::new(GatewaySpeech::new(&client)),
        Arc::new(HeadlessBackend::new().tick(Duration::from_millis(200))),
    );

    let mut status = engine.subscribe();
    let mut progress = engine.speak("Hello from the headless voice engine.", voice);
    while let Some(update) = progress.next_progress().await {
        println!(
            "{:>6.2}s / {:?} ({:.0}%) {}",
            update.current_time, update.duration, update.percentage, update.state
        );
    }

    let last = status.borrow_and_update().clone();
    if last.state == PlaybackState::Error
        && let Some(err) = last.error
    {
        eprintln!("playback failed: {err}");
    }
    Ok(())
}
