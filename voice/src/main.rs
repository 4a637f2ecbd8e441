use std::io::Write;
use std::time::Duration;

use miette::{IntoDiagnostic, Result};
use tracing::metadata::LevelFilter;

use shared::normalize_transcription;
use voice::{capture, HttpRecognizer, ListenConfig, Microphone};

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let recognizer = HttpRecognizer::from_env()?;
    let mut microphone = Microphone::open()?;
    let config = ListenConfig::default();

    println!("--- RainDux Voice Assistant ---");
    println!("Press Ctrl+C to stop.\n");

    loop {
        if let Err(report) = run_turn(&recognizer, &mut microphone, &config).await {
            tracing::error!("voice turn failed: {report}");
        }

        // Breathe between turns so the next calibration starts cleanly.
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn run_turn(
    recognizer: &HttpRecognizer,
    microphone: &mut Microphone,
    config: &ListenConfig,
) -> Result<()> {
    microphone.drain();
    println!(
        "Calibrating ambient noise ({} seconds), then listening for up to {} seconds...",
        config.ambient_calibration.as_secs(),
        config.timeout.as_secs(),
    );

    let result = capture(recognizer, microphone, config).await;
    let message = match normalize_transcription(&result) {
        Ok(message) => message,
        Err(err) => {
            println!("[STATUS] {err}");
            return Ok(());
        }
    };

    println!("------------------------------");
    println!("I heard: {message}");
    println!("\nRainDux Health Bot:");

    let mut stream = raindux::stream_response(&message).await?;
    while let Some(fragment) = stream.next_fragment().await {
        print!("{fragment}");
        std::io::stdout().flush().into_diagnostic()?;
    }
    println!();

    Ok(())
}

fn configure_logging() {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::time())
        .with_max_level(LevelFilter::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).unwrap();
}
