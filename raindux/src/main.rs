use std::io::Write;

use clap::Parser;
use miette::{IntoDiagnostic, Result};

use raindux::stream_response;

/// Streams a single answer from the local inference service to the console.
#[derive(Parser, Debug)]
#[command(name = "raindux-cli")]
struct Cli {
    /// Message to send to the health bot.
    #[arg(default_value = "I have a sore throat and a slight fever. What should I do?")]
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    println!("User Prompt: {}\n\nRainDux Health Bot:", cli.message);

    let mut stream = stream_response(&cli.message).await?;
    while let Some(fragment) = stream.next_fragment().await {
        print!("{fragment}");
        std::io::stdout().flush().into_diagnostic()?;
    }

    println!("\n\n--- Stream finished ---");
    Ok(())
}
