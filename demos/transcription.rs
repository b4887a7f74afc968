use std::io::Write;

use dotenv::dotenv;
use futures::StreamExt;
use openai_ai_rust::{
    models::{FilePayload, TranscriptionRequest},
    OpenAI,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: transcription <audio file>")?;

    // Create a new client from environment variables
    let client = OpenAI::from_env()?;

    let request = TranscriptionRequest::builder()
        .file(FilePayload::from_path(&path).await?)
        .language("en")
        .build();

    // Stream the transcription
    let mut stream = client.create_transcription(request)?;
    while let Some(record) = stream.next().await {
        match record {
            Ok(record) => {
                print!("{}", record.text());
                std::io::stdout().flush()?;
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    println!();

    Ok(())
}
