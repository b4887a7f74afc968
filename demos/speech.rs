use dotenv::dotenv;
use openai_ai_rust::{
    models::{SpeechRequest, SpeechResponseFormat, Voice},
    OpenAI,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let text = std::env::args()
        .nth(1)
        .ok_or("usage: speech <text> [output file]")?;
    let output = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "speech.mp3".to_string());

    let client = OpenAI::from_env()?;

    let request = SpeechRequest::builder()
        .input(text)
        .voice(Voice::Nova)
        .response_format(SpeechResponseFormat::Mp3)
        .build();

    let audio = client.create_speech(request).await?;
    tokio::fs::write(&output, &audio).await?;
    println!("Wrote {} bytes to {}", audio.len(), output);

    Ok(())
}
