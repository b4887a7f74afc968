use dotenv::dotenv;
use futures::StreamExt;
use openai_ai_rust::{
    models::{AudioResponseFormat, FilePayload, TranslationRequest},
    DeliveryMode, OpenAI,
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
        .ok_or("usage: translation <audio file>")?;

    let client = OpenAI::from_env()?;

    let request = TranslationRequest::builder()
        .file(FilePayload::from_path(&path).await?)
        .response_format(AudioResponseFormat::VerboseJson)
        .temperature(0.0)
        .delivery_mode(DeliveryMode::SingleShot)
        .build();

    let mut stream = client.create_translation(request)?;
    while let Some(record) = stream.next().await {
        let record = record?;
        println!("Translation: {}", record.text());
        if let Some(language) = &record.language {
            println!("Source language: {}", language);
        }
        if let Some(duration) = record.duration {
            println!("Duration: {:.1}s", duration);
        }
    }

    Ok(())
}
