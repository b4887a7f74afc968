use dotenv::dotenv;
use openai_ai_rust::{
    models::{EditImageRequest, FilePayload, ImageSize},
    OpenAI,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (image, mask, prompt) = match (args.next(), args.next(), args.next()) {
        (Some(image), Some(mask), Some(prompt)) => (image, mask, prompt),
        _ => return Err("usage: edit_image <image.png> <mask.png> <prompt>".into()),
    };

    let client = OpenAI::from_env()?;

    let request = EditImageRequest::builder()
        .image(FilePayload::from_path(&image).await?)
        .mask(FilePayload::from_path(&mask).await?)
        .prompt(prompt)
        .size(ImageSize::S512)
        .build();

    match client.edit_image(request).await?.as_ref().and_then(|r| r.url()) {
        Some(url) => println!("Edited image: {}", url),
        None => println!("No image returned"),
    }

    Ok(())
}
