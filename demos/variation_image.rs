use dotenv::dotenv;
use openai_ai_rust::{
    models::{FilePayload, ImageResponseFormat, ImageSize, VariationImageRequest},
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
        .ok_or("usage: variation_image <image.png> [out.png]")?;
    let out = std::env::args().nth(2);

    let client = OpenAI::from_env()?;

    let mut request = VariationImageRequest::builder()
        .image(FilePayload::from_path(&path).await?)
        .size(ImageSize::S256)
        .build();
    if out.is_some() {
        request.response_format = Some(ImageResponseFormat::B64Json);
    }

    let Some(response) = client.variation_image(request).await? else {
        println!("No image returned");
        return Ok(());
    };

    match (out, response.data.last()) {
        (Some(out), Some(image)) => {
            if let Some(bytes) = image.decode_b64()? {
                tokio::fs::write(&out, bytes).await?;
                println!("Saved variation to {}", out);
            }
        }
        _ => {
            for url in response.urls() {
                println!("Variation: {}", url);
            }
        }
    }

    Ok(())
}
