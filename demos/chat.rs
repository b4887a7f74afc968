use std::io::{self, BufRead, Write};

use dotenv::dotenv;
use futures::StreamExt;
use openai_ai_rust::{chat::ChatSession, OpenAI};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = OpenAI::from_env()?;
    let mut chat = ChatSession::new(client, "gpt-4o-mini")
        .with_system_instruction("You are a concise, friendly assistant.");

    println!("Chat started. Type 'exit' to quit, 'clear' to reset history.");
    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "" => continue,
            "exit" => break,
            "clear" => {
                chat.clear_history();
                println!("History cleared.");
            }
            message => {
                let mut stream = chat.send_message_streaming(message)?;
                let mut reply = String::new();
                print!("Assistant: ");
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(chunk) => {
                            let text = chunk.text().unwrap_or_default();
                            print!("{}", text);
                            io::stdout().flush()?;
                            reply.push_str(text);
                        }
                        Err(e) => eprintln!("\nError: {}", e),
                    }
                }
                println!();
                chat.add_model_response(reply);
            }
        }
    }

    Ok(())
}
