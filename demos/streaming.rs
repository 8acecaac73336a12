use flatchat::{CallOptions, ChatClient, ChatConfig};
use futures::StreamExt;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let client = ChatClient::new(ChatConfig::new())?;
    let mut stream = client
        .get_stream("Tell a two-sentence story about a lighthouse.", CallOptions::new())
        .await?;

    while let Some(fragment) = stream.next().await {
        print!("{}", fragment?);
        std::io::stdout().flush()?;
    }
    println!();

    Ok(())
}
