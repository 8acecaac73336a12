use flatchat::{CallOptions, ChatClient, ChatConfig, Context};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Reads OPENAI_API_KEY from the environment.
    let mut client = ChatClient::new(ChatConfig::new())?;
    client.add_context(
        Context::new()
            .with("persona", "a laconic ship captain")
            .with("audience", "new deckhands"),
    );

    let reply = client
        .get_string(
            "Give one sentence of advice for the first day at sea.",
            CallOptions::new().temperature(0.7),
        )
        .await?;

    println!("{reply}");
    Ok(())
}
