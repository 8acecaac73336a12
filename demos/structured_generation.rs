use flatchat::{CallOptions, ChatClient, ChatConfig, Context, ListOf, Single};
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
struct Itinerary {
    destination: String,
    days: u8,
    highlights: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut client = ChatClient::new(ChatConfig::new())?;
    client.set_context(
        Context::new()
            .with("traveler", "a family with two kids")
            .with("season", "early summer"),
    );

    let trip = client
        .generate::<Single<Itinerary>>(CallOptions::new().context("destination", "Lisbon"))
        .await?;
    println!("One trip: {trip:#?}");

    let alternatives = client
        .generate::<ListOf<Itinerary>>(
            CallOptions::new().context("request", "three alternative destinations in Europe"),
        )
        .await?;
    println!("Alternatives: {alternatives:#?}");

    Ok(())
}
