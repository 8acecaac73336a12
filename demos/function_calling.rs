use flatchat::{CallOptions, ChatClient, ChatConfig, Context, FunctionCandidate, FunctionSet};
use schemars::JsonSchema;
use serde_json::json;

#[derive(JsonSchema)]
#[allow(dead_code)]
struct WeatherArgs {
    /// City to look up
    city: String,
    /// celsius or fahrenheit
    unit: Option<String>,
}

fn weather_candidate() -> FunctionCandidate {
    FunctionCandidate::builder("get_weather")
        .description("Get the current weather for a city.")
        .parameters_for::<WeatherArgs>()
        .handler(|arguments| async move {
            let city = arguments["city"].as_str().unwrap_or("somewhere").to_string();
            Ok(json!({ "city": city, "temperature": 19.0, "conditions": "clear skies" }))
        })
}

fn itinerary_candidate() -> FunctionCandidate {
    FunctionCandidate::builder("plan_evening")
        .description("Suggest an evening activity.")
        .parameters(json!({
            "type": "object",
            "properties": { "mood": { "type": "string" } },
            "required": ["mood"]
        }))
        .handler(|arguments| async move {
            let mood = arguments["mood"].as_str().unwrap_or("calm").to_string();
            Ok(json!(format!("A {mood} walk along the river")))
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let mut client = ChatClient::new(ChatConfig::new())?;
    client.set_context(Context::new().with("situation", "deciding what to do tonight in Porto"));

    let set = FunctionSet::new()
        .with(weather_candidate())?
        .with(itinerary_candidate())?
        .allow_none();

    match client.pick_function(&set, CallOptions::new()).await? {
        Some(resolved) => {
            println!("Model picked {} with {:?}", resolved.name(), resolved.arguments());
            let result = resolved.invoke().await?;
            println!("Result: {result}");
        }
        None => println!("Model declined to pick a function."),
    }

    Ok(())
}
