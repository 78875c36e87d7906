use aimanager::agent::Agent;
use aimanager::errors::ConfigError;
use aimanager::tools::{Signature, ToolFunction};
use anyhow::{anyhow, Context};
use serde_json::{json, Map, Value};
use std::env;

const OPENWEATHER_HOST: &str = "https://api.openweathermap.org";
const OPENWEATHER_API_KEY: &str = "OPENWEATHER_API_KEY";

pub fn count_words() -> ToolFunction {
    ToolFunction::immediate(
        "count_words",
        Signature::new().arg::<String>("text"),
        |args| {
            let text: String = args.get("text")?;
            Ok(json!({ "count": text.split_whitespace().count() }))
        },
    )
    .with_doc("Count the number of words in text")
}

/// Current conditions for a city. `api_key` is supplied at registration.
pub fn fetch_weather(host: &str) -> ToolFunction {
    let url = format!("{}/data/2.5/weather", host.trim_end_matches('/'));
    ToolFunction::deferred(
        "fetch_weather",
        Signature::new()
            .arg::<String>("city")
            .arg_with_default::<String>("units", json!("metric"))
            .arg::<String>("api_key"),
        move |args| {
            let url = url.clone();
            async move {
                let city: String = args.get("city")?;
                let units: String = args.get("units")?;
                let api_key: String = args.get("api_key")?;

                let response = reqwest::Client::new()
                    .get(&url)
                    .query(&[("q", &city), ("units", &units), ("appid", &api_key)])
                    .send()
                    .await
                    .context("weather request failed")?;
                if !response.status().is_success() {
                    return Err(anyhow!(
                        "weather lookup for {} failed with status {}",
                        city,
                        response.status()
                    ));
                }
                let body: Value = response.json().await?;
                Ok(json!({
                    "city": body["name"],
                    "description": body["weather"][0]["description"],
                    "temperature": body["main"]["temp"],
                    "humidity": body["main"]["humidity"],
                }))
            }
        },
    )
    .with_doc("Fetch the current weather for a city")
}

/// Registers the built-in tools. `fetch_weather` needs `OPENWEATHER_API_KEY`.
pub fn register_builtin_tools(agent: &mut Agent) -> Result<(), ConfigError> {
    agent.register_tool(count_words(), Map::new())?;

    match env::var(OPENWEATHER_API_KEY) {
        Ok(api_key) if !api_key.is_empty() => {
            let mut defaults = Map::new();
            defaults.insert("api_key".to_string(), Value::String(api_key));
            agent.register_tool(fetch_weather(OPENWEATHER_HOST), defaults)?;
        }
        _ => tracing::debug!("{} not set, skipping fetch_weather", OPENWEATHER_API_KEY),
    }
    Ok(())
}
