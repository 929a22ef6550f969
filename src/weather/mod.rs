//! Mock weather tools.
//!
//! [`WeatherTools`] registers four tools into a catalog. Payloads are random
//! and carry no real data; input validation is real and surfaces as
//! [`ToolFailure::Validation`].

pub mod data;

use crate::tools::{
    handler_fn, Args, CatalogBuilder, ParamType, ToolDescriptor, ToolOutput, ToolProvider,
};
use crate::types::{Result, ToolFailure};
use chrono::Utc;
use data::{ForecastDay, SeverityFilter, State};
use serde::Serialize;
use serde_json::json;

/// Longest forecast the service produces.
pub const MAX_FORECAST_DAYS: i32 = 7;

/// Default forecast length.
pub const DEFAULT_FORECAST_DAYS: i32 = 5;

type ToolResult = std::result::Result<ToolOutput, ToolFailure>;

/// Tool provider for the mock weather service.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeatherTools;

impl ToolProvider for WeatherTools {
    fn name(&self) -> &str {
        "weather"
    }

    fn register(&self, catalog: &mut CatalogBuilder) -> Result<()> {
        catalog.register(
            ToolDescriptor::new(
                "GetWeatherForecast",
                "Get a daily weather forecast for a US state",
                handler_fn(get_weather_forecast),
            )
            .param("state", ParamType::STRING, "Two-letter US state code (e.g. TX)")
            .optional(
                "days",
                ParamType::INTEGER,
                json!(DEFAULT_FORECAST_DAYS),
                "Number of days to forecast (1-7)",
            ),
        )?;

        catalog.register(
            ToolDescriptor::new(
                "GetCurrentWeather",
                "Get current weather conditions for a US state, optionally for one city",
                handler_fn(get_current_weather),
            )
            .param("state", ParamType::STRING, "Two-letter US state code (e.g. TX)")
            .optional("city", ParamType::STRING, json!(null), "City name"),
        )?;

        catalog.register(
            ToolDescriptor::new(
                "GetWeatherAlerts",
                "Get active weather alerts for a US state",
                handler_fn(get_weather_alerts),
            )
            .param("state", ParamType::STRING, "Two-letter US state code (e.g. TX)")
            .optional(
                "severity",
                ParamType::STRING,
                json!("all"),
                "Filter: all, minor, moderate, severe or extreme",
            ),
        )?;

        catalog.register(ToolDescriptor::new(
            "ListStates",
            "List the supported US state codes",
            handler_fn(list_states),
        ))?;

        Ok(())
    }
}

fn resolve_state(args: &Args) -> std::result::Result<&'static State, ToolFailure> {
    let code = args.string("state")?;
    data::lookup_state(code)
        .ok_or_else(|| ToolFailure::validation(format!("unknown state code '{}'", code)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Forecast {
    state: &'static str,
    state_name: &'static str,
    days: i32,
    forecast: Vec<ForecastDay>,
}

async fn get_weather_forecast(args: Args) -> ToolResult {
    let state = resolve_state(&args)?;
    let days = args.integer("days")?;
    if !(1..=MAX_FORECAST_DAYS).contains(&days) {
        return Err(ToolFailure::validation(format!(
            "days must be between 1 and {}",
            MAX_FORECAST_DAYS
        )));
    }

    let forecast = data::generate_forecast(
        &mut rand::thread_rng(),
        Utc::now().date_naive(),
        days as u32,
    );
    ToolOutput::json(&Forecast {
        state: state.code,
        state_name: state.name,
        days,
        forecast,
    })
}

async fn get_current_weather(args: Args) -> ToolResult {
    let state = resolve_state(&args)?;
    let city = args
        .opt_string("city")?
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let current = data::generate_current(&mut rand::thread_rng(), state, city, Utc::now());
    ToolOutput::json(&current)
}

async fn get_weather_alerts(args: Args) -> ToolResult {
    let state = resolve_state(&args)?;
    let filter: SeverityFilter = args.string("severity")?.parse().map_err(ToolFailure::Validation)?;

    let alerts = data::generate_alerts(&mut rand::thread_rng(), state, filter, Utc::now());
    Ok(ToolOutput::Json(json!({
        "state": state.code,
        "stateName": state.name,
        "alerts": alerts,
    })))
}

async fn list_states(_args: Args) -> ToolResult {
    ToolOutput::json(&data::STATES)
}
