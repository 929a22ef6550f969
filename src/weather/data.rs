//! Mock weather data: the US state table and random generators.
//!
//! Generators take the RNG and the clock as arguments so callers decide
//! where randomness comes from. Tool bodies use a fresh `thread_rng` per
//! call; tests seed a `StdRng`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// States
// =============================================================================

/// A two-letter state code and its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct State {
    pub code: &'static str,
    pub name: &'static str,
}

const fn state(code: &'static str, name: &'static str) -> State {
    State { code, name }
}

pub static STATES: &[State] = &[
    state("AL", "Alabama"),
    state("AK", "Alaska"),
    state("AZ", "Arizona"),
    state("AR", "Arkansas"),
    state("CA", "California"),
    state("CO", "Colorado"),
    state("CT", "Connecticut"),
    state("DE", "Delaware"),
    state("DC", "District of Columbia"),
    state("FL", "Florida"),
    state("GA", "Georgia"),
    state("HI", "Hawaii"),
    state("ID", "Idaho"),
    state("IL", "Illinois"),
    state("IN", "Indiana"),
    state("IA", "Iowa"),
    state("KS", "Kansas"),
    state("KY", "Kentucky"),
    state("LA", "Louisiana"),
    state("ME", "Maine"),
    state("MD", "Maryland"),
    state("MA", "Massachusetts"),
    state("MI", "Michigan"),
    state("MN", "Minnesota"),
    state("MS", "Mississippi"),
    state("MO", "Missouri"),
    state("MT", "Montana"),
    state("NE", "Nebraska"),
    state("NV", "Nevada"),
    state("NH", "New Hampshire"),
    state("NJ", "New Jersey"),
    state("NM", "New Mexico"),
    state("NY", "New York"),
    state("NC", "North Carolina"),
    state("ND", "North Dakota"),
    state("OH", "Ohio"),
    state("OK", "Oklahoma"),
    state("OR", "Oregon"),
    state("PA", "Pennsylvania"),
    state("RI", "Rhode Island"),
    state("SC", "South Carolina"),
    state("SD", "South Dakota"),
    state("TN", "Tennessee"),
    state("TX", "Texas"),
    state("UT", "Utah"),
    state("VT", "Vermont"),
    state("VA", "Virginia"),
    state("WA", "Washington"),
    state("WV", "West Virginia"),
    state("WI", "Wisconsin"),
    state("WY", "Wyoming"),
];

/// Case-insensitive lookup by two-letter code.
pub fn lookup_state(code: &str) -> Option<&'static State> {
    let code = code.trim();
    STATES.iter().find(|s| s.code.eq_ignore_ascii_case(code))
}

// =============================================================================
// Forecast and current conditions
// =============================================================================

const SUMMARIES: &[&str] = &[
    "Freezing", "Bracing", "Chilly", "Cool", "Mild", "Warm", "Balmy", "Hot", "Sweltering",
    "Scorching",
];

const CONDITIONS: &[&str] = &[
    "Clear", "Partly cloudy", "Overcast", "Light rain", "Thunderstorms", "Fog", "Windy", "Snow",
];

pub fn fahrenheit_to_celsius(f: i32) -> i32 {
    ((f - 32) as f64 * 5.0 / 9.0).round() as i32
}

fn summary_for(temperature_f: i32) -> &'static str {
    // Ten buckets across -10..110°F.
    let idx = ((temperature_f + 10).clamp(0, 119) / 12) as usize;
    SUMMARIES[idx.min(SUMMARIES.len() - 1)]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temperature_f: i32,
    pub temperature_c: i32,
    pub summary: &'static str,
}

/// `days` consecutive daily forecasts starting the day after `today`.
pub fn generate_forecast<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate, days: u32) -> Vec<ForecastDay> {
    (1..=i64::from(days))
        .map(|offset| {
            let temperature_f = rng.gen_range(-10..=110);
            ForecastDay {
                date: today + Duration::days(offset),
                temperature_f,
                temperature_c: fahrenheit_to_celsius(temperature_f),
                summary: summary_for(temperature_f),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub state: &'static str,
    pub state_name: &'static str,
    pub city: Option<String>,
    pub temperature_f: i32,
    pub temperature_c: i32,
    pub humidity: u8,
    pub wind_mph: u8,
    pub conditions: &'static str,
    pub observed_at: DateTime<Utc>,
}

pub fn generate_current<R: Rng + ?Sized>(
    rng: &mut R,
    state: &'static State,
    city: Option<String>,
    now: DateTime<Utc>,
) -> CurrentConditions {
    let temperature_f = rng.gen_range(-10..=110);
    CurrentConditions {
        state: state.code,
        state_name: state.name,
        city,
        temperature_f,
        temperature_c: fahrenheit_to_celsius(temperature_f),
        humidity: rng.gen_range(10..=100),
        wind_mph: rng.gen_range(0..=45),
        conditions: CONDITIONS.choose(rng).copied().unwrap_or("Clear"),
        observed_at: now,
    }
}

// =============================================================================
// Alerts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Minor,
        Severity::Moderate,
        Severity::Severe,
        Severity::Extreme,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Extreme => "extreme",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert filter: one severity, or every severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityFilter {
    All,
    Only(Severity),
}

impl SeverityFilter {
    pub fn accepts(self, severity: Severity) -> bool {
        match self {
            SeverityFilter::All => true,
            SeverityFilter::Only(wanted) => wanted == severity,
        }
    }
}

impl FromStr for SeverityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(SeverityFilter::All);
        }
        Severity::ALL
            .iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s))
            .map(|sev| SeverityFilter::Only(*sev))
            .ok_or_else(|| {
                format!(
                    "severity must be one of all, minor, moderate, severe, extreme (got '{}')",
                    s
                )
            })
    }
}

const EVENTS: &[(&str, Severity)] = &[
    ("Dense Fog Advisory", Severity::Minor),
    ("Wind Advisory", Severity::Minor),
    ("Heat Advisory", Severity::Moderate),
    ("Winter Weather Advisory", Severity::Moderate),
    ("Flood Watch", Severity::Moderate),
    ("Severe Thunderstorm Warning", Severity::Severe),
    ("Winter Storm Warning", Severity::Severe),
    ("Tornado Warning", Severity::Extreme),
    ("Hurricane Warning", Severity::Extreme),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub event: &'static str,
    pub severity: Severity,
    pub headline: String,
    pub effective: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

/// Zero to three active alerts for `state` matching `filter`.
pub fn generate_alerts<R: Rng + ?Sized>(
    rng: &mut R,
    state: &'static State,
    filter: SeverityFilter,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let candidates: Vec<&(&str, Severity)> =
        EVENTS.iter().filter(|(_, sev)| filter.accepts(*sev)).collect();
    let count = rng.gen_range(0..=3usize).min(candidates.len());

    candidates
        .choose_multiple(rng, count)
        .map(|&&(event, severity)| {
            let effective = now - Duration::hours(rng.gen_range(0..12));
            Alert {
                id: format!("{}-{:06}", state.code, rng.gen_range(0..1_000_000)),
                event,
                severity,
                headline: format!("{} issued for {}", event, state.name),
                effective,
                expires: effective + Duration::hours(rng.gen_range(6..48)),
            }
        })
        .collect()
}
