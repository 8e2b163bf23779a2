//! Tour record schema and JSON loading
//!
//! Records arrive from the extraction layer with loosely-shaped optional fields.
//! Every default lives here so the rest of the pipeline can treat a
//! [`RawRecord`] as fully populated.

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// One parsed tour product as supplied by the extraction layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    /// Caller-assigned identifier, if any
    pub id: Option<String>,
    /// Tour name
    pub tour_name: Option<String>,
    /// Pricing table; only the first entry is used for features
    pub pricing: Vec<PricingEntry>,
    /// Free-text duration such as "5 days 4 nights" or "7D6N"
    pub duration: Option<String>,
    /// Destination names
    pub destinations: Vec<String>,
    /// Included services
    pub inclusions: Vec<String>,
    /// Excluded services
    pub exclusions: Vec<String>,
    /// Flight legs
    pub flights: Vec<FlightEntry>,
    /// Day-by-day itinerary
    pub daily_itinerary: Vec<DailyEntry>,
}

/// A single row of a pricing table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingEntry {
    /// Price amount; `None` when missing or not parseable
    #[serde(deserialize_with = "lenient_price")]
    pub price: Option<f64>,
    pub currency: Option<String>,
    /// Travel period the price applies to
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlightEntry {
    pub flight_number: Option<String>,
    pub route: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
}

/// One day of an itinerary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyEntry {
    pub day: Option<u32>,
    pub title: Option<String>,
    pub meals: Vec<String>,
    /// Activities as free text; a list of strings is joined with spaces
    #[serde(deserialize_with = "activities_text")]
    pub activities: String,
}

impl RawRecord {
    /// Price of the first pricing entry, if it has one
    pub fn first_price(&self) -> Option<f64> {
        self.pricing.first().and_then(|entry| entry.price)
    }
}

/// Either a bare array of records or an object wrapping them
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    List(Vec<RawRecord>),
    Wrapped { itineraries: Vec<RawRecord> },
}

/// Parse records from a JSON string
///
/// Accepts a top-level array or an object with an `itineraries` array.
pub fn parse_records(json: &str) -> crate::Result<Vec<RawRecord>> {
    let file: RecordFile =
        serde_json::from_str(json).context("Input must be a JSON array of tour records")?;

    Ok(match file {
        RecordFile::List(records) => records,
        RecordFile::Wrapped { itineraries } => itineraries,
    })
}

/// Load tour records from a JSON file
///
/// # Arguments
/// * `file_path` - Path to the JSON file
///
/// # Returns
/// * Records in file order
pub fn load_records<P: AsRef<Path>>(file_path: P) -> crate::Result<Vec<RawRecord>> {
    let path = file_path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let records =
        parse_records(&contents).with_context(|| format!("Failed to parse {}", path.display()))?;

    if records.is_empty() {
        anyhow::bail!("No tour records found in {}", path.display());
    }

    Ok(records)
}

/// Load a single record, used for segment assignment
pub fn load_record<P: AsRef<Path>>(file_path: P) -> crate::Result<RawRecord> {
    let path = file_path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse tour record in {}", path.display()))
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(price_from_value))
}

fn price_from_value(value: &serde_json::Value) -> Option<f64> {
    let price = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_price_text(s),
        _ => None,
    };
    price.filter(|p| p.is_finite())
}

/// Parse "12,900 THB", "$1,299.00" and similar into a number
///
/// For ranges like "12,900 - 15,900" the first amount wins.
fn parse_price_text(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();

    digits.parse().ok()
}

fn activities_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Activities {
        Text(String),
        List(Vec<String>),
    }

    Ok(match Option::<Activities>::deserialize(deserializer)? {
        Some(Activities::Text(text)) => text,
        Some(Activities::List(items)) => items.join(" "),
        None => String::new(),
    })
}
