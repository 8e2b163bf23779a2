//! Feature extraction, min-max normalization and the weighted clustering space
//!
//! Every tour is described by the same eight dimensions. Raw values are
//! rescaled to `[0, 1]` across the population and then multiplied by fixed
//! weights so that price positioning dominates the distance metric.

use crate::data::RawRecord;
use ndarray::{Array1, Array2};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Number of feature dimensions
pub const N_FEATURES: usize = 8;

/// Multipliers applied to normalized values, in [`Feature::ALL`] order
pub const FEATURE_WEIGHTS: [f64; N_FEATURES] = [1.5, 1.2, 1.0, 1.0, 1.0, 1.0, 0.5, 1.0];

/// Normalized value used when every product shares the same raw value
pub const DEGENERATE_VALUE: f64 = 0.5;

const ACTIVITY_KEYWORDS: [&str; 14] = [
    "tour",
    "visit",
    "explore",
    "experience",
    "adventure",
    "hike",
    "trek",
    "dive",
    "snorkel",
    "kayak",
    "safari",
    "cruise",
    "workshop",
    "show",
];

const MAX_DAY_BASE_SCORE: f64 = 3.0;
const MAX_DAY_SCORE: f64 = 5.0;
const MAX_ACTIVITIES_SCORE: f64 = 10.0;
const KEYWORD_BONUS: f64 = 0.5;

/// The eight fixed clustering dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    TotalPrice,
    PricePerDay,
    DurationDays,
    DestinationCount,
    InclusionsCount,
    MealsPerDay,
    FlightCount,
    ActivitiesScore,
}

impl Feature {
    pub const ALL: [Feature; N_FEATURES] = [
        Feature::TotalPrice,
        Feature::PricePerDay,
        Feature::DurationDays,
        Feature::DestinationCount,
        Feature::InclusionsCount,
        Feature::MealsPerDay,
        Feature::FlightCount,
        Feature::ActivitiesScore,
    ];

    /// Column index in feature vectors
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Feature::TotalPrice => "Price",
            Feature::PricePerDay => "Price per day",
            Feature::DurationDays => "Duration",
            Feature::DestinationCount => "Destinations",
            Feature::InclusionsCount => "Inclusions",
            Feature::MealsPerDay => "Meals per day",
            Feature::FlightCount => "Flights",
            Feature::ActivitiesScore => "Activities",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Eight feature values, either raw or normalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureValues {
    pub total_price: f64,
    pub price_per_day: f64,
    pub duration_days: f64,
    pub destination_count: f64,
    pub inclusions_count: f64,
    pub meals_per_day: f64,
    pub flight_count: f64,
    pub activities_score: f64,
}

impl FeatureValues {
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        [
            self.total_price,
            self.price_per_day,
            self.duration_days,
            self.destination_count,
            self.inclusions_count,
            self.meals_per_day,
            self.flight_count,
            self.activities_score,
        ]
    }

    pub fn from_array(values: [f64; N_FEATURES]) -> Self {
        let [total_price, price_per_day, duration_days, destination_count, inclusions_count, meals_per_day, flight_count, activities_score] =
            values;
        Self {
            total_price,
            price_per_day,
            duration_days,
            destination_count,
            inclusions_count,
            meals_per_day,
            flight_count,
            activities_score,
        }
    }
}

/// Feature description of one tour product
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFeatures {
    pub id: String,
    pub name: String,
    /// Values derived directly from the record
    #[serde(flatten)]
    pub raw: FeatureValues,
    /// Values rescaled to `[0, 1]` across the population
    pub normalized: FeatureValues,
}

impl ProductFeatures {
    /// Weighted vector used for every distance computation
    pub fn weighted_vector(&self) -> Array1<f64> {
        weight_values(&self.normalized)
    }
}

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(\d+)\s*(?:day|d)").expect("valid duration regex"))
}

/// Parse the number of days from free-text duration
///
/// "5 days 4 nights" and "7D6N" both yield the leading day count; anything
/// unrecognized yields 0.
pub fn parse_duration_days(text: &str) -> u32 {
    duration_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Score how activity-packed an itinerary is, from 0 to 10
pub fn activities_score(record: &RawRecord) -> f64 {
    let days = &record.daily_itinerary;
    if days.is_empty() {
        return 0.0;
    }

    let total: f64 = days
        .iter()
        .map(|day| {
            let text = day.activities.to_lowercase();
            let base = (text.chars().count() as f64 / 100.0).min(MAX_DAY_BASE_SCORE);
            let matches = ACTIVITY_KEYWORDS
                .iter()
                .filter(|keyword| text.contains(*keyword))
                .count();
            (base + matches as f64 * KEYWORD_BONUS).min(MAX_DAY_SCORE)
        })
        .sum();

    (total / days.len() as f64).min(MAX_ACTIVITIES_SCORE)
}

/// Extract raw features from one record
///
/// Returns `None` when the record has no positive price, which makes it
/// ineligible for clustering. Normalized values start at zero.
pub fn extract_features(record: &RawRecord, index: usize) -> Option<ProductFeatures> {
    let total_price = record.first_price().unwrap_or(0.0);
    if !total_price.is_finite() || total_price <= 0.0 {
        return None;
    }

    let duration_days = record
        .duration
        .as_deref()
        .map(parse_duration_days)
        .unwrap_or(0) as f64;

    let price_per_day = if duration_days > 0.0 {
        total_price / duration_days
    } else {
        total_price
    };

    let meals_per_day = if record.daily_itinerary.is_empty() {
        0.0
    } else {
        let meals: usize = record.daily_itinerary.iter().map(|d| d.meals.len()).sum();
        meals as f64 / record.daily_itinerary.len() as f64
    };

    let raw = FeatureValues {
        total_price,
        price_per_day,
        duration_days,
        destination_count: record.destinations.len() as f64,
        inclusions_count: record.inclusions.len() as f64,
        meals_per_day,
        flight_count: record.flights.len() as f64,
        activities_score: activities_score(record),
    };

    Some(ProductFeatures {
        id: record
            .id
            .clone()
            .unwrap_or_else(|| format!("product-{}", index)),
        name: record
            .tour_name
            .clone()
            .unwrap_or_else(|| "Unknown Tour".to_string()),
        raw,
        normalized: FeatureValues::default(),
    })
}

/// Per-dimension min/max fitted on a population
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureScaler {
    pub min: [f64; N_FEATURES],
    pub max: [f64; N_FEATURES],
}

impl FeatureScaler {
    /// Fit on the raw values of a population
    pub fn fit(products: &[ProductFeatures]) -> Self {
        let mut min = [f64::INFINITY; N_FEATURES];
        let mut max = [f64::NEG_INFINITY; N_FEATURES];

        for product in products {
            for (dim, value) in product.raw.to_array().into_iter().enumerate() {
                min[dim] = min[dim].min(value);
                max[dim] = max[dim].max(value);
            }
        }

        Self { min, max }
    }

    /// Dimensions on which every product had the same value
    pub fn degenerate_features(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| self.is_degenerate(f.index()))
            .collect()
    }

    fn is_degenerate(&self, dim: usize) -> bool {
        self.max[dim] == self.min[dim]
    }

    /// Rescale raw values into the fitted range
    ///
    /// Values outside the fitted range map outside `[0, 1]`.
    pub fn transform(&self, raw: &FeatureValues) -> FeatureValues {
        let mut out = raw.to_array();
        for (dim, value) in out.iter_mut().enumerate() {
            *value = if self.is_degenerate(dim) {
                DEGENERATE_VALUE
            } else {
                (*value - self.min[dim]) / (self.max[dim] - self.min[dim])
            };
        }
        FeatureValues::from_array(out)
    }
}

/// Normalize a population, returning new products and the fitted scaler
pub fn normalize_features(products: &[ProductFeatures]) -> (Vec<ProductFeatures>, FeatureScaler) {
    let scaler = FeatureScaler::fit(products);

    let normalized = products
        .iter()
        .map(|product| ProductFeatures {
            normalized: scaler.transform(&product.raw),
            ..product.clone()
        })
        .collect();

    (normalized, scaler)
}

/// Apply [`FEATURE_WEIGHTS`] to normalized values
pub fn weight_values(normalized: &FeatureValues) -> Array1<f64> {
    normalized
        .to_array()
        .iter()
        .zip(FEATURE_WEIGHTS.iter())
        .map(|(value, weight)| value * weight)
        .collect()
}

/// Build the (n_products, 8) weighted feature matrix
pub fn build_feature_matrix(products: &[ProductFeatures]) -> Array2<f64> {
    let mut matrix = Array2::zeros((products.len(), N_FEATURES));
    for (mut row, product) in matrix.outer_iter_mut().zip(products) {
        row.assign(&product.weighted_vector());
    }
    matrix
}
