//! Human-readable segment descriptions for fitted clusters
//!
//! Labels and names are presentation heuristics layered on the numeric
//! partition. They are pure functions of cluster statistics so they can be
//! tested without running K-Means.

use crate::features::ProductFeatures;
use crate::model::KMeansModel;
use serde::Serialize;
use std::fmt;

/// Display colors, cycled by cluster index
pub const CLUSTER_COLORS: [&str; 6] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899",
];

/// Market positioning of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentLabel {
    Budget,
    MidRange,
    Premium,
    Luxury,
}

impl SegmentLabel {
    /// Leading word of a cluster name
    pub fn price_level(self) -> &'static str {
        match self {
            SegmentLabel::Budget => "Budget",
            SegmentLabel::MidRange => "Value",
            SegmentLabel::Premium => "Premium",
            SegmentLabel::Luxury => "Luxury",
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SegmentLabel::Budget => "budget",
            SegmentLabel::MidRange => "mid-range",
            SegmentLabel::Premium => "premium",
            SegmentLabel::Luxury => "luxury",
        })
    }
}

/// Summary statistics of a cluster's members
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCharacteristics {
    pub avg_price: f64,
    pub avg_price_per_day: f64,
    pub avg_duration: f64,
    pub avg_destinations: f64,
    pub avg_meals_per_day: f64,
    pub avg_activities: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Formatted "min - max" of member prices
    pub price_range: String,
    pub segment: SegmentLabel,
}

/// One market segment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: usize,
    pub name: String,
    pub description: String,
    pub color: &'static str,
    pub members: Vec<ProductFeatures>,
    /// Centroid in weighted feature space
    pub centroid: Vec<f64>,
    pub characteristics: ClusterCharacteristics,
}

/// Bucket a cluster's mean price per day against every product's price per day
///
/// Quartile thresholds are read from the sorted product distribution at index
/// `floor(n * q)`. The cluster mean is compared against individual products
/// rather than other cluster means, so skewed populations can shift labels.
pub fn segment_label(cluster_price_per_day: f64, product_prices_per_day: &[f64]) -> SegmentLabel {
    if product_prices_per_day.is_empty() {
        return SegmentLabel::MidRange;
    }

    let mut sorted = product_prices_per_day.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let quantile = |q: f64| {
        let idx = ((sorted.len() as f64 * q).floor() as usize).min(sorted.len() - 1);
        sorted[idx]
    };

    if cluster_price_per_day <= quantile(0.25) {
        SegmentLabel::Budget
    } else if cluster_price_per_day <= quantile(0.5) {
        SegmentLabel::MidRange
    } else if cluster_price_per_day <= quantile(0.75) {
        SegmentLabel::Premium
    } else {
        SegmentLabel::Luxury
    }
}

fn duration_bucket(days: f64) -> &'static str {
    if days <= 4.0 {
        "Short"
    } else if days <= 7.0 {
        "Standard"
    } else {
        "Extended"
    }
}

fn activity_bucket(score: f64) -> &'static str {
    if score <= 3.0 {
        "Relaxed"
    } else if score <= 6.0 {
        "Balanced"
    } else {
        "Active"
    }
}

/// Three-word segment name, e.g. "Premium Standard Balanced"
pub fn cluster_name(characteristics: &ClusterCharacteristics) -> String {
    format!(
        "{} {} {}",
        characteristics.segment.price_level(),
        duration_bucket(characteristics.avg_duration),
        activity_bucket(characteristics.avg_activities)
    )
}

/// One-line description of a segment
pub fn cluster_description(characteristics: &ClusterCharacteristics, member_count: usize) -> String {
    format!(
        "{} {}, ~{} days, ~{} destinations, {:.1} meals/day",
        member_count,
        if member_count == 1 { "tour" } else { "tours" },
        characteristics.avg_duration.round(),
        characteristics.avg_destinations.round(),
        characteristics.avg_meals_per_day
    )
}

pub fn cluster_color(index: usize) -> &'static str {
    CLUSTER_COLORS[index % CLUSTER_COLORS.len()]
}

/// Format a price with thousands separators and no decimals
pub fn format_price(price: f64) -> String {
    let rounded = price.round().abs() as u64;
    let digits = rounded.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if price.round() < 0.0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn mean(members: &[&ProductFeatures], value: impl Fn(&ProductFeatures) -> f64) -> f64 {
    members.iter().map(|m| value(m)).sum::<f64>() / members.len() as f64
}

/// Summarize a non-empty member list
pub fn characterize(
    members: &[&ProductFeatures],
    product_prices_per_day: &[f64],
) -> ClusterCharacteristics {
    let avg_price_per_day = mean(members, |m| m.raw.price_per_day);
    let min_price = members
        .iter()
        .map(|m| m.raw.total_price)
        .fold(f64::INFINITY, f64::min);
    let max_price = members
        .iter()
        .map(|m| m.raw.total_price)
        .fold(f64::NEG_INFINITY, f64::max);

    let price_range = if min_price == max_price {
        format_price(min_price)
    } else {
        format!("{} - {}", format_price(min_price), format_price(max_price))
    };

    ClusterCharacteristics {
        avg_price: mean(members, |m| m.raw.total_price),
        avg_price_per_day,
        avg_duration: mean(members, |m| m.raw.duration_days),
        avg_destinations: mean(members, |m| m.raw.destination_count),
        avg_meals_per_day: mean(members, |m| m.raw.meals_per_day),
        avg_activities: mean(members, |m| m.raw.activities_score),
        min_price,
        max_price,
        price_range,
        segment: segment_label(avg_price_per_day, product_prices_per_day),
    }
}

/// Build described clusters from a fitted model
///
/// Empty clusters are dropped. The result is ordered by ascending average
/// price; cluster ids and colors keep the model's cluster index.
pub fn describe_clusters(products: &[ProductFeatures], model: &KMeansModel) -> Vec<Cluster> {
    let prices_per_day: Vec<f64> = products.iter().map(|p| p.raw.price_per_day).collect();

    let mut clusters: Vec<Cluster> = (0..model.n_clusters)
        .filter_map(|cluster_id| {
            let members: Vec<&ProductFeatures> = products
                .iter()
                .zip(model.labels.iter())
                .filter(|(_, label)| **label == cluster_id)
                .map(|(product, _)| product)
                .collect();

            if members.is_empty() {
                return None;
            }

            let characteristics = characterize(&members, &prices_per_day);

            Some(Cluster {
                id: cluster_id,
                name: cluster_name(&characteristics),
                description: cluster_description(&characteristics, members.len()),
                color: cluster_color(cluster_id),
                members: members.into_iter().cloned().collect(),
                centroid: model.centroids.row(cluster_id).to_vec(),
                characteristics,
            })
        })
        .collect();

    clusters.sort_by(|a, b| {
        a.characteristics
            .avg_price
            .total_cmp(&b.characteristics.avg_price)
    });
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureValues;
    use ndarray::{array, Array2};

    fn product(id: &str, price: f64, days: f64) -> ProductFeatures {
        ProductFeatures {
            id: id.to_string(),
            name: id.to_string(),
            raw: FeatureValues {
                total_price: price,
                price_per_day: price / days,
                duration_days: days,
                destination_count: 2.0,
                meals_per_day: 1.5,
                ..FeatureValues::default()
            },
            normalized: FeatureValues::default(),
        }
    }

    fn characteristics(segment: SegmentLabel, days: f64, activities: f64) -> ClusterCharacteristics {
        ClusterCharacteristics {
            avg_price: 0.0,
            avg_price_per_day: 0.0,
            avg_duration: days,
            avg_destinations: 2.4,
            avg_meals_per_day: 2.24,
            avg_activities: activities,
            min_price: 0.0,
            max_price: 0.0,
            price_range: String::new(),
            segment,
        }
    }

    #[test]
    fn test_segment_label_quartiles() {
        let per_day = [2000.0, 2400.0, 10000.0, 11000.0];

        assert_eq!(segment_label(1500.0, &per_day), SegmentLabel::Budget);
        assert_eq!(segment_label(2400.0, &per_day), SegmentLabel::Budget);
        assert_eq!(segment_label(5000.0, &per_day), SegmentLabel::MidRange);
        assert_eq!(segment_label(10500.0, &per_day), SegmentLabel::Premium);
        assert_eq!(segment_label(12000.0, &per_day), SegmentLabel::Luxury);
    }

    #[test]
    fn test_segment_label_is_sensitive_to_skew() {
        // The cheapest segment reads as mid-range because its mean sits above
        // the 25th percentile of individual products.
        let per_day = [100.0, 110.0, 120.0, 130.0, 10000.0];
        assert_eq!(segment_label(115.0, &per_day), SegmentLabel::MidRange);
        assert_eq!(segment_label(10000.0, &per_day), SegmentLabel::Luxury);
    }

    #[test]
    fn test_cluster_name() {
        assert_eq!(
            cluster_name(&characteristics(SegmentLabel::Budget, 4.0, 1.0)),
            "Budget Short Relaxed"
        );
        assert_eq!(
            cluster_name(&characteristics(SegmentLabel::MidRange, 7.0, 6.0)),
            "Value Standard Balanced"
        );
        assert_eq!(
            cluster_name(&characteristics(SegmentLabel::Luxury, 10.0, 8.5)),
            "Luxury Extended Active"
        );
    }

    #[test]
    fn test_cluster_description() {
        let c = characteristics(SegmentLabel::Premium, 5.4, 2.0);
        assert_eq!(
            cluster_description(&c, 3),
            "3 tours, ~5 days, ~2 destinations, 2.2 meals/day"
        );
        assert!(cluster_description(&c, 1).starts_with("1 tour,"));
    }

    #[test]
    fn test_cluster_color_cycles() {
        assert_eq!(cluster_color(0), CLUSTER_COLORS[0]);
        assert_eq!(cluster_color(6), CLUSTER_COLORS[0]);
        assert_eq!(cluster_color(8), CLUSTER_COLORS[2]);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0), "0");
        assert_eq!(format_price(999.4), "999");
        assert_eq!(format_price(12900.0), "12,900");
        assert_eq!(format_price(1234567.0), "1,234,567");
    }

    #[test]
    fn test_describe_clusters_orders_by_price() {
        let products = vec![
            product("lux", 55000.0, 5.0),
            product("cheap", 10000.0, 5.0),
            product("cheap2", 12000.0, 5.0),
            product("lux2", 50000.0, 5.0),
        ];
        let model = KMeansModel {
            n_clusters: 3,
            labels: array![0, 1, 1, 0],
            centroids: Array2::zeros((3, 8)),
            inertia: 0.0,
            iterations: 1,
            converged: true,
        };

        let clusters = describe_clusters(&products, &model);

        // Cluster 2 is empty and dropped
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].id, 1);
        assert_eq!(clusters[1].id, 0);
        assert_eq!(clusters[0].characteristics.avg_price, 11000.0);
        assert_eq!(clusters[0].characteristics.price_range, "10,000 - 12,000");
        assert_eq!(clusters[0].characteristics.segment, SegmentLabel::Budget);
        assert_eq!(clusters[1].characteristics.segment, SegmentLabel::Premium);
        assert_eq!(clusters[0].color, CLUSTER_COLORS[1]);
        assert_eq!(clusters[0].members.len(), 2);
        assert_eq!(clusters[0].centroid.len(), 8);
        assert_eq!(clusters[0].name, "Budget Standard Relaxed");
    }
}
