//! End-to-end product segmentation
//!
//! Composes extraction, normalization, K-Means and cluster description into a
//! single call that never mutates its inputs and never fails: a population
//! with fewer than two priced tours yields [`SegmentationOutcome::InsufficientData`].

use crate::data::RawRecord;
use crate::features::{
    build_feature_matrix, extract_features, normalize_features, weight_values, Feature,
    FeatureScaler, ProductFeatures,
};
use crate::importance::{rank_feature_importance, FeatureImportance};
use crate::model::{
    find_optimal_k, fit_kmeans, nearest_centroid, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_K,
};
use crate::segment::{describe_clusters, Cluster};
use ndarray::ArrayView1;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

/// Minimum number of priced tours needed to segment
pub const MIN_ELIGIBLE_PRODUCTS: usize = 2;

/// Tuning knobs for a segmentation run
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationOptions {
    /// Use this cluster count instead of searching
    pub preferred_k: Option<usize>,
    /// Upper bound for the optimal-k search
    pub max_k: usize,
    /// Ceiling on Lloyd iterations per fit
    pub max_iterations: usize,
}

impl Default for SegmentationOptions {
    fn default() -> Self {
        Self {
            preferred_k: None,
            max_k: DEFAULT_MAX_K,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SegmentationOptions {
    pub fn with_preferred_k(mut self, k: usize) -> Self {
        self.preferred_k = Some(k);
        self
    }

    pub fn with_max_k(mut self, max_k: usize) -> Self {
        self.max_k = max_k;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Stage notifications passed to a progress callback
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// Features extracted; `eligible` of `total` records carry a price
    Extracted { eligible: usize, total: usize },
    /// Dimensions with no spread across the population
    DegenerateFeatures(Vec<Feature>),
    /// A candidate cluster count was scored during the search
    Evaluated { k: usize, silhouette: f64 },
    /// Cluster count settled, either searched or caller-supplied
    ChoseK { k: usize, searched: bool },
    /// Final model fitted
    Fitted { iterations: usize, converged: bool },
}

/// A product with the cluster it landed in
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedProduct {
    #[serde(flatten)]
    pub product: ProductFeatures,
    pub cluster_id: usize,
}

/// Segmentation of a tour population
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringResult {
    /// Non-empty clusters ordered by ascending average price
    pub clusters: Vec<Cluster>,
    /// Every eligible product in input order
    pub products: Vec<AssignedProduct>,
    /// Cluster count used for the final fit
    pub k: usize,
    pub silhouette_score: f64,
    /// Dimensions ordered by descending importance
    pub feature_importance: Vec<FeatureImportance>,
    /// Within-cluster sum of squares of the final fit
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Population min/max used to normalize features
    pub scaler: FeatureScaler,
}

impl ClusteringResult {
    /// Place a new record into the nearest existing segment
    ///
    /// The record is normalized with this population's scaler. Returns the
    /// cluster id, or `None` when the record has no positive price.
    pub fn assign(&self, record: &RawRecord) -> Option<usize> {
        let mut product = extract_features(record, self.products.len())?;
        product.normalized = self.scaler.transform(&product.raw);
        let point = weight_values(&product.normalized);

        let centroids = self
            .clusters
            .iter()
            .map(|cluster| ArrayView1::from(cluster.centroid.as_slice()));
        let nearest = nearest_centroid(&point.view(), centroids);

        self.clusters.get(nearest).map(|cluster| cluster.id)
    }

    /// Cluster a product id belongs to
    pub fn cluster_of(&self, product_id: &str) -> Option<&Cluster> {
        let cluster_id = self
            .products
            .iter()
            .find(|p| p.product.id == product_id)?
            .cluster_id;
        self.clusters.iter().find(|c| c.id == cluster_id)
    }
}

/// Result of a segmentation run
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationOutcome {
    Segmented(ClusteringResult),
    /// Fewer than two records had a positive price
    InsufficientData { eligible: usize, total: usize },
}

impl SegmentationOutcome {
    pub fn result(&self) -> Option<&ClusteringResult> {
        match self {
            SegmentationOutcome::Segmented(result) => Some(result),
            SegmentationOutcome::InsufficientData { .. } => None,
        }
    }

    pub fn into_result(self) -> Option<ClusteringResult> {
        match self {
            SegmentationOutcome::Segmented(result) => Some(result),
            SegmentationOutcome::InsufficientData { .. } => None,
        }
    }
}

/// Segment tour records into market clusters
///
/// # Arguments
/// * `records` - Parsed tour records; unpriced ones are skipped
/// * `options` - Cluster count and iteration settings
/// * `rng` - Randomness for seeding; pass a seeded RNG for reproducible runs
pub fn segment_products<R: Rng>(
    records: &[RawRecord],
    options: &SegmentationOptions,
    rng: &mut R,
) -> SegmentationOutcome {
    segment_products_with_progress(records, options, rng, |_| {})
}

/// [`segment_products`] with a callback invoked at each pipeline stage
pub fn segment_products_with_progress<R, F>(
    records: &[RawRecord],
    options: &SegmentationOptions,
    rng: &mut R,
    mut on_progress: F,
) -> SegmentationOutcome
where
    R: Rng,
    F: FnMut(Progress),
{
    let extracted: Vec<ProductFeatures> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| extract_features(record, index))
        .collect();

    let eligible = extracted.len();
    let total = records.len();
    debug!(eligible, total, "extracted tour features");
    on_progress(Progress::Extracted { eligible, total });

    if eligible < MIN_ELIGIBLE_PRODUCTS {
        info!(eligible, total, "not enough priced tours to segment");
        return SegmentationOutcome::InsufficientData { eligible, total };
    }

    let (products, scaler) = normalize_features(&extracted);
    let degenerate = scaler.degenerate_features();
    if !degenerate.is_empty() {
        debug!(?degenerate, "features without spread");
        on_progress(Progress::DegenerateFeatures(degenerate));
    }

    let weighted = build_feature_matrix(&products);

    let (k, searched) = match options.preferred_k {
        Some(k) => (k.clamp(1, eligible), false),
        None => {
            let selection = find_optimal_k(&weighted, options.max_k, options.max_iterations, rng);
            for &(k, silhouette) in &selection.scores {
                on_progress(Progress::Evaluated { k, silhouette });
            }
            (selection.k, true)
        }
    };
    debug!(k, searched, "cluster count resolved");
    on_progress(Progress::ChoseK { k, searched });

    let model = fit_kmeans(&weighted, k, options.max_iterations, rng);
    on_progress(Progress::Fitted {
        iterations: model.iterations,
        converged: model.converged,
    });

    let silhouette_score = model.silhouette_score(&weighted);
    let clusters = describe_clusters(&products, &model);
    let feature_importance = rank_feature_importance(&weighted);

    info!(
        k,
        clusters = clusters.len(),
        silhouette_score,
        "segmented {} tours",
        eligible
    );

    let products = products
        .into_iter()
        .zip(model.labels.iter())
        .map(|(product, &cluster_id)| AssignedProduct {
            product,
            cluster_id,
        })
        .collect();

    SegmentationOutcome::Segmented(ClusteringResult {
        clusters,
        products,
        k: model.n_clusters,
        silhouette_score,
        feature_importance,
        inertia: model.inertia,
        iterations: model.iterations,
        converged: model.converged,
        scaler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PricingEntry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn tour(name: &str, price: Option<f64>, duration: &str) -> RawRecord {
        RawRecord {
            tour_name: Some(name.to_string()),
            pricing: price
                .map(|p| {
                    vec![PricingEntry {
                        price: Some(p),
                        currency: Some("THB".to_string()),
                        period: None,
                    }]
                })
                .unwrap_or_default(),
            duration: Some(duration.to_string()),
            ..RawRecord::default()
        }
    }

    fn market() -> Vec<RawRecord> {
        vec![
            tour("Bangkok Saver", Some(10000.0), "5 days"),
            tour("Bangkok Classic", Some(12000.0), "5 days"),
            tour("Bangkok Deluxe", Some(50000.0), "5 days"),
            tour("Bangkok Royal", Some(55000.0), "5 days"),
        ]
    }

    #[test]
    fn test_insufficient_data() {
        let mut rng = StdRng::seed_from_u64(1);
        let records = vec![
            tour("Only priced", Some(9000.0), "3 days"),
            tour("No price", None, "3 days"),
        ];

        let outcome = segment_products(&records, &SegmentationOptions::default(), &mut rng);
        assert_eq!(
            outcome,
            SegmentationOutcome::InsufficientData {
                eligible: 1,
                total: 2
            }
        );
        assert!(outcome.result().is_none());

        let outcome = segment_products(&[], &SegmentationOptions::default(), &mut rng);
        assert!(outcome.into_result().is_none());
    }

    #[test]
    fn test_two_products_skip_search() {
        let mut rng = StdRng::seed_from_u64(2);
        let records = &market()[..2];

        let mut evaluated = 0;
        let outcome = segment_products_with_progress(
            records,
            &SegmentationOptions::default(),
            &mut rng,
            |event| {
                if matches!(event, Progress::Evaluated { .. }) {
                    evaluated += 1;
                }
            },
        );

        let result = outcome.into_result().unwrap();
        assert_eq!(result.k, 2);
        assert_eq!(evaluated, 0);
        assert_eq!(result.clusters.len(), 2);
    }

    #[test]
    fn test_preferred_k_bypasses_search() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut events = Vec::new();

        let outcome = segment_products_with_progress(
            &market(),
            &SegmentationOptions::default().with_preferred_k(3),
            &mut rng,
            |event| events.push(event),
        );

        let result = outcome.into_result().unwrap();
        assert_eq!(result.k, 3);
        assert!(events.contains(&Progress::ChoseK {
            k: 3,
            searched: false
        }));
        assert!(!events
            .iter()
            .any(|e| matches!(e, Progress::Evaluated { .. })));
    }

    #[test]
    fn test_preferred_k_is_clamped_to_population() {
        let mut rng = StdRng::seed_from_u64(4);
        let outcome = segment_products(
            &market(),
            &SegmentationOptions::default().with_preferred_k(10),
            &mut rng,
        );
        assert_eq!(outcome.into_result().unwrap().k, 4);
    }

    #[test]
    fn test_every_product_in_exactly_one_cluster() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut records = market();
        records.push(tour("Phuket Beach", Some(18000.0), "4 days"));
        records.push(tour("Chiang Mai Trek", Some(22000.0), "8 days"));

        let result = segment_products(&records, &SegmentationOptions::default(), &mut rng)
            .into_result()
            .unwrap();

        let member_ids: Vec<&str> = result
            .clusters
            .iter()
            .flat_map(|c| c.members.iter().map(|m| m.id.as_str()))
            .collect();
        let unique: HashSet<&str> = member_ids.iter().copied().collect();

        assert_eq!(member_ids.len(), records.len());
        assert_eq!(unique.len(), records.len());
        assert!((2..=5).contains(&result.k));
        for product in &result.products {
            let cluster = result.cluster_of(&product.product.id).unwrap();
            assert_eq!(cluster.id, product.cluster_id);
        }
    }

    #[test]
    fn test_assign_new_record() {
        let mut rng = StdRng::seed_from_u64(6);
        let result = segment_products(
            &market(),
            &SegmentationOptions::default().with_preferred_k(2),
            &mut rng,
        )
        .into_result()
        .unwrap();

        let cheap = result.clusters[0].id;
        let pricey = result.clusters[1].id;

        assert_eq!(
            result.assign(&tour("New budget", Some(11000.0), "5 days")),
            Some(cheap)
        );
        assert_eq!(
            result.assign(&tour("New premium", Some(60000.0), "5 days")),
            Some(pricey)
        );
        assert_eq!(result.assign(&tour("Unpriced", None, "5 days")), None);
    }

    #[test]
    fn test_assign_agrees_with_fitted_labels() {
        let mut rng = StdRng::seed_from_u64(8);
        let records = market();
        let result = segment_products(
            &records,
            &SegmentationOptions::default().with_preferred_k(2),
            &mut rng,
        )
        .into_result()
        .unwrap();

        for (record, product) in records.iter().zip(&result.products) {
            assert_eq!(result.assign(record), Some(product.cluster_id));
        }
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let mut rng = StdRng::seed_from_u64(7);
        let records = market();
        let snapshot = records.clone();

        let _ = segment_products(&records, &SegmentationOptions::default(), &mut rng);
        assert_eq!(records, snapshot);
    }
}
