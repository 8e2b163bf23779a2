//! TourForge: market segmentation of competing tour products using K-Means clustering
//!
//! Parsed tour records are turned into eight weighted features, partitioned
//! with k-means++ seeded Lloyd iteration, and described as named market
//! segments (budget through luxury).

pub mod cli;
pub mod data;
pub mod features;
pub mod importance;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod segment;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_record, load_records, parse_records, RawRecord};
pub use features::{Feature, FeatureScaler, FeatureValues, ProductFeatures};
pub use importance::FeatureImportance;
pub use model::{find_optimal_k, fit_kmeans, silhouette_score, KMeansModel};
pub use pipeline::{
    segment_products, segment_products_with_progress, AssignedProduct, ClusteringResult, Progress,
    SegmentationOptions, SegmentationOutcome,
};
pub use segment::{Cluster, SegmentLabel};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
