//! Ranking of feature dimensions by their share of population variance

use crate::features::{Feature, N_FEATURES};
use ndarray::{Array2, Axis};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImportance {
    pub feature: Feature,
    /// Share of total variance, in `[0, 1]`
    pub importance: f64,
}

/// Rank the weighted dimensions by population variance
///
/// Importances sum to 1 unless every dimension is constant, in which case
/// all are 0. Ties keep dimension order.
pub fn rank_feature_importance(weighted: &Array2<f64>) -> Vec<FeatureImportance> {
    let variances = if weighted.nrows() == 0 {
        vec![0.0; N_FEATURES]
    } else {
        weighted.var_axis(Axis(0), 0.0).to_vec()
    };
    let total: f64 = variances.iter().sum();

    let mut ranking: Vec<FeatureImportance> = Feature::ALL
        .iter()
        .zip(variances)
        .map(|(&feature, variance)| FeatureImportance {
            feature,
            importance: if total > 0.0 { variance / total } else { 0.0 },
        })
        .collect();

    ranking.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranking
}
