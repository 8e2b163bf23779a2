//! K-Means clustering implemented from first principles
//!
//! Seeding uses k-means++, fitting uses Lloyd's iteration and model selection
//! uses the silhouette coefficient. All randomness comes from the caller's
//! RNG so runs are reproducible with a seeded generator.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use tracing::debug;

/// Default ceiling on Lloyd iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default upper bound for the optimal-k search
pub const DEFAULT_MAX_K: usize = 5;

/// Fitted K-Means partition
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster assignment for every row of the training matrix
    pub labels: Array1<usize>,
    /// Cluster centroids in weighted feature space
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares (inertia)
    pub inertia: f64,
    /// Lloyd iterations performed
    pub iterations: usize,
    /// Whether the assignment stabilized before the iteration ceiling
    pub converged: bool,
}

impl KMeansModel {
    /// Index of the nearest centroid for a point
    pub fn predict(&self, features: &ArrayView1<f64>) -> usize {
        nearest_centroid(features, self.centroids.outer_iter())
    }

    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Silhouette coefficient of this partition over its training matrix
    pub fn silhouette_score(&self, features: &Array2<f64>) -> f64 {
        silhouette_score(features, &self.labels, self.n_clusters)
    }
}

/// Choose initial centroids with k-means++
///
/// The first centroid is a uniformly random point; each following one is
/// drawn with probability proportional to its squared distance from the
/// nearest centroid chosen so far. Returns row indices into `features`.
pub fn kmeans_plus_plus_init<R: Rng>(
    features: &ArrayView2<f64>,
    k: usize,
    rng: &mut R,
) -> Vec<usize> {
    let n = features.nrows();
    let k = k.min(n);
    if k == 0 {
        return Vec::new();
    }

    let mut chosen = Vec::with_capacity(k);
    let first = rng.gen_range(0..n);
    chosen.push(first);

    let mut min_distances: Vec<f64> = features
        .outer_iter()
        .map(|row| squared_distance(&row, &features.row(first)))
        .collect();

    while chosen.len() < k {
        let sum: f64 = min_distances.iter().sum();
        let next = if sum > 0.0 {
            sample_by_distance(rng, &min_distances, sum)
        } else {
            // All remaining points coincide with a centroid
            rng.gen_range(0..n)
        };
        chosen.push(next);

        let centroid = features.row(next);
        for (distance, row) in min_distances.iter_mut().zip(features.outer_iter()) {
            *distance = distance.min(squared_distance(&row, &centroid));
        }
    }

    chosen
}

fn sample_by_distance<R: Rng>(rng: &mut R, min_distances: &[f64], sum: f64) -> usize {
    let threshold = rng.gen::<f64>() * sum;
    let mut cumsum = 0.0;

    for (i, &distance) in min_distances.iter().enumerate() {
        cumsum += distance;
        if cumsum > threshold {
            return i;
        }
    }

    // Rounding can leave the threshold just above the final cumsum
    min_distances
        .iter()
        .rposition(|&d| d > 0.0)
        .unwrap_or(min_distances.len() - 1)
}

/// Fit K-Means on a weighted feature matrix
///
/// # Arguments
/// * `features` - (n_samples, n_features) matrix
/// * `n_clusters` - Requested cluster count, clamped to `1..=n_samples`
/// * `max_iters` - Ceiling on Lloyd iterations
/// * `rng` - Source for seeding and empty-cluster reseeding
///
/// # Returns
/// * Fitted `KMeansModel`; an empty matrix yields an empty model
pub fn fit_kmeans<R: Rng>(
    features: &Array2<f64>,
    n_clusters: usize,
    max_iters: usize,
    rng: &mut R,
) -> KMeansModel {
    let n_samples = features.nrows();
    if n_samples == 0 {
        return KMeansModel {
            n_clusters: 0,
            labels: Array1::zeros(0),
            centroids: Array2::zeros((0, features.ncols())),
            inertia: 0.0,
            iterations: 0,
            converged: true,
        };
    }

    let n_clusters = n_clusters.clamp(1, n_samples);
    let seeds = kmeans_plus_plus_init(&features.view(), n_clusters, rng);
    let mut centroids = features.select(ndarray::Axis(0), &seeds);

    let max_iters = max_iters.max(1);
    let mut labels: Option<Array1<usize>> = None;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iters {
        iterations += 1;
        let assignment = assign_points(features, &centroids);

        if labels.as_ref() == Some(&assignment) {
            converged = true;
            break;
        }

        // Last pass: no reseed, centroids must describe the reported labels
        if iterations == max_iters {
            member_means(features, &assignment, &mut centroids);
        } else {
            update_centroids(features, &assignment, &mut centroids, rng);
        }
        labels = Some(assignment);
    }

    let labels = labels.unwrap_or_else(|| assign_points(features, &centroids));
    let inertia = compute_inertia(features, &labels, &centroids);

    debug!(n_clusters, iterations, converged, inertia, "k-means fitted");

    KMeansModel {
        n_clusters,
        labels,
        centroids,
        inertia,
        iterations,
        converged,
    }
}

/// Map every point to its nearest centroid
fn assign_points(features: &Array2<f64>, centroids: &Array2<f64>) -> Array1<usize> {
    features
        .outer_iter()
        .map(|point| nearest_centroid(&point, centroids.outer_iter()))
        .collect()
}

/// Position of the nearest centroid; ties go to the lowest position
///
/// Returns 0 when there are no centroids.
pub fn nearest_centroid<'a, I>(point: &ArrayView1<f64>, centroids: I) -> usize
where
    I: IntoIterator<Item = ArrayView1<'a, f64>>,
{
    let mut min_distance = f64::INFINITY;
    let mut closest_cluster = 0;

    for (cluster_idx, centroid) in centroids.into_iter().enumerate() {
        let distance = squared_distance(point, &centroid);
        if distance < min_distance {
            min_distance = distance;
            closest_cluster = cluster_idx;
        }
    }

    closest_cluster
}

/// Recompute centroids as member means, reseeding empty clusters
fn update_centroids<R: Rng>(
    features: &Array2<f64>,
    labels: &Array1<usize>,
    centroids: &mut Array2<f64>,
    rng: &mut R,
) {
    let counts = member_means(features, labels, centroids);

    for (cluster, count) in counts.into_iter().enumerate() {
        if count == 0 {
            let replacement = rng.gen_range(0..features.nrows());
            debug!(cluster, replacement, "reseeding empty cluster");
            centroids.row_mut(cluster).assign(&features.row(replacement));
        }
    }
}

/// Move every non-empty cluster's centroid to the mean of its members
///
/// Empty clusters keep their centroid. Returns the member count per cluster.
fn member_means(
    features: &Array2<f64>,
    labels: &Array1<usize>,
    centroids: &mut Array2<f64>,
) -> Vec<usize> {
    let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
    let mut counts = vec![0usize; centroids.nrows()];

    for (point, &label) in features.outer_iter().zip(labels.iter()) {
        let mut sum = sums.row_mut(label);
        sum += &point;
        counts[label] += 1;
    }

    for (cluster, &count) in counts.iter().enumerate() {
        if count > 0 {
            let mean = &sums.row(cluster) / count as f64;
            centroids.row_mut(cluster).assign(&mean);
        }
    }

    counts
}

/// Mean silhouette coefficient of a partition
///
/// For each point, `a` is the mean distance to the other members of its
/// cluster and `b` the smallest mean distance to another non-empty cluster.
/// A point alone in its cluster contributes 0.
/// Returns 0 when there are fewer than two points or two clusters.
pub fn silhouette_score(features: &Array2<f64>, labels: &Array1<usize>, n_clusters: usize) -> f64 {
    let n_samples = features.nrows();
    if n_samples < 2 || n_clusters < 2 {
        return 0.0;
    }

    let mut silhouette_sum = 0.0;

    for i in 0..n_samples {
        let point = features.row(i);
        let cluster_label = labels[i];

        let mut distance_sums = vec![0.0; n_clusters];
        let mut counts = vec![0usize; n_clusters];

        for j in 0..n_samples {
            if i == j {
                continue;
            }
            let other_label = labels[j];
            if other_label < n_clusters {
                distance_sums[other_label] += euclidean_distance(&point, &features.row(j));
                counts[other_label] += 1;
            }
        }

        if counts[cluster_label] == 0 {
            continue;
        }
        let a_i = distance_sums[cluster_label] / counts[cluster_label] as f64;

        let b_i = (0..n_clusters)
            .filter(|&c| c != cluster_label && counts[c] > 0)
            .map(|c| distance_sums[c] / counts[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let b_i = if b_i.is_finite() { b_i } else { 0.0 };

        let denominator = a_i.max(b_i);
        let silhouette_i = if denominator == 0.0 {
            0.0
        } else {
            (b_i - a_i) / denominator
        };

        silhouette_sum += silhouette_i;
    }

    silhouette_sum / n_samples as f64
}

/// Outcome of the optimal-k sweep
#[derive(Debug, Clone, PartialEq)]
pub struct KSelection {
    /// Best cluster count
    pub k: usize,
    /// Silhouette score per candidate k, in sweep order
    pub scores: Vec<(usize, f64)>,
}

/// Pick the cluster count with the highest silhouette score
///
/// Populations of two or fewer points skip the search. Otherwise every k in
/// `2..=min(max_k, n - 1)` is fitted and scored; the first k reaching the
/// best score wins.
pub fn find_optimal_k<R: Rng>(
    features: &Array2<f64>,
    max_k: usize,
    max_iters: usize,
    rng: &mut R,
) -> KSelection {
    let n_samples = features.nrows();
    if n_samples <= 2 {
        return KSelection {
            k: n_samples.min(2),
            scores: Vec::new(),
        };
    }

    let upper = max_k.min(n_samples - 1).max(2);
    let mut best_k = 2;
    let mut best_score = f64::NEG_INFINITY;
    let mut scores = Vec::with_capacity(upper - 1);

    for k in 2..=upper {
        let model = fit_kmeans(features, k, max_iters, rng);
        let score = model.silhouette_score(features);
        debug!(k, score, "evaluated cluster count");
        scores.push((k, score));

        if score > best_score {
            best_score = score;
            best_k = k;
        }
    }

    KSelection { k: best_k, scores }
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    let mut inertia = 0.0;

    for (i, &cluster) in labels.iter().enumerate() {
        if cluster < centroids.nrows() {
            inertia += squared_distance(&features.row(i), &centroids.row(cluster));
        }
    }

    inertia
}

fn squared_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
}

/// Calculate Euclidean distance between two points
pub fn euclidean_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    squared_distance(point1, point2).sqrt()
}
