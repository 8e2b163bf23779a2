//! Console reporting of segmentation results

use crate::pipeline::ClusteringResult;
use crate::segment::format_price;
use std::fmt;

/// Plain-text segment report; render with `{}` or `to_string()`
pub struct SegmentReport<'a>(pub &'a ClusteringResult);

impl fmt::Display for SegmentReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let total = result.products.len();

        writeln!(f, "=== Segment Statistics ===")?;
        writeln!(f, "Number of clusters: {}", result.k)?;
        writeln!(f, "Total tours: {}", total)?;
        writeln!(f, "Silhouette score: {:.3}", result.silhouette_score)?;
        writeln!(
            f,
            "Within-cluster sum of squares (Inertia): {:.3}",
            result.inertia
        )?;

        writeln!(f, "\nSegments (by average price):")?;
        for cluster in &result.clusters {
            let c = &cluster.characteristics;
            let percentage = (cluster.members.len() as f64 / total as f64) * 100.0;
            writeln!(
                f,
                "  [{}] {} ({}, {})",
                cluster.id, cluster.name, c.segment, cluster.color
            )?;
            writeln!(
                f,
                "      {} tours ({:.1}%), avg price {}, range {}",
                cluster.members.len(),
                percentage,
                format_price(c.avg_price),
                c.price_range
            )?;
            writeln!(f, "      {}", cluster.description)?;
            for member in &cluster.members {
                writeln!(
                    f,
                    "        - {} ({})",
                    member.name,
                    format_price(member.raw.total_price)
                )?;
            }
        }

        writeln!(f, "\nFeature importance:")?;
        writeln!(f, "  Feature        | Share")?;
        writeln!(f, "  ---------------|------")?;
        for entry in &result.feature_importance {
            writeln!(
                f,
                "  {:14} | {:5.1}%",
                entry.feature.label(),
                entry.importance * 100.0
            )?;
        }

        Ok(())
    }
}

/// Render cluster statistics as a plain-text report
pub fn format_cluster_statistics(result: &ClusteringResult) -> String {
    SegmentReport(result).to_string()
}

/// Print cluster statistics to console
pub fn print_cluster_statistics(result: &ClusteringResult) {
    print!("{}", SegmentReport(result));
}
