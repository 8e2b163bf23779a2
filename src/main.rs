//! TourForge: Tour market segmentation CLI using K-Means clustering
//!
//! This is the main entrypoint that orchestrates record loading, segmentation,
//! reporting, and segment assignment for a new tour.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use tourforge::{
    load_record, load_records, report, segment_products_with_progress, Args, ClusteringResult,
    Progress, SegmentationOutcome,
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if args.verbose && !args.json {
        println!("TourForge - Tour Segmentation using K-Means");
        println!("===========================================\n");
    }

    let Some(result) = run_segmentation(&args)? else {
        return Ok(());
    };

    match &args.predict {
        Some(path) => run_prediction_mode(&args, &result, path),
        None if args.json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        None => {
            report::print_cluster_statistics(&result);
            Ok(())
        }
    }
}

/// Load records and segment them, reporting progress when verbose
fn run_segmentation(args: &Args) -> Result<Option<ClusteringResult>> {
    let options = args.segmentation_options()?;
    let mut rng = args.rng();
    let start_time = Instant::now();

    let records = load_records(&args.input)?;
    let verbose = args.verbose && !args.json;

    let outcome = segment_products_with_progress(&records, &options, &mut rng, |event| {
        if !verbose {
            return;
        }
        match event {
            Progress::Extracted { eligible, total } => {
                println!("✓ Loaded {} records, {} with pricing", total, eligible)
            }
            Progress::DegenerateFeatures(features) => {
                let names: Vec<&str> = features.iter().map(|f| f.label()).collect();
                println!("  Constant features: {}", names.join(", "));
            }
            Progress::Evaluated { k, silhouette } => {
                println!("  k={}: silhouette {:.3}", k, silhouette)
            }
            Progress::ChoseK { k, searched } => {
                let how = if searched { "by silhouette" } else { "as requested" };
                println!("✓ Using {} clusters ({})", k, how)
            }
            Progress::Fitted {
                iterations,
                converged,
            } => println!(
                "✓ Model fitted in {} iterations{}",
                iterations,
                if converged { "" } else { " (iteration limit)" }
            ),
        }
    });

    match outcome {
        SegmentationOutcome::Segmented(result) => {
            if verbose {
                println!(
                    "  Processing time: {:.3}s\n",
                    start_time.elapsed().as_secs_f64()
                );
            }
            Ok(Some(result))
        }
        SegmentationOutcome::InsufficientData { eligible, total } => {
            if args.json {
                println!("{}", serde_json::json!({ "insufficientData": { "eligible": eligible, "total": total } }));
            } else {
                println!(
                    "Not enough priced tours to segment: {} of {} records have a price (need at least 2)",
                    eligible, total
                );
            }
            Ok(None)
        }
    }
}

/// Assign a single tour to one of the fitted segments
fn run_prediction_mode(args: &Args, result: &ClusteringResult, path: &str) -> Result<()> {
    let record = load_record(path)?;
    let name = record.tour_name.as_deref().unwrap_or("Unknown Tour");

    let Some(cluster_id) = result.assign(&record) else {
        anyhow::bail!("Tour '{}' has no price and cannot be assigned", name);
    };
    let cluster = result
        .clusters
        .iter()
        .find(|c| c.id == cluster_id)
        .ok_or_else(|| anyhow::anyhow!("Cluster {} not found", cluster_id))?;

    if args.json {
        println!(
            "{}",
            serde_json::json!({ "tour": name, "clusterId": cluster_id, "segment": cluster })
        );
        return Ok(());
    }

    println!("=== Prediction Mode ===");
    println!("\n✓ '{}' belongs to segment {}: {}", name, cluster.id, cluster.name);
    println!("  Label: {}", cluster.characteristics.segment);
    println!("  {}", cluster.description);
    println!("  Price range: {}", cluster.characteristics.price_range);

    Ok(())
}
