//! Command-line interface definitions and argument parsing

use crate::model::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_K};
use crate::pipeline::SegmentationOptions;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Tour market segmentation using K-Means clustering
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a JSON file of parsed tour records
    #[arg(short, long, default_value = "tours.json")]
    pub input: String,

    /// Fixed number of clusters; searched by silhouette score when omitted
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Largest cluster count tried by the search
    #[arg(long, default_value_t = DEFAULT_MAX_K)]
    pub max_k: usize,

    /// Maximum Lloyd iterations per K-Means fit
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iters: usize,

    /// Seed for reproducible clustering
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Assign the tour record in this JSON file to a segment
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Print the clustering result as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Check numeric arguments and build segmentation options
    pub fn segmentation_options(&self) -> crate::Result<SegmentationOptions> {
        if self.max_k < 2 {
            anyhow::bail!("--max-k must be at least 2, got {}", self.max_k);
        }
        if self.max_iters == 0 {
            anyhow::bail!("--max-iters must be positive");
        }

        let mut options = SegmentationOptions::default()
            .with_max_k(self.max_k)
            .with_max_iterations(self.max_iters);

        if let Some(k) = self.clusters {
            if k == 0 {
                anyhow::bail!("Number of clusters must be positive");
            }
            options = options.with_preferred_k(k);
        }

        Ok(options)
    }

    /// Seeded RNG when `--seed` is given, entropy-seeded otherwise
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
