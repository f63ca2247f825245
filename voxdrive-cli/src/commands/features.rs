//! `voxdrive features` — featurize a dataset and fit the scaler.
//!
//! Walks the layout `voxdrive record` produces, extracts one feature
//! vector per take, fits the scaler on the whole set, and writes two
//! artifacts: `scaler.json` (loaded by `voxdrive listen`) and
//! `features.csv` (scaled vectors, one row per take, for training the
//! classifier offline).

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use tracing::{info, warn};

use voxdrive_core::{
    audio::wav::load_clip, EngineConfig, FeatureExtractor, FeatureScaler, SilencePolicy,
    Vocabulary, FEATURE_DIM,
};

use crate::commands::label_slug;

#[derive(Args)]
pub struct FeaturesArgs {
    /// Dataset root produced by `voxdrive record`
    #[arg(long, default_value = "dataset")]
    dataset: PathBuf,

    /// Output directory for scaler.json and features.csv
    #[arg(long, default_value = "artifacts")]
    out: PathBuf,

    /// Trim threshold in dB below the clip peak
    #[arg(long, default_value = "25.0")]
    top_db: f32,

    /// Featurize untrimmed audio instead of skipping silent takes
    #[arg(long)]
    keep_going: bool,
}

pub fn run(args: FeaturesArgs) -> anyhow::Result<()> {
    let sample_rate = EngineConfig::default().sample_rate;
    let policy = if args.keep_going {
        SilencePolicy::FallBackToUntrimmed
    } else {
        SilencePolicy::Reject
    };
    let extractor = FeatureExtractor::new(sample_rate, args.top_db, policy);
    let vocab = Vocabulary::default();

    let mut rows: Vec<(String, Vec<f32>)> = Vec::new();
    for label in vocab.labels() {
        let dir = args.dataset.join(label_slug(label));
        if !dir.is_dir() {
            warn!(label = %label, dir = %dir.display(), "no takes for this label");
            continue;
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("reading {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "wav"))
            .collect();
        files.sort();

        let before = rows.len();
        for file in files {
            match load_clip(&file, sample_rate).and_then(|clip| extractor.extract(&clip)) {
                Ok(vector) => rows.push((label.to_string(), vector)),
                Err(e) => warn!(file = %file.display(), error = %e, "take skipped"),
            }
        }
        info!(label = %label, takes = rows.len() - before, "label featurized");
    }

    if rows.is_empty() {
        bail!("no usable takes under {}", args.dataset.display());
    }

    let vectors: Vec<Vec<f32>> = rows.iter().map(|(_, v)| v.clone()).collect();
    let scaler = FeatureScaler::fit(&vectors)?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let scaler_path = args.out.join("scaler.json");
    scaler.save(&scaler_path)?;

    let csv_path = args.out.join("features.csv");
    let mut csv = String::from("label");
    for i in 0..FEATURE_DIM {
        let _ = write!(csv, ",f{i:02}");
    }
    csv.push('\n');
    for (label, vector) in &rows {
        let scaled = scaler.transform(vector)?;
        csv.push_str(label);
        for value in scaled {
            let _ = write!(csv, ",{value}");
        }
        csv.push('\n');
    }
    fs::write(&csv_path, csv).with_context(|| format!("writing {}", csv_path.display()))?;

    info!(takes = rows.len(), scaler = %scaler_path.display(), "artifacts written");
    println!(
        "fitted scaler on {} takes; artifacts in {}",
        rows.len(),
        args.out.display()
    );
    Ok(())
}
