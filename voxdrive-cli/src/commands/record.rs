//! `voxdrive record` — capture labelled training takes.
//!
//! Takes land under `<out>/<label_slug>/<label_slug>_<nn>.wav`, the
//! layout `voxdrive features` reads back. Re-running resumes: existing
//! takes count toward the target and are never overwritten.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use tracing::info;

use voxdrive_core::{audio::wav::save_clip, ClipRecorder, EngineConfig, Vocabulary};

use crate::commands::label_slug;

#[derive(Args)]
pub struct RecordArgs {
    /// Dataset root; one subdirectory per label
    #[arg(long, default_value = "dataset")]
    out: PathBuf,

    /// Record only this label (default: every label in turn)
    #[arg(long)]
    label: Option<String>,

    /// Takes to collect per label, counting ones already on disk
    #[arg(long, default_value = "40")]
    takes: usize,

    /// Preferred audio input device
    #[arg(long)]
    device: Option<String>,

    /// Seconds per take
    #[arg(long, default_value = "2.0")]
    seconds: f32,
}

pub fn run(args: RecordArgs) -> anyhow::Result<()> {
    let vocab = Vocabulary::default();
    let labels: Vec<String> = match &args.label {
        Some(wanted) => {
            if !vocab.labels().any(|l| l == wanted.as_str()) {
                let known: Vec<&str> = vocab.labels().collect();
                bail!("unknown label {wanted:?}; known labels: {known:?}");
            }
            vec![wanted.clone()]
        }
        None => vocab.labels().map(str::to_string).collect(),
    };

    let sample_rate = EngineConfig::default().sample_rate;
    let mut recorder = ClipRecorder::open(args.device.as_deref(), sample_rate)?;

    let stdin = std::io::stdin();
    let mut line = String::new();

    for label in labels {
        let slug = label_slug(&label);
        let dir = args.out.join(&slug);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;

        let mut have = count_takes(&dir)?;
        if have >= args.takes {
            info!(label = %label, takes = have, "label already has enough takes");
            continue;
        }

        println!("\n=== {label} ({have}/{} takes) ===", args.takes);
        while have < args.takes {
            print!(
                "take {}/{}: Enter records {:.0} s, s skips this label, q quits > ",
                have + 1,
                args.takes,
                args.seconds
            );
            std::io::stdout().flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Ok(());
            }
            match line.trim() {
                "s" | "S" => break,
                "q" | "Q" => return Ok(()),
                _ => {}
            }

            println!("say {label:?} now");
            let clip = recorder.record(args.seconds)?;

            let path = next_take_path(&dir, &slug);
            save_clip(&path, &clip)?;
            have += 1;
            info!(path = %path.display(), "take saved");
        }
    }

    println!("\ndone; featurize with: voxdrive features --dataset {}", args.out.display());
    Ok(())
}

fn count_takes(dir: &Path) -> anyhow::Result<usize> {
    let mut n = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "wav") {
            n += 1;
        }
    }
    Ok(n)
}

/// First unused `<slug>_<nn>.wav` in `dir`, so resumed sessions never
/// clobber earlier takes.
fn next_take_path(dir: &Path, slug: &str) -> PathBuf {
    let mut index = 0usize;
    loop {
        let candidate = dir.join(format!("{slug}_{index:02}.wav"));
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}
