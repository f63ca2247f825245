//! `voxdrive listen` — the interactive recognition loop.
//!
//! Each cycle waits for Enter, records one fixed-length clip, runs the
//! full recognizer, and prints what both paths heard. Quitting (q,
//! EOF, Ctrl-C, or any fatal error) always goes through the engine's
//! shutdown so the vehicle receives the stop command before the port
//! closes.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use voxdrive_core::{
    audio::wav::save_clip, classifier::default_models_dir, ClipRecorder, CommandEngine,
    CommandLink, CommandModel, CycleReport, DispatchOutcome, EngineConfig, FeatureScaler,
    GoogleTranslator, OnnxClassifier, SerialLink, SilencePolicy, StubModel, Vocabulary,
    WhisperApiTranscriber, FEATURE_DIM,
};

#[derive(Args)]
pub struct ListenArgs {
    /// Preferred audio input device (substring match; default device otherwise)
    #[arg(long)]
    device: Option<String>,

    /// Serial port for the vehicle (e.g. /dev/ttyUSB0, COM3); omit to dry-run
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value = "9600")]
    baud: u32,

    /// Path to the classifier ONNX model
    #[arg(long)]
    model: Option<PathBuf>,

    /// Path to the fitted scaler JSON
    #[arg(long)]
    scaler: Option<PathBuf>,

    /// Use a uniform stub classifier instead of ONNX (transcript path only)
    #[arg(long)]
    stub_model: bool,

    /// Minimum classifier confidence for its vote to count
    #[arg(long, default_value = "0.7")]
    threshold: f32,

    /// Minimum transcript similarity to claim a command
    #[arg(long, default_value = "0.6")]
    cutoff: f64,

    /// Trim threshold in dB below the clip peak
    #[arg(long, default_value = "25.0")]
    top_db: f32,

    /// Analyze untrimmed audio instead of rejecting silent clips
    #[arg(long)]
    keep_going: bool,

    /// Save every recorded clip into this directory
    #[arg(long)]
    save_clips: Option<PathBuf>,
}

pub fn run(args: ListenArgs) -> anyhow::Result<()> {
    let config = EngineConfig {
        trim_top_db: args.top_db,
        silence_policy: if args.keep_going {
            SilencePolicy::FallBackToUntrimmed
        } else {
            SilencePolicy::Reject
        },
        confidence_threshold: args.threshold,
        match_cutoff: args.cutoff,
        ..EngineConfig::default()
    };
    let vocab = Vocabulary::default();

    let (model, scaler): (Box<dyn CommandModel>, FeatureScaler) = if args.stub_model {
        info!("classifier stubbed out, relying on the transcript path");
        (
            Box::new(StubModel::uniform(vocab.len())),
            FeatureScaler::identity(FEATURE_DIM),
        )
    } else {
        let model_path = args
            .model
            .unwrap_or_else(|| default_models_dir().join("classifier.onnx"));
        let scaler_path = args
            .scaler
            .unwrap_or_else(|| default_models_dir().join("scaler.json"));
        let scaler = FeatureScaler::load(&scaler_path)
            .with_context(|| format!("loading scaler from {}", scaler_path.display()))?;
        (Box::new(OnnxClassifier::new(model_path, FEATURE_DIM)), scaler)
    };

    let stt = WhisperApiTranscriber::from_env()
        .context("transcription needs OPENAI_API_KEY in the environment")?;
    let translator = GoogleTranslator::new().context("building the translation client")?;

    let link: Option<Box<dyn CommandLink>> = match &args.port {
        Some(port) => Some(Box::new(
            SerialLink::open(port, args.baud)
                .with_context(|| format!("opening serial port {port}"))?,
        )),
        None => {
            info!("no serial port given, decisions will be printed only");
            None
        }
    };

    let mut engine = CommandEngine::new(
        config,
        vocab,
        model,
        scaler,
        Box::new(stt),
        Box::new(translator),
        link,
    )?;
    engine.warm_up()?;

    let mut recorder = ClipRecorder::open(args.device.as_deref(), engine.config().sample_rate)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
            eprintln!("\ninterrupted, stopping after this cycle (press Enter)");
        })
        .context("installing the Ctrl-C handler")?;
    }

    if let Some(dir) = &args.save_clips {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating clip directory {}", dir.display()))?;
    }

    println!("vocabulary:");
    for (index, label) in engine.vocab().labels().enumerate() {
        let code = engine.vocab().code(index).unwrap_or(b'?') as char;
        println!("  {label:<12} → '{code}'");
    }

    let clip_seconds = engine.config().clip_seconds;
    let stdin = std::io::stdin();
    let mut line = String::new();
    let mut take = 0usize;

    while running.load(Ordering::SeqCst) {
        print!("\npress Enter to speak ({clip_seconds:.0} s), q + Enter to quit > ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().eq_ignore_ascii_case("q") || !running.load(Ordering::SeqCst) {
            break;
        }

        println!("listening...");
        let clip = recorder.record(clip_seconds)?;

        if let Some(dir) = &args.save_clips {
            let path = dir.join(format!("take_{take:03}.wav"));
            match save_clip(&path, &clip) {
                Ok(()) => info!(path = %path.display(), "clip saved"),
                Err(e) => warn!(error = %e, "could not save the clip"),
            }
            take += 1;
        }

        match engine.process_clip(&clip) {
            Ok(report) => print_report(&report, engine.vocab()),
            Err(e) => warn!(error = %e, "clip rejected"),
        }
    }

    engine.shutdown();
    Ok(())
}

fn print_report(report: &CycleReport, vocab: &Vocabulary) {
    let label_of = |index: Option<usize>| match index.and_then(|i| vocab.label(i)) {
        Some(label) => label.to_string(),
        None => "-".to_string(),
    };

    if report.transcript_trace.stt_failed {
        println!("  heard      : (transcription failed)");
    } else {
        println!("  heard      : {:?}", report.transcript_trace.transcript);
    }
    match report.transcript_trace.similarity {
        Some(s) => println!(
            "  transcript : {} (similarity {s:.2})",
            label_of(report.transcript.command)
        ),
        None => println!("  transcript : -"),
    }
    println!(
        "  classifier : {} (confidence {:.2})",
        label_of(report.classifier.command),
        report.classifier.confidence
    );
    match report.dispatch {
        DispatchOutcome::Sent(code) => {
            println!("  decision   : {} → sent '{}'", label_of(report.decision), code as char);
        }
        DispatchOutcome::NotConnected => {
            println!("  decision   : {} (no serial link)", label_of(report.decision));
        }
        DispatchOutcome::Failed => {
            println!("  decision   : {} (serial write failed)", label_of(report.decision));
        }
        DispatchOutcome::NoDecision => println!("  decision   : none"),
    }
}
