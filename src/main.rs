mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use cli::{Cli, Command, MasterArgs};
use config::Config;
use luvmaster::analysis::spectrum::BalanceIssue;
use luvmaster::analysis::transient::SpectralFluxOnsets;
use luvmaster::analysis::{self, AnalysisOptions, AnalysisReport};
use luvmaster::audio::decode::decode_audio;
use luvmaster::encode::{FfmpegLoudnorm, FfmpegTranscoder};
use luvmaster::master::auto::{self, Decision};
use luvmaster::master::preset::{MasteringParams, Platform, UserParams};
use luvmaster::master::{export_lossy, ChainStage, MasteringChain, MasteringResult};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("{:#}", e);
            let payload = serde_json::json!({ "success": false, "error": format!("{:#}", e) });
            println!("{}", payload);
            std::process::exit(1);
        }
    }
}

fn run(mut cli: Cli) -> Result<String> {
    let cfg = match config::discover(cli.config.take()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    let options = AnalysisOptions {
        max_transients: cfg.analysis.max_transients,
        logged_resonances: cfg.analysis.logged_resonances,
    };

    match cli.command {
        Command::Analyze {
            input,
            reference,
            output,
        } => run_analyze(&input, reference.as_deref(), output.as_deref(), &options),
        Command::Master(mut args) => {
            // Config values apply only where the CLI left them unset
            if !args.auto {
                args.auto = cfg.master.auto;
            }
            run_master(&args, &cfg, &options)
        }
    }
}

fn run_analyze(
    input: &Path,
    reference: Option<&Path>,
    output: Option<&Path>,
    options: &AnalysisOptions,
) -> Result<String> {
    log::info!("Input: {}", input.display());
    let signal = decode_audio(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let reference = match reference {
        Some(path) => {
            log::info!("Reference: {}", path.display());
            Some(
                decode_audio(path)
                    .with_context(|| format!("Failed to load reference {}", path.display()))?,
            )
        }
        None => None,
    };

    let report = analysis::analyze(&signal, &SpectralFluxOnsets, reference.as_ref(), options)?;
    log::info!("Quality score: {:.1}/10", report.quality_score);

    let json = serde_json::to_string_pretty(&report)?;
    if let Some(path) = output {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        log::info!("Report written to {}", path.display());
    }
    Ok(json)
}

fn run_master(args: &MasterArgs, cfg: &Config, options: &AnalysisOptions) -> Result<String> {
    log::info!("Input: {}", args.input.display());
    log::info!("Output: {}", args.output.display());

    let signal = decode_audio(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    log::info!("Analyzing before mastering...");
    let report = analysis::analyze(&signal, &SpectralFluxOnsets, None, options)?;

    let user = args.user_params();
    let requested = args.platform_or(cfg.master.platform);
    let (platform, merged, decision) = if args.auto {
        resolve_auto(&report, requested, &user)
    } else {
        (requested, user.clone(), None)
    };

    let params = MasteringParams::resolve(platform, &merged);
    log::info!(
        "Platform: {} ({:.1} LUFS, {:.1} dBTP)",
        params.platform,
        params.target_lufs,
        params.true_peak_db
    );

    let muddy = report.frequency_balance.has_issue(BalanceIssue::MuddyLowMids);
    let chain = MasteringChain::new(params.clone()).with_muddy_correction(muddy);

    let pb = ProgressBar::new(ChainStage::ALL.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    let mut started = 0u64;
    let normalizer = FfmpegLoudnorm {
        binary: cfg.ffmpeg.binary.clone(),
        loudness_range: cfg.ffmpeg.lra,
    };
    let outcome = chain.render(&signal, &args.output, &normalizer, &mut |stage| {
        pb.set_position(started);
        pb.set_message(stage.label());
        started += 1;
    })?;
    pb.set_position(started);
    pb.finish_with_message("Mastering complete");

    let mut result = MasteringResult::new(&params, user, outcome);
    result.auto = decision;
    if let Some(ref mp3) = args.mp3 {
        let transcoder = FfmpegTranscoder {
            binary: cfg.ffmpeg.binary.clone(),
            bitrate: cfg.ffmpeg.bitrate.clone(),
        };
        result.transcoded = export_lossy(&result.output, mp3, &transcoder);
    }

    log::info!("Done! Output: {}", result.output.display());
    Ok(serde_json::to_string_pretty(&result)?)
}

/// Explicit CLI values win over the automatic choice.
fn resolve_auto(
    report: &AnalysisReport,
    requested: Platform,
    user: &UserParams,
) -> (Platform, UserParams, Option<auto::AutoDecision>) {
    match auto::decide(report) {
        Decision::Applied(decision) => {
            let merged = user.clone().or(decision.params.clone());
            (decision.platform, merged, Some(decision))
        }
        Decision::Fallback { reason } => {
            log::warn!("Automatic mastering unavailable ({}), using {} defaults", reason, requested);
            (requested, user.clone(), None)
        }
    }
}
