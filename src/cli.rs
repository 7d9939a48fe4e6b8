use clap::{Args, Parser, Subcommand};
use luvmaster::master::preset::{Platform, UserParams};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "luvmaster", about = "Audio analysis and platform-targeted mastering")]
pub struct Cli {
    /// Config file (defaults to luvmaster.toml or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a track and write a JSON report
    Analyze {
        /// Input audio file (WAV, MP3, FLAC, OGG)
        input: PathBuf,

        /// Reference track to compare against
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Write the report here as well as to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Master a track for a streaming platform
    Master(MasterArgs),
}

#[derive(Args, Debug)]
pub struct MasterArgs {
    /// Input audio file
    pub input: PathBuf,

    /// Output WAV file
    pub output: PathBuf,

    /// Target platform preset [default: from config, else spotify]
    #[arg(short, long, value_enum)]
    pub platform: Option<Platform>,

    /// Bass gain at 100 Hz in dB (-12 to 12)
    #[arg(long, allow_negative_numbers = true)]
    pub bass: Option<f32>,

    /// Mid gain at 1 kHz in dB (-12 to 12)
    #[arg(long, allow_negative_numbers = true)]
    pub mids: Option<f32>,

    /// High gain at 8 kHz in dB (-12 to 12)
    #[arg(long, allow_negative_numbers = true)]
    pub highs: Option<f32>,

    /// Stereo width in percent (0-200, 100 = unchanged)
    #[arg(long)]
    pub width: Option<f32>,

    /// Compression level (1-10)
    #[arg(long)]
    pub compression: Option<u8>,

    /// Harmonic saturation in percent (0-100)
    #[arg(long)]
    pub warmth: Option<f32>,

    /// Integrated loudness target in LUFS, overriding the platform
    #[arg(long, allow_negative_numbers = true)]
    pub loudness: Option<f32>,

    /// Choose platform and unset parameters from the analysis
    #[arg(long)]
    pub auto: bool,

    /// Also export an MP3 to this path
    #[arg(long)]
    pub mp3: Option<PathBuf>,
}

impl MasterArgs {
    /// An explicit `--platform` wins over the configured one.
    pub fn platform_or(&self, configured: Platform) -> Platform {
        self.platform.unwrap_or(configured)
    }

    pub fn user_params(&self) -> UserParams {
        UserParams {
            bass: self.bass,
            mids: self.mids,
            highs: self.highs,
            width: self.width,
            compression: self.compression,
            saturation: self.warmth,
            target_lufs: self.loudness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_master_overrides() {
        let cli = Cli::parse_from([
            "luvmaster", "master", "in.wav", "out.wav", "--platform", "tidal", "--bass", "-3",
            "--warmth", "40", "--loudness", "-12.5",
        ]);
        let Command::Master(args) = cli.command else {
            panic!("expected master");
        };
        assert_eq!(args.platform, Some(Platform::Tidal));
        let params = args.user_params();
        assert_eq!(params.bass, Some(-3.0));
        assert_eq!(params.saturation, Some(40.0));
        assert_eq!(params.target_lufs, Some(-12.5));
        assert_eq!(params.mids, None);
    }

    #[test]
    fn explicit_platform_beats_config() {
        let parse = |argv: &[&str]| match Cli::parse_from(argv).command {
            Command::Master(args) => args,
            _ => panic!("expected master"),
        };

        let explicit = parse(&["luvmaster", "master", "in.wav", "out.wav", "-p", "spotify"]);
        assert_eq!(explicit.platform_or(Platform::Tidal), Platform::Spotify);

        let unset = parse(&["luvmaster", "master", "in.wav", "out.wav"]);
        assert_eq!(unset.platform, None);
        assert_eq!(unset.platform_or(Platform::Tidal), Platform::Tidal);
    }

    #[test]
    fn analyze_accepts_reference() {
        let cli = Cli::parse_from(["luvmaster", "analyze", "a.wav", "-r", "b.wav", "--config", "c.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Command::Analyze { reference: Some(_), .. }));
    }
}
