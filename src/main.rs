//! gifmedia command line
//!
//! Pulls the audio out of a clip, or burns speech subtitles into it.
//!
//! ```text
//! gifmedia info <input>
//! gifmedia extract-audio <input> <output.m4a>
//! gifmedia subtitle <input> <speech.json>
//! ```

mod config_file;
mod error;

use std::path::{Path, PathBuf};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gifmedia_lib::{MediaInfo, SubtitledVideoComposer, TrackType};

use crate::config_file::{ConfigFile, LoggingSettings};
use crate::error::{CliError, Result};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "gifmedia";

/// Config file looked up in the working directory
const DEFAULT_CONFIG: &str = "gifmedia.toml";

const USAGE: &str = "usage: gifmedia info <input>\n       gifmedia extract-audio <input> <output.m4a>\n       gifmedia subtitle <input> <speech.json>";

#[derive(Debug, PartialEq)]
enum Command {
    Info { input: PathBuf },
    ExtractAudio { input: PathBuf, output: PathBuf },
    Subtitle { input: PathBuf, speech: PathBuf },
}

impl Command {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let args: Vec<String> = args.into_iter().collect();
        match args.as_slice() {
            [cmd, input] if cmd == "info" => Ok(Command::Info {
                input: input.into(),
            }),
            [cmd, input, output] if cmd == "extract-audio" => Ok(Command::ExtractAudio {
                input: input.into(),
                output: output.into(),
            }),
            [cmd, input, speech] if cmd == "subtitle" => Ok(Command::Subtitle {
                input: input.into(),
                speech: speech.into(),
            }),
            _ => Err(CliError::Usage(USAGE.to_string())),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let command = Command::parse(std::env::args().skip(1))?;
    let config = load_config();

    init_logging(&config.logging);
    tracing::info!("{} v{} starting", APP_NAME, VERSION);

    gifmedia_lib::init()?;
    gifmedia_lib::install_log_filter();
    tracing::info!("FFmpeg version: {}", gifmedia_lib::ffmpeg_version_info());

    let (composer_config, export_config) = config.into_configs();

    match command {
        Command::Info { input } => {
            let info = gifmedia_lib::parse_file(&input)?;
            print!("{}", format_info(&input, &info));
        }
        Command::ExtractAudio { input, output } => {
            gifmedia_lib::extract_audio_file(&input, &output, &export_config).await?;
            tracing::info!(output = %output.display(), "audio extracted");
            println!("{}", output.display());
        }
        Command::Subtitle { input, speech } => {
            let composer = SubtitledVideoComposer::new(composer_config, export_config);
            let path = gifmedia_lib::compose_file(&composer, &input, &speech).await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// One header line for the file, then one line per track.
fn format_info(path: &Path, info: &MediaInfo) -> String {
    let mut out = format!(
        "{}: {} bytes, {:.3}s\n",
        path.display(),
        info.file_size,
        info.duration_secs
    );
    for track in &info.tracks {
        let detail = match &track.track_type {
            TrackType::Video {
                width,
                height,
                portrait,
            } => format!(
                "{}x{}{}",
                width,
                height,
                if *portrait { " portrait" } else { "" }
            ),
            TrackType::Audio {
                channels,
                sample_rate,
            } => format!("{} ch {} Hz", channels, sample_rate),
        };
        let language = track
            .language
            .as_deref()
            .map(|l| format!(" [{}]", l))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {} {} {}{}\n",
            track.id, track.codec_id, detail, language
        ));
    }
    out
}

/// `GIFMEDIA_CONFIG`, else `gifmedia.toml` if present, else defaults.
fn load_config() -> ConfigFile {
    let path = std::env::var_os("GIFMEDIA_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    if !Path::new(&path).exists() {
        return ConfigFile::default();
    }
    match ConfigFile::from_file(&path) {
        Ok(cf) => cf,
        Err(e) => {
            // logging is not up yet
            eprintln!(
                "Failed to load config file {}: {}. Using defaults.",
                path.display(),
                e
            );
            ConfigFile::default()
        }
    }
}

/// Initialize logging with tracing
fn init_logging(settings: &LoggingSettings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| settings.level.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
