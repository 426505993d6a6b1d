//! Configuration resolution for tilawa-ra
//!
//! Each setting is resolved once at startup with priority
//! command line → environment → TOML → compiled default. Clap reads the
//! `TILAWA_*` environment variables together with the command line.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tilawa_common::config::{
    is_valid_token, load_toml_config, resolve_config_path, ReportConfig, TomlConfig, TranscriptionConfig,
};
use tilawa_common::{Error, MatcherConfig, Result};
use tracing::{info, warn};

/// Module name, also the config file stem
pub const MODULE_NAME: &str = "tilawa-ra";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5731;

/// Token variable used by the hosted inference tooling
const GENERIC_TOKEN_ENV: &str = "HF_TOKEN";

/// Command-line arguments for tilawa-ra
#[derive(Parser, Debug, Default)]
#[command(name = "tilawa-ra")]
#[command(about = "Recitation Analysis service: identifies the recited verse and reports mistakes")]
#[command(version)]
pub struct Args {
    /// TOML config file
    #[arg(short, long, env = "TILAWA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Corpus JSON document
    #[arg(long, env = "TILAWA_CORPUS")]
    pub corpus: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "TILAWA_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "TILAWA_BIND")]
    pub bind: Option<IpAddr>,

    /// Inference API token
    #[arg(long, env = "TILAWA_HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub corpus_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub hf_token: Option<String>,
    pub matcher: MatcherConfig,
    pub transcription: TranscriptionConfig,
    pub report: ReportConfig,
}

impl ServiceConfig {
    /// Load the TOML file named by `args` (or the default location) and merge
    pub fn load(args: &Args) -> Result<Self> {
        let path = resolve_config_path(args.config.as_deref(), MODULE_NAME);
        let toml_config = load_toml_config(path.as_deref())?;
        Self::resolve(args, toml_config)
    }

    /// Merge command-line/environment values over a parsed TOML config
    pub fn resolve(args: &Args, toml_config: TomlConfig) -> Result<Self> {
        let corpus_path = args
            .corpus
            .clone()
            .or(toml_config.corpus_path.clone())
            .or_else(default_corpus_path)
            .ok_or_else(|| Error::Config("Corpus path not configured (use --corpus or TILAWA_CORPUS)".to_string()))?;

        let ip = match (args.bind, toml_config.bind_address.as_deref()) {
            (Some(ip), _) => ip,
            (None, Some(addr)) => addr
                .parse()
                .map_err(|e| Error::Config(format!("Invalid bind_address '{}': {}", addr, e)))?,
            (None, None) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

        let hf_token = resolve_hf_token(args.hf_token.as_deref(), &toml_config);

        Ok(Self {
            corpus_path,
            listen_addr: SocketAddr::new(ip, port),
            log_level: toml_config.logging.level,
            hf_token,
            matcher: toml_config.matcher,
            transcription: toml_config.transcription,
            report: toml_config.report,
        })
    }
}

/// `<data_dir>/tilawa/corpus.json`
fn default_corpus_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tilawa").join("corpus.json"))
}

/// Resolve the inference token
///
/// **Priority:** CLI/`TILAWA_HF_TOKEN` → `HF_TOKEN` → TOML
pub fn resolve_hf_token(cli_token: Option<&str>, toml_config: &TomlConfig) -> Option<String> {
    let generic_env = std::env::var(GENERIC_TOKEN_ENV).ok();

    let candidates = [
        ("command line/TILAWA_HF_TOKEN", cli_token.map(str::to_string)),
        ("HF_TOKEN", generic_env),
        ("TOML", toml_config.hf_token.clone()),
    ];

    let valid: Vec<(&str, String)> = candidates
        .into_iter()
        .filter_map(|(source, token)| token.filter(|t| is_valid_token(t)).map(|t| (source, t)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<&str> = valid.iter().map(|(s, _)| *s).collect();
        warn!(
            "Inference token found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match valid.into_iter().next() {
        Some((source, token)) => {
            info!("Inference token loaded from {}", source);
            Some(token)
        }
        None => {
            warn!("Inference token not configured; /analyze will be unavailable");
            None
        }
    }
}
