//! Service configuration resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.

use serial_test::serial;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tilawa_common::config::TomlConfig;
use tilawa_ra::config::{resolve_hf_token, Args, ServiceConfig, DEFAULT_PORT};

fn toml_with(corpus: &str, port: u16, token: Option<&str>) -> TomlConfig {
    TomlConfig {
        corpus_path: Some(PathBuf::from(corpus)),
        port: Some(port),
        hf_token: token.map(str::to_string),
        ..Default::default()
    }
}

#[test]
#[serial]
fn test_cli_overrides_toml() {
    std::env::remove_var("HF_TOKEN");
    let args = Args {
        corpus: Some(PathBuf::from("/cli/corpus.json")),
        port: Some(9000),
        bind: Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        hf_token: Some("hf_cli".to_string()),
        ..Default::default()
    };

    let config = ServiceConfig::resolve(&args, toml_with("/toml/corpus.json", 8000, Some("hf_toml"))).unwrap();

    assert_eq!(config.corpus_path, PathBuf::from("/cli/corpus.json"));
    assert_eq!(config.listen_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
    assert_eq!(config.hf_token.as_deref(), Some("hf_cli"));
}

#[test]
#[serial]
fn test_toml_used_when_cli_absent() {
    std::env::remove_var("HF_TOKEN");
    let config = ServiceConfig::resolve(&Args::default(), toml_with("/toml/corpus.json", 8000, Some("hf_toml"))).unwrap();

    assert_eq!(config.corpus_path, PathBuf::from("/toml/corpus.json"));
    assert_eq!(config.listen_addr.port(), 8000);
    assert!(config.listen_addr.ip().is_loopback());
    assert_eq!(config.hf_token.as_deref(), Some("hf_toml"));
}

#[test]
#[serial]
fn test_defaults() {
    std::env::remove_var("HF_TOKEN");
    let toml = TomlConfig {
        corpus_path: Some(PathBuf::from("/c.json")),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(&Args::default(), toml).unwrap();

    assert_eq!(config.listen_addr.port(), DEFAULT_PORT);
    assert!(config.hf_token.is_none());
    assert_eq!(config.log_level, "info");
    assert_eq!(config.matcher.min_score, 0.5);
}

#[test]
fn test_invalid_bind_address_rejected() {
    let toml = TomlConfig {
        corpus_path: Some(PathBuf::from("/c.json")),
        bind_address: Some("not-an-ip".to_string()),
        ..Default::default()
    };
    assert!(ServiceConfig::resolve(&Args::default(), toml).is_err());
}

#[test]
#[serial]
fn test_generic_token_env_between_cli_and_toml() {
    std::env::set_var("HF_TOKEN", "hf_env");

    let toml = toml_with("/c.json", 1, Some("hf_toml"));
    assert_eq!(resolve_hf_token(None, &toml).as_deref(), Some("hf_env"));
    assert_eq!(resolve_hf_token(Some("hf_cli"), &toml).as_deref(), Some("hf_cli"));
    // Blank values are ignored
    assert_eq!(resolve_hf_token(Some("   "), &toml).as_deref(), Some("hf_env"));

    std::env::remove_var("HF_TOKEN");
    assert_eq!(resolve_hf_token(None, &toml).as_deref(), Some("hf_toml"));
}
