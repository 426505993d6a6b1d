//! Embeds build identification for the startup banner and `/health`
//!
//! - `TILAWA_BUILD_COMMIT`: short commit, `+dirty` when the tree has changes
//! - `TILAWA_BUILD_TIME`: UTC, RFC 3339
//! - `TILAWA_BUILD_PROFILE`: cargo profile

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
}

fn main() {
    let commit = match git(&["rev-parse", "--short=8", "HEAD"]) {
        Some(hash) => {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"]).is_some_and(|s| !s.is_empty());
            if dirty {
                format!("{}+dirty", hash)
            } else {
                hash
            }
        }
        None => "unknown".to_string(),
    };

    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    for (key, value) in [
        ("TILAWA_BUILD_COMMIT", commit),
        ("TILAWA_BUILD_TIME", built_at),
        ("TILAWA_BUILD_PROFILE", profile),
    ] {
        println!("cargo:rustc-env={}={}", key, value);
    }
}
