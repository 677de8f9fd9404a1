//! Granite installer CLI: runs exactly one install and exits.
//!
//! Configure via `GRANITE_WORKING_PATH`, `GRANITE_TEMP_PATH`,
//! `GRANITE_MAX_WORKERS`, `GRANITE_VERSION`, and `GRANITE_MIRROR`
//! (`mojang` or `bmclapi`, default `mojang`). No argument parsing and no
//! interactive version picker.

use std::str::FromStr;

use granite_core::{Mirror, Settings};
use granite_installer::Installer;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let settings = Settings::from_env();
    let mirror = std::env::var("GRANITE_MIRROR")
        .ok()
        .and_then(|raw| Mirror::from_str(&raw).ok())
        .unwrap_or(Mirror::Mojang);

    if settings.current_version.is_none() {
        tracing::error!("GRANITE_VERSION is not set; nothing to install");
        std::process::exit(1);
    }

    tracing::info!(?mirror, version = ?settings.current_version, "starting install");

    let outcome = Installer::new(settings, mirror).install().await;
    let code: i32 = outcome.into();
    std::process::exit(code);
}
