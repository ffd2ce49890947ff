//! `tsend config` – show where settings come from and what is in effect.

use anyhow::Result;
use std::path::Path;
use tsend_core::config::TsendConfig;
use tsend_core::TelemetryKind;

/// Effective settings as TOML, with the API key masked.
pub(crate) fn render(cfg: &TsendConfig) -> Result<String> {
    let mut shown = cfg.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("********".to_string());
    }
    shown.retry = Some(cfg.retry_config());
    shown.transport = Some(cfg.transport.clone().unwrap_or_default());
    Ok(toml::to_string_pretty(&shown)?)
}

pub fn run_config(path: Option<&Path>, cfg: &TsendConfig) -> Result<()> {
    match path {
        Some(p) => println!("# config: {}", p.display()),
        None => println!("# config: (built-in defaults)"),
    }
    if let Err(e) = cfg.validate() {
        println!("# warning: {e}");
    }
    for kind in TelemetryKind::ALL {
        println!("# {:<8} -> {}", kind, cfg.endpoint(kind));
    }
    print!("{}", render(cfg)?);
    Ok(())
}
