//! `inat config` commands

use crate::context::Context;
use crate::output::print_json;
use anyhow::Result;
use owo_colors::OwoColorize;

const REDACTED: &str = "********";

/// Print the effective settings, with the API key masked
pub fn show(ctx: &Context) -> Result<()> {
    let mut settings = ctx.settings.clone();
    if settings.api.api_key.is_some() {
        settings.api.api_key = Some(REDACTED.to_string());
    }
    let cache_dir = settings.cache.resolved_dir();

    if ctx.format.is_json() {
        return print_json(&serde_json::json!({
            "source": ctx.source,
            "cache_dir": cache_dir,
            "settings": settings,
        }));
    }

    let source = ctx
        .source
        .as_ref()
        .map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
    println!("{}", format!("# source: {source}").dimmed());
    println!("{}", format!("# cache directory: {}", cache_dir.display()).dimmed());
    print!("{}", settings.to_toml_string()?);
    Ok(())
}
