//! `inat cache` commands

use crate::context::Context;
use crate::output::{format_count, format_size, print_json, Status};
use anyhow::Result;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Show cache size and age
pub fn stats(ctx: &Context) -> Result<()> {
    let stats = ctx.cache()?.stats()?;

    if ctx.format.is_json() {
        return print_json(&stats);
    }

    Status::header("Image cache");
    println!("  Directory:  {}", stats.cache_dir.display());
    println!("  Entries:    {}", format_count(stats.entries, "image", "images"));
    println!("  Size:       {}", format_size(stats.total_bytes));
    if let Some(oldest) = stats.oldest {
        println!("  Oldest:     {}", oldest.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(newest) = stats.newest {
        println!("  Newest:     {}", newest.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}

/// Remove cached images older than `max_age_days`
///
/// Falls back to `cache.max_age_days` from settings; with neither, the
/// whole cache is cleared.
pub fn evict(ctx: &Context, max_age_days: Option<u32>) -> Result<()> {
    let max_age = max_age_days
        .or(ctx.settings.cache.max_age_days)
        .map(|days| Duration::from_secs(u64::from(days) * SECONDS_PER_DAY));
    let report = ctx.cache()?.evict(max_age)?;

    if ctx.format.is_json() {
        return print_json(&report);
    }

    if report.failed > 0 {
        Status::warning(&format!(
            "{} could not be removed",
            format_count(report.failed, "file", "files")
        ));
    }
    Status::success(&format!(
        "Removed {} ({})",
        format_count(report.removed, "image", "images"),
        format_size(report.freed_bytes)
    ));
    Ok(())
}
