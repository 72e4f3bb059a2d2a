//! `inat images` commands

use crate::context::Context;
use crate::output::{format_count, format_size, print_json, Status};
use crate::progress;
use anyhow::{bail, Result};
use inat_api_client::{CacheMode, ImageDownloader, PhotoSize};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome for one URL, as printed in JSON mode
#[derive(Serialize)]
struct Fetched {
    url: String,
    path: Option<PathBuf>,
}

fn download(
    ctx: &Context,
    downloader: &ImageDownloader,
    urls: &[String],
    mode: CacheMode,
) -> Vec<Fetched> {
    let pb = if ctx.format.is_json() {
        progress::hidden()
    } else {
        progress::download_bar(urls.len() as u64)
    };

    let mut fetched = Vec::with_capacity(urls.len());
    downloader.download_each(urls, mode, |_, url, path| {
        pb.inc(1);
        fetched.push(Fetched {
            url: url.to_string(),
            path: path.cloned(),
        });
    });
    pb.finish_and_clear();
    fetched
}

fn report(ctx: &Context, fetched: &[Fetched]) -> Result<()> {
    if ctx.format.is_json() {
        return print_json(fetched);
    }

    for item in fetched {
        match &item.path {
            Some(path) => println!("{} {}", "✓".green(), path.display()),
            None => println!("{} {}", "✗".red(), item.url.dimmed()),
        }
    }

    let ok = fetched.iter().filter(|f| f.path.is_some()).count();
    let failed = fetched.len() - ok;
    if failed > 0 {
        Status::warning(&format!("{} failed", format_count(failed, "image", "images")));
    }
    Status::success(&format!("{} available", format_count(ok, "image", "images")));
    Ok(())
}

/// Download research-grade photos of a taxon
pub fn species(ctx: &Context, taxon_id: u64, size: PhotoSize, max: usize) -> Result<()> {
    let client = ctx.client()?;

    let spinner = (!ctx.format.is_json()).then(|| progress::spinner("Finding photos..."));
    let urls = client.species_photo_urls(taxon_id, size, max);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let urls = urls?;

    if urls.is_empty() {
        if ctx.format.is_json() {
            return print_json(&Vec::<Fetched>::new());
        }
        Status::warning(&format!("No research-grade photos for taxon {taxon_id}"));
        return Ok(());
    }

    let downloader = ctx.downloader(&client)?;
    let fetched = download(ctx, &downloader, &urls, CacheMode::cached());
    report(ctx, &fetched)
}

/// Download every photo attached to one observation
pub fn observation(ctx: &Context, id: u64, size: PhotoSize) -> Result<()> {
    let client = ctx.client()?;
    let Some(observation) = client.observations().get(id)? else {
        bail!("Observation {id} not found");
    };

    let downloader = ctx.downloader(&client)?;
    let spinner = (!ctx.format.is_json()).then(|| progress::spinner("Downloading photos..."));
    let paths = downloader.download_observation_photos(&observation, size, CacheMode::cached());
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if ctx.format.is_json() {
        return print_json(&paths);
    }
    for path in &paths {
        println!("{} {}", "✓".green(), path.display());
    }
    let expected = observation.photo_urls(size).len();
    if paths.len() < expected {
        Status::warning(&format!(
            "{} failed",
            format_count(expected - paths.len(), "image", "images")
        ));
    }
    Status::success(&format!(
        "{} for {}",
        format_count(paths.len(), "image", "images"),
        observation.display_name()
    ));
    Ok(())
}

/// Download arbitrary image URLs
pub fn fetch(ctx: &Context, urls: &[String], force: bool) -> Result<()> {
    let client = ctx.client()?;
    let downloader = ctx.downloader(&client)?;
    let mode = if force {
        CacheMode::forced()
    } else {
        CacheMode::cached()
    };

    let fetched = download(ctx, &downloader, urls, mode);
    report(ctx, &fetched)
}

/// Remote size and cache state of one image
pub fn info(ctx: &Context, url: &str) -> Result<()> {
    let client = ctx.client()?;
    let downloader = ctx.downloader(&client)?;
    let Some(info) = downloader.info(url) else {
        bail!("Could not read image headers for {url}");
    };

    if ctx.format.is_json() {
        return print_json(&serde_json::json!({
            "url": info.url,
            "size_bytes": info.size_bytes,
            "content_type": info.content_type,
            "cached_path": info.cached_path,
        }));
    }

    println!("  URL:     {}", info.url);
    println!(
        "  Size:    {}",
        info.size_bytes.map_or_else(|| "unknown".to_string(), format_size)
    );
    println!("  Type:    {}", info.content_type.as_deref().unwrap_or("unknown"));
    match &info.cached_path {
        Some(path) => println!("  Cached:  {}", path.display()),
        None => println!("  Cached:  {}", "no".dimmed()),
    }
    Ok(())
}
