//! `inat observations` commands

use crate::context::Context;
use crate::output::{format_count, observation_line, print_json, taxon_line, Status};
use crate::{LocationArgs, UserFilterArgs};
use anyhow::{anyhow, Result};
use inat_api_client::endpoints::Around;
use inat_api_client::models::QualityGrade;
use inat_api_client::{
    HistogramInterval, HistogramQuery, ObservationSearch, PageOptions, SpeciesCountQuery,
    UserCountQuery,
};

/// Flags of `observations search`
pub struct SearchArgs {
    pub taxon_id: Option<u64>,
    pub place_id: Option<u64>,
    pub location: LocationArgs,
    pub quality_grade: Option<String>,
    pub photos: bool,
    pub per_page: u32,
    pub max_pages: u32,
}

fn around(location: LocationArgs) -> Option<Around> {
    match (location.lat, location.lng, location.radius) {
        (Some(lat), Some(lng), Some(radius)) => Some(Around { lat, lng, radius }),
        _ => None,
    }
}

fn parse_grade(value: Option<&str>) -> Result<Option<QualityGrade>> {
    value
        .map(|v| v.parse::<QualityGrade>().map_err(|e| anyhow!(e)))
        .transpose()
}

/// Search observations across up to `max_pages` pages
pub fn search(ctx: &Context, args: &SearchArgs) -> Result<()> {
    let client = ctx.client()?;
    let search = ObservationSearch {
        taxon_id: args.taxon_id,
        place_id: args.place_id,
        around: around(args.location),
        quality_grade: parse_grade(args.quality_grade.as_deref())?,
        photos: args.photos.then_some(true),
        ..ObservationSearch::default()
    };
    let options = PageOptions::new(args.per_page).with_max_pages(args.max_pages);
    let observations = client.observations().search_all(&search, options)?;

    if ctx.format.is_json() {
        return print_json(&observations);
    }

    if observations.is_empty() {
        Status::warning("No observations found");
        return Ok(());
    }
    for observation in &observations {
        println!("{}", observation_line(observation));
    }
    Status::success(&format_count(observations.len(), "observation", "observations"));
    Ok(())
}

/// Count matching observations
pub fn count(ctx: &Context, taxon_id: Option<u64>, place_id: Option<u64>) -> Result<()> {
    let client = ctx.client()?;
    let search = ObservationSearch {
        taxon_id,
        place_id,
        ..ObservationSearch::default()
    };
    let total = client.observations().count(&search)?;

    if ctx.format.is_json() {
        return print_json(&serde_json::json!({ "total_results": total }));
    }
    println!("{total}");
    Ok(())
}

/// Observation tallies per species
pub fn species_counts(
    ctx: &Context,
    place_id: Option<u64>,
    location: LocationArgs,
    per_page: u32,
) -> Result<()> {
    let client = ctx.client()?;
    let query = SpeciesCountQuery {
        place_id,
        around: around(location),
        per_page: Some(per_page),
        ..SpeciesCountQuery::default()
    };
    let counts = client.observations().species_counts(&query)?;

    if ctx.format.is_json() {
        return print_json(&counts);
    }
    for entry in &counts {
        println!("{:>7}  {}", entry.count, taxon_line(&entry.taxon));
    }
    Ok(())
}

fn user_query(filter: UserFilterArgs) -> UserCountQuery {
    UserCountQuery {
        taxon_id: filter.taxon_id,
        place_id: filter.place_id,
        per_page: Some(filter.per_page),
        ..UserCountQuery::default()
    }
}

/// Users ranked by identifications
pub fn identifiers(ctx: &Context, filter: UserFilterArgs) -> Result<()> {
    let client = ctx.client()?;
    let ranking = client.observations().identifiers(&user_query(filter))?;

    if ctx.format.is_json() {
        return print_json(&ranking);
    }
    for entry in &ranking {
        println!("{:>7}  {}", entry.count, entry.user.login);
    }
    Ok(())
}

/// Users ranked by observations
pub fn observers(ctx: &Context, filter: UserFilterArgs) -> Result<()> {
    let client = ctx.client()?;
    let ranking = client.observations().observers(&user_query(filter))?;

    if ctx.format.is_json() {
        return print_json(&ranking);
    }
    for entry in &ranking {
        println!(
            "{:>7}  {:>5} species  {}",
            entry.observation_count, entry.species_count, entry.user.login
        );
    }
    Ok(())
}

/// Observation counts per time bucket
pub fn histogram(
    ctx: &Context,
    interval: HistogramInterval,
    taxon_id: Option<u64>,
    place_id: Option<u64>,
) -> Result<()> {
    let client = ctx.client()?;
    let query = HistogramQuery {
        interval,
        taxon_id,
        place_id,
        ..HistogramQuery::default()
    };
    let histogram = client.observations().histogram(&query)?;

    if ctx.format.is_json() {
        return print_json(&histogram);
    }
    if histogram.buckets.is_empty() {
        Status::warning("No observations found");
        return Ok(());
    }
    for (bucket, count) in &histogram.buckets {
        println!("{bucket:>12}  {count}");
    }
    Status::success(&format!("{} total", histogram.total()));
    Ok(())
}
