//! `inat taxa` commands

use crate::context::Context;
use crate::output::{print_json, taxon_line, Status};
use anyhow::{bail, Result};
use inat_api_client::TaxonSearch;

/// Search taxa by name
pub fn search(ctx: &Context, query: &str, rank: Option<String>, per_page: u32) -> Result<()> {
    let client = ctx.client()?;
    let search = TaxonSearch {
        rank,
        per_page: Some(per_page),
        ..TaxonSearch::query(query)
    };
    let taxa = client.taxa().search(&search)?;

    if ctx.format.is_json() {
        return print_json(&taxa);
    }

    if taxa.is_empty() {
        Status::warning(&format!("No taxa match '{query}'"));
        return Ok(());
    }
    for taxon in &taxa {
        println!("{}", taxon_line(taxon));
    }
    Ok(())
}

/// Show one taxon, optionally with its lineage
pub fn show(ctx: &Context, id: u64, with_ancestors: bool) -> Result<()> {
    let client = ctx.client()?;
    let Some(taxon) = client.taxa().get(id)? else {
        bail!("Taxon {id} not found");
    };
    let ancestors = if with_ancestors {
        client.taxa().ancestors(id)?
    } else {
        Vec::new()
    };

    if ctx.format.is_json() {
        return print_json(&serde_json::json!({
            "taxon": taxon,
            "ancestors": ancestors,
        }));
    }

    Status::header(&taxon.display_name());
    println!("  ID:            {}", taxon.id);
    println!("  Rank:          {}", taxon.rank);
    if let Some(iconic) = &taxon.iconic_taxon_name {
        println!("  Iconic group:  {iconic}");
    }
    println!("  Observations:  {}", taxon.observations_count);
    if let Some(status) = &taxon.conservation_status {
        println!("  Conservation:  {}", status.status);
    }
    if let Some(url) = &taxon.wikipedia_url {
        println!("  Wikipedia:     {url}");
    }

    if !ancestors.is_empty() {
        Status::header("Lineage");
        for ancestor in &ancestors {
            println!("{}", taxon_line(ancestor));
        }
    }
    Ok(())
}

/// Complete a partial name
pub fn autocomplete(ctx: &Context, query: &str, per_page: u32) -> Result<()> {
    let client = ctx.client()?;
    let taxa = client.taxa().autocomplete(query, per_page)?;

    if ctx.format.is_json() {
        return print_json(&taxa);
    }
    for taxon in &taxa {
        println!("{}", taxon_line(taxon));
    }
    Ok(())
}
