use nu_ansi_term::Color::{Blue, Cyan, Green, LightRed, Magenta, Yellow};
use pkghub_operations::{HubContext, Result};
use pkghub_registry::Package;
use tracing::{debug, info};

use crate::utils::{truncate, vec_string, Colored, Icons};

const DESCRIPTION_WIDTH: usize = 72;

fn print_package(package: &Package, featured: bool) {
    let star = if featured {
        format!(" {}", Colored(Yellow, Icons::STAR))
    } else {
        String::new()
    };
    info!(
        "{} {}{} {}",
        Colored(Blue, &package.name),
        Colored(LightRed, &package.version),
        star,
        Colored(Cyan, format!("[{}]", vec_string(package.tags.iter()))),
    );
    info!("    {}", truncate(&package.description, DESCRIPTION_WIDTH));
}

pub async fn list_packages(ctx: &HubContext, all_versions: bool) -> Result<()> {
    let index = ctx.packages_index().await?;
    let featured = ctx.config().get_featured();

    if all_versions {
        let grouped = ctx.grouped_packages().await?;
        for (name, versions) in grouped.iter().flat_map(|grouped| grouped.iter()) {
            let featured = featured.iter().any(|f| f == name);
            print_package(versions.latest(), featured);
            info!(
                "    {} {}",
                Icons::VERSION,
                Colored(Magenta, vec_string(versions.versions()))
            );
        }
        info!(
            "{} packages, {} versions",
            Colored(Cyan, grouped.as_ref().map_or(0, |grouped| grouped.len())),
            Colored(Cyan, index.packages.len())
        );
    } else {
        let latest = index.latest_packages();
        for package in &latest {
            print_package(package, pkghub_operations::is_featured(package, featured.as_slice()));
        }
        info!("{} packages", Colored(Cyan, latest.len()));
    }

    if let Some(updated) = index.updated_at() {
        info!(
            "{} index updated {}",
            Icons::CALENDAR,
            Colored(Green, updated.format("%Y-%m-%d %H:%M UTC"))
        );
    }
    Ok(())
}

pub async fn search_packages(
    ctx: &HubContext,
    query: Option<&str>,
    tags: &[String],
    limit: Option<usize>,
) -> Result<()> {
    let query = query.unwrap_or_default();
    debug!(query, tags = ?tags, limit = ?limit, "searching packages");

    let found = ctx.search(query, tags).await?;
    let total = found.len();
    let featured = ctx.config().get_featured();

    for package in found.iter().take(limit.unwrap_or(usize::MAX)) {
        print_package(package, pkghub_operations::is_featured(package, featured.as_slice()));
    }

    match limit {
        Some(limit) if limit < total => info!(
            "Showing {} of {} matches",
            Colored(Green, limit),
            Colored(Cyan, total)
        ),
        _ => info!("{} matches", Colored(Cyan, total)),
    }
    Ok(())
}

pub async fn list_tags(ctx: &HubContext) -> Result<()> {
    let counts = ctx.tags().await?;
    let width = counts
        .iter()
        .map(|c| c.tag.chars().count())
        .max()
        .unwrap_or(0);

    for count in &counts {
        info!(
            "{} {:<width$} {}",
            Icons::TAG,
            count.tag,
            Colored(Cyan, count.count)
        );
    }
    info!("{} tags", Colored(Cyan, counts.len()));
    Ok(())
}

pub async fn list_featured(ctx: &HubContext) -> Result<()> {
    let featured = ctx.featured().await?;
    for package in &featured {
        print_package(package, true);
    }
    Ok(())
}
