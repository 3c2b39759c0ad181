use nu_ansi_term::Color::{Blue, Cyan, Green, LightRed, Magenta, Yellow};
use pkghub_operations::{HubContext, Result};
use tracing::{info, warn};

use crate::utils::{vec_string, Colored, Icons};

pub async fn show_package(
    ctx: &HubContext,
    name: &str,
    version: Option<&str>,
    files: bool,
    readme: bool,
) -> Result<()> {
    let details = ctx.details(name, version).await?;
    let package = &details.package;

    info!(
        "{} {} {}",
        Icons::PACKAGE,
        Colored(Blue, &package.title),
        Colored(LightRed, &package.version)
    );
    info!("{} {}", Icons::DESCRIPTION, package.description);
    info!("{} {}", Icons::AUTHOR, Colored(Cyan, &package.author));
    info!(
        "{} {}",
        Icons::VERSION,
        Colored(Magenta, vec_string(&details.versions))
    );
    info!(
        "{} {}",
        Icons::TAG,
        Colored(Cyan, vec_string(package.tags.iter()))
    );
    info!("{} {}", Icons::LINK, Colored(Blue, &package.archive_url));

    let Some(repo) = details.repo else {
        warn!("{} Package archive is not available", Icons::WARNING);
        return Ok(());
    };

    if let Some(homepage) = &repo.manifest.homepage {
        info!("{} {}", Icons::HOME, Colored(Blue, homepage));
    }
    if repo.manifest.version != package.version.as_str() {
        warn!(
            "Manifest declares version {} but the index lists {}",
            repo.manifest.version, package.version
        );
    }
    info!(
        "{} {}",
        Icons::LICENSE,
        if repo.license.is_some() {
            Colored(Green, "LICENSE included")
        } else {
            Colored(Yellow, "no LICENSE")
        }
    );

    for image in repo.readme_images() {
        match repo.resolve_asset(image) {
            Ok(url) => info!("{} {} {}", Icons::ARROW, image, Colored(Blue, url)),
            Err(err) => warn!("{image}: {err}"),
        }
    }

    for file in repo.package_yml.iter() {
        info!("{} {}", Icons::FILE, Colored(Green, &file.name));
        if files {
            info!("{}", file.content.trim_end());
        }
    }

    if readme {
        info!("\n{}", repo.readme.trim_end());
    }
    Ok(())
}
