use std::path::Path;

use regalo_core::config::BackendSettings;
use regalo_core::SiteConfig;

use crate::commands::common::load_site;
use crate::error::CliError;

pub fn run_info(json: bool, site_path: &Path) -> Result<(), CliError> {
    let site = load_site(site_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&site)?);
        return Ok(());
    }

    for line in format_site_lines(&site) {
        println!("{line}");
    }
    match BackendSettings::from_env().resolve()? {
        Some(config) => println!("Reservations: shared via {}", config.url),
        None => println!("Reservations: local-only (no server configured)"),
    }

    Ok(())
}

pub fn format_site_lines(site: &SiteConfig) -> Vec<String> {
    let mut lines = vec![
        site.couple_names.clone(),
        format!("{} - {}", site.date_label, site.time_label),
        format!("{}, {}", site.venue_name, site.venue_address),
        site.city_and_country.clone(),
        format!("Map: {}", site.maps_url),
    ];
    if let Some(rsvp) = &site.rsvp_url {
        lines.push(format!("RSVP: {rsvp}"));
    }
    lines.push(format!("Gifts: {}", site.gifts.len()));
    lines
}
