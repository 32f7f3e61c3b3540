use carrier_risk_core::domain::basics::{BasicCategory, WATCH_BAND_WIDTH};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct CategoryEntry {
    key: &'static str,
    name: &'static str,
    short_name: &'static str,
    description: &'static str,
    threshold: u8,
    watch_from: f64,
}

#[derive(Debug, Serialize)]
struct CategoriesPayload {
    command: &'static str,
    status: &'static str,
    categories: Vec<CategoryEntry>,
}

pub fn run() -> CommandResult {
    let categories = BasicCategory::ALL
        .into_iter()
        .map(|category| CategoryEntry {
            key: category.key(),
            name: category.name(),
            short_name: category.short_name(),
            description: category.description(),
            threshold: category.threshold(),
            watch_from: f64::from(category.threshold()) - WATCH_BAND_WIDTH,
        })
        .collect();

    CommandResult::payload(0, &CategoriesPayload { command: "categories", status: "ok", categories })
}
