//! Region labels out of a GeoJSON boundary file.
//!
//! Boundary files for Indian states disagree on which property carries the
//! state name, so the reader tries a list of known keys instead of
//! requiring one schema.

use std::fs;

use log::debug;
use snafu::prelude::*;

use serde_json::Value as JSValue;

use crate::dash::{DashResult, NoRegionNamesSnafu, OpeningInputSnafu, ParsingJsonSnafu};

const NAME_KEYS: [&str; 5] = ["ST_NM", "st_nm", "NAME_1", "NAME", "state"];

/// The distinct region names of the file's features, in file order.
pub fn region_names(path: &str) -> DashResult<Vec<String>> {
    let contents = fs::read_to_string(path).context(OpeningInputSnafu {
        path: path.to_string(),
    })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let features = js["features"].as_array().cloned().unwrap_or_default();
    debug!("geojson: {} features in {}", features.len(), path);

    let mut names: Vec<String> = Vec::new();
    for feature in &features {
        if let Some(name) = feature_name(feature) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    if names.is_empty() {
        return NoRegionNamesSnafu {}.fail();
    }
    Ok(names)
}

fn feature_name(feature: &JSValue) -> Option<String> {
    let properties = feature.get("properties")?;
    NAME_KEYS
        .iter()
        .find_map(|key| properties.get(key))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
