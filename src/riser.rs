//! Riser depth-calibration helpers
//!
//! Depth calibrations tie named riser elements (end fittings, bending
//! stiffeners, buoyancy modules and so on) to positions along the fiber.
//! These helpers convert tie depths to sensor indices and normalize the
//! free-text element names used by calibration sheets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One depth-calibration tie: a fiber length and, once assigned, a locus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tie {
    pub fiber_length: f64,
    pub locus: Option<i64>,
}

impl Tie {
    pub fn new(fiber_length: f64) -> Self {
        Self {
            fiber_length,
            locus: None,
        }
    }
}

/// Riser element description: element name mapped to its locus
pub type Description = BTreeMap<String, i64>;

/// Adds sensor indices to all ties in a depth calibration.
///
/// `spatial_sampling` is the distance between sensors and `offset` the
/// fiber start depth; the locus is the nearest sensor to each tie.
pub fn add_loci_to_ties(ties: &mut [Tie], spatial_sampling: f64, offset: f64) {
    for tie in ties.iter_mut() {
        tie.locus = Some(((tie.fiber_length - offset) / spatial_sampling).round() as i64);
    }
}

/// Extracts the module number from a buoyancy-module element name.
///
/// Recognized shapes, case-insensitive: `"buoyancy module 3"`,
/// `"bouyancy module 3"` (a common misspelling in calibration sheets),
/// `"bm 3"`, `"BM_3"`, with any run of spaces or underscores before the
/// number. Trailing text after the number is ignored.
pub fn buoyancy_module_number(name: &str) -> Option<u32> {
    let lowered = name.trim().to_lowercase();

    let rest = ["buoyancy module", "bouyancy module", "bm"]
        .iter()
        .find_map(|prefix| lowered.strip_prefix(prefix))?;

    let digits: String = rest
        .trim_start_matches([' ', '_'])
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().ok()
}

/// Selects only buoyancy modules from a riser description.
///
/// Returns `(name, locus)` pairs in description (name) order.
pub fn get_buoyancy_modules(description: &Description) -> Vec<(String, i64)> {
    description
        .iter()
        .filter(|(name, _)| buoyancy_module_number(name).is_some())
        .map(|(name, &locus)| (name.clone(), locus))
        .collect()
}

/// Converts depth-calibration naming conventions to snake case.
///
/// `"Bending stiffener start"` becomes `"bending_stiffener_start"`;
/// buoyancy modules normalize to `"bm_<number>"`.
pub fn mapping(name: &str) -> String {
    let trimmed = name.trim();
    if let Some(number) = buoyancy_module_number(trimmed) {
        return format!("bm_{}", number);
    }
    trimmed.to_lowercase().replace(' ', "_")
}
