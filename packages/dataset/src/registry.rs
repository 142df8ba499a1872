//! Compile-time registry of feature layer definitions.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a layer requires creating a TOML file in `layers/` and adding a
//! corresponding entry here.

use std::collections::BTreeMap;

use dispensary_map_dataset_models::{LayerDef, LayerId};

/// Number of registered layers. Updated when layers are added. Enforced by
/// a test.
#[cfg(test)]
const EXPECTED_LAYER_COUNT: usize = 12;

/// Embedded TOML layer definitions.
const LAYER_TOMLS: &[(&str, &str)] = &[
    ("zoning", include_str!("layers/zoning.toml")),
    (
        "statistical_neighborhoods",
        include_str!("layers/statistical_neighborhoods.toml"),
    ),
    (
        "retail_marijuana",
        include_str!("layers/retail_marijuana.toml"),
    ),
    ("drug_treatment", include_str!("layers/drug_treatment.toml")),
    ("public_schools", include_str!("layers/public_schools.toml")),
    (
        "public_school_areas",
        include_str!("layers/public_school_areas.toml"),
    ),
    (
        "non_public_schools",
        include_str!("layers/non_public_schools.toml"),
    ),
    (
        "non_public_school_areas",
        include_str!("layers/non_public_school_areas.toml"),
    ),
    (
        "childcare_facilities",
        include_str!("layers/childcare_facilities.toml"),
    ),
    (
        "childcare_parcels",
        include_str!("layers/childcare_parcels.toml"),
    ),
    ("buildings", include_str!("layers/buildings.toml")),
    ("addresses", include_str!("layers/addresses.toml")),
];

/// Returns all registered layer definitions.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error and
/// are caught during CI.
#[must_use]
pub fn all_layers() -> Vec<LayerDef> {
    LAYER_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse layer definition '{name}': {e}"))
        })
        .collect()
}

/// Returns all registered layer definitions keyed by id.
#[must_use]
pub fn layers_by_id() -> BTreeMap<LayerId, LayerDef> {
    all_layers().into_iter().map(|def| (def.id, def)).collect()
}

/// Returns the definition for one layer.
///
/// # Panics
///
/// Panics if the layer is not registered; every [`LayerId`] variant has a
/// registry entry, enforced by a test.
#[must_use]
pub fn layer(id: LayerId) -> LayerDef {
    all_layers()
        .into_iter()
        .find(|def| def.id == id)
        .unwrap_or_else(|| panic!("Layer {id} has no registry entry"))
}
