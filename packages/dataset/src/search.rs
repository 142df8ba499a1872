//! Address lookup over the public address points.
//!
//! Backs the search box: case-insensitive substring matching on
//! `FULL_ADDRESS`, with exact matches ranked before prefix matches and
//! shorter addresses before longer ones.

use dispensary_map_dataset_models::LayerId;
use dispensary_map_dataset_models::records::AddressPoint;
use dispensary_map_dataset_models::Feature;

use crate::{DatasetError, Datasets, FeatureQuery};

/// Maximum number of suggestions returned for autocomplete.
pub const MAX_SUGGESTIONS: usize = 8;

/// Minimum query length before suggestions are computed.
const MIN_QUERY_LEN: usize = 2;

/// Returns up to [`MAX_SUGGESTIONS`] address strings matching the query,
/// best first. Queries shorter than two characters yield nothing.
///
/// # Errors
///
/// Returns [`DatasetError`] if the address query fails.
pub async fn suggest(datasets: &Datasets, query: &str) -> Result<Vec<String>, DatasetError> {
    let needle = query.trim();
    if needle.len() < MIN_QUERY_LEN {
        return Ok(Vec::new());
    }

    let mut addresses: Vec<String> = matching_addresses(datasets, needle)
        .await?
        .iter()
        .map(|feature| AddressPoint::from_feature(feature).full_address)
        .collect();

    let lowered = needle.to_lowercase();
    addresses.sort_by(|a, b| {
        let a_starts = a.to_lowercase().starts_with(&lowered);
        let b_starts = b.to_lowercase().starts_with(&lowered);
        b_starts
            .cmp(&a_starts)
            .then_with(|| a.len().cmp(&b.len()))
    });
    addresses.truncate(MAX_SUGGESTIONS);

    Ok(addresses)
}

/// Returns the address features matching the query with geometry, exact
/// matches only when any exist, otherwise every substring match.
///
/// # Errors
///
/// Returns [`DatasetError`] if the address query fails.
pub async fn search(datasets: &Datasets, query: &str) -> Result<Vec<Feature>, DatasetError> {
    let needle = query.trim();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let matches = matching_addresses(datasets, needle).await?;
    let lowered = needle.to_lowercase();

    let exact: Vec<Feature> = matches
        .iter()
        .filter(|feature| {
            AddressPoint::from_feature(feature)
                .full_address
                .to_lowercase()
                == lowered
        })
        .cloned()
        .collect();

    if exact.is_empty() {
        Ok(matches)
    } else {
        Ok(exact)
    }
}

async fn matching_addresses(
    datasets: &Datasets,
    needle: &str,
) -> Result<Vec<Feature>, DatasetError> {
    let features = datasets
        .query(LayerId::Addresses, &FeatureQuery::all())
        .await?;
    let lowered = needle.to_lowercase();

    Ok(features
        .into_iter()
        .filter(|feature| {
            feature
                .attr_str(AddressPoint::FIELD_FULL_ADDRESS)
                .is_some_and(|address| address.to_lowercase().contains(&lowered))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::GeoJsonSource;
    use geo::{Geometry, Point};
    use std::sync::Arc;

    fn address(full_address: &str) -> Feature {
        let mut feature = Feature {
            geometry: Some(Geometry::Point(Point::new(-104.99, 39.74))),
            ..Feature::default()
        };
        feature.attributes.insert(
            AddressPoint::FIELD_FULL_ADDRESS.to_string(),
            serde_json::json!(full_address),
        );
        feature
    }

    fn datasets() -> Datasets {
        let source = GeoJsonSource::new().with_layer(
            LayerId::Addresses,
            vec![
                address("1600 GLENARM PL"),
                address("160 MAIN ST"),
                address("2900 W 16TH AVE"),
                address("1600 N BROADWAY"),
            ],
        );
        Datasets::new(Arc::new(source))
    }

    #[tokio::test]
    async fn suggestions_rank_prefix_matches_first() {
        let datasets = datasets();
        let suggestions = suggest(&datasets, "160").await.unwrap();

        // All three are prefix matches, so length then input order decides.
        assert_eq!(
            suggestions,
            ["160 MAIN ST", "1600 GLENARM PL", "1600 N BROADWAY"]
        );
    }

    #[tokio::test]
    async fn short_queries_yield_nothing() {
        let datasets = datasets();
        assert!(suggest(&datasets, "1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exact_match_wins_search() {
        let datasets = datasets();
        let results = search(&datasets, "1600 glenarm pl").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].attr_str(AddressPoint::FIELD_FULL_ADDRESS),
            Some("1600 GLENARM PL")
        );
    }

    #[tokio::test]
    async fn substring_search_returns_all_matches() {
        let datasets = datasets();
        let results = search(&datasets, "16").await.unwrap();
        assert_eq!(results.len(), 4);
    }
}
