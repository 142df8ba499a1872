//! Facility-type / license-status filtering for the retail marijuana layer.
//!
//! The filter panel offers every distinct `CHECKBOXTYPE` and `LIC_STATUS`
//! value present in the data; the user's selections render into attribute
//! membership predicates applied to subsequent marijuana-layer queries.

use dispensary_map_dataset_models::LayerId;
use dispensary_map_dataset_models::records::MarijuanaStore;

use crate::{AttributeFilter, DatasetError, Datasets, FeatureQuery};

/// The filterable attribute values currently present in the marijuana
/// layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Distinct facility type values.
    pub facility_types: Vec<String>,
    /// Distinct license status values.
    pub license_statuses: Vec<String>,
}

/// Loads the distinct facility types and license statuses from the retail
/// marijuana layer. Blank values are dropped.
///
/// # Errors
///
/// Returns [`DatasetError`] if either distinct-values query fails.
pub async fn load_filter_options(datasets: &Datasets) -> Result<FilterOptions, DatasetError> {
    let facility_types = distinct_values(datasets, MarijuanaStore::FIELD_FACILITY_TYPE).await?;
    let license_statuses = distinct_values(datasets, MarijuanaStore::FIELD_LICENSE_STATUS).await?;
    Ok(FilterOptions {
        facility_types,
        license_statuses,
    })
}

async fn distinct_values(datasets: &Datasets, field: &str) -> Result<Vec<String>, DatasetError> {
    let features = datasets
        .query(LayerId::RetailMarijuana, &FeatureQuery::distinct(field))
        .await?;
    Ok(features
        .iter()
        .filter_map(|feature| feature.attr_str(field))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect())
}

/// The user's active facility filter selections.
///
/// An empty selection list means "no restriction" on that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacilityFilter {
    /// Accepted facility type values; empty accepts all.
    pub facility_types: Vec<String>,
    /// Accepted license status values; empty accepts all.
    pub license_statuses: Vec<String>,
}

impl FacilityFilter {
    /// Returns whether the filter restricts nothing.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.facility_types.is_empty() && self.license_statuses.is_empty()
    }

    /// Applies the selections to a marijuana-layer query as membership
    /// predicates.
    #[must_use]
    pub fn apply_to(&self, mut query: FeatureQuery) -> FeatureQuery {
        if !self.facility_types.is_empty() {
            query = query.with_filter(AttributeFilter::is_in(
                MarijuanaStore::FIELD_FACILITY_TYPE,
                self.facility_types.clone(),
            ));
        }
        if !self.license_statuses.is_empty() {
            query = query.with_filter(AttributeFilter::is_in(
                MarijuanaStore::FIELD_LICENSE_STATUS,
                self.license_statuses.clone(),
            ));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::GeoJsonSource;
    use dispensary_map_dataset_models::Feature;
    use std::sync::Arc;

    fn store(facility_type: &str, status: &str) -> Feature {
        let mut feature = Feature::default();
        feature.attributes.insert(
            MarijuanaStore::FIELD_FACILITY_TYPE.to_string(),
            serde_json::json!(facility_type),
        );
        feature.attributes.insert(
            MarijuanaStore::FIELD_LICENSE_STATUS.to_string(),
            serde_json::json!(status),
        );
        feature
    }

    #[tokio::test]
    async fn loads_distinct_options_without_blanks() {
        let source = GeoJsonSource::new().with_layer(
            LayerId::RetailMarijuana,
            vec![
                store("Retail Store", "Active"),
                store("Retail Store", "Expired"),
                store("  ", "Active"),
                store("Cultivation", "Active"),
            ],
        );
        let datasets = Datasets::new(Arc::new(source));

        let options = load_filter_options(&datasets).await.unwrap();
        assert_eq!(options.facility_types, ["Retail Store", "Cultivation"]);
        assert_eq!(options.license_statuses, ["Active", "Expired"]);
    }

    #[test]
    fn unrestricted_filter_leaves_query_untouched() {
        let filter = FacilityFilter::default();
        assert!(filter.is_unrestricted());
        assert_eq!(filter.apply_to(FeatureQuery::all()).where_clause(), "1=1");
    }

    #[test]
    fn selections_render_as_anded_membership() {
        let filter = FacilityFilter {
            facility_types: vec!["Retail Store".to_string()],
            license_statuses: vec!["Active".to_string(), "Pending".to_string()],
        };
        assert_eq!(
            filter.apply_to(FeatureQuery::all()).where_clause(),
            "CHECKBOXTYPE IN ('Retail Store') AND LIC_STATUS IN ('Active','Pending')"
        );
    }
}
