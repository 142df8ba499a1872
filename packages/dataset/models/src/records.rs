//! Typed attribute records, one per dataset.
//!
//! Feature attributes arrive as free-form key/value maps. These records name
//! the fields the engine actually reads and pin down the fallback used when
//! a field is absent, so the loose typing stops at the query boundary.

use crate::Feature;

/// Fallback for absent or non-string name-like attributes.
pub const UNKNOWN: &str = "Unknown";

/// A public address point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPoint {
    /// Full street address (e.g., `"1600 GLENARM PL"`).
    pub full_address: String,
}

impl AddressPoint {
    /// Attribute carrying the full address.
    pub const FIELD_FULL_ADDRESS: &'static str = "FULL_ADDRESS";

    /// Reads the record from a raw feature.
    #[must_use]
    pub fn from_feature(feature: &Feature) -> Self {
        Self {
            full_address: feature
                .attr_str(Self::FIELD_FULL_ADDRESS)
                .unwrap_or(UNKNOWN)
                .to_string(),
        }
    }
}

/// A zoning district polygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoningDistrict {
    /// Zone code (e.g., `"U-SU-A"`, `"C-MX-5"`).
    pub zone_district: String,
}

impl ZoningDistrict {
    /// Attribute carrying the zone code.
    pub const FIELD_ZONE_DISTRICT: &'static str = "ZONE_DISTRICT";

    /// Reads the record from a raw feature, or `None` when the zone code
    /// attribute is missing entirely.
    #[must_use]
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        feature
            .attr_str(Self::FIELD_ZONE_DISTRICT)
            .map(|zone| Self {
                zone_district: zone.to_string(),
            })
    }
}

/// A statistical neighborhood polygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    /// Neighborhood name (e.g., `"Five Points"`).
    pub name: String,
}

impl Neighborhood {
    /// Attribute carrying the neighborhood name.
    pub const FIELD_NAME: &'static str = "NBHD_NAME";

    /// Reads the record from a raw feature.
    #[must_use]
    pub fn from_feature(feature: &Feature) -> Self {
        Self {
            name: feature
                .attr_str(Self::FIELD_NAME)
                .unwrap_or(UNKNOWN)
                .to_string(),
        }
    }
}

/// A licensed retail marijuana store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarijuanaStore {
    /// Business entity name.
    pub entity_name: String,
    /// Facility type checkbox value.
    pub facility_type: String,
    /// License status (e.g., `"Active"`).
    pub license_status: String,
}

impl MarijuanaStore {
    /// Attribute carrying the entity name.
    pub const FIELD_ENTITY_NAME: &'static str = "ENTITY_NAME";
    /// Attribute carrying the facility type.
    pub const FIELD_FACILITY_TYPE: &'static str = "CHECKBOXTYPE";
    /// Attribute carrying the license status.
    pub const FIELD_LICENSE_STATUS: &'static str = "LIC_STATUS";

    /// Reads the record from a raw feature.
    #[must_use]
    pub fn from_feature(feature: &Feature) -> Self {
        Self {
            entity_name: feature
                .attr_str(Self::FIELD_ENTITY_NAME)
                .unwrap_or(UNKNOWN)
                .to_string(),
            facility_type: feature
                .attr_str(Self::FIELD_FACILITY_TYPE)
                .unwrap_or(UNKNOWN)
                .to_string(),
            license_status: feature
                .attr_str(Self::FIELD_LICENSE_STATUS)
                .unwrap_or(UNKNOWN)
                .to_string(),
        }
    }
}

/// A public or non-public school parcel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolArea {
    /// School name.
    pub school_name: String,
}

impl SchoolArea {
    /// Attribute carrying the school name.
    pub const FIELD_SCHOOL_NAME: &'static str = "SCHOOL_NAME";

    /// Reads the record from a raw feature.
    #[must_use]
    pub fn from_feature(feature: &Feature) -> Self {
        Self {
            school_name: feature
                .attr_str(Self::FIELD_SCHOOL_NAME)
                .unwrap_or(UNKNOWN)
                .to_string(),
        }
    }
}

/// A licensed childcare facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildcareFacility {
    /// Business or professional name.
    pub name: String,
}

impl ChildcareFacility {
    /// Attribute carrying the facility name.
    pub const FIELD_NAME: &'static str = "BUS_PROF_NAME";

    /// Reads the record from a raw feature.
    #[must_use]
    pub fn from_feature(feature: &Feature) -> Self {
        Self {
            name: feature
                .attr_str(Self::FIELD_NAME)
                .unwrap_or(UNKNOWN)
                .to_string(),
        }
    }
}

/// A building footprint polygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingFootprint {
    /// Backend object id of the footprint.
    pub object_id: i64,
}

impl BuildingFootprint {
    /// Attribute carrying the backend object id.
    pub const FIELD_OBJECT_ID: &'static str = "OBJECTID";

    /// Reads the record from a raw feature; footprints without an object id
    /// get `0`.
    #[must_use]
    pub fn from_feature(feature: &Feature) -> Self {
        Self {
            object_id: feature.attr_i64(Self::FIELD_OBJECT_ID).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_with(key: &str, value: serde_json::Value) -> Feature {
        let mut feature = Feature::default();
        feature.attributes.insert(key.to_string(), value);
        feature
    }

    #[test]
    fn address_falls_back_to_unknown() {
        let record = AddressPoint::from_feature(&Feature::default());
        assert_eq!(record.full_address, UNKNOWN);
    }

    #[test]
    fn zoning_is_none_without_zone_code() {
        assert_eq!(ZoningDistrict::from_feature(&Feature::default()), None);

        let feature = feature_with(
            ZoningDistrict::FIELD_ZONE_DISTRICT,
            serde_json::json!("U-SU-A"),
        );
        assert_eq!(
            ZoningDistrict::from_feature(&feature).unwrap().zone_district,
            "U-SU-A"
        );
    }

    #[test]
    fn marijuana_store_reads_all_fields() {
        let mut feature = feature_with(
            MarijuanaStore::FIELD_ENTITY_NAME,
            serde_json::json!("GREEN LEAF LLC"),
        );
        feature.attributes.insert(
            MarijuanaStore::FIELD_LICENSE_STATUS.to_string(),
            serde_json::json!("Active"),
        );

        let record = MarijuanaStore::from_feature(&feature);
        assert_eq!(record.entity_name, "GREEN LEAF LLC");
        assert_eq!(record.license_status, "Active");
        assert_eq!(record.facility_type, UNKNOWN);
    }
}
