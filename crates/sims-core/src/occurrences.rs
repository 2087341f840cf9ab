use serde::{Deserialize, Serialize};

/// One biological occurrence reconciled from the `event`, `occurrence`, and
/// `taxon` sheets of a submission.
///
/// Built once per occurrence row during a scrape pass and never mutated
/// afterwards; corrections arrive as a new submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceRecord {
    pub associated_taxa: Option<String>,
    pub life_stage: Option<String>,
    pub individual_count: Option<i32>,
    pub organism_quantity: Option<String>,
    pub organism_quantity_type: Option<String>,
    /// Taken from the first `taxon` row sharing the occurrence's event id.
    pub vernacular_name: Option<String>,
    /// Taken verbatim from the first `event` row sharing the event id,
    /// e.g. `"9N 300457 5884632"`.
    pub verbatim_coordinates: Option<String>,
    /// ISO-8601 UTC timestamp decoded from the matching event's date cell.
    pub event_date: Option<String>,
    /// Raw provenance: `{ "headers": [...], "rows": [...] }` for the source
    /// occurrence row.
    pub data: serde_json::Value,
}

/// A UTM position resolved from a verbatim coordinate string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCoordinate {
    pub easting: f64,
    pub northing: f64,
    /// EPSG code of the WGS 84 UTM zone, e.g. `32609` for zone 9 north.
    pub zone_srid: i32,
}

/// Bind parameters for a single `occurrence` insert, minus the
/// submission id which the persistence layer supplies.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceInsertParams {
    pub associated_taxa: Option<String>,
    pub life_stage: Option<String>,
    pub data: serde_json::Value,
    pub vernacular_name: Option<String>,
    pub event_date: Option<String>,
    pub individual_count: Option<i32>,
    pub organism_quantity: Option<String>,
    pub organism_quantity_type: Option<String>,
    /// `None` means the geography column is written as `NULL`.
    pub coordinate: Option<ResolvedCoordinate>,
}

impl OccurrenceRecord {
    /// Builds the insert parameter set for this record, attaching the
    /// coordinate the caller resolved from `verbatim_coordinates`.
    #[must_use]
    pub fn to_insert_params(&self, coordinate: Option<ResolvedCoordinate>) -> OccurrenceInsertParams {
        OccurrenceInsertParams {
            associated_taxa: self.associated_taxa.clone(),
            life_stage: self.life_stage.clone(),
            data: self.data.clone(),
            vernacular_name: self.vernacular_name.clone(),
            event_date: self.event_date.clone(),
            individual_count: self.individual_count,
            organism_quantity: self.organism_quantity.clone(),
            organism_quantity_type: self.organism_quantity_type.clone(),
            coordinate,
        }
    }
}
