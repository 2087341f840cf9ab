//! Reconciliation of the `event`, `occurrence`, and `taxon` sheets into
//! [`OccurrenceRecord`]s.
//!
//! Each occurrence row is joined to the first event row and the first taxon
//! row that share its event id. Missing columns and unmatched ids degrade to
//! `None` fields; nothing in a single row can fail the pass.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sims_core::{OccurrenceInsertParams, OccurrenceRecord};

use crate::excel_date::decode_serial;
use crate::sheet::{Cell, DwcSheets, Row, Sheet};
use crate::utm::parse_utm;

const EVENT_ID: &str = "eventid";
const EVENT_DATE: &str = "eventdate";
const VERBATIM_COORDINATES: &str = "verbatimcoordinates";
const ASSOCIATED_TAXA: &str = "associatedtaxa";
const LIFE_STAGE: &str = "lifestage";
const INDIVIDUAL_COUNT: &str = "individualcount";
const ORGANISM_QUANTITY: &str = "organismquantity";
const ORGANISM_QUANTITY_TYPE: &str = "organismquantitytype";
const VERNACULAR_NAME: &str = "vernacularname";

struct EventColumns {
    event_id: Option<usize>,
    event_date: Option<usize>,
    verbatim_coordinates: Option<usize>,
}

impl EventColumns {
    fn resolve(sheet: &Sheet) -> Self {
        Self {
            event_id: sheet.column_index(EVENT_ID),
            event_date: sheet.column_index(EVENT_DATE),
            verbatim_coordinates: sheet.column_index(VERBATIM_COORDINATES),
        }
    }
}

struct OccurrenceColumns {
    event_id: Option<usize>,
    associated_taxa: Option<usize>,
    life_stage: Option<usize>,
    individual_count: Option<usize>,
    organism_quantity: Option<usize>,
    organism_quantity_type: Option<usize>,
}

impl OccurrenceColumns {
    fn resolve(sheet: &Sheet) -> Self {
        Self {
            event_id: sheet.column_index(EVENT_ID),
            associated_taxa: sheet.column_index(ASSOCIATED_TAXA),
            life_stage: sheet.column_index(LIFE_STAGE),
            individual_count: sheet.column_index(INDIVIDUAL_COUNT),
            organism_quantity: sheet.column_index(ORGANISM_QUANTITY),
            organism_quantity_type: sheet.column_index(ORGANISM_QUANTITY_TYPE),
        }
    }
}

struct TaxonColumns {
    event_id: Option<usize>,
    vernacular_name: Option<usize>,
}

impl TaxonColumns {
    fn resolve(sheet: &Sheet) -> Self {
        Self {
            event_id: sheet.column_index(EVENT_ID),
            vernacular_name: sheet.column_index(VERNACULAR_NAME),
        }
    }
}

/// The event-sheet fields an occurrence inherits.
struct EventRow {
    event_date: Option<String>,
    verbatim_coordinates: Option<String>,
}

/// Resolves Darwin Core sheets into occurrence records.
///
/// Diagnostics are emitted as children of the span handed to [`new`], so the
/// caller decides where resolver events are attached.
///
/// [`new`]: OccurrenceResolver::new
#[derive(Debug, Clone)]
pub struct OccurrenceResolver {
    span: tracing::Span,
}

impl OccurrenceResolver {
    #[must_use]
    pub fn new(span: tracing::Span) -> Self {
        Self { span }
    }

    /// Produces one record per `occurrence` row, in sheet order.
    ///
    /// Resolving the same sheets twice yields identical output.
    #[must_use]
    pub fn resolve(&self, sheets: &DwcSheets) -> Vec<OccurrenceRecord> {
        let event_cols = EventColumns::resolve(&sheets.event);
        let occurrence_cols = OccurrenceColumns::resolve(&sheets.occurrence);
        let taxon_cols = TaxonColumns::resolve(&sheets.taxon);

        self.warn_missing_columns(sheets, &event_cols, &occurrence_cols, &taxon_cols);

        let event_index = self.first_match_index(&sheets.event, event_cols.event_id);
        let taxon_index = self.first_match_index(&sheets.taxon, taxon_cols.event_id);

        let mut unmatched_events = 0usize;
        let mut missing_vernacular = 0usize;

        let records: Vec<OccurrenceRecord> = sheets
            .occurrence
            .rows()
            .iter()
            .enumerate()
            .map(|(row_number, row)| {
                let event_id = Sheet::cell(row, occurrence_cols.event_id).and_then(Cell::join_key);

                let event = event_id
                    .as_deref()
                    .and_then(|id| event_index.get(id))
                    .map(|&idx| read_event_row(&sheets.event.rows()[idx], &event_cols));
                if event.is_none() {
                    unmatched_events += 1;
                    tracing::debug!(
                        parent: &self.span,
                        row = row_number,
                        event_id = event_id.as_deref().unwrap_or(""),
                        "no matching event row"
                    );
                }

                let vernacular_name = event_id
                    .as_deref()
                    .and_then(|id| taxon_index.get(id))
                    .and_then(|&idx| {
                        Sheet::cell(&sheets.taxon.rows()[idx], taxon_cols.vernacular_name)
                    })
                    .and_then(Cell::as_text);
                if vernacular_name.is_none() {
                    missing_vernacular += 1;
                }

                let (event_date, verbatim_coordinates) = event
                    .map(|e| (e.event_date, e.verbatim_coordinates))
                    .unwrap_or_default();

                OccurrenceRecord {
                    associated_taxa: text_at(row, occurrence_cols.associated_taxa),
                    life_stage: text_at(row, occurrence_cols.life_stage),
                    individual_count: Sheet::cell(row, occurrence_cols.individual_count)
                        .and_then(Cell::as_number)
                        .and_then(whole_count),
                    organism_quantity: text_at(row, occurrence_cols.organism_quantity),
                    organism_quantity_type: text_at(row, occurrence_cols.organism_quantity_type),
                    vernacular_name,
                    verbatim_coordinates,
                    event_date,
                    data: serde_json::json!({
                        "headers": sheets.occurrence.headers(),
                        "rows": row,
                    }),
                }
            })
            .collect();

        tracing::info!(
            parent: &self.span,
            occurrences = records.len(),
            unmatched_events,
            missing_vernacular,
            "resolved occurrence sheet"
        );

        records
    }

    /// Maps each event id to the first row carrying it. Later duplicates
    /// are counted and reported but never replace the first row.
    fn first_match_index(&self, sheet: &Sheet, key_column: Option<usize>) -> HashMap<String, usize> {
        let mut index = HashMap::with_capacity(sheet.rows().len());
        let mut duplicates = 0usize;

        for (idx, row) in sheet.rows().iter().enumerate() {
            let Some(key) = Sheet::cell(row, key_column).and_then(Cell::join_key) else {
                continue;
            };
            if index.contains_key(&key) {
                duplicates += 1;
            } else {
                index.insert(key, idx);
            }
        }

        if duplicates > 0 {
            tracing::warn!(
                parent: &self.span,
                sheet = sheet.name(),
                duplicates,
                "duplicate event ids; the first row for each id wins"
            );
        }

        index
    }

    fn warn_missing_columns(
        &self,
        sheets: &DwcSheets,
        event_cols: &EventColumns,
        occurrence_cols: &OccurrenceColumns,
        taxon_cols: &TaxonColumns,
    ) {
        let missing = [
            (&sheets.event, EVENT_ID, event_cols.event_id),
            (&sheets.occurrence, EVENT_ID, occurrence_cols.event_id),
            (&sheets.taxon, EVENT_ID, taxon_cols.event_id),
        ];
        for (sheet, column, idx) in missing {
            if idx.is_none() && !sheet.rows().is_empty() {
                tracing::warn!(
                    parent: &self.span,
                    sheet = sheet.name(),
                    column,
                    "join column not found; rows from this sheet cannot be matched"
                );
            }
        }
    }
}

fn read_event_row(row: &Row, cols: &EventColumns) -> EventRow {
    EventRow {
        event_date: Sheet::cell(row, cols.event_date).and_then(event_date_to_iso),
        verbatim_coordinates: text_at(row, cols.verbatim_coordinates),
    }
}

fn text_at(row: &Row, column: Option<usize>) -> Option<String> {
    Sheet::cell(row, column).and_then(Cell::as_text)
}

/// A count of individuals: a non-negative whole number that fits the column.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn whole_count(n: f64) -> Option<i32> {
    (n.fract() == 0.0 && n >= 0.0 && n <= f64::from(i32::MAX)).then_some(n as i32)
}

/// Converts an event date cell to ISO-8601.
///
/// Numbers and numeric text are spreadsheet serials. Other text is accepted
/// when it is already an RFC 3339 timestamp or a `YYYY-MM-DD` date.
fn event_date_to_iso(cell: &Cell) -> Option<String> {
    if let Some(serial) = cell.as_number() {
        return decode_serial(serial).and_then(|dt| dt.to_iso8601());
    }

    let text = cell.as_text()?;
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

/// Builds insert parameters for a record, resolving its verbatim coordinates.
///
/// An empty or malformed coordinate string leaves the geography point unset.
#[must_use]
pub fn insert_params(record: &OccurrenceRecord) -> OccurrenceInsertParams {
    let coordinate = record.verbatim_coordinates.as_deref().and_then(parse_utm);
    record.to_insert_params(coordinate)
}

#[cfg(test)]
#[path = "resolve_test.rs"]
mod tests;
