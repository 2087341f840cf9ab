//! In-memory tabular sheets read from a Darwin Core submission.

use serde::Serialize;

/// A raw cell value as it arrived in the submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// Builds a cell from a delimited-text field; empty fields become [`Cell::Empty`].
    #[must_use]
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(field.to_string())
        }
    }

    /// Text content of the cell. Whitespace-only text and empty cells yield
    /// `None`; integral numbers render without a trailing `.0`.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) if s.trim().is_empty() => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Empty => None,
        }
    }

    /// Numeric content of the cell. Text is parsed after trimming and must be finite.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Cell::Number(_) | Cell::Empty => None,
        }
    }

    /// Normalized value used to join rows across sheets, so that a numeric
    /// `1` and a text `"1"` name the same event.
    #[must_use]
    pub fn join_key(&self) -> Option<String> {
        self.as_text().map(|s| s.trim().to_string())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One row of a sheet, indexed by column position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(Vec<Cell>);

impl Row {
    #[must_use]
    pub fn new(cells: Vec<Cell>) -> Self {
        Self(cells)
    }

    /// Cell at `column`; columns past the end of a short row read as absent.
    #[must_use]
    pub fn get(&self, column: usize) -> Option<&Cell> {
        self.0.get(column)
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.0
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Self(cells)
    }
}

/// A named sheet: header names plus rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Sheet {
    #[must_use]
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// An empty sheet with no headers and no rows.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new(), Vec::new())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Position of `column` in the header row.
    ///
    /// Matching trims surrounding whitespace and a leading byte-order mark and
    /// ignores ASCII case. A missing column is `None`, never an error.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        let wanted = normalize_header(column);
        self.headers
            .iter()
            .position(|h| normalize_header(h) == wanted)
    }

    /// Cell in `row` at a column resolved with [`Sheet::column_index`].
    #[must_use]
    pub fn cell<'a>(row: &'a Row, column: Option<usize>) -> Option<&'a Cell> {
        column.and_then(|idx| row.get(idx))
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .to_ascii_lowercase()
}

/// The three sheets of a Darwin Core submission, joined on event id.
#[derive(Debug, Clone, PartialEq)]
pub struct DwcSheets {
    pub event: Sheet,
    pub occurrence: Sheet,
    pub taxon: Sheet,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Sheet {
        Sheet::new(
            "event",
            vec!["\u{feff}eventID".into(), " eventDate ".into()],
            vec![Row::new(vec![Cell::Text("E1".into())])],
        )
    }

    #[test]
    fn column_index_ignores_case_whitespace_and_bom() {
        let sheet = sheet();
        assert_eq!(sheet.column_index("eventid"), Some(0));
        assert_eq!(sheet.column_index("EVENTDATE"), Some(1));
    }

    #[test]
    fn missing_column_is_none() {
        assert_eq!(sheet().column_index("verbatimcoordinates"), None);
    }

    #[test]
    fn short_rows_read_missing_cells_as_absent() {
        let sheet = sheet();
        let row = &sheet.rows()[0];
        assert_eq!(Sheet::cell(row, Some(0)), Some(&Cell::Text("E1".into())));
        assert_eq!(Sheet::cell(row, Some(1)), None);
        assert_eq!(Sheet::cell(row, None), None);
    }

    #[test]
    fn join_key_unifies_numbers_and_text() {
        assert_eq!(Cell::Number(12.0).join_key(), Cell::Text(" 12 ".into()).join_key());
        assert_eq!(Cell::Number(1.5).join_key().as_deref(), Some("1.5"));
        assert_eq!(Cell::Empty.join_key(), None);
        assert_eq!(Cell::Text("  ".into()).join_key(), None);
    }

    #[test]
    fn as_number_parses_trimmed_text() {
        assert_eq!(Cell::Text(" 44000 ".into()).as_number(), Some(44_000.0));
        assert_eq!(Cell::Text("abc".into()).as_number(), None);
        assert_eq!(Cell::Text("NaN".into()).as_number(), None);
        assert_eq!(Cell::Number(f64::INFINITY).as_number(), None);
    }

    #[test]
    fn from_field_maps_empty_to_empty_cell() {
        assert_eq!(Cell::from_field(""), Cell::Empty);
        assert_eq!(Cell::from_field("x"), Cell::Text("x".into()));
    }

    #[test]
    fn cells_serialize_as_plain_json_values() {
        let row = Row::new(vec![
            Cell::Text("E1".into()),
            Cell::Number(3.0),
            Cell::Empty,
        ]);
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value, serde_json::json!(["E1", 3.0, null]));
    }
}
