//! Loading of Darwin Core archives from disk.
//!
//! An archive is either a directory or a `.zip` file holding one delimited
//! text file per sheet (`event.txt`, `occurrence.txt`, `taxon.txt`; a `.csv`
//! extension is also accepted). File names match case-insensitively and may
//! sit under a folder inside the zip.

use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::ArchiveError;
use crate::sheet::{Cell, DwcSheets, Row, Sheet};

const SHEET_EXTENSIONS: [&str; 2] = ["txt", "csv"];

/// Loads the three sheets from a directory or zip file at `path`.
///
/// # Errors
///
/// Returns [`ArchiveError::MissingSheet`] when any of the three sheets is
/// absent, [`ArchiveError::Io`] / [`ArchiveError::Zip`] when the archive
/// cannot be read, and [`ArchiveError::Csv`] for malformed delimited text.
pub fn load_archive(path: &Path, delimiter: u8) -> Result<DwcSheets, ArchiveError> {
    let io_err = |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.is_dir() {
        tracing::debug!(path = %path.display(), "loading archive directory");
        return load_directory(path, delimiter);
    }

    tracing::debug!(path = %path.display(), "loading zip archive");
    let file = File::open(path).map_err(io_err)?;
    load_zip_archive(BufReader::new(file), delimiter)
}

/// Loads the three sheets from a zip archive held by any seekable reader.
///
/// # Errors
///
/// See [`load_archive`].
pub fn load_zip_archive<R: Read + Seek>(
    reader: R,
    delimiter: u8,
) -> Result<DwcSheets, ArchiveError> {
    let mut archive = ZipArchive::new(reader)?;
    let names: Vec<String> = archive.file_names().map(str::to_owned).collect();

    let mut read = |sheet: &str| -> Result<Sheet, ArchiveError> {
        let entry = names
            .iter()
            .find(|name| {
                let base = name.rsplit('/').next().unwrap_or(name.as_str());
                is_sheet_file(base, sheet)
            })
            .ok_or_else(|| ArchiveError::MissingSheet {
                sheet: sheet.to_string(),
                archive: "zip".to_string(),
            })?;
        let file = archive.by_name(entry)?;
        read_sheet(sheet, file, delimiter)
    };

    Ok(DwcSheets {
        event: read("event")?,
        occurrence: read("occurrence")?,
        taxon: read("taxon")?,
    })
}

fn load_directory(dir: &Path, delimiter: u8) -> Result<DwcSheets, ArchiveError> {
    let io_err = |source| ArchiveError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let read = |sheet: &str| -> Result<Sheet, ArchiveError> {
        let path = files
            .iter()
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| is_sheet_file(n, sheet))
            })
            .ok_or_else(|| ArchiveError::MissingSheet {
                sheet: sheet.to_string(),
                archive: dir.display().to_string(),
            })?;
        let file = File::open(path).map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;
        read_sheet(sheet, BufReader::new(file), delimiter)
    };

    Ok(DwcSheets {
        event: read("event")?,
        occurrence: read("occurrence")?,
        taxon: read("taxon")?,
    })
}

fn is_sheet_file(file_name: &str, sheet: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| {
            stem.eq_ignore_ascii_case(sheet)
                && SHEET_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
        })
}

/// Reads one delimited-text sheet. The first record is the header row;
/// ragged rows are kept as-is.
fn read_sheet<R: Read>(name: &str, reader: R, delimiter: u8) -> Result<Sheet, ArchiveError> {
    let csv_err = |source| ArchiveError::Csv {
        sheet: name.to_string(),
        source,
    };

    // Tab-delimited exports do not quote fields; a stray `"` in a remark
    // must not swallow the rest of the file.
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quoting(delimiter != b'\t')
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_owned)
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        rows.push(Row::new(record.iter().map(Cell::from_field).collect()));
    }

    tracing::debug!(sheet = name, columns = headers.len(), rows = rows.len(), "read sheet");
    Ok(Sheet::new(name, headers, rows))
}
