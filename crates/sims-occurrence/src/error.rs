use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed delimited text in sheet {sheet}: {source}")]
    Csv {
        sheet: String,
        #[source]
        source: csv::Error,
    },

    #[error("archive {archive} has no {sheet} sheet")]
    MissingSheet { sheet: String, archive: String },
}
