mod mapping;
mod normalizer;
mod parser;

use super::domain::NewClaim;
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum ClaimImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    NoRecognizedColumns,
}

impl std::fmt::Display for ClaimImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimImportError::Io(err) => write!(f, "failed to read claims file: {}", err),
            ClaimImportError::Csv(err) => write!(f, "invalid claims CSV data: {}", err),
            ClaimImportError::NoRecognizedColumns => write!(
                f,
                "claims CSV header does not contain any recognized claim columns"
            ),
        }
    }
}

impl std::error::Error for ClaimImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClaimImportError::Io(err) => Some(err),
            ClaimImportError::Csv(err) => Some(err),
            ClaimImportError::NoRecognizedColumns => None,
        }
    }
}

impl From<std::io::Error> for ClaimImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ClaimImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads a claims CSV export into normalized claims. Parsing is all-or-nothing:
/// a single malformed row rejects the whole file.
pub struct ClaimImporter;

impl ClaimImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<NewClaim>, ClaimImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<NewClaim>, ClaimImportError> {
        let parsed = parser::parse_rows(reader)?;
        if parsed.recognized_columns == 0 {
            return Err(ClaimImportError::NoRecognizedColumns);
        }

        Ok(parsed
            .rows
            .into_iter()
            .map(parser::RawClaimRow::into_claim)
            .collect())
    }
}
