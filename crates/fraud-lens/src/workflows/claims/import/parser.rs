use super::mapping::{field_for_header, ClaimField};
use super::normalizer::clean_cell;
use crate::workflows::claims::domain::{ClaimId, NewClaim};
use crate::workflows::claims::money::parse_amount;
use std::collections::HashMap;
use std::io::Read;

/// One data row keyed by the claim attribute each column maps to.
#[derive(Debug)]
pub(crate) struct RawClaimRow {
    /// 1-based position among data rows.
    pub(crate) position: usize,
    pub(crate) fields: HashMap<ClaimField, String>,
}

/// Header layout of a parsed file.
#[derive(Debug)]
pub(crate) struct ParsedFile {
    pub(crate) recognized_columns: usize,
    pub(crate) rows: Vec<RawClaimRow>,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<ParsedFile, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<Option<ClaimField>> = csv_reader
        .headers()?
        .iter()
        .map(field_for_header)
        .collect();
    let recognized_columns = columns.iter().filter(|column| column.is_some()).count();

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut fields = HashMap::new();
        for (column, cell) in columns.iter().zip(record.iter()) {
            let (Some(field), Some(value)) = (column, clean_cell(cell)) else {
                continue;
            };
            // First populated alias wins when a file carries several.
            fields.entry(*field).or_insert(value);
        }

        rows.push(RawClaimRow {
            position: index + 1,
            fields,
        });
    }

    Ok(ParsedFile {
        recognized_columns,
        rows,
    })
}

impl RawClaimRow {
    fn take(&mut self, field: ClaimField) -> Option<String> {
        self.fields.remove(&field)
    }

    /// Normalizes the row into a claim. The identifier falls back to a
    /// generic `id` column, then to the row position.
    pub(crate) fn into_claim(mut self) -> NewClaim {
        let claim_id = self
            .take(ClaimField::ClaimId)
            .or_else(|| self.take(ClaimField::FallbackId))
            .unwrap_or_else(|| format!("row-{}", self.position));

        let claim_charge = self
            .take(ClaimField::ClaimCharge)
            .map(|raw| parse_amount(&raw))
            .unwrap_or(0.0);
        let age = self
            .take(ClaimField::Age)
            .and_then(|raw| raw.parse::<u32>().ok());

        let treatment = self.take(ClaimField::Treatment);
        let procedure_code = self
            .take(ClaimField::ProcedureCode)
            .or_else(|| treatment.clone());

        NewClaim {
            claim_id: ClaimId(claim_id),
            patient_id: self.take(ClaimField::PatientId),
            age,
            gender: self.take(ClaimField::Gender),
            date_admitted: self.take(ClaimField::DateAdmitted),
            date_discharged: self.take(ClaimField::DateDischarged),
            service_date: self.take(ClaimField::ServiceDate),
            diagnosis: self.take(ClaimField::Diagnosis),
            treatment,
            procedure_code,
            provider_id: self.take(ClaimField::ProviderId),
            provider_type: self.take(ClaimField::ProviderType),
            fraud_type: self.take(ClaimField::FraudType),
            claim_charge,
        }
    }
}
