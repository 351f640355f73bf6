use super::normalizer::normalize_header;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Claim attribute a CSV column can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ClaimField {
    ClaimId,
    FallbackId,
    PatientId,
    Age,
    Gender,
    DateAdmitted,
    DateDischarged,
    ServiceDate,
    Diagnosis,
    Treatment,
    ProcedureCode,
    ProviderId,
    ProviderType,
    ClaimCharge,
    FraudType,
}

static HEADER_MAP: OnceLock<HashMap<String, ClaimField>> = OnceLock::new();

pub(crate) fn field_for_header(header: &str) -> Option<ClaimField> {
    header_map().get(&normalize_header(header)).copied()
}

fn header_map() -> &'static HashMap<String, ClaimField> {
    HEADER_MAP.get_or_init(|| {
        const HEADER_TO_FIELD: &[(&str, ClaimField)] = &[
            // Identity
            ("claim_id", ClaimField::ClaimId),
            ("Claim Number", ClaimField::ClaimId),
            ("claim_no", ClaimField::ClaimId),
            ("id", ClaimField::FallbackId),
            // Patient
            ("patient_id", ClaimField::PatientId),
            ("member_id", ClaimField::PatientId),
            ("age", ClaimField::Age),
            ("patient_age", ClaimField::Age),
            ("gender", ClaimField::Gender),
            ("sex", ClaimField::Gender),
            // Dates
            ("date_admitted", ClaimField::DateAdmitted),
            ("admission_date", ClaimField::DateAdmitted),
            ("date_discharged", ClaimField::DateDischarged),
            ("discharge_date", ClaimField::DateDischarged),
            ("service_date", ClaimField::ServiceDate),
            ("claim_date", ClaimField::ServiceDate),
            ("date_of_service", ClaimField::ServiceDate),
            // Clinical
            ("diagnosis", ClaimField::Diagnosis),
            ("diagnosis_code", ClaimField::Diagnosis),
            ("treatment", ClaimField::Treatment),
            ("treatment_code", ClaimField::Treatment),
            ("procedure_code", ClaimField::ProcedureCode),
            ("procedure", ClaimField::ProcedureCode),
            ("cpt_code", ClaimField::ProcedureCode),
            ("hcpcs_code", ClaimField::ProcedureCode),
            // Provider
            ("provider_id", ClaimField::ProviderId),
            ("npi", ClaimField::ProviderId),
            ("provider_type", ClaimField::ProviderType),
            ("provider_specialty", ClaimField::ProviderType),
            // Money
            ("claim_charge", ClaimField::ClaimCharge),
            ("charge", ClaimField::ClaimCharge),
            ("claim_amount", ClaimField::ClaimCharge),
            ("billed_amount", ClaimField::ClaimCharge),
            ("amount", ClaimField::ClaimCharge),
            // Source labels
            ("fraud_type", ClaimField::FraudType),
        ];

        let mut map = HashMap::with_capacity(HEADER_TO_FIELD.len());
        for (header, field) in HEADER_TO_FIELD {
            map.insert(normalize_header(header), *field);
        }
        map
    })
}

#[cfg(test)]
pub(crate) fn lookup_for_tests(header: &str) -> Option<ClaimField> {
    field_for_header(header)
}
