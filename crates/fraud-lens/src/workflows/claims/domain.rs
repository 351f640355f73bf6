use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money;

/// Unique claim identifier as supplied by the source system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId(pub String);

impl ClaimId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClaimId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Normalized claim produced by the importer. Descriptive fields pass through
/// untouched; only `procedure_code` and `provider_type` influence scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewClaim {
    pub claim_id: ClaimId,
    pub patient_id: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub date_admitted: Option<String>,
    pub date_discharged: Option<String>,
    pub service_date: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub procedure_code: Option<String>,
    pub provider_id: Option<String>,
    pub provider_type: Option<String>,
    pub fraud_type: Option<String>,
    /// Charge in dollars.
    pub claim_charge: f64,
}

impl NewClaim {
    pub fn new(claim_id: impl Into<String>, claim_charge: f64) -> Self {
        Self {
            claim_id: ClaimId(claim_id.into()),
            claim_charge,
            ..Self::default()
        }
    }

    pub fn with_procedure_code(mut self, code: impl Into<String>) -> Self {
        self.procedure_code = Some(code.into());
        self
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>, provider_type: Option<&str>) -> Self {
        self.provider_id = Some(provider_id.into());
        self.provider_type = provider_type.map(str::to_string);
        self
    }

    /// Key the claim is grouped by when computing baselines.
    pub fn category_key(&self) -> Option<&str> {
        self.procedure_code.as_deref()
    }

    pub fn charge_cents(&self) -> i64 {
        money::to_cents(self.claim_charge)
    }
}

/// Ordinal fraud risk band derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FraudBand {
    Low,
    Medium,
    High,
}

impl FraudBand {
    pub fn label(&self) -> &'static str {
        match self {
            FraudBand::Low => "Low",
            FraudBand::Medium => "Medium",
            FraudBand::High => "High",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Derived fields written by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub score: u8,
    pub band: FraudBand,
    pub reasons: Vec<String>,
}

/// A claim as held by the store, including pipeline-owned derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: u64,
    pub record: NewClaim,
    pub created_at: DateTime<Utc>,
    pub assessment: Option<FraudAssessment>,
}

impl Claim {
    pub fn claim_id(&self) -> &ClaimId {
        &self.record.claim_id
    }

    pub fn fraud_score(&self) -> u8 {
        self.assessment
            .as_ref()
            .map(|assessment| assessment.score)
            .unwrap_or(0)
    }

    pub fn fraud_band(&self) -> Option<FraudBand> {
        self.assessment.as_ref().map(|assessment| assessment.band)
    }

    pub fn reasons(&self) -> &[String] {
        self.assessment
            .as_ref()
            .map(|assessment| assessment.reasons.as_slice())
            .unwrap_or(&[])
    }
}

/// Baseline row for one category key (amounts in dollars).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStatistic {
    pub category: String,
    pub mean_charge: f64,
    pub std_dev: f64,
    pub claim_count: u64,
    pub last_updated: DateTime<Utc>,
}

/// Aggregate for one `(provider_id, provider_type)` pair (amounts in dollars).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatistic {
    pub provider_id: String,
    pub provider_type: Option<String>,
    pub claim_count: u64,
    pub average_charge: f64,
}

/// Overwrite instruction for one claim's derived fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimScoreUpdate {
    pub claim_id: ClaimId,
    pub assessment: FraudAssessment,
}
