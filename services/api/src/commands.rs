use crate::cli::{IngestArgs, StorageArgs};
use crate::infra::{claims_service, parse_dollars, ClaimStoreBackend};
use clap::Args;
use fraud_lens::config::AppConfig;
use fraud_lens::error::AppError;
use fraud_lens::telemetry;
use fraud_lens::workflows::claims::money::to_cents;
use fraud_lens::workflows::claims::{
    Baseline, ClaimMetrics, ClaimsService, FraudBand, FraudScoringEngine, RuleSetVersion,
    ScoreInput,
};
use serde::Serialize;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Claim charge in dollars (`$` and thousands separators accepted)
    #[arg(long, value_parser = parse_dollars, allow_hyphen_values = true)]
    pub(crate) charge: f64,
    /// Category mean charge in dollars. Omit to score without a baseline.
    #[arg(long, value_parser = parse_dollars)]
    pub(crate) mean: Option<f64>,
    /// Category standard deviation in dollars (defaults to 0)
    #[arg(long, value_parser = parse_dollars, requires = "mean")]
    pub(crate) std_dev: Option<f64>,
    /// Provider type as it appears on the claim
    #[arg(long)]
    pub(crate) provider_type: Option<String>,
    /// Procedure code or treatment used as the category key
    #[arg(long)]
    pub(crate) category: Option<String>,
    /// Rule set to apply (`canonical` or `legacy`)
    #[arg(long, value_parser = parse_ruleset, default_value = "canonical")]
    pub(crate) ruleset: RuleSetVersion,
    /// Print the result as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdminAction {
    Reset,
    Drop,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScoreReport {
    pub(crate) ruleset: RuleSetVersion,
    pub(crate) charge: f64,
    pub(crate) score: u8,
    pub(crate) band: FraudBand,
    pub(crate) reasons: Vec<String>,
}

fn parse_ruleset(raw: &str) -> Result<RuleSetVersion, String> {
    RuleSetVersion::parse(raw).ok_or_else(|| format!("unknown rule set '{raw}'"))
}

fn open_service(storage: StorageArgs) -> Result<ClaimsService<ClaimStoreBackend>, AppError> {
    let mut config = AppConfig::load()?;
    storage.apply(&mut config.storage);
    telemetry::init(&config.telemetry)?;
    claims_service(&config)
}

pub(crate) fn run_ingest(args: IngestArgs) -> Result<(), AppError> {
    let IngestArgs {
        csv,
        reset,
        storage,
    } = args;

    let service = open_service(storage)?;
    if reset {
        service.reset()?;
        println!("Cleared existing claims");
    }

    let summary = service.ingest_path(&csv)?;
    println!(
        "Ingested {}: {} new claims, {} total",
        csv.display(),
        summary.inserted,
        summary.total
    );
    Ok(())
}

pub(crate) fn run_metrics(storage: StorageArgs) -> Result<(), AppError> {
    let service = open_service(storage)?;
    let metrics = service.metrics()?;
    println!("{}", render_metrics(&metrics));
    Ok(())
}

pub(crate) fn run_admin(storage: StorageArgs, action: AdminAction) -> Result<(), AppError> {
    let service = open_service(storage)?;
    match action {
        AdminAction::Reset => {
            service.reset()?;
            println!("All tables truncated");
        }
        AdminAction::Drop => {
            service.drop_schema()?;
            println!("All tables dropped and recreated");
        }
    }
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let json = args.json;
    let report = score_report(&args);
    if json {
        let body = serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
        println!("{body}");
    } else {
        println!("{}", render_score(&report));
    }
    Ok(())
}

pub(crate) fn score_report(args: &ScoreArgs) -> ScoreReport {
    let engine = FraudScoringEngine::new(args.ruleset.rule_set());
    let baseline = args.mean.map(|mean| Baseline {
        mean_cents: to_cents(mean),
        std_dev_cents: to_cents(args.std_dev.unwrap_or(0.0)),
    });
    let input = ScoreInput {
        charge_cents: to_cents(args.charge),
        baseline,
        provider_type: args.provider_type.as_deref(),
        category: args.category.as_deref(),
    };
    let assessment = engine.assess(&input);

    ScoreReport {
        ruleset: args.ruleset,
        charge: args.charge,
        score: assessment.score,
        band: assessment.band,
        reasons: assessment.reasons,
    }
}

fn render_score(report: &ScoreReport) -> String {
    let mut out = format!(
        "Score {} ({}) for ${:.2} under the {} rule set",
        report.score,
        report.band.label(),
        report.charge,
        report.ruleset
    );
    if report.reasons.is_empty() {
        out.push_str("\n- no rules fired");
    }
    for reason in &report.reasons {
        out.push_str("\n- ");
        out.push_str(reason);
    }
    out
}

fn render_metrics(metrics: &ClaimMetrics) -> String {
    let summary = &metrics.metrics;
    let distribution = &metrics.distribution;
    format!(
        "Claims: {}\nAverage charge: ${}\nFlagged: {} ({}%)\nBands: low {} | medium {} | high {}",
        summary.total_claims,
        summary.average_claim_charge,
        summary.flagged_count,
        summary.flagged_percent,
        distribution.low,
        distribution.medium,
        distribution.high
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraud_lens::workflows::claims::{BandDistribution, MetricsSummary};

    fn args(charge: f64) -> ScoreArgs {
        ScoreArgs {
            charge,
            mean: None,
            std_dev: None,
            provider_type: None,
            category: None,
            ruleset: RuleSetVersion::Canonical,
            json: false,
        }
    }

    #[test]
    fn score_without_baseline_reports_missing_context() {
        let report = score_report(&args(120.0));
        assert_eq!(report.band, FraudBand::Low);
        assert!(report
            .reasons
            .contains(&"missing category code".to_string()));
        assert!(report
            .reasons
            .contains(&"missing provider type".to_string()));
        assert!(render_score(&report).starts_with(&format!("Score {} (Low)", report.score)));
    }

    #[test]
    fn severe_overcharge_scores_high() {
        let report = score_report(&ScoreArgs {
            mean: Some(100.0),
            std_dev: Some(10.0),
            provider_type: Some("Durable Medical Equipment".to_string()),
            category: Some("E0601".to_string()),
            ..args(1000.0)
        });
        assert_eq!(report.band, FraudBand::High);
        assert_eq!(report.reasons[0], "severe overcharge vs. category average");
    }

    #[test]
    fn unknown_ruleset_is_rejected() {
        assert_eq!(parse_ruleset("LEGACY"), Ok(RuleSetVersion::Legacy));
        assert!(parse_ruleset("experimental").is_err());
    }

    #[test]
    fn metrics_render_as_plain_text() {
        let text = render_metrics(&ClaimMetrics {
            metrics: MetricsSummary {
                total_claims: 10,
                average_claim_charge: 190,
                flagged_count: 1,
                flagged_percent: 10,
            },
            distribution: BandDistribution {
                low: 9,
                medium: 0,
                high: 1,
            },
        });
        assert!(text.contains("Claims: 10"));
        assert!(text.contains("Flagged: 1 (10%)"));
        assert!(text.ends_with("low 9 | medium 0 | high 1"));
    }
}
