//! Buyability scoring.
//!
//! [`score`] is a pure function of the record. The rules favour owner-operated,
//! commercial businesses in the $5M–$15M+ range and punish franchises and
//! companies with negative press. Missing fields count as neutral.

use std::sync::Arc;

use dealscout_shared::{CompanyRecord, Field, Result};
use dealscout_storage::Storage;
use tracing::{info, instrument};

use crate::pipeline::ProgressReporter;
use crate::run_state::RunState;

pub const MAX_SCORE: u8 = 100;

/// One rule that moved the score, with its signed contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSignal {
    pub label: &'static str,
    pub points: i32,
}

/// Breakdown of a score: each rule that fired, the raw sum, and the clamped result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreCard {
    pub signals: Vec<ScoreSignal>,
    pub raw: i32,
    pub score: u8,
}

/// Score a record in `[0, 100]`.
pub fn score(record: &CompanyRecord) -> u8 {
    score_card(record).score
}

/// Score a record and report which rules contributed.
pub fn score_card(record: &CompanyRecord) -> ScoreCard {
    let mut signals = Vec::new();
    let mut add = |label: &'static str, points: i32| signals.push(ScoreSignal { label, points });

    let revenue = record.integer(Field::RevenueEstimate).unwrap_or(0);
    match revenue {
        r if r >= 15_000_000 => add("revenue >= $15M", 30),
        r if r >= 5_000_000 => add("revenue $5M-$15M", 20),
        r if r >= 1_000_000 => add("revenue $1M-$5M", 10),
        _ => {}
    }

    if record.flag(Field::IsFamilyOwned) {
        add("family owned", 20);
    }
    if record.flag(Field::IsFranchise) {
        add("franchise", -50);
    }

    let industry = record
        .text(Field::IndustryTag)
        .unwrap_or_default()
        .to_lowercase();
    let customer = record
        .text(Field::CustomerType)
        .unwrap_or_default()
        .to_lowercase();
    if industry.contains("commercial") || industry.contains("industrial") || customer.contains("b2b")
    {
        add("commercial / B2B", 20);
    } else if industry.contains("residential") {
        add("residential", 5);
    }

    if record.has(Field::OwnerName) {
        add("owner known", 15);
    }
    if record.has(Field::LinkedinCompanyUrl) || record.has(Field::OwnerLinkedinUrl) {
        add("LinkedIn presence", 15);
    }
    if record
        .text(Field::RiskFlags)
        .is_some_and(|flags| flags.contains("ALERT"))
    {
        add("risk alert", -50);
    }

    let raw: i32 = signals.iter().map(|s| s.points).sum();
    let score = raw.clamp(0, i32::from(MAX_SCORE)) as u8;
    ScoreCard {
        signals,
        raw,
        score,
    }
}

// ---------------------------------------------------------------------------
// Scoring job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringSummary {
    pub scored: usize,
    pub stopped: bool,
}

/// Score every stored company and persist `buyability_score`.
#[instrument(skip_all)]
pub async fn score_all(
    storage: &Storage,
    run_state: &Arc<RunState>,
    progress: &dyn ProgressReporter,
) -> Result<ScoringSummary> {
    let _guard = run_state.begin("Scoring");
    let companies = storage.list_companies(None).await?;
    let total = companies.len();
    let mut summary = ScoringSummary::default();

    info!(total, "scoring companies");
    for company in &companies {
        if run_state.should_stop() {
            info!(scored = summary.scored, "stop requested, halting scoring");
            summary.stopped = true;
            break;
        }
        storage.set_score(&company.id, score(company)).await?;
        summary.scored += 1;
        progress.scored(summary.scored, total);
    }

    info!(scored = summary.scored, "scoring finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::{record, temp_storage};

    #[test]
    fn empty_record_scores_zero() {
        let card = score_card(&record("Blank"));
        assert_eq!(card.score, 0);
        assert!(card.signals.is_empty());
    }

    #[test]
    fn franchise_with_alert_clamps_to_zero() {
        let company = record("Big Franchise")
            .with(Field::RevenueEstimate, 20_000_000_i64)
            .with(Field::IsFamilyOwned, true)
            .with(Field::IsFranchise, true)
            .with(Field::IndustryTag, "Commercial HVAC")
            .with(Field::OwnerName, "Jane Doe")
            .with(Field::RiskFlags, "ALERT: lawsuit");
        let card = score_card(&company);
        assert_eq!(card.raw, -15);
        assert_eq!(card.score, 0);
    }

    #[test]
    fn residential_cleaning_mid_revenue() {
        let company = record("Sparkle")
            .with(Field::RevenueEstimate, 8_000_000_i64)
            .with(Field::IndustryTag, "Residential Cleaning");
        assert_eq!(score(&company), 25);
    }

    #[test]
    fn revenue_tier_boundaries() {
        let at = |r: i64| score(&record("R").with(Field::RevenueEstimate, r));
        assert_eq!(at(999_999), 0);
        assert_eq!(at(1_000_000), 10);
        assert_eq!(at(4_999_999), 10);
        assert_eq!(at(5_000_000), 20);
        assert_eq!(at(15_000_000), 30);
    }

    #[test]
    fn best_case_is_capped() {
        let company = record("Ideal")
            .with(Field::RevenueEstimate, 30_000_000_i64)
            .with(Field::IsFamilyOwned, true)
            .with(Field::CustomerType, "B2B")
            .with(Field::OwnerName, "Pat Lee")
            .with(Field::OwnerLinkedinUrl, "https://linkedin.com/in/patlee")
            .with(Field::RiskFlags, "Clean (No local negative news)");
        let card = score_card(&company);
        assert_eq!(card.raw, 100);
        assert_eq!(card.score, MAX_SCORE);
    }

    #[test]
    fn commercial_beats_residential() {
        let both = record("Mixed").with(Field::IndustryTag, "Commercial & Residential Roofing");
        assert_eq!(score(&both), 20);
    }

    #[test]
    fn scoring_is_deterministic() {
        let company = record("Same")
            .with(Field::RevenueEstimate, 3_000_000_i64)
            .with(Field::IsFamilyOwned, true);
        assert_eq!(score(&company), score(&company.clone()));
        assert_eq!(score(&company), 30);
    }

    #[tokio::test]
    async fn score_all_persists_scores() {
        let storage = temp_storage().await;
        let company = record("Sparkle")
            .with(Field::RevenueEstimate, 8_000_000_i64)
            .with(Field::IndustryTag, "Residential Cleaning");
        storage.upsert_discovered(&record("Blank")).await.unwrap();
        storage.upsert_discovered(&company).await.unwrap();

        let state = RunState::shared();
        let summary = score_all(&storage, &state, &SilentProgress).await.unwrap();
        assert_eq!(summary.scored, 2);
        assert!(!summary.stopped);
        assert_eq!(state.current(), "idle");

        let stored = storage.get_company(&company.id).await.unwrap().unwrap();
        assert_eq!(stored.integer(Field::BuyabilityScore), Some(25));
    }
}
