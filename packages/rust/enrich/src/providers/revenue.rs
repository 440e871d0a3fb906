use async_trait::async_trait;
use dealscout_shared::{CompanyRecord, CompanyUpdate, Field, Result};

use crate::module::EnrichmentModule;

/// Revenue per employee for a typical local service business.
const BASELINE_RPE: i64 = 200_000;
const COMMERCIAL_RPE: i64 = 350_000;
const CLEANING_RPE: i64 = 90_000;

/// Estimates annual revenue from headcount, or from a sector baseline without it.
///
/// Manually entered revenue (`source = "manual"`) is never overwritten.
pub struct RevenueEstimator;

#[async_trait]
impl EnrichmentModule for RevenueEstimator {
    fn name(&self) -> &str {
        "revenue"
    }

    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate> {
        let mut update = CompanyUpdate::new();
        let manual = record.integer(Field::RevenueEstimate).is_some_and(|r| r != 0)
            && record.text(Field::Source) == Some("manual");
        if !manual {
            update.set(Field::RevenueEstimate, estimate_revenue(record));
        }
        Ok(update)
    }
}

/// Revenue estimate in dollars for the record's current state.
pub fn estimate_revenue(record: &CompanyRecord) -> i64 {
    let employees = record.integer(Field::EmployeeCount).unwrap_or(0);
    let industry = record
        .text(Field::IndustryTag)
        .unwrap_or_default()
        .to_lowercase();
    let customer = record
        .text(Field::CustomerType)
        .unwrap_or_default()
        .to_lowercase();
    let is_commercial = industry.contains("commercial") || industry.contains("industrial");

    if employees > 0 {
        let rpe = if is_commercial {
            COMMERCIAL_RPE
        } else if industry.contains("cleaning") || industry.contains("janitorial") {
            CLEANING_RPE
        } else {
            BASELINE_RPE
        };
        return employees * rpe;
    }

    let mut estimate: f64 = 1_200_000.0;
    if is_commercial {
        estimate += 1_500_000.0;
    }
    if industry.contains("industrial") {
        estimate += 3_000_000.0;
    }
    if customer == "b2b" {
        estimate *= 1.25;
    }
    if record.flag(Field::IsFranchise) {
        estimate = 1_500_000.0;
    }
    if industry.contains("residential") && industry.contains("cleaning") {
        estimate = 750_000.0;
    }
    estimate as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::company;

    #[test]
    fn employee_based() {
        let base = company("A", None).with(Field::EmployeeCount, 10_i64);
        assert_eq!(estimate_revenue(&base), 2_000_000);

        let commercial = base.clone().with(Field::IndustryTag, "Commercial HVAC");
        assert_eq!(estimate_revenue(&commercial), 3_500_000);

        let cleaning = base.with(Field::IndustryTag, "Janitorial Services");
        assert_eq!(estimate_revenue(&cleaning), 900_000);
    }

    #[test]
    fn sector_baseline() {
        let plain = company("A", None);
        assert_eq!(estimate_revenue(&plain), 1_200_000);

        let industrial_b2b = company("A", None)
            .with(Field::IndustryTag, "Industrial Cleaning")
            .with(Field::CustomerType, "B2B");
        // (1.2M + 1.5M + 3.0M) * 1.25
        assert_eq!(estimate_revenue(&industrial_b2b), 7_125_000);

        let franchise = company("A", None)
            .with(Field::IndustryTag, "Commercial Roofing")
            .with(Field::IsFranchise, true);
        assert_eq!(estimate_revenue(&franchise), 1_500_000);

        let maids = company("A", None).with(Field::IndustryTag, "Residential Cleaning");
        assert_eq!(estimate_revenue(&maids), 750_000);
    }

    #[tokio::test]
    async fn manual_revenue_is_kept() {
        let manual = company("A", None)
            .with(Field::RevenueEstimate, 9_000_000_i64)
            .with(Field::Source, "manual");
        assert!(RevenueEstimator.enrich(&manual).await.unwrap().is_empty());

        let estimated = company("A", None).with(Field::RevenueEstimate, 9_000_000_i64);
        let update = RevenueEstimator.enrich(&estimated).await.unwrap();
        assert_eq!(
            update.get(Field::RevenueEstimate).and_then(|v| v.as_integer()),
            Some(1_200_000)
        );
    }
}
