use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::carrier::{CarrierIdentifier, CarrierIdentity, ContactAddress};
use crate::domain::profile::SafetyProfile;
use crate::errors::GatewayError;

/// Result of the report step. `email_sent = false` means the analysis exists but the
/// delivery channel failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub ai_analysis: String,
    pub carrier: CarrierIdentity,
    pub email_sent: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicStats {
    pub checks_this_month: u64,
    pub total_checks: Option<u64>,
}

impl PublicStats {
    pub const DEFAULT_CHECKS_THIS_MONTH: u64 = 3247;

    pub fn fallback(checks_this_month: u64) -> Self {
        Self { checks_this_month, total_checks: None }
    }
}

impl Default for PublicStats {
    fn default() -> Self {
        Self::fallback(Self::DEFAULT_CHECKS_THIS_MONTH)
    }
}

#[async_trait]
pub trait SafetyProfileFetcher: Send + Sync {
    async fn lookup(&self, carrier: &CarrierIdentifier) -> Result<SafetyProfile, GatewayError>;
}

#[async_trait]
pub trait ReportService: Send + Sync {
    async fn generate_and_deliver(
        &self,
        carrier: &CarrierIdentifier,
        contact: &ContactAddress,
    ) -> Result<GeneratedReport, GatewayError>;

    /// Returns whether the email went out on this attempt.
    async fn resend(
        &self,
        carrier: &CarrierIdentifier,
        contact: &ContactAddress,
    ) -> Result<bool, GatewayError>;
}

#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn stats(&self) -> Result<PublicStats, GatewayError>;
}

/// One-shot stats read that never fails.
pub async fn stats_or_default(source: &dyn StatsSource, fallback_checks: u64) -> PublicStats {
    match source.stats().await {
        Ok(stats) => stats,
        Err(error) => {
            tracing::debug!(
                event_name = "stats.fetch_failed",
                error = %error,
                "using static checks-this-month fallback"
            );
            PublicStats::fallback(fallback_checks)
        }
    }
}
