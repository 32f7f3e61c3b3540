use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::domain::carrier::{CarrierIdentifier, ContactAddress};
use crate::services::ReportService;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDeliveryState {
    pub sent: bool,
    pub retry_in_flight: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    NotSent { reason: String },
    /// Another resend was already running; nothing was requested.
    RetryInFlight,
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Owns the email-delivery flag for one generated report and serialises resend attempts.
///
/// Clones share state, so a clone can be awaited without holding the workflow lock.
#[derive(Clone)]
pub struct ReportDeliveryTracker {
    reports: Arc<dyn ReportService>,
    state: Arc<Mutex<ReportDeliveryState>>,
}

impl ReportDeliveryTracker {
    pub fn new(reports: Arc<dyn ReportService>, sent: bool) -> Self {
        Self {
            reports,
            state: Arc::new(Mutex::new(ReportDeliveryState { sent, retry_in_flight: false })),
        }
    }

    pub fn state(&self) -> ReportDeliveryState {
        *lock(&self.state)
    }

    pub async fn resend(
        &self,
        carrier: &CarrierIdentifier,
        contact: &ContactAddress,
    ) -> DeliveryOutcome {
        {
            let mut state = lock(&self.state);
            if state.retry_in_flight {
                tracing::debug!(
                    event_name = "delivery.resend_ignored",
                    carrier = %carrier,
                    "resend already in flight"
                );
                return DeliveryOutcome::RetryInFlight;
            }
            state.retry_in_flight = true;
        }
        let _guard = RetryGuard { state: Arc::clone(&self.state) };

        let outcome = match self.reports.resend(carrier, contact).await {
            Ok(true) => DeliveryOutcome::Sent,
            Ok(false) => DeliveryOutcome::NotSent { reason: "email was not delivered".to_owned() },
            Err(error) => DeliveryOutcome::NotSent { reason: error.to_string() },
        };
        lock(&self.state).sent = outcome.is_sent();

        tracing::info!(
            event_name = "delivery.resend_completed",
            carrier = %carrier,
            sent = outcome.is_sent(),
            "report resend finished"
        );
        outcome
    }
}

/// Clears `retry_in_flight` on completion or when the resend future is dropped.
struct RetryGuard {
    state: Arc<Mutex<ReportDeliveryState>>,
}

impl Drop for RetryGuard {
    fn drop(&mut self) {
        lock(&self.state).retry_in_flight = false;
    }
}

fn lock(state: &Mutex<ReportDeliveryState>) -> MutexGuard<'_, ReportDeliveryState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
