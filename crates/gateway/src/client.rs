use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use carrier_risk_core::config::ApiConfig;
use carrier_risk_core::domain::carrier::{CarrierIdentifier, ContactAddress};
use carrier_risk_core::domain::profile::SafetyProfile;
use carrier_risk_core::errors::GatewayError;
use carrier_risk_core::services::{
    GeneratedReport, PublicStats, ReportService, SafetyProfileFetcher, StatsSource,
};

use crate::wire::{Envelope, LookupData, LookupRequest, ReportData, ReportRequest, ResendData, StatsData};

const LOOKUP_PATH: &str = "/api/csa-checker/lookup";
const FULL_REPORT_PATH: &str = "/api/csa-checker/full-report";
const RESEND_REPORT_PATH: &str = "/api/csa-checker/resend-report";
const STATS_PATH: &str = "/api/csa-checker/stats";

/// Talks to the carrier data service over HTTP. Implements every collaborator trait
/// the lookup workflow needs.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| GatewayError::Transport(format!("failed to build http client: {error}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.endpoint(path)).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }
        let response = request.send().await.map_err(|error| transport(path, error))?;
        decode(path, response).await
    }

    async fn get<T>(&self, path: &str) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        let mut request = self.client.get(self.endpoint(path));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }
        let response = request.send().await.map_err(|error| transport(path, error))?;
        decode(path, response).await
    }
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

fn transport(path: &str, error: reqwest::Error) -> GatewayError {
    warn!(event_name = "gateway.request_failed", path, error = %error, "carrier data service unreachable");
    if error.is_timeout() {
        GatewayError::Transport("the carrier data service timed out".to_owned())
    } else {
        GatewayError::Transport(format!("could not reach the carrier data service: {error}"))
    }
}

/// Non-2xx responses still carry an envelope most of the time; prefer its message.
async fn decode<T>(path: &str, response: Response) -> Result<T, GatewayError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|error| GatewayError::Transport(format!("failed to read response body: {error}")))?;

    if !status.is_success() {
        warn!(event_name = "gateway.non_success", path, status = %status, "carrier data service returned an error status");
        return match serde_json::from_slice::<Envelope<serde_json::Value>>(&body) {
            Ok(envelope) if !envelope.success => Err(GatewayError::Rejected(envelope.failure_message())),
            _ => Err(GatewayError::Transport(format!("service returned {status}"))),
        };
    }

    let envelope: Envelope<T> = serde_json::from_slice(&body)
        .map_err(|error| GatewayError::Decode(format!("{path}: {error}")))?;
    debug!(event_name = "gateway.response_decoded", path, success = envelope.success);
    envelope.into_result()
}

#[async_trait]
impl SafetyProfileFetcher for HttpGateway {
    async fn lookup(&self, carrier: &CarrierIdentifier) -> Result<SafetyProfile, GatewayError> {
        let data: LookupData =
            self.post(LOOKUP_PATH, &LookupRequest { carrier_number: carrier.as_str() }).await?;
        data.into_profile()
    }
}

#[async_trait]
impl ReportService for HttpGateway {
    async fn generate_and_deliver(
        &self,
        carrier: &CarrierIdentifier,
        contact: &ContactAddress,
    ) -> Result<GeneratedReport, GatewayError> {
        let body = ReportRequest { carrier_number: carrier.as_str(), email: contact.as_str() };
        let data: ReportData = self.post(FULL_REPORT_PATH, &body).await?;
        Ok(data.into_report())
    }

    async fn resend(
        &self,
        carrier: &CarrierIdentifier,
        contact: &ContactAddress,
    ) -> Result<bool, GatewayError> {
        let body = ReportRequest { carrier_number: carrier.as_str(), email: contact.as_str() };
        let data: ResendData = self.post(RESEND_REPORT_PATH, &body).await?;
        Ok(data.email_sent)
    }
}

#[async_trait]
impl StatsSource for HttpGateway {
    async fn stats(&self) -> Result<PublicStats, GatewayError> {
        let data: StatsData = self.get(STATS_PATH).await?;
        Ok(data.into())
    }
}
