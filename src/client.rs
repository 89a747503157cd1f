//! Typed HTTP client for a running `care-chronicled`.

use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{ChronicleError, Result};
use crate::insights::{AnalyticsOverview, MemberDashboard, MemberProfile, MemberWithInsights};
use crate::models::{
    ConversationDetail, ConversationThread, Episode, HealthMetric, Member, TeamMember,
};
use crate::routes::service::HealthResponse;
use crate::routes::ApiResponse;
use crate::store::StoreStatus;

pub struct ChronicleClient {
    base_url: String,
    http: reqwest::Client,
}

impl ChronicleClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(config.timeout())
            .build()
            .map_err(|e| ChronicleError::Runtime(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = join_url(&self.base_url, "/health");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ChronicleError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChronicleError::Http(format!("health check returned {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| ChronicleError::Serialization(e.to_string()))
    }

    pub async fn store_status(&self) -> Result<StoreStatus> {
        self.get_data("/api/test-db", &[]).await
    }

    pub async fn members(&self) -> Result<Vec<Member>> {
        self.get_data("/api/members", &[]).await
    }

    pub async fn members_full(&self) -> Result<Vec<MemberWithInsights>> {
        self.get_data("/api/members/full", &[]).await
    }

    pub async fn member(&self, id: &str) -> Result<MemberProfile> {
        self.get_data(&member_path(id, ""), &[]).await
    }

    pub async fn dashboard(&self, id: &str) -> Result<MemberDashboard> {
        self.get_data(&member_path(id, "/dashboard"), &[]).await
    }

    pub async fn member_health_metrics(
        &self,
        id: &str,
        metric_type: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<HealthMetric>> {
        let mut query = Vec::new();
        if let Some(metric_type) = metric_type {
            query.push(("type", metric_type.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.get_data(&member_path(id, "/health-metrics"), &query)
            .await
    }

    pub async fn member_episodes(&self, id: &str) -> Result<Vec<Episode>> {
        self.get_data(&member_path(id, "/episodes"), &[]).await
    }

    pub async fn conversations(&self) -> Result<Vec<ConversationThread>> {
        self.get_data("/api/conversations", &[]).await
    }

    pub async fn conversation(&self, id: &str) -> Result<ConversationDetail> {
        let path = format!("/api/conversations/{}", urlencoding::encode(id));
        self.get_data(&path, &[]).await
    }

    pub async fn overview(&self) -> Result<AnalyticsOverview> {
        self.get_data("/api/analytics/overview", &[]).await
    }

    pub async fn team_members(&self) -> Result<Vec<TeamMember>> {
        self.get_data("/api/team-members", &[]).await
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = join_url_with_query(&self.base_url, path, query);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ChronicleError::Http(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ChronicleError::Http(e.to_string()))?;
        let envelope: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                ChronicleError::Serialization(e.to_string())
            } else {
                ChronicleError::Http(format!("{path} returned {status}"))
            }
        })?;
        unwrap_envelope(path, status, envelope)
    }
}

fn unwrap_envelope<T>(
    path: &str,
    status: reqwest::StatusCode,
    envelope: ApiResponse<T>,
) -> Result<T> {
    if !envelope.success || !status.is_success() {
        let error = envelope
            .error
            .unwrap_or_else(|| format!("{path} returned {status}"));
        return Err(ChronicleError::Http(match envelope.message {
            Some(message) => format!("{error}: {message}"),
            None => error,
        }));
    }
    envelope
        .data
        .ok_or_else(|| ChronicleError::Http(format!("{path} returned no data")))
}

fn member_path(id: &str, suffix: &str) -> String {
    format!("/api/members/{}{suffix}", urlencoding::encode(id))
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn join_url_with_query(base_url: &str, path: &str, query: &[(&str, String)]) -> String {
    let mut url = join_url(base_url, path);
    if !query.is_empty() {
        let query_string = query
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        url.push('?');
        url.push_str(&query_string);
    }
    url
}
