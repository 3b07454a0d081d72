//! Gateway to the fleet management API.
//!
//! Two kinds of traffic: batched scalar-field updates (continuous state,
//! driven by the sync policy) and single discrete events (occurrences). The
//! fence record travels on its own route. Success is exactly HTTP 200; any
//! other status means the whole batch is retried on the next cycle. The
//! client never retries internally.
//!
//! Every call is logged at debug level (target, payload, status) for audit.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::ApiConfig;
use crate::model::{FenceState, FieldKey, FieldValue};

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Rejected(reqwest::StatusCode),
}

/// One scalar field in a batch, string-encoded as the API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub field_id: String,
    pub value: String,
    pub set_by: String,
}

impl FieldReport {
    pub fn new(key: FieldKey, value: &FieldValue, set_by: u32) -> Self {
        Self {
            field_id: key.field_id().to_string(),
            value: value.to_string(),
            set_by: set_by.to_string(),
        }
    }
}

/// A single discrete event, string-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventReport {
    pub event_type_id: String,
    pub description: String,
}

/// The fence record on the wire, string-encoded like everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FenceReport {
    pub breach_time: String,
    pub breach_count: String,
    pub breach_status: String,
    pub breach_type: String,
}

impl FenceReport {
    pub fn from_state(fence: &FenceState) -> Self {
        Self {
            breach_time: fence.breach_time.to_string(),
            breach_count: fence.breach_count.to_string(),
            breach_status: fence.breach_status.to_string(),
            breach_type: fence.breach_type.to_string(),
        }
    }
}

/// The outbound seam. The sync policy and ingestion loop depend on this
/// trait only; tests substitute recording or failing stubs.
#[async_trait]
pub trait VehicleApi: Send + Sync {
    /// Post a batch of changed scalar fields. The whole batch is accepted
    /// (200) or the whole batch is retried next cycle.
    async fn post_field_batch(&self, uuid: &str, fields: &[FieldReport]) -> Result<(), ApiError>;

    /// Post one discrete event (e.g. a fence breach).
    async fn post_event(
        &self,
        uuid: &str,
        event_type_id: u16,
        description: &str,
    ) -> Result<(), ApiError>;

    /// Post the fence status record.
    async fn post_fence_status(&self, uuid: &str, fence: &FenceReport) -> Result<(), ApiError>;
}

/// HTTP client for the fleet API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_root: String,
    auth_token: String,
    origin: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_root: config.root.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            origin: config.origin.clone(),
        })
    }

    /// POST a JSON body to `vehicle/{uuid}/{route}` and return the status.
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        uuid: &str,
        route: &str,
        body: &T,
    ) -> Result<reqwest::StatusCode, ApiError> {
        let address = format!("{}/vehicle/{}/{}", self.api_root, uuid, route);

        let response = self
            .http
            .post(&address)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Origin", &self.origin)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let payload =
            serde_json::to_string(body).unwrap_or_else(|_| "<unserializable>".to_string());
        debug!(address = %address, payload = %payload, status = %status, "API call");

        Ok(status)
    }
}

#[async_trait]
impl VehicleApi for ApiClient {
    async fn post_field_batch(&self, uuid: &str, fields: &[FieldReport]) -> Result<(), ApiError> {
        let status = self.post_json(uuid, "field", fields).await?;
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(ApiError::Rejected(status))
        }
    }

    async fn post_event(
        &self,
        uuid: &str,
        event_type_id: u16,
        description: &str,
    ) -> Result<(), ApiError> {
        let body = [EventReport {
            event_type_id: event_type_id.to_string(),
            description: description.to_string(),
        }];
        let status = self.post_json(uuid, "event", &body).await?;
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(ApiError::Rejected(status))
        }
    }

    async fn post_fence_status(&self, uuid: &str, fence: &FenceReport) -> Result<(), ApiError> {
        let body = std::slice::from_ref(fence);
        let status = self.post_json(uuid, "fence", body).await?;
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(ApiError::Rejected(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_report_is_string_encoded() {
        let report = FieldReport::new(FieldKey::Latitude, &FieldValue::Int(100), 1234);
        assert_eq!(report.field_id, "5");
        assert_eq!(report.value, "100");
        assert_eq!(report.set_by, "1234");

        let json = serde_json::to_string(&[report]).expect("serializes");
        assert_eq!(
            json,
            r#"[{"field_id":"5","value":"100","set_by":"1234"}]"#
        );
    }

    #[test]
    fn event_report_wire_shape() {
        let body = [EventReport {
            event_type_id: "8".to_string(),
            description: "Fence breach #1 (type 3)".to_string(),
        }];
        let json = serde_json::to_string(&body).expect("serializes");
        assert_eq!(
            json,
            r#"[{"event_type_id":"8","description":"Fence breach #1 (type 3)"}]"#
        );
    }

    #[test]
    fn fence_report_carries_all_four_sub_fields() {
        let fence = FenceState {
            breach_time: 1000,
            breach_count: 2,
            breach_status: 1,
            breach_type: 3,
            dirty: true,
        };
        let report = FenceReport::from_state(&fence);
        let json = serde_json::to_string(&report).expect("serializes");
        assert_eq!(
            json,
            r#"{"breach_time":"1000","breach_count":"2","breach_status":"1","breach_type":"3"}"#
        );
    }

    #[test]
    fn unset_values_render_as_empty_strings() {
        let report = FieldReport::new(FieldKey::Armed, &FieldValue::Unset, 1234);
        assert_eq!(report.value, "");
    }
}
