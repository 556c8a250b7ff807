//! HTTP client for the tonutils-storage API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{AddBagRequest, BagDetails, DaemonError, StorageDaemon};

/// Client for a tonutils-storage daemon
#[derive(Debug)]
pub struct TonutilsStorageClient {
    endpoint: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct OkResponse {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

impl TonutilsStorageClient {
    /// Create a new storage daemon client
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

/// A details payload, or `None` when the daemon answered `ok: false`
fn parse_details(body: &str) -> Result<Option<BagDetails>, DaemonError> {
    let value: Value = serde_json::from_str(body).map_err(|e| DaemonError::Parse(e.to_string()))?;
    if value.get("ok").and_then(Value::as_bool) == Some(false) {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| DaemonError::Parse(e.to_string()))
}

#[async_trait]
impl StorageDaemon for TonutilsStorageClient {
    async fn bag_details(&self, bag_id: &str) -> Result<Option<BagDetails>, DaemonError> {
        let response = self
            .client
            .get(format!("{}/api/v1/details", self.endpoint))
            .query(&[("bag_id", bag_id)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DaemonError::Http {
                status: status.as_u16(),
                body,
            });
        }
        parse_details(&body)
    }

    async fn add_bag(&self, request: &AddBagRequest) -> Result<(), DaemonError> {
        let response = self
            .client
            .post(format!("{}/api/v1/add", self.endpoint))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DaemonError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if let Ok(parsed) = serde_json::from_str::<OkResponse>(&body) {
            if parsed.ok == Some(false) {
                return Err(DaemonError::Rejected(
                    parsed.error.unwrap_or_else(|| request.bag_id.clone()),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_details_not_ok() {
        assert_eq!(parse_details(r#"{"ok": false, "error": "not found"}"#).unwrap(), None);
    }

    #[test]
    fn test_parse_details_payload() {
        let body = r#"{"bag_id": "ab", "header_loaded": true, "size": 10, "downloaded": 3}"#;
        let details = parse_details(body).unwrap().unwrap();
        assert!(details.header_loaded);
        assert!(!details.is_fully_downloaded());
    }

    #[test]
    fn test_add_request_body() {
        let request = AddBagRequest::files("ab", "/data", vec![0, 2]);
        let body = serde_json::to_value(&request).unwrap();
        let expected = serde_json::json!({
            "bag_id": "ab",
            "path": "/data",
            "files": [0, 2],
            "download_all": true
        });
        assert_eq!(body, expected);
    }
}
