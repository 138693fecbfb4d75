// src/api/client.rs
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::bulk::BulkKind;
use crate::config::{AuthMethod, Config};
use crate::error::ApiError;

/// Counts returned by every `batch_*` endpoint. Absent fields count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkActionResponse {
    pub created: u64,
    pub updated: u64,
    pub removed: u64,
    pub skipped: u64,
    pub errors: Vec<String>,
}

/// Submission seam for bulk flows.
#[allow(async_fn_in_trait)]
pub trait BatchApi {
    async fn submit_batch(
        &self,
        kind: BulkKind,
        payload: &Value,
    ) -> Result<BulkActionResponse, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
    credential: String,
    auth: AuthMethod,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let base = config.api_base_url.trim().trim_end_matches('/').to_string();
        if base.is_empty() {
            return Err(ApiError::MissingBaseUrl);
        }
        Url::parse(&base).map_err(|_| ApiError::InvalidUrl(base.clone()))?;
        if config.api_key.trim().is_empty() {
            return Err(ApiError::MissingCredential);
        }

        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base,
            credential: config.api_key.trim().to_string(),
            auth: config.auth,
        })
    }

    /// Paths are appended verbatim, so a base with a path prefix is kept.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        };
        Url::parse(&joined).map_err(|_| ApiError::InvalidUrl(joined))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.auth {
            AuthMethod::ApiKey => req.header("X-API-Key", &self.credential),
            AuthMethod::Jwt => req.bearer_auth(&self.credential),
        }
    }

    async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await?;
        Err(ApiError::from_status(status.as_u16(), &body))
    }

    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        debug!(%method, %url, "api request");
        let mut req = self.authorize(self.http.request(method, url));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = Self::check(req.send().await?).await?;
        Ok(resp.json::<T>().await?)
    }

    /// Raw bytes of an export endpoint (CSV, JSON or archive). Export
    /// endpoints only accept `X-API-Key`, whatever the configured auth.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_blob(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.url(path)?;
        let req = self.http.get(url).header("X-API-Key", &self.credential);
        let resp = req.send().await?;
        let bytes = Self::check(resp).await?.bytes().await?;
        debug!(bytes = bytes.len(), "blob fetched");
        Ok(bytes.to_vec())
    }
}

impl BatchApi for ApiClient {
    #[instrument(level = "info", skip(self, payload), fields(endpoint = kind.endpoint()))]
    async fn submit_batch(
        &self,
        kind: BulkKind,
        payload: &Value,
    ) -> Result<BulkActionResponse, ApiError> {
        self.send_json(kind.method(), kind.endpoint(), Some(payload)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn config(base: &str, key: &str) -> Config {
        Config {
            api_base_url: base.into(),
            api_key: key.into(),
            ..Config::default()
        }
    }

    /// What the canned server saw: request line, lowercased headers, body.
    struct Captured {
        request_line: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Captured {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Accepts one connection, records the request and answers with
    /// `status` and `body`.
    async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            let (head_end, content_length) = loop {
                let n = stream.read(&mut chunk).await.expect("read request");
                assert!(n > 0, "client closed before sending headers");
                raw.extend_from_slice(&chunk[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&raw[..pos]).to_ascii_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    break (pos, len);
                }
            };
            while raw.len() < head_end + 4 + content_length {
                let n = stream.read(&mut chunk).await.expect("read body");
                assert!(n > 0, "client closed mid-body");
                raw.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            let _ = stream.shutdown().await;

            let head = String::from_utf8_lossy(&raw[..head_end]).into_owned();
            let mut lines = head.split("\r\n");
            let request_line = lines.next().unwrap_or_default().to_string();
            let headers = lines
                .filter_map(|l| l.split_once(':'))
                .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                .collect();
            let body = String::from_utf8_lossy(&raw[head_end + 4..]).into_owned();
            Captured {
                request_line,
                headers,
                body,
            }
        });

        (format!("http://{addr}"), handle)
    }

    fn client_for(base: &str, auth: AuthMethod) -> ApiClient {
        ApiClient::new(&Config {
            auth,
            ..config(base, "k-123")
        })
        .expect("client")
    }

    #[tokio::test]
    async fn batch_create_posts_json_with_api_key() {
        let (base, server) = serve_once(200, r#"{"created": 2, "skipped": 1}"#).await;
        let client = client_for(&base, AuthMethod::ApiKey);
        let payload = json!([{ "fleet_id": "F-1", "name": "North" }, { "fleet_id": "F-1", "name": "South" }]);

        let result = client
            .submit_batch(BulkKind::VehicleGroupsCreate, &payload)
            .await
            .expect("batch accepted");
        let seen = server.await.expect("server task");

        assert_eq!(result.created, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(
            seen.request_line,
            "POST /api/fleet/vehicle_groups/batch_create HTTP/1.1"
        );
        assert_eq!(seen.header("x-api-key"), Some("k-123"));
        assert_eq!(seen.header("authorization"), None);
        assert_eq!(seen.header("content-type"), Some("application/json"));
        let sent: Value = serde_json::from_str(&seen.body).expect("json body");
        assert_eq!(sent, payload);
    }

    #[tokio::test]
    async fn jwt_removal_uses_bearer_and_delete() {
        let (base, server) = serve_once(200, r#"{"removed": 1}"#).await;
        let client = client_for(&base, AuthMethod::Jwt);
        let payload = json!([{ "partner_id": "p-1", "driverProfileId": "d-1" }]);

        let result = client
            .submit_batch(BulkKind::InsuranceMappingsRemove, &payload)
            .await
            .expect("batch accepted");
        let seen = server.await.expect("server task");

        assert_eq!(result.removed, 1);
        assert_eq!(
            seen.request_line,
            "DELETE /api/admin/insurance_partner_mappings/batch_remove HTTP/1.1"
        );
        assert_eq!(seen.header("authorization"), Some("Bearer k-123"));
        assert_eq!(seen.header("x-api-key"), None);
        assert_eq!(serde_json::from_str::<Value>(&seen.body).expect("json"), payload);
    }

    #[tokio::test]
    async fn group_update_uses_put() {
        let (base, server) = serve_once(200, r#"{"updated": 1}"#).await;
        let client = client_for(&base, AuthMethod::ApiKey);

        client
            .submit_batch(BulkKind::VehicleGroupsUpdate, &json!([{ "group_id": "g-1", "name": "A" }]))
            .await
            .expect("batch accepted");
        let seen = server.await.expect("server task");

        assert_eq!(
            seen.request_line,
            "PUT /api/fleet/vehicle_groups/batch_update HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn error_body_becomes_the_message() {
        let (base, server) = serve_once(400, "fleet F-9 does not exist").await;
        let client = client_for(&base, AuthMethod::ApiKey);

        let err = client
            .submit_batch(BulkKind::VehicleGroupsCreate, &json!([]))
            .await
            .unwrap_err();
        server.await.expect("server task");

        assert!(matches!(err, ApiError::Status { status: 400, .. }));
        assert_eq!(err.to_string(), "fleet F-9 does not exist");
    }

    #[tokio::test]
    async fn empty_error_body_reports_the_status() {
        let (base, server) = serve_once(502, "").await;
        let client = client_for(&base, AuthMethod::ApiKey);

        let err = client
            .submit_batch(BulkKind::ApiClientsCreate, &json!([]))
            .await
            .unwrap_err();
        server.await.expect("server task");

        assert_eq!(err.to_string(), "Request failed: 502");
    }

    #[tokio::test]
    async fn error_body_is_kept_verbatim() {
        let (base, server) = serve_once(409, " duplicate name\n").await;
        let client = client_for(&base, AuthMethod::ApiKey);

        let err = client
            .submit_batch(BulkKind::VehicleGroupsCreate, &json!([]))
            .await
            .unwrap_err();
        server.await.expect("server task");

        assert_eq!(err.to_string(), " duplicate name\n");
    }

    #[tokio::test]
    async fn blob_fetch_always_sends_api_key() {
        let (base, server) = serve_once(200, "a,b\n1,2").await;
        let client = client_for(&base, AuthMethod::Jwt);

        let bytes = client
            .fetch_blob("/api/insurance/raw_export?format=csv")
            .await
            .expect("blob");
        let seen = server.await.expect("server task");

        assert_eq!(bytes, b"a,b\n1,2");
        assert_eq!(
            seen.request_line,
            "GET /api/insurance/raw_export?format=csv HTTP/1.1"
        );
        assert_eq!(seen.header("x-api-key"), Some("k-123"));
        assert_eq!(seen.header("authorization"), None);
    }

    #[test]
    fn requires_base_url_and_credential() {
        assert!(matches!(
            ApiClient::new(&config("", "k")),
            Err(ApiError::MissingBaseUrl)
        ));
        assert!(matches!(
            ApiClient::new(&config("https://api.example.test", " ")),
            Err(ApiError::MissingCredential)
        ));
        assert!(matches!(
            ApiClient::new(&config("not a url", "k")),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn paths_append_to_base_prefix() {
        let client = ApiClient::new(&config("https://api.example.test/v2/", "k")).expect("client");
        assert_eq!(
            client.url("/api/fleet/vehicle_groups/batch_create").expect("url").as_str(),
            "https://api.example.test/v2/api/fleet/vehicle_groups/batch_create"
        );
        assert_eq!(
            client.url("api/auth/me").expect("url").as_str(),
            "https://api.example.test/v2/api/auth/me"
        );
    }

    #[test]
    fn bulk_response_defaults_missing_counts() {
        let parsed: BulkActionResponse =
            serde_json::from_str(r#"{"created": 3, "errors": ["dup"]}"#).expect("json");
        assert_eq!(
            parsed,
            BulkActionResponse {
                created: 3,
                errors: vec!["dup".into()],
                ..BulkActionResponse::default()
            }
        );
    }
}
