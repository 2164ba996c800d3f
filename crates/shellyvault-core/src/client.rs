//! Transport client for the Shelly Gen2+ `/rpc/` surface.
//!
//! One [`ShellyClient`] is constructed per call group (one sweep, one
//! restore) and dropped on exit, releasing its connection pool on every
//! path. Each operation is a single HTTP call bounded by a fixed
//! timeout; the only retry is the single digest round trip on a 401
//! challenge.

use crate::digest::DigestAuth;
use crate::error::{VaultError, VaultResult};
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shellyvault_types::{DeviceInfo, ScriptCode, ScriptList};
use std::time::Duration;
use url::Url;

/// Fixed username for Shelly device authentication.
pub const SHELLY_USERNAME: &str = "admin";

/// Every RPC call is bounded by this timeout; exceeding it surfaces as a
/// transport failure rather than a hang.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Short-lived HTTP client bound to one device endpoint.
pub struct ShellyClient {
    client: Client,
    base_url: Url,
    auth: Option<DigestAuth>,
}

impl ShellyClient {
    /// Create a client for the given endpoint. When a non-empty password
    /// is supplied, digest authentication with the fixed `admin` username
    /// is engaged automatically on a 401 challenge.
    pub fn new(endpoint: &str, password: Option<&str>) -> VaultResult<Self> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| VaultError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let auth = match password {
            Some(password) if !password.is_empty() => {
                Some(DigestAuth::new(SHELLY_USERNAME, password))
            }
            _ => None,
        };
        Ok(Self { client, base_url, auth })
    }

    /// GET `/rpc/Shelly.GetDeviceInfo`.
    pub async fn get_device_info(&mut self) -> VaultResult<DeviceInfo> {
        self.call_json(Method::GET, "Shelly.GetDeviceInfo", &[], None).await
    }

    /// GET `/rpc/Shelly.GetStatus`.
    pub async fn get_status(&mut self) -> VaultResult<Value> {
        self.call_json(Method::GET, "Shelly.GetStatus", &[], None).await
    }

    /// GET `/rpc/Script.List`. Script code is omitted from the listing.
    pub async fn list_scripts(&mut self) -> VaultResult<ScriptList> {
        self.call_json(Method::GET, "Script.List", &[], None).await
    }

    /// GET `/rpc/Script.GetCode?id=N`.
    pub async fn get_script_code(&mut self, id: u32) -> VaultResult<ScriptCode> {
        self.call_json(Method::GET, "Script.GetCode", &[("id", id.to_string())], None).await
    }

    /// POST `/rpc/Script.PutCode` with `{id, code}`.
    pub async fn put_script_code(&mut self, id: u32, code: &str) -> VaultResult<Value> {
        let body = serde_json::json!({ "id": id, "code": code });
        self.call_json(Method::POST, "Script.PutCode", &[], Some(&body)).await
    }

    /// GET `/rpc/Shelly.GetConfig`: the full device configuration blob.
    pub async fn get_config(&mut self) -> VaultResult<Value> {
        self.call_json(Method::GET, "Shelly.GetConfig", &[], None).await
    }

    /// POST `/rpc/Shelly.SetConfig` with the given configuration blob.
    pub async fn set_config(&mut self, config: &Value) -> VaultResult<Value> {
        self.call_json(Method::POST, "Shelly.SetConfig", &[], Some(config)).await
    }

    async fn call_json<T: DeserializeOwned>(
        &mut self,
        method: Method,
        rpc: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> VaultResult<T> {
        let resp = self.call(method, rpc, query, body).await?;
        resp.json().await.map_err(|e| self.network_error(rpc, e))
    }

    /// Perform one RPC call, with at most one digest retry on 401.
    async fn call(
        &mut self,
        method: Method,
        rpc: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> VaultResult<Response> {
        let mut url = self
            .base_url
            .join(&format!("/rpc/{}", rpc))
            .map_err(|e| VaultError::InvalidUrl(e.to_string()))?;
        for (key, value) in query {
            url.query_pairs_mut().append_pair(key, value);
        }
        let uri = request_uri(&url);

        let mut request = self.build_request(method.clone(), &url, body);
        if let Some(auth) = &mut self.auth {
            // Pre-emptive header when a challenge from an earlier call is cached.
            if let Some(header) = auth.authorization_header(method.as_str(), &uri) {
                request = request.header(AUTHORIZATION, header);
            }
        }

        let mut resp = request.send().await.map_err(|e| self.network_error(rpc, e))?;

        if resp.status() == StatusCode::UNAUTHORIZED && self.auth.is_some() {
            let www_authenticate = resp
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let recorded = self
                .auth
                .as_mut()
                .is_some_and(|auth| auth.record_challenge(401, &www_authenticate));
            if recorded {
                tracing::debug!("401 challenge from {}, retrying with digest header", rpc);
                let mut retry = self.build_request(method.clone(), &url, body);
                if let Some(header) = self
                    .auth
                    .as_mut()
                    .and_then(|auth| auth.authorization_header(method.as_str(), &uri))
                {
                    retry = retry.header(AUTHORIZATION, header);
                }
                resp = retry.send().await.map_err(|e| self.network_error(rpc, e))?;
            }
        }

        let status = resp.status();
        if !status.is_success() {
            return Err(VaultError::Status {
                endpoint: self.base_url.to_string(),
                method: rpc.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    fn build_request(&self, method: Method, url: &Url, body: Option<&Value>) -> RequestBuilder {
        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }

    fn network_error(&self, rpc: &str, source: reqwest::Error) -> VaultError {
        VaultError::Network {
            endpoint: self.base_url.to_string(),
            method: rpc.to_string(),
            source,
        }
    }
}

/// Request-URI (path plus query) as it enters the digest HA2 computation.
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
