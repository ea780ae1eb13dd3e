//! Retrieval backends.
//!
//! A backend only decides *how* the target page is requested: which headers
//! are sent, whether a forwarding proxy or rendering service sits in between,
//! and how long to wait. Validation and extraction never see which backend
//! produced a body.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::fetch::HttpTransport;
use crate::{FailureKind, FetchError, FetchedBody};

/// Placeholder written over credentials before a URL reaches the trail or the log.
pub const REDACTED: &str = "REDACTED";

#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Upper bound for one attempt, enforced by the retrieval chain.
    fn timeout(&self) -> Duration;

    /// Reason this backend cannot run, e.g. a missing API key.
    ///
    /// A misconfigured backend is skipped without being called.
    fn misconfiguration(&self) -> Option<String> {
        None
    }

    /// The request URL as it should appear on the trail, with credentials redacted.
    fn describe_request(&self, target: &Url) -> String;

    async fn retrieve(&self, target: &Url) -> Result<FetchedBody, FetchError>;
}

/// Plain GET of the target page with browser-like headers.
pub struct DirectBackend {
    name: String,
    transport: HttpTransport,
}

impl DirectBackend {
    pub fn new(name: impl Into<String>, transport: HttpTransport) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }
}

#[async_trait]
impl RetrievalBackend for DirectBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.transport.settings().request_timeout
    }

    fn describe_request(&self, target: &Url) -> String {
        target.to_string()
    }

    async fn retrieve(&self, target: &Url) -> Result<FetchedBody, FetchError> {
        self.transport.get(target).await
    }
}

/// Shared shape of the paid backends: an endpoint, a credential and opaque
/// pass-through parameters.
#[derive(Debug, Clone, Default)]
pub struct ServiceEndpoint {
    pub endpoint: Option<Url>,
    pub credential: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl ServiceEndpoint {
    fn misconfiguration(&self) -> Option<String> {
        if self.endpoint.is_none() {
            return Some("missing endpoint".to_string());
        }
        match self.credential.as_deref().map(str::trim) {
            None | Some("") => Some("missing credential".to_string()),
            Some(_) => None,
        }
    }

    fn parts(&self) -> Result<(&Url, &str), FetchError> {
        match (&self.endpoint, self.credential.as_deref()) {
            (Some(endpoint), Some(credential)) if !credential.trim().is_empty() => {
                Ok((endpoint, credential))
            }
            _ => Err(FetchError::new(
                FailureKind::Misconfigured,
                self.misconfiguration().unwrap_or_default(),
            )),
        }
    }
}

/// GET through a forwarding proxy that fetches the target on our behalf
/// (`<endpoint>?api_key=<key>&url=<target>&<params>`).
pub struct ForwardingProxyBackend {
    name: String,
    service: ServiceEndpoint,
    transport: HttpTransport,
}

impl ForwardingProxyBackend {
    pub const CREDENTIAL_PARAM: &'static str = "api_key";

    pub fn new(name: impl Into<String>, service: ServiceEndpoint, transport: HttpTransport) -> Self {
        Self {
            name: name.into(),
            service,
            transport,
        }
    }

    fn request_url(&self, endpoint: &Url, credential: &str, target: &Url) -> Url {
        let mut url = endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(Self::CREDENTIAL_PARAM, credential);
            query.append_pair("url", target.as_str());
            for (key, value) in &self.service.params {
                query.append_pair(key, value);
            }
        }
        url
    }
}

#[async_trait]
impl RetrievalBackend for ForwardingProxyBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.transport.settings().request_timeout
    }

    fn misconfiguration(&self) -> Option<String> {
        self.service.misconfiguration()
    }

    fn describe_request(&self, target: &Url) -> String {
        match &self.service.endpoint {
            Some(endpoint) => self.request_url(endpoint, REDACTED, target).to_string(),
            None => target.to_string(),
        }
    }

    async fn retrieve(&self, target: &Url) -> Result<FetchedBody, FetchError> {
        let (endpoint, credential) = self.service.parts()?;
        let url = self.request_url(endpoint, credential, target);
        self.transport.get(&url).await
    }
}

/// POST to a headless-browser rendering service that returns the rendered
/// DOM (`<endpoint>/content?token=<key>` with `{"url": ..}` as JSON).
pub struct RenderServiceBackend {
    name: String,
    service: ServiceEndpoint,
    transport: HttpTransport,
}

impl RenderServiceBackend {
    pub const CREDENTIAL_PARAM: &'static str = "token";

    pub fn new(name: impl Into<String>, service: ServiceEndpoint, transport: HttpTransport) -> Self {
        Self {
            name: name.into(),
            service,
            transport,
        }
    }

    fn request_url(&self, endpoint: &Url, credential: &str) -> Url {
        let mut url = endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("content");
        }
        url.query_pairs_mut()
            .append_pair(Self::CREDENTIAL_PARAM, credential);
        url
    }

    /// Parameter values that parse as JSON (numbers, booleans, objects) are
    /// sent typed; everything else is sent as a string.
    fn request_body(&self, target: &Url) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        for (key, value) in &self.service.params {
            let typed = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
            body.insert(key.clone(), typed);
        }
        body.insert(
            "url".to_string(),
            serde_json::Value::String(target.to_string()),
        );
        serde_json::Value::Object(body)
    }
}

#[async_trait]
impl RetrievalBackend for RenderServiceBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.transport.settings().request_timeout
    }

    fn misconfiguration(&self) -> Option<String> {
        self.service.misconfiguration()
    }

    fn describe_request(&self, target: &Url) -> String {
        match &self.service.endpoint {
            Some(endpoint) => format!("{} <- {}", self.request_url(endpoint, REDACTED), target),
            None => target.to_string(),
        }
    }

    async fn retrieve(&self, target: &Url) -> Result<FetchedBody, FetchError> {
        let (endpoint, credential) = self.service.parts()?;
        let url = self.request_url(endpoint, credential);
        self.transport.post_json(&url, self.request_body(target)).await
    }
}
