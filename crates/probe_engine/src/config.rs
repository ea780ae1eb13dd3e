use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use probe_core::{TargetBase, ValidationSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::backend::{
    DirectBackend, ForwardingProxyBackend, RenderServiceBackend, RetrievalBackend,
    ServiceEndpoint,
};
use crate::extract::{ExtractionSettings, ExtractionSetupError};
use crate::fetch::{HttpTransport, TransportSettings};

const BROWSER_HEADERS: [(&str, &str); 4] = [
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("accept-language", "ar,en-US;q=0.8,en;q=0.6"),
    ("cache-control", "no-cache"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no retrieval backends configured")]
    NoBackends,
    #[error("backend name {0:?} is used more than once")]
    DuplicateBackend(String),
    #[error("invalid target base url {url:?}: {message}")]
    InvalidTargetBase { url: String, message: String },
    #[error("backend {backend}: invalid endpoint {endpoint:?}: {message}")]
    InvalidEndpoint {
        backend: String,
        endpoint: String,
        message: String,
    },
    #[error("backend {backend}: invalid header {header:?}")]
    InvalidHeader { backend: String, header: String },
    #[error(transparent)]
    Extraction(#[from] ExtractionSetupError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    Direct,
    ForwardingProxy,
    RenderService,
}

impl BackendKind {
    fn default_timeout(self) -> Duration {
        match self {
            BackendKind::Direct => Duration::from_secs(15),
            BackendKind::ForwardingProxy | BackendKind::RenderService => Duration::from_secs(60),
        }
    }
}

/// One entry of the backend priority list.
///
/// `credential` is never written back out; prefer `credential_env` so keys
/// stay out of config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub kind: BackendKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing)]
    pub credential: Option<String>,
    #[serde(default)]
    pub credential_env: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl BackendConfig {
    pub fn direct(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BackendKind::Direct,
            endpoint: None,
            credential: None,
            credential_env: None,
            timeout_ms: None,
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.kind.default_timeout())
    }

    /// Inline credential first, then the named environment variable.
    pub fn resolve_credential(&self, lookup: &dyn Fn(&str) -> Option<String>) -> Option<String> {
        self.credential
            .clone()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.credential_env.as_deref().and_then(lookup))
            .filter(|value| !value.trim().is_empty())
    }

    fn build(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Arc<dyn RetrievalBackend>, ConfigError> {
        let settings = TransportSettings {
            request_timeout: self.timeout(),
            ..TransportSettings::default()
        };
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        if self.kind == BackendKind::Direct {
            for (name, value) in BROWSER_HEADERS {
                headers.insert(name.to_string(), value.to_string());
            }
        }
        for (name, value) in &self.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }
        let transport = HttpTransport::new(
            settings,
            headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .map_err(|err| ConfigError::InvalidHeader {
            backend: self.name.clone(),
            header: err.0,
        })?;

        let backend: Arc<dyn RetrievalBackend> = match self.kind {
            BackendKind::Direct => Arc::new(DirectBackend::new(&self.name, transport)),
            BackendKind::ForwardingProxy => Arc::new(ForwardingProxyBackend::new(
                &self.name,
                self.service(lookup)?,
                transport,
            )),
            BackendKind::RenderService => Arc::new(RenderServiceBackend::new(
                &self.name,
                self.service(lookup)?,
                transport,
            )),
        };
        Ok(backend)
    }

    fn service(&self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<ServiceEndpoint, ConfigError> {
        let endpoint = match self.endpoint.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(Url::parse(raw).map_err(|err| ConfigError::InvalidEndpoint {
                backend: self.name.clone(),
                endpoint: raw.to_string(),
                message: err.to_string(),
            })?),
        };
        Ok(ServiceEndpoint {
            endpoint,
            credential: self.resolve_credential(lookup),
            params: self.params.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Page URL prefix; the identifier is appended as one path segment.
    pub target_base_url: String,
    /// Backends in priority order.
    pub backends: Vec<BackendConfig>,
    pub validation: ValidationSettings,
    pub extraction: ExtractionSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut scraperapi = BackendConfig {
            kind: BackendKind::ForwardingProxy,
            endpoint: Some("https://api.scraperapi.com/".to_string()),
            credential_env: Some("SCRAPERAPI_KEY".to_string()),
            ..BackendConfig::direct("scraperapi")
        };
        scraperapi.params.insert("render".into(), "true".into());
        scraperapi.params.insert("country_code".into(), "us".into());

        let mut browserless = BackendConfig {
            kind: BackendKind::RenderService,
            endpoint: Some("https://chrome.browserless.io".to_string()),
            credential_env: Some("BROWSERLESS_TOKEN".to_string()),
            ..BackendConfig::direct("browserless")
        };
        browserless
            .params
            .insert("waitForTimeout".into(), "3000".into());

        Self {
            target_base_url: "https://khamsat.com/community/requests/".to_string(),
            backends: vec![BackendConfig::direct("direct"), scraperapi, browserless],
            validation: ValidationSettings::default(),
            extraction: ExtractionSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn target_base(&self) -> Result<TargetBase, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidTargetBase {
            url: self.target_base_url.clone(),
            message,
        };
        let url = Url::parse(self.target_base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) url with a path".to_string()));
        }
        TargetBase::new(url).ok_or_else(|| invalid("url cannot carry a path".to_string()))
    }

    /// Builds the backend list in priority order.
    ///
    /// Backends lacking a credential are still built; the retrieval chain
    /// records them as skipped at run time.
    pub fn build_backends(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Vec<Arc<dyn RetrievalBackend>>, ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        let mut seen = HashSet::new();
        self.backends
            .iter()
            .map(|backend| {
                if !seen.insert(backend.name.as_str()) {
                    return Err(ConfigError::DuplicateBackend(backend.name.clone()));
                }
                backend.build(lookup)
            })
            .collect()
    }
}
