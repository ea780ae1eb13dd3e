use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use probe_logging::probe_warn;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use url::Url;

use crate::decode::decode_html;
use crate::{FailureKind, FetchError, FetchedBody};

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Invalid `(name, value)` header pair supplied to [`HttpTransport::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidHeader(pub String);

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
}

/// One reqwest-backed transport per backend, carrying that backend's
/// timeouts, redirect policy, size cap and extra headers.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    settings: TransportSettings,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new<'a>(
        settings: TransportSettings,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, InvalidHeader> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| InvalidHeader(name.to_string()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| InvalidHeader(name.to_string()))?;
            map.insert(header_name, header_value);
        }
        Ok(Self {
            settings,
            headers: map,
        })
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// Fresh client per request so `redirects` counts this request's hops only.
    fn build_client(&self, redirects: Arc<AtomicUsize>) -> Result<reqwest::Client, FetchError> {
        let limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let hops = attempt.previous().len();
            redirects.store(hops, Ordering::Relaxed);
            if hops >= limit {
                attempt.error(format!("more than {limit} redirects"))
            } else {
                attempt.follow()
            }
        });

        Ok(reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .default_headers(self.headers.clone())
            .build()?)
    }

    pub async fn get(&self, url: &Url) -> Result<FetchedBody, FetchError> {
        self.send(url, RequestBody::Empty).await
    }

    pub async fn post_json(&self, url: &Url, body: serde_json::Value) -> Result<FetchedBody, FetchError> {
        self.send(url, RequestBody::Json(body)).await
    }

    /// Performs one request and reads the whole body, whatever the status.
    ///
    /// Only transport problems are errors; classifying the status is left to
    /// the caller so that challenge pages served with 403 can still be inspected.
    pub async fn send(&self, url: &Url, body: RequestBody) -> Result<FetchedBody, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme {}", url.scheme()),
            ));
        }
        let redirects = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(Arc::clone(&redirects))?;

        let request = match body {
            RequestBody::Empty => client.get(url.clone()),
            RequestBody::Json(value) => client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(value.to_string()),
        };
        let response = request.send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = self.read_capped(response).await?;

        let decoded = decode_html(&bytes, content_type.as_deref());
        if decoded.lossy {
            probe_warn!(
                "lossy {} decode for {} ({} bytes)",
                decoded.encoding_label,
                final_url,
                bytes.len()
            );
        }

        Ok(FetchedBody {
            status,
            final_url,
            redirect_count: redirects.load(Ordering::Relaxed),
            content_type,
            encoding_label: decoded.encoding_label,
            body: decoded.html,
        })
    }

    /// Streams the body, giving up as soon as it passes `max_bytes`.
    ///
    /// A declared `Content-Length` above the cap is refused before any chunk is read.
    async fn read_capped(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let max_bytes = self.settings.max_bytes;
        let too_large = |actual: u64| {
            FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(actual),
                },
                "response too large",
            )
        };

        if let Some(declared) = response.content_length().filter(|len| *len > max_bytes) {
            return Err(too_large(declared));
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let received = (bytes.len() + chunk.len()) as u64;
            if received > max_bytes {
                return Err(too_large(received));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}
