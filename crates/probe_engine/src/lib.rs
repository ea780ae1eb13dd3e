//! Probe engine: retrieval backends, extraction strategies and the pipeline
//! that chains them.
mod backend;
mod config;
mod decode;
mod extract;
mod fetch;
mod pipeline;
mod retrieval;
mod types;

pub use backend::{
    DirectBackend, ForwardingProxyBackend, RenderServiceBackend, RetrievalBackend,
    ServiceEndpoint, REDACTED,
};
pub use config::{BackendConfig, BackendKind, ConfigError, PipelineConfig};
pub use decode::{decode_html, DecodedHtml};
pub use extract::{
    ElementCountStrategy, Extraction, ExtractionChain, ExtractionInput, ExtractionSettings,
    ExtractionSetupError, ExtractionStrategy, FlexiblePatternStrategy, RawPatternStrategy,
    StructuredSelectorStrategy,
};
pub use fetch::{HttpTransport, InvalidHeader, RequestBody, TransportSettings};
pub use pipeline::Pipeline;
pub use retrieval::{Retrieval, RetrievalChain};
pub use types::{FailureKind, FetchError, FetchedBody};
