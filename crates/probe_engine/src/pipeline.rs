use probe_core::{ContentValidator, ErrorKind, PipelineOutcome, TargetIdentifier, ValidationVerdict};
use probe_logging::{probe_info, probe_warn};

use crate::config::{ConfigError, PipelineConfig};
use crate::extract::ExtractionChain;
use crate::retrieval::RetrievalChain;

/// Retrieval chain followed by extraction chain.
///
/// [`Pipeline::run`] never fails: every problem becomes an [`ErrorKind`] on
/// the returned outcome. Only construction can fail, and only for
/// configuration that no request could ever succeed with.
pub struct Pipeline {
    retrieval: RetrievalChain,
    extraction: ExtractionChain,
}

impl Pipeline {
    pub fn new(retrieval: RetrievalChain, extraction: ExtractionChain) -> Self {
        Self {
            retrieval,
            extraction,
        }
    }

    /// Builds a pipeline, resolving `credential_env` from the process environment.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Self::from_config_with(config, &|key: &str| std::env::var(key).ok())
    }

    pub fn from_config_with(
        config: &PipelineConfig,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let retrieval = RetrievalChain::new(
            config.target_base()?,
            config.build_backends(lookup)?,
            ContentValidator::new(&config.validation),
        )?;
        let extraction = ExtractionChain::from_settings(&config.extraction)?;
        Ok(Self::new(retrieval, extraction))
    }

    pub fn retrieval(&self) -> &RetrievalChain {
        &self.retrieval
    }

    pub fn extraction(&self) -> &ExtractionChain {
        &self.extraction
    }

    pub async fn run(&self, raw_identifier: &str) -> PipelineOutcome {
        let target = match TargetIdentifier::parse(raw_identifier) {
            Ok(target) => target,
            Err(err) => {
                probe_warn!("rejecting identifier {:?}: {}", raw_identifier, err);
                return PipelineOutcome::not_found(
                    raw_identifier.trim(),
                    ErrorKind::InvalidIdentifier,
                    Vec::new(),
                    Vec::new(),
                );
            }
        };

        let retrieval = self.retrieval.retrieve(&target).await;
        let backend = retrieval.usable_backend().map(str::to_string);
        let misconfigured = retrieval.all_misconfigured();
        let (body, backend) = match (retrieval.verdict, backend) {
            (ValidationVerdict::Usable(body), Some(backend)) => (body, backend),
            (verdict, _) => {
                let kind = if misconfigured {
                    ErrorKind::BackendMisconfigured
                } else {
                    ErrorKind::RetrievalExhausted
                };
                probe_warn!("{}: {} (last verdict {:?})", target, kind, verdict.summary());
                return PipelineOutcome::not_found(
                    target.as_str(),
                    kind,
                    retrieval.trail,
                    Vec::new(),
                );
            }
        };

        let extraction = self.extraction.extract(&body);
        let strategy = extraction.winning_strategy().map(str::to_string);
        match (extraction.count, strategy) {
            (Some(count), Some(strategy)) => {
                probe_info!("{}: {} comments via {}:{}", target, count, backend, strategy);
                PipelineOutcome::found(
                    target.as_str(),
                    count,
                    &backend,
                    &strategy,
                    retrieval.trail,
                    extraction.trail,
                )
            }
            _ => {
                probe_warn!("{}: usable page from {} but no count found", target, backend);
                PipelineOutcome::not_found(
                    target.as_str(),
                    ErrorKind::ExtractionNotFound,
                    retrieval.trail,
                    extraction.trail,
                )
            }
        }
    }
}
