use std::sync::Arc;
use std::time::{Duration, Instant};

use probe_core::{ContentValidator, RetrievalAttempt, TargetBase, TargetIdentifier, ValidationVerdict};
use probe_logging::{probe_debug, probe_info, probe_warn};

use crate::backend::RetrievalBackend;
use crate::config::ConfigError;
use crate::{FailureKind, FetchError};

/// Verdict and trail of one pass over the backend list.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub verdict: ValidationVerdict,
    pub trail: Vec<RetrievalAttempt>,
    skipped: usize,
}

impl Retrieval {
    /// Name of the backend whose body was accepted.
    pub fn usable_backend(&self) -> Option<&str> {
        if !self.verdict.is_usable() {
            return None;
        }
        self.trail.last().map(|attempt| attempt.backend_name.as_str())
    }

    /// True when nothing was actually requested because every backend lacked
    /// configuration.
    pub fn all_misconfigured(&self) -> bool {
        !self.trail.is_empty() && self.skipped == self.trail.len()
    }
}

/// Backends tried strictly in order, one at a time.
///
/// Later backends are usually paid or rate limited, so they are only reached
/// when every earlier backend failed to produce a usable body.
pub struct RetrievalChain {
    target_base: TargetBase,
    backends: Vec<Arc<dyn RetrievalBackend>>,
    validator: ContentValidator,
}

impl RetrievalChain {
    pub fn new(
        target_base: TargetBase,
        backends: Vec<Arc<dyn RetrievalBackend>>,
        validator: ContentValidator,
    ) -> Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        Ok(Self {
            target_base,
            backends,
            validator,
        })
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|backend| backend.name()).collect()
    }

    pub async fn retrieve(&self, target: &TargetIdentifier) -> Retrieval {
        let mut trail = Vec::with_capacity(self.backends.len());
        let mut skipped = 0;
        let mut best: Option<ValidationVerdict> = None;

        let target_url = target.target_url(&self.target_base);

        for backend in &self.backends {
            let described = backend.describe_request(&target_url);

            if let Some(reason) = backend.misconfiguration() {
                probe_warn!("skipping backend {}: {}", backend.name(), reason);
                let err = FetchError::new(FailureKind::Misconfigured, reason);
                trail.push(RetrievalAttempt::failed(
                    backend.name(),
                    described,
                    None,
                    err.to_string(),
                    Duration::ZERO,
                ));
                skipped += 1;
                continue;
            }

            probe_debug!("backend {} requesting {}", backend.name(), described);
            let started = Instant::now();
            let result = tokio::time::timeout(backend.timeout(), backend.retrieve(&target_url))
                .await
                .unwrap_or_else(|_| {
                    Err(FetchError::new(
                        FailureKind::Timeout,
                        format!("no response within {:?}", backend.timeout()),
                    ))
                });
            let elapsed = started.elapsed();

            let fetched = match result {
                Ok(fetched) => fetched,
                Err(err) => {
                    probe_warn!("backend {} failed: {}", backend.name(), err);
                    trail.push(RetrievalAttempt::failed(
                        backend.name(),
                        described,
                        None,
                        err.to_string(),
                        elapsed,
                    ));
                    best = Some(merge(best, ValidationVerdict::Empty));
                    continue;
                }
            };

            let acceptable = fetched.has_acceptable_status();
            let status = fetched.status;
            let verdict = self.validator.validate(Some(&fetched.body));
            let mut attempt =
                RetrievalAttempt::responded(backend.name(), described, status, fetched.body, elapsed)
                    .with_verdict(&verdict);
            if !acceptable {
                attempt = attempt.with_failure(FailureKind::HttpStatus(status).to_string());
            }
            trail.push(attempt);

            match verdict {
                ValidationVerdict::Usable(body) if acceptable => {
                    probe_info!(
                        "backend {} returned usable content ({} bytes, status {})",
                        backend.name(),
                        body.len(),
                        status
                    );
                    return Retrieval {
                        verdict: ValidationVerdict::Usable(body),
                        trail,
                        skipped,
                    };
                }
                // An error page that looks like content is still an error page.
                ValidationVerdict::Usable(_) => {
                    probe_warn!("backend {} answered with status {}", backend.name(), status);
                    best = Some(merge(best, ValidationVerdict::Empty));
                }
                other => {
                    probe_warn!(
                        "backend {} body rejected: {:?} (status {})",
                        backend.name(),
                        other,
                        status
                    );
                    best = Some(merge(best, other));
                }
            }
        }

        probe_warn!(
            "all {} backends exhausted for {} ({} skipped)",
            self.backends.len(),
            target,
            skipped
        );
        Retrieval {
            verdict: best.unwrap_or(ValidationVerdict::Empty),
            trail,
            skipped,
        }
    }
}

fn merge(best: Option<ValidationVerdict>, next: ValidationVerdict) -> ValidationVerdict {
    match best {
        Some(current) => current.most_actionable(next),
        None => next,
    }
}
