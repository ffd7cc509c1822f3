//! Aggregation of per-request results into the run verdict

use crate::error::{Error, Result};
use promoter_core::{
    CapturedRequests, PromotionRequest, RequestError, RequestResult, RequestStatus,
};
use std::fmt;
use tracing::{error, info};

/// Final outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Failed { errors: usize, not_attempted: usize },
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Ok => write!(f, "ok"),
            Verdict::Failed {
                errors,
                not_attempted: 0,
            } => write!(f, "failed with {} errors", errors),
            Verdict::Failed {
                errors,
                not_attempted,
            } => write!(
                f,
                "failed with {} errors, {} requests not attempted",
                errors, not_attempted
            ),
        }
    }
}

/// Every result of a run, plus the captured requests in dry-run mode
#[derive(Debug)]
pub struct Report {
    results: Vec<RequestResult>,
    captured: Option<CapturedRequests>,
}

impl Report {
    pub fn new(results: Vec<RequestResult>, captured: Option<CapturedRequests>) -> Self {
        Self { results, captured }
    }

    /// Results in the order they were received
    pub fn results(&self) -> &[RequestResult] {
        &self.results
    }

    /// Captured requests; only present for dry runs
    pub fn captured(&self) -> Option<&CapturedRequests> {
        self.captured.as_ref()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// All errors, each with the request it belongs to
    pub fn errors(&self) -> impl Iterator<Item = (&PromotionRequest, &RequestError)> {
        self.results
            .iter()
            .flat_map(|r| r.errors.iter().map(move |e| (&r.request, e)))
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().map(|r| r.errors.len()).sum()
    }

    /// Requests left unexecuted because the run was cancelled
    pub fn not_attempted(&self) -> impl Iterator<Item = &PromotionRequest> {
        self.results
            .iter()
            .filter(|r| r.status == RequestStatus::NotAttempted)
            .map(|r| &r.request)
    }

    pub fn verdict(&self) -> Verdict {
        let errors = self.error_count();
        let not_attempted = self.not_attempted().count();
        if errors == 0 && not_attempted == 0 {
            Verdict::Ok
        } else {
            Verdict::Failed {
                errors,
                not_attempted,
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.verdict() == Verdict::Ok
    }

    /// Turn a failed verdict into an error
    pub fn ensure_success(&self) -> Result<()> {
        match self.verdict() {
            Verdict::Ok => Ok(()),
            Verdict::Failed { errors, .. } if errors > 0 => Err(Error::ExecutionFailed {
                failed: self
                    .results
                    .iter()
                    .filter(|r| !r.errors.is_empty())
                    .count(),
                total: self.total(),
            }),
            Verdict::Failed { not_attempted, .. } => Err(Error::NotAttempted {
                count: not_attempted,
            }),
        }
    }

    /// Log the verdict and every error
    pub fn log(&self) {
        for (_, err) in self.errors() {
            error!("{}", err);
        }
        for request in self.not_attempted() {
            error!("Not attempted: {}", request);
        }
        match self.verdict() {
            Verdict::Ok => info!("Promotion finished: {} requests ok", self.total()),
            verdict => error!("Promotion {}", verdict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use promoter_core::{Digest, ImageName, RegistryNames, Tag, TagOp};

    fn request(tag: &str) -> PromotionRequest {
        PromotionRequest {
            tag_op: TagOp::Add,
            registries: RegistryNames::new("s", "d"),
            image_name: ImageName::from("a"),
            digest: Digest::from("sha256:x"),
            digest_old: None,
            tag: Tag::from(tag),
        }
    }

    #[test]
    fn test_all_ok() {
        let report = Report::new(
            vec![
                RequestResult::executed(request("v1")),
                RequestResult::executed(request("v2")),
            ],
            None,
        );
        assert_eq!(report.verdict(), Verdict::Ok);
        assert!(report.ensure_success().is_ok());
        assert!(report.captured().is_none());
    }

    #[test]
    fn test_errors_are_enumerated_with_their_request() {
        let report = Report::new(
            vec![
                RequestResult::executed(request("v1")),
                RequestResult::failed(request("v2"), anyhow!("permission denied")),
            ],
            None,
        );
        assert_eq!(
            report.verdict(),
            Verdict::Failed {
                errors: 1,
                not_attempted: 0
            }
        );

        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0.tag, Tag::from("v2"));
        assert!(errors[0].1.to_string().contains("permission denied"));

        assert!(matches!(
            report.ensure_success(),
            Err(Error::ExecutionFailed {
                failed: 1,
                total: 2
            })
        ));
    }

    #[test]
    fn test_not_attempted_fails_the_run() {
        let report = Report::new(
            vec![
                RequestResult::executed(request("v1")),
                RequestResult::not_attempted(request("v2")),
            ],
            None,
        );
        assert_eq!(report.verdict().to_string(), "failed with 0 errors, 1 requests not attempted");
        assert!(matches!(
            report.ensure_success(),
            Err(Error::NotAttempted { count: 1 })
        ));
    }
}
