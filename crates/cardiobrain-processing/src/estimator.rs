//! Estimator capability traits
//!
//! Best-effort feature estimators implement [`Estimator`]. A primary estimator
//! and a simpler fallback are paired with [`WithFallback`], so each feature has a
//! single place where the fallback decision is made and logged.

use cardiobrain_core::CbResult;
use tracing::warn;

/// A named computation from an input to a feature value
pub trait Estimator<I: ?Sized>: Send + Sync {
    type Output;

    /// Estimator name/identifier used in logs and diagnostics
    fn name(&self) -> &'static str;

    /// Run the estimate
    fn estimate(&self, input: &I) -> CbResult<Self::Output>;
}

/// Which estimator produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Primary,
    Fallback,
}

/// Result of a primary/fallback pair, with the primary's failure kept for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate<T> {
    pub value: T,
    pub provenance: Provenance,
    pub primary_error: Option<String>,
}

/// Run `primary`, and `fallback` when it fails
pub struct WithFallback<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> WithFallback<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    /// Run the pair, reporting which estimator succeeded
    pub fn estimate_traced<I>(&self, input: &I) -> CbResult<Estimate<P::Output>>
    where
        I: ?Sized,
        P: Estimator<I>,
        F: Estimator<I, Output = P::Output>,
    {
        match self.primary.estimate(input) {
            Ok(value) => Ok(Estimate {
                value,
                provenance: Provenance::Primary,
                primary_error: None,
            }),
            Err(e) => {
                warn!(
                    "{} failed ({}), falling back to {}",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                let value = self.fallback.estimate(input)?;
                Ok(Estimate {
                    value,
                    provenance: Provenance::Fallback,
                    primary_error: Some(format!("{}: {}", self.primary.name(), e)),
                })
            }
        }
    }
}

impl<I, P, F> Estimator<I> for WithFallback<P, F>
where
    I: ?Sized,
    P: Estimator<I>,
    F: Estimator<I, Output = P::Output>,
{
    type Output = P::Output;

    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn estimate(&self, input: &I) -> CbResult<P::Output> {
        self.estimate_traced(input).map(|e| e.value)
    }
}
