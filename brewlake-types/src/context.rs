//! Diagnostics handle passed into each operation.
//!
//! Operations never reach for a process-wide logger. Callers build a
//! [`RunContext`] for a run and hand it to every stage; each stage enters its
//! own child span so `tracing` events carry the run and stage labels.

use tracing::Span;
use tracing::span::Entered;

#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    span: Span,
}

impl RunContext {
    /// Context for a named run. Events inside carry `run_id`.
    pub fn new(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let span = tracing::info_span!("brewlake_run", run_id = %run_id);
        Self { run_id, span }
    }

    /// Context that attaches no span, for callers that don't care about run labels.
    pub fn detached() -> Self {
        Self {
            run_id: String::new(),
            span: Span::none(),
        }
    }

    /// Child context for one pipeline stage.
    pub fn stage(&self, stage: &'static str) -> Self {
        let span = tracing::info_span!(parent: &self.span, "stage", stage);
        Self {
            run_id: self.run_id.clone(),
            span,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Enter the context span for the lifetime of the returned guard.
    pub fn enter(&self) -> Entered<'_> {
        self.span.enter()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::detached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_keeps_run_id() {
        let ctx = RunContext::new("silver-2025-09-27");
        let stage = ctx.stage("dedup");
        assert_eq!(stage.run_id(), "silver-2025-09-27");
        let _guard = stage.enter();
        tracing::info!("inside stage");
    }

    #[test]
    fn detached_context_is_usable() {
        let ctx = RunContext::default();
        let _guard = ctx.enter();
        assert_eq!(ctx.run_id(), "");
    }
}
