//! The controller chain and its per-request state machine.

use std::sync::Arc;
use std::time::Instant as StdInstant;

use tokio::time::{timeout_at, Instant};

use crate::config::{AuthzConfig, MatchAction};
use crate::context::{MatchVerdict, RequestContext};
use crate::controllers::{
    AnalysisController, BuildContext, BuildError, ControllerError, ControllerRegistry, MatchController,
};
use crate::engine::decision::{Aggregator, Decision, DecisionPolicy, Outcome};
use crate::observability::metrics;

/// A match controller plus what its match means.
#[derive(Clone)]
struct ConfiguredMatcher {
    controller: Arc<dyn MatchController>,
    action: MatchAction,
}

/// Runs analysis then match controllers for each request and aggregates the verdicts.
///
/// Built once at startup and shared across all in-flight requests.
#[derive(Clone)]
pub struct DecisionEngine {
    analysis: Vec<Arc<dyn AnalysisController>>,
    matchers: Vec<ConfiguredMatcher>,
    policy: DecisionPolicy,
}

impl DecisionEngine {
    /// An engine with no controllers.
    pub fn new(policy: DecisionPolicy) -> Self {
        Self {
            analysis: Vec::new(),
            matchers: Vec::new(),
            policy,
        }
    }

    pub fn with_analysis(mut self, controller: Arc<dyn AnalysisController>) -> Self {
        self.analysis.push(controller);
        self
    }

    pub fn with_matcher(mut self, controller: Arc<dyn MatchController>, action: MatchAction) -> Self {
        self.matchers.push(ConfiguredMatcher { controller, action });
        self
    }

    /// Build every configured controller in order. The first failure aborts.
    pub fn from_config(
        config: &AuthzConfig,
        registry: &ControllerRegistry,
        ctx: &mut BuildContext,
    ) -> Result<Self, BuildError> {
        let mut engine = Self::new(DecisionPolicy::from(&config.decision));
        for controller in &config.analysis {
            engine = engine.with_analysis(registry.build_analysis(controller, ctx)?);
        }
        for controller in &config.matchers {
            engine = engine.with_matcher(registry.build_match(controller, ctx)?, controller.action);
        }

        tracing::info!(
            analysis = engine.analysis.len(),
            matchers = engine.matchers.len(),
            mode = ?engine.policy.mode,
            failure_mode = ?engine.policy.failure_mode,
            "Decision engine ready"
        );
        Ok(engine)
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn analysis_len(&self) -> usize {
        self.analysis.len()
    }

    pub fn matchers_len(&self) -> usize {
        self.matchers.len()
    }

    /// Decide one request.
    ///
    /// Without a deadline on the context, the policy deadline starts now.
    /// Always returns a decision; controller failures are folded in per policy.
    pub async fn decide(&self, ctx: RequestContext) -> Decision {
        let start = StdInstant::now();
        let deadline = ctx
            .deadline()
            .unwrap_or_else(|| Instant::now() + self.policy.deadline);
        let mut ctx = ctx.with_deadline(deadline);

        self.analyze(&mut ctx, deadline).await;
        let (outcome, verdicts) = self.evaluate(&ctx, deadline).await;

        metrics::record_decision(outcome.allowed, outcome.code.as_str(), start);
        tracing::info!(
            request_id = %ctx.request_id(),
            source = %ctx.source_address(),
            allowed = outcome.allowed,
            code = %outcome.code,
            verdicts = verdicts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Decision"
        );

        outcome.into_decision(ctx.into_injected_headers(), verdicts)
    }

    /// Analyzing: every controller runs; failures leave the context as it was.
    async fn analyze(&self, ctx: &mut RequestContext, deadline: Instant) {
        for controller in &self.analysis {
            let result = match timeout_at(deadline, controller.analyze(ctx)).await {
                Ok(result) => result,
                Err(_) => Err(ControllerError::DeadlineExceeded),
            };

            match result {
                Ok(report) => ctx.merge_report(report),
                Err(e) => {
                    metrics::record_controller_error(controller.name(), e.kind());
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        controller = %controller.name(),
                        error = %e,
                        "Analysis failed, continuing without enrichment"
                    );
                }
            }
        }
    }

    /// Matching: stops at the first decisive verdict or the first hard error.
    async fn evaluate(&self, ctx: &RequestContext, deadline: Instant) -> (Outcome, Vec<MatchVerdict>) {
        let mut aggregator = Aggregator::new(self.policy);
        let mut verdicts: Vec<MatchVerdict> = Vec::with_capacity(self.matchers.len());

        for matcher in &self.matchers {
            let controller = &matcher.controller;
            let result = match timeout_at(deadline, controller.evaluate(ctx, &verdicts)).await {
                Ok(result) => result,
                Err(_) => Err(ControllerError::DeadlineExceeded),
            };

            let verdict = match result {
                Ok(verdict) => verdict,
                Err(e) => {
                    metrics::record_controller_error(controller.name(), e.kind());
                    tracing::error!(
                        request_id = %ctx.request_id(),
                        controller = %controller.name(),
                        error = %e,
                        failure_mode = ?self.policy.failure_mode,
                        "Match controller failed, aborting evaluation"
                    );
                    return (self.policy.on_failure(controller.name(), &e), verdicts);
                }
            };

            tracing::debug!(
                request_id = %ctx.request_id(),
                controller = %controller.name(),
                is_match = verdict.is_match,
                description = %verdict.description,
                "Verdict"
            );

            let decided = aggregator.observe(&verdict, matcher.action);
            verdicts.push(verdict);
            if let Some(outcome) = decided {
                return (outcome, verdicts);
            }
        }

        (aggregator.finish(), verdicts)
    }
}
