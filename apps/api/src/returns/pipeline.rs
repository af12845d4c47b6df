//! Returns pipeline: orchestrates extraction → decision → reply for one email.
//!
//! Flow: render stage template → one `TextGenerator` call → parse against the stage
//! schema → feed validated fields into the next stage.
//!
//! The run is an explicit state machine (`RunState`): Pending → Extracted → Decided →
//! Completed. Every failure aborts the run at the stage where it happened and is
//! reported as `PipelineError { stage, .. }`. Stages after the failed one never run
//! and no partial case is returned.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::llm_client::prompts::{NO_INVENTION_INSTRUCTION, STRUCTURED_OUTPUT_SYSTEM};
use crate::llm_client::{LlmError, TextGenerator};
use crate::prompt::{PromptTemplate, TemplateError, Variables};
use crate::returns::policy::DEFAULT_RETURN_POLICY;
use crate::returns::prompts::{DECISION_TEMPLATE, EXTRACTION_TEMPLATE, REPLY_SYSTEM, REPLY_TEMPLATE};
use crate::returns::schemas::{
    decision_schema, extraction_schema, ACCEPT_REASON, ACCEPT_REASON_DETAIL, EMAIL_NAME,
    ISSUE_SUMMARY, ORDER_NUMBER, PURCHASE_DATE,
};
use crate::schema::{instructions_for, parse, ParseError, ParsedResult, SchemaError, SchemaSet, UNKNOWN};

pub const DEFAULT_COMPANY_NAME: &str = "Intergalactic Industrial Components S.A.";

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Decision,
    Reply,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Decision => "decision",
            Self::Reply => "reply",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong inside a stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Generation service error: {0}")]
    Generation(#[from] LlmError),
}

/// Terminal failure of a run: the stage it aborted in and why.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

/// Configuration mistakes caught while building the pipeline, before any run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid stage schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid stage template: {0}")]
    Template(#[from] TemplateError),
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Settings fixed for the lifetime of a pipeline. Passed in at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub company_name: String,
    pub policy: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            policy: DEFAULT_RETURN_POLICY.to_string(),
        }
    }
}

/// Stage 1 output. Absent facts hold the `Unknown` marker, exactly as generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseFacts {
    pub email_name: String,
    pub order_number: String,
    pub purchase_date: String,
    pub issue_summary: String,
}

impl TryFrom<&ParsedResult> for CaseFacts {
    type Error = ParseError;

    fn try_from(parsed: &ParsedResult) -> Result<Self, Self::Error> {
        Ok(Self {
            email_name: parsed.require(EMAIL_NAME)?.to_string(),
            order_number: parsed.require(ORDER_NUMBER)?.to_string(),
            purchase_date: parsed.require(PURCHASE_DATE)?.to_string(),
            issue_summary: parsed.require(ISSUE_SUMMARY)?.to_string(),
        })
    }
}

/// Stage 2 output.
///
/// `accept_reason` is the decision token exactly as the model wrote it ("True",
/// "False", ...). It is never coerced to a bool; the reply stage and the caller
/// receive the literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnDecision {
    pub accept_reason: String,
    pub accept_reason_detail: String,
}

impl TryFrom<&ParsedResult> for ReturnDecision {
    type Error = ParseError;

    fn try_from(parsed: &ParsedResult) -> Result<Self, Self::Error> {
        Ok(Self {
            accept_reason: parsed.require(ACCEPT_REASON)?.to_string(),
            accept_reason_detail: parsed.require(ACCEPT_REASON_DETAIL)?.to_string(),
        })
    }
}

/// Union of all stage outputs for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    #[serde(flatten)]
    pub facts: CaseFacts,
    #[serde(flatten)]
    pub decision: ReturnDecision,
}

/// Result of a run that reached the end of the reply stage.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedRun {
    pub run_id: Uuid,
    pub model: String,
    pub case: CaseRecord,
    /// Generated reply, unmodified.
    pub reply: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug)]
enum RunState {
    Pending,
    Extracted(CaseFacts),
    Decided(CaseRecord),
    Completed { case: CaseRecord, reply: String },
}

/// Schema, derived format instructions and template for a schema-bound stage.
struct SchemaStage {
    schema: SchemaSet,
    format_instructions: String,
    template: PromptTemplate,
}

impl SchemaStage {
    fn new(schema: SchemaSet, template: &str) -> Result<Self, SetupError> {
        Ok(Self {
            format_instructions: instructions_for(&schema),
            schema,
            template: PromptTemplate::new(template)?,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct ReturnsPipeline {
    generator: Arc<dyn TextGenerator>,
    config: PipelineConfig,
    extraction: SchemaStage,
    decision: SchemaStage,
    reply: PromptTemplate,
}

impl ReturnsPipeline {
    /// Builds schemas, format instructions and templates once. Fails on
    /// configuration errors, never on input.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        config: PipelineConfig,
    ) -> Result<Self, SetupError> {
        Ok(Self {
            generator,
            config,
            extraction: SchemaStage::new(extraction_schema()?, EXTRACTION_TEMPLATE)?,
            decision: SchemaStage::new(decision_schema()?, DECISION_TEMPLATE)?,
            reply: PromptTemplate::new(REPLY_TEMPLATE)?,
        })
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Runs all three stages for `email`, sequentially.
    pub async fn run(&self, email: &str) -> Result<CompletedRun, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            %run_id,
            model = self.generator.model_name(),
            email_chars = email.chars().count(),
            "Starting returns pipeline run"
        );

        let mut state = RunState::Pending;
        loop {
            state = match state {
                RunState::Pending => RunState::Extracted(self.extract(run_id, email).await?),
                RunState::Extracted(facts) => {
                    let decision = self.decide(run_id, &facts).await?;
                    RunState::Decided(CaseRecord { facts, decision })
                }
                RunState::Decided(case) => {
                    let reply = self.draft_reply(run_id, &case).await?;
                    RunState::Completed { case, reply }
                }
                RunState::Completed { case, reply } => {
                    let finished_at = Utc::now();
                    info!(
                        %run_id,
                        accept_reason = %case.decision.accept_reason,
                        elapsed_ms = (finished_at - started_at).num_milliseconds(),
                        "Returns pipeline run completed"
                    );
                    return Ok(CompletedRun {
                        run_id,
                        model: self.generator.model_name().to_string(),
                        case,
                        reply,
                        started_at,
                        finished_at,
                    });
                }
            };
        }
    }

    async fn extract(&self, run_id: Uuid, email: &str) -> Result<CaseFacts, PipelineError> {
        let stage = Stage::Extraction;
        let variables = Variables::from([
            ("email", email),
            (
                "format_instructions",
                self.extraction.format_instructions.as_str(),
            ),
        ]);

        let result = async {
            let parsed = self
                .run_schema_stage(run_id, stage, &self.extraction, &variables)
                .await?;
            Ok::<_, StageError>(CaseFacts::try_from(&parsed)?)
        }
        .await;

        self.conclude(run_id, stage, result)
    }

    async fn decide(
        &self,
        run_id: Uuid,
        facts: &CaseFacts,
    ) -> Result<ReturnDecision, PipelineError> {
        let stage = Stage::Decision;
        let variables = Variables::from([
            ("issue_summary", facts.issue_summary.as_str()),
            ("return_guidelines", self.config.policy.as_str()),
            (
                "format_instructions",
                self.decision.format_instructions.as_str(),
            ),
        ]);

        let result = async {
            let parsed = self
                .run_schema_stage(run_id, stage, &self.decision, &variables)
                .await?;
            Ok::<_, StageError>(ReturnDecision::try_from(&parsed)?)
        }
        .await;

        self.conclude(run_id, stage, result)
    }

    async fn draft_reply(&self, run_id: Uuid, case: &CaseRecord) -> Result<String, PipelineError> {
        let stage = Stage::Reply;
        let variables = Variables::from([
            ("company_name", self.config.company_name.as_str()),
            ("client_name", case.facts.email_name.as_str()),
            ("order_number", case.facts.order_number.as_str()),
            ("issue_summary", case.facts.issue_summary.as_str()),
            ("accept_decision", case.decision.accept_reason.as_str()),
            (
                "accept_reason_detail",
                case.decision.accept_reason_detail.as_str(),
            ),
            ("unknown_marker", UNKNOWN),
            ("no_invention", NO_INVENTION_INSTRUCTION),
        ]);

        let result = self
            .generate(run_id, stage, &self.reply, REPLY_SYSTEM, &variables)
            .await;

        self.conclude(run_id, stage, result)
    }

    async fn run_schema_stage(
        &self,
        run_id: Uuid,
        stage: Stage,
        contract: &SchemaStage,
        variables: &Variables<'_>,
    ) -> Result<ParsedResult, StageError> {
        let raw = self
            .generate(
                run_id,
                stage,
                &contract.template,
                STRUCTURED_OUTPUT_SYSTEM,
                variables,
            )
            .await?;
        Ok(parse(&raw, &contract.schema)?)
    }

    /// Renders (failing before any call on a missing variable), then makes the
    /// stage's single generation call.
    async fn generate(
        &self,
        run_id: Uuid,
        stage: Stage,
        template: &PromptTemplate,
        system: &str,
        variables: &Variables<'_>,
    ) -> Result<String, StageError> {
        info!(%run_id, %stage, "Stage started");
        let messages = template.render_messages(system, variables)?;
        debug!(
            %run_id,
            %stage,
            prompt_chars = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "Prompt rendered"
        );

        let raw = self.generator.generate(&messages).await?;
        if raw.trim().is_empty() {
            return Err(LlmError::EmptyContent.into());
        }
        debug!(%run_id, %stage, output_chars = raw.len(), "Generation returned");
        Ok(raw)
    }

    fn conclude<T>(
        &self,
        run_id: Uuid,
        stage: Stage,
        result: Result<T, StageError>,
    ) -> Result<T, PipelineError> {
        match result {
            Ok(value) => {
                info!(%run_id, %stage, "Stage completed");
                Ok(value)
            }
            Err(source) => {
                error!(%run_id, %stage, error = %source, "Stage failed, aborting run");
                Err(PipelineError { stage, source })
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
