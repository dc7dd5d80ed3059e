//! The model × case matrix and its report

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use vigil_config::MatrixConfig;
use vigil_llm::{ErrorKind, ProviderCapabilities};

use crate::error::HarnessError;
use crate::fixtures::{self, StopCase};
use crate::harness::Harness;
use crate::image::{ImageInput, ImageSubtype};
use crate::outcome::Outcome;

/// One harness operation with its fixture inputs
#[derive(Debug, Clone)]
pub enum Case {
    Text,
    SystemPrompt,
    StreamingSystemPrompt,
    Image { subtype: ImageSubtype, path: PathBuf },
    ToolCalling,
    StopSequence(StopCase),
}

impl Case {
    /// Cases that run against every text model
    pub fn text_cases() -> Vec<Self> {
        let mut cases = vec![Self::Text, Self::SystemPrompt, Self::StreamingSystemPrompt, Self::ToolCalling];
        cases.extend(fixtures::stop_cases().into_iter().map(Self::StopSequence));
        cases
    }

    /// Whether a client with `caps` can run this case at all
    pub const fn is_supported_by(&self, caps: &ProviderCapabilities) -> bool {
        match self {
            Self::StreamingSystemPrompt => caps.streaming,
            Self::Image { .. } => caps.vision,
            Self::ToolCalling => caps.tool_calling,
            Self::Text | Self::SystemPrompt | Self::StopSequence(_) => true,
        }
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::SystemPrompt => f.write_str("system"),
            Self::StreamingSystemPrompt => f.write_str("system_stream"),
            Self::Image { subtype, .. } => write!(f, "image[{subtype}]"),
            Self::ToolCalling => f.write_str("tool_calling"),
            Self::StopSequence(stop) => write!(f, "stop[{}]", stop.label),
        }
    }
}

/// A case bound to a model
#[derive(Debug, Clone)]
pub struct CaseSpec {
    pub model: String,
    pub case: Case,
}

/// Every case to run, in report order
#[derive(Debug, Clone, Default)]
pub struct Matrix {
    specs: Vec<CaseSpec>,
}

impl Matrix {
    /// Cross product of configured models and cases
    ///
    /// Image cases use the image model list and one case per image fixture.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::InvalidInput` for an unsupported image subtype.
    pub fn from_config(config: &MatrixConfig) -> Result<Self, HarnessError> {
        let images = config
            .images
            .iter()
            .map(|image| {
                Ok::<_, HarnessError>(Case::Image {
                    subtype: image.subtype.parse()?,
                    path: image.path.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let text_cases = Case::text_cases();
        let mut specs = Vec::with_capacity(config.models.len() * text_cases.len());

        for model in &config.models {
            specs.extend(text_cases.iter().map(|case| CaseSpec {
                model: model.clone(),
                case: case.clone(),
            }));
        }

        for model in &config.image_models {
            specs.extend(images.iter().map(|case| CaseSpec {
                model: model.clone(),
                case: case.clone(),
            }));
        }

        Ok(Self { specs })
    }

    /// Keep specs whose model is in `models` (all when empty) and whose case
    /// name contains `case` (all when `None`)
    #[must_use]
    pub fn filter(mut self, models: &[String], case: Option<&str>) -> Self {
        self.specs.retain(|spec| {
            (models.is_empty() || models.contains(&spec.model))
                && case.is_none_or(|needle| spec.case.to_string().contains(needle))
        });
        self
    }

    /// Drop cases the client cannot run
    #[must_use]
    pub fn supported_by(mut self, caps: &ProviderCapabilities) -> Self {
        let before = self.specs.len();
        self.specs.retain(|spec| spec.case.is_supported_by(caps));

        let skipped = before - self.specs.len();
        if skipped > 0 {
            tracing::warn!(skipped, ?caps, "skipping cases the client does not support");
        }
        self
    }

    pub fn specs(&self) -> &[CaseSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// How a case ended
#[derive(Debug, Clone)]
pub enum CaseStatus {
    Passed,
    Tolerated { kind: ErrorKind, message: String },
    Failed { error: String },
}

/// Result of one case
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub model: String,
    pub case: String,
    pub status: CaseStatus,
    pub elapsed: Duration,
}

/// Results of a matrix run in matrix order
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub cases: Vec<CaseReport>,
}

impl Report {
    pub fn passed(&self) -> usize {
        self.count(|s| matches!(s, CaseStatus::Passed))
    }

    pub fn tolerated(&self) -> usize {
        self.count(|s| matches!(s, CaseStatus::Tolerated { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, CaseStatus::Failed { .. }))
    }

    /// No case failed
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&CaseStatus) -> bool) -> usize {
        self.cases.iter().filter(|c| pred(&c.status)).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            let (label, detail) = match &case.status {
                CaseStatus::Passed => ("PASS", String::new()),
                CaseStatus::Tolerated { kind, message } => ("SKIP", format!(" ({kind}: {message})")),
                CaseStatus::Failed { error } => ("FAIL", format!(" ({error})")),
            };
            writeln!(
                f,
                "{label} {model} {case} [{ms}ms]{detail}",
                model = case.model,
                case = case.case,
                ms = case.elapsed.as_millis()
            )?;
        }
        write!(
            f,
            "{} passed, {} tolerated, {} failed",
            self.passed(),
            self.tolerated(),
            self.failed()
        )
    }
}

/// Run one case to completion
#[tracing::instrument(skip_all, fields(model = %spec.model, case = %spec.case))]
pub async fn run_case(harness: &Harness, spec: &CaseSpec) -> CaseReport {
    let started = Instant::now();
    let result = dispatch(harness, spec).await;
    let elapsed = started.elapsed();

    let status = match result {
        Ok(Outcome::Verified(_)) => CaseStatus::Passed,
        Ok(Outcome::Tolerated { kind, message }) => CaseStatus::Tolerated { kind, message },
        Err(err) => {
            tracing::error!(error = %err, "case failed");
            CaseStatus::Failed { error: err.to_string() }
        }
    };

    CaseReport {
        model: spec.model.clone(),
        case: spec.case.to_string(),
        status,
        elapsed,
    }
}

async fn dispatch(harness: &Harness, spec: &CaseSpec) -> Result<Outcome, HarnessError> {
    let model = spec.model.as_str();
    match &spec.case {
        Case::Text => {
            harness
                .run_text_completion(
                    model,
                    fixtures::default_messages(),
                    fixtures::TEXT_MAX_TOKENS,
                    fixtures::TEXT_TEMPERATURE,
                )
                .await
        }
        Case::SystemPrompt => {
            harness
                .run_completion_with_system_prompt(
                    model,
                    fixtures::SYSTEM_PROMPT,
                    fixtures::default_messages(),
                    fixtures::TEXT_MAX_TOKENS,
                    fixtures::TEXT_TEMPERATURE,
                )
                .await
        }
        Case::StreamingSystemPrompt => {
            harness
                .run_streaming_completion_with_system_prompt(
                    model,
                    fixtures::STREAMING_SYSTEM_PROMPT,
                    fixtures::default_messages(),
                    fixtures::TEXT_MAX_TOKENS,
                    fixtures::TEXT_TEMPERATURE,
                )
                .await
        }
        Case::Image { subtype, path } => {
            let image = ImageInput::from_path(path, *subtype).await?;
            harness
                .run_multimodal_completion(model, fixtures::IMAGE_PROMPT, &image.bytes, image.subtype)
                .await
        }
        Case::ToolCalling => {
            harness
                .run_tool_calling_completion(model, fixtures::WEATHER_PROMPT, vec![fixtures::weather_tool()])
                .await
        }
        Case::StopSequence(stop) => {
            harness
                .run_stop_sequence_completion(model, stop.prompt, stop.stop.clone())
                .await
        }
    }
}

/// Run every spec with at most `concurrency` in flight
///
/// Cases share nothing but the client, so completion order is irrelevant; the
/// report keeps matrix order.
pub async fn run_matrix(harness: &Harness, matrix: &Matrix, concurrency: usize) -> Report {
    tracing::info!(cases = matrix.len(), concurrency, "running matrix");

    let mut results: Vec<(usize, CaseReport)> = futures_util::stream::iter(matrix.specs.iter().enumerate())
        .map(|(index, spec)| async move { (index, run_case(harness, spec).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(index, _)| *index);

    let report = Report {
        cases: results.into_iter().map(|(_, report)| report).collect(),
    };

    tracing::info!(
        passed = report.passed(),
        tolerated = report.tolerated(),
        failed = report.failed(),
        "matrix finished"
    );

    report
}
