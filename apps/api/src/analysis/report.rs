//! Report Generator — a one-node workflow: {start} → analyze → {done}.
//!
//! The model's text is returned exactly as received. Nothing is parsed,
//! scored or validated, and failures are handed back to the caller untouched.

use tracing::debug;

use crate::analysis::prompts::{build_report_prompt, REPORT_SYSTEM};
use crate::llm_client::{CompletionModel, LlmError};
use crate::models::analysis::AnalysisRequest;

/// Builds the report prompt and returns the model's raw answer.
pub async fn generate_report(
    model: &dyn CompletionModel,
    request: &AnalysisRequest,
) -> Result<String, LlmError> {
    let prompt = build_report_prompt(request);
    debug!(
        "Submitting report prompt ({} chars, resume {} chars)",
        prompt.chars().count(),
        request.resume_text.chars().count()
    );
    model.complete(&prompt, REPORT_SYSTEM).await
}
