// Prompt text for the suitability report.

use crate::models::analysis::AnalysisRequest;

/// System instruction for report generation.
pub const REPORT_SYSTEM: &str = "You are a senior technical recruiter and career coach. \
    You compare a candidate's resume against a job posting and write an honest, \
    specific suitability report. Base every statement on the resume text provided. \
    Do NOT invent experience the resume does not mention.";

/// Renders the report prompt. Inputs are embedded verbatim in a single pass,
/// so braces or placeholder-like text inside them are never re-substituted.
pub fn build_report_prompt(request: &AnalysisRequest) -> String {
    let AnalysisRequest {
        resume_text,
        duties,
        requirements,
        preferred,
    } = request;

    format!(
        r#"Evaluate how well the candidate below fits the job posting.

[RESUME]
{resume_text}

[JOB POSTING]
Key duties:
{duties}

Requirements:
{requirements}

Preferred qualifications:
{preferred}

Write the report in Markdown with exactly these sections:

## Suitability Score
A single integer from 0 to 100, followed by one sentence justifying it.

## Success Factors
Bullet points naming the resume evidence that matches the duties and requirements.

## Gaps
Bullet points naming requirements or preferred qualifications the resume does not show.

## Suggested Practice Projects
Two or three concrete projects the candidate could build to close the gaps, each with
a one-line description of what it would demonstrate."#
    )
}
