//! Interaction pipeline — what happens when the user presses "Analyze" or
//! picks a star rating.
//!
//! Both interactions take the session state by value and hand back the
//! (possibly updated) state together with an outcome for rendering.
//!
//! Flow: gate inputs → extract résumé → generate report (timed) →
//!       store result in session → analysis-completed notification.

use std::time::Instant;

use bytes::Bytes;
use tracing::{error, info};

use crate::analysis::extractor::extract_or_fallback;
use crate::analysis::report::generate_report;
use crate::llm_client::CompletionModel;
use crate::models::analysis::{AnalysisRequest, AnalysisResult, FeedbackEvent, StarRating};
use crate::notify::{Delivery, Notifier};
use crate::session::{FormValues, SessionState};

pub const MISSING_FILE_WARNING: &str = "Please upload your resume (.docx) first.";
pub const MISSING_POSTING_WARNING: &str =
    "Please enter at least the key duties or the requirements of the job posting.";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Raw form submission for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSubmission {
    pub resume: Option<UploadedFile>,
    pub duties: String,
    pub requirements: String,
    pub preferred: String,
    pub user_name: Option<String>,
}

impl AnalysisSubmission {
    /// The warning to show instead of running, if the submission is incomplete.
    pub fn missing_input(&self) -> Option<&'static str> {
        if self.resume.is_none() {
            Some(MISSING_FILE_WARNING)
        } else if self.duties.trim().is_empty() && self.requirements.trim().is_empty() {
            Some(MISSING_POSTING_WARNING)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Input gate failed; nothing was run.
    Incomplete(&'static str),
    Completed(AnalysisResult),
    /// The model call failed; the session keeps its previous result.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackOutcome {
    pub acknowledgment: String,
    /// `None` when this score was already sent in this session.
    pub delivery: Option<Delivery>,
}

/// Runs one analysis: extractor → report generator → session → notification.
pub async fn run_analysis(
    mut session: SessionState,
    submission: AnalysisSubmission,
    model: &dyn CompletionModel,
    notifier: &Notifier,
) -> (SessionState, RunOutcome) {
    session.form = FormValues {
        duties: submission.duties.clone(),
        requirements: submission.requirements.clone(),
        preferred: submission.preferred.clone(),
        user_name: submission.user_name.clone().unwrap_or_default(),
    };
    session.user_name = submission
        .user_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);

    if let Some(warning) = submission.missing_input() {
        return (session, RunOutcome::Incomplete(warning));
    }
    let Some(resume) = submission.resume else {
        return (session, RunOutcome::Incomplete(MISSING_FILE_WARNING));
    };

    let extraction = extract_or_fallback(&resume.bytes);
    if extraction.is_fallback() {
        info!(
            "Continuing with fallback text for unreadable upload '{}'",
            resume.file_name
        );
    }

    let request = AnalysisRequest {
        resume_text: extraction.into_text(),
        duties: submission.duties,
        requirements: submission.requirements,
        preferred: submission.preferred,
    };

    let started = Instant::now();
    let report = generate_report(model, &request).await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let final_result = match report {
        Ok(text) => text,
        Err(e) => {
            error!("Report generation failed after {latency_ms} ms: {e}");
            return (session, RunOutcome::Failed(e.to_string()));
        }
    };

    let result = AnalysisResult {
        final_result,
        latency_ms,
    };
    session.result = Some(result.clone());
    info!("Analysis completed in {latency_ms} ms");

    let delivery = notifier
        .analysis_completed(session.user_name.as_deref(), &request.duties, &result)
        .await;
    info!("Analysis notification: {delivery:?}");

    (session, RunOutcome::Completed(result))
}

/// Records a star rating. The notification fires only when the score differs
/// from the last one sent in this session.
pub async fn submit_feedback(
    mut session: SessionState,
    rating: StarRating,
    comment: String,
    notifier: &Notifier,
) -> (SessionState, FeedbackOutcome) {
    let acknowledgment = format!("Thanks for your feedback! ({} stars)", rating.score());

    let delivery = if session.is_new_feedback(rating) {
        let event = FeedbackEvent { rating, comment };
        let delivery = notifier
            .feedback_submitted(session.user_name.as_deref(), &event)
            .await;
        session.last_feedback = Some(rating);
        info!("Feedback {} notification: {delivery:?}", rating.score());
        Some(delivery)
    } else {
        None
    };

    (
        session,
        FeedbackOutcome {
            acknowledgment,
            delivery,
        },
    )
}
