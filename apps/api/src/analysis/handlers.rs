//! Axum route handlers for the single-page form.
//!
//! Every handler that touches a session holds that session's lock until its
//! state is written back, so a double-clicked star or a feedback click during
//! a running analysis is handled after the earlier request finishes.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::analysis::page::{render_page, PageView};
use crate::analysis::pipeline::{
    run_analysis, submit_feedback, AnalysisSubmission, RunOutcome, UploadedFile,
};
use crate::errors::AppError;
use crate::models::analysis::StarRating;
use crate::session::{expired_session_cookie, session_cookie, session_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    /// 0-based position in the star widget.
    pub index: u8,
    #[serde(default)]
    pub comment: String,
}

fn page_response(status: StatusCode, jar: CookieJar, session_id: Uuid, html: String) -> Response {
    (status, jar.add(session_cookie(session_id)), Html(html)).into_response()
}

fn invalid_form(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid form data: {e}"))
}

/// Reads the multipart form. An empty file input counts as no file.
pub async fn read_submission(mut multipart: Multipart) -> Result<AnalysisSubmission, AppError> {
    let mut submission = AnalysisSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(invalid_form)?;
                if !file_name.is_empty() || !bytes.is_empty() {
                    submission.resume = Some(UploadedFile { file_name, bytes });
                }
            }
            "duties" => submission.duties = field.text().await.map_err(invalid_form)?,
            "requirements" => submission.requirements = field.text().await.map_err(invalid_form)?,
            "preferred" => submission.preferred = field.text().await.map_err(invalid_form)?,
            "user_name" => submission.user_name = Some(field.text().await.map_err(invalid_form)?),
            _ => {}
        }
    }

    Ok(submission)
}

/// GET /
pub async fn handle_index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let (session_id, handle) = state.sessions.resume_or_start(&jar);
    let session = handle.lock().await;
    let html = render_page(&session, PageView::default())?;
    Ok(page_response(StatusCode::OK, jar, session_id, html))
}

/// POST /analyze
///
/// Incomplete input renders a warning; a model failure renders an error banner
/// with 502 and leaves the stored result untouched.
pub async fn handle_analyze(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let submission = read_submission(multipart).await?;
    let (session_id, handle) = state.sessions.resume_or_start(&jar);
    let mut session = handle.lock().await;

    let (updated, outcome) = run_analysis(
        session.clone(),
        submission,
        state.model.as_ref(),
        &state.notifier,
    )
    .await;
    *session = updated;

    let (status, view) = match outcome {
        RunOutcome::Completed(_) => (StatusCode::OK, PageView::default()),
        RunOutcome::Incomplete(warning) => (
            StatusCode::OK,
            PageView {
                warning: Some(warning.to_string()),
                ..Default::default()
            },
        ),
        RunOutcome::Failed(message) => (
            StatusCode::BAD_GATEWAY,
            PageView {
                error: Some(message),
                ..Default::default()
            },
        ),
    };

    let html = render_page(&session, view)?;
    Ok(page_response(status, jar, session_id, html))
}

/// POST /feedback
pub async fn handle_feedback(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    let rating = StarRating::from_index(form.index).ok_or_else(|| {
        AppError::Validation(format!(
            "index must be between 0 and {}, got {}",
            StarRating::MAX - 1,
            form.index
        ))
    })?;
    let (session_id, handle) = state.sessions.resume_or_start(&jar);
    let mut session = handle.lock().await;

    let (updated, outcome) =
        submit_feedback(session.clone(), rating, form.comment, &state.notifier).await;
    *session = updated;

    let view = PageView {
        notice: Some(outcome.acknowledgment),
        ..Default::default()
    };
    let html = render_page(&session, view)?;
    Ok(page_response(StatusCode::OK, jar, session_id, html))
}

/// POST /session/end
pub async fn handle_end_session(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(id) = session_id(&jar) {
        state.sessions.end(id);
    }
    (jar.add(expired_session_cookie()), Redirect::to("/")).into_response()
}
