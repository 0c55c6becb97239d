use askama::Template;

use crate::errors::AppError;
use crate::models::analysis::{AnalysisResult, StarRating};
use crate::notify::payload::format_thousands;
use crate::session::{FormValues, SessionState};

/// One-off banners for a single render.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub warning: Option<String>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

pub struct StarOption {
    pub index: u8,
    pub glyph: &'static str,
    pub title: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub form: FormValues,
    pub warning: Option<String>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub result: Option<AnalysisResult>,
    pub latency: String,
    pub stars: Vec<StarOption>,
}

fn star_options(last: Option<StarRating>) -> Vec<StarOption> {
    let filled = last.map(StarRating::score).unwrap_or(0);
    (0..StarRating::MAX)
        .map(|index| {
            let score = index + 1;
            StarOption {
                index,
                glyph: if score <= filled { "★" } else { "☆" },
                title: format!("{score} stars"),
                selected: score <= filled,
            }
        })
        .collect()
}

/// Renders the single page from the session plus this render's banners.
/// The form is refilled with the session's last submitted values.
pub fn render_page(session: &SessionState, view: PageView) -> Result<String, AppError> {
    let mut form = session.form.clone();
    if form.user_name.is_empty() {
        form.user_name = session.user_name.clone().unwrap_or_default();
    }

    let page = IndexPage {
        form,
        warning: view.warning,
        error: view.error,
        notice: view.notice,
        latency: session
            .result
            .as_ref()
            .map(|r| format_thousands(r.latency_ms))
            .unwrap_or_default(),
        result: session.result.clone(),
        stars: star_options(session.last_feedback),
    };
    Ok(page.render()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_result(text: &str) -> SessionState {
        SessionState {
            result: Some(AnalysisResult {
                final_result: text.to_string(),
                latency_ms: 12_345,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_session_shows_form_without_rating_widget() {
        let html = render_page(&SessionState::default(), PageView::default()).unwrap();
        assert!(html.contains(r#"action="/analyze""#));
        assert!(!html.contains(r#"action="/feedback""#));
    }

    #[test]
    fn test_result_latency_and_stars_are_rendered() {
        let html = render_page(&session_with_result("Score: 80"), PageView::default()).unwrap();
        assert!(html.contains("Score: 80"));
        assert!(html.contains("12,345 ms"));
        assert_eq!(html.matches(r#"name="index""#).count(), 5);
    }

    #[test]
    fn test_model_output_is_escaped_not_interpreted() {
        let html = render_page(&session_with_result("<script>x</script>"), PageView::default())
            .unwrap();
        assert!(!html.contains("<script>x</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_banners_render() {
        let view = PageView {
            warning: Some("upload first".to_string()),
            error: Some("quota".to_string()),
            notice: Some("thanks".to_string()),
            ..Default::default()
        };
        let html = render_page(&SessionState::default(), view).unwrap();
        assert!(html.contains("upload first"));
        assert!(html.contains("The analysis failed: quota"));
        assert!(html.contains("thanks"));
    }

    #[test]
    fn test_form_is_refilled_from_session() {
        let session = SessionState {
            form: FormValues {
                duties: "Build APIs".to_string(),
                requirements: "Go & Rust".to_string(),
                ..Default::default()
            },
            user_name: Some("Robin".to_string()),
            ..Default::default()
        };
        let html = render_page(&session, PageView::default()).unwrap();
        assert!(html.contains(">Build APIs</textarea>"));
        assert!(html.contains(">Go &amp; Rust</textarea>"));
        assert!(html.contains(r#"value="Robin""#));
    }

    #[test]
    fn test_selected_stars_follow_last_feedback() {
        let stars = star_options(StarRating::from_score(3));
        let selected: Vec<bool> = stars.iter().map(|s| s.selected).collect();
        assert_eq!(selected, vec![true, true, true, false, false]);
        assert_eq!(stars[0].index, 0);
        assert_eq!(stars[4].title, "5 stars");
    }
}
