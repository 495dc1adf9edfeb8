use axum::extract::State;
use axum::response::Html;

use crate::homepage::{HomepageData, render_homepage};
use crate::state::AppState;

/// `GET /`. Leaderboards fall back to empty when analytics cannot be read.
pub async fn homepage(State(state): State<AppState>) -> Html<String> {
    let limit = state.config.homepage_limit;

    let (top, recent) = match tokio::try_join!(
        state.analytics.top_screenshots(limit),
        state.analytics.recent_screenshots(limit)
    ) {
        Ok(lists) => lists,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load homepage analytics data");
            (Vec::new(), Vec::new())
        }
    };

    Html(render_homepage(&HomepageData {
        public_host: state.config.public_host.clone(),
        hero_url: state.config.hero_url.clone(),
        top,
        recent,
    }))
}
