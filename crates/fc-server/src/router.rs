//! HTTP routes.
//!
//! | Route          | Handler                                     |
//! |----------------|---------------------------------------------|
//! | `GET /ws`      | WebSocket upgrade, streams file events      |
//! | `GET /api/status` | JSON [`StatusReport`]                    |
//! | anything else  | static bundle, or 404 when none configured  |

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use camino::Utf8Path;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::{AppState, StatusReport};
use crate::ws::ws_handler;

/// Builds the application router.
///
/// When `static_dir` is set its contents are served for every path not
/// matched by a route.
pub fn router(state: AppState, static_dir: Option<&Utf8Path>) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/status", get(status_handler));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir.as_std_path()));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.status())
}
