use std::time::Duration;

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Full application router: the versioned API under `/api/v1` plus the
/// operational endpoints.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/profile", get(handlers::list_profiles).put(handlers::create_profile))
        .route("/profile/{user_id}", get(handlers::get_profile))
        .route("/album", get(handlers::list_photos).put(handlers::add_photo))
        .route("/forum/post", get(handlers::list_posts).put(handlers::create_post))
        .route("/forum/post/{post_id}", get(handlers::get_post))
        .route("/forum/commentsofpost/{post_id}", get(handlers::comments_of_post))
        .route("/forum/comment/{parent_id}", post(handlers::add_comment))
        .route("/forum/vote", post(handlers::apply_vote))
        .route("/forum/vote/cast", post(handlers::cast_vote))
        .route("/forum/vote/{user_id}", get(handlers::vote_map));

    Router::new()
        .nest("/api/v1", api)
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors_policy())
        .with_state(state)
}

fn cors_policy() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Counts every routed request by its matched route template, so ids in
/// the path do not explode label cardinality.
async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;
    state
        .metrics
        .record_request(&method, &route, response.status().as_u16());
    response
}
