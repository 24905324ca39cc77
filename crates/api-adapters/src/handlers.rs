//! # Handlers
//!
//! Thin adapters: decode the path and body, call one service operation,
//! encode the result. Path ids are parsed here so a malformed id is a 400
//! before any store round trip.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use domains::{
    parse_id, CastVoteRequest, Comment, NewComment, NewPhoto, NewPost, NewProfile, Photo, Post,
    Profile, VoteRequest, VoteState, VoteTally,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Body returned by every create operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertId {
    pub insert_id: Uuid,
}

fn created(status: StatusCode, id: Uuid) -> (StatusCode, Json<InsertId>) {
    (status, Json(InsertId { insert_id: id }))
}

// ─── Profiles ───────────────────────────────────────────────────────────────

pub async fn list_profiles(State(state): State<AppState>) -> ApiResult<Json<Vec<Profile>>> {
    Ok(Json(state.profiles.list_profiles().await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Profile>> {
    let user_id = parse_id("user", &user_id)?;
    Ok(Json(state.profiles.get_profile(user_id).await?))
}

pub async fn create_profile(
    State(state): State<AppState>,
    payload: Result<Json<NewProfile>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(profile) = payload?;
    let id = state.profiles.create_profile(profile).await?;
    Ok(created(StatusCode::CREATED, id))
}

// ─── Album ──────────────────────────────────────────────────────────────────

pub async fn list_photos(State(state): State<AppState>) -> ApiResult<Json<Vec<Photo>>> {
    Ok(Json(state.album.list_photos().await?))
}

pub async fn add_photo(
    State(state): State<AppState>,
    payload: Result<Json<NewPhoto>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(photo) = payload?;
    let id = state.album.add_photo(photo).await?;
    Ok(created(StatusCode::CREATED, id))
}

// ─── Posts & comments ───────────────────────────────────────────────────────

pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<Post>>> {
    Ok(Json(state.posts.list_posts().await?))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_id("post", &post_id)?;
    Ok(Json(state.posts.get_post(post_id).await?))
}

pub async fn create_post(
    State(state): State<AppState>,
    payload: Result<Json<NewPost>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(post) = payload?;
    let id = state.posts.create_post(post).await?;
    Ok(created(StatusCode::CREATED, id))
}

pub async fn comments_of_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    let post_id = parse_id("post", &post_id)?;
    Ok(Json(state.comments.build_tree(post_id).await?))
}

/// 202: with background propagation the ancestors are not stamped yet.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(parent_id): Path<String>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let parent_id = parse_id("parent", &parent_id)?;
    let Json(comment) = payload?;
    let id = state.comments.insert_comment(parent_id, comment).await?;
    Ok(created(StatusCode::ACCEPTED, id))
}

// ─── Votes ──────────────────────────────────────────────────────────────────

pub async fn apply_vote(
    State(state): State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<Json<VoteTally>> {
    let Json(request) = payload?;
    Ok(Json(state.votes.apply_vote(request).await?))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    payload: Result<Json<CastVoteRequest>, JsonRejection>,
) -> ApiResult<Json<VoteTally>> {
    let Json(request) = payload?;
    Ok(Json(state.votes.cast_vote(request).await?))
}

pub async fn vote_map(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<BTreeMap<Uuid, VoteState>>> {
    let user_id = parse_id("user", &user_id)?;
    Ok(Json(state.votes.vote_map(user_id).await?))
}

// ─── Operational ────────────────────────────────────────────────────────────

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state
        .metrics
        .observe_propagation(state.comments.propagator().stats());
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
