//! HTTP service for the mldegrees backend. Routes, identity middleware,
//! and in-process metrics live here; all persistence goes through one
//! shared SQLite connection guarded by an async mutex.

#![forbid(unsafe_code)]

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use mldegrees_api::{
    map_error, parse_admin_catalog_params, parse_catalog_params, parse_path_id,
    parse_review_status_param, ApiError, AuthRequest, LocalAuthRequest, ProgramActionRequest,
    ProposalEditRequest, ProposalReviewRequest, ProposalSubmitRequest, ProposeProgramRequest,
    RateRequest, VoteRequest,
};
use mldegrees_model::{ProgramUpdate, ReviewAction, User};
use mldegrees_store::{
    cast_vote, create_program, create_proposal, delete_own_proposal, find_user_by_subject,
    get_program, list_all_programs, list_pending_programs, list_proposals, list_public_programs,
    list_user_proposals, ping, rate_program, review_proposal, set_program_visibility,
    update_own_proposal, update_program, upsert_identity, upsert_local_identity, StoreError,
};
use rusqlite::Connection;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

mod config;
mod handlers;
mod metrics;
mod middleware;

pub use config::{validate_startup_config_contract, ApiConfig, CONFIG_SCHEMA_VERSION};

use metrics::RequestMetrics;

pub const CRATE_NAME: &str = "mldegrees-server";

#[derive(Clone)]
pub struct AppState {
    pub api: ApiConfig,
    pub(crate) db: Arc<Mutex<Connection>>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self::with_config(conn, ApiConfig::default())
    }

    #[must_use]
    pub fn with_config(conn: Connection, api: ApiConfig) -> Self {
        Self {
            api,
            db: Arc::new(Mutex::new(conn)),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api/auth", post(handlers::auth_handler))
        .route("/api/auth/local", post(handlers::local_auth_handler))
        .route("/api/programs", get(handlers::programs_handler))
        .route("/api/vote", post(handlers::vote_handler))
        .route("/api/programs/:id/rate", post(handlers::rate_handler))
        .route(
            "/api/programs/propose",
            post(handlers::propose_program_handler),
        )
        .route(
            "/api/programs/proposals",
            post(handlers::submit_proposal_handler),
        )
        .route(
            "/api/programs/proposals/user",
            get(handlers::user_proposals_handler),
        )
        .route(
            "/api/programs/proposals/:id",
            put(handlers::edit_proposal_handler).delete(handlers::delete_proposal_handler),
        )
        .route(
            "/api/admin/programs",
            get(handlers::pending_programs_handler),
        )
        .route(
            "/api/admin/programs/action",
            post(handlers::program_action_handler),
        )
        .route(
            "/api/admin/programs/all",
            get(handlers::all_programs_handler),
        )
        .route(
            "/api/admin/programs/update",
            put(handlers::update_program_handler),
        )
        .route(
            "/api/admin/programs/:id",
            get(handlers::admin_program_handler),
        )
        .route("/api/admin/proposals", get(handlers::review_queue_handler))
        .route(
            "/api/admin/proposals/review",
            post(handlers::review_proposal_handler),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::identity_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_log_middleware,
        ))
        .layer(from_fn_with_state(state.clone(), middleware::cors_middleware))
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}
