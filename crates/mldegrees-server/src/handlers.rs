// SPDX-License-Identifier: Apache-2.0

use crate::middleware::RequestIdentity;
use crate::*;

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    middleware::normalized_header_value(headers, "x-request-id", 128)
        .unwrap_or_else(|| make_request_id(state))
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

pub(crate) fn api_error_response(error: ApiError, request_id: &str) -> Response {
    let status =
        StatusCode::from_u16(map_error(&error)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = Json(json!({"error": error.with_request_id(request_id)}));
    (status, body).into_response()
}

async fn finish(
    state: &AppState,
    route: &'static str,
    request_id: &str,
    started: Instant,
    outcome: Result<Response, ApiError>,
) -> Response {
    let resp = match outcome {
        Ok(resp) => resp,
        Err(error) => api_error_response(error, request_id),
    };
    state
        .metrics
        .observe_request(route, resp.status(), started.elapsed())
        .await;
    with_request_id(resp, request_id)
}

/// Runs one store operation under the shared connection lock, recording
/// its latency under `query_type`. Store functions are synchronous; the
/// guard is released before anything else awaits.
async fn with_store<T, F>(state: &AppState, query_type: &'static str, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Connection) -> Result<T, StoreError>,
{
    let started = Instant::now();
    let mut conn = state.db.lock().await;
    let result = op(&mut *conn);
    drop(conn);
    state
        .metrics
        .observe_sqlite_query(query_type, started.elapsed())
        .await;
    Ok(result?)
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::invalid_body(rejection.body_text())),
    }
}

fn require_user(identity: &RequestIdentity) -> Result<&User, ApiError> {
    identity.0.as_ref().ok_or_else(ApiError::unauthorized)
}

fn require_admin(identity: &RequestIdentity) -> Result<&User, ApiError> {
    let user = require_user(identity)?;
    if !user.is_admin() {
        return Err(ApiError::admin_required());
    }
    Ok(user)
}

pub(crate) async fn health_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = match with_store(&state, "ping", |conn| ping(conn)).await {
        Ok(()) => Ok(Json(json!({"status": "ok"})).into_response()),
        Err(_) => Err(ApiError::service_unavailable("store ping failed")),
    };
    finish(&state, "/api/health", &request_id, started, outcome).await
}

pub(crate) async fn auth_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_auth(&state, body).await;
    finish(&state, "/api/auth", &request_id, started, outcome).await
}

async fn try_auth(
    state: &AppState,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = parse_body(body)?;
    let claim = request.claim()?;
    let user = with_store(state, "auth_upsert", |conn| upsert_identity(conn, &claim)).await?;
    // The provider subject doubles as the bearer credential.
    Ok(Json(json!({"user": user, "token": claim.subject})).into_response())
}

pub(crate) async fn local_auth_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<LocalAuthRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_local_auth(&state, body).await;
    finish(&state, "/api/auth/local", &request_id, started, outcome).await
}

async fn try_local_auth(
    state: &AppState,
    body: Result<Json<LocalAuthRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    if !state.api.enable_local_auth {
        return Err(ApiError::not_found("local auth"));
    }
    let request = parse_body(body)?;
    let (user, token) = with_store(state, "auth_local", move |conn| {
        upsert_local_identity(conn, request.role)
    })
    .await?;
    Ok(Json(json!({
        "user": user,
        "token": token,
        "message": "Local authentication successful"
    }))
    .into_response())
}

pub(crate) async fn programs_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_programs(&state, &identity, &params).await;
    finish(&state, "/api/programs", &request_id, started, outcome).await
}

async fn try_programs(
    state: &AppState,
    identity: &RequestIdentity,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let query = parse_catalog_params(params)?;
    let viewer = identity.0.as_ref().map(|u| u.id);
    let programs = with_store(state, "catalog_list", move |conn| {
        list_public_programs(conn, &query, viewer)
    })
    .await?;
    Ok(Json(programs).into_response())
}

pub(crate) async fn vote_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_vote(&state, &identity, body).await;
    finish(&state, "/api/vote", &request_id, started, outcome).await
}

async fn try_vote(
    state: &AppState,
    identity: &RequestIdentity,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user_id = require_user(identity)?.id;
    let request = parse_body(body)?;
    let vote = request.vote_value()?;
    let totals = with_store(state, "vote_cast", move |conn| {
        cast_vote(conn, user_id, request.program_id, vote)
    })
    .await?;
    Ok(Json(json!({"status": "success", "totals": totals})).into_response())
}

pub(crate) async fn rate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    Path(raw_id): Path<String>,
    body: Result<Json<RateRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_rate(&state, &identity, &raw_id, body).await;
    finish(
        &state,
        "/api/programs/:id/rate",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_rate(
    state: &AppState,
    identity: &RequestIdentity,
    raw_id: &str,
    body: Result<Json<RateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user_id = require_user(identity)?.id;
    let program_id = parse_path_id(raw_id, "id")?;
    let request = parse_body(body)?;
    let rating = request.rating_value()?;
    let summary = with_store(state, "rating_upsert", move |conn| {
        rate_program(conn, user_id, program_id, rating)
    })
    .await?;
    Ok(Json(json!({"status": "success", "rating": summary})).into_response())
}

pub(crate) async fn propose_program_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    body: Result<Json<ProposeProgramRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_propose_program(&state, &identity, body).await;
    finish(
        &state,
        "/api/programs/propose",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_propose_program(
    state: &AppState,
    identity: &RequestIdentity,
    body: Result<Json<ProposeProgramRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_user(identity)?;
    let request = parse_body(body)?;
    let draft = request.draft();
    let program = with_store(state, "program_insert", move |conn| {
        create_program(conn, &draft)
    })
    .await?;
    Ok(Json(json!({
        "message": "Program proposal submitted successfully. It will be reviewed by an administrator.",
        "program": program
    }))
    .into_response())
}

pub(crate) async fn submit_proposal_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    body: Result<Json<ProposalSubmitRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_submit_proposal(&state, &identity, body).await;
    finish(
        &state,
        "/api/programs/proposals",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_submit_proposal(
    state: &AppState,
    identity: &RequestIdentity,
    body: Result<Json<ProposalSubmitRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user_id = require_user(identity)?.id;
    let request = parse_body(body)?;
    let proposal = with_store(state, "proposal_insert", move |conn| {
        create_proposal(
            conn,
            user_id,
            request.program_id,
            &request.proposed,
            &request.reason,
        )
    })
    .await?;
    Ok(Json(json!({
        "message": "Program change proposal submitted successfully. It will be reviewed by an administrator.",
        "proposal": proposal
    }))
    .into_response())
}

pub(crate) async fn user_proposals_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_user_proposals(&state, &identity).await;
    finish(
        &state,
        "/api/programs/proposals/user",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_user_proposals(
    state: &AppState,
    identity: &RequestIdentity,
) -> Result<Response, ApiError> {
    let user_id = require_user(identity)?.id;
    let proposals = with_store(state, "proposal_list", move |conn| {
        list_user_proposals(conn, user_id)
    })
    .await?;
    Ok(Json(proposals).into_response())
}

pub(crate) async fn edit_proposal_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    Path(raw_id): Path<String>,
    body: Result<Json<ProposalEditRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_edit_proposal(&state, &identity, &raw_id, body).await;
    finish(
        &state,
        "/api/programs/proposals/:id",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_edit_proposal(
    state: &AppState,
    identity: &RequestIdentity,
    raw_id: &str,
    body: Result<Json<ProposalEditRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user_id = require_user(identity)?.id;
    let proposal_id = parse_path_id(raw_id, "id")?;
    let request = parse_body(body)?;
    let proposal = with_store(state, "proposal_update", move |conn| {
        update_own_proposal(conn, user_id, proposal_id, &request.proposed, &request.reason)
    })
    .await?;
    Ok(Json(json!({
        "message": "Program proposal updated successfully",
        "proposal": proposal
    }))
    .into_response())
}

pub(crate) async fn delete_proposal_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    Path(raw_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_delete_proposal(&state, &identity, &raw_id).await;
    finish(
        &state,
        "/api/programs/proposals/:id",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_delete_proposal(
    state: &AppState,
    identity: &RequestIdentity,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let user_id = require_user(identity)?.id;
    let proposal_id = parse_path_id(raw_id, "id")?;
    with_store(state, "proposal_delete", move |conn| {
        delete_own_proposal(conn, user_id, proposal_id)
    })
    .await?;
    Ok(Json(json!({"message": "Proposal deleted successfully"})).into_response())
}

pub(crate) async fn pending_programs_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_pending_programs(&state, &identity).await;
    finish(&state, "/api/admin/programs", &request_id, started, outcome).await
}

async fn try_pending_programs(
    state: &AppState,
    identity: &RequestIdentity,
) -> Result<Response, ApiError> {
    require_admin(identity)?;
    let programs = with_store(state, "moderation_list", |conn| {
        list_pending_programs(conn)
    })
    .await?;
    Ok(Json(programs).into_response())
}

pub(crate) async fn program_action_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    body: Result<Json<ProgramActionRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_program_action(&state, &identity, body).await;
    finish(
        &state,
        "/api/admin/programs/action",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_program_action(
    state: &AppState,
    identity: &RequestIdentity,
    body: Result<Json<ProgramActionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_admin(identity)?;
    let request = parse_body(body)?;
    with_store(state, "visibility_update", move |conn| {
        set_program_visibility(conn, request.program_id, request.action)
    })
    .await?;
    let decided = if request.action == ReviewAction::Approve {
        "approved"
    } else {
        "rejected"
    };
    Ok(Json(json!({"message": format!("Program {decided} successfully")})).into_response())
}

pub(crate) async fn all_programs_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_all_programs(&state, &identity, &params).await;
    finish(
        &state,
        "/api/admin/programs/all",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_all_programs(
    state: &AppState,
    identity: &RequestIdentity,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    require_admin(identity)?;
    let (sort, order) = parse_admin_catalog_params(params)?;
    let programs = with_store(state, "catalog_list", move |conn| {
        list_all_programs(conn, sort, order)
    })
    .await?;
    Ok(Json(programs).into_response())
}

pub(crate) async fn admin_program_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    Path(raw_id): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_admin_program(&state, &identity, &raw_id).await;
    finish(
        &state,
        "/api/admin/programs/:id",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_admin_program(
    state: &AppState,
    identity: &RequestIdentity,
    raw_id: &str,
) -> Result<Response, ApiError> {
    require_admin(identity)?;
    let program_id = parse_path_id(raw_id, "id")?;
    let program = with_store(state, "catalog_get", move |conn| {
        get_program(conn, program_id, None)
    })
    .await?;
    Ok(Json(program).into_response())
}

pub(crate) async fn update_program_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    body: Result<Json<ProgramUpdate>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_update_program(&state, &identity, body).await;
    finish(
        &state,
        "/api/admin/programs/update",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_update_program(
    state: &AppState,
    identity: &RequestIdentity,
    body: Result<Json<ProgramUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_admin(identity)?;
    let request = parse_body(body)?;
    let program = with_store(state, "program_update", move |conn| {
        update_program(conn, &request)
    })
    .await?;
    Ok(Json(json!({
        "message": "Program updated successfully",
        "program": program
    }))
    .into_response())
}

pub(crate) async fn review_queue_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_review_queue(&state, &identity, &params).await;
    finish(
        &state,
        "/api/admin/proposals",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_review_queue(
    state: &AppState,
    identity: &RequestIdentity,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    require_admin(identity)?;
    let status = parse_review_status_param(params)?;
    let proposals = with_store(state, "proposal_list", move |conn| {
        list_proposals(conn, status)
    })
    .await?;
    Ok(Json(proposals).into_response())
}

pub(crate) async fn review_proposal_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<RequestIdentity>,
    body: Result<Json<ProposalReviewRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let outcome = try_review_proposal(&state, &identity, body).await;
    finish(
        &state,
        "/api/admin/proposals/review",
        &request_id,
        started,
        outcome,
    )
    .await
}

async fn try_review_proposal(
    state: &AppState,
    identity: &RequestIdentity,
    body: Result<Json<ProposalReviewRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let admin_id = require_admin(identity)?.id;
    let request = parse_body(body)?;
    let action = request.action;
    let proposal = with_store(state, "proposal_review", move |conn| {
        review_proposal(
            conn,
            admin_id,
            request.proposal_id,
            action,
            request.admin_notes.as_deref(),
        )
    })
    .await?;
    let decided = if action == ReviewAction::Approve {
        "approved"
    } else {
        "rejected"
    };
    Ok(Json(json!({
        "message": format!("Program proposal {decided} successfully"),
        "proposal": proposal
    }))
    .into_response())
}
