//! Problem report endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::problem::{Problem, ProblemTriage, SubmitReport, UpdateProblemStatus},
    AppState,
};

use super::AuthenticatedUser;

/// Report a problem with a bike
#[utoipa::path(
    post,
    path = "/problems",
    tag = "problems",
    security(("bearer_auth" = [])),
    request_body = SubmitReport,
    responses(
        (status = 201, description = "Report filed", body = Problem),
        (status = 400, description = "Invalid bike number or empty description")
    )
)]
pub async fn submit_report(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<SubmitReport>,
) -> AppResult<(StatusCode, Json<Problem>)> {
    let problem = state.services.problems.submit_report(request, &claims).await?;
    Ok((StatusCode::CREATED, Json(problem)))
}

/// All reports (admin)
#[utoipa::path(
    get,
    path = "/problems",
    tag = "problems",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reports", body = Vec<Problem>),
        (status = 403, description = "Administrator only")
    )
)]
pub async fn list_problems(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Problem>>> {
    claims.require_admin()?;
    Ok(Json(state.services.problems.list_problems().await?))
}

/// Triage a report (admin)
#[utoipa::path(
    put,
    path = "/problems/{id}/status",
    tag = "problems",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Problem ID")),
    request_body = UpdateProblemStatus,
    responses(
        (status = 200, description = "Report updated", body = ProblemTriage),
        (status = 404, description = "Report not found"),
        (status = 422, description = "Report already closed")
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateProblemStatus>,
) -> AppResult<Json<ProblemTriage>> {
    claims.require_admin()?;
    let outcome = state
        .services
        .problems
        .update_problem_status(id, request.status)
        .await?;
    Ok(Json(outcome))
}

/// Delete a report (admin)
#[utoipa::path(
    delete,
    path = "/problems/{id}",
    tag = "problems",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Problem ID")),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 404, description = "Report not found")
    )
)]
pub async fn delete_problem(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.problems.delete_problem(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
