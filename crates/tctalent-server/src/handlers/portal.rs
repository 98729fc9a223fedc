// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Candidate portal task assignment endpoints.
//!
//! Every endpoint acting on one assignment first checks that it belongs to
//! the logged-in candidate.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use tctalent_core::persistence::TaskAssignmentRecord;
use tracing::{info, instrument};

use super::{assignment_dto, assignment_dtos, read_multipart};
use crate::auth::CandidateUser;
use crate::dto::{
    CommentRequest, PortalUpdateTaskAssignmentRequest, TaskAssignmentDto,
    UpdateQuestionTaskAssignmentRequest, UpdateUploadTaskAssignmentRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// The assignment, if it belongs to `candidate`.
async fn owned_assignment(
    state: &AppState,
    candidate: &CandidateUser,
    id: i64,
) -> ApiResult<TaskAssignmentRecord> {
    let assignment = state.services.task_assignments.get(id).await?;
    if assignment.candidate_id != candidate.candidate_id {
        return Err(ApiError::unauthorised(format!(
            "Task assignment {} does not belong to the logged in candidate",
            id
        )));
    }
    Ok(assignment)
}

/// GET /api/portal/task-assignment
pub async fn list(
    State(state): State<AppState>,
    candidate: CandidateUser,
) -> ApiResult<Json<Vec<TaskAssignmentDto>>> {
    let assignments = state
        .services
        .task_assignments
        .list_candidate_assignments(candidate.candidate_id)
        .await?;
    Ok(Json(assignment_dtos(&state, assignments).await?))
}

/// POST /api/portal/task-assignment/{id}/complete-upload
#[instrument(skip(state, candidate, multipart), fields(candidate_id = candidate.candidate_id))]
pub async fn complete_upload(
    State(state): State<AppState>,
    candidate: CandidateUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<TaskAssignmentDto>> {
    // 1. Ownership before reading the body
    owned_assignment(&state, &candidate, id).await?;

    // 2. Files and metadata answers
    let (files, answers) = read_multipart(multipart).await?;
    info!(files = files.len(), answers = answers.len(), "Completing upload task");

    // 3. Complete
    let assignment = state
        .services
        .task_assignments
        .complete_upload_task(id, files, answers)
        .await?;
    Ok(Json(assignment_dto(&state, assignment).await?))
}

/// PUT /api/portal/task-assignment/{id}/upload
pub async fn update_upload(
    State(state): State<AppState>,
    candidate: CandidateUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUploadTaskAssignmentRequest>,
) -> ApiResult<Json<TaskAssignmentDto>> {
    let assignment = owned_assignment(&state, &candidate, id).await?;
    let assignment = state
        .services
        .task_assignments
        .update_upload_task_assignment(assignment, request.abandoned, request.candidate_notes, None)
        .await?;
    Ok(Json(assignment_dto(&state, assignment).await?))
}

/// PUT /api/portal/task-assignment/{id}/question
#[instrument(skip(state, candidate, request), fields(candidate_id = candidate.candidate_id))]
pub async fn update_question(
    State(state): State<AppState>,
    candidate: CandidateUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateQuestionTaskAssignmentRequest>,
) -> ApiResult<Json<TaskAssignmentDto>> {
    let assignment = owned_assignment(&state, &candidate, id).await?;
    let assignment = state
        .services
        .task_assignments
        .update_question_task(
            assignment,
            request.abandoned,
            request.answer,
            request.candidate_notes,
        )
        .await?;
    Ok(Json(assignment_dto(&state, assignment).await?))
}

/// PUT /api/portal/task-assignment/{id}
pub async fn update(
    State(state): State<AppState>,
    candidate: CandidateUser,
    Path(id): Path<i64>,
    Json(request): Json<PortalUpdateTaskAssignmentRequest>,
) -> ApiResult<Json<TaskAssignmentDto>> {
    let assignment = owned_assignment(&state, &candidate, id).await?;
    let completed = !request.abandoned && request.completed;
    let assignment = state
        .services
        .task_assignments
        .update(
            assignment,
            Some(completed),
            request.abandoned,
            request.candidate_notes,
            None,
        )
        .await?;
    Ok(Json(assignment_dto(&state, assignment).await?))
}

/// PUT /api/portal/task-assignment/{id}/comment
pub async fn comment(
    State(state): State<AppState>,
    candidate: CandidateUser,
    Path(id): Path<i64>,
    Json(request): Json<CommentRequest>,
) -> ApiResult<Json<TaskAssignmentDto>> {
    let assignment = owned_assignment(&state, &candidate, id).await?;
    let abandoned = assignment.abandoned_date.is_some();
    let assignment = state
        .services
        .task_assignments
        .update(assignment, None, abandoned, request.candidate_notes, None)
        .await?;
    Ok(Json(assignment_dto(&state, assignment).await?))
}
