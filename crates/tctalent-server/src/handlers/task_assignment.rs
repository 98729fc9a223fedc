// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Admin task assignment endpoints.

use axum::Json;
use axum::extract::{Path, State};
use tracing::{info, instrument};

use super::{assignment_dto, assignment_dtos};
use crate::auth::AdminUser;
use crate::dto::{
    CreateTaskAssignmentRequest, ListTaskAssignmentsRequest, TaskAssignmentDto,
    UpdateTaskAssignmentRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/admin/task-assignment
///
/// Assigning to a saved list returns the first of the new assignments, or
/// null for an empty list.
#[instrument(skip(state, admin, request), fields(task_id = request.task_id))]
pub async fn create(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<CreateTaskAssignmentRequest>,
) -> ApiResult<Json<Option<TaskAssignmentDto>>> {
    let task = state.services.tasks.get(request.task_id).await?.task;
    let created = state
        .services
        .task_assignments
        .assign_task_to_candidate(
            Some(admin.0.user_id),
            &task,
            request.candidate_id,
            request.saved_list_id,
            request.due_date,
        )
        .await?;

    match created {
        Some(assignment) => Ok(Json(Some(assignment_dto(&state, assignment).await?))),
        None => {
            info!("Saved list is empty, nothing assigned");
            Ok(Json(None))
        }
    }
}

/// POST /api/admin/task-assignment/list
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<ListTaskAssignmentsRequest>,
) -> ApiResult<Json<Vec<TaskAssignmentDto>>> {
    let assignments = state
        .services
        .task_assignments
        .list_task_assignments(request.task_id, request.saved_list_id)
        .await?;
    Ok(Json(assignment_dtos(&state, assignments).await?))
}

/// PUT /api/admin/task-assignment/{id}
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTaskAssignmentRequest>,
) -> ApiResult<Json<TaskAssignmentDto>> {
    let assignment = state.services.task_assignments.get(id).await?;
    let assignment = state
        .services
        .task_assignments
        .update(
            assignment,
            request.completed,
            request.abandoned,
            request.candidate_notes,
            request.due_date,
        )
        .await?;
    Ok(Json(assignment_dto(&state, assignment).await?))
}

/// PUT /api/admin/task-assignment/{id}/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    state
        .services
        .task_assignments
        .deactivate(admin.0.user_id, id)
        .await?;
    Ok(())
}

/// DELETE /api/admin/task-assignment/{id}
pub async fn delete(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<bool>> {
    let deleted = state
        .services
        .task_assignments
        .delete(admin.0.user_id, id)
        .await?;
    Ok(Json(deleted))
}
