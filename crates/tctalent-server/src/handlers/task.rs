// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Admin task endpoints.

use axum::Json;
use axum::extract::{Path, State};
use tctalent_core::persistence::PageRequest;
use tctalent_core::services::TaskUpdate;
use tracing::instrument;

use crate::auth::AdminUser;
use crate::dto::{PagedDto, SearchTaskRequest, TaskDto, UpdateTaskRequest};
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// GET /api/admin/task
pub async fn list(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<TaskDto>>> {
    let tasks = state.services.tasks.list_tasks().await?;
    Ok(Json(tasks.into_iter().map(TaskDto::from).collect()))
}

/// POST /api/admin/task/search-paged
pub async fn search_paged(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<SearchTaskRequest>,
) -> ApiResult<Json<PagedDto<TaskDto>>> {
    let page = PageRequest::new(
        request.page_number,
        request.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    let found = state.services.tasks.search_tasks(request.keyword, page).await?;
    Ok(Json(PagedDto::from_page(found, TaskDto::from)))
}

/// GET /api/admin/task/{id}
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<TaskDto>> {
    Ok(Json(state.services.tasks.get(id).await?.into()))
}

/// PUT /api/admin/task/{id}
#[instrument(skip(state, admin, request), fields(user_id = admin.0.user_id))]
pub async fn update(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskDto>> {
    let update = TaskUpdate {
        display_name: request.display_name,
        description: request.description,
        days_to_complete: request.days_to_complete,
        help_link: request.help_link,
        optional: request.optional,
    };
    let task = state.services.tasks.update(id, update, admin.0.user_id).await?;
    Ok(Json(task.into()))
}
