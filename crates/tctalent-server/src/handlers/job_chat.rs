// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Admin job chat endpoints.

use axum::Json;
use axum::extract::{Path, State};

use crate::auth::AdminUser;
use crate::dto::{GetOrCreateJobChatRequest, JobChatDto};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/admin/job-chat/get-or-create
pub async fn get_or_create(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<GetOrCreateJobChatRequest>,
) -> ApiResult<Json<JobChatDto>> {
    let chat = state
        .services
        .job_chats
        .get_or_create_job_chat(
            request.chat_type,
            request.job_id,
            request.source_partner_id,
            request.candidate_id,
            Some(admin.0.user_id),
        )
        .await?;
    Ok(Json(chat.into()))
}

/// GET /api/admin/job-chat/{id}
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<JobChatDto>> {
    Ok(Json(state.services.job_chats.get_job_chat(id).await?.into()))
}
