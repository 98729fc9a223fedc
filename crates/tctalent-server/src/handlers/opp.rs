// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Admin candidate opportunity endpoints.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use tctalent_core::salesforce::CandidateOpportunityParams;
use tctalent_core::services::{CreateUpdateCandidateOppsRequest, SearchCandidateOppsRequest};
use tracing::instrument;

use super::read_multipart;
use crate::auth::AdminUser;
use crate::dto::{CandidateOppDto, PagedDto};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/admin/opp/{id}
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<CandidateOppDto>> {
    let opp = state
        .services
        .candidate_opps
        .get_candidate_opportunity(id)
        .await?;
    Ok(Json(opp.into()))
}

/// POST /api/admin/opp/search-paged
pub async fn search_paged(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<SearchCandidateOppsRequest>,
) -> ApiResult<Json<PagedDto<CandidateOppDto>>> {
    let page = state
        .services
        .candidate_opps
        .search_candidate_opportunities(&request, &admin.0.actor())
        .await?;
    Ok(Json(PagedDto::from_page(page, CandidateOppDto::from)))
}

/// PUT /api/admin/opp/{id}
#[instrument(skip(state, admin, params), fields(user_id = admin.0.user_id))]
pub async fn update(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    Json(params): Json<CandidateOpportunityParams>,
) -> ApiResult<Json<CandidateOppDto>> {
    let opp = state
        .services
        .candidate_opps
        .update_candidate_opportunity(id, params, Some(admin.0.user_id))
        .await?;
    Ok(Json(opp.into()))
}

/// POST /api/admin/opp/{id}/upload-offer
#[instrument(skip(state, admin, multipart), fields(user_id = admin.0.user_id))]
pub async fn upload_offer(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<CandidateOppDto>> {
    let (files, _) = read_multipart(multipart).await?;
    let file = files
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::invalid_request("Missing offer file"))?;

    let opp = state
        .services
        .candidate_opps
        .upload_offer(id, file, Some(admin.0.user_id))
        .await?;
    Ok(Json(opp.into()))
}

/// POST /api/admin/opp/create-update
#[instrument(skip(state, admin, request), fields(user_id = admin.0.user_id))]
pub async fn create_update(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<CreateUpdateCandidateOppsRequest>,
) -> ApiResult<()> {
    state
        .services
        .candidate_opps
        .create_update_candidate_opportunities(request, Some(admin.0.user_id))
        .await?;
    Ok(())
}
