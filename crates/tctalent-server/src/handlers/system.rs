// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Admin system endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use tracing::{error, info};

use crate::auth::AdminUser;
use crate::state::AppState;

/// POST /api/admin/system/sf-sync
///
/// Starts one Salesforce sync in the background and returns immediately.
pub async fn sf_sync(State(state): State<AppState>, admin: AdminUser) -> StatusCode {
    info!(user_id = admin.0.user_id, "Salesforce sync requested");
    let sync = state.sf_sync.clone();
    tokio::spawn(async move {
        if let Err(e) = sync.run_once().await {
            error!(error = %e, "Requested Salesforce sync failed");
        }
    });
    StatusCode::ACCEPTED
}
