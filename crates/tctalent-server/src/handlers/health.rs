// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Health check.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::dto::HealthDto;
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthDto> {
    let healthy = match state.services.persistence.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(HealthDto {
        healthy,
        version: env!("CARGO_PKG_VERSION"),
        uptime_ms: state.start_time.elapsed().as_millis() as u64,
    })
}
