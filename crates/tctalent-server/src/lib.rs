// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Talent Catalog Server - HTTP API
//!
//! JSON endpoints over the services of `tctalent-core`.
//!
//! # Routes
//!
//! | Prefix | Caller |
//! |--------|--------|
//! | `/health` | anyone |
//! | `/api/portal/...` | a candidate (token with a `candidateId` claim) |
//! | `/api/admin/...` | staff (any role except `user`) |
//!
//! See [`router`] for the full list.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

use handlers::{health, job_chat, opp, portal, system, task, task_assignment};

/// Largest accepted request body, for document uploads.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let portal = Router::new()
        .route("/task-assignment", get(portal::list))
        .route("/task-assignment/{id}", put(portal::update))
        .route("/task-assignment/{id}/upload", put(portal::update_upload))
        .route("/task-assignment/{id}/question", put(portal::update_question))
        .route("/task-assignment/{id}/comment", put(portal::comment))
        .route(
            "/task-assignment/{id}/complete-upload",
            post(portal::complete_upload),
        );

    let admin = Router::new()
        // Tasks
        .route("/task", get(task::list))
        .route("/task/search-paged", post(task::search_paged))
        .route("/task/{id}", get(task::get).put(task::update))
        // Task assignments
        .route("/task-assignment", post(task_assignment::create))
        .route("/task-assignment/list", post(task_assignment::list))
        .route(
            "/task-assignment/{id}",
            put(task_assignment::update).delete(task_assignment::delete),
        )
        .route(
            "/task-assignment/{id}/deactivate",
            put(task_assignment::deactivate),
        )
        // Candidate opportunities
        .route("/opp/search-paged", post(opp::search_paged))
        .route("/opp/create-update", post(opp::create_update))
        .route("/opp/{id}", get(opp::get).put(opp::update))
        .route("/opp/{id}/upload-offer", post(opp::upload_offer))
        // Job chats
        .route("/job-chat/get-or-create", post(job_chat::get_or_create))
        .route("/job-chat/{id}", get(job_chat::get))
        // System
        .route("/system/sf-sync", post(system::sf_sync));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/portal", portal)
        .nest("/api/admin", admin)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
