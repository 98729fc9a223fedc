// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Talent Catalog Core - candidates, tasks and job opportunities
//!
//! This crate holds the domain of the Talent Catalog server: candidates and
//! their documents, the tasks assigned to them, job opportunities and the
//! candidate opportunities linking the two. Salesforce is the system of
//! record for opportunities; this crate pushes changes to it and pulls them
//! back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               tctalent-server                 │
//! │        /api/portal        /api/admin          │
//! └──────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │                  services                     │
//! │  tasks · task assignments · candidates        │
//! │  job opps · candidate opps · job chats        │
//! └──────────────────────────────────────────────┘
//!        │                 │                │
//!        ▼                 ▼                ▼
//! ┌─────────────┐  ┌───────────────┐  ┌────────────┐
//! │ persistence │  │  salesforce   │  │   drive    │
//! │ PG / SQLite │  │  REST + JWT   │  │ documents  │
//! └─────────────┘  └───────────────┘  └────────────┘
//! ```
//!
//! # Task assignment lifecycle
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | assign | One assignment per candidate, due date from the task |
//! | update | Notes, due date, completion or abandonment |
//! | complete | Runs the task type's processor, then any follow-up tasks |
//! | deactivate | Status becomes inactive, deactivation audit recorded |
//! | delete | Status becomes deleted |
//!
//! # Modules
//!
//! - [`config`]: Configuration from environment variables
//! - [`drive`]: Candidate document storage
//! - [`error`]: Error types with API error codes
//! - [`migrations`]: Embedded schema for PostgreSQL and SQLite
//! - [`model`]: Domain enums
//! - [`persistence`]: Storage trait and its backends
//! - [`salesforce`]: Salesforce REST client and a mock for tests
//! - [`services`]: Domain services
//! - [`sync`]: Periodic Salesforce sync

pub mod config;
pub mod drive;
pub mod error;
pub mod migrations;
pub mod model;
pub mod persistence;
pub mod salesforce;
pub mod services;
pub mod sync;

pub use error::{CoreError, Result};
