// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared handler state.

use std::sync::Arc;
use std::time::Instant;

use tctalent_core::drive::FileSystemService;
use tctalent_core::persistence::Persistence;
use tctalent_core::salesforce::SalesforceService;
use tctalent_core::services::Services;
use tctalent_core::sync::SfSync;

use crate::auth::JwtKeys;

/// State shared by all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub sf_sync: SfSync,
    pub jwt: Arc<JwtKeys>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        persistence: Arc<dyn Persistence>,
        salesforce: Arc<dyn SalesforceService>,
        drive: Arc<dyn FileSystemService>,
        jwt_secret: &str,
    ) -> Self {
        let services = Services::new(persistence.clone(), salesforce, drive);
        let sf_sync = SfSync::new(
            persistence,
            services.job_opps.clone(),
            services.candidate_opps.clone(),
        );
        Self {
            services,
            sf_sync,
            jwt: Arc::new(JwtKeys::new(jwt_secret)),
            start_time: Instant::now(),
        }
    }
}
