// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker pulling job and candidate opportunities from Salesforce.
//!
//! Each run:
//! 1. Lists the open local jobs
//! 2. Refreshes them from Salesforce
//! 3. Loads the candidate opportunities of those jobs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::persistence::Persistence;
use crate::services::{CandidateOpportunityService, JobOppService};

/// Configuration for the Salesforce sync worker.
#[derive(Debug, Clone)]
pub struct SfSyncWorkerConfig {
    /// How often to sync.
    pub interval: Duration,
}

impl Default for SfSyncWorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 3600), // daily
        }
    }
}

/// Counts from one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub jobs_updated: usize,
    pub candidate_opps_loaded: usize,
}

/// One pass of the Salesforce sync. Shared by the worker and the admin API.
#[derive(Clone)]
pub struct SfSync {
    persistence: Arc<dyn Persistence>,
    job_opps: Arc<JobOppService>,
    candidate_opps: Arc<CandidateOpportunityService>,
}

impl SfSync {
    pub fn new(
        persistence: Arc<dyn Persistence>,
        job_opps: Arc<JobOppService>,
        candidate_opps: Arc<CandidateOpportunityService>,
    ) -> Self {
        Self {
            persistence,
            job_opps,
            candidate_opps,
        }
    }

    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<SyncSummary> {
        let ids: Vec<String> = self
            .persistence
            .list_open_job_opps()
            .await?
            .into_iter()
            .map(|job| job.sf_id)
            .collect();
        if ids.is_empty() {
            info!("No open jobs to sync");
            return Ok(SyncSummary::default());
        }

        let jobs_updated = self.job_opps.update_jobs(&ids).await?;
        let candidate_opps_loaded = self.candidate_opps.load_candidate_opportunities(&ids).await?;

        info!(jobs_updated, candidate_opps_loaded, "Salesforce sync complete");
        Ok(SyncSummary {
            jobs_updated,
            candidate_opps_loaded,
        })
    }
}

/// Background worker that runs [`SfSync`] periodically.
pub struct SfSyncWorker {
    sync: SfSync,
    config: SfSyncWorkerConfig,
    shutdown: Arc<Notify>,
}

impl SfSyncWorker {
    pub fn new(sync: SfSync, config: SfSyncWorkerConfig) -> Self {
        Self {
            sync,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the sync loop until shutdown is signalled. A failed run is logged
    /// and retried at the next interval.
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Salesforce sync worker started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Salesforce sync worker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.interval) => {
                    if let Err(e) = self.sync.run_once().await {
                        error!(error = %e, "Salesforce sync failed");
                    }
                }
            }
        }

        info!("Salesforce sync worker stopped");
    }
}
