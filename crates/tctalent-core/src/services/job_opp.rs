// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Local copies of Salesforce job opportunities.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, TimeZone, Utc};
use tracing::{error, info, instrument};

use crate::error::{CoreError, Result};
use crate::model::JobOpportunityStage;
use crate::persistence::{JobOppRecord, Persistence};
use crate::salesforce::{Opportunity, SalesforceService, helper};

/// Jobs created before publishing existed count as published on creation.
static FIRST_PUBLISHED_JOB_DATE: LazyLock<DateTime<Utc>> = LazyLock::new(|| {
    Utc.with_ymd_and_hms(2022, 11, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
});

/// Jobs fetched from Salesforce per request.
const UPDATE_CHUNK_SIZE: usize = 100;

pub struct JobOppService {
    persistence: Arc<dyn Persistence>,
    salesforce: Arc<dyn SalesforceService>,
}

impl JobOppService {
    pub fn new(persistence: Arc<dyn Persistence>, salesforce: Arc<dyn SalesforceService>) -> Self {
        Self {
            persistence,
            salesforce,
        }
    }

    pub async fn get_job_opp(&self, id: i64) -> Result<JobOppRecord> {
        self.persistence
            .get_job_opp(id)
            .await?
            .ok_or_else(|| CoreError::no_such_object("SalesforceJobOpp", id))
    }

    pub async fn get_job_opp_by_sf_id(&self, sf_id: &str) -> Result<Option<JobOppRecord>> {
        self.persistence.find_job_opp_by_sf_id(sf_id).await
    }

    /// Job whose Salesforce id is embedded in `url`.
    pub async fn get_job_opp_by_url(&self, url: &str) -> Result<Option<JobOppRecord>> {
        match helper::extract_id_from_sf_url(url) {
            Some(sf_id) => self.get_job_opp_by_sf_id(&sf_id).await,
            None => Ok(None),
        }
    }

    /// Create the local copy of a Salesforce job opportunity.
    #[instrument(skip(self))]
    pub async fn create_job_opp(&self, sf_id: &str) -> Result<JobOppRecord> {
        let op = self
            .salesforce
            .fetch_job_opportunity(sf_id)
            .await?
            .ok_or_else(|| {
                CoreError::invalid_request(format!("No Salesforce opportunity with id: {}", sf_id))
            })?;

        let mut job = JobOppRecord::new(sf_id);
        copy_opportunity_to_job_opp(&op, &mut job);
        job.id = self.persistence.insert_job_opp(&job).await?;
        Ok(job)
    }

    /// Local job for `sf_id`, created from Salesforce when missing.
    /// A blank id gives `None`.
    pub async fn get_or_create_job_opp_from_id(&self, sf_id: &str) -> Result<Option<JobOppRecord>> {
        let sf_id = sf_id.trim();
        if sf_id.is_empty() {
            return Ok(None);
        }
        if let Some(job) = self.get_job_opp_by_sf_id(sf_id).await? {
            return Ok(Some(job));
        }

        let job = self.create_job_opp(sf_id).await?;
        info!(job_id = job.id, name = ?job.name, "Created job from Salesforce id");
        Ok(Some(job))
    }

    /// Like [`Self::get_or_create_job_opp_from_id`], taking a Salesforce link.
    pub async fn get_or_create_job_opp_from_link(
        &self,
        link: &str,
    ) -> Result<Option<JobOppRecord>> {
        if link.trim().is_empty() {
            return Ok(None);
        }
        let sf_id = helper::extract_id_from_sf_url(link).ok_or_else(|| {
            CoreError::invalid_request(format!(
                "Not a valid link to a Salesforce opportunity: {}",
                link
            ))
        })?;
        self.get_or_create_job_opp_from_id(&sf_id).await
    }

    /// Refresh the job from Salesforce, when Salesforce still has it, and
    /// save it.
    #[instrument(skip(self, job), fields(sf_id = %job.sf_id))]
    pub async fn update_job(&self, mut job: JobOppRecord) -> Result<JobOppRecord> {
        if let Some(op) = self.salesforce.fetch_job_opportunity(&job.sf_id).await? {
            copy_opportunity_to_job_opp(&op, &mut job);
        }
        self.persistence.save_job_opp(&job).await?;
        Ok(job)
    }

    /// Refresh the local jobs with the given Salesforce ids. Ids without a
    /// local job are ignored. Returns the number of jobs updated.
    #[instrument(skip(self, sf_ids), fields(job_count = sf_ids.len()))]
    pub async fn update_jobs(&self, sf_ids: &[String]) -> Result<usize> {
        let mut updated = 0;
        for chunk in sf_ids.chunks(UPDATE_CHUNK_SIZE) {
            let ops = self.salesforce.fetch_job_opportunities_by_id(chunk).await?;
            for op in ops {
                let Some(mut job) = self.persistence.find_job_opp_by_sf_id(&op.id).await? else {
                    continue;
                };
                copy_opportunity_to_job_opp(&op, &mut job);
                self.persistence.save_job_opp(&job).await?;
                updated += 1;
            }
        }
        info!(updated, "Refreshed jobs from Salesforce");
        Ok(updated)
    }
}

/// Copy Salesforce fields onto the local job. Undecodable values are logged
/// and skipped.
fn copy_opportunity_to_job_opp(op: &Opportunity, job: &mut JobOppRecord) {
    job.name = op.name.clone();
    job.account_id = op.account_id.clone();
    job.owner_id = op.owner_id.clone();
    job.country = op.account_country.clone();
    job.closed = op.is_closed;
    job.won = op.is_won;
    job.closing_comments = op.closing_comments.clone();
    job.next_step = op.next_step.clone();
    job.hiring_commitment = op.hiring_commitment.map(|h| h as i64);
    job.opportunity_score = op.opportunity_score.clone();

    let stage_name = op.stage_name.as_deref().unwrap_or_default();
    job.stage = JobOpportunityStage::text_to_enum(stage_name).unwrap_or_else(|e| {
        error!(sf_id = %op.id, stage = stage_name, error = %e, "Error decoding job stage");
        JobOpportunityStage::Prospect
    });

    if let Some(due) = op.next_step_due_date.as_deref() {
        match helper::parse_salesforce_date(due) {
            Ok(date) => job.next_step_due_date = Some(date),
            Err(e) => error!(sf_id = %op.id, value = due, error = %e, "Error decoding nextStepDueDate"),
        }
    }

    if let Some(created) = op.created_date.as_deref() {
        match helper::parse_salesforce_offset_date_time(created) {
            Ok(date) => {
                job.created_date = Some(date);
                if job.published_date.is_none() && date < *FIRST_PUBLISHED_JOB_DATE {
                    job.published_date = Some(date);
                }
            }
            Err(e) => error!(sf_id = %op.id, value = created, error = %e, "Error decoding createdDate"),
        }
    }

    if let Some(modified) = op.last_modified_date.as_deref() {
        match helper::parse_salesforce_offset_date_time(modified) {
            Ok(date) => job.updated_date = Some(date),
            Err(e) => {
                error!(sf_id = %op.id, value = modified, error = %e, "Error decoding lastModifiedDate")
            }
        }
    }
}
