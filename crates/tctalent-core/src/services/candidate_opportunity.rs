// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Candidate opportunities and their Salesforce mirror.
//!
//! Salesforce is the source of truth. Changes are pushed there first and
//! then applied to the local records; the sync worker pulls remote changes
//! back with [`CandidateOpportunityService::load_candidate_opportunities`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Days, TimeDelta, Utc};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use super::candidates::CandidateService;
use super::job_chat::JobChatService;
use super::job_opp::JobOppService;
use super::task_processor::UploadedFile;
use super::Actor;
use crate::drive::FileSystemService;
use crate::error::{CoreError, Result};
use crate::model::{CandidateOpportunityStage, CandidateStatus, JobChatType};
use crate::persistence::{
    CandidateOppFilter, CandidateOppRecord, CandidateRecord, JobOppRecord, OppSortField, Page,
    PageRequest, Persistence,
};
use crate::salesforce::{
    CandidateOpportunityParams, Opportunity, SalesforceService, SfCandidate, helper,
};

/// Jobs whose candidate opportunities are fetched per Salesforce query.
const LOAD_CHUNK_SIZE: usize = 10;

/// A job refreshed more recently than this is not fetched again before
/// pushing candidate opportunities.
const JOB_REFRESH_AGE: TimeDelta = TimeDelta::minutes(3);

const INITIAL_NEXT_STEP: &str = "Contact candidate and do intake";
const INITIAL_NEXT_STEP_DAYS: u64 = 14;

/// Batch create or update of candidate opportunities for one job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUpdateCandidateOppsRequest {
    pub candidate_ids: Vec<i64>,
    #[serde(default)]
    pub sf_job_opp_id: Option<String>,
    #[serde(default)]
    pub candidate_opp_params: Option<CandidateOpportunityParams>,
}

/// Whose opportunities a search is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum OppOwnership {
    #[serde(rename = "AS_SOURCE_PARTNER")]
    AsSourcePartner,
    #[serde(rename = "AS_JOB_CREATOR")]
    AsJobCreator,
}

/// Candidate opportunity search criteria.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCandidateOppsRequest {
    pub keyword: Option<String>,
    pub stages: Vec<CandidateOpportunityStage>,
    pub active_stages: bool,
    pub sf_opp_closed: Option<bool>,
    pub overdue: bool,
    pub ownership_type: Option<OppOwnership>,
    pub owned_by_me: bool,
    pub owned_by_my_partner: bool,
    pub sort_fields: Vec<String>,
    pub sort_direction: Option<String>,
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for SearchCandidateOppsRequest {
    fn default() -> Self {
        Self {
            keyword: None,
            stages: Vec::new(),
            active_stages: false,
            sf_opp_closed: None,
            overdue: false,
            ownership_type: None,
            owned_by_me: false,
            owned_by_my_partner: false,
            sort_fields: Vec::new(),
            sort_direction: None,
            page_number: 0,
            page_size: 20,
        }
    }
}

pub struct CandidateOpportunityService {
    persistence: Arc<dyn Persistence>,
    salesforce: Arc<dyn SalesforceService>,
    drive: Arc<dyn FileSystemService>,
    candidates: Arc<CandidateService>,
    job_opps: Arc<JobOppService>,
    job_chats: Arc<JobChatService>,
}

impl CandidateOpportunityService {
    pub fn new(
        persistence: Arc<dyn Persistence>,
        salesforce: Arc<dyn SalesforceService>,
        drive: Arc<dyn FileSystemService>,
        candidates: Arc<CandidateService>,
        job_opps: Arc<JobOppService>,
        job_chats: Arc<JobChatService>,
    ) -> Self {
        Self {
            persistence,
            salesforce,
            drive,
            candidates,
            job_opps,
            job_chats,
        }
    }

    // ========================================================================
    // Push to Salesforce
    // ========================================================================

    /// Create or update the opportunities of the requested candidates for
    /// the requested job, in Salesforce and locally.
    #[instrument(skip(self, request), fields(candidate_count = request.candidate_ids.len()))]
    pub async fn create_update_candidate_opportunities(
        &self,
        request: CreateUpdateCandidateOppsRequest,
        user_id: Option<i64>,
    ) -> Result<()> {
        let candidates = self.candidates.find_by_ids(&request.candidate_ids).await?;
        let job = match request.sf_job_opp_id.as_deref() {
            Some(sf_id) => self.job_opps.get_or_create_job_opp_from_id(sf_id).await?,
            None => None,
        };
        self.push_candidate_opportunities(
            &candidates,
            job,
            request.candidate_opp_params.as_ref(),
            user_id,
        )
        .await
    }

    async fn push_candidate_opportunities(
        &self,
        candidates: &[CandidateRecord],
        job: Option<JobOppRecord>,
        params: Option<&CandidateOpportunityParams>,
        user_id: Option<i64>,
    ) -> Result<()> {
        // 1. Contacts, in candidate order
        let mut sf_candidates = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            sf_candidates.push(self.sf_candidate(candidate).await?);
        }
        let contact_ids = self
            .salesforce
            .create_or_update_contacts(&sf_candidates)
            .await?;
        for ((candidate, sf_candidate), contact_id) in
            candidates.iter().zip(sf_candidates.iter_mut()).zip(contact_ids)
        {
            if let Some(contact_id) = contact_id {
                let link = self.salesforce.contact_link(&contact_id);
                self.candidates
                    .update_salesforce_link(candidate.id, &link)
                    .await?;
                sf_candidate.contact_id = Some(contact_id);
            }
        }

        let Some(mut job) = job else {
            return Ok(());
        };

        // 2. Make sure the job is current
        let stale = job
            .updated_date
            .is_none_or(|updated| Utc::now() - updated >= JOB_REFRESH_AGE);
        if stale {
            job = self.job_opps.update_job(job).await?;
        }

        // 3. Salesforce first, so new local opps can pick up their ids
        self.salesforce
            .create_or_update_candidate_opportunities(&sf_candidates, params, &job)
            .await?;
        for candidate in candidates {
            self.create_or_update_local_opp(candidate, params, &job, user_id)
                .await?;
        }

        // 4. Stage driven status changes
        if let Some(stage) = params.and_then(|p| p.stage) {
            self.perform_auto_stage_related_status_updates(&job, candidates, stage)
                .await?;
        }

        info!(job = %job.sf_id, "Pushed candidate opportunities");
        Ok(())
    }

    async fn sf_candidate(&self, candidate: &CandidateRecord) -> Result<SfCandidate> {
        let partner_sf_id = match candidate.partner_id {
            Some(partner_id) => self
                .persistence
                .get_partner(partner_id)
                .await?
                .and_then(|p| p.sf_id),
            None => None,
        };
        Ok(SfCandidate {
            candidate_number: candidate.candidate_number.clone(),
            first_name: candidate.first_name.clone(),
            last_name: candidate.last_name.clone(),
            email: candidate.email.clone(),
            status: candidate.status,
            contact_id: candidate
                .sf_link
                .as_deref()
                .and_then(helper::extract_id_from_sf_url),
            partner_sf_id,
        })
    }

    async fn create_or_update_local_opp(
        &self,
        candidate: &CandidateRecord,
        params: Option<&CandidateOpportunityParams>,
        job: &JobOppRecord,
        user_id: Option<i64>,
    ) -> Result<CandidateOppRecord> {
        let now = Utc::now();
        let existing = self.find_opp(candidate.id, job.id).await?;
        let create = existing.is_none();

        let mut opp = match existing {
            Some(opp) => opp,
            None => {
                let sf_id = self
                    .salesforce
                    .find_candidate_opportunity(&candidate.candidate_number, &job.sf_id)
                    .await?
                    .map(|o| o.id);
                if sf_id.is_none() {
                    error!(
                        candidate_number = %candidate.candidate_number,
                        job = %job.sf_id,
                        "Could not find Salesforce candidate opportunity"
                    );
                }
                CandidateOppRecord {
                    sf_id,
                    candidate_id: Some(candidate.id),
                    job_opp_id: Some(job.id),
                    name: Some(self.salesforce.generate_candidate_opp_name(
                        candidate.first_name.as_deref(),
                        &candidate.candidate_number,
                        job.name.as_deref(),
                    )),
                    stage: CandidateOpportunityStage::Prospect,
                    next_step: Some(INITIAL_NEXT_STEP.to_string()),
                    next_step_due_date: now
                        .date_naive()
                        .checked_add_days(Days::new(INITIAL_NEXT_STEP_DAYS)),
                    created_by: user_id,
                    created_date: Some(now),
                    ..Default::default()
                }
            }
        };

        opp.updated_by = user_id;
        opp.updated_date = Some(now);
        if let Some(params) = params {
            apply_params(&mut opp, params);
        }

        if create {
            opp.id = self.persistence.insert_candidate_opp(&opp).await?;
            self.job_chats
                .create_candidate_opp_chat(JobChatType::CandidateProspect, &opp, user_id)
                .await?;
            self.job_chats
                .create_candidate_opp_chat(JobChatType::CandidateRecruiting, &opp, user_id)
                .await?;
        } else {
            self.persistence.save_candidate_opp(&opp).await?;
        }
        Ok(opp)
    }

    async fn perform_auto_stage_related_status_updates(
        &self,
        job: &JobOppRecord,
        candidates: &[CandidateRecord],
        stage: CandidateOpportunityStage,
    ) -> Result<()> {
        for candidate in candidates {
            let Some(status) = status_for_stage(stage, candidate.status) else {
                continue;
            };
            let comment = format!(
                "Status changed automatically due to candidate's stage in the '{}' job opportunity changing to '{}'",
                job.name.as_deref().unwrap_or_default(),
                stage
            );
            self.candidates
                .update_status(candidate, status, Some(&comment), None)
                .await?;
        }
        Ok(())
    }

    /// Push `params` for the opportunity's candidate and job, then return
    /// the updated opportunity.
    #[instrument(skip(self, params))]
    pub async fn update_candidate_opportunity(
        &self,
        id: i64,
        params: CandidateOpportunityParams,
        user_id: Option<i64>,
    ) -> Result<CandidateOppRecord> {
        let opp = self.get_candidate_opportunity(id).await?;
        let candidate_id = opp.candidate_id.ok_or_else(|| {
            CoreError::invalid_request(format!(
                "Opportunity {} does not have candidate associated.",
                id
            ))
        })?;
        let job_opp_id = opp.job_opp_id.ok_or_else(|| {
            CoreError::invalid_request(format!("Opportunity {} does not have a job associated.", id))
        })?;

        let candidate = self.candidates.get(candidate_id).await?;
        let job = self.job_opps.get_job_opp(job_opp_id).await?;
        self.push_candidate_opportunities(&[candidate], Some(job), Some(&params), user_id)
            .await?;
        self.get_candidate_opportunity(id).await
    }

    // ========================================================================
    // Pull from Salesforce
    // ========================================================================

    /// Load the candidate opportunities of the given jobs from Salesforce.
    /// Jobs are not created; opps of unknown jobs keep no job reference.
    /// Returns the number of opportunities loaded.
    #[instrument(skip(self, job_sf_ids))]
    pub async fn load_candidate_opportunities(&self, job_sf_ids: &[String]) -> Result<usize> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = job_sf_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        info!(jobs = ids.len(), "Updating candidate opportunities from Salesforce");

        let mut loaded = 0;
        for (index, chunk) in ids.chunks(LOAD_CHUNK_SIZE).enumerate() {
            let ops = self
                .salesforce
                .find_candidate_opportunities_by_job_opps(chunk)
                .await?;
            info!(
                chunk = index,
                opportunities = ops.len(),
                "Loaded candidate opportunities from Salesforce"
            );
            for op in &ops {
                self.load_opportunity(op, false).await?;
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Store one Salesforce candidate opportunity locally, creating its job
    /// if needed.
    pub async fn load_candidate_opportunity(&self, op: &Opportunity) -> Result<CandidateOppRecord> {
        self.load_opportunity(op, true).await
    }

    async fn load_opportunity(&self, op: &Opportunity, create_job: bool) -> Result<CandidateOppRecord> {
        let existing = self.persistence.find_candidate_opp_by_sf_id(&op.id).await?;
        let create = existing.is_none();
        let mut opp = existing.unwrap_or_default();

        // Job
        let parent = op.parent_opportunity_id.as_deref().unwrap_or_default();
        let job = if create_job {
            self.job_opps.get_or_create_job_opp_from_id(parent).await?
        } else {
            self.job_opps.get_job_opp_by_sf_id(parent).await?
        };
        if job.is_none() {
            error!(job = parent, opp = ?op.name, "Could not find job opp");
        }
        opp.job_opp_id = job.map(|j| j.id);

        // Candidate
        let candidate = match op.candidate_id.as_deref() {
            Some(number) => self.candidates.find_by_candidate_number(number).await?,
            None => None,
        };
        if candidate.is_none() {
            error!(candidate_number = ?op.candidate_id, opp = ?op.name, "Could not find candidate");
        }
        opp.candidate_id = candidate.map(|c| c.id);

        copy_opportunity_to_candidate_opp(op, &mut opp);

        if create {
            opp.id = self.persistence.insert_candidate_opp(&opp).await?;
        } else {
            self.persistence.save_candidate_opp(&opp).await?;
        }
        Ok(opp)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_candidate_opportunity(&self, id: i64) -> Result<CandidateOppRecord> {
        self.persistence
            .get_candidate_opp(id)
            .await?
            .ok_or_else(|| CoreError::no_such_object("CandidateOpportunity", id))
    }

    pub async fn find_opp(
        &self,
        candidate_id: i64,
        job_opp_id: i64,
    ) -> Result<Option<CandidateOppRecord>> {
        self.persistence
            .find_candidate_opp(candidate_id, job_opp_id)
            .await
    }

    pub async fn search_candidate_opportunities(
        &self,
        request: &SearchCandidateOppsRequest,
        actor: &Actor,
    ) -> Result<Page<CandidateOppRecord>> {
        let mut filter = CandidateOppFilter {
            keyword: request.keyword.clone(),
            stages: request.stages.clone(),
            active_stages: request.active_stages,
            sf_opp_closed: request.sf_opp_closed,
            overdue_before: request.overdue.then(|| Utc::now().date_naive()),
            sort: sort_order(request)?,
            ..Default::default()
        };

        // Ownership needs the caller's partner
        if let Some(ownership) = request.ownership_type
            && let Some(partner_id) = actor.partner_id
            && let Some(partner) = self.persistence.get_partner(partner_id).await?
        {
            match ownership {
                OppOwnership::AsJobCreator => {
                    if request.owned_by_my_partner {
                        filter.job_creator_id = Some(partner.id);
                    } else if request.owned_by_me {
                        filter.job_owner_user_id = Some(actor.user_id);
                    }
                }
                OppOwnership::AsSourcePartner => {
                    if partner.source_partner
                        && (request.owned_by_my_partner || request.owned_by_me)
                    {
                        filter.candidate_partner_id = Some(partner.id);
                    }
                }
            }
        }

        self.persistence
            .search_candidate_opps(
                &filter,
                PageRequest::new(request.page_number, request.page_size),
            )
            .await
    }

    // ========================================================================
    // Offers
    // ========================================================================

    /// Store a job offer in the candidate's folder and link it from the
    /// opportunity.
    #[instrument(skip(self, file), fields(file = %file.name))]
    pub async fn upload_offer(
        &self,
        id: i64,
        file: UploadedFile,
        user_id: Option<i64>,
    ) -> Result<CandidateOppRecord> {
        let mut opp = self.get_candidate_opportunity(id).await?;
        let candidate_id = opp.candidate_id.ok_or_else(|| {
            CoreError::invalid_request(format!(
                "Opportunity {} does not have candidate associated.",
                id
            ))
        })?;

        let candidate = self.candidates.get(candidate_id).await?;
        let folder = self.candidates.create_candidate_folder(&candidate).await?;
        let stored = self
            .drive
            .upload_file(&folder, &file.name, &file.content)
            .await?;

        opp.file_offer_link = Some(stored.url);
        opp.file_offer_name = Some(stored.name);
        opp.updated_by = user_id;
        opp.updated_date = Some(Utc::now());
        self.persistence.save_candidate_opp(&opp).await?;
        Ok(opp)
    }
}

/// Candidate status implied by moving to `stage`, if it differs from the
/// current one.
fn status_for_stage(
    stage: CandidateOpportunityStage,
    current: CandidateStatus,
) -> Option<CandidateStatus> {
    let implied = if stage.is_employed() {
        CandidateStatus::Employed
    } else if stage == CandidateOpportunityStage::NotEligibleForTC {
        CandidateStatus::Ineligible
    } else if stage == CandidateOpportunityStage::RelocatedNoJobOfferPathway {
        CandidateStatus::RelocatedIndependently
    } else {
        return None;
    };
    (implied != current).then_some(implied)
}

fn apply_params(opp: &mut CandidateOppRecord, params: &CandidateOpportunityParams) {
    if let Some(stage) = params.stage {
        opp.stage = stage;
        opp.closed = stage.is_closed();
        opp.won = stage.is_won();
    }
    opp.next_step = params.next_step.clone();
    opp.next_step_due_date = params.next_step_due_date;
    opp.closing_comments = params.closing_comments.clone();
    opp.closing_comments_for_candidate = params.closing_comments_for_candidate.clone();
    opp.employer_feedback = params.employer_feedback.clone();
}

fn copy_opportunity_to_candidate_opp(op: &Opportunity, opp: &mut CandidateOppRecord) {
    opp.sf_id = Some(op.id.clone());
    opp.name = op.name.clone();
    opp.closed = op.is_closed;
    opp.won = op.is_won;
    opp.next_step = op.next_step.clone();
    opp.closing_comments = op.closing_comments.clone();
    opp.closing_comments_for_candidate = op.closing_comments_for_candidate.clone();
    opp.employer_feedback = op.employer_feedback.clone();

    let stage_name = op.stage_name.as_deref().unwrap_or_default();
    opp.stage = CandidateOpportunityStage::text_to_enum(stage_name).unwrap_or_else(|e| {
        error!(sf_id = %op.id, stage = stage_name, error = %e, "Error decoding stage in load");
        CandidateOpportunityStage::Prospect
    });

    if let Some(due) = op.next_step_due_date.as_deref() {
        match helper::parse_salesforce_date(due) {
            Ok(date) => opp.next_step_due_date = Some(date),
            Err(e) => warn!(sf_id = %op.id, value = due, error = %e, "Error decoding nextStepDueDate"),
        }
    }
    if let Some(created) = op.created_date.as_deref() {
        match helper::parse_salesforce_offset_date_time(created) {
            Ok(date) => opp.created_date = Some(date),
            Err(e) => warn!(sf_id = %op.id, value = created, error = %e, "Error decoding createdDate"),
        }
    }
    if let Some(modified) = op.last_modified_date.as_deref() {
        match helper::parse_salesforce_offset_date_time(modified) {
            Ok(date) => opp.updated_date = Some(date),
            Err(e) => {
                warn!(sf_id = %op.id, value = modified, error = %e, "Error decoding lastModifiedDate")
            }
        }
    }
}

fn sort_order(request: &SearchCandidateOppsRequest) -> Result<Vec<(OppSortField, bool)>> {
    let ascending = !request
        .sort_direction
        .as_deref()
        .is_some_and(|d| d.eq_ignore_ascii_case("desc"));
    request
        .sort_fields
        .iter()
        .map(|name| {
            OppSortField::from_name(name)
                .map(|field| (field, ascending))
                .ok_or_else(|| CoreError::invalid_request(format!("Unknown sort field: {}", name)))
        })
        .collect()
}
