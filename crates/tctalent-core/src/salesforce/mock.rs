// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory Salesforce org for tests and local development.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::helper;
use super::types::{CandidateOpportunityParams, Opportunity, SfCandidate};
use super::{SalesforceError, SalesforceService};
use crate::persistence::JobOppRecord;

/// One recorded candidate opportunity upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct OppUpsertCall {
    pub candidate_numbers: Vec<String>,
    pub params: Option<CandidateOpportunityParams>,
    pub job_sf_id: String,
}

#[derive(Debug, Default)]
struct MockState {
    job_opps: HashMap<String, Opportunity>,
    candidate_opps: Vec<Opportunity>,
    contacts: HashMap<String, String>,
    rejected_contacts: Vec<String>,
    contact_upserts: usize,
    opp_upserts: Vec<OppUpsertCall>,
    failure: Option<String>,
    next_id: u64,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}MOCK{:011}", prefix, self.next_id)
    }

    fn check_failure(&self) -> Result<(), SalesforceError> {
        match &self.failure {
            Some(message) => Err(SalesforceError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}

/// [`SalesforceService`] backed by in-memory maps.
///
/// Contact and candidate opportunity upserts behave like the real org:
/// missing records are created with generated ids and existing ones are
/// updated in place.
#[derive(Debug, Default)]
pub struct MockSalesforce {
    state: Mutex<MockState>,
}

impl MockSalesforce {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a job opportunity.
    pub fn add_job_opportunity(&self, opp: Opportunity) {
        self.state().job_opps.insert(opp.id.clone(), opp);
    }

    /// Register a candidate opportunity.
    pub fn add_candidate_opportunity(&self, opp: Opportunity) {
        self.state().candidate_opps.push(opp);
    }

    /// Make every following call fail with the given message, or succeed
    /// again with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        self.state().failure = message.map(str::to_string);
    }

    /// Reject contact upserts for the given candidate number.
    pub fn reject_contact(&self, candidate_number: &str) {
        self.state()
            .rejected_contacts
            .push(candidate_number.to_string());
    }

    /// Number of contact upsert calls made.
    pub fn contact_upserts(&self) -> usize {
        self.state().contact_upserts
    }

    /// Candidate opportunity upsert calls made, oldest first.
    pub fn opp_upserts(&self) -> Vec<OppUpsertCall> {
        self.state().opp_upserts.clone()
    }

    /// All candidate opportunities currently in the org.
    pub fn candidate_opportunities(&self) -> Vec<Opportunity> {
        self.state().candidate_opps.clone()
    }
}

#[async_trait]
impl SalesforceService for MockSalesforce {
    async fn fetch_job_opportunity(
        &self,
        sf_id: &str,
    ) -> Result<Option<Opportunity>, SalesforceError> {
        let state = self.state();
        state.check_failure()?;
        Ok(state.job_opps.get(sf_id).cloned())
    }

    async fn fetch_job_opportunities_by_id(
        &self,
        sf_ids: &[String],
    ) -> Result<Vec<Opportunity>, SalesforceError> {
        let state = self.state();
        state.check_failure()?;
        Ok(sf_ids
            .iter()
            .filter_map(|id| state.job_opps.get(id).cloned())
            .collect())
    }

    async fn find_candidate_opportunity(
        &self,
        candidate_number: &str,
        job_sf_id: &str,
    ) -> Result<Option<Opportunity>, SalesforceError> {
        let state = self.state();
        state.check_failure()?;
        let external_id = helper::make_external_id(candidate_number, job_sf_id);
        Ok(state
            .candidate_opps
            .iter()
            .find(|o| o.candidate_external_id.as_deref() == Some(external_id.as_str()))
            .cloned())
    }

    async fn find_candidate_opportunities_by_job_opps(
        &self,
        job_sf_ids: &[String],
    ) -> Result<Vec<Opportunity>, SalesforceError> {
        let state = self.state();
        state.check_failure()?;
        Ok(state
            .candidate_opps
            .iter()
            .filter(|o| {
                o.parent_opportunity_id
                    .as_ref()
                    .is_some_and(|p| job_sf_ids.contains(p))
            })
            .cloned()
            .collect())
    }

    async fn create_or_update_contacts(
        &self,
        candidates: &[SfCandidate],
    ) -> Result<Vec<Option<String>>, SalesforceError> {
        let mut state = self.state();
        state.check_failure()?;
        state.contact_upserts += 1;

        let mut ids = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if state.rejected_contacts.contains(&candidate.candidate_number) {
                ids.push(None);
                continue;
            }
            let existing = state.contacts.get(&candidate.candidate_number).cloned();
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = state.next_id("003");
                    state
                        .contacts
                        .insert(candidate.candidate_number.clone(), id.clone());
                    id
                }
            };
            ids.push(Some(id));
        }
        Ok(ids)
    }

    async fn create_or_update_candidate_opportunities(
        &self,
        candidates: &[SfCandidate],
        params: Option<&CandidateOpportunityParams>,
        job: &JobOppRecord,
    ) -> Result<(), SalesforceError> {
        let mut state = self.state();
        state.check_failure()?;
        state.opp_upserts.push(OppUpsertCall {
            candidate_numbers: candidates
                .iter()
                .map(|c| c.candidate_number.clone())
                .collect(),
            params: params.cloned(),
            job_sf_id: job.sf_id.clone(),
        });

        for candidate in candidates {
            let external_id = helper::make_external_id(&candidate.candidate_number, &job.sf_id);
            let existing = state
                .candidate_opps
                .iter()
                .position(|o| o.candidate_external_id.as_deref() == Some(external_id.as_str()));
            let index = match existing {
                Some(index) => index,
                None => {
                    let id = state.next_id("006");
                    state.candidate_opps.push(Opportunity {
                        id,
                        name: Some(helper::generate_candidate_opp_name(
                            candidate.first_name.as_deref(),
                            &candidate.candidate_number,
                            job.name.as_deref(),
                        )),
                        account_id: job.account_id.clone(),
                        stage_name: Some("Prospect".to_string()),
                        parent_opportunity_id: Some(job.sf_id.clone()),
                        candidate_id: Some(candidate.candidate_number.clone()),
                        candidate_external_id: Some(external_id),
                        owner_id: job.owner_id.clone(),
                        ..Default::default()
                    });
                    state.candidate_opps.len() - 1
                }
            };

            if let Some(p) = params {
                let opp = &mut state.candidate_opps[index];
                if let Some(stage) = p.stage {
                    opp.stage_name = Some(stage.sf_name().to_string());
                    opp.is_closed = stage.is_closed();
                    opp.is_won = stage.is_won();
                }
                if p.next_step.is_some() {
                    opp.next_step = p.next_step.clone();
                }
                if let Some(due) = p.next_step_due_date {
                    opp.next_step_due_date = Some(due.format("%Y-%m-%d").to_string());
                }
                if p.closing_comments.is_some() {
                    opp.closing_comments = p.closing_comments.clone();
                }
                if p.closing_comments_for_candidate.is_some() {
                    opp.closing_comments_for_candidate = p.closing_comments_for_candidate.clone();
                }
                if p.employer_feedback.is_some() {
                    opp.employer_feedback = p.employer_feedback.clone();
                }
            }
        }
        Ok(())
    }

    fn contact_link(&self, contact_id: &str) -> String {
        helper::contact_url("https://mock.lightning.force.com/", contact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateOpportunityStage, CandidateStatus};

    fn candidate(number: &str) -> SfCandidate {
        SfCandidate {
            candidate_number: number.to_string(),
            first_name: Some("Omar".to_string()),
            last_name: None,
            email: None,
            status: CandidateStatus::Active,
            contact_id: None,
            partner_sf_id: None,
        }
    }

    #[tokio::test]
    async fn test_contacts_keep_stable_ids() {
        let sf = MockSalesforce::new();
        sf.reject_contact("2");
        let first = sf
            .create_or_update_contacts(&[candidate("1"), candidate("2")])
            .await
            .unwrap();
        let second = sf.create_or_update_contacts(&[candidate("1")]).await.unwrap();

        assert!(first[0].is_some());
        assert!(first[1].is_none());
        assert_eq!(first[0], second[0]);
        assert_eq!(sf.contact_upserts(), 2);
    }

    #[tokio::test]
    async fn test_candidate_opportunities_created_then_updated() {
        let sf = MockSalesforce::new();
        let mut job = JobOppRecord::new("006JOB");
        job.name = Some("Welder".to_string());

        sf.create_or_update_candidate_opportunities(&[candidate("7")], None, &job)
            .await
            .unwrap();
        let params = CandidateOpportunityParams {
            stage: Some(CandidateOpportunityStage::Offer),
            ..Default::default()
        };
        sf.create_or_update_candidate_opportunities(&[candidate("7")], Some(&params), &job)
            .await
            .unwrap();

        let opps = sf.candidate_opportunities();
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].name.as_deref(), Some("Omar(7)-Welder"));
        assert_eq!(opps[0].stage_name.as_deref(), Some("Offer"));

        let found = sf.find_candidate_opportunity("7", "006JOB").await.unwrap();
        assert_eq!(found.map(|o| o.id), Some(opps[0].id.clone()));
        assert_eq!(sf.opp_upserts().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_applies_to_all_calls() {
        let sf = MockSalesforce::new();
        sf.set_failure(Some("down for maintenance"));
        let err = sf.fetch_job_opportunity("006A").await.unwrap_err();
        assert_eq!(err.to_string(), "down for maintenance");

        sf.set_failure(None);
        assert!(sf.fetch_job_opportunity("006A").await.unwrap().is_none());
    }
}
