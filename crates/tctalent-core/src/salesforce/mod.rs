// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Salesforce integration.
//!
//! [`SalesforceService`] is the seam the services talk to. [`SalesforceClient`]
//! implements it over the Salesforce REST API; [`UnconfiguredSalesforce`] is
//! used when no credentials are configured, and [`MockSalesforce`] keeps an
//! in-memory org for tests.

pub mod client;
pub mod helper;
pub mod mock;
pub mod types;

pub use client::SalesforceClient;
pub use mock::MockSalesforce;
pub use types::{
    CandidateOpportunityParams, Opportunity, QueryResult, SfCandidate, UpsertError, UpsertResult,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::persistence::JobOppRecord;

/// Salesforce REST API version used for all requests.
pub const API_VERSION: &str = "v58.0";

/// Maximum number of records in one composite upsert.
pub const MAX_UPSERT_RECORDS: usize = 200;

/// Salesforce integration errors.
#[derive(Debug, Error)]
pub enum SalesforceError {
    #[error("Salesforce is not configured")]
    NotConfigured,

    #[error("Salesforce authentication failed: {0}")]
    Auth(String),

    /// Salesforce answered 300 or 400; the body carries its error list.
    #[error("Salesforce error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Salesforce request failed: {0}")]
    Http(String),

    #[error("Unexpected Salesforce response: {0}")]
    Decode(String),

    /// Some records of an upsert were rejected.
    #[error("{0}")]
    Rejected(String),

    /// The request cannot be sent as given.
    #[error("{0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for SalesforceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SalesforceError::Decode(err.to_string())
        } else {
            SalesforceError::Http(err.to_string())
        }
    }
}

/// Operations the services need from Salesforce.
#[async_trait]
pub trait SalesforceService: Send + Sync {
    /// Job opportunity with the given id, or `None` if Salesforce has none.
    async fn fetch_job_opportunity(
        &self,
        sf_id: &str,
    ) -> Result<Option<Opportunity>, SalesforceError>;

    /// Job opportunities with the given ids. Missing ids are skipped.
    async fn fetch_job_opportunities_by_id(
        &self,
        sf_ids: &[String],
    ) -> Result<Vec<Opportunity>, SalesforceError>;

    /// Candidate opportunity of the candidate for the job, if any.
    async fn find_candidate_opportunity(
        &self,
        candidate_number: &str,
        job_sf_id: &str,
    ) -> Result<Option<Opportunity>, SalesforceError>;

    /// Candidate opportunities whose parent is one of the given jobs.
    async fn find_candidate_opportunities_by_job_opps(
        &self,
        job_sf_ids: &[String],
    ) -> Result<Vec<Opportunity>, SalesforceError>;

    /// Upsert one Contact per candidate, keyed on candidate number.
    ///
    /// Returns the contact ids in candidate order; `None` where Salesforce
    /// rejected the record.
    async fn create_or_update_contacts(
        &self,
        candidates: &[SfCandidate],
    ) -> Result<Vec<Option<String>>, SalesforceError>;

    /// Upsert the candidate opportunities of the candidates for the job.
    /// Candidates without an opportunity get one created.
    async fn create_or_update_candidate_opportunities(
        &self,
        candidates: &[SfCandidate],
        params: Option<&CandidateOpportunityParams>,
        job: &JobOppRecord,
    ) -> Result<(), SalesforceError>;

    /// Lightning url of the contact with the given id.
    fn contact_link(&self, contact_id: &str) -> String;

    /// Name of a candidate opportunity.
    fn generate_candidate_opp_name(
        &self,
        first_name: Option<&str>,
        candidate_number: &str,
        job_name: Option<&str>,
    ) -> String {
        helper::generate_candidate_opp_name(first_name, candidate_number, job_name)
    }
}

/// Stand-in used when no Salesforce credentials are configured. Every call
/// fails with [`SalesforceError::NotConfigured`].
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredSalesforce;

#[async_trait]
impl SalesforceService for UnconfiguredSalesforce {
    async fn fetch_job_opportunity(
        &self,
        _sf_id: &str,
    ) -> Result<Option<Opportunity>, SalesforceError> {
        Err(SalesforceError::NotConfigured)
    }

    async fn fetch_job_opportunities_by_id(
        &self,
        _sf_ids: &[String],
    ) -> Result<Vec<Opportunity>, SalesforceError> {
        Err(SalesforceError::NotConfigured)
    }

    async fn find_candidate_opportunity(
        &self,
        _candidate_number: &str,
        _job_sf_id: &str,
    ) -> Result<Option<Opportunity>, SalesforceError> {
        Err(SalesforceError::NotConfigured)
    }

    async fn find_candidate_opportunities_by_job_opps(
        &self,
        _job_sf_ids: &[String],
    ) -> Result<Vec<Opportunity>, SalesforceError> {
        Err(SalesforceError::NotConfigured)
    }

    async fn create_or_update_contacts(
        &self,
        _candidates: &[SfCandidate],
    ) -> Result<Vec<Option<String>>, SalesforceError> {
        Err(SalesforceError::NotConfigured)
    }

    async fn create_or_update_candidate_opportunities(
        &self,
        _candidates: &[SfCandidate],
        _params: Option<&CandidateOpportunityParams>,
        _job: &JobOppRecord,
    ) -> Result<(), SalesforceError> {
        Err(SalesforceError::NotConfigured)
    }

    fn contact_link(&self, contact_id: &str) -> String {
        contact_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_fails_every_call() {
        let sf = UnconfiguredSalesforce;
        assert!(matches!(
            sf.fetch_job_opportunity("006A").await,
            Err(SalesforceError::NotConfigured)
        ));
        assert!(matches!(
            sf.create_or_update_contacts(&[]).await,
            Err(SalesforceError::NotConfigured)
        ));
    }

    #[test]
    fn test_api_error_display_includes_body() {
        let err = SalesforceError::Api {
            status: 400,
            body: r#"[{"message":"bad field"}]"#.to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("bad field"));
    }
}
