// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Salesforce wire types.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{CandidateOpportunityStage, CandidateStatus};

/// Opportunity as returned by SOQL queries. Job and candidate opportunities
/// share this shape; fields not requested stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "AccountId", default)]
    pub account_id: Option<String>,
    #[serde(rename = "AccountCountry__c", default)]
    pub account_country: Option<String>,
    #[serde(rename = "Closing_Comments__c", default)]
    pub closing_comments: Option<String>,
    #[serde(rename = "CreatedDate", default)]
    pub created_date: Option<String>,
    #[serde(rename = "LastModifiedDate", default)]
    pub last_modified_date: Option<String>,
    #[serde(rename = "NextStep", default)]
    pub next_step: Option<String>,
    #[serde(rename = "Next_Step_Due_Date__c", default)]
    pub next_step_due_date: Option<String>,
    #[serde(rename = "StageName", default)]
    pub stage_name: Option<String>,
    #[serde(rename = "IsClosed", default)]
    pub is_closed: bool,
    #[serde(rename = "IsWon", default)]
    pub is_won: bool,

    // Candidate opportunity fields
    #[serde(rename = "Employer_Feedback__c", default)]
    pub employer_feedback: Option<String>,
    #[serde(rename = "Closing_Comments_For_Candidate__c", default)]
    pub closing_comments_for_candidate: Option<String>,
    #[serde(rename = "Parent_Opportunity__c", default)]
    pub parent_opportunity_id: Option<String>,
    #[serde(
        rename = "Candidate_TC_id__c",
        default,
        deserialize_with = "string_or_number"
    )]
    pub candidate_id: Option<String>,
    #[serde(rename = "TBBCandidateExternalId__c", default)]
    pub candidate_external_id: Option<String>,

    // Job opportunity fields
    #[serde(rename = "RecordTypeId", default)]
    pub record_type_id: Option<String>,
    #[serde(rename = "OwnerId", default)]
    pub owner_id: Option<String>,
    #[serde(rename = "Hiring_Commitment__c", default)]
    pub hiring_commitment: Option<f64>,
    #[serde(
        rename = "Opportunity_Score__c",
        default,
        deserialize_with = "string_or_number"
    )]
    pub opportunity_score: Option<String>,
}

/// Accept a JSON string or number, as formula fields vary between orgs.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        }),
        _ => None,
    })
}

/// Body of a SOQL query response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    pub total_size: i64,
    pub done: bool,
    pub records: Vec<T>,
    #[serde(default)]
    pub next_records_url: Option<String>,
}

/// One error reported for a failed upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpsertError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "statusCode", default)]
    pub status_code: Option<String>,
}

/// Per-record result of a composite upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpsertResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub errors: Vec<UpsertError>,
}

impl UpsertResult {
    /// Joined error messages.
    pub fn error_message(&self) -> String {
        self.errors
            .iter()
            .filter_map(|e| e.message.as_deref())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Access token response of the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub instance_url: Option<String>,
}

/// Candidate data sent to Salesforce.
#[derive(Debug, Clone, PartialEq)]
pub struct SfCandidate {
    pub candidate_number: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub status: CandidateStatus,
    /// Salesforce Contact id, known once the contact exists.
    pub contact_id: Option<String>,
    /// Salesforce account id of the candidate's source partner.
    pub partner_sf_id: Option<String>,
}

/// Optional changes applied to candidate opportunities. Absent fields are
/// left untouched in Salesforce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateOpportunityParams {
    #[serde(default)]
    pub stage: Option<CandidateOpportunityStage>,
    #[serde(default)]
    pub next_step: Option<String>,
    #[serde(default)]
    pub next_step_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub closing_comments: Option<String>,
    #[serde(default)]
    pub closing_comments_for_candidate: Option<String>,
    #[serde(default)]
    pub employer_feedback: Option<String>,
}
