// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Salesforce REST client.
//!
//! Authenticates with the OAuth 2.0 JWT bearer flow and caches the access
//! token until Salesforce rejects it.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Months, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::helper::{self, soql_quote};
use super::types::{
    CandidateOpportunityParams, Opportunity, QueryResult, SfCandidate, TokenResponse,
    UpsertResult,
};
use super::{API_VERSION, MAX_UPSERT_RECORDS, SalesforceError, SalesforceService};
use crate::config::SalesforceConfig;
use crate::persistence::JobOppRecord;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const JWT_VALIDITY_SECS: i64 = 180;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

const CONTACT_EXTERNAL_ID: &str = "TBBid__c";
const CANDIDATE_OPP_EXTERNAL_ID: &str = "TBBCandidateExternalId__c";
const CANDIDATE_RECORD_TYPE: &str = "Candidate recruitment";
const CANDIDATE_RECORD_TYPE_CANADA: &str = "Candidate recruitment (CAN)";

const COMMON_OPP_FIELDS: &str = "Id,Name,AccountId,Closing_Comments__c,CreatedDate,\
LastModifiedDate,NextStep,Next_Step_Due_Date__c,StageName,IsClosed,IsWon";
const CANDIDATE_OPP_FIELDS: &str = "Employer_Feedback__c,Closing_Comments_For_Candidate__c,\
Parent_Opportunity__c,Candidate_TC_id__c,TBBCandidateExternalId__c";
const JOB_OPP_FIELDS: &str =
    "RecordTypeId,OwnerId,Hiring_Commitment__c,Opportunity_Score__c,AccountCountry__c";

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    exp: i64,
}

/// [`SalesforceService`] over the Salesforce REST API.
pub struct SalesforceClient {
    config: SalesforceConfig,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    access_token: RwLock<Option<String>>,
    retry_delay: Duration,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    /// Create a client. Fails if the private key is not a valid RSA PEM.
    pub fn new(config: SalesforceConfig) -> Result<Self, SalesforceError> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key_pem.as_bytes())
            .map_err(|e| SalesforceError::Auth(format!("invalid private key: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SalesforceError::Http(e.to_string()))?;

        info!(
            classic_url = %config.base_classic_url,
            user = %config.user,
            "Salesforce client initialized"
        );

        Ok(Self {
            config,
            encoding_key,
            http,
            access_token: RwLock::new(None),
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    fn api_base(&self) -> String {
        format!(
            "{}services/data/{}",
            self.config.base_classic_url, API_VERSION
        )
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    fn build_assertion(&self) -> Result<String, SalesforceError> {
        let claims = JwtClaims {
            iss: &self.config.consumer_key,
            sub: &self.config.user,
            aud: &self.config.base_login_url,
            exp: Utc::now().timestamp() + JWT_VALIDITY_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| SalesforceError::Auth(format!("failed to sign assertion: {}", e)))
    }

    async fn request_access_token(&self) -> Result<String, SalesforceError> {
        let assertion = self.build_assertion()?;
        let url = format!("{}services/oauth2/token", self.config.base_login_url);

        let response = self
            .http
            .post(&url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SalesforceError::Auth(format!("HTTP {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        debug!("Obtained Salesforce access token");
        Ok(token.access_token)
    }

    async fn access_token(&self) -> Result<String, SalesforceError> {
        if let Some(token) = self.access_token.read().await.as_ref() {
            return Ok(token.clone());
        }
        self.refresh_access_token().await
    }

    async fn refresh_access_token(&self) -> Result<String, SalesforceError> {
        let token = self.request_access_token().await?;
        *self.access_token.write().await = Some(token.clone());
        Ok(token)
    }

    // ========================================================================
    // Request execution
    // ========================================================================

    /// Send a request built by `build`, with the bearer token attached.
    ///
    /// Connection failures are retried once after a short delay. A 401
    /// triggers one token refresh and retry.
    async fn execute_with_retry<F>(&self, build: F) -> Result<Response, SalesforceError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let token = self.access_token().await?;

        let response = match build(&self.http).bearer_auth(&token).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Salesforce request failed, retrying");
                tokio::time::sleep(self.retry_delay).await;
                build(&self.http).bearer_auth(&token).send().await?
            }
        };

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            info!("Salesforce access token rejected, requesting a new one");
            let token = self.refresh_access_token().await?;
            build(&self.http).bearer_auth(&token).send().await?
        } else {
            response
        };

        check_status(response).await
    }

    async fn query(&self, soql: &str) -> Result<Vec<Opportunity>, SalesforceError> {
        debug!(soql = %soql, "Salesforce query");
        let url = format!("{}/query", self.api_base());
        let response = self
            .execute_with_retry(|http| http.get(&url).query(&[("q", soql)]))
            .await?;
        let mut page: QueryResult<Opportunity> = response.json().await?;
        let mut records = std::mem::take(&mut page.records);

        let instance = self.config.base_classic_url.trim_end_matches('/').to_string();
        while let Some(next) = page.next_records_url.take() {
            let url = format!("{}{}", instance, next);
            let response = self.execute_with_retry(|http| http.get(&url)).await?;
            page = response.json().await?;
            records.append(&mut page.records);
        }

        Ok(records)
    }

    async fn upsert(
        &self,
        object: &str,
        external_id_field: &str,
        records: Vec<Value>,
    ) -> Result<Vec<UpsertResult>, SalesforceError> {
        if records.len() > MAX_UPSERT_RECORDS {
            return Err(SalesforceError::InvalidRequest(format!(
                "Cannot update more than {} records at a time: {} requested",
                MAX_UPSERT_RECORDS,
                records.len()
            )));
        }

        let url = format!(
            "{}/composite/sobjects/{}/{}",
            self.api_base(),
            object,
            external_id_field
        );
        let body = json!({ "allOrNone": false, "records": records });
        let response = self
            .execute_with_retry(|http| http.patch(&url).json(&body))
            .await?;
        Ok(response.json().await?)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn job_opp_query(condition: &str) -> String {
        format!(
            "SELECT {},{} FROM Opportunity WHERE {}",
            COMMON_OPP_FIELDS, JOB_OPP_FIELDS, condition
        )
    }

    fn candidate_opp_query(condition: &str) -> String {
        format!(
            "SELECT {},{} FROM Opportunity WHERE Candidate_TC_id__c > '0' AND {} ORDER BY Id",
            COMMON_OPP_FIELDS, CANDIDATE_OPP_FIELDS, condition
        )
    }

    /// External ids of the candidates that have no opportunity for the job yet.
    async fn candidates_with_no_opp(
        &self,
        candidates: &[SfCandidate],
        job_sf_id: &str,
    ) -> Result<HashSet<String>, SalesforceError> {
        let mut missing: HashSet<String> = candidates
            .iter()
            .map(|c| helper::make_external_id(&c.candidate_number, job_sf_id))
            .collect();
        let existing = self
            .find_candidate_opportunities_by_job_opps(&[job_sf_id.to_string()])
            .await?;
        for opp in existing {
            if let Some(external_id) = opp.candidate_external_id {
                missing.remove(&external_id);
            }
        }
        Ok(missing)
    }

    // ========================================================================
    // Request bodies
    // ========================================================================

    fn contact_request(&self, candidate: &SfCandidate) -> Value {
        let mut record = Map::new();
        record.insert("attributes".into(), json!({ "type": "Contact" }));
        record.insert("FirstName".into(), json!(candidate.first_name));
        record.insert("LastName".into(), json!(candidate.last_name));
        record.insert("Contact_Type__c".into(), json!("Candidate"));
        if let Some(record_type) = &self.config.contact_record_type {
            record.insert("RecordTypeId".into(), json!(record_type));
        }
        if let Some(partner) = &candidate.partner_sf_id {
            record.insert("Source_Partner__c".into(), json!(partner));
        }
        record.insert("Email".into(), json!(candidate.email));
        let number = match candidate.candidate_number.parse::<i64>() {
            Ok(n) => json!(n),
            Err(_) => json!(candidate.candidate_number),
        };
        record.insert(CONTACT_EXTERNAL_ID.into(), number);
        record.insert("TC_Status__c".into(), json!(candidate.status.as_str()));
        Value::Object(record)
    }

    fn candidate_opp_request(
        candidate: &SfCandidate,
        job: &JobOppRecord,
        params: Option<&CandidateOpportunityParams>,
        create: bool,
    ) -> Value {
        let canada = job
            .country
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("Canada"));
        let record_type = if canada {
            CANDIDATE_RECORD_TYPE_CANADA
        } else {
            CANDIDATE_RECORD_TYPE
        };

        let mut record = Map::new();
        record.insert("attributes".into(), json!({ "type": "Opportunity" }));
        record.insert("RecordType".into(), json!({ "Name": record_type }));
        record.insert(
            CANDIDATE_OPP_EXTERNAL_ID.into(),
            json!(helper::make_external_id(&candidate.candidate_number, &job.sf_id)),
        );
        if let Some(partner) = &candidate.partner_sf_id {
            record.insert("Source_Partner__c".into(), json!(partner));
        }

        let stage = params.and_then(|p| p.stage);
        if create {
            let name = helper::generate_candidate_opp_name(
                candidate.first_name.as_deref(),
                &candidate.candidate_number,
                job.name.as_deref(),
            );
            let close_date = Utc::now()
                .date_naive()
                .checked_add_months(Months::new(12))
                .unwrap_or_else(|| Utc::now().date_naive());
            record.insert("Name".into(), json!(name));
            record.insert("AccountId".into(), json!(job.account_id));
            record.insert("Candidate_Contact__c".into(), json!(candidate.contact_id));
            record.insert("OwnerId".into(), json!(job.owner_id));
            record.insert("Parent_Opportunity__c".into(), json!(job.sf_id));
            record.insert(
                "CloseDate".into(),
                json!(close_date.format("%Y-%m-%d").to_string()),
            );
            record.insert(
                "StageName".into(),
                json!(stage.map(|s| s.sf_name()).unwrap_or("Prospect")),
            );
        } else if let Some(stage) = stage {
            record.insert("StageName".into(), json!(stage.sf_name()));
        }

        if let Some(p) = params {
            if let Some(v) = &p.next_step {
                record.insert("NextStep".into(), json!(v));
            }
            if let Some(v) = p.next_step_due_date {
                record.insert(
                    "Next_Step_Due_Date__c".into(),
                    json!(v.format("%Y-%m-%d").to_string()),
                );
            }
            if let Some(v) = &p.closing_comments {
                record.insert("Closing_Comments__c".into(), json!(v));
            }
            if let Some(v) = &p.closing_comments_for_candidate {
                record.insert("Closing_Comments_For_Candidate__c".into(), json!(v));
            }
            if let Some(v) = &p.employer_feedback {
                record.insert("Employer_Feedback__c".into(), json!(v));
            }
        }

        Value::Object(record)
    }
}

async fn check_status(response: Response) -> Result<Response, SalesforceError> {
    let status = response.status();
    if status == StatusCode::MULTIPLE_CHOICES || status == StatusCode::BAD_REQUEST {
        let body = response.text().await.unwrap_or_default();
        return Err(SalesforceError::Api {
            status: status.as_u16(),
            body,
        });
    }
    if status.as_u16() > 300 {
        let body = response.text().await.unwrap_or_default();
        return Err(SalesforceError::Http(format!("HTTP {}: {}", status, body)));
    }
    Ok(response)
}

fn in_clause(ids: &[String]) -> String {
    ids.iter()
        .map(|id| soql_quote(id))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl SalesforceService for SalesforceClient {
    async fn fetch_job_opportunity(
        &self,
        sf_id: &str,
    ) -> Result<Option<Opportunity>, SalesforceError> {
        let soql = Self::job_opp_query(&format!("Id = {}", soql_quote(sf_id)));
        Ok(self.query(&soql).await?.into_iter().next())
    }

    async fn fetch_job_opportunities_by_id(
        &self,
        sf_ids: &[String],
    ) -> Result<Vec<Opportunity>, SalesforceError> {
        if sf_ids.is_empty() {
            return Ok(Vec::new());
        }
        let soql = Self::job_opp_query(&format!("Id IN ({})", in_clause(sf_ids)));
        self.query(&soql).await
    }

    async fn find_candidate_opportunity(
        &self,
        candidate_number: &str,
        job_sf_id: &str,
    ) -> Result<Option<Opportunity>, SalesforceError> {
        let external_id = helper::make_external_id(candidate_number, job_sf_id);
        let soql = Self::candidate_opp_query(&format!(
            "{} = {}",
            CANDIDATE_OPP_EXTERNAL_ID,
            soql_quote(&external_id)
        ));
        let opps = self.query(&soql).await?;
        if opps.len() > 1 {
            error!(
                external_id = %external_id,
                count = opps.len(),
                "Multiple Salesforce candidate opportunities share one external id"
            );
        }
        Ok(opps.into_iter().next())
    }

    async fn find_candidate_opportunities_by_job_opps(
        &self,
        job_sf_ids: &[String],
    ) -> Result<Vec<Opportunity>, SalesforceError> {
        if job_sf_ids.is_empty() {
            return Ok(Vec::new());
        }
        let soql = Self::candidate_opp_query(&format!(
            "Parent_Opportunity__c IN ({})",
            in_clause(job_sf_ids)
        ));
        self.query(&soql).await
    }

    async fn create_or_update_contacts(
        &self,
        candidates: &[SfCandidate],
    ) -> Result<Vec<Option<String>>, SalesforceError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let records = candidates.iter().map(|c| self.contact_request(c)).collect();
        let results = self.upsert("Contact", CONTACT_EXTERNAL_ID, records).await?;

        if results.len() != candidates.len() {
            return Err(SalesforceError::Rejected(format!(
                "Number of results ({}) did not match number of candidates ({})",
                results.len(),
                candidates.len()
            )));
        }

        Ok(candidates
            .iter()
            .zip(results)
            .map(|(candidate, result)| {
                if result.success {
                    result.id
                } else {
                    error!(
                        candidate_number = %candidate.candidate_number,
                        errors = %result.error_message(),
                        "Salesforce rejected contact update"
                    );
                    None
                }
            })
            .collect())
    }

    async fn create_or_update_candidate_opportunities(
        &self,
        candidates: &[SfCandidate],
        params: Option<&CandidateOpportunityParams>,
        job: &JobOppRecord,
    ) -> Result<(), SalesforceError> {
        if candidates.is_empty() {
            return Ok(());
        }
        let no_opp = self.candidates_with_no_opp(candidates, &job.sf_id).await?;

        let external_ids: Vec<String> = candidates
            .iter()
            .map(|c| helper::make_external_id(&c.candidate_number, &job.sf_id))
            .collect();
        let records = candidates
            .iter()
            .zip(&external_ids)
            .map(|(c, ext)| Self::candidate_opp_request(c, job, params, no_opp.contains(ext)))
            .collect();

        let results = self
            .upsert("Opportunity", CANDIDATE_OPP_EXTERNAL_ID, records)
            .await?;

        if results.len() != candidates.len() {
            return Err(SalesforceError::Rejected(format!(
                "Number of results ({}) did not match number of requests ({})",
                results.len(),
                candidates.len()
            )));
        }

        let failures: Vec<String> = external_ids
            .iter()
            .zip(&results)
            .filter(|(_, r)| !r.success)
            .map(|(ext, r)| format!("{}: {}", ext, r.error_message()))
            .collect();
        if !failures.is_empty() {
            return Err(SalesforceError::Rejected(format!(
                "The following update/s failed: {}",
                failures.join(", ")
            )));
        }

        Ok(())
    }

    fn contact_link(&self, contact_id: &str) -> String {
        helper::contact_url(&self.config.base_lightning_url, contact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateOpportunityStage, CandidateStatus};
    use std::sync::OnceLock;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_key_pem() -> &'static str {
        static KEY: OnceLock<String> = OnceLock::new();
        KEY.get_or_init(|| {
            use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
            let key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
            key.to_pkcs1_pem(LineEnding::LF).unwrap().to_string()
        })
    }

    fn test_client(server: &MockServer) -> SalesforceClient {
        let base = format!("{}/", server.uri());
        let mut client = SalesforceClient::new(SalesforceConfig {
            base_classic_url: base.clone(),
            base_lightning_url: "https://tc.lightning.force.com/".to_string(),
            base_login_url: base,
            consumer_key: "consumer".to_string(),
            user: "sync@tc.org".to_string(),
            private_key_pem: test_key_pem().to_string(),
            contact_record_type: None,
        })
        .unwrap();
        client.retry_delay = Duration::from_millis(10);
        client
    }

    async fn mount_token(server: &MockServer, token: &str, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": token })),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn candidate(number: &str) -> SfCandidate {
        SfCandidate {
            candidate_number: number.to_string(),
            first_name: Some("Amina".to_string()),
            last_name: Some("Haddad".to_string()),
            email: Some(format!("{}@example.org", number)),
            status: CandidateStatus::Active,
            contact_id: Some(format!("003{}", number)),
            partner_sf_id: Some("001PARTNER".to_string()),
        }
    }

    fn job() -> JobOppRecord {
        let mut job = JobOppRecord::new("006JOB");
        job.name = Some("Nurse".to_string());
        job.account_id = Some("001EMP".to_string());
        job.owner_id = Some("005OWNER".to_string());
        job.country = Some("Australia".to_string());
        job
    }

    #[test]
    fn test_invalid_private_key_is_rejected() {
        let result = SalesforceClient::new(SalesforceConfig {
            base_classic_url: "https://x/".to_string(),
            base_lightning_url: "https://x/".to_string(),
            base_login_url: "https://x/".to_string(),
            consumer_key: "c".to_string(),
            user: "u".to_string(),
            private_key_pem: "not a key".to_string(),
            contact_record_type: None,
        });
        assert!(matches!(result, Err(SalesforceError::Auth(_))));
    }

    #[tokio::test]
    async fn test_fetch_job_opportunity_authenticates_and_queries() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 1).await;

        let soql = SalesforceClient::job_opp_query("Id = '006JOB'");
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query"))
            .and(query_param("q", soql.as_str()))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 1,
                "done": true,
                "records": [{"Id": "006JOB", "Name": "Nurse", "StageName": "Prospect",
                             "IsClosed": false, "IsWon": false, "AccountCountry__c": "Canada"}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let opp = client.fetch_job_opportunity("006JOB").await.unwrap().unwrap();
        assert_eq!(opp.name.as_deref(), Some("Nurse"));
        assert_eq!(opp.account_country.as_deref(), Some("Canada"));

        // Token is cached: the second call does not authenticate again.
        client.fetch_job_opportunity("006JOB").await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_job_opportunity_missing_returns_none() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 0, "done": true, "records": []
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(client.fetch_job_opportunity("006NONE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_follows_next_records_url() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 2, "done": false,
                "records": [{"Id": "006A"}],
                "nextRecordsUrl": "/services/data/v58.0/query/01gNEXT-2000"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query/01gNEXT-2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 2, "done": true, "records": [{"Id": "006B"}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let opps = client
            .fetch_job_opportunities_by_id(&["006A".to_string(), "006B".to_string()])
            .await
            .unwrap();
        let ids: Vec<_> = opps.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["006A", "006B"]);
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_token_once() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 2).await;

        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 1, "done": true, "records": [{"Id": "006JOB"}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let opp = client.fetch_job_opportunity("006JOB").await.unwrap();
        assert!(opp.is_some());
    }

    #[tokio::test]
    async fn test_bad_request_returns_api_error_with_body() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"[{"errorCode":"MALFORMED_QUERY","message":"bad"}]"#),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.fetch_job_opportunity("006JOB").await.unwrap_err();
        match err {
            SalesforceError::Api { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("MALFORMED_QUERY"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_returns_http_error() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.fetch_job_opportunity("006JOB").await.unwrap_err();
        assert!(matches!(err, SalesforceError::Http(_)));
    }

    #[tokio::test]
    async fn test_failed_token_request_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.fetch_job_opportunity("006JOB").await.unwrap_err();
        match err {
            SalesforceError::Auth(message) => assert!(message.contains("invalid_grant")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_or_update_contacts_returns_ids_in_order() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 1).await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v58.0/composite/sobjects/Contact/TBBid__c"))
            .and(body_partial_json(json!({
                "allOrNone": false,
                "records": [
                    {"TBBid__c": 1001, "Contact_Type__c": "Candidate", "TC_Status__c": "active"},
                    {"TBBid__c": 1002}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "0031001", "success": true, "created": true, "errors": []},
                {"id": null, "success": false, "errors": [{"message": "Duplicate email"}]}
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let ids = client
            .create_or_update_contacts(&[candidate("1001"), candidate("1002")])
            .await
            .unwrap();
        assert_eq!(ids, vec![Some("0031001".to_string()), None]);
    }

    #[tokio::test]
    async fn test_contact_result_count_mismatch_is_error() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 1).await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v58.0/composite/sobjects/Contact/TBBid__c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "0031001", "success": true}
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .create_or_update_contacts(&[candidate("1001"), candidate("1002")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not match"));
    }

    #[tokio::test]
    async fn test_upsert_rejects_too_many_records() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let candidates: Vec<_> = (0..201).map(|i| candidate(&format!("{}", 2000 + i))).collect();

        let err = client.create_or_update_contacts(&candidates).await.unwrap_err();
        assert!(matches!(err, SalesforceError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_candidate_opportunities_create_only_missing() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 1).await;

        // Candidate 1001 already has an opportunity for the job.
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 1, "done": true,
                "records": [{"Id": "006C1", "Candidate_TC_id__c": "1001",
                             "TBBCandidateExternalId__c": "1001-006JOB",
                             "Parent_Opportunity__c": "006JOB"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(
                "/services/data/v58.0/composite/sobjects/Opportunity/TBBCandidateExternalId__c",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "006C1", "success": true, "created": false},
                {"id": "006C2", "success": true, "created": true}
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let params = CandidateOpportunityParams {
            stage: Some(CandidateOpportunityStage::CvReview),
            next_step: Some("Review CV".to_string()),
            ..Default::default()
        };
        client
            .create_or_update_candidate_opportunities(
                &[candidate("1001"), candidate("1002")],
                Some(&params),
                &job(),
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let patch = requests
            .iter()
            .find(|r| r.method.as_str() == "PATCH")
            .unwrap();
        let body: Value = serde_json::from_slice(&patch.body).unwrap();
        let records = body["records"].as_array().unwrap();

        let update = &records[0];
        assert_eq!(update["TBBCandidateExternalId__c"], "1001-006JOB");
        assert!(update.get("Name").is_none());
        assert_eq!(update["StageName"], "CV review");
        assert_eq!(update["NextStep"], "Review CV");
        assert_eq!(update["RecordType"]["Name"], "Candidate recruitment");

        let create = &records[1];
        assert_eq!(create["Name"], "Amina(1002)-Nurse");
        assert_eq!(create["Parent_Opportunity__c"], "006JOB");
        assert_eq!(create["Candidate_Contact__c"], "0031002");
        assert_eq!(create["AccountId"], "001EMP");
        assert_eq!(create["StageName"], "CV review");
        assert!(create.get("CloseDate").is_some());
    }

    #[tokio::test]
    async fn test_candidate_opportunity_failures_are_reported() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 0, "done": true, "records": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"success": false, "errors": [{"message": "Stage locked"}]}
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .create_or_update_candidate_opportunities(&[candidate("1001")], None, &job())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The following update/s failed: 1001-006JOB: Stage locked"
        );
    }

    #[test]
    fn test_canada_jobs_use_canadian_record_type() {
        let mut job = job();
        job.country = Some("Canada".to_string());
        let request = SalesforceClient::candidate_opp_request(&candidate("1001"), &job, None, true);
        assert_eq!(request["RecordType"]["Name"], "Candidate recruitment (CAN)");
        assert_eq!(request["StageName"], "Prospect");
    }
}
