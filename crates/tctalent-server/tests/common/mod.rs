// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for router tests.
//!
//! Provides TestApp: the full router over an in-memory SQLite database, a
//! temporary drive and a mock Salesforce org.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use tctalent_core::drive::LocalDrive;
use tctalent_core::model::{CandidateStatus, Role, TaskType};
use tctalent_core::persistence::{
    CandidateRecord, JobOppRecord, Persistence, SqlitePersistence, TaskRecord, UserRecord,
};
use tctalent_core::salesforce::{MockSalesforce, Opportunity};
use tctalent_server::auth::{Claims, JwtKeys};
use tctalent_server::{AppState, router};

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub router: Router,
    pub persistence: Arc<dyn Persistence>,
    pub salesforce: Arc<MockSalesforce>,
    pub dir: tempfile::TempDir,
    /// Id of the admin user behind [`TestApp::admin_token`].
    pub admin_id: i64,
}

impl TestApp {
    pub async fn new() -> Self {
        let persistence: Arc<dyn Persistence> = Arc::new(
            SqlitePersistence::connect("sqlite::memory:")
                .await
                .expect("in-memory database"),
        );
        let dir = tempfile::TempDir::new().expect("temp dir");
        let salesforce = Arc::new(MockSalesforce::new());
        let state = AppState::new(
            persistence.clone(),
            salesforce.clone(),
            Arc::new(LocalDrive::new(dir.path())),
            SECRET,
        );
        let mut app = Self {
            router: router(state),
            persistence,
            salesforce,
            dir,
            admin_id: 0,
        };
        app.admin_id = app.user("admin", Role::Admin).await;
        app
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    pub fn token(&self, user_id: i64, role: Role, candidate_id: Option<i64>) -> String {
        JwtKeys::new(SECRET)
            .encode(&Claims {
                sub: user_id.to_string(),
                role,
                candidate_id,
                partner_id: None,
                exp: Utc::now().timestamp() + 3600,
            })
            .expect("token")
    }

    pub fn admin_token(&self) -> String {
        self.token(self.admin_id, Role::Admin, None)
    }

    pub fn candidate_token(&self, candidate: &CandidateRecord) -> String {
        self.token(
            candidate.user_id.expect("candidate user"),
            Role::User,
            Some(candidate.id),
        )
    }

    // ========================================================================
    // Requests
    // ========================================================================

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    /// Multipart POST with one `file` part per entry and one text part per
    /// field.
    pub async fn multipart(
        &self,
        uri: &str,
        token: &str,
        files: &[(&str, &[u8])],
        fields: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        const BOUNDARY: &str = "tc-test-boundary";
        let mut body = Vec::new();
        for (name, content) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    // ========================================================================
    // Fixtures
    // ========================================================================

    pub async fn user(&self, username: &str, role: Role) -> i64 {
        self.persistence
            .insert_user(&UserRecord {
                id: 0,
                username: username.to_string(),
                first_name: Some("Amina".to_string()),
                last_name: Some("Haddad".to_string()),
                email: None,
                role,
                partner_id: None,
                created_date: Utc::now(),
            })
            .await
            .expect("user")
    }

    pub async fn candidate(&self, number: &str) -> CandidateRecord {
        let user_id = self.user(&format!("candidate{}", number), Role::User).await;
        let mut candidate = CandidateRecord {
            id: 0,
            candidate_number: number.to_string(),
            user_id: Some(user_id),
            first_name: Some("Amina".to_string()),
            last_name: Some("Haddad".to_string()),
            email: Some(format!("{}@example.org", number)),
            status: CandidateStatus::Active,
            partner_id: None,
            sf_link: None,
            folder_link: None,
            created_date: Utc::now(),
            updated_date: None,
        };
        candidate.id = self
            .persistence
            .insert_candidate(&candidate)
            .await
            .expect("candidate");
        candidate
    }

    pub async fn task(&self, name: &str, task_type: TaskType) -> TaskRecord {
        let mut task = TaskRecord {
            id: 0,
            name: name.to_string(),
            display_name: format!("{} task", name),
            description: None,
            task_type,
            days_to_complete: Some(7),
            help_link: None,
            optional: false,
            upload_type: None,
            upload_subfolder_name: None,
            required_metadata: None,
            candidate_answer_field: None,
            explicit_allowed_answers: None,
            created_by: None,
            created_date: Utc::now(),
            updated_by: None,
            updated_date: None,
        };
        if task_type == TaskType::Upload {
            task.upload_type = Some("cv".to_string());
            task.upload_subfolder_name = Some("CV".to_string());
        }
        task.id = self.persistence.insert_task(&task).await.expect("task");
        task
    }

    /// Assign through the admin API and return the assignment id.
    pub async fn assign(&self, task: &TaskRecord, candidate: &CandidateRecord) -> i64 {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/admin/task-assignment",
                Some(&self.admin_token()),
                Some(serde_json::json!({ "taskId": task.id, "candidateId": candidate.id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["id"].as_i64().expect("assignment id")
    }

    /// Job opportunity present locally and in the mock org.
    pub async fn job_opp(&self, sf_id: &str, name: &str) -> JobOppRecord {
        self.salesforce.add_job_opportunity(Opportunity {
            id: sf_id.to_string(),
            name: Some(name.to_string()),
            account_id: Some("001ACME".to_string()),
            account_country: Some("Canada".to_string()),
            stage_name: Some("Candidate search".to_string()),
            ..Default::default()
        });
        let mut job = JobOppRecord::new(sf_id);
        job.name = Some(name.to_string());
        job.updated_date = Some(Utc::now());
        job.id = self.persistence.insert_job_opp(&job).await.expect("job");
        job
    }
}
