// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fixtures shared by service tests.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use super::Services;
use crate::drive::LocalDrive;
use crate::model::{CandidateStatus, Role, TaskType};
use crate::persistence::{
    CandidateRecord, JobOppRecord, PartnerRecord, Persistence, SavedListRecord, SqlitePersistence,
    TaskAssignmentRecord, TaskRecord, UserRecord,
};
use crate::salesforce::{MockSalesforce, Opportunity};

/// Staff users `1..=STAFF_USERS` exist in every [`TestContext`], so tests
/// can pass small literal ids as the acting user.
pub(crate) const STAFF_USERS: i64 = 10;

/// Services over an in-memory database, a temporary drive and a mock org.
pub(crate) struct TestContext {
    pub services: Services,
    pub persistence: Arc<dyn Persistence>,
    pub salesforce: Arc<MockSalesforce>,
    dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let persistence: Arc<dyn Persistence> = Arc::new(
            SqlitePersistence::connect("sqlite::memory:")
                .await
                .expect("in-memory database"),
        );
        let dir = TempDir::new().expect("temp dir");
        let drive = Arc::new(LocalDrive::new(dir.path()));
        let salesforce = Arc::new(MockSalesforce::new());
        let services = Services::new(persistence.clone(), salesforce.clone(), drive);
        let ctx = Self {
            services,
            persistence,
            salesforce,
            dir,
        };
        for n in 1..=STAFF_USERS {
            let id = ctx.user(&format!("staff{}", n), Role::Admin, None).await;
            assert_eq!(id, n, "staff users are numbered from 1");
        }
        ctx
    }

    pub fn drive_root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub async fn candidate(&self, number: &str) -> CandidateRecord {
        self.candidate_of_partner(number, None).await
    }

    pub async fn candidate_of_partner(
        &self,
        number: &str,
        partner_id: Option<i64>,
    ) -> CandidateRecord {
        let mut candidate = CandidateRecord {
            id: 0,
            candidate_number: number.to_string(),
            user_id: None,
            first_name: Some("Amina".to_string()),
            last_name: Some("Haddad".to_string()),
            email: Some(format!("{}@example.org", number)),
            status: CandidateStatus::Active,
            partner_id,
            sf_link: None,
            folder_link: None,
            created_date: Utc::now(),
            updated_date: None,
        };
        candidate.id = self.persistence.insert_candidate(&candidate).await.unwrap();
        candidate
    }

    pub async fn partner(&self, name: &str, source: bool, job_creator: bool) -> i64 {
        self.persistence
            .insert_partner(&PartnerRecord {
                id: 0,
                name: name.to_string(),
                abbreviation: None,
                sf_id: Some(format!("001{}", name)),
                job_creator,
                source_partner: source,
            })
            .await
            .unwrap()
    }

    pub async fn user(&self, username: &str, role: Role, partner_id: Option<i64>) -> i64 {
        self.persistence
            .insert_user(&UserRecord {
                id: 0,
                username: username.to_string(),
                first_name: None,
                last_name: None,
                email: None,
                role,
                partner_id,
                created_date: Utc::now(),
            })
            .await
            .unwrap()
    }

    fn task_record(name: &str, task_type: TaskType) -> TaskRecord {
        TaskRecord {
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
        }
    }

    async fn insert_task(&self, mut task: TaskRecord) -> TaskRecord {
        task.id = self.persistence.insert_task(&task).await.unwrap();
        task
    }

    async fn task(&self, name: &str, task_type: TaskType) -> TaskRecord {
        self.insert_task(Self::task_record(name, task_type)).await
    }

    pub async fn simple_task(&self, name: &str) -> TaskRecord {
        self.task(name, TaskType::Simple).await
    }

    pub async fn yes_no_task(&self, name: &str) -> TaskRecord {
        self.task(name, TaskType::YesNoQuestion).await
    }

    pub async fn question_task(&self, name: &str, explicit_answers: Option<&str>) -> TaskRecord {
        let mut task = Self::task_record(name, TaskType::Question);
        task.explicit_allowed_answers = explicit_answers.map(str::to_string);
        self.insert_task(task).await
    }

    /// Question task whose answer is written to the candidate field `field`.
    pub async fn field_question_task(&self, name: &str, field: &str) -> TaskRecord {
        let mut task = Self::task_record(name, TaskType::Question);
        task.candidate_answer_field = Some(field.to_string());
        self.insert_task(task).await
    }

    /// Upload task storing identity documents in an "Identity" subfolder.
    pub async fn upload_task(&self, name: &str, metadata: Option<&str>) -> TaskRecord {
        let mut task = Self::task_record(name, TaskType::Upload);
        task.upload_type = Some("idCard".to_string());
        task.upload_subfolder_name = Some("Identity".to_string());
        task.required_metadata = metadata.map(str::to_string);
        self.insert_task(task).await
    }

    pub async fn assignment(
        &self,
        task: &TaskRecord,
        candidate: &CandidateRecord,
    ) -> TaskAssignmentRecord {
        self.services
            .task_assignments
            .assign_task_to_candidate(Some(1), task, Some(candidate.id), None, None)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn saved_list(&self, candidate_ids: &[i64]) -> i64 {
        let id = self
            .persistence
            .insert_saved_list(&SavedListRecord {
                id: 0,
                name: "Shortlist".to_string(),
                created_by: None,
                created_date: Utc::now(),
            })
            .await
            .unwrap();
        self.persistence
            .add_candidates_to_list(id, candidate_ids)
            .await
            .unwrap();
        id
    }

    /// Job opportunity present in the mock org only.
    pub fn sf_job(&self, sf_id: &str, name: &str) -> Opportunity {
        let opp = Opportunity {
            id: sf_id.to_string(),
            name: Some(name.to_string()),
            account_id: Some("001ACME".to_string()),
            account_country: Some("Canada".to_string()),
            stage_name: Some("Candidate search".to_string()),
            created_date: Some("2023-02-01T10:00:00.000+0000".to_string()),
            last_modified_date: Some("2024-05-06T07:08:09.000+0000".to_string()),
            owner_id: Some("005OWNER".to_string()),
            hiring_commitment: Some(3.0),
            ..Default::default()
        };
        self.salesforce.add_job_opportunity(opp.clone());
        opp
    }

    /// Job opportunity present locally and in the mock org, refreshed now.
    pub async fn job_opp(&self, sf_id: &str, name: &str) -> JobOppRecord {
        self.sf_job(sf_id, name);
        let mut job = JobOppRecord::new(sf_id);
        job.name = Some(name.to_string());
        job.updated_date = Some(Utc::now());
        job.id = self.persistence.insert_job_opp(&job).await.unwrap();
        job
    }
}
