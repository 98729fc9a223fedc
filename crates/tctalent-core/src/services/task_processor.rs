// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per task type completion logic.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use super::candidates::{CandidateService, attachment_record};
use crate::drive::{FileSystemService, sanitize_file_name};
use crate::error::{CoreError, Result};
use crate::model::{TaskType, UploadType};
use crate::persistence::{
    CandidatePropertyRecord, MetadataField, TaskAssignmentRecord, TaskRecord,
};

/// Candidate fields collected elsewhere; upload metadata for these is not
/// stored as candidate properties.
const OVERLAPPING_FIELDS: &[&str] = &[
    "firstName",
    "lastName",
    "dateOfBirth",
    "gender",
    "countryOfBirth",
];

const CLAIM_COUPON_TASK: &str = "claimCouponButton";
const DUOLINGO_TEST_TASK: &str = "duolingoTest";

/// A file sent by the candidate.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// What the candidate submitted to complete a task.
#[derive(Debug, Clone, Default)]
pub struct TaskCompletion {
    pub files: Vec<UploadedFile>,
    pub field_answers: HashMap<String, String>,
    pub answer: Option<String>,
}

/// Completion logic of one task type.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    /// Task types handled by this processor.
    fn task_types(&self) -> &'static [TaskType];

    /// Apply the candidate's submission and mark the assignment completed.
    /// The caller persists the assignment.
    async fn complete_task(
        &self,
        assignment: &mut TaskAssignmentRecord,
        task: &TaskRecord,
        completion: TaskCompletion,
    ) -> Result<()>;

    /// Names of tasks to assign to the candidate once `assignment` is
    /// completed.
    async fn handle_completion(
        &self,
        _assignment: &TaskAssignmentRecord,
        _task: &TaskRecord,
    ) -> Result<Vec<&'static str>> {
        Ok(Vec::new())
    }
}

/// Tasks the candidate simply marks as done.
pub struct SimpleTaskProcessor;

#[async_trait]
impl TaskProcessor for SimpleTaskProcessor {
    fn task_types(&self) -> &'static [TaskType] {
        &[TaskType::Simple]
    }

    async fn complete_task(
        &self,
        assignment: &mut TaskAssignmentRecord,
        _task: &TaskRecord,
        _completion: TaskCompletion,
    ) -> Result<()> {
        assignment.completed_date.get_or_insert_with(Utc::now);
        Ok(())
    }
}

/// Question tasks; the answer is stored on the candidate.
pub struct QuestionTaskProcessor {
    candidates: Arc<CandidateService>,
}

impl QuestionTaskProcessor {
    pub fn new(candidates: Arc<CandidateService>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl TaskProcessor for QuestionTaskProcessor {
    fn task_types(&self) -> &'static [TaskType] {
        &[TaskType::Question, TaskType::YesNoQuestion]
    }

    async fn complete_task(
        &self,
        assignment: &mut TaskAssignmentRecord,
        task: &TaskRecord,
        completion: TaskCompletion,
    ) -> Result<()> {
        let answer = completion
            .answer
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| CoreError::invalid_request("Missing answer to question"))?;
        self.candidates
            .store_task_answer(assignment, task, &answer)
            .await?;
        assignment.completed_date.get_or_insert_with(Utc::now);
        Ok(())
    }
}

/// Document upload tasks.
pub struct UploadTaskProcessor {
    candidates: Arc<CandidateService>,
    drive: Arc<dyn FileSystemService>,
}

impl UploadTaskProcessor {
    pub fn new(candidates: Arc<CandidateService>, drive: Arc<dyn FileSystemService>) -> Self {
        Self { candidates, drive }
    }

    fn validate_metadata(
        fields: &[MetadataField],
        answers: &HashMap<String, String>,
    ) -> Result<()> {
        for field in fields.iter().filter(|f| f.required) {
            let present = answers
                .get(&field.name)
                .is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(CoreError::invalid_request(format!(
                    "Missing value for required field '{}'",
                    field.name
                )));
            }
        }
        Ok(())
    }

    /// Candidate properties for the metadata answers, skipping fields the
    /// candidate record already holds.
    fn metadata_properties(
        assignment: &TaskAssignmentRecord,
        task: &TaskRecord,
        fields: &[MetadataField],
        answers: &HashMap<String, String>,
    ) -> Vec<CandidatePropertyRecord> {
        let overlapping: HashSet<&str> = OVERLAPPING_FIELDS.iter().copied().collect();
        fields
            .iter()
            .filter(|field| !overlapping.contains(field.name.as_str()))
            .filter_map(|field| {
                let value = answers.get(&field.name).filter(|v| !v.trim().is_empty())?;
                Some(CandidatePropertyRecord {
                    candidate_id: assignment.candidate_id,
                    name: format!("{}_ta{}_{}", task.name, assignment.id, field.name),
                    value: Some(value.clone()),
                    related_task_assignment_id: Some(assignment.id),
                })
            })
            .collect()
    }
}

#[async_trait]
impl TaskProcessor for UploadTaskProcessor {
    fn task_types(&self) -> &'static [TaskType] {
        &[TaskType::Upload]
    }

    async fn complete_task(
        &self,
        assignment: &mut TaskAssignmentRecord,
        task: &TaskRecord,
        completion: TaskCompletion,
    ) -> Result<()> {
        if completion.files.is_empty() {
            return Err(CoreError::invalid_request(
                "At least one file must be uploaded",
            ));
        }

        // 1. Validate metadata and file names before touching the drive
        let fields = task.required_metadata_fields()?;
        Self::validate_metadata(&fields, &completion.field_answers)?;
        for file in &completion.files {
            sanitize_file_name(&file.name)?;
        }
        let upload_type = match task.upload_type.as_deref() {
            Some(t) => Some(UploadType::from_str(t).map_err(|e| {
                warn!(upload_type = t, "Unknown upload type on task");
                CoreError::invalid_request(e.to_string())
            })?),
            None => None,
        };

        // 2. Resolve the target folder
        let candidate = self.candidates.get(assignment.candidate_id).await?;
        let mut folder = self.candidates.create_candidate_folder(&candidate).await?;
        if let Some(sub) = task
            .upload_subfolder_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            folder = self.drive.create_folder(Some(&folder), sub).await?.url;
        }

        // 3. Upload every file
        let type_label = upload_type.map(|t| t.as_str()).unwrap_or("other");
        let mut attachments = Vec::with_capacity(completion.files.len());
        for file in &completion.files {
            let name = format!("{}-{}-{}", candidate.candidate_number, type_label, file.name);
            let stored = self.drive.upload_file(&folder, &name, &file.content).await?;
            info!(file = %stored.name, "Uploaded task file");
            attachments.push(attachment_record(candidate.id, &stored, upload_type, None));
        }

        // 4. Record metadata and attachments together
        let properties =
            Self::metadata_properties(assignment, task, &fields, &completion.field_answers);
        self.candidates
            .record_task_upload(&properties, &attachments)
            .await?;

        assignment.completed_date = Some(Utc::now());
        Ok(())
    }

    async fn handle_completion(
        &self,
        _assignment: &TaskAssignmentRecord,
        task: &TaskRecord,
    ) -> Result<Vec<&'static str>> {
        if task.name == CLAIM_COUPON_TASK {
            Ok(vec![DUOLINGO_TEST_TASK])
        } else {
            Ok(Vec::new())
        }
    }
}
