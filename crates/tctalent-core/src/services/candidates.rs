// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Candidate lookups and updates.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::drive::{FileSystemService, StoredFile};
use crate::error::{CoreError, Result};
use crate::model::{CandidateStatus, UploadType};
use crate::persistence::{
    AttachmentRecord, CandidateNoteRecord, CandidatePropertyRecord, CandidateRecord, Persistence,
    TaskAssignmentRecord, TaskRecord,
};

/// Candidate field that question answers may be written to.
const STATUS_FIELD: &str = "status";

pub struct CandidateService {
    persistence: Arc<dyn Persistence>,
    drive: Arc<dyn FileSystemService>,
}

impl CandidateService {
    pub fn new(persistence: Arc<dyn Persistence>, drive: Arc<dyn FileSystemService>) -> Self {
        Self { persistence, drive }
    }

    pub async fn get(&self, id: i64) -> Result<CandidateRecord> {
        self.persistence
            .get_candidate(id)
            .await?
            .ok_or_else(|| CoreError::no_such_object("Candidate", id))
    }

    /// Candidates with the given ids, in the order requested.
    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<CandidateRecord>> {
        let found = self.persistence.find_candidates_by_ids(ids).await?;
        let by_id: HashMap<i64, CandidateRecord> = found.into_iter().map(|c| (c.id, c)).collect();
        ids.iter()
            .map(|id| {
                by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| CoreError::no_such_object("Candidate", id))
            })
            .collect()
    }

    pub async fn find_by_candidate_number(&self, number: &str) -> Result<Option<CandidateRecord>> {
        self.persistence.find_candidate_by_number(number).await
    }

    /// Change the candidate's status and record a note explaining it.
    #[instrument(skip(self, candidate, comment), fields(candidate_id = candidate.id))]
    pub async fn update_status(
        &self,
        candidate: &CandidateRecord,
        status: CandidateStatus,
        comment: Option<&str>,
        user_id: Option<i64>,
    ) -> Result<()> {
        self.persistence
            .update_candidate_status(candidate.id, status)
            .await?;
        self.persistence
            .insert_candidate_note(&CandidateNoteRecord {
                id: 0,
                candidate_id: candidate.id,
                note_type: "candidate".to_string(),
                title: format!("Status change from {} to {}", candidate.status, status),
                comment: comment.map(str::to_string),
                created_by: user_id,
                created_date: Utc::now(),
            })
            .await?;
        info!(from = %candidate.status, to = %status, "Candidate status changed");
        Ok(())
    }

    pub async fn update_salesforce_link(&self, candidate_id: i64, link: &str) -> Result<()> {
        self.persistence
            .update_candidate_sf_link(candidate_id, link)
            .await
    }

    /// Link of the candidate's document folder, creating the folder when the
    /// candidate has none yet.
    #[instrument(skip(self, candidate), fields(candidate_number = %candidate.candidate_number))]
    pub async fn create_candidate_folder(&self, candidate: &CandidateRecord) -> Result<String> {
        if let Some(link) = &candidate.folder_link {
            return Ok(link.clone());
        }
        let folder = self
            .drive
            .create_folder(None, &candidate.candidate_number)
            .await?;
        self.persistence
            .update_candidate_folder_link(candidate.id, &folder.url)
            .await?;
        info!(folder = %folder.url, "Created candidate folder");
        Ok(folder.url)
    }

    /// Store the answer to a question task on the candidate.
    ///
    /// Without an answer field the answer becomes a candidate property named
    /// after the task.
    pub async fn store_task_answer(
        &self,
        assignment: &TaskAssignmentRecord,
        task: &TaskRecord,
        answer: &str,
    ) -> Result<()> {
        match task.candidate_answer_field.as_deref() {
            None => {
                self.set_property(assignment.candidate_id, &task.name, answer, Some(assignment.id))
                    .await
            }
            Some(STATUS_FIELD) => {
                let status = CandidateStatus::from_str(answer)
                    .map_err(|e| CoreError::invalid_request(e.to_string()))?;
                let candidate = self.get(assignment.candidate_id).await?;
                self.update_status(
                    &candidate,
                    status,
                    Some(&format!("Answer to task '{}'", task.display_name)),
                    None,
                )
                .await
            }
            Some(field) => Err(CoreError::invalid_request(format!(
                "Candidate field does not exist: '{}'",
                field
            ))),
        }
    }

    pub async fn set_property(
        &self,
        candidate_id: i64,
        name: &str,
        value: &str,
        related_task_assignment_id: Option<i64>,
    ) -> Result<()> {
        self.persistence
            .upsert_candidate_property(&CandidatePropertyRecord {
                candidate_id,
                name: name.to_string(),
                value: Some(value.to_string()),
                related_task_assignment_id,
            })
            .await
    }

    pub async fn add_attachment(
        &self,
        candidate_id: i64,
        file: &StoredFile,
        upload_type: Option<UploadType>,
        user_id: Option<i64>,
    ) -> Result<i64> {
        self.persistence
            .insert_attachment(&attachment_record(candidate_id, file, upload_type, user_id))
            .await
    }

    /// Records everything a completed upload task produced, or nothing.
    pub async fn record_task_upload(
        &self,
        properties: &[CandidatePropertyRecord],
        attachments: &[AttachmentRecord],
    ) -> Result<()> {
        self.persistence
            .record_task_upload(properties, attachments)
            .await
    }

    pub async fn list_attachments(&self, candidate_id: i64) -> Result<Vec<AttachmentRecord>> {
        self.persistence.list_attachments(candidate_id).await
    }
}

/// Attachment row for a stored file; the file type is its lowercased extension.
pub(crate) fn attachment_record(
    candidate_id: i64,
    file: &StoredFile,
    upload_type: Option<UploadType>,
    user_id: Option<i64>,
) -> AttachmentRecord {
    AttachmentRecord {
        id: 0,
        candidate_id,
        name: file.name.clone(),
        location: file.url.clone(),
        file_type: file
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase()),
        upload_type: upload_type.map(|t| t.as_str().to_string()),
        created_by: user_id,
        created_date: Utc::now(),
    }
}
