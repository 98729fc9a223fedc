// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! JSON request and response bodies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tctalent_core::model::{
    AssignmentStatus, CandidateOpportunityStage, JobChatType, TaskType,
};
use tctalent_core::persistence::{
    CandidateOppRecord, JobChatRecord, MetadataField, Page, TaskAssignmentRecord, TaskRecord,
};
use tctalent_core::services::{AllowedAnswer, TaskView};

// ============================================================================
// Responses
// ============================================================================

/// One page of results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedDto<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub number: u32,
    pub size: u32,
    pub first: bool,
    pub last: bool,
}

impl<T> PagedDto<T> {
    pub fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let total_pages = page.total_pages();
        let number = page.request.page;
        Self {
            total_elements: page.total_elements,
            total_pages,
            number,
            size: page.request.size,
            first: number == 0,
            last: i64::from(number) + 1 >= total_pages,
            content: page.content.into_iter().map(f).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub days_to_complete: Option<i32>,
    pub help_link: Option<String>,
    pub optional: bool,
    pub upload_type: Option<String>,
    pub upload_subfolder_name: Option<String>,
    pub required_metadata: Vec<MetadataField>,
    pub candidate_answer_field: Option<String>,
    pub allowed_answers: Option<Vec<AllowedAnswer>>,
}

impl TaskDto {
    pub fn from_record(task: TaskRecord, allowed_answers: Option<Vec<AllowedAnswer>>) -> Self {
        Self {
            required_metadata: task.required_metadata_fields().unwrap_or_default(),
            id: task.id,
            name: task.name,
            display_name: task.display_name,
            description: task.description,
            task_type: task.task_type,
            days_to_complete: task.days_to_complete,
            help_link: task.help_link,
            optional: task.optional,
            upload_type: task.upload_type,
            upload_subfolder_name: task.upload_subfolder_name,
            candidate_answer_field: task.candidate_answer_field,
            allowed_answers,
        }
    }
}

impl From<TaskView> for TaskDto {
    fn from(view: TaskView) -> Self {
        Self::from_record(view.task, view.allowed_answers)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignmentDto {
    pub id: i64,
    pub task: TaskDto,
    pub candidate_id: i64,
    pub status: AssignmentStatus,
    pub due_date: Option<NaiveDate>,
    pub candidate_notes: Option<String>,
    pub completed_date: Option<DateTime<Utc>>,
    pub abandoned_date: Option<DateTime<Utc>>,
    pub related_list_id: Option<i64>,
    pub activated_date: DateTime<Utc>,
    pub deactivated_date: Option<DateTime<Utc>>,
}

impl TaskAssignmentDto {
    pub fn new(assignment: TaskAssignmentRecord, task: TaskDto) -> Self {
        Self {
            id: assignment.id,
            task,
            candidate_id: assignment.candidate_id,
            status: assignment.status,
            due_date: assignment.due_date,
            candidate_notes: assignment.candidate_notes,
            completed_date: assignment.completed_date,
            abandoned_date: assignment.abandoned_date,
            related_list_id: assignment.related_list_id,
            activated_date: assignment.activated_date,
            deactivated_date: assignment.deactivated_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateOppDto {
    pub id: i64,
    pub sf_id: Option<String>,
    pub candidate_id: Option<i64>,
    pub job_opp_id: Option<i64>,
    pub name: Option<String>,
    pub stage: CandidateOpportunityStage,
    pub closed: bool,
    pub won: bool,
    pub next_step: Option<String>,
    pub next_step_due_date: Option<NaiveDate>,
    pub closing_comments: Option<String>,
    pub closing_comments_for_candidate: Option<String>,
    pub employer_feedback: Option<String>,
    pub file_offer_link: Option<String>,
    pub file_offer_name: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl From<CandidateOppRecord> for CandidateOppDto {
    fn from(opp: CandidateOppRecord) -> Self {
        Self {
            id: opp.id,
            sf_id: opp.sf_id,
            candidate_id: opp.candidate_id,
            job_opp_id: opp.job_opp_id,
            name: opp.name,
            stage: opp.stage,
            closed: opp.closed,
            won: opp.won,
            next_step: opp.next_step,
            next_step_due_date: opp.next_step_due_date,
            closing_comments: opp.closing_comments,
            closing_comments_for_candidate: opp.closing_comments_for_candidate,
            employer_feedback: opp.employer_feedback,
            file_offer_link: opp.file_offer_link,
            file_offer_name: opp.file_offer_name,
            created_date: opp.created_date,
            updated_date: opp.updated_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobChatDto {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: JobChatType,
    pub job_opp_id: Option<i64>,
    pub source_partner_id: Option<i64>,
    pub candidate_id: Option<i64>,
    pub created_date: DateTime<Utc>,
}

impl From<JobChatRecord> for JobChatDto {
    fn from(chat: JobChatRecord) -> Self {
        Self {
            id: chat.id,
            chat_type: chat.chat_type,
            job_opp_id: chat.job_opp_id,
            source_partner_id: chat.source_partner_id,
            candidate_id: chat.candidate_id,
            created_date: chat.created_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub healthy: bool,
    pub version: &'static str,
    pub uptime_ms: u64,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchTaskRequest {
    pub keyword: Option<String>,
    pub page_number: u32,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub days_to_complete: Option<i32>,
    #[serde(default)]
    pub help_link: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskAssignmentRequest {
    pub task_id: i64,
    #[serde(default)]
    pub candidate_id: Option<i64>,
    #[serde(default)]
    pub saved_list_id: Option<i64>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListTaskAssignmentsRequest {
    pub task_id: Option<i64>,
    pub saved_list_id: Option<i64>,
}

/// Admin update of an assignment.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTaskAssignmentRequest {
    pub due_date: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub abandoned: bool,
    pub candidate_notes: Option<String>,
}

/// Candidate update of a simple assignment.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortalUpdateTaskAssignmentRequest {
    pub completed: bool,
    pub abandoned: bool,
    pub candidate_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUploadTaskAssignmentRequest {
    pub abandoned: bool,
    pub candidate_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateQuestionTaskAssignmentRequest {
    pub abandoned: bool,
    pub answer: Option<String>,
    pub candidate_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentRequest {
    pub candidate_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrCreateJobChatRequest {
    #[serde(rename = "type")]
    pub chat_type: JobChatType,
    #[serde(default)]
    pub job_id: Option<i64>,
    #[serde(default)]
    pub source_partner_id: Option<i64>,
    #[serde(default)]
    pub candidate_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tctalent_core::persistence::PageRequest;

    #[test]
    fn test_paged_flags() {
        let page = Page {
            content: vec![1, 2],
            total_elements: 12,
            request: PageRequest::new(1, 5),
        };
        let dto = PagedDto::from_page(page, |n| n * 10);
        assert_eq!(dto.content, vec![10, 20]);
        assert_eq!(dto.total_pages, 3);
        assert!(!dto.first);
        assert!(!dto.last);

        let empty: PagedDto<i32> = PagedDto::from_page(
            Page {
                content: Vec::<i32>::new(),
                total_elements: 0,
                request: PageRequest::new(0, 20),
            },
            |n| n,
        );
        assert!(empty.first && empty.last);
    }

    #[test]
    fn test_job_chat_request_uses_type_key() {
        let request: GetOrCreateJobChatRequest =
            serde_json::from_str(r#"{"type":"JobCreatorSourcePartner","jobId":4,"sourcePartnerId":2}"#)
                .unwrap();
        assert_eq!(request.chat_type, JobChatType::JobCreatorSourcePartner);
        assert_eq!(request.job_id, Some(4));
        assert!(request.candidate_id.is_none());
    }
}
