// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task assignment lifecycle.
//!
//! An assignment starts `active`. The candidate completes or abandons it;
//! staff may deactivate or delete it. Completion is delegated to the
//! [`TaskProcessor`] registered for the task's type.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use super::candidates::CandidateService;
use super::task_processor::{
    QuestionTaskProcessor, SimpleTaskProcessor, TaskCompletion, TaskProcessor,
    UploadTaskProcessor, UploadedFile,
};
use crate::drive::FileSystemService;
use crate::error::{CoreError, Result};
use crate::model::{AssignmentStatus, TaskType};
use crate::persistence::{Persistence, TaskAssignmentRecord, TaskRecord};

pub struct TaskAssignmentService {
    persistence: Arc<dyn Persistence>,
    candidates: Arc<CandidateService>,
    processors: HashMap<TaskType, Arc<dyn TaskProcessor>>,
}

impl TaskAssignmentService {
    /// Service with a processor for every task type.
    pub fn new(
        persistence: Arc<dyn Persistence>,
        candidates: Arc<CandidateService>,
        drive: Arc<dyn FileSystemService>,
    ) -> Self {
        let processors: Vec<Arc<dyn TaskProcessor>> = vec![
            Arc::new(SimpleTaskProcessor),
            Arc::new(QuestionTaskProcessor::new(candidates.clone())),
            Arc::new(UploadTaskProcessor::new(candidates.clone(), drive)),
        ];
        Self::with_processors(persistence, candidates, processors)
    }

    pub fn with_processors(
        persistence: Arc<dyn Persistence>,
        candidates: Arc<CandidateService>,
        processors: Vec<Arc<dyn TaskProcessor>>,
    ) -> Self {
        let mut by_type = HashMap::new();
        for processor in processors {
            for task_type in processor.task_types() {
                by_type.insert(*task_type, processor.clone());
            }
        }
        Self {
            persistence,
            candidates,
            processors: by_type,
        }
    }

    fn processor(&self, task_type: TaskType) -> Result<Arc<dyn TaskProcessor>> {
        self.processors.get(&task_type).cloned().ok_or_else(|| {
            CoreError::invalid_request(format!(
                "No processor found for task type: {}",
                task_type
            ))
        })
    }

    async fn task(&self, task_id: i64) -> Result<TaskRecord> {
        self.persistence
            .get_task(task_id)
            .await?
            .ok_or_else(|| CoreError::no_such_object("Task", task_id))
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Assign a task to one candidate, or to every candidate of a saved list.
    ///
    /// With a saved list the first new assignment is returned, or `None` if
    /// the list is empty.
    #[instrument(skip(self, task), fields(task = %task.name))]
    pub async fn assign_task_to_candidate(
        &self,
        user_id: Option<i64>,
        task: &TaskRecord,
        candidate_id: Option<i64>,
        saved_list_id: Option<i64>,
        due_date: Option<NaiveDate>,
    ) -> Result<Option<TaskAssignmentRecord>> {
        if let Some(list_id) = saved_list_id {
            self.persistence
                .get_saved_list(list_id)
                .await?
                .ok_or_else(|| CoreError::no_such_object("SavedList", list_id))?;
            let members = self.persistence.list_candidate_ids_in_list(list_id).await?;

            let mut first = None;
            for member in members {
                let assignment = self
                    .create_assignment(user_id, task, member, Some(list_id), due_date)
                    .await?;
                first.get_or_insert(assignment);
            }
            return Ok(first);
        }

        if let Some(candidate_id) = candidate_id {
            self.candidates.get(candidate_id).await?;
            let assignment = self
                .create_assignment(user_id, task, candidate_id, None, due_date)
                .await?;
            return Ok(Some(assignment));
        }

        Err(CoreError::invalid_request(
            "Either candidate or savedList must be provided",
        ))
    }

    async fn create_assignment(
        &self,
        user_id: Option<i64>,
        task: &TaskRecord,
        candidate_id: i64,
        related_list_id: Option<i64>,
        due_date: Option<NaiveDate>,
    ) -> Result<TaskAssignmentRecord> {
        self.processor(task.task_type)?;

        let due_date = due_date.or_else(|| {
            task.days_to_complete
                .and_then(|days| today().checked_add_days(Days::new(days.max(0) as u64)))
        });

        let mut assignment = TaskAssignmentRecord {
            id: 0,
            task_id: task.id,
            candidate_id,
            status: AssignmentStatus::Active,
            due_date,
            candidate_notes: None,
            completed_date: None,
            abandoned_date: None,
            related_list_id,
            activated_by: user_id,
            activated_date: Utc::now(),
            deactivated_by: None,
            deactivated_date: None,
        };
        assignment.id = self.persistence.insert_task_assignment(&assignment).await?;
        debug!(assignment_id = assignment.id, candidate_id, "Task assigned");
        Ok(assignment)
    }

    pub async fn get(&self, id: i64) -> Result<TaskAssignmentRecord> {
        self.persistence
            .get_task_assignment(id)
            .await?
            .ok_or_else(|| CoreError::no_such_object("TaskAssignment", id))
    }

    /// The assignment together with its task.
    pub async fn get_with_task(&self, id: i64) -> Result<(TaskAssignmentRecord, TaskRecord)> {
        let assignment = self.get(id).await?;
        let task = self.task(assignment.task_id).await?;
        Ok((assignment, task))
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Update completion state, notes and due date.
    ///
    /// `completed = None` leaves the completion state untouched. Completing
    /// runs the processor's completion hook every time.
    #[instrument(skip(self, assignment, notes), fields(assignment_id = assignment.id))]
    pub async fn update(
        &self,
        mut assignment: TaskAssignmentRecord,
        completed: Option<bool>,
        abandoned: bool,
        notes: Option<String>,
        due_date: Option<NaiveDate>,
    ) -> Result<TaskAssignmentRecord> {
        if let Some(due_date) = due_date {
            assignment.due_date = Some(due_date);
        }
        if let Some(notes) = notes {
            assignment.candidate_notes = Some(notes);
        }

        match completed {
            Some(true) => {
                if assignment.completed_date.is_none() {
                    assignment.completed_date = Some(Utc::now());
                }
                self.handle_completion(&assignment).await?;
            }
            Some(false) => assignment.completed_date = None,
            None => {}
        }

        if abandoned {
            if assignment.abandoned_date.is_none() {
                assignment.abandoned_date = Some(Utc::now());
            }
        } else {
            assignment.abandoned_date = None;
        }

        self.persistence.save_task_assignment(&assignment).await?;
        Ok(assignment)
    }

    /// Update an upload assignment without touching its completion state.
    pub async fn update_upload_task_assignment(
        &self,
        assignment: TaskAssignmentRecord,
        abandoned: bool,
        notes: Option<String>,
        due_date: Option<NaiveDate>,
    ) -> Result<TaskAssignmentRecord> {
        self.update(assignment, None, abandoned, notes, due_date)
            .await
    }

    /// Answer a question task, or abandon it.
    ///
    /// A non abandoned answer must not be blank. The answer is stored on the
    /// candidate before the assignment is marked completed, so a rejected
    /// answer leaves the assignment unchanged.
    pub async fn update_question_task(
        &self,
        assignment: TaskAssignmentRecord,
        abandoned: bool,
        answer: Option<String>,
        notes: Option<String>,
    ) -> Result<TaskAssignmentRecord> {
        if abandoned {
            return self.update(assignment, Some(false), true, notes, None).await;
        }
        if answer.as_deref().is_none_or(|a| a.trim().is_empty()) {
            return Err(CoreError::invalid_request("Missing answer to question"));
        }

        // 1. Store the answer through the task's processor
        let answered = self
            .complete_task(
                assignment,
                TaskCompletion {
                    answer,
                    ..Default::default()
                },
            )
            .await?;

        // 2. Notes, abandoned state and follow-up tasks
        self.update(answered, Some(true), false, notes, None).await
    }

    /// Apply a candidate submission through the task's processor and save.
    pub async fn complete_task(
        &self,
        mut assignment: TaskAssignmentRecord,
        completion: TaskCompletion,
    ) -> Result<TaskAssignmentRecord> {
        let task = self.task(assignment.task_id).await?;
        let processor = self.processor(task.task_type)?;
        processor
            .complete_task(&mut assignment, &task, completion)
            .await?;
        self.persistence.save_task_assignment(&assignment).await?;
        Ok(assignment)
    }

    /// Complete an upload task with the given files and metadata answers.
    #[instrument(skip(self, files, field_answers), fields(file_count = files.len()))]
    pub async fn complete_upload_task(
        &self,
        assignment_id: i64,
        files: Vec<UploadedFile>,
        field_answers: HashMap<String, String>,
    ) -> Result<TaskAssignmentRecord> {
        let assignment = self.get(assignment_id).await?;
        let task = self.task(assignment.task_id).await?;
        if task.task_type != TaskType::Upload {
            return Err(CoreError::invalid_request(format!(
                "Task '{}' is not an upload task",
                task.name
            )));
        }
        let completed = self
            .complete_task(
                assignment,
                TaskCompletion {
                    files,
                    field_answers,
                    answer: None,
                },
            )
            .await?;
        info!("Upload task completed");
        Ok(completed)
    }

    /// Mark the assignment completed now.
    pub async fn complete_task_assignment(
        &self,
        mut assignment: TaskAssignmentRecord,
    ) -> Result<TaskAssignmentRecord> {
        assignment.completed_date = Some(Utc::now());
        self.persistence.save_task_assignment(&assignment).await?;
        Ok(assignment)
    }

    async fn handle_completion(&self, assignment: &TaskAssignmentRecord) -> Result<()> {
        let task = self.task(assignment.task_id).await?;
        let follow_ups = self
            .processor(task.task_type)?
            .handle_completion(assignment, &task)
            .await?;

        for name in follow_ups {
            let follow_up = self
                .persistence
                .find_task_by_name(name)
                .await?
                .ok_or_else(|| CoreError::no_such_object("Task", name))?;
            let due = today()
                .checked_add_days(Days::new(
                    follow_up.days_to_complete.unwrap_or(0).max(0) as u64,
                ))
                .unwrap_or_else(today);
            self.create_assignment(
                assignment.activated_by,
                &follow_up,
                assignment.candidate_id,
                None,
                Some(due),
            )
            .await?;
            info!(task = name, candidate_id = assignment.candidate_id, "Assigned follow-up task");
        }
        Ok(())
    }

    // ========================================================================
    // Deactivation
    // ========================================================================

    pub async fn deactivate(&self, user_id: i64, id: i64) -> Result<()> {
        self.set_status(user_id, id, AssignmentStatus::Inactive)
            .await
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<bool> {
        self.set_status(user_id, id, AssignmentStatus::Deleted)
            .await?;
        Ok(true)
    }

    async fn set_status(&self, user_id: i64, id: i64, status: AssignmentStatus) -> Result<()> {
        let mut assignment = self.get(id).await?;
        assignment.status = status;
        assignment.deactivated_by = Some(user_id);
        assignment.deactivated_date = Some(Utc::now());
        self.persistence.save_task_assignment(&assignment).await?;
        info!(assignment_id = id, status = %status, "Task assignment deactivated");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn list_task_assignments(
        &self,
        task_id: Option<i64>,
        saved_list_id: Option<i64>,
    ) -> Result<Vec<TaskAssignmentRecord>> {
        self.persistence
            .list_task_assignments(task_id, saved_list_id)
            .await
    }

    pub async fn find_by_task_candidate_status(
        &self,
        task_id: i64,
        candidate_id: i64,
        status: AssignmentStatus,
    ) -> Result<Vec<TaskAssignmentRecord>> {
        self.persistence
            .find_task_assignments(task_id, candidate_id, status)
            .await
    }

    /// Active assignments of the candidate.
    pub async fn list_candidate_assignments(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<TaskAssignmentRecord>> {
        self.persistence
            .list_candidate_task_assignments(candidate_id, Some(AssignmentStatus::Active))
            .await
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateStatus;
    use crate::services::test_support::TestContext;

    #[tokio::test]
    async fn test_assign_to_candidate_defaults_due_date() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2001").await;
        let task = ctx.simple_task("intake").await;

        let assignment = ctx
            .services
            .task_assignments
            .assign_task_to_candidate(Some(5), &task, Some(candidate.id), None, None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(assignment.status, AssignmentStatus::Active);
        assert_eq!(assignment.activated_by, Some(5));
        assert_eq!(
            assignment.due_date,
            today().checked_add_days(Days::new(7))
        );
        assert!(assignment.related_list_id.is_none());
    }

    #[tokio::test]
    async fn test_assign_with_explicit_due_date() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2002").await;
        let task = ctx.simple_task("intake").await;
        let due = NaiveDate::from_ymd_opt(2030, 1, 31).unwrap();

        let assignment = ctx
            .services
            .task_assignments
            .assign_task_to_candidate(None, &task, Some(candidate.id), None, Some(due))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(assignment.due_date, Some(due));
    }

    #[tokio::test]
    async fn test_assign_to_saved_list() {
        let ctx = TestContext::new().await;
        let a = ctx.candidate("2003").await;
        let b = ctx.candidate("2004").await;
        let list = ctx.saved_list(&[a.id, b.id]).await;
        let empty = ctx.saved_list(&[]).await;
        let task = ctx.simple_task("intake").await;
        let service = &ctx.services.task_assignments;

        let first = service
            .assign_task_to_candidate(Some(1), &task, None, Some(list), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.candidate_id, a.id);
        assert_eq!(first.related_list_id, Some(list));

        let listed = service.list_task_assignments(Some(task.id), Some(list)).await.unwrap();
        assert_eq!(listed.len(), 2);

        let none = service
            .assign_task_to_candidate(Some(1), &task, None, Some(empty), None)
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_assign_requires_candidate_or_list() {
        let ctx = TestContext::new().await;
        let task = ctx.simple_task("intake").await;
        let err = ctx
            .services
            .task_assignments
            .assign_task_to_candidate(Some(1), &task, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_assign_without_processor_is_rejected() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2005").await;
        let task = ctx.simple_task("intake").await;
        let service = TaskAssignmentService::with_processors(
            ctx.persistence.clone(),
            ctx.services.candidates.clone(),
            Vec::new(),
        );

        let err = service
            .assign_task_to_candidate(Some(1), &task, Some(candidate.id), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No processor found for task type: Simple");
    }

    #[tokio::test]
    async fn test_update_completion_and_abandonment() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2006").await;
        let task = ctx.simple_task("intake").await;
        let assignment = ctx.assignment(&task, &candidate).await;
        let service = &ctx.services.task_assignments;

        let done = service
            .update(assignment, Some(true), false, Some("done".to_string()), None)
            .await
            .unwrap();
        let completed_at = done.completed_date.unwrap();
        assert_eq!(done.candidate_notes.as_deref(), Some("done"));

        // Completing again keeps the first completion date
        let again = service.update(done, Some(true), false, None, None).await.unwrap();
        assert_eq!(again.completed_date, Some(completed_at));
        assert_eq!(again.candidate_notes.as_deref(), Some("done"));

        // Leaving completion untouched
        let abandoned = service.update(again, None, true, None, None).await.unwrap();
        assert!(abandoned.completed_date.is_some());
        assert!(abandoned.abandoned_date.is_some());

        let reopened = service
            .update(abandoned, Some(false), false, None, None)
            .await
            .unwrap();
        assert!(reopened.completed_date.is_none());
        assert!(reopened.abandoned_date.is_none());

        let stored = service.get(reopened.id).await.unwrap();
        assert!(stored.completed_date.is_none());
    }

    #[tokio::test]
    async fn test_upload_assignment_update_keeps_completion() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2007").await;
        let task = ctx.upload_task("uploadCv", None).await;
        let mut assignment = ctx.assignment(&task, &candidate).await;
        assignment.completed_date = Some(Utc::now());
        let service = &ctx.services.task_assignments;

        let due = NaiveDate::from_ymd_opt(2031, 3, 1).unwrap();
        let updated = service
            .update_upload_task_assignment(assignment, false, Some("later".to_string()), Some(due))
            .await
            .unwrap();
        assert!(updated.completed_date.is_some());
        assert_eq!(updated.due_date, Some(due));
    }

    #[tokio::test]
    async fn test_deactivate_and_delete() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2008").await;
        let task = ctx.simple_task("intake").await;
        let a = ctx.assignment(&task, &candidate).await;
        let b = ctx.assignment(&task, &candidate).await;
        let service = &ctx.services.task_assignments;

        service.deactivate(9, a.id).await.unwrap();
        assert!(service.delete(9, b.id).await.unwrap());

        let a = service.get(a.id).await.unwrap();
        assert_eq!(a.status, AssignmentStatus::Inactive);
        assert_eq!(a.deactivated_by, Some(9));
        assert!(a.deactivated_date.is_some());
        let b = service.get(b.id).await.unwrap();
        assert_eq!(b.status, AssignmentStatus::Deleted);

        assert!(service.list_candidate_assignments(candidate.id).await.unwrap().is_empty());
        let err = service.deactivate(9, 999).await.unwrap_err();
        assert!(matches!(err, CoreError::NoSuchObject { .. }));
    }

    #[tokio::test]
    async fn test_find_by_task_candidate_status() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2009").await;
        let task = ctx.simple_task("intake").await;
        let a = ctx.assignment(&task, &candidate).await;
        ctx.assignment(&task, &candidate).await;
        ctx.services.task_assignments.deactivate(1, a.id).await.unwrap();

        let active = ctx
            .services
            .task_assignments
            .find_by_task_candidate_status(task.id, candidate.id, AssignmentStatus::Active)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_question_requires_answer_unless_abandoned() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2010").await;
        let task = ctx.question_task("visaQuestion", None).await;
        let assignment = ctx.assignment(&task, &candidate).await;
        let service = &ctx.services.task_assignments;

        let err = service
            .update_question_task(assignment.clone(), false, Some("  ".to_string()), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing answer to question");

        let abandoned = service
            .update_question_task(assignment.clone(), true, None, Some("skip".to_string()))
            .await
            .unwrap();
        assert!(abandoned.abandoned_date.is_some());
        assert!(abandoned.completed_date.is_none());

        let answered = service
            .update_question_task(abandoned, false, Some("Yes".to_string()), None)
            .await
            .unwrap();
        assert!(answered.completed_date.is_some());
        assert!(answered.abandoned_date.is_none());

        let props = ctx.persistence.list_candidate_properties(candidate.id).await.unwrap();
        assert_eq!(props[0].name, "visaQuestion");
        assert_eq!(props[0].value.as_deref(), Some("Yes"));
    }

    #[tokio::test]
    async fn test_question_answer_updates_status_field() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2011").await;
        let task = ctx.field_question_task("statusCheck", "status").await;
        let assignment = ctx.assignment(&task, &candidate).await;

        ctx.services
            .task_assignments
            .update_question_task(assignment, false, Some("unreachable".to_string()), None)
            .await
            .unwrap();
        let reloaded = ctx.services.candidates.get(candidate.id).await.unwrap();
        assert_eq!(reloaded.status, CandidateStatus::Unreachable);
    }

    #[tokio::test]
    async fn test_rejected_answer_leaves_assignment_open() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2015").await;
        let task = ctx.field_question_task("statusCheck", "status").await;
        let assignment = ctx.assignment(&task, &candidate).await;
        let service = &ctx.services.task_assignments;

        let err = service
            .update_question_task(assignment.clone(), false, Some("banana".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest { .. }));

        let stored = service.get(assignment.id).await.unwrap();
        assert!(stored.completed_date.is_none());
        let reloaded = ctx.services.candidates.get(candidate.id).await.unwrap();
        assert_eq!(reloaded.status, CandidateStatus::Active);
        assert!(
            ctx.persistence
                .list_candidate_notes(candidate.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_complete_upload_task() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2012").await;
        let task = ctx
            .upload_task(
                "uploadPassport",
                Some(r#"[{"name":"documentNumber"},{"name":"firstName"},{"name":"issuer","required":false}]"#),
            )
            .await;
        let assignment = ctx.assignment(&task, &candidate).await;

        let files = vec![
            UploadedFile {
                name: "passport.pdf".to_string(),
                content: b"%PDF-1.7".to_vec(),
            },
            UploadedFile {
                name: "back.jpg".to_string(),
                content: vec![0xFF, 0xD8],
            },
        ];
        let answers: HashMap<String, String> = [
            ("documentNumber", "N1234567"),
            ("firstName", "Amina"),
            ("issuer", " "),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let completed = ctx
            .services
            .task_assignments
            .complete_upload_task(assignment.id, files, answers)
            .await
            .unwrap();
        assert!(completed.completed_date.is_some());

        let props = ctx.persistence.list_candidate_properties(candidate.id).await.unwrap();
        let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![format!("uploadPassport_ta{}_documentNumber", assignment.id)]
        );

        let attachments = ctx.services.candidates.list_attachments(candidate.id).await.unwrap();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].name, "2012-idCard-passport.pdf");
        assert_eq!(
            attachments[0].location,
            "drive://2012/Identity/2012-idCard-passport.pdf"
        );
        assert!(ctx.drive_root().join("2012/Identity/2012-idCard-back.jpg").exists());
    }

    #[tokio::test]
    async fn test_complete_upload_task_validation() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2013").await;
        let task = ctx
            .upload_task("uploadPassport", Some(r#"[{"name":"documentNumber"}]"#))
            .await;
        let assignment = ctx.assignment(&task, &candidate).await;
        let service = &ctx.services.task_assignments;

        let err = service
            .complete_upload_task(assignment.id, Vec::new(), HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "At least one file must be uploaded");

        let file = UploadedFile {
            name: "passport.pdf".to_string(),
            content: b"x".to_vec(),
        };
        let err = service
            .complete_upload_task(assignment.id, vec![file], HashMap::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("documentNumber"));
        assert!(service.get(assignment.id).await.unwrap().completed_date.is_none());
    }

    #[tokio::test]
    async fn test_bad_file_name_uploads_nothing() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2016").await;
        let task = ctx
            .upload_task("uploadPassport", Some(r#"[{"name":"documentNumber"}]"#))
            .await;
        let assignment = ctx.assignment(&task, &candidate).await;

        let files = vec![
            UploadedFile {
                name: "passport.pdf".to_string(),
                content: b"%PDF-1.7".to_vec(),
            },
            UploadedFile {
                name: "..".to_string(),
                content: b"x".to_vec(),
            },
        ];
        let answers = HashMap::from([("documentNumber".to_string(), "N1234567".to_string())]);
        let err = ctx
            .services
            .task_assignments
            .complete_upload_task(assignment.id, files, answers)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest { .. }));

        let stored = ctx.services.task_assignments.get(assignment.id).await.unwrap();
        assert!(stored.completed_date.is_none());
        assert!(ctx.persistence.list_attachments(candidate.id).await.unwrap().is_empty());
        assert!(
            ctx.persistence
                .list_candidate_properties(candidate.id)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(!ctx.drive_root().join("2016/Identity/2016-idCard-passport.pdf").exists());
    }

    #[tokio::test]
    async fn test_complete_upload_rejects_other_task_types() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2017").await;
        let task = ctx.simple_task("readGuide").await;
        let assignment = ctx.assignment(&task, &candidate).await;

        let file = UploadedFile {
            name: "guide.pdf".to_string(),
            content: b"%PDF-1.7".to_vec(),
        };
        let err = ctx
            .services
            .task_assignments
            .complete_upload_task(assignment.id, vec![file], HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Task 'readGuide' is not an upload task");

        let stored = ctx.services.task_assignments.get(assignment.id).await.unwrap();
        assert!(stored.completed_date.is_none());
    }

    #[tokio::test]
    async fn test_claim_coupon_completion_assigns_duolingo_test() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2014").await;
        let coupon = ctx.upload_task("claimCouponButton", None).await;
        let mut duolingo = ctx.simple_task("duolingoTest").await;
        duolingo.days_to_complete = Some(3);
        ctx.persistence.update_task(&duolingo).await.unwrap();
        let assignment = ctx.assignment(&coupon, &candidate).await;

        ctx.services
            .task_assignments
            .update(assignment, Some(true), false, None, None)
            .await
            .unwrap();

        let follow_ups = ctx
            .services
            .task_assignments
            .find_by_task_candidate_status(duolingo.id, candidate.id, AssignmentStatus::Active)
            .await
            .unwrap();
        assert_eq!(follow_ups.len(), 1);
        assert_eq!(follow_ups[0].due_date, today().checked_add_days(Days::new(3)));
    }

    #[tokio::test]
    async fn test_complete_task_assignment_sets_date() {
        let ctx = TestContext::new().await;
        let candidate = ctx.candidate("2015").await;
        let task = ctx.simple_task("intake").await;
        let assignment = ctx.assignment(&task, &candidate).await;

        let done = ctx
            .services
            .task_assignments
            .complete_task_assignment(assignment)
            .await
            .unwrap();
        let stored = ctx.services.task_assignments.get(done.id).await.unwrap();
        assert!(stored.completed_date.is_some());

        let simple = ctx
            .services
            .task_assignments
            .complete_task(stored, TaskCompletion::default())
            .await
            .unwrap();
        assert!(simple.completed_date.is_some());
    }
}
