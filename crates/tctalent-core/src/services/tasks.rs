// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task definitions.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{CoreError, Result};
use crate::model::{CandidateStatus, TaskType};
use crate::persistence::{Page, PageRequest, Persistence, TaskFilter, TaskRecord};

/// One answer a question task accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedAnswer {
    pub name: String,
    pub display_name: String,
}

impl AllowedAnswer {
    fn new(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// A task together with the answers it accepts, if it is a question.
#[derive(Debug, Clone)]
pub struct TaskView {
    pub task: TaskRecord,
    pub allowed_answers: Option<Vec<AllowedAnswer>>,
}

/// Editable task attributes.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub display_name: String,
    pub description: Option<String>,
    pub days_to_complete: Option<i32>,
    pub help_link: Option<String>,
    pub optional: bool,
}

pub struct TaskService {
    persistence: Arc<dyn Persistence>,
}

impl TaskService {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    pub async fn get(&self, id: i64) -> Result<TaskView> {
        let task = self.get_record(id).await?;
        Self::view(task)
    }

    pub(crate) async fn get_record(&self, id: i64) -> Result<TaskRecord> {
        self.persistence
            .get_task(id)
            .await?
            .ok_or_else(|| CoreError::no_such_object("Task", id))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<TaskView> {
        let task = self
            .persistence
            .find_task_by_name(name)
            .await?
            .ok_or_else(|| CoreError::no_such_object("Task", name))?;
        Self::view(task)
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskView>> {
        self.persistence
            .list_tasks()
            .await?
            .into_iter()
            .map(Self::view)
            .collect()
    }

    pub async fn search_tasks(
        &self,
        keyword: Option<String>,
        page: PageRequest,
    ) -> Result<Page<TaskView>> {
        let found = self
            .persistence
            .search_tasks(&TaskFilter { keyword }, page)
            .await?;
        let content = found
            .content
            .into_iter()
            .map(Self::view)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            content,
            total_elements: found.total_elements,
            request: found.request,
        })
    }

    /// Update the editable attributes of a task. Display names are unique.
    #[instrument(skip(self, update), fields(display_name = %update.display_name))]
    pub async fn update(&self, id: i64, update: TaskUpdate, user_id: i64) -> Result<TaskView> {
        let mut task = self.get_record(id).await?;

        if let Some(existing) = self
            .persistence
            .find_task_by_display_name(&update.display_name)
            .await?
            && existing.id != id
        {
            return Err(CoreError::EntityExists {
                object_type: "Task".to_string(),
                value: update.display_name,
            });
        }

        task.display_name = update.display_name;
        task.description = update.description;
        task.days_to_complete = update.days_to_complete;
        task.help_link = update.help_link.filter(|l| !l.trim().is_empty());
        task.optional = update.optional;
        task.updated_by = Some(user_id);
        task.updated_date = Some(Utc::now());

        self.persistence.update_task(&task).await?;
        info!("Task updated");
        Self::view(task)
    }

    fn view(task: TaskRecord) -> Result<TaskView> {
        let allowed_answers = Self::allowed_answers(&task)?;
        Ok(TaskView {
            task,
            allowed_answers,
        })
    }

    /// Answers accepted by a question task; `None` for other task types or
    /// free text questions.
    pub fn allowed_answers(task: &TaskRecord) -> Result<Option<Vec<AllowedAnswer>>> {
        if !matches!(task.task_type, TaskType::Question | TaskType::YesNoQuestion) {
            return Ok(None);
        }

        match task.candidate_answer_field.as_deref() {
            Some("status") => Ok(Some(
                CandidateStatus::ALL
                    .iter()
                    .map(|s| AllowedAnswer::new(s.as_str(), s.as_str()))
                    .collect(),
            )),
            Some(field) => Err(CoreError::no_such_object("Candidate field", field)),
            None => {
                let explicit = task.explicit_answers()?;
                if !explicit.is_empty() {
                    Ok(Some(
                        explicit.iter().map(|a| AllowedAnswer::new(a, a)).collect(),
                    ))
                } else if task.task_type == TaskType::YesNoQuestion {
                    Ok(Some(vec![
                        AllowedAnswer::new("Yes", "Yes"),
                        AllowedAnswer::new("No", "No"),
                    ]))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::TestContext;

    #[tokio::test]
    async fn test_get_missing_task() {
        let ctx = TestContext::new().await;
        let err = ctx.services.tasks.get(42).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing Task with id '42'");
    }

    #[tokio::test]
    async fn test_get_by_name_is_case_insensitive() {
        let ctx = TestContext::new().await;
        ctx.simple_task("completeIntake").await;
        let view = ctx.services.tasks.get_by_name("COMPLETEINTAKE").await.unwrap();
        assert_eq!(view.task.name, "completeIntake");
        assert!(view.allowed_answers.is_none());
    }

    #[tokio::test]
    async fn test_allowed_answers() {
        let ctx = TestContext::new().await;

        let yes_no = ctx.yes_no_task("travelDocs").await;
        let view = ctx.services.tasks.get(yes_no.id).await.unwrap();
        let names: Vec<_> = view
            .allowed_answers
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Yes", "No"]);

        let explicit = ctx
            .question_task("englishLevel", Some(r#"["Basic","Fluent"]"#))
            .await;
        let view = ctx.services.tasks.get(explicit.id).await.unwrap();
        assert_eq!(view.allowed_answers.unwrap().len(), 2);

        let status = ctx.field_question_task("statusQuestion", "status").await;
        let view = ctx.services.tasks.get(status.id).await.unwrap();
        assert_eq!(view.allowed_answers.unwrap().len(), CandidateStatus::ALL.len());

        let free_text = ctx.question_task("freeText", None).await;
        assert!(TaskService::allowed_answers(&free_text).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_task() {
        let ctx = TestContext::new().await;
        let task = ctx.simple_task("intake").await;

        let view = ctx
            .services
            .tasks
            .update(
                task.id,
                TaskUpdate {
                    display_name: "Complete intake".to_string(),
                    description: Some("Fill in the intake form".to_string()),
                    days_to_complete: Some(14),
                    help_link: Some("  ".to_string()),
                    optional: true,
                },
                7,
            )
            .await
            .unwrap();

        assert_eq!(view.task.display_name, "Complete intake");
        assert!(view.task.help_link.is_none());
        let stored = ctx.services.tasks.get(task.id).await.unwrap().task;
        assert_eq!(stored.days_to_complete, Some(14));
        assert!(stored.optional);
        assert_eq!(stored.updated_by, Some(7));
    }

    #[tokio::test]
    async fn test_update_rejects_duplicate_display_name() {
        let ctx = TestContext::new().await;
        let first = ctx.simple_task("first").await;
        ctx.simple_task("second").await;

        let err = ctx
            .services
            .tasks
            .update(
                first.id,
                TaskUpdate {
                    display_name: "SECOND task".to_string(),
                    ..Default::default()
                },
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EntityExists { .. }));
    }

    #[tokio::test]
    async fn test_search_tasks() {
        let ctx = TestContext::new().await;
        ctx.simple_task("uploadCv").await;
        ctx.simple_task("uploadId").await;
        ctx.simple_task("intake").await;

        let page = ctx
            .services
            .tasks
            .search_tasks(Some("upload".to_string()), PageRequest::new(0, 10))
            .await
            .unwrap();
        assert_eq!(page.total_elements, 2);
    }
}
