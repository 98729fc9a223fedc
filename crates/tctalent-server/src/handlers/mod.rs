// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request handlers, one module per resource.

pub mod health;
pub mod job_chat;
pub mod opp;
pub mod portal;
pub mod system;
pub mod task;
pub mod task_assignment;

use std::collections::HashMap;

use axum::extract::Multipart;
use tctalent_core::persistence::TaskAssignmentRecord;
use tctalent_core::services::{TaskView, UploadedFile};

use crate::dto::{TaskAssignmentDto, TaskDto};
use crate::error::ApiResult;
use crate::state::AppState;

/// Multipart field carrying uploaded files.
const FILE_FIELD: &str = "file";

/// Split a multipart body into uploaded files and text fields.
pub(crate) async fn read_multipart(
    mut multipart: Multipart,
) -> ApiResult<(Vec<UploadedFile>, HashMap<String, String>)> {
    let mut files = Vec::new();
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content = field.bytes().await?.to_vec();
                files.push(UploadedFile {
                    name: file_name,
                    content,
                });
            }
            None if name == FILE_FIELD => {
                // A file part sent without a file name
                let content = field.bytes().await?.to_vec();
                files.push(UploadedFile {
                    name: FILE_FIELD.to_string(),
                    content,
                });
            }
            None => {
                let value = field.text().await?;
                fields.insert(name, value);
            }
        }
    }
    Ok((files, fields))
}

/// Assignment DTOs with their tasks, loading each task once.
pub(crate) async fn assignment_dtos(
    state: &AppState,
    assignments: Vec<TaskAssignmentRecord>,
) -> ApiResult<Vec<TaskAssignmentDto>> {
    let mut tasks: HashMap<i64, TaskView> = HashMap::new();
    let mut dtos = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let task = match tasks.get(&assignment.task_id) {
            Some(view) => view.clone(),
            None => {
                let view = state.services.tasks.get(assignment.task_id).await?;
                tasks.insert(assignment.task_id, view.clone());
                view
            }
        };
        dtos.push(TaskAssignmentDto::new(assignment, TaskDto::from(task)));
    }
    Ok(dtos)
}

pub(crate) async fn assignment_dto(
    state: &AppState,
    assignment: TaskAssignmentRecord,
) -> ApiResult<TaskAssignmentDto> {
    let task = state.services.tasks.get(assignment.task_id).await?;
    Ok(TaskAssignmentDto::new(assignment, task.into()))
}
