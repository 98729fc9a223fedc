// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain services.
//!
//! Each service owns one area of the domain and talks to storage through
//! [`Persistence`], to Salesforce through [`SalesforceService`] and to the
//! document store through [`FileSystemService`].

pub mod candidate_opportunity;
pub mod candidates;
pub mod job_chat;
pub mod job_opp;
pub mod task_assignment;
pub mod task_processor;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_support;

pub use candidate_opportunity::{
    CandidateOpportunityService, CreateUpdateCandidateOppsRequest, OppOwnership,
    SearchCandidateOppsRequest,
};
pub use candidates::CandidateService;
pub use job_chat::JobChatService;
pub use job_opp::JobOppService;
pub use task_assignment::TaskAssignmentService;
pub use task_processor::{TaskCompletion, TaskProcessor, UploadedFile};
pub use tasks::{AllowedAnswer, TaskService, TaskUpdate, TaskView};

use std::sync::Arc;

use crate::drive::FileSystemService;
use crate::model::Role;
use crate::persistence::Persistence;
use crate::salesforce::SalesforceService;

/// The authenticated user on whose behalf a service acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
    pub partner_id: Option<i64>,
}

/// All services wired together.
#[derive(Clone)]
pub struct Services {
    pub candidates: Arc<CandidateService>,
    pub tasks: Arc<TaskService>,
    pub task_assignments: Arc<TaskAssignmentService>,
    pub job_chats: Arc<JobChatService>,
    pub job_opps: Arc<JobOppService>,
    pub candidate_opps: Arc<CandidateOpportunityService>,
    pub persistence: Arc<dyn Persistence>,
}

impl Services {
    pub fn new(
        persistence: Arc<dyn Persistence>,
        salesforce: Arc<dyn SalesforceService>,
        drive: Arc<dyn FileSystemService>,
    ) -> Self {
        let candidates = Arc::new(CandidateService::new(persistence.clone(), drive.clone()));
        let tasks = Arc::new(TaskService::new(persistence.clone()));
        let task_assignments = Arc::new(TaskAssignmentService::new(
            persistence.clone(),
            candidates.clone(),
            drive.clone(),
        ));
        let job_chats = Arc::new(JobChatService::new(persistence.clone()));
        let job_opps = Arc::new(JobOppService::new(persistence.clone(), salesforce.clone()));
        let candidate_opps = Arc::new(CandidateOpportunityService::new(
            persistence.clone(),
            salesforce,
            drive,
            candidates.clone(),
            job_opps.clone(),
            job_chats.clone(),
        ));

        Self {
            candidates,
            tasks,
            task_assignments,
            job_chats,
            job_opps,
            candidate_opps,
            persistence,
        }
    }
}
