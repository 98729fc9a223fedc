// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job chats.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::model::JobChatType;
use crate::persistence::{CandidateOppRecord, JobChatRecord, Persistence};

pub struct JobChatService {
    persistence: Arc<dyn Persistence>,
}

impl JobChatService {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    /// Create a chat without checking which references the type needs.
    pub async fn create_job_chat(
        &self,
        chat_type: JobChatType,
        job_opp_id: Option<i64>,
        source_partner_id: Option<i64>,
        candidate_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<JobChatRecord> {
        let mut chat = JobChatRecord {
            id: 0,
            chat_type,
            job_opp_id,
            source_partner_id,
            candidate_id,
            created_by: user_id,
            created_date: Utc::now(),
        };
        chat.id = self.persistence.insert_job_chat(&chat).await?;
        debug!(chat_id = chat.id, chat_type = %chat_type, "Created job chat");
        Ok(chat)
    }

    /// Create a chat about the candidate of `opp`.
    pub async fn create_candidate_opp_chat(
        &self,
        chat_type: JobChatType,
        opp: &CandidateOppRecord,
        user_id: Option<i64>,
    ) -> Result<JobChatRecord> {
        let candidate_id = opp
            .candidate_id
            .ok_or_else(|| CoreError::invalid_request("Missing candidate"))?;
        match chat_type {
            JobChatType::CandidateProspect => {
                self.create_job_chat(chat_type, None, None, Some(candidate_id), user_id)
                    .await
            }
            JobChatType::CandidateRecruiting => {
                let job_opp_id = opp
                    .job_opp_id
                    .ok_or_else(|| CoreError::invalid_request("Missing Job"))?;
                self.create_job_chat(chat_type, Some(job_opp_id), None, Some(candidate_id), user_id)
                    .await
            }
            other => Err(CoreError::invalid_request(format!(
                "Unsupported type: {}",
                other
            ))),
        }
    }

    /// Find the chat of the given type for the references that type uses,
    /// creating it when missing. References the type does not use are
    /// ignored.
    pub async fn get_or_create_job_chat(
        &self,
        chat_type: JobChatType,
        job_opp_id: Option<i64>,
        source_partner_id: Option<i64>,
        candidate_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<JobChatRecord> {
        let (job, partner, candidate) = match chat_type {
            JobChatType::AllJobCandidates | JobChatType::JobCreatorAllSourcePartners => {
                (Some(require(job_opp_id, "Missing Job")?), None, None)
            }
            JobChatType::JobCreatorSourcePartner => (
                Some(require(job_opp_id, "Missing Job")?),
                Some(require(source_partner_id, "Missing source partner")?),
                None,
            ),
            JobChatType::CandidateProspect => {
                (None, None, Some(require(candidate_id, "Missing candidate")?))
            }
            JobChatType::CandidateRecruiting => {
                let candidate = require(candidate_id, "Missing candidate")?;
                (Some(require(job_opp_id, "Missing Job")?), None, Some(candidate))
            }
        };

        match self
            .persistence
            .find_job_chat(chat_type, job, partner, candidate)
            .await?
        {
            Some(chat) => Ok(chat),
            None => {
                self.create_job_chat(chat_type, job, partner, candidate, user_id)
                    .await
            }
        }
    }

    pub async fn get_job_chat(&self, id: i64) -> Result<JobChatRecord> {
        self.persistence
            .get_job_chat(id)
            .await?
            .ok_or_else(|| CoreError::no_such_object("JobChat", id))
    }
}

fn require(id: Option<i64>, message: &str) -> Result<i64> {
    id.ok_or_else(|| CoreError::invalid_request(message))
}
