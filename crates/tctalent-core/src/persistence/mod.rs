//! Persistence interfaces and backends for tctalent-core.
//!
//! This module defines the record types, the [`Persistence`] trait and the
//! SQLite and PostgreSQL implementations of it.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresPersistence;
pub use self::sqlite::SqlitePersistence;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;

use crate::error::CoreError;
use crate::model::{
    AssignmentStatus, CandidateOpportunityStage, CandidateStatus, JobChatType,
    JobOpportunityStage, Role, TaskType,
};

// ============================================================================
// Record Types
// ============================================================================

/// Staff or candidate login.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Partner organisation the user works for.
    pub partner_id: Option<i64>,
    pub created_date: DateTime<Utc>,
}

/// Partner organisation: a source of candidates and/or a creator of jobs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PartnerRecord {
    pub id: i64,
    pub name: String,
    pub abbreviation: Option<String>,
    /// Salesforce account id of the partner.
    pub sf_id: Option<String>,
    pub job_creator: bool,
    pub source_partner: bool,
}

/// Candidate profile.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRecord {
    pub id: i64,
    /// Public identifier, also the Salesforce Contact external id.
    pub candidate_number: String,
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: CandidateStatus,
    /// Source partner responsible for the candidate.
    pub partner_id: Option<i64>,
    /// Link to the Salesforce Contact.
    pub sf_link: Option<String>,
    /// Link to the candidate's drive folder.
    pub folder_link: Option<String>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

/// Note recorded against a candidate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateNoteRecord {
    pub id: i64,
    pub candidate_id: i64,
    /// "admin" for staff notes, "candidate" for notes the candidate wrote.
    pub note_type: String,
    pub title: String,
    pub comment: Option<String>,
    pub created_by: Option<i64>,
    pub created_date: DateTime<Utc>,
}

/// Free-form named value attached to a candidate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidatePropertyRecord {
    pub candidate_id: i64,
    pub name: String,
    pub value: Option<String>,
    /// Task assignment that produced the value, if any.
    pub related_task_assignment_id: Option<i64>,
}

/// File stored in a candidate's drive folder.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttachmentRecord {
    pub id: i64,
    pub candidate_id: i64,
    pub name: String,
    /// Drive url of the stored file.
    pub location: String,
    pub file_type: Option<String>,
    pub upload_type: Option<String>,
    pub created_by: Option<i64>,
    pub created_date: DateTime<Utc>,
}

/// Named list of candidates.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SavedListRecord {
    pub id: i64,
    pub name: String,
    pub created_by: Option<i64>,
    pub created_date: DateTime<Utc>,
}

/// Metadata an upload task collects alongside the files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataField {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

/// Unit of work that can be assigned to candidates.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRecord {
    pub id: i64,
    /// Unique machine name.
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub task_type: TaskType,
    /// Used to compute a due date when an assignment has none.
    pub days_to_complete: Option<i32>,
    pub help_link: Option<String>,
    pub optional: bool,
    /// Upload tasks only: category of the uploaded documents.
    pub upload_type: Option<String>,
    /// Upload tasks only: subfolder of the candidate folder receiving files.
    pub upload_subfolder_name: Option<String>,
    /// Upload tasks only: JSON array of [`MetadataField`].
    pub required_metadata: Option<String>,
    /// Question tasks only: candidate field receiving the answer.
    pub candidate_answer_field: Option<String>,
    /// Question tasks only: JSON array of allowed answers.
    pub explicit_allowed_answers: Option<String>,
    pub created_by: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_by: Option<i64>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Decoded `required_metadata`.
    pub fn required_metadata_fields(&self) -> Result<Vec<MetadataField>, CoreError> {
        match self.required_metadata.as_deref() {
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(json)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Decoded `explicit_allowed_answers`.
    pub fn explicit_answers(&self) -> Result<Vec<String>, CoreError> {
        match self.explicit_allowed_answers.as_deref() {
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(json)?),
            _ => Ok(Vec::new()),
        }
    }
}

/// A task assigned to one candidate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskAssignmentRecord {
    pub id: i64,
    pub task_id: i64,
    pub candidate_id: i64,
    #[sqlx(try_from = "String")]
    pub status: AssignmentStatus,
    pub due_date: Option<NaiveDate>,
    /// Notes the candidate left on the assignment.
    pub candidate_notes: Option<String>,
    pub completed_date: Option<DateTime<Utc>>,
    pub abandoned_date: Option<DateTime<Utc>>,
    /// Saved list through which the task was assigned.
    pub related_list_id: Option<i64>,
    pub activated_by: Option<i64>,
    pub activated_date: DateTime<Utc>,
    pub deactivated_by: Option<i64>,
    pub deactivated_date: Option<DateTime<Utc>>,
}

/// Local copy of a Salesforce job opportunity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobOppRecord {
    pub id: i64,
    pub sf_id: String,
    pub name: Option<String>,
    pub account_id: Option<String>,
    pub owner_id: Option<String>,
    pub country: Option<String>,
    #[sqlx(try_from = "String")]
    pub stage: JobOpportunityStage,
    pub closed: bool,
    pub won: bool,
    pub closing_comments: Option<String>,
    pub next_step: Option<String>,
    pub next_step_due_date: Option<NaiveDate>,
    pub hiring_commitment: Option<i64>,
    pub opportunity_score: Option<String>,
    /// Partner that created the job.
    pub job_creator_id: Option<i64>,
    /// Staff contact responsible for the job.
    pub contact_user_id: Option<i64>,
    pub published_date: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_by: Option<i64>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl JobOppRecord {
    /// Empty record for the given Salesforce id, not yet persisted.
    pub fn new(sf_id: &str) -> Self {
        Self {
            id: 0,
            sf_id: sf_id.to_string(),
            name: None,
            account_id: None,
            owner_id: None,
            country: None,
            stage: JobOpportunityStage::Prospect,
            closed: false,
            won: false,
            closing_comments: None,
            next_step: None,
            next_step_due_date: None,
            hiring_commitment: None,
            opportunity_score: None,
            job_creator_id: None,
            contact_user_id: None,
            published_date: None,
            created_by: None,
            created_date: None,
            updated_by: None,
            updated_date: None,
        }
    }
}

/// A candidate's progress through one job opportunity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateOppRecord {
    pub id: i64,
    pub sf_id: Option<String>,
    pub candidate_id: Option<i64>,
    pub job_opp_id: Option<i64>,
    pub name: Option<String>,
    #[sqlx(try_from = "String")]
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
    pub created_by: Option<i64>,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_by: Option<i64>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl CandidateOppRecord {
    /// Empty record at the prospect stage, not yet persisted.
    pub fn new() -> Self {
        Self {
            id: 0,
            sf_id: None,
            candidate_id: None,
            job_opp_id: None,
            name: None,
            stage: CandidateOpportunityStage::Prospect,
            closed: false,
            won: false,
            next_step: None,
            next_step_due_date: None,
            closing_comments: None,
            closing_comments_for_candidate: None,
            employer_feedback: None,
            file_offer_link: None,
            file_offer_name: None,
            created_by: None,
            created_date: None,
            updated_by: None,
            updated_date: None,
        }
    }
}

impl Default for CandidateOppRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Chat channel attached to a job, partner and/or candidate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobChatRecord {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub chat_type: JobChatType,
    pub job_opp_id: Option<i64>,
    pub source_partner_id: Option<i64>,
    pub candidate_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_date: DateTime<Utc>,
}

// ============================================================================
// Paging and Filters
// ============================================================================

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        let size = i64::from(self.request.size);
        (self.total_elements + size - 1) / size
    }

    /// Convert each element, keeping the paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            request: self.request,
        }
    }
}

/// Sortable columns of candidate opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OppSortField {
    Id,
    Name,
    Stage,
    NextStepDueDate,
    UpdatedDate,
}

impl OppSortField {
    /// Map a client-facing field name to a column.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "stage" | "stageOrder" => Some(Self::Stage),
            "nextDueDate" | "nextStepDueDate" => Some(Self::NextStepDueDate),
            "updatedDate" => Some(Self::UpdatedDate),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Id => "o.id",
            Self::Name => "o.name",
            Self::Stage => "o.stage_order",
            Self::NextStepDueDate => "o.next_step_due_date",
            Self::UpdatedDate => "o.updated_date",
        }
    }
}

/// Criteria for searching candidate opportunities. All criteria are ANDed.
#[derive(Debug, Clone, Default)]
pub struct CandidateOppFilter {
    /// Case-insensitive substring of the opportunity name.
    pub keyword: Option<String>,
    /// Explicit stages; when non-empty `active_stages` and `sf_opp_closed` are ignored.
    pub stages: Vec<CandidateOpportunityStage>,
    /// Restrict to stages from prospect to relocating.
    pub active_stages: bool,
    /// `Some(false)` excludes closed opps, `Some(true)` adds them to active stages.
    pub sf_opp_closed: Option<bool>,
    /// Only opps whose next step is due before this date.
    pub overdue_before: Option<NaiveDate>,
    /// Only opps of candidates belonging to this source partner.
    pub candidate_partner_id: Option<i64>,
    /// Only opps of jobs created by this partner.
    pub job_creator_id: Option<i64>,
    /// Only opps of jobs this user created or is the contact for.
    pub job_owner_user_id: Option<i64>,
    /// Sort order; `true` is ascending.
    pub sort: Vec<(OppSortField, bool)>,
}

/// Criteria for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Case-insensitive substring of name or display name.
    pub keyword: Option<String>,
}

// ============================================================================
// Persistence Trait
// ============================================================================

/// Storage operations used by the services.
#[async_trait]
pub trait Persistence: Send + Sync {
    // Users and partners
    async fn insert_user(&self, user: &UserRecord) -> Result<i64, CoreError>;
    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, CoreError>;
    async fn insert_partner(&self, partner: &PartnerRecord) -> Result<i64, CoreError>;
    async fn get_partner(&self, id: i64) -> Result<Option<PartnerRecord>, CoreError>;

    // Candidates
    async fn insert_candidate(&self, candidate: &CandidateRecord) -> Result<i64, CoreError>;
    async fn get_candidate(&self, id: i64) -> Result<Option<CandidateRecord>, CoreError>;
    async fn find_candidates_by_ids(&self, ids: &[i64]) -> Result<Vec<CandidateRecord>, CoreError>;
    async fn find_candidate_by_number(
        &self,
        candidate_number: &str,
    ) -> Result<Option<CandidateRecord>, CoreError>;
    async fn update_candidate_status(
        &self,
        id: i64,
        status: CandidateStatus,
    ) -> Result<(), CoreError>;
    async fn update_candidate_sf_link(&self, id: i64, sf_link: &str) -> Result<(), CoreError>;
    async fn update_candidate_folder_link(
        &self,
        id: i64,
        folder_link: &str,
    ) -> Result<(), CoreError>;

    // Candidate notes, properties and attachments
    async fn insert_candidate_note(&self, note: &CandidateNoteRecord) -> Result<i64, CoreError>;
    async fn list_candidate_notes(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<CandidateNoteRecord>, CoreError>;
    async fn upsert_candidate_property(
        &self,
        property: &CandidatePropertyRecord,
    ) -> Result<(), CoreError>;
    async fn list_candidate_properties(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<CandidatePropertyRecord>, CoreError>;
    async fn insert_attachment(&self, attachment: &AttachmentRecord) -> Result<i64, CoreError>;
    async fn list_attachments(&self, candidate_id: i64) -> Result<Vec<AttachmentRecord>, CoreError>;
    /// Stores the properties and attachments of a finished upload atomically.
    async fn record_task_upload(
        &self,
        properties: &[CandidatePropertyRecord],
        attachments: &[AttachmentRecord],
    ) -> Result<(), CoreError>;

    // Saved lists
    async fn insert_saved_list(&self, list: &SavedListRecord) -> Result<i64, CoreError>;
    async fn get_saved_list(&self, id: i64) -> Result<Option<SavedListRecord>, CoreError>;
    async fn add_candidates_to_list(
        &self,
        list_id: i64,
        candidate_ids: &[i64],
    ) -> Result<(), CoreError>;
    /// Candidate ids in the list, ordered by id.
    async fn list_candidate_ids_in_list(&self, list_id: i64) -> Result<Vec<i64>, CoreError>;

    // Tasks
    async fn insert_task(&self, task: &TaskRecord) -> Result<i64, CoreError>;
    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>, CoreError>;
    /// Case-insensitive lookup by name.
    async fn find_task_by_name(&self, name: &str) -> Result<Option<TaskRecord>, CoreError>;
    /// Case-insensitive lookup by display name.
    async fn find_task_by_display_name(
        &self,
        display_name: &str,
    ) -> Result<Option<TaskRecord>, CoreError>;
    /// All tasks ordered by name.
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, CoreError>;
    async fn search_tasks(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<Page<TaskRecord>, CoreError>;
    async fn update_task(&self, task: &TaskRecord) -> Result<(), CoreError>;

    // Task assignments
    async fn insert_task_assignment(
        &self,
        assignment: &TaskAssignmentRecord,
    ) -> Result<i64, CoreError>;
    async fn get_task_assignment(
        &self,
        id: i64,
    ) -> Result<Option<TaskAssignmentRecord>, CoreError>;
    async fn save_task_assignment(&self, assignment: &TaskAssignmentRecord)
    -> Result<(), CoreError>;
    /// Assignments matching the optional task and related list, ordered by id.
    async fn list_task_assignments(
        &self,
        task_id: Option<i64>,
        list_id: Option<i64>,
    ) -> Result<Vec<TaskAssignmentRecord>, CoreError>;
    async fn find_task_assignments(
        &self,
        task_id: i64,
        candidate_id: i64,
        status: AssignmentStatus,
    ) -> Result<Vec<TaskAssignmentRecord>, CoreError>;
    async fn list_candidate_task_assignments(
        &self,
        candidate_id: i64,
        status: Option<AssignmentStatus>,
    ) -> Result<Vec<TaskAssignmentRecord>, CoreError>;

    // Job opportunities
    async fn insert_job_opp(&self, job: &JobOppRecord) -> Result<i64, CoreError>;
    async fn get_job_opp(&self, id: i64) -> Result<Option<JobOppRecord>, CoreError>;
    async fn find_job_opp_by_sf_id(&self, sf_id: &str) -> Result<Option<JobOppRecord>, CoreError>;
    async fn save_job_opp(&self, job: &JobOppRecord) -> Result<(), CoreError>;
    /// Jobs not yet closed, ordered by id.
    async fn list_open_job_opps(&self) -> Result<Vec<JobOppRecord>, CoreError>;

    // Candidate opportunities
    async fn insert_candidate_opp(&self, opp: &CandidateOppRecord) -> Result<i64, CoreError>;
    async fn get_candidate_opp(&self, id: i64) -> Result<Option<CandidateOppRecord>, CoreError>;
    async fn find_candidate_opp_by_sf_id(
        &self,
        sf_id: &str,
    ) -> Result<Option<CandidateOppRecord>, CoreError>;
    async fn find_candidate_opp(
        &self,
        candidate_id: i64,
        job_opp_id: i64,
    ) -> Result<Option<CandidateOppRecord>, CoreError>;
    async fn save_candidate_opp(&self, opp: &CandidateOppRecord) -> Result<(), CoreError>;
    async fn search_candidate_opps(
        &self,
        filter: &CandidateOppFilter,
        page: PageRequest,
    ) -> Result<Page<CandidateOppRecord>, CoreError>;
    async fn count_candidate_opps(&self, filter: &CandidateOppFilter) -> Result<i64, CoreError>;

    // Job chats
    async fn insert_job_chat(&self, chat: &JobChatRecord) -> Result<i64, CoreError>;
    async fn get_job_chat(&self, id: i64) -> Result<Option<JobChatRecord>, CoreError>;
    async fn find_job_chat(
        &self,
        chat_type: JobChatType,
        job_opp_id: Option<i64>,
        source_partner_id: Option<i64>,
        candidate_id: Option<i64>,
    ) -> Result<Option<JobChatRecord>, CoreError>;

    /// Check database connectivity.
    async fn health_check(&self) -> Result<bool, CoreError>;
}

/// Connect to the database named by `url` and run migrations.
///
/// `sqlite:` urls select [`SqlitePersistence`], anything else
/// [`PostgresPersistence`].
pub async fn connect(url: &str) -> Result<Arc<dyn Persistence>, CoreError> {
    if url.starts_with("sqlite:") {
        Ok(Arc::new(SqlitePersistence::connect(url).await?))
    } else {
        Ok(Arc::new(PostgresPersistence::connect(url).await?))
    }
}

// ============================================================================
// Shared query building
// ============================================================================

pub(crate) const CANDIDATE_OPP_COLUMNS: &str = r#"
    o.id, o.sf_id, o.candidate_id, o.job_opp_id, o.name, o.stage, o.closed, o.won,
    o.next_step, o.next_step_due_date, o.closing_comments, o.closing_comments_for_candidate,
    o.employer_feedback, o.file_offer_link, o.file_offer_name,
    o.created_by, o.created_date, o.updated_by, o.updated_date
"#;

pub(crate) const CANDIDATE_OPP_FROM: &str = r#"
    FROM candidate_opportunities o
    LEFT JOIN candidates c ON c.id = o.candidate_id
    LEFT JOIN salesforce_job_opps j ON j.id = o.job_opp_id
    WHERE 1 = 1
"#;

/// Append the WHERE conditions of a candidate opportunity search.
pub(crate) fn push_candidate_opp_filter<'a, DB>(
    qb: &mut QueryBuilder<'a, DB>,
    filter: &CandidateOppFilter,
) where
    DB: sqlx::Database,
    String: sqlx::Encode<'a, DB> + sqlx::Type<DB>,
    i64: sqlx::Encode<'a, DB> + sqlx::Type<DB>,
    i32: sqlx::Encode<'a, DB> + sqlx::Type<DB>,
    bool: sqlx::Encode<'a, DB> + sqlx::Type<DB>,
    NaiveDate: sqlx::Encode<'a, DB> + sqlx::Type<DB>,
{
    if let Some(keyword) = filter.keyword.as_deref().map(str::trim)
        && !keyword.is_empty()
    {
        qb.push(" AND LOWER(o.name) LIKE ");
        qb.push_bind(format!("%{}%", keyword.to_lowercase()));
    }

    if !filter.stages.is_empty() {
        qb.push(" AND o.stage IN (");
        let mut separated = qb.separated(", ");
        for stage in &filter.stages {
            separated.push_bind(stage.as_str().to_string());
        }
        separated.push_unseparated(")");
    } else {
        if filter.active_stages {
            qb.push(" AND (o.stage_order BETWEEN ");
            qb.push_bind(CandidateOpportunityStage::Prospect.stage_order());
            qb.push(" AND ");
            qb.push_bind(CandidateOpportunityStage::Relocating.stage_order());
            if filter.sf_opp_closed == Some(true) {
                qb.push(" OR o.closed = ");
                qb.push_bind(true);
            }
            qb.push(")");
        }
        if filter.sf_opp_closed == Some(false) {
            qb.push(" AND o.closed = ");
            qb.push_bind(false);
        }
    }

    if let Some(today) = filter.overdue_before {
        qb.push(" AND o.next_step_due_date < ");
        qb.push_bind(today);
    }

    if let Some(partner_id) = filter.candidate_partner_id {
        qb.push(" AND c.partner_id = ");
        qb.push_bind(partner_id);
    }

    if let Some(partner_id) = filter.job_creator_id {
        qb.push(" AND j.job_creator_id = ");
        qb.push_bind(partner_id);
    }

    if let Some(user_id) = filter.job_owner_user_id {
        qb.push(" AND (j.contact_user_id = ");
        qb.push_bind(user_id);
        qb.push(" OR j.created_by = ");
        qb.push_bind(user_id);
        qb.push(")");
    }
}

/// Append ORDER BY, LIMIT and OFFSET of a candidate opportunity search.
pub(crate) fn push_candidate_opp_order<'a, DB>(
    qb: &mut QueryBuilder<'a, DB>,
    filter: &CandidateOppFilter,
    page: PageRequest,
) where
    DB: sqlx::Database,
    i64: sqlx::Encode<'a, DB> + sqlx::Type<DB>,
{
    qb.push(" ORDER BY ");
    for (field, ascending) in &filter.sort {
        qb.push(field.column());
        qb.push(if *ascending { " ASC, " } else { " DESC, " });
    }
    // Stable paging
    qb.push("o.id ASC");
    qb.push(" LIMIT ");
    qb.push_bind(page.limit());
    qb.push(" OFFSET ");
    qb.push_bind(page.offset());
}

/// Append the WHERE conditions of a task search.
pub(crate) fn push_task_filter<'a, DB>(qb: &mut QueryBuilder<'a, DB>, filter: &TaskFilter)
where
    DB: sqlx::Database,
    String: sqlx::Encode<'a, DB> + sqlx::Type<DB>,
{
    if let Some(keyword) = filter.keyword.as_deref().map(str::trim)
        && !keyword.is_empty()
    {
        let pattern = format!("%{}%", keyword.to_lowercase());
        qb.push(" AND (LOWER(name) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR LOWER(display_name) LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_total_pages() {
        let page: Page<i32> = Page {
            content: vec![1, 2],
            total_elements: 21,
            request: PageRequest::new(0, 10),
        };
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.map(|v| v * 2).content, vec![2, 4]);
    }

    #[test]
    fn test_page_request_never_zero_sized() {
        let req = PageRequest::new(3, 0);
        assert_eq!(req.size, 1);
        assert_eq!(req.offset(), 3);
    }

    #[test]
    fn test_sort_field_names() {
        assert_eq!(OppSortField::from_name("nextStepDueDate"), Some(OppSortField::NextStepDueDate));
        assert_eq!(OppSortField::from_name("stage"), Some(OppSortField::Stage));
        assert_eq!(OppSortField::from_name("; DROP TABLE"), None);
    }

    #[test]
    fn test_active_stage_filter_sql() {
        let filter = CandidateOppFilter {
            active_stages: true,
            sf_opp_closed: Some(true),
            ..Default::default()
        };
        let mut qb: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("SELECT 1 FROM x WHERE 1 = 1");
        push_candidate_opp_filter(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("o.stage_order BETWEEN"));
        assert!(sql.contains("OR o.closed ="));
    }

    #[test]
    fn test_explicit_stages_ignore_closed_filter() {
        let filter = CandidateOppFilter {
            stages: vec![CandidateOpportunityStage::Offer],
            active_stages: true,
            sf_opp_closed: Some(false),
            ..Default::default()
        };
        let mut qb: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("SELECT 1 FROM x WHERE 1 = 1");
        push_candidate_opp_filter(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("o.stage IN ("));
        assert!(!sql.contains("stage_order"));
        assert!(!sql.contains("o.closed"));
    }

    #[test]
    fn test_task_required_metadata_decoding() {
        let task = TaskRecord {
            id: 1,
            name: "uploadPassport".to_string(),
            display_name: "Upload passport".to_string(),
            description: None,
            task_type: TaskType::Upload,
            days_to_complete: None,
            help_link: None,
            optional: false,
            upload_type: Some("idCard".to_string()),
            upload_subfolder_name: Some("Identity".to_string()),
            required_metadata: Some(r#"[{"name":"passportNumber"},{"name":"firstName","required":false}]"#.to_string()),
            candidate_answer_field: None,
            explicit_allowed_answers: None,
            created_by: None,
            created_date: Utc::now(),
            updated_by: None,
            updated_date: None,
        };
        let fields = task.required_metadata_fields().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields[0].required);
        assert!(!fields[1].required);
        assert!(task.explicit_answers().unwrap().is_empty());
    }
}
