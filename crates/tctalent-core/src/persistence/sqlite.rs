//! SQLite-backed persistence implementation.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::CoreError;
use crate::model::{AssignmentStatus, CandidateStatus, JobChatType};

use super::{
    AttachmentRecord, CANDIDATE_OPP_COLUMNS, CANDIDATE_OPP_FROM, CandidateNoteRecord,
    CandidateOppFilter, CandidateOppRecord, CandidatePropertyRecord, CandidateRecord,
    JobChatRecord, JobOppRecord, Page, PageRequest, PartnerRecord, Persistence, SavedListRecord,
    TaskAssignmentRecord, TaskFilter, TaskRecord, UserRecord, push_candidate_opp_filter,
    push_candidate_opp_order, push_task_filter,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

const CANDIDATE_COLUMNS: &str = r#"
    id, candidate_number, user_id, first_name, last_name, email, status, partner_id,
    sf_link, folder_link, created_date, updated_date
"#;

const TASK_COLUMNS: &str = r#"
    id, name, display_name, description, task_type, days_to_complete, help_link, optional,
    upload_type, upload_subfolder_name, required_metadata, candidate_answer_field,
    explicit_allowed_answers, created_by, created_date, updated_by, updated_date
"#;

const ASSIGNMENT_COLUMNS: &str = r#"
    id, task_id, candidate_id, status, due_date, candidate_notes, completed_date,
    abandoned_date, related_list_id, activated_by, activated_date, deactivated_by,
    deactivated_date
"#;

const JOB_OPP_COLUMNS: &str = r#"
    id, sf_id, name, account_id, owner_id, country, stage, closed, won, closing_comments,
    next_step, next_step_due_date, hiring_commitment, opportunity_score, job_creator_id,
    contact_user_id, published_date, created_by, created_date, updated_by, updated_date
"#;

const UPSERT_PROPERTY_SQL: &str = r#"
INSERT INTO candidate_properties (candidate_id, name, value, related_task_assignment_id)
VALUES (?, ?, ?, ?)
ON CONFLICT (candidate_id, name) DO UPDATE
SET value = excluded.value,
    related_task_assignment_id = excluded.related_task_assignment_id
"#;

const INSERT_ATTACHMENT_SQL: &str = r#"
INSERT INTO candidate_attachments (candidate_id, name, location, file_type,
                                   upload_type, created_by, created_date)
VALUES (?, ?, ?, ?, ?, ?, ?)
RETURNING id
"#;

/// SQLite-backed persistence provider.
#[derive(Clone)]
pub struct SqlitePersistence {
    pool: SqlitePool,
}

impl SqlitePersistence {
    /// Create a new SQLite persistence provider from an existing, migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a `sqlite:` url and run migrations.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        // An in-memory database exists per connection
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {}: {}", url, e),
            })?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "migrate".to_string(),
                details: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Create and initialize a SQLite database file, creating parent
    /// directories as needed.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::DatabaseError {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        Self::connect(&format!("sqlite:{}?mode=rwc", path.to_string_lossy())).await
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Persistence for SqlitePersistence {
    // ========================================================================
    // Users and partners
    // ========================================================================

    async fn insert_user(&self, user: &UserRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO users (username, first_name, last_name, email, role, partner_id, created_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.partner_id)
        .bind(user.created_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, CoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, first_name, last_name, email, role, partner_id, created_date
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert_partner(&self, partner: &PartnerRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO partners (name, abbreviation, sf_id, job_creator, source_partner)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&partner.name)
        .bind(&partner.abbreviation)
        .bind(&partner.sf_id)
        .bind(partner.job_creator)
        .bind(partner.source_partner)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_partner(&self, id: i64) -> Result<Option<PartnerRecord>, CoreError> {
        let partner = sqlx::query_as::<_, PartnerRecord>(
            r#"
            SELECT id, name, abbreviation, sf_id, job_creator, source_partner
            FROM partners
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(partner)
    }

    // ========================================================================
    // Candidates
    // ========================================================================

    async fn insert_candidate(&self, candidate: &CandidateRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO candidates (candidate_number, user_id, first_name, last_name, email,
                                    status, partner_id, sf_link, folder_link, created_date,
                                    updated_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&candidate.candidate_number)
        .bind(candidate.user_id)
        .bind(&candidate.first_name)
        .bind(&candidate.last_name)
        .bind(&candidate.email)
        .bind(candidate.status.as_str())
        .bind(candidate.partner_id)
        .bind(&candidate.sf_link)
        .bind(&candidate.folder_link)
        .bind(candidate.created_date)
        .bind(candidate.updated_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_candidate(&self, id: i64) -> Result<Option<CandidateRecord>, CoreError> {
        let candidate = sqlx::query_as::<_, CandidateRecord>(&format!(
            "SELECT {} FROM candidates WHERE id = ?",
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(candidate)
    }

    async fn find_candidates_by_ids(&self, ids: &[i64]) -> Result<Vec<CandidateRecord>, CoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM candidates WHERE id IN (",
            CANDIDATE_COLUMNS
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let candidates = qb
            .build_query_as::<CandidateRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(candidates)
    }

    async fn find_candidate_by_number(
        &self,
        candidate_number: &str,
    ) -> Result<Option<CandidateRecord>, CoreError> {
        let candidate = sqlx::query_as::<_, CandidateRecord>(&format!(
            "SELECT {} FROM candidates WHERE candidate_number = ?",
            CANDIDATE_COLUMNS
        ))
        .bind(candidate_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(candidate)
    }

    async fn update_candidate_status(
        &self,
        id: i64,
        status: CandidateStatus,
    ) -> Result<(), CoreError> {
        sqlx::query("UPDATE candidates SET status = ?, updated_date = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_candidate_sf_link(&self, id: i64, sf_link: &str) -> Result<(), CoreError> {
        sqlx::query("UPDATE candidates SET sf_link = ?, updated_date = ? WHERE id = ?")
            .bind(sf_link)
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_candidate_folder_link(
        &self,
        id: i64,
        folder_link: &str,
    ) -> Result<(), CoreError> {
        sqlx::query("UPDATE candidates SET folder_link = ?, updated_date = ? WHERE id = ?")
            .bind(folder_link)
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ========================================================================
    // Candidate notes, properties and attachments
    // ========================================================================

    async fn insert_candidate_note(&self, note: &CandidateNoteRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO candidate_notes (candidate_id, note_type, title, comment, created_by, created_date)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(note.candidate_id)
        .bind(&note.note_type)
        .bind(&note.title)
        .bind(&note.comment)
        .bind(note.created_by)
        .bind(note.created_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_candidate_notes(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<CandidateNoteRecord>, CoreError> {
        let notes = sqlx::query_as::<_, CandidateNoteRecord>(
            r#"
            SELECT id, candidate_id, note_type, title, comment, created_by, created_date
            FROM candidate_notes
            WHERE candidate_id = ?
            ORDER BY id
            "#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    async fn upsert_candidate_property(
        &self,
        property: &CandidatePropertyRecord,
    ) -> Result<(), CoreError> {
        sqlx::query(
            UPSERT_PROPERTY_SQL,
        )
        .bind(property.candidate_id)
        .bind(&property.name)
        .bind(&property.value)
        .bind(property.related_task_assignment_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_candidate_properties(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<CandidatePropertyRecord>, CoreError> {
        let properties = sqlx::query_as::<_, CandidatePropertyRecord>(
            r#"
            SELECT candidate_id, name, value, related_task_assignment_id
            FROM candidate_properties
            WHERE candidate_id = ?
            ORDER BY name
            "#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(properties)
    }

    async fn insert_attachment(&self, attachment: &AttachmentRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            INSERT_ATTACHMENT_SQL,
        )
        .bind(attachment.candidate_id)
        .bind(&attachment.name)
        .bind(&attachment.location)
        .bind(&attachment.file_type)
        .bind(&attachment.upload_type)
        .bind(attachment.created_by)
        .bind(attachment.created_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_attachments(&self, candidate_id: i64) -> Result<Vec<AttachmentRecord>, CoreError> {
        let attachments = sqlx::query_as::<_, AttachmentRecord>(
            r#"
            SELECT id, candidate_id, name, location, file_type, upload_type, created_by, created_date
            FROM candidate_attachments
            WHERE candidate_id = ?
            ORDER BY id
            "#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attachments)
    }

    async fn record_task_upload(
        &self,
        properties: &[CandidatePropertyRecord],
        attachments: &[AttachmentRecord],
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await?;

        for property in properties {
            sqlx::query(UPSERT_PROPERTY_SQL)
                .bind(property.candidate_id)
                .bind(&property.name)
                .bind(&property.value)
                .bind(property.related_task_assignment_id)
                .execute(&mut *tx)
                .await?;
        }

        for attachment in attachments {
            sqlx::query(INSERT_ATTACHMENT_SQL)
                .bind(attachment.candidate_id)
                .bind(&attachment.name)
                .bind(&attachment.location)
                .bind(&attachment.file_type)
                .bind(&attachment.upload_type)
                .bind(attachment.created_by)
                .bind(attachment.created_date)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Saved lists
    // ========================================================================

    async fn insert_saved_list(&self, list: &SavedListRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO saved_lists (name, created_by, created_date) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&list.name)
        .bind(list.created_by)
        .bind(list.created_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_saved_list(&self, id: i64) -> Result<Option<SavedListRecord>, CoreError> {
        let list = sqlx::query_as::<_, SavedListRecord>(
            "SELECT id, name, created_by, created_date FROM saved_lists WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(list)
    }

    async fn add_candidates_to_list(
        &self,
        list_id: i64,
        candidate_ids: &[i64],
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await?;
        for candidate_id in candidate_ids {
            sqlx::query(
                r#"
                INSERT INTO saved_list_candidates (saved_list_id, candidate_id)
                VALUES (?, ?)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(list_id)
            .bind(candidate_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn list_candidate_ids_in_list(&self, list_id: i64) -> Result<Vec<i64>, CoreError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT candidate_id FROM saved_list_candidates
            WHERE saved_list_id = ?
            ORDER BY candidate_id
            "#,
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    async fn insert_task(&self, task: &TaskRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO tasks (name, display_name, description, task_type, days_to_complete,
                               help_link, optional, upload_type, upload_subfolder_name,
                               required_metadata, candidate_answer_field,
                               explicit_allowed_answers, created_by, created_date,
                               updated_by, updated_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&task.name)
        .bind(&task.display_name)
        .bind(&task.description)
        .bind(task.task_type.as_str())
        .bind(task.days_to_complete)
        .bind(&task.help_link)
        .bind(task.optional)
        .bind(&task.upload_type)
        .bind(&task.upload_subfolder_name)
        .bind(&task.required_metadata)
        .bind(&task.candidate_answer_field)
        .bind(&task.explicit_allowed_answers)
        .bind(task.created_by)
        .bind(task.created_date)
        .bind(task.updated_by)
        .bind(task.updated_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>, CoreError> {
        let task = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {} FROM tasks WHERE id = ?",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn find_task_by_name(&self, name: &str) -> Result<Option<TaskRecord>, CoreError> {
        let task = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {} FROM tasks WHERE LOWER(name) = LOWER(?)",
            TASK_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn find_task_by_display_name(
        &self,
        display_name: &str,
    ) -> Result<Option<TaskRecord>, CoreError> {
        let task = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {} FROM tasks WHERE LOWER(display_name) = LOWER(?)",
            TASK_COLUMNS
        ))
        .bind(display_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, CoreError> {
        let tasks = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {} FROM tasks ORDER BY name",
            TASK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn search_tasks(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<Page<TaskRecord>, CoreError> {
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM tasks WHERE 1 = 1");
        push_task_filter(&mut count_qb, filter);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM tasks WHERE 1 = 1", TASK_COLUMNS));
        push_task_filter(&mut qb, filter);
        qb.push(" ORDER BY name LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let content = qb
            .build_query_as::<TaskRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            content,
            total_elements: total,
            request: page,
        })
    }

    async fn update_task(&self, task: &TaskRecord) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET display_name = ?, description = ?, days_to_complete = ?, help_link = ?,
                optional = ?, upload_type = ?, upload_subfolder_name = ?,
                required_metadata = ?, candidate_answer_field = ?,
                explicit_allowed_answers = ?, updated_by = ?, updated_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.display_name)
        .bind(&task.description)
        .bind(task.days_to_complete)
        .bind(&task.help_link)
        .bind(task.optional)
        .bind(&task.upload_type)
        .bind(&task.upload_subfolder_name)
        .bind(&task.required_metadata)
        .bind(&task.candidate_answer_field)
        .bind(&task.explicit_allowed_answers)
        .bind(task.updated_by)
        .bind(task.updated_date)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ========================================================================
    // Task assignments
    // ========================================================================

    async fn insert_task_assignment(
        &self,
        assignment: &TaskAssignmentRecord,
    ) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO task_assignments (task_id, candidate_id, status, due_date, candidate_notes,
                                          completed_date, abandoned_date, related_list_id,
                                          activated_by, activated_date, deactivated_by,
                                          deactivated_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(assignment.task_id)
        .bind(assignment.candidate_id)
        .bind(assignment.status.as_str())
        .bind(assignment.due_date)
        .bind(&assignment.candidate_notes)
        .bind(assignment.completed_date)
        .bind(assignment.abandoned_date)
        .bind(assignment.related_list_id)
        .bind(assignment.activated_by)
        .bind(assignment.activated_date)
        .bind(assignment.deactivated_by)
        .bind(assignment.deactivated_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_task_assignment(
        &self,
        id: i64,
    ) -> Result<Option<TaskAssignmentRecord>, CoreError> {
        let assignment = sqlx::query_as::<_, TaskAssignmentRecord>(&format!(
            "SELECT {} FROM task_assignments WHERE id = ?",
            ASSIGNMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    async fn save_task_assignment(
        &self,
        assignment: &TaskAssignmentRecord,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            UPDATE task_assignments
            SET status = ?, due_date = ?, candidate_notes = ?, completed_date = ?,
                abandoned_date = ?, deactivated_by = ?, deactivated_date = ?
            WHERE id = ?
            "#,
        )
        .bind(assignment.status.as_str())
        .bind(assignment.due_date)
        .bind(&assignment.candidate_notes)
        .bind(assignment.completed_date)
        .bind(assignment.abandoned_date)
        .bind(assignment.deactivated_by)
        .bind(assignment.deactivated_date)
        .bind(assignment.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_task_assignments(
        &self,
        task_id: Option<i64>,
        list_id: Option<i64>,
    ) -> Result<Vec<TaskAssignmentRecord>, CoreError> {
        let assignments = sqlx::query_as::<_, TaskAssignmentRecord>(&format!(
            r#"
            SELECT {} FROM task_assignments
            WHERE (? IS NULL OR task_id = ?)
              AND (? IS NULL OR related_list_id = ?)
            ORDER BY id
            "#,
            ASSIGNMENT_COLUMNS
        ))
        .bind(task_id)
        .bind(task_id)
        .bind(list_id)
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    async fn find_task_assignments(
        &self,
        task_id: i64,
        candidate_id: i64,
        status: AssignmentStatus,
    ) -> Result<Vec<TaskAssignmentRecord>, CoreError> {
        let assignments = sqlx::query_as::<_, TaskAssignmentRecord>(&format!(
            r#"
            SELECT {} FROM task_assignments
            WHERE task_id = ? AND candidate_id = ? AND status = ?
            ORDER BY id
            "#,
            ASSIGNMENT_COLUMNS
        ))
        .bind(task_id)
        .bind(candidate_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    async fn list_candidate_task_assignments(
        &self,
        candidate_id: i64,
        status: Option<AssignmentStatus>,
    ) -> Result<Vec<TaskAssignmentRecord>, CoreError> {
        let status = status.map(|s| s.as_str());
        let assignments = sqlx::query_as::<_, TaskAssignmentRecord>(&format!(
            r#"
            SELECT {} FROM task_assignments
            WHERE candidate_id = ? AND (? IS NULL OR status = ?)
            ORDER BY id
            "#,
            ASSIGNMENT_COLUMNS
        ))
        .bind(candidate_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    // ========================================================================
    // Job opportunities
    // ========================================================================

    async fn insert_job_opp(&self, job: &JobOppRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO salesforce_job_opps (sf_id, name, account_id, owner_id, country, stage,
                                             stage_order, closed, won, closing_comments, next_step,
                                             next_step_due_date, hiring_commitment,
                                             opportunity_score, job_creator_id, contact_user_id,
                                             published_date, created_by, created_date,
                                             updated_by, updated_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&job.sf_id)
        .bind(&job.name)
        .bind(&job.account_id)
        .bind(&job.owner_id)
        .bind(&job.country)
        .bind(job.stage.as_str())
        .bind(job.stage.stage_order())
        .bind(job.closed)
        .bind(job.won)
        .bind(&job.closing_comments)
        .bind(&job.next_step)
        .bind(job.next_step_due_date)
        .bind(job.hiring_commitment)
        .bind(&job.opportunity_score)
        .bind(job.job_creator_id)
        .bind(job.contact_user_id)
        .bind(job.published_date)
        .bind(job.created_by)
        .bind(job.created_date)
        .bind(job.updated_by)
        .bind(job.updated_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_job_opp(&self, id: i64) -> Result<Option<JobOppRecord>, CoreError> {
        let job = sqlx::query_as::<_, JobOppRecord>(&format!(
            "SELECT {} FROM salesforce_job_opps WHERE id = ?",
            JOB_OPP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn find_job_opp_by_sf_id(&self, sf_id: &str) -> Result<Option<JobOppRecord>, CoreError> {
        let job = sqlx::query_as::<_, JobOppRecord>(&format!(
            "SELECT {} FROM salesforce_job_opps WHERE sf_id = ?",
            JOB_OPP_COLUMNS
        ))
        .bind(sf_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn save_job_opp(&self, job: &JobOppRecord) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            UPDATE salesforce_job_opps
            SET name = ?, account_id = ?, owner_id = ?, country = ?, stage = ?, stage_order = ?,
                closed = ?, won = ?, closing_comments = ?, next_step = ?, next_step_due_date = ?,
                hiring_commitment = ?, opportunity_score = ?, job_creator_id = ?,
                contact_user_id = ?, published_date = ?, created_date = ?, updated_by = ?,
                updated_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&job.name)
        .bind(&job.account_id)
        .bind(&job.owner_id)
        .bind(&job.country)
        .bind(job.stage.as_str())
        .bind(job.stage.stage_order())
        .bind(job.closed)
        .bind(job.won)
        .bind(&job.closing_comments)
        .bind(&job.next_step)
        .bind(job.next_step_due_date)
        .bind(job.hiring_commitment)
        .bind(&job.opportunity_score)
        .bind(job.job_creator_id)
        .bind(job.contact_user_id)
        .bind(job.published_date)
        .bind(job.created_date)
        .bind(job.updated_by)
        .bind(job.updated_date)
        .bind(job.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_open_job_opps(&self) -> Result<Vec<JobOppRecord>, CoreError> {
        let jobs = sqlx::query_as::<_, JobOppRecord>(&format!(
            "SELECT {} FROM salesforce_job_opps WHERE closed = 0 ORDER BY id",
            JOB_OPP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    // ========================================================================
    // Candidate opportunities
    // ========================================================================

    async fn insert_candidate_opp(&self, opp: &CandidateOppRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO candidate_opportunities (sf_id, candidate_id, job_opp_id, name, stage,
                                                 stage_order, closed, won, next_step,
                                                 next_step_due_date, closing_comments,
                                                 closing_comments_for_candidate, employer_feedback,
                                                 file_offer_link, file_offer_name, created_by,
                                                 created_date, updated_by, updated_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&opp.sf_id)
        .bind(opp.candidate_id)
        .bind(opp.job_opp_id)
        .bind(&opp.name)
        .bind(opp.stage.as_str())
        .bind(opp.stage.stage_order())
        .bind(opp.closed)
        .bind(opp.won)
        .bind(&opp.next_step)
        .bind(opp.next_step_due_date)
        .bind(&opp.closing_comments)
        .bind(&opp.closing_comments_for_candidate)
        .bind(&opp.employer_feedback)
        .bind(&opp.file_offer_link)
        .bind(&opp.file_offer_name)
        .bind(opp.created_by)
        .bind(opp.created_date)
        .bind(opp.updated_by)
        .bind(opp.updated_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_candidate_opp(&self, id: i64) -> Result<Option<CandidateOppRecord>, CoreError> {
        let opp = sqlx::query_as::<_, CandidateOppRecord>(&format!(
            "SELECT {} FROM candidate_opportunities o WHERE o.id = ?",
            CANDIDATE_OPP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(opp)
    }

    async fn find_candidate_opp_by_sf_id(
        &self,
        sf_id: &str,
    ) -> Result<Option<CandidateOppRecord>, CoreError> {
        let opp = sqlx::query_as::<_, CandidateOppRecord>(&format!(
            "SELECT {} FROM candidate_opportunities o WHERE o.sf_id = ?",
            CANDIDATE_OPP_COLUMNS
        ))
        .bind(sf_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(opp)
    }

    async fn find_candidate_opp(
        &self,
        candidate_id: i64,
        job_opp_id: i64,
    ) -> Result<Option<CandidateOppRecord>, CoreError> {
        let opp = sqlx::query_as::<_, CandidateOppRecord>(&format!(
            r#"
            SELECT {} FROM candidate_opportunities o
            WHERE o.candidate_id = ? AND o.job_opp_id = ?
            "#,
            CANDIDATE_OPP_COLUMNS
        ))
        .bind(candidate_id)
        .bind(job_opp_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(opp)
    }

    async fn save_candidate_opp(&self, opp: &CandidateOppRecord) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            UPDATE candidate_opportunities
            SET sf_id = ?, candidate_id = ?, job_opp_id = ?, name = ?, stage = ?,
                stage_order = ?, closed = ?, won = ?, next_step = ?, next_step_due_date = ?,
                closing_comments = ?, closing_comments_for_candidate = ?,
                employer_feedback = ?, file_offer_link = ?, file_offer_name = ?,
                created_date = ?, updated_by = ?, updated_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&opp.sf_id)
        .bind(opp.candidate_id)
        .bind(opp.job_opp_id)
        .bind(&opp.name)
        .bind(opp.stage.as_str())
        .bind(opp.stage.stage_order())
        .bind(opp.closed)
        .bind(opp.won)
        .bind(&opp.next_step)
        .bind(opp.next_step_due_date)
        .bind(&opp.closing_comments)
        .bind(&opp.closing_comments_for_candidate)
        .bind(&opp.employer_feedback)
        .bind(&opp.file_offer_link)
        .bind(&opp.file_offer_name)
        .bind(opp.created_date)
        .bind(opp.updated_by)
        .bind(opp.updated_date)
        .bind(opp.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search_candidate_opps(
        &self,
        filter: &CandidateOppFilter,
        page: PageRequest,
    ) -> Result<Page<CandidateOppRecord>, CoreError> {
        let total = self.count_candidate_opps(filter).await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} {}",
            CANDIDATE_OPP_COLUMNS, CANDIDATE_OPP_FROM
        ));
        push_candidate_opp_filter(&mut qb, filter);
        push_candidate_opp_order(&mut qb, filter, page);

        let content = qb
            .build_query_as::<CandidateOppRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            content,
            total_elements: total,
            request: page,
        })
    }

    async fn count_candidate_opps(&self, filter: &CandidateOppFilter) -> Result<i64, CoreError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT COUNT(*) {}", CANDIDATE_OPP_FROM));
        push_candidate_opp_filter(&mut qb, filter);
        let (total,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(total)
    }

    // ========================================================================
    // Job chats
    // ========================================================================

    async fn insert_job_chat(&self, chat: &JobChatRecord) -> Result<i64, CoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO job_chats (chat_type, job_opp_id, source_partner_id, candidate_id,
                                   created_by, created_date)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(chat.chat_type.as_str())
        .bind(chat.job_opp_id)
        .bind(chat.source_partner_id)
        .bind(chat.candidate_id)
        .bind(chat.created_by)
        .bind(chat.created_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_job_chat(&self, id: i64) -> Result<Option<JobChatRecord>, CoreError> {
        let chat = sqlx::query_as::<_, JobChatRecord>(
            r#"
            SELECT id, chat_type, job_opp_id, source_partner_id, candidate_id, created_by, created_date
            FROM job_chats
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }

    async fn find_job_chat(
        &self,
        chat_type: JobChatType,
        job_opp_id: Option<i64>,
        source_partner_id: Option<i64>,
        candidate_id: Option<i64>,
    ) -> Result<Option<JobChatRecord>, CoreError> {
        let chat = sqlx::query_as::<_, JobChatRecord>(
            r#"
            SELECT id, chat_type, job_opp_id, source_partner_id, candidate_id, created_by, created_date
            FROM job_chats
            WHERE chat_type = ?
              AND job_opp_id IS ?
              AND source_partner_id IS ?
              AND candidate_id IS ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(chat_type.as_str())
        .bind(job_opp_id)
        .bind(source_partner_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }

    async fn health_check(&self) -> Result<bool, CoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }
}
