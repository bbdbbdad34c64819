// crates/db/src/queries.rs
//! Row-level reads and writes against the `tasks`, `work_sessions` and
//! `timer_events` tables.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use taskboard_types::{
    DateField, FieldClass, IterationField, IterationOption, OptionEntry, OwnerType, PeopleField,
    SelectField, Task, TimerEventType, WorkSession,
};

use crate::analytics::{
    self, LabelTotal, Period, PeriodTotal, ProjectTotal, TaskTotal,
};
use crate::{Database, DbError, DbResult};

/// Whether an upserted row was freshly inserted or merged into an
/// existing one (used by the sync engine to report a scan summary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

fn json_vec(v: &[String]) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "[]".into())
}

fn from_json_vec(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn json_options(v: &[OptionEntry]) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "[]".into())
}

fn from_json_options(s: &str) -> Vec<OptionEntry> {
    serde_json::from_str(s).unwrap_or_default()
}

fn json_iter_options(v: &[IterationOption]) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "[]".into())
}

fn from_json_iter_options(s: &str) -> Vec<IterationOption> {
    serde_json::from_str(s).unwrap_or_default()
}

impl Database {
    /// Upsert one task row fetched by the sync engine. Uses `INSERT ...
    /// ON CONFLICT DO UPDATE` keyed on the full identity tuple so a
    /// re-scan of the same item merges in place.
    pub async fn upsert_task(&self, task: &Task) -> DbResult<UpsertOutcome> {
        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT owner FROM tasks WHERE owner_type = ?1 AND owner = ?2 AND project_number = ?3
             AND title = ?4 AND url = ?5 AND start_field = ?6 AND start_date = ?7",
        )
        .bind(task.owner_type.as_str())
        .bind(&task.owner)
        .bind(task.project_number)
        .bind(&task.title)
        .bind(&task.url)
        .bind(&task.start_field)
        .bind(&task.start_date)
        .fetch_optional(&self.pool)
        .await?;

        sqlx::query(
            r#"
INSERT INTO tasks (
    owner_type, owner, project_number, title, url, start_field, start_date,
    project_id, project_title, content_id, repository,
    start_field_id, end_field, end_field_id, end_date,
    focus_field, focus_field_id, focus_date,
    iteration_field, iteration_field_id, iteration_id, iteration_title,
    iteration_start_date, iteration_duration_days, iteration_options,
    status_field_id, status_option_id, status_option_name, status_options,
    priority_field_id, priority_option_id, priority_option_name, priority_options,
    people_field_id, people_user_ids, people_logins, assigned_to_me, created_by_me,
    labels, updated_at, is_done, last_seen_at
) VALUES (
    ?1, ?2, ?3, ?4, ?5, ?6, ?7,
    ?8, ?9, ?10, ?11,
    ?12, ?13, ?14, ?15,
    ?16, ?17, ?18,
    ?19, ?20, ?21, ?22,
    ?23, ?24, ?25,
    ?26, ?27, ?28, ?29,
    ?30, ?31, ?32, ?33,
    ?34, ?35, ?36, ?37, ?38,
    ?39, ?40, ?41, ?42
)
ON CONFLICT(owner_type, owner, project_number, title, url, start_field, start_date) DO UPDATE SET
    project_id = excluded.project_id,
    project_title = excluded.project_title,
    content_id = excluded.content_id,
    repository = excluded.repository,
    start_field_id = COALESCE(excluded.start_field_id, tasks.start_field_id),
    end_field = excluded.end_field,
    end_field_id = COALESCE(excluded.end_field_id, tasks.end_field_id),
    end_date = excluded.end_date,
    focus_field = excluded.focus_field,
    focus_field_id = COALESCE(excluded.focus_field_id, tasks.focus_field_id),
    focus_date = excluded.focus_date,
    iteration_field = excluded.iteration_field,
    iteration_field_id = COALESCE(excluded.iteration_field_id, tasks.iteration_field_id),
    iteration_id = excluded.iteration_id,
    iteration_title = excluded.iteration_title,
    iteration_start_date = excluded.iteration_start_date,
    iteration_duration_days = excluded.iteration_duration_days,
    iteration_options = CASE WHEN excluded.iteration_options <> '[]' THEN excluded.iteration_options ELSE tasks.iteration_options END,
    status_field_id = COALESCE(excluded.status_field_id, tasks.status_field_id),
    status_option_id = excluded.status_option_id,
    status_option_name = excluded.status_option_name,
    status_options = CASE WHEN excluded.status_options <> '[]' THEN excluded.status_options ELSE tasks.status_options END,
    priority_field_id = COALESCE(excluded.priority_field_id, tasks.priority_field_id),
    priority_option_id = excluded.priority_option_id,
    priority_option_name = excluded.priority_option_name,
    priority_options = CASE WHEN excluded.priority_options <> '[]' THEN excluded.priority_options ELSE tasks.priority_options END,
    people_field_id = COALESCE(excluded.people_field_id, tasks.people_field_id),
    people_user_ids = excluded.people_user_ids,
    people_logins = excluded.people_logins,
    assigned_to_me = excluded.assigned_to_me,
    created_by_me = excluded.created_by_me,
    labels = excluded.labels,
    updated_at = excluded.updated_at,
    is_done = excluded.is_done,
    last_seen_at = excluded.last_seen_at
"#,
        )
        .bind(task.owner_type.as_str())
        .bind(&task.owner)
        .bind(task.project_number)
        .bind(&task.title)
        .bind(&task.url)
        .bind(&task.start_field)
        .bind(&task.start_date)
        .bind(&task.project_id)
        .bind(&task.project_title)
        .bind(&task.content_id)
        .bind(&task.repository)
        .bind(&task.start.field_id)
        .bind(&task.end.field_name)
        .bind(&task.end.field_id)
        .bind(&task.end.date)
        .bind(&task.focus.field_name)
        .bind(&task.focus.field_id)
        .bind(&task.focus.date)
        .bind(&task.iteration.field_name)
        .bind(&task.iteration.field_id)
        .bind(&task.iteration.iteration_id)
        .bind(&task.iteration.title)
        .bind(&task.iteration.start_date)
        .bind(task.iteration.duration_days)
        .bind(json_iter_options(&task.iteration.options))
        .bind(&task.status.field_id)
        .bind(&task.status.option_id)
        .bind(&task.status.option_name)
        .bind(json_options(&task.status.options))
        .bind(&task.priority.field_id)
        .bind(&task.priority.option_id)
        .bind(&task.priority.option_name)
        .bind(json_options(&task.priority.options))
        .bind(&task.people.field_id)
        .bind(json_vec(&task.people.user_ids))
        .bind(json_vec(&task.people.logins))
        .bind(task.assigned_to_me)
        .bind(task.created_by_me)
        .bind(json_vec(&task.labels))
        .bind(task.updated_at.to_rfc3339())
        .bind(task.is_done)
        .bind(task.last_seen_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(if existing.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    /// Upsert a full page of rows in one transaction, returning
    /// `(inserted, updated)` counts for the sync engine's scan summary.
    pub async fn upsert_many(&self, tasks: &[Task]) -> DbResult<(usize, usize)> {
        let mut inserted = 0;
        let mut updated = 0;
        let mut tx = self.pool.begin().await?;
        for task in tasks {
            // upsert_task runs against self.pool directly; replicate the
            // statement against the open transaction for atomicity.
            let outcome = upsert_task_tx(&mut tx, task).await?;
            match outcome {
                UpsertOutcome::Inserted => inserted += 1,
                UpsertOutcome::Updated => updated += 1,
            }
        }
        tx.commit().await?;
        Ok((inserted, updated))
    }

    /// Load every task row, newest-updated first.
    pub async fn load(&self) -> DbResult<Vec<Task>> {
        let rows = sqlx::query("SELECT * FROM tasks ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_task).collect()
    }

    /// Count rows under `owner` that a sync run did not touch (their
    /// `last_seen_at` predates `cutoff`). Rows are never deleted for this —
    /// the view-model filters them out as tombstoned instead, so a
    /// transient scan failure can't silently wipe history.
    pub async fn count_stale(&self, owner: &str, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tasks WHERE owner = ?1 AND last_seen_at < ?2",
        )
        .bind(owner)
        .bind(cutoff.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 as u64)
    }

    /// Rows under `owner` not touched since `cutoff` — candidates the
    /// view-model hides as tombstoned.
    pub async fn stale_task_urls(&self, owner: &str, cutoff: DateTime<Utc>) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT url FROM tasks WHERE owner = ?1 AND last_seen_at < ?2",
        )
        .bind(owner)
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(u,)| u).collect())
    }

    /// Apply a locally-confirmed write for one field class to the stored
    /// row, mirroring the mutation the remote write just made (spec.md
    /// §4.4 "optimistic write succeeds").
    pub async fn update_field(
        &self,
        url: &str,
        class: FieldClass,
        option_id: Option<&str>,
        option_name: Option<&str>,
        date: Option<&str>,
        labels: Option<&[String]>,
    ) -> DbResult<()> {
        match class {
            FieldClass::Status => {
                sqlx::query(
                    "UPDATE tasks SET status_option_id = ?1, status_option_name = ?2, is_done = ?3 WHERE url = ?4",
                )
                .bind(option_id)
                .bind(option_name.unwrap_or_default())
                .bind(option_name.map(taskboard_types::is_done_status).unwrap_or(false))
                .bind(url)
                .execute(&self.pool)
                .await?;
            }
            FieldClass::Priority => {
                sqlx::query(
                    "UPDATE tasks SET priority_option_id = ?1, priority_option_name = ?2 WHERE url = ?3",
                )
                .bind(option_id)
                .bind(option_name.unwrap_or_default())
                .bind(url)
                .execute(&self.pool)
                .await?;
            }
            FieldClass::StartDate => {
                sqlx::query("UPDATE tasks SET start_date = ?1 WHERE url = ?2")
                    .bind(date.unwrap_or_default())
                    .bind(url)
                    .execute(&self.pool)
                    .await?;
            }
            FieldClass::EndDate => {
                sqlx::query("UPDATE tasks SET end_date = ?1 WHERE url = ?2")
                    .bind(date.unwrap_or_default())
                    .bind(url)
                    .execute(&self.pool)
                    .await?;
            }
            FieldClass::FocusDate => {
                sqlx::query("UPDATE tasks SET focus_date = ?1 WHERE url = ?2")
                    .bind(date.unwrap_or_default())
                    .bind(url)
                    .execute(&self.pool)
                    .await?;
            }
            FieldClass::Iteration => {
                sqlx::query("UPDATE tasks SET iteration_id = ?1, iteration_title = ?2 WHERE url = ?3")
                    .bind(option_id)
                    .bind(option_name.unwrap_or_default())
                    .bind(url)
                    .execute(&self.pool)
                    .await?;
            }
            FieldClass::Labels => {
                sqlx::query("UPDATE tasks SET labels = ?1 WHERE url = ?2")
                    .bind(json_vec(labels.unwrap_or_default()))
                    .bind(url)
                    .execute(&self.pool)
                    .await?;
            }
            FieldClass::Assignees => {
                sqlx::query("UPDATE tasks SET people_logins = ?1 WHERE url = ?2")
                    .bind(json_vec(labels.unwrap_or_default()))
                    .bind(url)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    /// Revert an optimistic local write for one field class back to the
    /// last confirmed value, used when the background remote write fails.
    pub async fn reset_field(&self, url: &str, class: FieldClass, task: &Task) -> DbResult<()> {
        self.update_field(
            url,
            class,
            match class {
                FieldClass::Status => task.status.option_id.as_deref(),
                FieldClass::Priority => task.priority.option_id.as_deref(),
                FieldClass::Iteration => task.iteration.iteration_id.as_deref(),
                _ => None,
            },
            match class {
                FieldClass::Status => Some(task.status.option_name.as_str()),
                FieldClass::Priority => Some(task.priority.option_name.as_str()),
                FieldClass::Iteration => Some(task.iteration.title.as_str()),
                _ => None,
            },
            match class {
                FieldClass::StartDate => Some(task.start.date.as_str()),
                FieldClass::EndDate => Some(task.end.date.as_str()),
                FieldClass::FocusDate => Some(task.focus.date.as_str()),
                _ => None,
            },
            match class {
                FieldClass::Labels => Some(task.labels.as_slice()),
                FieldClass::Assignees => Some(task.people.logins.as_slice()),
                _ => None,
            },
        )
        .await
    }

    /// Persist a lazily-resolved project field id on every row sharing
    /// `url`, so the next edit to this field class skips the lookup.
    /// Labels have no project field id and are a no-op.
    pub async fn persist_field_id(&self, url: &str, class: FieldClass, field_id: &str) -> DbResult<()> {
        let column = match class {
            FieldClass::Status => "status_field_id",
            FieldClass::Priority => "priority_field_id",
            FieldClass::StartDate => "start_field_id",
            FieldClass::EndDate => "end_field_id",
            FieldClass::FocusDate => "focus_field_id",
            FieldClass::Iteration => "iteration_field_id",
            FieldClass::Assignees => "people_field_id",
            FieldClass::Labels => return Ok(()),
        };
        let sql = format!("UPDATE tasks SET {column} = ?1 WHERE url = ?2");
        sqlx::query(&sql).bind(field_id).bind(url).execute(&self.pool).await?;
        Ok(())
    }

    /// Start a new open work session for `task_url`, recording a `start`
    /// timer event alongside it.
    ///
    /// Per spec.md §5 "exactly one open session per URL", this first
    /// closes any session already open for this URL inside the same
    /// transaction — a caller never needs to remember to stop before
    /// starting.
    pub async fn start_session(
        &self,
        task_url: &str,
        project_title: &str,
        labels: &[String],
        at: DateTime<Utc>,
    ) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE work_sessions SET ended_at = ?1 WHERE task_url = ?2 AND ended_at IS NULL",
        )
        .bind(at.to_rfc3339())
        .bind(task_url)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "INSERT INTO work_sessions (task_url, project_title, labels, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, NULL)",
        )
        .bind(task_url)
        .bind(project_title)
        .bind(json_vec(labels))
        .bind(at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        sqlx::query("INSERT INTO timer_events (task_url, event_type, at) VALUES (?1, ?2, ?3)")
            .bind(task_url)
            .bind(TimerEventType::Start.as_str())
            .bind(at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Close the currently open session for `task_url`, if any.
    pub async fn stop_session(&self, task_url: &str, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            "UPDATE work_sessions SET ended_at = ?1 WHERE task_url = ?2 AND ended_at IS NULL",
        )
        .bind(at.to_rfc3339())
        .bind(task_url)
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT INTO timer_events (task_url, event_type, at) VALUES (?1, ?2, ?3)")
            .bind(task_url)
            .bind(TimerEventType::Stop.as_str())
            .bind(at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Adjust the stored boundaries of a single session (manual edit from
    /// the UI).
    pub async fn update_session_times(
        &self,
        id: i64,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        sqlx::query("UPDATE work_sessions SET started_at = ?1, ended_at = ?2 WHERE id = ?3")
            .bind(started_at.to_rfc3339())
            .bind(ended_at.map(|d| d.to_rfc3339()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_session(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM work_sessions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// URLs with a currently open session (used to render the running
    /// timer indicator without loading every session row).
    pub async fn active_task_urls(&self) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT task_url FROM work_sessions WHERE ended_at IS NULL")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(u,)| u).collect())
    }

    /// All sessions, oldest first, for analytics aggregation.
    pub async fn all_sessions(&self) -> DbResult<Vec<WorkSession>> {
        let rows = sqlx::query("SELECT * FROM work_sessions ORDER BY started_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_session).collect()
    }

    /// Closed-duration snapshot for one task: total elapsed seconds across
    /// every closed session plus whether a session is currently open.
    pub async fn task_duration_snapshot(&self, task_url: &str) -> DbResult<TaskDurationRow> {
        let sessions: Vec<WorkSession> = {
            let rows = sqlx::query("SELECT * FROM work_sessions WHERE task_url = ?1 ORDER BY started_at ASC")
                .bind(task_url)
                .fetch_all(&self.pool)
                .await?;
            rows.iter().map(row_to_session).collect::<DbResult<_>>()?
        };
        let mut closed_seconds = 0i64;
        let mut is_running = false;
        for s in &sessions {
            match s.ended_at {
                Some(end) => closed_seconds += (end - s.started_at).num_seconds().max(0),
                None => is_running = true,
            }
        }
        Ok(TaskDurationRow {
            task_url: task_url.to_string(),
            closed_seconds,
            is_running,
        })
    }

    /// Batched form of `task_duration_snapshot` for spec.md §4.5's
    /// `task_duration_snapshot(urls) -> {url: {total, current}}`: one
    /// query instead of one per URL, with unknown URLs defaulted to
    /// `{total: 0, current: 0}`.
    pub async fn task_duration_snapshots(
        &self,
        urls: &[String],
    ) -> DbResult<HashMap<String, TaskDurationRow>> {
        let mut out: HashMap<String, TaskDurationRow> = urls
            .iter()
            .map(|u| {
                (
                    u.clone(),
                    TaskDurationRow {
                        task_url: u.clone(),
                        closed_seconds: 0,
                        is_running: false,
                    },
                )
            })
            .collect();
        if urls.is_empty() {
            return Ok(out);
        }

        let placeholders = urls.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT * FROM work_sessions WHERE task_url IN ({placeholders}) ORDER BY started_at ASC"
        );
        let mut query = sqlx::query(&sql);
        for u in urls {
            query = query.bind(u);
        }
        let rows = query.fetch_all(&self.pool).await?;

        for row in &rows {
            let session = row_to_session(row)?;
            let entry = out.entry(session.task_url.clone()).or_insert(TaskDurationRow {
                task_url: session.task_url.clone(),
                closed_seconds: 0,
                is_running: false,
            });
            match session.ended_at {
                Some(end) => entry.closed_seconds += (end - session.started_at).num_seconds().max(0),
                None => entry.is_running = true,
            }
        }
        Ok(out)
    }

    /// `aggregate_period_totals(granularity, since_days, project?, task?)`
    /// from spec.md §4.5: buckets sessions from the last `since_days` days
    /// into period keys, optionally scoped to one project or task.
    pub async fn aggregate_period_totals(
        &self,
        period: Period,
        since_days: i64,
        project_title: Option<&str>,
        task_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<PeriodTotal>> {
        let sessions = self.sessions_since(since_days, project_title, task_url, now).await?;
        Ok(analytics::aggregate_period_totals(&sessions, period, now))
    }

    /// `aggregate_project_totals(since_days)` from spec.md §4.5.
    pub async fn aggregate_project_totals(
        &self,
        since_days: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<ProjectTotal>> {
        let sessions = self.sessions_since(since_days, None, None, now).await?;
        Ok(analytics::aggregate_project_totals(&sessions, now))
    }

    /// `aggregate_task_totals(since_days)` from spec.md §4.5.
    pub async fn aggregate_task_totals(
        &self,
        since_days: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<TaskTotal>> {
        let sessions = self.sessions_since(since_days, None, None, now).await?;
        Ok(analytics::aggregate_task_totals(&sessions, now))
    }

    /// `aggregate_label_totals(since_days)` from spec.md §4.5.
    pub async fn aggregate_label_totals(
        &self,
        since_days: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<LabelTotal>> {
        let sessions = self.sessions_since(since_days, None, None, now).await?;
        Ok(analytics::aggregate_label_totals(&sessions, now))
    }

    /// Sessions that overlap the last `since_days` days, with an optional
    /// project-title or task-url scope applied in SQL before the
    /// aggregation primitives run in memory.
    async fn sessions_since(
        &self,
        since_days: i64,
        project_title: Option<&str>,
        task_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<WorkSession>> {
        let cutoff = (now - Duration::days(since_days)).to_rfc3339();
        let mut sql = String::from(
            "SELECT * FROM work_sessions WHERE (ended_at IS NULL OR ended_at >= ?1)",
        );
        if project_title.is_some() {
            sql.push_str(" AND project_title = ?2");
        }
        if task_url.is_some() {
            sql.push_str(if project_title.is_some() { " AND task_url = ?3" } else { " AND task_url = ?2" });
        }
        sql.push_str(" ORDER BY started_at ASC");

        let mut query = sqlx::query(&sql).bind(cutoff);
        if let Some(p) = project_title {
            query = query.bind(p);
        }
        if let Some(t) = task_url {
            query = query.bind(t);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_session).collect()
    }
}

/// Replicates `upsert_task`'s statement against an open transaction so a
/// batch of rows commits atomically.
async fn upsert_task_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    task: &Task,
) -> DbResult<UpsertOutcome> {
    let existing: Option<(String,)> = sqlx::query_as(
        "SELECT owner FROM tasks WHERE owner_type = ?1 AND owner = ?2 AND project_number = ?3
         AND title = ?4 AND url = ?5 AND start_field = ?6 AND start_date = ?7",
    )
    .bind(task.owner_type.as_str())
    .bind(&task.owner)
    .bind(task.project_number)
    .bind(&task.title)
    .bind(&task.url)
    .bind(&task.start_field)
    .bind(&task.start_date)
    .fetch_optional(&mut **tx)
    .await?;

    sqlx::query(
        r#"
INSERT INTO tasks (
    owner_type, owner, project_number, title, url, start_field, start_date,
    project_id, project_title, content_id, repository,
    start_field_id, end_field, end_field_id, end_date,
    focus_field, focus_field_id, focus_date,
    iteration_field, iteration_field_id, iteration_id, iteration_title,
    iteration_start_date, iteration_duration_days, iteration_options,
    status_field_id, status_option_id, status_option_name, status_options,
    priority_field_id, priority_option_id, priority_option_name, priority_options,
    people_field_id, people_user_ids, people_logins, assigned_to_me, created_by_me,
    labels, updated_at, is_done, last_seen_at
) VALUES (
    ?1, ?2, ?3, ?4, ?5, ?6, ?7,
    ?8, ?9, ?10, ?11,
    ?12, ?13, ?14, ?15,
    ?16, ?17, ?18,
    ?19, ?20, ?21, ?22,
    ?23, ?24, ?25,
    ?26, ?27, ?28, ?29,
    ?30, ?31, ?32, ?33,
    ?34, ?35, ?36, ?37, ?38,
    ?39, ?40, ?41, ?42
)
ON CONFLICT(owner_type, owner, project_number, title, url, start_field, start_date) DO UPDATE SET
    project_id = excluded.project_id,
    project_title = excluded.project_title,
    content_id = excluded.content_id,
    repository = excluded.repository,
    start_field_id = COALESCE(excluded.start_field_id, tasks.start_field_id),
    end_field = excluded.end_field,
    end_field_id = COALESCE(excluded.end_field_id, tasks.end_field_id),
    end_date = excluded.end_date,
    focus_field = excluded.focus_field,
    focus_field_id = COALESCE(excluded.focus_field_id, tasks.focus_field_id),
    focus_date = excluded.focus_date,
    iteration_field = excluded.iteration_field,
    iteration_field_id = COALESCE(excluded.iteration_field_id, tasks.iteration_field_id),
    iteration_id = excluded.iteration_id,
    iteration_title = excluded.iteration_title,
    iteration_start_date = excluded.iteration_start_date,
    iteration_duration_days = excluded.iteration_duration_days,
    iteration_options = CASE WHEN excluded.iteration_options <> '[]' THEN excluded.iteration_options ELSE tasks.iteration_options END,
    status_field_id = COALESCE(excluded.status_field_id, tasks.status_field_id),
    status_option_id = excluded.status_option_id,
    status_option_name = excluded.status_option_name,
    status_options = CASE WHEN excluded.status_options <> '[]' THEN excluded.status_options ELSE tasks.status_options END,
    priority_field_id = COALESCE(excluded.priority_field_id, tasks.priority_field_id),
    priority_option_id = excluded.priority_option_id,
    priority_option_name = excluded.priority_option_name,
    priority_options = CASE WHEN excluded.priority_options <> '[]' THEN excluded.priority_options ELSE tasks.priority_options END,
    people_field_id = COALESCE(excluded.people_field_id, tasks.people_field_id),
    people_user_ids = excluded.people_user_ids,
    people_logins = excluded.people_logins,
    assigned_to_me = excluded.assigned_to_me,
    created_by_me = excluded.created_by_me,
    labels = excluded.labels,
    updated_at = excluded.updated_at,
    is_done = excluded.is_done,
    last_seen_at = excluded.last_seen_at
"#,
    )
    .bind(task.owner_type.as_str())
    .bind(&task.owner)
    .bind(task.project_number)
    .bind(&task.title)
    .bind(&task.url)
    .bind(&task.start_field)
    .bind(&task.start_date)
    .bind(&task.project_id)
    .bind(&task.project_title)
    .bind(&task.content_id)
    .bind(&task.repository)
    .bind(&task.start.field_id)
    .bind(&task.end.field_name)
    .bind(&task.end.field_id)
    .bind(&task.end.date)
    .bind(&task.focus.field_name)
    .bind(&task.focus.field_id)
    .bind(&task.focus.date)
    .bind(&task.iteration.field_name)
    .bind(&task.iteration.field_id)
    .bind(&task.iteration.iteration_id)
    .bind(&task.iteration.title)
    .bind(&task.iteration.start_date)
    .bind(task.iteration.duration_days)
    .bind(json_iter_options(&task.iteration.options))
    .bind(&task.status.field_id)
    .bind(&task.status.option_id)
    .bind(&task.status.option_name)
    .bind(json_options(&task.status.options))
    .bind(&task.priority.field_id)
    .bind(&task.priority.option_id)
    .bind(&task.priority.option_name)
    .bind(json_options(&task.priority.options))
    .bind(&task.people.field_id)
    .bind(json_vec(&task.people.user_ids))
    .bind(json_vec(&task.people.logins))
    .bind(task.assigned_to_me)
    .bind(task.created_by_me)
    .bind(json_vec(&task.labels))
    .bind(task.updated_at.to_rfc3339())
    .bind(task.is_done)
    .bind(task.last_seen_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(if existing.is_some() {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Inserted
    })
}

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> DbResult<Task> {
    let owner_type: String = row.try_get("owner_type")?;
    let updated_at: String = row.try_get("updated_at")?;
    let last_seen_at: String = row.try_get("last_seen_at")?;

    Ok(Task {
        owner_type: owner_type.parse().unwrap_or(OwnerType::User),
        owner: row.try_get("owner")?,
        project_number: row.try_get("project_number")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        start_field: row.try_get("start_field")?,
        start_date: row.try_get("start_date")?,
        project_id: row.try_get("project_id")?,
        project_title: row.try_get("project_title")?,
        content_id: row.try_get("content_id")?,
        repository: row.try_get("repository")?,
        start: DateField {
            field_name: row.try_get("start_field")?,
            field_id: row.try_get("start_field_id")?,
            date: row.try_get("start_date")?,
        },
        end: DateField {
            field_name: row.try_get("end_field")?,
            field_id: row.try_get("end_field_id")?,
            date: row.try_get("end_date")?,
        },
        focus: DateField {
            field_name: row.try_get("focus_field")?,
            field_id: row.try_get("focus_field_id")?,
            date: row.try_get("focus_date")?,
        },
        iteration: IterationField {
            field_name: row.try_get("iteration_field")?,
            field_id: row.try_get("iteration_field_id")?,
            iteration_id: row.try_get("iteration_id")?,
            title: row.try_get("iteration_title")?,
            start_date: row.try_get("iteration_start_date")?,
            duration_days: row.try_get("iteration_duration_days")?,
            options: from_json_iter_options(&row.try_get::<String, _>("iteration_options")?),
        },
        status: SelectField {
            field_id: row.try_get("status_field_id")?,
            option_id: row.try_get("status_option_id")?,
            option_name: row.try_get("status_option_name")?,
            options: from_json_options(&row.try_get::<String, _>("status_options")?),
            dirty: false,
            pending_option_id: None,
        },
        priority: SelectField {
            field_id: row.try_get("priority_field_id")?,
            option_id: row.try_get("priority_option_id")?,
            option_name: row.try_get("priority_option_name")?,
            options: from_json_options(&row.try_get::<String, _>("priority_options")?),
            dirty: false,
            pending_option_id: None,
        },
        people: PeopleField {
            field_id: row.try_get("people_field_id")?,
            user_ids: from_json_vec(&row.try_get::<String, _>("people_user_ids")?),
            logins: from_json_vec(&row.try_get::<String, _>("people_logins")?),
        },
        assigned_to_me: row.try_get("assigned_to_me")?,
        created_by_me: row.try_get("created_by_me")?,
        labels: from_json_vec(&row.try_get::<String, _>("labels")?),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| DbError::InvalidDate(updated_at.clone(), e))?
            .with_timezone(&Utc),
        is_done: row.try_get("is_done")?,
        last_seen_at: DateTime::parse_from_rfc3339(&last_seen_at)
            .map_err(|e| DbError::InvalidDate(last_seen_at.clone(), e))?
            .with_timezone(&Utc),
    })
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> DbResult<WorkSession> {
    let started_at: String = row.try_get("started_at")?;
    let ended_at: Option<String> = row.try_get("ended_at")?;
    Ok(WorkSession {
        id: row.try_get("id")?,
        task_url: row.try_get("task_url")?,
        project_title: row.try_get("project_title")?,
        labels: from_json_vec(&row.try_get::<String, _>("labels")?),
        started_at: DateTime::parse_from_rfc3339(&started_at)
            .map_err(|e| DbError::InvalidDate(started_at.clone(), e))?
            .with_timezone(&Utc),
        ended_at: ended_at
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| DbError::InvalidDate(s.clone(), e))
            })
            .transpose()?,
    })
}

/// Closed-duration snapshot returned by `Database::task_duration_snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDurationRow {
    pub task_url: String,
    pub closed_seconds: i64,
    pub is_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task(url: &str) -> Task {
        Task {
            owner_type: OwnerType::Org,
            owner: "acme".into(),
            project_number: 1,
            title: "Fix the thing".into(),
            url: url.into(),
            start_field: "Start date".into(),
            start_date: "2026-01-01".into(),
            project_id: "PVT_1".into(),
            project_title: "Roadmap".into(),
            content_id: "I_1".into(),
            repository: "acme/widgets".into(),
            start: DateField {
                field_name: "Start date".into(),
                field_id: Some("F_1".into()),
                date: "2026-01-01".into(),
            },
            end: DateField::default(),
            focus: DateField::default(),
            iteration: IterationField::default(),
            status: SelectField {
                option_name: "In Progress".into(),
                ..Default::default()
            },
            priority: SelectField::default(),
            people: PeopleField::default(),
            assigned_to_me: true,
            created_by_me: false,
            labels: vec!["bug".into()],
            updated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            is_done: false,
            last_seen_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn upsert_then_load_round_trips() {
        let db = Database::new_in_memory().await.unwrap();
        let task = sample_task("https://github.com/acme/widgets/issues/1");
        let outcome = db.upsert_task(&task).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let loaded = db.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "Fix the thing");
        assert_eq!(loaded[0].labels, vec!["bug".to_string()]);
    }

    #[tokio::test]
    async fn upsert_twice_updates_in_place() {
        let db = Database::new_in_memory().await.unwrap();
        let mut task = sample_task("https://github.com/acme/widgets/issues/2");
        db.upsert_task(&task).await.unwrap();

        task.status.option_name = "Done".into();
        task.is_done = true;
        let outcome = db.upsert_task(&task).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let loaded = db.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].is_done);
    }

    #[tokio::test]
    async fn session_lifecycle_tracks_open_and_closed() {
        let db = Database::new_in_memory().await.unwrap();
        let url = "https://github.com/acme/widgets/issues/3";
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        db.start_session(url, "Roadmap", &[], start).await.unwrap();

        let active = db.active_task_urls().await.unwrap();
        assert_eq!(active, vec![url.to_string()]);

        let stop = Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 0).unwrap();
        db.stop_session(url, stop).await.unwrap();

        let active = db.active_task_urls().await.unwrap();
        assert!(active.is_empty());

        let snapshot = db.task_duration_snapshot(url).await.unwrap();
        assert_eq!(snapshot.closed_seconds, 1800);
        assert!(!snapshot.is_running);
    }

    #[tokio::test]
    async fn update_field_status_marks_done_from_name() {
        let db = Database::new_in_memory().await.unwrap();
        let task = sample_task("https://github.com/acme/widgets/issues/4");
        db.upsert_task(&task).await.unwrap();

        db.update_field(&task.url, FieldClass::Status, Some("opt_done"), Some("Done"), None, None)
            .await
            .unwrap();

        let loaded = db.load().await.unwrap();
        assert!(loaded[0].is_done);
        assert_eq!(loaded[0].status.option_name, "Done");
    }

    #[tokio::test]
    async fn starting_a_session_closes_a_prior_open_one() {
        let db = Database::new_in_memory().await.unwrap();
        let url = "https://github.com/acme/widgets/issues/5";
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        db.start_session(url, "Roadmap", &[], t1).await.unwrap();
        db.start_session(url, "Roadmap", &[], t2).await.unwrap();

        let active = db.active_task_urls().await.unwrap();
        assert_eq!(active, vec![url.to_string()]);
        let snapshot = db.task_duration_snapshot(url).await.unwrap();
        assert_eq!(snapshot.closed_seconds, 3600);
        assert!(snapshot.is_running);
    }

    #[tokio::test]
    async fn batched_snapshot_defaults_unknown_urls_to_zero() {
        let db = Database::new_in_memory().await.unwrap();
        let known = "https://github.com/acme/widgets/issues/6";
        let unknown = "https://github.com/acme/widgets/issues/999";
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 0).unwrap();
        db.start_session(known, "Roadmap", &[], start).await.unwrap();
        db.stop_session(known, end).await.unwrap();

        let snapshots = db
            .task_duration_snapshots(&[known.to_string(), unknown.to_string()])
            .await
            .unwrap();
        assert_eq!(snapshots[known].closed_seconds, 1800);
        assert_eq!(snapshots[unknown].closed_seconds, 0);
        assert!(!snapshots[unknown].is_running);
    }

    #[tokio::test]
    async fn aggregate_period_totals_can_scope_by_project() {
        let db = Database::new_in_memory().await.unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        db.start_session("https://a/1", "Roadmap", &[], now - chrono::Duration::hours(2))
            .await
            .unwrap();
        db.stop_session("https://a/1", now - chrono::Duration::hours(1)).await.unwrap();
        db.start_session("https://a/2", "Other", &[], now - chrono::Duration::hours(1))
            .await
            .unwrap();
        db.stop_session("https://a/2", now).await.unwrap();

        let totals = db
            .aggregate_period_totals(Period::Day, 30, Some("Roadmap"), None, now)
            .await
            .unwrap();
        let total_seconds: i64 = totals.iter().map(|t| t.seconds).sum();
        assert_eq!(total_seconds, 3600);
    }
}
