// crates/db/src/migrations.rs
//! Inline SQL migrations for the taskboard database schema.
//!
//! Simple inline migrations rather than sqlx migration files: the schema
//! is small and self-contained, and inline strings keep the whole history
//! reviewable in one place.
pub const MIGRATIONS: &[&str] = &[
    // Migration 1: tasks table. Primary key mirrors the Task key tuple
    // (owner_type, owner, project_number, title, url, start_field,
    // start_date): re-ingesting the same logical row updates mutable
    // columns in place instead of duplicating it.
    r#"
CREATE TABLE IF NOT EXISTS tasks (
    owner_type TEXT NOT NULL,
    owner TEXT NOT NULL,
    project_number INTEGER NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    start_field TEXT NOT NULL DEFAULT '',
    start_date TEXT NOT NULL DEFAULT '',

    project_id TEXT NOT NULL DEFAULT '',
    project_title TEXT NOT NULL DEFAULT '',
    content_id TEXT NOT NULL DEFAULT '',
    repository TEXT NOT NULL DEFAULT '',

    start_field_id TEXT,
    end_field TEXT NOT NULL DEFAULT '',
    end_field_id TEXT,
    end_date TEXT NOT NULL DEFAULT '',
    focus_field TEXT NOT NULL DEFAULT '',
    focus_field_id TEXT,
    focus_date TEXT NOT NULL DEFAULT '',

    iteration_field TEXT NOT NULL DEFAULT '',
    iteration_field_id TEXT,
    iteration_id TEXT,
    iteration_title TEXT NOT NULL DEFAULT '',
    iteration_start_date TEXT NOT NULL DEFAULT '',
    iteration_duration_days INTEGER NOT NULL DEFAULT 0,
    iteration_options TEXT NOT NULL DEFAULT '[]',

    status_field_id TEXT,
    status_option_id TEXT,
    status_option_name TEXT NOT NULL DEFAULT '',
    status_options TEXT NOT NULL DEFAULT '[]',

    priority_field_id TEXT,
    priority_option_id TEXT,
    priority_option_name TEXT NOT NULL DEFAULT '',
    priority_options TEXT NOT NULL DEFAULT '[]',

    people_field_id TEXT,
    people_user_ids TEXT NOT NULL DEFAULT '[]',
    people_logins TEXT NOT NULL DEFAULT '[]',
    assigned_to_me INTEGER NOT NULL DEFAULT 0,
    created_by_me INTEGER NOT NULL DEFAULT 0,

    labels TEXT NOT NULL DEFAULT '[]',

    updated_at TEXT NOT NULL,
    is_done INTEGER NOT NULL DEFAULT 0,
    last_seen_at TEXT NOT NULL,

    PRIMARY KEY (owner_type, owner, project_number, title, url, start_field, start_date)
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_type, owner, project_number);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status_option_name);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_date ON tasks(start_date);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_focus_date ON tasks(focus_date);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_end_date ON tasks(end_date);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_last_seen ON tasks(last_seen_at);"#,
    // Migration 2: work_sessions table (spec.md §4.4 timer engine).
    r#"
CREATE TABLE IF NOT EXISTS work_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_url TEXT NOT NULL,
    project_title TEXT NOT NULL DEFAULT '',
    labels TEXT NOT NULL DEFAULT '[]',
    started_at TEXT NOT NULL,
    ended_at TEXT
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_work_sessions_task ON work_sessions(task_url);"#,
    // Partial index: only open sessions ever get looked up by this path
    // (active_task_urls, start_session's enforce-one-open-session check).
    r#"CREATE INDEX IF NOT EXISTS idx_work_sessions_open ON work_sessions(task_url) WHERE ended_at IS NULL;"#,
    r#"CREATE INDEX IF NOT EXISTS idx_work_sessions_started ON work_sessions(started_at);"#,
    // Migration 3: timer_events table (append-only audit trail).
    r#"
CREATE TABLE IF NOT EXISTS timer_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_url TEXT NOT NULL,
    event_type TEXT NOT NULL,
    at TEXT NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_timer_events_task ON timer_events(task_url);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_timer_events_at ON timer_events(at);"#,
    // Migration 4: the task-by-url + chronological-order lookup a timer
    // audit trail is read by isn't covered by either single-column index
    // above; add the compound one.
    r#"CREATE INDEX IF NOT EXISTS idx_timer_events_task_at ON timer_events(task_url, at);"#,
];
