// crates/coordinator/src/lib.rs
//! The edit coordinator (spec.md §4.4 "Edit coordinator (C7)"): optimistic
//! local mutation with per-field-class pending-URL sets, background
//! remote writes, and rollback on failure.
//!
//! The coordinator is the single writer onto the in-memory task mirror
//! and the store; the view-model only ever reads a `snapshot()`. It
//! never holds a reference back to the UI — per spec.md §9 it signals
//! the UI with a bounded `UpdateEvent` channel instead.

pub mod error;
pub mod jobs;
pub mod validation;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use taskboard_db::Database;
use taskboard_remote::GraphQlClient;
use taskboard_types::{
    DateField, FieldClass, IterationField, OptionEntry, OwnerType, PeopleField, SelectField, Task,
};
use tokio::sync::{broadcast, Mutex, RwLock};

pub use error::{EditError, EditResult};
use jobs::JobRunner;

/// Messages the coordinator emits for the UI to drain, per spec.md §9.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    RowChanged(String),
    StatusLine(String),
    ProgressTick(usize, usize, String),
}

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Per-field-class pending-write guard: one `HashSet<url>` per
/// `FieldClass`, so "labels pending on A" never blocks "priority pending
/// on A" (spec.md §9 "Pending writes").
struct PendingSets {
    sets: HashMap<FieldClass, HashSet<String>>,
}

impl PendingSets {
    fn new() -> Self {
        let mut sets = HashMap::new();
        for class in FieldClass::ALL {
            sets.insert(class, HashSet::new());
        }
        Self { sets }
    }

    fn try_acquire(&mut self, class: FieldClass, url: &str) -> bool {
        self.sets.entry(class).or_default().insert(url.to_string())
    }

    fn release(&mut self, class: FieldClass, url: &str) {
        if let Some(set) = self.sets.get_mut(&class) {
            set.remove(url);
        }
    }

    fn contains(&self, class: FieldClass, url: &str) -> bool {
        self.sets.get(&class).map(|s| s.contains(url)).unwrap_or(false)
    }
}

/// Handle to the label-choice fetch currently backing an `edit-labels`
/// editor state, so entering a different state can cancel it (spec.md
/// §5 "Cancellation").
pub struct LabelFetchHandle {
    cancelled: Arc<std::sync::atomic::AtomicBool>,
}

impl LabelFetchHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::Relaxed);
    }
}

/// Wires the store, the remote client and the background job runner
/// together behind the optimistic-edit protocol described in spec.md
/// §4.4. Cheap to clone: every field is an `Arc`/shared handle.
#[derive(Clone)]
pub struct EditCoordinator {
    db: Arc<Database>,
    client: Arc<GraphQlClient>,
    jobs: Arc<JobRunner>,
    tasks: Arc<RwLock<Vec<Task>>>,
    pending: Arc<Mutex<PendingSets>>,
    events: broadcast::Sender<UpdateEvent>,
}

impl EditCoordinator {
    pub fn new(db: Arc<Database>, client: Arc<GraphQlClient>, jobs: Arc<JobRunner>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            db,
            client,
            jobs,
            tasks: Arc::new(RwLock::new(Vec::new())),
            pending: Arc::new(Mutex::new(PendingSets::new())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: UpdateEvent) {
        let _ = self.events.send(event);
    }

    /// Replace the in-memory mirror wholesale, e.g. after `Database::load`
    /// at startup or after a sync run commits. Rows currently in a
    /// pending set are left untouched by the caller's sync upsert (spec.md
    /// §5), so this merely swaps the read snapshot the view-model sees.
    pub async fn set_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.write().await = tasks;
    }

    /// A read-only copy for the view-model to filter/sort over.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    pub async fn is_pending(&self, class: FieldClass, url: &str) -> bool {
        self.pending.lock().await.contains(class, url)
    }

    async fn find_rows(&self, url: &str) -> Vec<Task> {
        self.tasks
            .read()
            .await
            .iter()
            .filter(|t| t.url == url)
            .cloned()
            .collect()
    }

    async fn mutate_rows(&self, url: &str, mut f: impl FnMut(&mut Task)) {
        let mut tasks = self.tasks.write().await;
        for t in tasks.iter_mut().filter(|t| t.url == url) {
            f(t);
        }
    }

    /// Acquire the pending slot for `class`+`url`, refusing a concurrent
    /// edit to the same field on the same URL (spec.md §5 "Ordering
    /// guarantees").
    async fn acquire(&self, class: FieldClass, url: &str) -> EditResult<()> {
        let mut pending = self.pending.lock().await;
        if pending.try_acquire(class, url) {
            Ok(())
        } else {
            Err(EditError::Busy)
        }
    }

    async fn release(&self, class: FieldClass, url: &str) {
        self.pending.lock().await.release(class, url);
    }

    // ---- single-select fields (status, priority) --------------------

    fn select_field(task: &Task, class: FieldClass) -> &SelectField {
        match class {
            FieldClass::Status => &task.status,
            FieldClass::Priority => &task.priority,
            _ => unreachable!("select_field called with a non-select class"),
        }
    }

    /// Resolve (and persist) the project field id for a select field,
    /// looking it up lazily if the row doesn't already carry one.
    async fn resolve_select_field_id(&self, task: &Task, class: FieldClass) -> EditResult<String> {
        if let Some(id) = Self::select_field(task, class).field_id.clone() {
            return Ok(id);
        }
        let field_name = match class {
            FieldClass::Status => "Status",
            FieldClass::Priority => "Priority",
            _ => unreachable!(),
        };
        let resolved = taskboard_remote::get_project_field_id_by_name(&self.client, &task.project_id, field_name)
            .await?
            .ok_or(EditError::NoFieldId)?;
        self.db.persist_field_id(&task.url, class, &resolved).await?;
        self.mutate_rows(&task.url, |t| {
            let field = match class {
                FieldClass::Status => &mut t.status.field_id,
                FieldClass::Priority => &mut t.priority.field_id,
                _ => unreachable!(),
            };
            *field = Some(resolved.clone());
        })
        .await;
        Ok(resolved)
    }

    async fn edit_select(&self, url: &str, class: FieldClass, option: OptionEntry) -> EditResult<()> {
        self.acquire(class, url).await?;
        let result = self.edit_select_inner(url, class, option).await;
        if result.is_err() {
            self.release(class, url).await;
        }
        result
    }

    async fn edit_select_inner(&self, url: &str, class: FieldClass, option: OptionEntry) -> EditResult<()> {
        let rows = self.find_rows(url).await;
        let task = rows.first().cloned().ok_or(EditError::UnknownTask)?;

        let known = Self::select_field(&task, class)
            .options
            .iter()
            .any(|o| o.id == option.id);
        if !known {
            return Err(EditError::UnknownOption(option.name));
        }

        let field_id = self.resolve_select_field_id(&task, class).await?;
        let prior = task.clone();

        self.db
            .update_field(url, class, Some(option.id.as_str()), Some(option.name.as_str()), None, None)
            .await?;
        self.mutate_rows(url, |t| {
            let field = match class {
                FieldClass::Status => &mut t.status,
                FieldClass::Priority => &mut t.priority,
                _ => unreachable!(),
            };
            field.dirty = true;
            field.pending_option_id = Some(option.id.clone());
            field.option_id = Some(option.id.clone());
            field.option_name = option.name.clone();
            if matches!(class, FieldClass::Status) {
                t.is_done = taskboard_types::is_done_status(&option.name);
            }
        })
        .await;
        self.emit(UpdateEvent::RowChanged(url.to_string()));
        self.emit(UpdateEvent::StatusLine(format!("Updating {}…", class.as_str())));

        self.spawn_remote_write(url.to_string(), class, prior, move |client, project_id, item_id| {
            let field_id = field_id.clone();
            let option = option.clone();
            Box::pin(async move {
                taskboard_remote::set_project_single_select(&client, &project_id, &item_id, &field_id, &option.id)
                    .await
            })
        })
        .await;
        Ok(())
    }

    pub async fn edit_status(&self, url: &str, option: OptionEntry) -> EditResult<()> {
        self.edit_select(url, FieldClass::Status, option).await
    }

    pub async fn edit_priority(&self, url: &str, option: OptionEntry) -> EditResult<()> {
        self.edit_select(url, FieldClass::Priority, option).await
    }

    // ---- dates (start, end, focus) -----------------------------------

    async fn resolve_date_field_id(&self, task: &Task, class: FieldClass) -> EditResult<String> {
        let (field_id, field_name) = match class {
            FieldClass::StartDate => (task.start.field_id.clone(), task.start.field_name.clone()),
            FieldClass::EndDate => (task.end.field_id.clone(), task.end.field_name.clone()),
            FieldClass::FocusDate => (task.focus.field_id.clone(), task.focus.field_name.clone()),
            _ => unreachable!(),
        };
        if let Some(id) = field_id {
            return Ok(id);
        }
        if field_name.is_empty() {
            return Err(EditError::NoFieldId);
        }
        let resolved = taskboard_remote::get_project_field_id_by_name(&self.client, &task.project_id, &field_name)
            .await?
            .ok_or(EditError::NoFieldId)?;
        self.db.persist_field_id(&task.url, class, &resolved).await?;
        self.mutate_rows(&task.url, |t| {
            let field = match class {
                FieldClass::StartDate => &mut t.start.field_id,
                FieldClass::EndDate => &mut t.end.field_id,
                FieldClass::FocusDate => &mut t.focus.field_id,
                _ => unreachable!(),
            };
            *field = Some(resolved.clone());
        })
        .await;
        Ok(resolved)
    }

    async fn edit_date(&self, url: &str, class: FieldClass, raw: &str) -> EditResult<()> {
        let date = validation::validate_date(raw)?;
        self.acquire(class, url).await?;
        let result = self.edit_date_inner(url, class, date).await;
        if result.is_err() {
            self.release(class, url).await;
        }
        result
    }

    async fn edit_date_inner(&self, url: &str, class: FieldClass, date: String) -> EditResult<()> {
        let rows = self.find_rows(url).await;
        let task = rows.first().cloned().ok_or(EditError::UnknownTask)?;
        let field_id = self.resolve_date_field_id(&task, class).await?;
        let prior = task.clone();

        self.db.update_field(url, class, None, None, Some(date.as_str()), None).await?;
        self.mutate_rows(url, |t| {
            let field = match class {
                FieldClass::StartDate => &mut t.start,
                FieldClass::EndDate => &mut t.end,
                FieldClass::FocusDate => &mut t.focus,
                _ => unreachable!(),
            };
            field.date = date.clone();
        })
        .await;
        self.emit(UpdateEvent::RowChanged(url.to_string()));
        self.emit(UpdateEvent::StatusLine(format!("Updating {}…", class.as_str())));

        self.spawn_remote_write(url.to_string(), class, prior, move |client, project_id, item_id| {
            let field_id = field_id.clone();
            let date = date.clone();
            Box::pin(async move { taskboard_remote::set_project_date(&client, &project_id, &item_id, &field_id, &date).await })
        })
        .await;
        Ok(())
    }

    pub async fn edit_start_date(&self, url: &str, raw: &str) -> EditResult<()> {
        self.edit_date(url, FieldClass::StartDate, raw).await
    }

    pub async fn edit_end_date(&self, url: &str, raw: &str) -> EditResult<()> {
        self.edit_date(url, FieldClass::EndDate, raw).await
    }

    pub async fn edit_focus_date(&self, url: &str, raw: &str) -> EditResult<()> {
        self.edit_date(url, FieldClass::FocusDate, raw).await
    }

    // ---- iteration ----------------------------------------------------

    pub async fn edit_iteration(&self, url: &str, iteration_id: &str) -> EditResult<()> {
        self.acquire(FieldClass::Iteration, url).await?;
        let result = self.edit_iteration_inner(url, iteration_id).await;
        if result.is_err() {
            self.release(FieldClass::Iteration, url).await;
        }
        result
    }

    async fn edit_iteration_inner(&self, url: &str, iteration_id: &str) -> EditResult<()> {
        let rows = self.find_rows(url).await;
        let task = rows.first().cloned().ok_or(EditError::UnknownTask)?;
        let option = task
            .iteration
            .options
            .iter()
            .find(|o| o.id == iteration_id)
            .cloned()
            .ok_or_else(|| EditError::UnknownOption(iteration_id.to_string()))?;

        let field_id = if let Some(id) = task.iteration.field_id.clone() {
            id
        } else if !task.iteration.field_name.is_empty() {
            let resolved =
                taskboard_remote::get_project_field_id_by_name(&self.client, &task.project_id, &task.iteration.field_name)
                    .await?
                    .ok_or(EditError::NoFieldId)?;
            self.db.persist_field_id(url, FieldClass::Iteration, &resolved).await?;
            self.mutate_rows(url, |t| t.iteration.field_id = Some(resolved.clone())).await;
            resolved
        } else {
            return Err(EditError::NoFieldId);
        };

        let prior = task.clone();
        self.db
            .update_field(url, FieldClass::Iteration, Some(option.id.as_str()), Some(option.title.as_str()), None, None)
            .await?;
        self.mutate_rows(url, |t| {
            t.iteration.iteration_id = Some(option.id.clone());
            t.iteration.title = option.title.clone();
            t.iteration.start_date = option.start_date.clone();
            t.iteration.duration_days = option.duration_days;
        })
        .await;
        self.emit(UpdateEvent::RowChanged(url.to_string()));
        self.emit(UpdateEvent::StatusLine("Updating iteration…".to_string()));

        self.spawn_remote_write(url.to_string(), FieldClass::Iteration, prior, move |client, project_id, item_id| {
            let field_id = field_id.clone();
            let iteration_id = option.id.clone();
            Box::pin(async move {
                taskboard_remote::set_project_iteration(&client, &project_id, &item_id, &field_id, &iteration_id).await
            })
        })
        .await;
        Ok(())
    }

    // ---- labels / assignees -------------------------------------------

    pub async fn edit_labels(&self, url: &str, raw: &[String]) -> EditResult<()> {
        let labels = validation::normalize_labels(raw);
        self.acquire(FieldClass::Labels, url).await?;
        let result = self.edit_labels_inner(url, labels).await;
        if result.is_err() {
            self.release(FieldClass::Labels, url).await;
        }
        result
    }

    async fn edit_labels_inner(&self, url: &str, labels: Vec<String>) -> EditResult<()> {
        let rows = self.find_rows(url).await;
        let task = rows.first().cloned().ok_or(EditError::UnknownTask)?;
        if task.content_id.is_empty() {
            return Err(EditError::UnsupportedForDraft);
        }
        let (owner, repo) = split_repository(&task.repository)?;
        let label_ids = resolve_label_ids(&self.client, &owner, &repo, &labels).await?;
        let prior = task.clone();

        self.db.update_field(url, FieldClass::Labels, None, None, None, Some(labels.as_slice())).await?;
        self.mutate_rows(url, |t| t.labels = labels.clone()).await;
        self.emit(UpdateEvent::RowChanged(url.to_string()));
        self.emit(UpdateEvent::StatusLine("Updating labels…".to_string()));

        let content_id = task.content_id.clone();
        self.spawn_remote_write(url.to_string(), FieldClass::Labels, prior, move |client, _project_id, _item_id| {
            let content_id = content_id.clone();
            let label_ids = label_ids.clone();
            Box::pin(async move { taskboard_remote::set_issue_labels(&client, &content_id, &label_ids).await })
        })
        .await;
        Ok(())
    }

    pub async fn edit_assignees(&self, url: &str, raw: &[String]) -> EditResult<()> {
        let logins = validation::normalize_labels(raw);
        self.acquire(FieldClass::Assignees, url).await?;
        let result = self.edit_assignees_inner(url, logins).await;
        if result.is_err() {
            self.release(FieldClass::Assignees, url).await;
        }
        result
    }

    async fn edit_assignees_inner(&self, url: &str, logins: Vec<String>) -> EditResult<()> {
        let rows = self.find_rows(url).await;
        let task = rows.first().cloned().ok_or(EditError::UnknownTask)?;
        if task.content_id.is_empty() {
            return Err(EditError::UnsupportedForDraft);
        }
        let (owner, repo) = split_repository(&task.repository)?;
        let assignee_ids = resolve_assignee_ids(&self.client, &owner, &repo, &logins).await?;
        let prior = task.clone();

        self.db.update_field(url, FieldClass::Assignees, None, None, None, Some(logins.as_slice())).await?;
        self.mutate_rows(url, |t| t.people.logins = logins.clone()).await;
        self.emit(UpdateEvent::RowChanged(url.to_string()));
        self.emit(UpdateEvent::StatusLine("Updating assignees…".to_string()));

        let content_id = task.content_id.clone();
        self.spawn_remote_write(url.to_string(), FieldClass::Assignees, prior, move |client, _project_id, _item_id| {
            let content_id = content_id.clone();
            let assignee_ids = assignee_ids.clone();
            Box::pin(async move { taskboard_remote::set_issue_assignees(&client, &content_id, &assignee_ids).await })
        })
        .await;
        Ok(())
    }

    // ---- comment (no optimistic shadow: it's an action, not a field) --

    pub async fn add_comment(&self, url: &str, body: &str) -> EditResult<()> {
        let body = validation::validate_comment(body)?;
        let rows = self.find_rows(url).await;
        let task = rows.first().cloned().ok_or(EditError::UnknownTask)?;
        if task.content_id.is_empty() {
            return Err(EditError::UnsupportedForDraft);
        }
        self.emit(UpdateEvent::StatusLine("Posting comment…".to_string()));

        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        let url_owned = url.to_string();
        let content_id = task.content_id.clone();
        self.jobs.start_job("add_comment", 1, move |state, _cancel_rx| async move {
            state.increment();
            match taskboard_remote::add_issue_comment(&client, &content_id, &body).await {
                Ok(()) => {
                    let _ = events.send(UpdateEvent::StatusLine("Comment posted".to_string()));
                    let _ = events.send(UpdateEvent::RowChanged(url_owned));
                    Ok(())
                }
                Err(e) => {
                    let _ = events.send(UpdateEvent::StatusLine(format!("comment failed: {e}")));
                    Err(e.to_string())
                }
            }
        });
        Ok(())
    }

    /// Fetch the label choice list for `url`'s repository, honoring
    /// cancellation via the returned handle (spec.md §4.4 "Labels
    /// sub-protocol"). The caller drops or cancels the handle when the
    /// editor state changes before the fetch resolves.
    pub fn fetch_label_choices(
        &self,
        repo_owner: String,
        repo_name: String,
    ) -> (LabelFetchHandle, tokio::sync::oneshot::Receiver<EditResult<Vec<(String, String)>>>) {
        let cancelled = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let handle = LabelFetchHandle { cancelled: Arc::clone(&cancelled) };
        let (tx, rx) = tokio::sync::oneshot::channel();
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            let result = taskboard_remote::list_repo_labels(&client, &repo_owner, &repo_name)
                .await
                .map_err(EditError::from);
            if !cancelled.load(std::sync::atomic::Ordering::Relaxed) {
                let _ = tx.send(result);
            }
        });
        (handle, rx)
    }

    /// Same cancellable-fetch shape as `fetch_label_choices`, for the
    /// `edit-assignees` editor state's repository-assignable-users list.
    pub fn fetch_assignee_choices(
        &self,
        repo_owner: String,
        repo_name: String,
    ) -> (LabelFetchHandle, tokio::sync::oneshot::Receiver<EditResult<Vec<(String, String)>>>) {
        let cancelled = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let handle = LabelFetchHandle { cancelled: Arc::clone(&cancelled) };
        let (tx, rx) = tokio::sync::oneshot::channel();
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            let result = taskboard_remote::list_repo_assignees(&client, &repo_owner, &repo_name)
                .await
                .map_err(EditError::from);
            if !cancelled.load(std::sync::atomic::Ordering::Relaxed) {
                let _ = tx.send(result);
            }
        });
        (handle, rx)
    }

    // ---- item creation (Add flow) --------------------------------------

    /// Create a new draft project item (spec.md §4.3 `create_project_item`,
    /// driven by the UI's multi-step Add flow). Unlike the edit methods
    /// above this inserts a brand-new row instead of mutating an existing
    /// one, so it has no per-field-class pending entry to acquire — there
    /// is no existing task for a concurrent edit to race against.
    ///
    /// `priority` is `(field_id, option)`, already resolved by the caller
    /// from an existing synced task in the same project; pass `None` when
    /// no such task exists yet, since a freshly-empty project has no way
    /// to discover the Priority field's id without one.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_item(
        &self,
        project_id: &str,
        project_title: &str,
        project_number: i64,
        owner_type: OwnerType,
        owner: &str,
        repository: &str,
        title: &str,
        labels: &[String],
        assignee_logins: &[String],
        priority: Option<(String, OptionEntry)>,
    ) -> EditResult<Task> {
        let title = validation::validate_title(title)?;
        let (repo_owner, repo_name) = validation::validate_repository(repository)?;
        let labels = validation::normalize_labels(labels);
        let assignee_logins = validation::normalize_labels(assignee_logins);

        let assignee_ids = if assignee_logins.is_empty() {
            Vec::new()
        } else {
            resolve_assignee_ids(&self.client, &repo_owner, &repo_name, &assignee_logins).await?
        };

        let item_id = taskboard_remote::create_project_item(&self.client, project_id, &title, &assignee_ids).await?;

        if let Some((field_id, option)) = &priority {
            // A draft item is a ProjectV2Item like any other, so the
            // ordinary single-select mutation applies unchanged. Best
            // effort: a failure here shouldn't undo the item just created.
            let _ = taskboard_remote::set_project_single_select(&self.client, project_id, &item_id, field_id, &option.id).await;
        }

        let now = Utc::now();
        let priority_field = match priority {
            Some((field_id, option)) => SelectField {
                field_id: Some(field_id),
                option_id: Some(option.id.clone()),
                option_name: option.name.clone(),
                options: vec![option],
                dirty: false,
                pending_option_id: None,
            },
            None => SelectField::default(),
        };

        let task = Task {
            owner_type,
            owner: owner.to_string(),
            project_number,
            title: title.clone(),
            url: format!("urn:taskboard:draft:{item_id}"),
            start_field: String::new(),
            start_date: String::new(),
            project_id: project_id.to_string(),
            project_title: project_title.to_string(),
            item_id,
            content_id: String::new(),
            repository: format!("{repo_owner}/{repo_name}"),
            start: DateField::default(),
            end: DateField::default(),
            focus: DateField::default(),
            iteration: IterationField::default(),
            status: SelectField::default(),
            priority: priority_field,
            people: PeopleField { field_id: None, user_ids: assignee_ids, logins: assignee_logins },
            assigned_to_me: false,
            created_by_me: true,
            labels,
            updated_at: now,
            is_done: false,
            last_seen_at: now,
        };

        self.db.upsert_task(&task).await?;
        self.tasks.write().await.push(task.clone());
        self.emit(UpdateEvent::RowChanged(task.url.clone()));
        self.emit(UpdateEvent::StatusLine(format!("created {}", task.title)));
        Ok(task)
    }

    // ---- generic background-write plumbing -----------------------------

    /// Spawn the background worker that performs the remote mutation for
    /// one optimistic edit, reconciling success/failure per spec.md §4.4
    /// steps 4-5. `remote` is boxed so each call site can close over its
    /// own field-specific arguments without a generic explosion here.
    #[allow(clippy::type_complexity)]
    async fn spawn_remote_write<F>(&self, url: String, class: FieldClass, prior: Task, remote: F)
    where
        F: FnOnce(
                Arc<GraphQlClient>,
                String,
                String,
            ) -> std::pin::Pin<Box<dyn std::future::Future<Output = taskboard_remote::RemoteResult<()>> + Send>>
            + Send
            + 'static,
    {
        let client = Arc::clone(&self.client);
        let db = Arc::clone(&self.db);
        let pending = Arc::clone(&self.pending);
        let tasks = Arc::clone(&self.tasks);
        let events = self.events.clone();
        let project_id = prior.project_id.clone();
        let item_id = prior.item_id.clone();

        self.jobs.start_job(format!("edit:{}", class.as_str()), 1, move |state, _cancel_rx| async move {
            state.increment();
            let outcome = remote(client, project_id, item_id).await;
            pending.lock().await.release(class, &url);

            match outcome {
                Ok(()) => {
                    {
                        let mut guard = tasks.write().await;
                        for t in guard.iter_mut().filter(|t| t.url == url) {
                            match class {
                                FieldClass::Status => {
                                    t.status.dirty = false;
                                    t.status.pending_option_id = None;
                                }
                                FieldClass::Priority => {
                                    t.priority.dirty = false;
                                    t.priority.pending_option_id = None;
                                }
                                _ => {}
                            }
                        }
                    }
                    if matches!(class, FieldClass::Status) {
                        let is_done = {
                            let guard = tasks.read().await;
                            guard.iter().find(|t| t.url == url).map(|t| t.is_done).unwrap_or(false)
                        };
                        if is_done {
                            if let Ok(active) = db.active_task_urls().await {
                                if active.iter().any(|u| u == &url) {
                                    let _ = db.stop_session(&url, Utc::now()).await;
                                }
                            }
                        }
                    }
                    let _ = events.send(UpdateEvent::StatusLine(format!("{} updated", class.as_str())));
                    let _ = events.send(UpdateEvent::RowChanged(url.clone()));
                    Ok(())
                }
                Err(e) => {
                    let _ = db.reset_field(&url, class, &prior).await;
                    {
                        let mut guard = tasks.write().await;
                        for t in guard.iter_mut().filter(|t| t.url == url) {
                            *t = prior.clone();
                        }
                    }
                    let _ = events.send(UpdateEvent::StatusLine(format!("{} update failed: {e}", class.as_str())));
                    let _ = events.send(UpdateEvent::RowChanged(url.clone()));
                    Err(e.to_string())
                }
            }
        });
    }
}

/// `"owner/name"` -> `(owner, name)`. Labels and assignees are mutated
/// through the repository's node graph, not the project's, so every
/// label/assignee write needs the owning repo split back out of the
/// denormalized `repository` column.
fn split_repository(repository: &str) -> EditResult<(String, String)> {
    repository
        .split_once('/')
        .map(|(owner, name)| (owner.to_string(), name.to_string()))
        .ok_or(EditError::UnsupportedForDraft)
}

/// GitHub's label mutation takes label node ids, not names, so resolve
/// the repo's current label list and map the chosen names onto it.
async fn resolve_label_ids(
    client: &GraphQlClient,
    owner: &str,
    repo: &str,
    names: &[String],
) -> EditResult<Vec<String>> {
    let available = taskboard_remote::list_repo_labels(client, owner, repo).await?;
    names
        .iter()
        .map(|name| {
            available
                .iter()
                .find(|(_, n)| n.eq_ignore_ascii_case(name))
                .map(|(id, _)| id.clone())
                .ok_or_else(|| EditError::UnknownOption(name.clone()))
        })
        .collect()
}

/// Same idea as `resolve_label_ids` for assignees: the replace-actors
/// mutation takes user node ids, the UI only ever deals in logins.
async fn resolve_assignee_ids(
    client: &GraphQlClient,
    owner: &str,
    repo: &str,
    logins: &[String],
) -> EditResult<Vec<String>> {
    let available = taskboard_remote::list_repo_assignees(client, owner, repo).await?;
    logins
        .iter()
        .map(|login| {
            available
                .iter()
                .find(|(_, l)| l.eq_ignore_ascii_case(login))
                .map(|(id, _)| id.clone())
                .ok_or_else(|| EditError::UnknownOption(login.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_types::{DateField, IterationField, OwnerType, PeopleField};

    fn base_task(url: &str) -> Task {
        Task {
            owner_type: OwnerType::Org,
            owner: "acme".into(),
            project_number: 1,
            title: "Fix the thing".into(),
            url: url.into(),
            start_field: "(no date)".into(),
            start_date: String::new(),
            project_id: "PVT_1".into(),
            project_title: "Roadmap".into(),
            item_id: "PVTI_1".into(),
            content_id: "I_1".into(),
            repository: "acme/widgets".into(),
            start: DateField::default(),
            end: DateField::default(),
            focus: DateField::default(),
            iteration: IterationField::default(),
            status: SelectField {
                field_id: Some("F_status".into()),
                option_id: Some("OPT_todo".into()),
                option_name: "Todo".into(),
                options: vec![
                    OptionEntry { id: "OPT_todo".into(), name: "Todo".into() },
                    OptionEntry { id: "OPT_done".into(), name: "Done".into() },
                ],
                dirty: false,
                pending_option_id: None,
            },
            priority: SelectField::default(),
            people: PeopleField::default(),
            assigned_to_me: true,
            created_by_me: false,
            labels: vec![],
            updated_at: Utc::now(),
            is_done: false,
            last_seen_at: Utc::now(),
        }
    }

    async fn make_coordinator() -> (EditCoordinator, Database) {
        let db = Database::new_in_memory().await.unwrap();
        let client = GraphQlClient::new("tok");
        let jobs = JobRunner::new();
        let coordinator = EditCoordinator::new(Arc::new(db), Arc::new(client), Arc::new(jobs));
        let db2 = Database::new_in_memory().await.unwrap();
        (coordinator, db2)
    }

    #[tokio::test]
    async fn second_edit_to_same_url_and_class_is_refused_while_pending() {
        let (coordinator, _unused) = make_coordinator().await;
        coordinator.db.upsert_task(&base_task("https://x/1")).await.unwrap();
        coordinator.set_tasks(vec![base_task("https://x/1")]).await;

        coordinator.pending.lock().await.try_acquire(FieldClass::Status, "https://x/1");
        let result = coordinator
            .edit_status("https://x/1", OptionEntry { id: "OPT_done".into(), name: "Done".into() })
            .await;
        assert!(matches!(result, Err(EditError::Busy)));
    }

    #[tokio::test]
    async fn unknown_status_option_is_rejected_before_any_write() {
        let (coordinator, _unused) = make_coordinator().await;
        coordinator.db.upsert_task(&base_task("https://x/2")).await.unwrap();
        coordinator.set_tasks(vec![base_task("https://x/2")]).await;

        let result = coordinator
            .edit_status("https://x/2", OptionEntry { id: "OPT_nope".into(), name: "Nope".into() })
            .await;
        assert!(matches!(result, Err(EditError::UnknownOption(_))));
        assert!(!coordinator.is_pending(FieldClass::Status, "https://x/2").await);
    }

    #[tokio::test]
    async fn invalid_date_is_refused_with_no_pending_entry() {
        let (coordinator, _unused) = make_coordinator().await;
        coordinator.db.upsert_task(&base_task("https://x/3")).await.unwrap();
        coordinator.set_tasks(vec![base_task("https://x/3")]).await;

        let result = coordinator.edit_start_date("https://x/3", "not-a-date").await;
        assert!(matches!(result, Err(EditError::InvalidDate(_))));
        assert!(!coordinator.is_pending(FieldClass::StartDate, "https://x/3").await);
    }

    #[tokio::test]
    async fn editing_labels_on_a_draft_issue_is_refused() {
        let (coordinator, _unused) = make_coordinator().await;
        let mut draft = base_task("https://x/4");
        draft.content_id = String::new();
        coordinator.db.upsert_task(&draft).await.unwrap();
        coordinator.set_tasks(vec![draft]).await;

        let result = coordinator.edit_labels("https://x/4", &["bug".to_string()]).await;
        assert!(matches!(result, Err(EditError::UnsupportedForDraft)));
    }

    #[tokio::test]
    async fn create_item_rejects_blank_title_before_any_network_call() {
        let (coordinator, _unused) = make_coordinator().await;
        let result = coordinator
            .create_item("PVT_1", "Roadmap", 1, OwnerType::Org, "acme", "acme/widgets", "   ", &[], &[], None)
            .await;
        assert!(matches!(result, Err(EditError::EmptyTitle)));
    }

    #[tokio::test]
    async fn create_item_rejects_malformed_repository_before_any_network_call() {
        let (coordinator, _unused) = make_coordinator().await;
        let result = coordinator
            .create_item("PVT_1", "Roadmap", 1, OwnerType::Org, "acme", "widgets", "New task", &[], &[], None)
            .await;
        assert!(matches!(result, Err(EditError::InvalidRepository(_))));
    }
}
