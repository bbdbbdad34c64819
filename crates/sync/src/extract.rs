// crates/sync/src/extract.rs
//! Turn one raw project item plus its field values into zero or more
//! `Task` rows, following the same shape rules as the original scanner:
//! one row per matching date field, or a single dateless row if none
//! matched, with an inclusion filter on assignment.

use chrono::{NaiveDate, Utc};
use regex_lite::Regex;
use taskboard_remote::{FieldValue, ItemContent, ItemNode};
use taskboard_types::{DateField, IterationField, IterationOption, OwnerType, PeopleField, SelectField, Task};

/// Fields whose single-select name marks it as the "status" column.
const STATUS_FIELD_NAMES: &[&str] = &["status", "state", "progress"];

pub struct ExtractContext<'a> {
    pub owner_type: OwnerType,
    pub owner: String,
    pub project_number: i64,
    pub project_title: String,
    pub date_field_regex: &'a Regex,
    pub iteration_field_regex: Option<&'a Regex>,
    pub me: &'a str,
    pub include_unassigned: bool,
}

/// Extract every row this item produces, or an empty vec if the item is
/// excluded by the assignment rule.
pub fn extract_rows(item: &ItemNode, ctx: &ExtractContext) -> Vec<Task> {
    let now = Utc::now();

    let (title, url, repository, assignees) = match &item.content {
        Some(ItemContent::DraftIssue { title }) => (title.clone(), String::new(), String::new(), vec![]),
        Some(ItemContent::Issue { title, url, repository, assignees, .. }) => (
            title.clone(),
            url.clone(),
            repository.name_with_owner.clone(),
            assignees.nodes.iter().map(|l| l.login.clone()).collect(),
        ),
        Some(ItemContent::PullRequest { title, url, repository, assignees, .. }) => (
            title.clone(),
            url.clone(),
            repository.name_with_owner.clone(),
            assignees.nodes.iter().map(|l| l.login.clone()).collect(),
        ),
        None => ("(Draft item)".to_string(), String::new(), String::new(), vec![]),
    };
    let content_id = item.content.as_ref().and_then(|c| c.content_id()).unwrap_or_default().to_string();
    let labels = item.content.as_ref().map(ItemContent::labels).unwrap_or_default();
    let created_by_me = item
        .content
        .as_ref()
        .and_then(ItemContent::author_login)
        .map(|login| login == ctx.me)
        .unwrap_or(false);

    let mut people_logins: Vec<String> = Vec::new();
    let mut status_name = String::new();
    let mut priority_name = String::new();
    let mut iteration: IterationField = IterationField::default();
    let mut date_fields: Vec<(String, String)> = Vec::new();

    for fv in &item.field_values.nodes {
        match fv {
            FieldValue::ProjectV2ItemFieldUserValue { users, .. } => {
                people_logins.extend(users.nodes.iter().map(|l| l.login.clone()));
            }
            FieldValue::ProjectV2ItemFieldSingleSelectValue { name, field } => {
                let lower = field.name.to_lowercase();
                if STATUS_FIELD_NAMES.contains(&lower.as_str()) {
                    status_name = name.clone();
                } else if lower == "priority" {
                    priority_name = name.clone();
                }
            }
            FieldValue::ProjectV2ItemFieldDateValue { date, field } => {
                if let Some(date) = date {
                    if ctx.date_field_regex.is_match(&field.name) && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
                    {
                        date_fields.push((field.name.clone(), date.clone()));
                    }
                }
            }
            FieldValue::ProjectV2ItemFieldIterationValue { title, start_date, duration, field } => {
                if ctx
                    .iteration_field_regex
                    .map(|r| r.is_match(&field.name))
                    .unwrap_or_else(|| field.name.to_lowercase().contains("iteration"))
                {
                    iteration = IterationField {
                        field_name: field.name.clone(),
                        field_id: None,
                        iteration_id: None,
                        title: title.clone(),
                        start_date: start_date.clone(),
                        duration_days: *duration,
                        options: Vec::<IterationOption>::new(),
                    };
                }
            }
            FieldValue::Other => {}
        }
    }

    let assigned_to_me = assignees.iter().any(|a| a == ctx.me) || people_logins.iter().any(|l| l == ctx.me);
    // spec.md §4.3 step 4: kept if assigned, authored by me, or the
    // caller explicitly widened the filter to unassigned items.
    if !assigned_to_me && !created_by_me && !ctx.include_unassigned {
        return Vec::new();
    }

    let is_done = taskboard_types::is_done_status(&status_name);

    let base = |start_field: String, start_date: String, title: String| Task {
        owner_type: ctx.owner_type,
        owner: ctx.owner.clone(),
        project_number: ctx.project_number,
        title,
        url: url.clone(),
        start_field: start_field.clone(),
        start_date: start_date.clone(),
        project_id: String::new(),
        project_title: ctx.project_title.clone(),
        item_id: item.id.clone(),
        content_id: content_id.clone(),
        repository: repository.clone(),
        start: DateField {
            field_name: start_field,
            field_id: None,
            date: start_date,
        },
        end: DateField::default(),
        focus: DateField::default(),
        iteration: iteration.clone(),
        status: SelectField {
            option_name: status_name.clone(),
            ..Default::default()
        },
        priority: SelectField {
            option_name: priority_name.clone(),
            ..Default::default()
        },
        people: PeopleField {
            field_id: None,
            user_ids: vec![],
            logins: people_logins.clone(),
        },
        assigned_to_me,
        created_by_me,
        labels: labels.clone(),
        updated_at: now,
        is_done,
        last_seen_at: now,
    };

    if date_fields.is_empty() {
        let title = if assigned_to_me || created_by_me { title } else { format!("{title} (unassigned)") };
        vec![base("(no date)".to_string(), String::new(), title)]
    } else {
        date_fields
            .into_iter()
            .map(|(field, date)| base(field, date, title.clone()))
            .collect()
    }
}

/// A placeholder row for a project target that produced no rows at all,
/// so the project still appears in the UI with guidance on how to widen
/// the filter.
pub fn placeholder_row(ctx: &ExtractContext) -> Task {
    let now = Utc::now();
    Task {
        owner_type: ctx.owner_type,
        owner: ctx.owner.clone(),
        project_number: ctx.project_number,
        title: "(no assigned items) - widen the filter to see unassigned items".to_string(),
        url: String::new(),
        start_field: "(none)".to_string(),
        start_date: String::new(),
        project_id: String::new(),
        project_title: ctx.project_title.clone(),
        item_id: String::new(),
        content_id: String::new(),
        repository: String::new(),
        start: DateField::default(),
        end: DateField::default(),
        focus: DateField::default(),
        iteration: IterationField::default(),
        status: SelectField::default(),
        priority: SelectField::default(),
        people: PeopleField::default(),
        assigned_to_me: false,
        created_by_me: false,
        labels: vec![],
        updated_at: now,
        is_done: false,
        last_seen_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_remote::{Login, NodesOf, RepoRef};

    fn make_ctx(re: &Regex) -> ExtractContext<'_> {
        ExtractContext {
            owner_type: OwnerType::Org,
            owner: "acme".into(),
            project_number: 1,
            project_title: "Roadmap".into(),
            date_field_regex: re,
            iteration_field_regex: None,
            me: "octocat",
            include_unassigned: false,
        }
    }

    fn issue_item(login: &str) -> ItemNode {
        issue_item_authored_by(login, None)
    }

    fn issue_item_authored_by(login: &str, author: Option<&str>) -> ItemNode {
        ItemNode {
            id: "PVTI_1".into(),
            content: Some(ItemContent::Issue {
                id: "I_1".into(),
                title: "Fix the thing".into(),
                url: "https://github.com/acme/widgets/issues/1".into(),
                repository: RepoRef { name_with_owner: "acme/widgets".into() },
                assignees: NodesOf { nodes: vec![Login { login: login.into() }] },
                author: author.map(|a| Login { login: a.into() }),
                labels: None,
            }),
            field_values: NodesOf { nodes: vec![] },
        }
    }

    #[test]
    fn unassigned_item_is_excluded_by_default() {
        let re = Regex::new("(?i)target date").unwrap();
        let ctx = make_ctx(&re);
        let item = issue_item("someone-else");
        assert!(extract_rows(&item, &ctx).is_empty());
    }

    #[test]
    fn assigned_item_without_date_gets_one_neutral_row() {
        let re = Regex::new("(?i)target date").unwrap();
        let ctx = make_ctx(&re);
        let item = issue_item("octocat");
        let rows = extract_rows(&item, &ctx);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].start_field, "(no date)");
        assert_eq!(rows[0].start_date, "");
    }

    #[test]
    fn item_authored_by_me_but_assigned_elsewhere_is_kept() {
        let re = Regex::new("(?i)target date").unwrap();
        let ctx = make_ctx(&re);
        let item = issue_item_authored_by("someone-else", Some("octocat"));
        let rows = extract_rows(&item, &ctx);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].created_by_me);
        assert!(!rows[0].assigned_to_me);
        assert!(!rows[0].title.contains("(unassigned)"));
    }
}
