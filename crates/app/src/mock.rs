// crates/app/src/mock.rs
//! `MOCK_FETCH=1` support (spec.md §6): bypasses the network entirely and
//! hands the sync path a small set of synthetic rows, so the app (and its
//! `--no-ui` summary) can be exercised without a token or network access.

use chrono::Utc;
use taskboard_core::{Config, ResolvedNumbers};
use taskboard_types::{DateField, IterationField, OwnerType, PeopleField, SelectField, Task};

/// Build one synthetic row per configured project target, alternating
/// between an open and a done task so `is_done` filtering has something
/// to exercise.
pub fn mock_rows(config: &Config) -> Vec<Task> {
    let now = Utc::now();
    let today = now.date_naive().format("%Y-%m-%d").to_string();
    let mut rows = Vec::new();

    for source in &config.projects {
        let numbers: Vec<i64> = match &source.numbers {
            ResolvedNumbers::Explicit(v) => v.clone(),
            ResolvedNumbers::All => vec![1],
        };
        for number in numbers {
            rows.push(mock_task(source.owner_type, &source.owner, number, 1, &today, "Todo", &config.user));
            rows.push(mock_task(source.owner_type, &source.owner, number, 2, &today, "Done", &config.user));
        }
    }
    rows
}

#[allow(clippy::too_many_arguments)]
fn mock_task(
    owner_type: OwnerType,
    owner: &str,
    project_number: i64,
    item_seq: i64,
    today: &str,
    status: &str,
    me: &str,
) -> Task {
    let now = Utc::now();
    let url = format!("https://github.com/{owner}/widgets/issues/{project_number}{item_seq}");
    Task {
        owner_type,
        owner: owner.to_string(),
        project_number,
        title: format!("Mock item #{item_seq} for {owner}/{project_number}"),
        url: url.clone(),
        start_field: "Target date".to_string(),
        start_date: today.to_string(),
        project_id: format!("PVT_mock_{owner}_{project_number}"),
        project_title: format!("{owner} project #{project_number}"),
        item_id: format!("PVTI_mock_{item_seq}"),
        content_id: format!("I_mock_{item_seq}"),
        repository: format!("{owner}/widgets"),
        start: DateField {
            field_name: "Target date".to_string(),
            field_id: Some(format!("PVTF_mock_date_{project_number}")),
            date: today.to_string(),
        },
        end: DateField::default(),
        focus: DateField::default(),
        iteration: IterationField::default(),
        status: SelectField {
            field_id: Some(format!("PVTF_mock_status_{project_number}")),
            option_id: Some(format!("opt_{status}")),
            option_name: status.to_string(),
            options: vec![],
            dirty: false,
            pending_option_id: None,
        },
        priority: SelectField::default(),
        people: PeopleField {
            field_id: None,
            user_ids: vec![],
            logins: vec![me.to_string()],
        },
        assigned_to_me: true,
        created_by_me: false,
        labels: vec!["mock".to_string()],
        updated_at: now,
        is_done: taskboard_types::is_done_status(status),
        last_seen_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_TEXT: &str = r#"
user = "octocat"
date_field_regex = "(?i)target date"

[[projects]]
org = "acme"
numbers = [7]
"#;

    #[test]
    fn mock_rows_produces_one_open_and_one_done_row_per_target() {
        let config = Config::parse(CONFIG_TEXT).unwrap();
        let rows = mock_rows(&config);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.is_done));
        assert!(rows.iter().any(|r| !r.is_done));
        assert!(rows.iter().all(|r| r.project_number == 7));
    }
}
