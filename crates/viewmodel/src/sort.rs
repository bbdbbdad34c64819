// crates/viewmodel/src/sort.rs
//! Sort orders for the browse view. Sorting is stable so ties fall back
//! to the row's prior relative order (e.g. however `load()` returned it).

use taskboard_types::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Empty dates sort last; otherwise ascending by `start_date`.
    #[default]
    Date,
    Title,
    Project,
    Status,
}

pub(crate) fn sort_rows(rows: &mut [&Task], key: SortKey) {
    match key {
        SortKey::Date => rows.sort_by(|a, b| date_rank(&a.start_date).cmp(&date_rank(&b.start_date))),
        SortKey::Title => rows.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortKey::Project => rows.sort_by(|a, b| a.project_title.cmp(&b.project_title)),
        SortKey::Status => rows.sort_by(|a, b| a.status.option_name.cmp(&b.status.option_name)),
    }
}

/// Empty dates sort after every real date; real dates compare lexically
/// (valid since they're always `YYYY-MM-DD`, which sorts chronologically).
fn date_rank(date: &str) -> (u8, &str) {
    if date.is_empty() {
        (1, "")
    } else {
        (0, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_types::{DateField, IterationField, OwnerType, PeopleField, SelectField};

    fn task(url: &str, title: &str, start_date: &str) -> Task {
        Task {
            owner_type: OwnerType::Org,
            owner: "acme".into(),
            project_number: 1,
            title: title.into(),
            url: url.into(),
            start_field: String::new(),
            start_date: start_date.into(),
            project_id: String::new(),
            project_title: String::new(),
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
            assigned_to_me: true,
            created_by_me: false,
            labels: vec![],
            updated_at: chrono::Utc::now(),
            is_done: false,
            last_seen_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn dateless_rows_sort_after_dated_rows() {
        let t1 = task("https://x/1", "b", "");
        let t2 = task("https://x/2", "a", "2026-03-01");
        let mut rows: Vec<&Task> = vec![&t1, &t2];
        sort_rows(&mut rows, SortKey::Date);
        assert_eq!(rows[0].url, "https://x/2");
        assert_eq!(rows[1].url, "https://x/1");
    }

    #[test]
    fn title_sort_is_case_insensitive() {
        let t1 = task("https://x/1", "banana", "");
        let t2 = task("https://x/2", "Apple", "");
        let mut rows: Vec<&Task> = vec![&t1, &t2];
        sort_rows(&mut rows, SortKey::Title);
        assert_eq!(rows[0].url, "https://x/2");
    }
}
