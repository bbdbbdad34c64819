// crates/viewmodel/src/lib.rs
//! The view-model (spec.md §4 "View-model (C6)"): pure filtering, sorting
//! and current-selection state layered over the in-memory row set the
//! edit coordinator hands back from `snapshot()`.
//!
//! Kept dependency-light (types + chrono only), grounded on the teacher's
//! type-safe filter enums (`taskboard_core`'s `branch_filter` module in
//! the original tree) generalized from a single-dimension filter to the
//! multi-dimension set spec.md §2 C6 names.

mod filter;
mod sort;

pub use filter::{Filters, IterationMode};
pub use sort::SortKey;

use chrono::NaiveDate;
use taskboard_types::Task;

/// Applies `filters`, then sorts by `sort_key`, returning the rows the
/// browse view should render. Pure function over a borrowed row set —
/// the edit coordinator remains the only writer.
pub fn visible_rows<'a>(tasks: &'a [Task], filters: &Filters, today: NaiveDate, sort_key: SortKey) -> Vec<&'a Task> {
    let mut rows: Vec<&Task> = tasks.iter().filter(|t| filters.matches(t, today)).collect();
    sort::sort_rows(&mut rows, sort_key);
    rows
}

/// Tracks which row (by URL) is selected in the browse view, re-deriving
/// a valid index whenever the visible set changes shape.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected_url: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_url(&self) -> Option<&str> {
        self.selected_url.as_deref()
    }

    pub fn select(&mut self, url: impl Into<String>) {
        self.selected_url = Some(url.into());
    }

    pub fn clear(&mut self) {
        self.selected_url = None;
    }

    /// Index of the selected row within `rows`, or `None` if the
    /// selection doesn't (or no longer) appear in the visible set.
    pub fn index_in(&self, rows: &[&Task]) -> Option<usize> {
        let url = self.selected_url.as_deref()?;
        rows.iter().position(|t| t.url == url)
    }

    /// Move the selection to the next/previous row in `rows`, wrapping.
    /// If nothing is currently selected (or the prior selection fell out
    /// of the visible set), selects the first row.
    pub fn move_by(&mut self, rows: &[&Task], delta: isize) {
        if rows.is_empty() {
            self.selected_url = None;
            return;
        }
        let current = self.index_in(rows).unwrap_or(0) as isize;
        let len = rows.len() as isize;
        let next = ((current + delta) % len + len) % len;
        self.selected_url = Some(rows[next as usize].url.clone());
    }

    /// Drop the selection if it no longer resolves within `rows`,
    /// selecting the first visible row instead. Call after a filter or
    /// sync changes what's visible.
    pub fn reconcile(&mut self, rows: &[&Task]) {
        if self.index_in(rows).is_none() {
            self.selected_url = rows.first().map(|t| t.url.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use taskboard_types::{DateField, IterationField, OwnerType, PeopleField, SelectField};

    fn task(url: &str, title: &str, start_date: &str, status: &str, assigned_to_me: bool) -> Task {
        Task {
            owner_type: OwnerType::Org,
            owner: "acme".into(),
            project_number: 1,
            title: title.into(),
            url: url.into(),
            start_field: "Target date".into(),
            start_date: start_date.into(),
            project_id: "PVT_1".into(),
            project_title: "Roadmap".into(),
            item_id: "PVTI_1".into(),
            content_id: "I_1".into(),
            repository: "acme/widgets".into(),
            start: DateField { field_name: "Target date".into(), field_id: None, date: start_date.into() },
            end: DateField::default(),
            focus: DateField::default(),
            iteration: IterationField::default(),
            status: SelectField { option_name: status.into(), ..Default::default() },
            priority: SelectField::default(),
            people: PeopleField::default(),
            assigned_to_me,
            created_by_me: false,
            labels: vec![],
            updated_at: chrono::Utc::now(),
            is_done: taskboard_types::is_done_status(status),
            last_seen_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn hide_done_excludes_done_rows() {
        let rows = vec![
            task("https://x/1", "Open one", "2026-03-01", "Todo", true),
            task("https://x/2", "Closed one", "2026-03-01", "Done", true),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut filters = Filters::default();
        filters.hide_done = true;
        let visible = visible_rows(&rows, &filters, today, SortKey::Date);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].url, "https://x/1");
    }

    #[test]
    fn today_filter_keeps_only_rows_dated_today_or_dateless_past() {
        let rows = vec![
            task("https://x/1", "Today", "2026-03-01", "Todo", true),
            task("https://x/2", "Future", "2026-03-05", "Todo", true),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut filters = Filters::default();
        filters.today_only = true;
        let visible = visible_rows(&rows, &filters, today, SortKey::Date);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].url, "https://x/1");
    }

    #[test]
    fn search_matches_title_case_insensitively() {
        let rows = vec![
            task("https://x/1", "Fix the flaky test", "", "Todo", true),
            task("https://x/2", "Write docs", "", "Todo", true),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut filters = Filters::default();
        filters.search = Some("FLAKY".to_string());
        let visible = visible_rows(&rows, &filters, today, SortKey::Date);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].url, "https://x/1");
    }

    #[test]
    fn selection_move_by_wraps_around() {
        let t1 = task("https://x/1", "a", "", "Todo", true);
        let t2 = task("https://x/2", "b", "", "Todo", true);
        let rows: Vec<&Task> = vec![&t1, &t2];
        let mut sel = Selection::new();
        sel.select("https://x/2");
        sel.move_by(&rows, 1);
        assert_eq!(sel.selected_url(), Some("https://x/1"));
    }

    #[test]
    fn selection_reconciles_to_first_row_when_it_falls_out_of_view() {
        let t1 = task("https://x/1", "a", "", "Todo", true);
        let rows: Vec<&Task> = vec![&t1];
        let mut sel = Selection::new();
        sel.select("https://x/gone");
        sel.reconcile(&rows);
        assert_eq!(sel.selected_url(), Some("https://x/1"));
    }
}
