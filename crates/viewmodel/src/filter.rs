// crates/viewmodel/src/filter.rs
//! Filter dimensions over the row set (spec.md §2 C6). Each dimension is
//! independent and defaults to "no filtering"; `Filters::matches` is a
//! conjunction of every active dimension.

use chrono::{DateTime, NaiveDate, Utc};
use taskboard_types::Task;

/// Whether iteration-tagged items, non-iteration items, or both are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterationMode {
    #[default]
    All,
    WithIteration,
    WithoutIteration,
}

/// The full set of view-model filter toggles. All fields default to
/// "inactive" so `Filters::default()` shows every row.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// Only rows dated exactly `today`.
    pub today_only: bool,
    /// Only rows with no date set.
    pub no_date_only: bool,
    /// Exclude rows whose status maps to `is_done`.
    pub hide_done: bool,
    /// Only rows belonging to this project title, if set.
    pub project: Option<String>,
    /// Case-insensitive substring match against the title, if set.
    pub search: Option<String>,
    /// Exclude rows with a non-empty date later than this cutoff.
    pub date_max: Option<NaiveDate>,
    pub iteration_mode: IterationMode,
    /// When false, rows that are created-by-me but not assigned-to-me
    /// are hidden from the browse view (the sync engine still fetches
    /// them; this is a display-only toggle).
    pub include_created: bool,
    /// When false (the default), rows the most recent sync run didn't
    /// observe (`last_seen_at` older than `sync_epoch`) are hidden —
    /// they're tombstoned, not deleted. Toggling this on surfaces them.
    pub show_stale: bool,
    /// Cutoff set by the caller after each sync run completes. `None`
    /// (e.g. before the first sync) disables staleness filtering
    /// entirely, since every row is then "unverified" rather than stale.
    pub sync_epoch: Option<DateTime<Utc>>,
}

impl Filters {
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        if self.hide_done && task.is_done {
            return false;
        }

        if !self.show_stale {
            if let Some(epoch) = self.sync_epoch {
                if task.last_seen_at < epoch {
                    return false;
                }
            }
        }

        if !self.include_created && !task.assigned_to_me && task.created_by_me {
            return false;
        }

        if self.no_date_only && !task.start_date.is_empty() {
            return false;
        }

        if self.today_only {
            let Ok(date) = task.start_date.parse::<NaiveDate>() else {
                return false;
            };
            if date != today {
                return false;
            }
        }

        if let Some(max) = self.date_max {
            if let Ok(date) = task.start_date.parse::<NaiveDate>() {
                if date > max {
                    return false;
                }
            }
        }

        if let Some(project) = &self.project {
            if &task.project_title != project {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let title_hit = task.title.to_lowercase().contains(&needle);
            let repository_hit = task.repository.to_lowercase().contains(&needle);
            let label_hit = task.labels.iter().any(|l| l.to_lowercase().contains(&needle));
            if !title_hit && !repository_hit && !label_hit {
                return false;
            }
        }

        match self.iteration_mode {
            IterationMode::All => {}
            IterationMode::WithIteration => {
                if task.iteration.iteration_id.is_none() {
                    return false;
                }
            }
            IterationMode::WithoutIteration => {
                if task.iteration.iteration_id.is_some() {
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_types::{DateField, IterationField, OwnerType, PeopleField, SelectField};

    fn minimal(url: &str) -> Task {
        Task {
            owner_type: OwnerType::Org,
            owner: "acme".into(),
            project_number: 1,
            title: "t".into(),
            url: url.into(),
            start_field: String::new(),
            start_date: String::new(),
            project_id: String::new(),
            project_title: "Roadmap".into(),
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
    fn created_only_rows_hidden_unless_include_created_is_set() {
        let mut t = minimal("https://x/1");
        t.assigned_to_me = false;
        t.created_by_me = true;
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let filters = Filters::default();
        assert!(!filters.matches(&t, today));

        let mut filters = Filters::default();
        filters.include_created = true;
        assert!(filters.matches(&t, today));
    }

    #[test]
    fn date_max_excludes_rows_dated_after_the_cutoff() {
        let mut t = minimal("https://x/1");
        t.start_date = "2026-03-10".into();
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut filters = Filters::default();
        filters.date_max = Some(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        assert!(!filters.matches(&t, today));
    }

    #[test]
    fn iteration_mode_filters_by_presence_of_an_iteration_id() {
        let mut t = minimal("https://x/1");
        t.iteration.iteration_id = Some("IT_1".into());
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let mut without = Filters::default();
        without.iteration_mode = IterationMode::WithoutIteration;
        assert!(!without.matches(&t, today));

        let mut with = Filters::default();
        with.iteration_mode = IterationMode::WithIteration;
        assert!(with.matches(&t, today));
    }

    #[test]
    fn stale_rows_are_hidden_by_default_but_not_when_show_stale_is_set() {
        let mut t = minimal("https://x/1");
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let epoch = chrono::Utc::now();
        t.last_seen_at = epoch - chrono::Duration::hours(1);

        let mut filters = Filters::default();
        filters.sync_epoch = Some(epoch);
        assert!(!filters.matches(&t, today));

        filters.show_stale = true;
        assert!(filters.matches(&t, today));
    }

    #[test]
    fn no_sync_epoch_means_no_staleness_filtering() {
        let mut t = minimal("https://x/1");
        t.last_seen_at = chrono::Utc::now() - chrono::Duration::days(30);
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let filters = Filters::default();
        assert!(filters.matches(&t, today));
    }

    #[test]
    fn search_matches_repository_and_labels_as_well_as_title() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let mut by_repo = minimal("https://x/1");
        by_repo.repository = "acme/widgets".into();
        let mut repo_filter = Filters::default();
        repo_filter.search = Some("widgets".into());
        assert!(repo_filter.matches(&by_repo, today));

        let mut by_label = minimal("https://x/2");
        by_label.labels = vec!["urgent".into()];
        let mut label_filter = Filters::default();
        label_filter.search = Some("urgent".into());
        assert!(label_filter.matches(&by_label, today));

        let unrelated = minimal("https://x/3");
        assert!(!label_filter.matches(&unrelated, today));
    }
}
