// crates/sync/src/engine.rs
//! Orchestrates one full sync run: resolve targets, page through each
//! project, extract rows, and persist them (spec.md §4 "Sync engine").

use taskboard_core::{paths, Config, ResolvedNumbers};
use taskboard_db::Database;
use taskboard_remote::{discover_open_projects, scan_project_page, GraphQlClient};
use taskboard_types::{OwnerType, Task};

use crate::discovery_cache;
use crate::error::SyncResult;
use crate::extract::{extract_rows, placeholder_row, ExtractContext};

#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub owner_type: OwnerType,
    pub owner: String,
    pub number: i64,
    pub project_title: String,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub rows: Vec<Task>,
    pub inserted: usize,
    pub updated: usize,
    /// True when the run stopped early (e.g. backoff exhausted) and `rows`
    /// reflects only what was collected before giving up.
    pub partial: bool,
    pub message: Option<String>,
}

pub struct SyncEngine<'a> {
    client: &'a GraphQlClient,
    db: &'a Database,
    config: &'a Config,
}

impl<'a> SyncEngine<'a> {
    pub fn new(client: &'a GraphQlClient, db: &'a Database, config: &'a Config) -> Self {
        Self { client, db, config }
    }

    /// Resolve every configured project source into a concrete list of
    /// `(owner_type, owner, number)` targets, discovering `numbers =
    /// "all"` sources live and falling back to the on-disk discovery
    /// cache if the discovery call itself fails.
    pub async fn resolve_targets(&self) -> Vec<SyncTarget> {
        let mut targets = Vec::new();
        let cache_path = paths::discovery_cache_path();
        let mut cache = discovery_cache::load(&cache_path);

        for source in &self.config.projects {
            match &source.numbers {
                ResolvedNumbers::Explicit(numbers) => {
                    for &number in numbers {
                        targets.push(SyncTarget {
                            owner_type: source.owner_type,
                            owner: source.owner.clone(),
                            number,
                            project_title: String::new(),
                        });
                    }
                }
                ResolvedNumbers::All => {
                    match discover_open_projects(self.client, source.owner_type, &source.owner).await {
                        Ok(projects) => {
                            discovery_cache::upsert(&mut cache, &source.owner, &projects);
                            let _ = discovery_cache::save(&cache_path, &cache);
                            for p in projects {
                                targets.push(SyncTarget {
                                    owner_type: source.owner_type,
                                    owner: source.owner.clone(),
                                    number: p.number,
                                    project_title: p.title,
                                });
                            }
                        }
                        Err(_) => {
                            if let Some(entry) = cache.iter().find(|c| c.owner == source.owner) {
                                for p in &entry.projects {
                                    targets.push(SyncTarget {
                                        owner_type: source.owner_type,
                                        owner: source.owner.clone(),
                                        number: p.number,
                                        project_title: p.title.clone(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        targets
    }

    /// Run a full sync across every resolved target, reporting progress
    /// through `on_progress(done, total, status_line)`.
    pub async fn run(
        &self,
        include_unassigned: bool,
        mut on_progress: impl FnMut(usize, usize, &str),
    ) -> SyncResult<FetchResult> {
        let targets = self.resolve_targets().await;
        let total = targets.len();
        let mut rows: Vec<Task> = Vec::new();
        let mut partial = false;
        let mut message = None;

        for (done, target) in targets.iter().enumerate() {
            on_progress(done, total, &format!("Scanning {}:{} #{}", target.owner_type, target.owner, target.number));

            let mut after: Option<String> = None;
            let mut rows_for_target = 0usize;
            loop {
                let page = scan_project_page(
                    self.client,
                    target.owner_type,
                    &target.owner,
                    target.number,
                    after.as_deref(),
                    |attempt, delay| {
                        on_progress(
                            done,
                            total,
                            &format!("rate limited, retry {attempt} in {}s", delay.as_secs()),
                        );
                    },
                )
                .await;

                let page = match page {
                    Ok(page) => page,
                    Err(e) if e.is_project_not_found() => {
                        // spec.md §4.3 step 2 / §7 `ProjectNotFound`: skip
                        // just this target, the rest of the run continues.
                        // rows_for_target stays at whatever it was (usually 0
                        // since the target never paginated), so the
                        // zero-rows check below still emits the placeholder.
                        break;
                    }
                    Err(taskboard_remote::RemoteError::RateLimited { .. }) => {
                        partial = true;
                        message = Some("Rate limited; partial results".to_string());
                        break;
                    }
                    Err(e) => {
                        partial = true;
                        message = Some(format!("aborted scanning {}:{}: {e}", target.owner, target.number));
                        break;
                    }
                };

                let ctx = ExtractContext {
                    owner_type: target.owner_type,
                    owner: target.owner.clone(),
                    project_number: target.number,
                    project_title: target.project_title.clone(),
                    date_field_regex: &self.config.date_field_regex,
                    iteration_field_regex: self.config.iteration_field_regex.as_ref(),
                    me: &self.config.user,
                    include_unassigned,
                };

                for item in &page.nodes {
                    let extracted = extract_rows(item, &ctx);
                    rows_for_target += extracted.len();
                    rows.extend(extracted);
                }

                if page.page_info.has_next_page {
                    after = page.page_info.end_cursor;
                } else {
                    break;
                }
            }

            if partial {
                break;
            }

            if rows_for_target == 0 {
                let ctx = ExtractContext {
                    owner_type: target.owner_type,
                    owner: target.owner.clone(),
                    project_number: target.number,
                    project_title: target.project_title.clone(),
                    date_field_regex: &self.config.date_field_regex,
                    iteration_field_regex: self.config.iteration_field_regex.as_ref(),
                    me: &self.config.user,
                    include_unassigned,
                };
                rows.push(placeholder_row(&ctx));
            }
        }

        on_progress(total, total, "done");

        let (inserted, updated) = self.db.upsert_many(&rows).await?;

        Ok(FetchResult {
            rows,
            inserted,
            updated,
            partial,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_core::Config;
    use taskboard_remote::GraphQlClient;

    const CONFIG_TEXT: &str = r#"
user = "octocat"
date_field_regex = "(?i)target date"

[[projects]]
org = "acme"
numbers = [7]
"#;

    fn page_body(has_next: bool, end_cursor: Option<&str>, item_ids: &[&str]) -> String {
        let nodes: Vec<String> = item_ids
            .iter()
            .map(|id| {
                format!(
                    r#"{{
                        "id": "{id}",
                        "content": {{
                            "__typename": "Issue",
                            "id": "CID_{id}",
                            "title": "Issue {id}",
                            "url": "https://github.com/acme/widgets/issues/{id}",
                            "repository": {{ "nameWithOwner": "acme/widgets" }},
                            "assignees": {{ "nodes": [{{ "login": "octocat" }}] }}
                        }},
                        "fieldValues": {{
                            "nodes": [
                                {{ "__typename": "ProjectV2ItemFieldDateValue", "date": "2026-02-01", "field": {{ "name": "Target date" }} }}
                            ]
                        }}
                    }}"#
                )
            })
            .collect();
        format!(
            r#"{{"data": {{"organization": {{"projectV2": {{"items": {{
                "pageInfo": {{"hasNextPage": {has_next}, "endCursor": {cursor}}},
                "nodes": [{nodes}]
            }}}}}}}}}}"#,
            has_next = has_next,
            cursor = end_cursor.map(|c| format!("\"{c}\"")).unwrap_or_else(|| "null".into()),
            nodes = nodes.join(","),
        )
    }

    #[tokio::test]
    async fn paginated_fetch_collects_every_page_and_is_not_partial() {
        let mut server = mockito::Server::new_async().await;
        let _m1 = server
            .mock("POST", "/")
            .match_body(mockito::Matcher::Regex("\"after\":null".to_string()))
            .with_status(200)
            .with_body(page_body(true, Some("c1"), &["1", "2"]))
            .create_async()
            .await;
        let _m2 = server
            .mock("POST", "/")
            .match_body(mockito::Matcher::Regex("\"after\":\"c1\"".to_string()))
            .with_status(200)
            .with_body(page_body(false, None, &["3", "4"]))
            .create_async()
            .await;

        let config = Config::parse(CONFIG_TEXT).unwrap();
        let client = GraphQlClient::with_endpoint("tok", server.url());
        let db = taskboard_db::Database::new_in_memory().await.unwrap();
        let engine = SyncEngine::new(&client, &db, &config);

        let result = engine.run(false, |_, _, _| {}).await.unwrap();
        assert!(!result.partial);
        assert_eq!(result.rows.len(), 4);
        assert!(result.rows.iter().all(|r| r.start_date == "2026-02-01"));
    }

    #[tokio::test]
    async fn rate_limit_on_first_page_yields_partial_result() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"errors": [{"type": "RATE_LIMITED", "message": "slow down"}]}"#)
            .expect(5)
            .create_async()
            .await;

        let config = Config::parse(CONFIG_TEXT).unwrap();
        let client = GraphQlClient::with_endpoint("tok", server.url());
        let db = taskboard_db::Database::new_in_memory().await.unwrap();
        let engine = SyncEngine::new(&client, &db, &config);

        let result = engine.run(false, |_, _, _| {}).await.unwrap();
        assert!(result.partial);
        assert!(result.rows.is_empty());
        assert!(result.message.unwrap().contains("Rate limited"));
    }
}
