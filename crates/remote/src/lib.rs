// crates/remote/src/lib.rs
//! GitHub Projects v2 GraphQL transport (spec.md §2 "Remote client",
//! §4.3 "Write-back").

mod client;
mod error;
mod operations;

pub use client::GraphQlClient;
pub use error::{RemoteError, RemoteResult};
pub use operations::{
    add_issue_comment, create_project_item, discover_open_projects, get_project_field_id_by_name,
    get_project_field_options, list_repo_assignees, list_repo_labels, operations_support,
    scan_project_page, set_issue_assignees, set_issue_labels, set_project_date,
    set_project_iteration, set_project_single_select, FieldValue, ItemContent, ItemNode, Login,
    NodesOf, PageInfo, ProjectPage, ProjectSummary, RepoRef,
};
