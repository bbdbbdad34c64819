// crates/remote/src/operations.rs
//! Typed wrappers around the GitHub Projects v2 GraphQL surface that the
//! sync engine and edit coordinator actually need. Each function owns its
//! own query text and response shape; nothing upstream touches raw JSON.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use taskboard_types::OwnerType;

use crate::client::GraphQlClient;
use crate::error::RemoteResult;

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSummary {
    pub number: i64,
    pub title: String,
    pub url: String,
    pub closed: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectsV2Nodes {
    nodes: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectsV2Owner {
    #[serde(rename = "projectsV2")]
    projects_v2: ProjectsV2Nodes,
}

#[derive(Debug, Clone, Deserialize)]
struct OrgProjectsData {
    organization: Option<ProjectsV2Owner>,
}

#[derive(Debug, Clone, Deserialize)]
struct UserProjectsData {
    user: Option<ProjectsV2Owner>,
}

const LIST_ORG_PROJECTS: &str = r#"
query($owner: String!) {
  organization(login: $owner) {
    projectsV2(first: 50, orderBy: { field: UPDATED_AT, direction: DESC }) {
      nodes { number title url closed }
    }
  }
}
"#;

const LIST_USER_PROJECTS: &str = r#"
query($owner: String!) {
  user(login: $owner) {
    projectsV2(first: 50, orderBy: { field: UPDATED_AT, direction: DESC }) {
      nodes { number title url closed }
    }
  }
}
"#;

/// List every open project under `owner`, used when a config project
/// source resolves to `numbers = "all"`.
pub async fn discover_open_projects(
    client: &GraphQlClient,
    owner_type: OwnerType,
    owner: &str,
) -> RemoteResult<Vec<ProjectSummary>> {
    let nodes = match owner_type {
        OwnerType::Org => {
            let data: OrgProjectsData = client
                .query(LIST_ORG_PROJECTS, json!({ "owner": owner }), |_, _| {})
                .await?;
            data.organization.map(|o| o.projects_v2.nodes).unwrap_or_default()
        }
        OwnerType::User => {
            let data: UserProjectsData = client
                .query(LIST_USER_PROJECTS, json!({ "owner": owner }), |_, _| {})
                .await?;
            data.user.map(|u| u.projects_v2.nodes).unwrap_or_default()
        }
    };
    Ok(nodes.into_iter().filter(|p| !p.closed).collect())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum ItemContent {
    DraftIssue {
        title: String,
    },
    Issue {
        id: String,
        title: String,
        url: String,
        repository: RepoRef,
        assignees: NodesOf<Login>,
        author: Option<Login>,
        labels: Option<NodesOf<LabelName>>,
    },
    PullRequest {
        id: String,
        title: String,
        url: String,
        repository: RepoRef,
        assignees: NodesOf<Login>,
        author: Option<Login>,
        labels: Option<NodesOf<LabelName>>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelName {
    pub name: String,
}

impl ItemContent {
    /// The Issue/PullRequest node id that label, assignee, and comment
    /// mutations act on. Draft issues support none of those, so this is
    /// `None` for them.
    pub fn content_id(&self) -> Option<&str> {
        match self {
            ItemContent::DraftIssue { .. } => None,
            ItemContent::Issue { id, .. } | ItemContent::PullRequest { id, .. } => Some(id.as_str()),
        }
    }

    pub fn author_login(&self) -> Option<&str> {
        match self {
            ItemContent::DraftIssue { .. } => None,
            ItemContent::Issue { author, .. } | ItemContent::PullRequest { author, .. } => {
                author.as_ref().map(|a| a.login.as_str())
            }
        }
    }

    pub fn labels(&self) -> Vec<String> {
        match self {
            ItemContent::DraftIssue { .. } => Vec::new(),
            ItemContent::Issue { labels, .. } | ItemContent::PullRequest { labels, .. } => labels
                .as_ref()
                .map(|l| l.nodes.iter().map(|n| n.name.clone()).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoRef {
    #[serde(rename = "nameWithOwner")]
    pub name_with_owner: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodesOf<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldCommon {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum FieldValue {
    ProjectV2ItemFieldDateValue { date: Option<String>, field: FieldCommon },
    ProjectV2ItemFieldUserValue { users: NodesOf<Login>, field: FieldCommon },
    ProjectV2ItemFieldSingleSelectValue { name: String, field: FieldCommon },
    ProjectV2ItemFieldIterationValue {
        title: String,
        #[serde(rename = "startDate")]
        start_date: String,
        duration: i64,
        field: FieldCommon,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemNode {
    pub id: String,
    pub content: Option<ItemContent>,
    #[serde(rename = "fieldValues")]
    pub field_values: NodesOf<FieldValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    #[serde(rename = "endCursor")]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectPage {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    pub nodes: Vec<ItemNode>,
}

#[derive(Debug, Clone, Deserialize)]
struct ItemsWrapper {
    items: ProjectPage,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectV2Wrapper {
    #[serde(rename = "projectV2")]
    project_v2: Option<ItemsWrapper>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScanOrgData {
    organization: Option<ProjectV2Wrapper>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScanUserData {
    user: Option<ProjectV2Wrapper>,
}

const SCAN_ORG_PROJECT: &str = r#"
query($owner: String!, $number: Int!, $after: String) {
  organization(login: $owner) {
    projectV2(number: $number) {
      items(first: 100, after: $after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          content {
            __typename
            ... on DraftIssue { title }
            ... on Issue { id title url repository { nameWithOwner } assignees(first: 50) { nodes { login } } author { login } labels(first: 20) { nodes { name } } }
            ... on PullRequest { id title url repository { nameWithOwner } assignees(first: 50) { nodes { login } } author { login } labels(first: 20) { nodes { name } } }
          }
          fieldValues(first: 50) {
            nodes {
              __typename
              ... on ProjectV2ItemFieldDateValue { date field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldUserValue { users(first: 50) { nodes { login } } field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldSingleSelectValue { name field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldIterationValue { title startDate duration field { ... on ProjectV2FieldCommon { name } } }
            }
          }
        }
      }
    }
  }
}
"#;

const SCAN_USER_PROJECT: &str = r#"
query($owner: String!, $number: Int!, $after: String) {
  user(login: $owner) {
    projectV2(number: $number) {
      items(first: 100, after: $after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          content {
            __typename
            ... on DraftIssue { title }
            ... on Issue { id title url repository { nameWithOwner } assignees(first: 50) { nodes { login } } author { login } labels(first: 20) { nodes { name } } }
            ... on PullRequest { id title url repository { nameWithOwner } assignees(first: 50) { nodes { login } } author { login } labels(first: 20) { nodes { name } } }
          }
          fieldValues(first: 50) {
            nodes {
              __typename
              ... on ProjectV2ItemFieldDateValue { date field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldUserValue { users(first: 50) { nodes { login } } field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldSingleSelectValue { name field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldIterationValue { title startDate duration field { ... on ProjectV2FieldCommon { name } } }
            }
          }
        }
      }
    }
  }
}
"#;

/// Fetch one page of project items, following `after` for pagination.
pub async fn scan_project_page(
    client: &GraphQlClient,
    owner_type: OwnerType,
    owner: &str,
    number: i64,
    after: Option<&str>,
    on_wait: impl FnMut(u32, Duration),
) -> RemoteResult<ProjectPage> {
    let vars = json!({ "owner": owner, "number": number, "after": after });
    let page = match owner_type {
        OwnerType::Org => {
            let data: ScanOrgData = client.query(SCAN_ORG_PROJECT, vars, on_wait).await?;
            data.organization.and_then(|o| o.project_v2).map(|p| p.items)
        }
        OwnerType::User => {
            let data: ScanUserData = client.query(SCAN_USER_PROJECT, vars, on_wait).await?;
            data.user.and_then(|u| u.project_v2).map(|p| p.items)
        }
    };
    Ok(page.unwrap_or(ProjectPage {
        page_info: PageInfo { has_next_page: false, end_cursor: None },
        nodes: vec![],
    }))
}

#[derive(Debug, Clone, Deserialize)]
struct FieldOptionsField {
    id: String,
    name: String,
    options: Option<Vec<crate::operations_support::OptionNode>>,
}

pub mod operations_support {
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize)]
    pub struct OptionNode {
        pub id: String,
        pub name: String,
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FieldsWrapper {
    nodes: Vec<FieldOptionsField>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectFieldsWrapper {
    fields: FieldsWrapper,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectFieldsData {
    node: Option<ProjectFieldsWrapper>,
}

const GET_PROJECT_FIELDS: &str = r#"
query($projectId: ID!) {
  node(id: $projectId) {
    ... on ProjectV2 {
      fields(first: 50) {
        nodes {
          ... on ProjectV2FieldCommon { id name }
          ... on ProjectV2SingleSelectField { id name options { id name } }
        }
      }
    }
  }
}
"#;

/// Resolve a project field's id by its display name (labels, assignees
/// and dates are mutated by field id, not name).
pub async fn get_project_field_id_by_name(
    client: &GraphQlClient,
    project_id: &str,
    field_name: &str,
) -> RemoteResult<Option<String>> {
    let data: ProjectFieldsData = client
        .query(GET_PROJECT_FIELDS, json!({ "projectId": project_id }), |_, _| {})
        .await?;
    Ok(data
        .node
        .into_iter()
        .flat_map(|n| n.fields.nodes)
        .find(|f| f.name.eq_ignore_ascii_case(field_name))
        .map(|f| f.id))
}

/// Fetch the option list for a single-select or iteration field.
pub async fn get_project_field_options(
    client: &GraphQlClient,
    project_id: &str,
    field_id: &str,
) -> RemoteResult<Vec<operations_support::OptionNode>> {
    let data: ProjectFieldsData = client
        .query(GET_PROJECT_FIELDS, json!({ "projectId": project_id }), |_, _| {})
        .await?;
    Ok(data
        .node
        .into_iter()
        .flat_map(|n| n.fields.nodes)
        .find(|f| f.id == field_id)
        .and_then(|f| f.options)
        .unwrap_or_default())
}

const SET_SINGLE_SELECT: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $optionId: String!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $projectId, itemId: $itemId, fieldId: $fieldId,
    value: { singleSelectOptionId: $optionId }
  }) { projectV2Item { id } }
}
"#;

pub async fn set_project_single_select(
    client: &GraphQlClient,
    project_id: &str,
    item_id: &str,
    field_id: &str,
    option_id: &str,
) -> RemoteResult<()> {
    let _: serde_json::Value = client
        .query(
            SET_SINGLE_SELECT,
            json!({
                "projectId": project_id,
                "itemId": item_id,
                "fieldId": field_id,
                "optionId": option_id,
            }),
            |_, _| {},
        )
        .await?;
    Ok(())
}

const SET_DATE: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $date: Date!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $projectId, itemId: $itemId, fieldId: $fieldId,
    value: { date: $date }
  }) { projectV2Item { id } }
}
"#;

pub async fn set_project_date(
    client: &GraphQlClient,
    project_id: &str,
    item_id: &str,
    field_id: &str,
    date: &str,
) -> RemoteResult<()> {
    let _: serde_json::Value = client
        .query(
            SET_DATE,
            json!({ "projectId": project_id, "itemId": item_id, "fieldId": field_id, "date": date }),
            |_, _| {},
        )
        .await?;
    Ok(())
}

const SET_ITERATION: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $iterationId: String!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $projectId, itemId: $itemId, fieldId: $fieldId,
    value: { iterationId: $iterationId }
  }) { projectV2Item { id } }
}
"#;

pub async fn set_project_iteration(
    client: &GraphQlClient,
    project_id: &str,
    item_id: &str,
    field_id: &str,
    iteration_id: &str,
) -> RemoteResult<()> {
    let _: serde_json::Value = client
        .query(
            SET_ITERATION,
            json!({
                "projectId": project_id,
                "itemId": item_id,
                "fieldId": field_id,
                "iterationId": iteration_id,
            }),
            |_, _| {},
        )
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
struct LabelNode {
    id: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelsData {
    repository: Option<RepoLabels>,
}

#[derive(Debug, Clone, Deserialize)]
struct RepoLabels {
    labels: NodesOf<LabelNode>,
}

const LIST_REPO_LABELS: &str = r#"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    labels(first: 100) { nodes { id name } }
  }
}
"#;

pub async fn list_repo_labels(
    client: &GraphQlClient,
    owner: &str,
    name: &str,
) -> RemoteResult<Vec<(String, String)>> {
    let data: LabelsData = client
        .query(LIST_REPO_LABELS, json!({ "owner": owner, "name": name }), |_, _| {})
        .await?;
    Ok(data
        .repository
        .map(|r| r.labels.nodes.into_iter().map(|n| (n.id, n.name)).collect())
        .unwrap_or_default())
}

const LIST_REPO_ASSIGNABLE: &str = r#"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    assignableUsers(first: 100) { nodes { id login } }
  }
}
"#;

#[derive(Debug, Clone, Deserialize)]
struct AssignableUser {
    id: String,
    login: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AssignableData {
    repository: Option<RepoAssignable>,
}

#[derive(Debug, Clone, Deserialize)]
struct RepoAssignable {
    #[serde(rename = "assignableUsers")]
    assignable_users: NodesOf<AssignableUser>,
}

/// `(node id, login)` pairs, mirroring `list_repo_labels`'s shape — the
/// id is what the assignee mutation actually needs, the login is what a
/// human picks from.
pub async fn list_repo_assignees(
    client: &GraphQlClient,
    owner: &str,
    name: &str,
) -> RemoteResult<Vec<(String, String)>> {
    let data: AssignableData = client
        .query(LIST_REPO_ASSIGNABLE, json!({ "owner": owner, "name": name }), |_, _| {})
        .await?;
    Ok(data
        .repository
        .map(|r| r.assignable_users.nodes.into_iter().map(|u| (u.id, u.login)).collect())
        .unwrap_or_default())
}

const SET_ISSUE_LABELS: &str = r#"
mutation($labelableId: ID!, $labelIds: [ID!]!) {
  updateIssue: addLabelsToLabelable(input: { labelableId: $labelableId, labelIds: $labelIds }) {
    clientMutationId
  }
}
"#;

pub async fn set_issue_labels(
    client: &GraphQlClient,
    content_id: &str,
    label_ids: &[String],
) -> RemoteResult<()> {
    let _: serde_json::Value = client
        .query(
            SET_ISSUE_LABELS,
            json!({ "labelableId": content_id, "labelIds": label_ids }),
            |_, _| {},
        )
        .await?;
    Ok(())
}

const SET_ISSUE_ASSIGNEES: &str = r#"
mutation($assignableId: ID!, $assigneeIds: [ID!]!) {
  replaceActorsForAssignable(input: { assignableId: $assignableId, actorIds: $assigneeIds }) {
    clientMutationId
  }
}
"#;

pub async fn set_issue_assignees(
    client: &GraphQlClient,
    content_id: &str,
    assignee_ids: &[String],
) -> RemoteResult<()> {
    let _: serde_json::Value = client
        .query(
            SET_ISSUE_ASSIGNEES,
            json!({ "assignableId": content_id, "assigneeIds": assignee_ids }),
            |_, _| {},
        )
        .await?;
    Ok(())
}

const ADD_COMMENT: &str = r#"
mutation($subjectId: ID!, $body: String!) {
  addComment(input: { subjectId: $subjectId, body: $body }) { clientMutationId }
}
"#;

pub async fn add_issue_comment(
    client: &GraphQlClient,
    content_id: &str,
    body: &str,
) -> RemoteResult<()> {
    let _: serde_json::Value = client
        .query(ADD_COMMENT, json!({ "subjectId": content_id, "body": body }), |_, _| {})
        .await?;
    Ok(())
}

const CREATE_DRAFT_ITEM: &str = r#"
mutation($projectId: ID!, $title: String!, $assigneeIds: [ID!]) {
  addProjectV2DraftIssue(input: { projectId: $projectId, title: $title, assigneeIds: $assigneeIds }) {
    projectItem { id }
  }
}
"#;

#[derive(Debug, Clone, Deserialize)]
struct DraftItemNode {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DraftIssuePayload {
    #[serde(rename = "projectItem")]
    project_item: DraftItemNode,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateDraftItemData {
    #[serde(rename = "addProjectV2DraftIssue")]
    add_project_v2_draft_issue: DraftIssuePayload,
}

/// Create a draft project item and return the new `ProjectV2Item` node
/// id, so the caller can build a `Task` row around it. `assignee_ids` may
/// be empty — a draft issue with no assignees is valid.
pub async fn create_project_item(
    client: &GraphQlClient,
    project_id: &str,
    title: &str,
    assignee_ids: &[String],
) -> RemoteResult<String> {
    let data: CreateDraftItemData = client
        .query(
            CREATE_DRAFT_ITEM,
            json!({ "projectId": project_id, "title": title, "assigneeIds": assignee_ids }),
            |_, _| {},
        )
        .await?;
    Ok(data.add_project_v2_draft_issue.project_item.id)
}
