use crate::domain::model::{
    Branch, MicroagentContent, MicroagentResponse, NewPullRequest, PaginatedBranches,
    ProviderType, PullRequestDetails, Repository, SuggestedTask, User,
};
use crate::utils::error::{ProviderResult, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMetadata {
    pub repository_name: String,
    pub repository_id: Option<String>,
    pub default_branch: Option<String>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub commit_id: String,
    pub committer_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequestInput {
    pub repository_name: String,
    pub title: String,
    pub description: String,
    pub source_reference: String,
    pub destination_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestComment {
    pub pull_request_id: String,
    pub repository_name: String,
    pub before_commit_id: String,
    pub after_commit_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerTestOutcome {
    pub successful_executions: Vec<String>,
    pub failed_executions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: String,
    pub account: Option<String>,
    pub arn: String,
}

/// The subset of the CodeCommit (and STS) control plane the service consumes.
///
/// Implementations report failures as [`ProviderError`](crate::utils::error::ProviderError)
/// carrying the provider's error code; translation into the service's error
/// taxonomy happens in the service, never here.
#[async_trait]
pub trait CodeCommitApi: Send + Sync {
    /// Names of every repository visible to the caller.
    async fn list_repositories(&self) -> ProviderResult<Vec<String>>;

    async fn get_repository(&self, repository: &str) -> ProviderResult<RepositoryMetadata>;

    /// Names of every branch in the repository.
    async fn list_branches(&self, repository: &str) -> ProviderResult<Vec<String>>;

    /// Head commit id of a branch.
    async fn get_branch(&self, repository: &str, branch: &str) -> ProviderResult<Option<String>>;

    async fn get_commit(&self, repository: &str, commit_id: &str) -> ProviderResult<CommitInfo>;

    /// Names of the approval-rule templates whose destination references
    /// cover `branch`.
    async fn approval_rule_templates_for_branch(
        &self,
        repository: &str,
        branch: &str,
    ) -> ProviderResult<Vec<String>>;

    async fn create_pull_request(
        &self,
        input: &CreatePullRequestInput,
    ) -> ProviderResult<PullRequestDetails>;

    async fn get_pull_request(&self, pull_request_id: &str) -> ProviderResult<PullRequestDetails>;

    /// Ids of the open pull requests of a repository.
    async fn list_open_pull_requests(&self, repository: &str) -> ProviderResult<Vec<String>>;

    /// The approval verdict for a revision, `None` when the provider gave none.
    async fn evaluate_pull_request_approval_rules(
        &self,
        pull_request_id: &str,
        revision_id: &str,
    ) -> ProviderResult<Option<bool>>;

    /// Number of comment threads on a pull request.
    async fn get_comments_for_pull_request(&self, pull_request_id: &str) -> ProviderResult<usize>;

    async fn post_comment_for_pull_request(&self, comment: &PullRequestComment)
        -> ProviderResult<()>;

    async fn test_repository_triggers(
        &self,
        repository: &str,
        source_reference: &str,
        destination_reference: &str,
    ) -> ProviderResult<TriggerTestOutcome>;

    async fn get_file(&self, repository: &str, path: &str) -> ProviderResult<Vec<u8>>;

    /// Absolute paths of the files directly inside `folder`.
    async fn get_folder(
        &self,
        repository: &str,
        folder: &str,
        commit_specifier: Option<&str>,
    ) -> ProviderResult<Vec<String>>;

    async fn get_caller_identity(&self) -> ProviderResult<CallerIdentity>;
}

/// Provider-agnostic Git hosting capability consumed by the agent platform.
#[async_trait]
pub trait GitService: Send + Sync {
    fn provider(&self) -> ProviderType;

    async fn verify_access(&self) -> Result<bool>;

    async fn get_user(&self) -> Result<User>;

    async fn get_branches(&self, repository: &str) -> Result<Vec<Branch>>;

    async fn get_paginated_branches(
        &self,
        repository: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PaginatedBranches>;

    async fn get_default_branch(&self, repository: &str) -> Result<String>;

    async fn search_branches(
        &self,
        repository: &str,
        query: &str,
        per_page: u32,
    ) -> Result<Vec<Branch>>;

    async fn get_all_repositories(&self) -> Result<Vec<Repository>>;

    async fn get_paginated_repos(
        &self,
        page: u32,
        per_page: u32,
        query: Option<&str>,
    ) -> Result<Vec<Repository>>;

    async fn search_repositories(&self, query: &str, per_page: u32) -> Result<Vec<Repository>>;

    /// Returns the URL of the new pull request.
    async fn create_pr(&self, request: &NewPullRequest) -> Result<String>;

    async fn get_pr_details(&self, repository: &str, pr_number: u64)
        -> Result<PullRequestDetails>;

    /// Never fails: an undeterminable state counts as open.
    async fn is_pr_open(&self, repository: &str, pr_number: u64) -> bool;

    async fn get_suggested_tasks(&self) -> Result<Vec<SuggestedTask>>;

    async fn get_microagents(&self, repository: &str) -> Result<Vec<MicroagentResponse>>;

    async fn get_microagent_content(&self, repository: &str, path: &str)
        -> Result<MicroagentContent>;
}
