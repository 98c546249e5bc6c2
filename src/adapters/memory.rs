use crate::domain::model::{MergeMetadata, PullRequestDetails, PullRequestTarget};
use crate::domain::ports::{
    CallerIdentity, CodeCommitApi, CommitInfo, CreatePullRequestInput, PullRequestComment,
    RepositoryMetadata, TriggerTestOutcome,
};
use crate::utils::error::{
    GitServiceError, ProviderError, ProviderResult, Result, FILE_DOES_NOT_EXIST,
    FOLDER_DOES_NOT_EXIST,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const REPOSITORY_DOES_NOT_EXIST: &str = "RepositoryDoesNotExistException";
const BRANCH_DOES_NOT_EXIST: &str = "BranchDoesNotExistException";
const COMMIT_DOES_NOT_EXIST: &str = "CommitDoesNotExistException";
const PULL_REQUEST_DOES_NOT_EXIST: &str = "PullRequestDoesNotExistException";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub repositories: Vec<FixtureRepository>,
    #[serde(default)]
    pub caller: Option<CallerIdentity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureRepository {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub branches: Vec<FixtureBranch>,
    /// File path (no leading slash) to file content.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub pull_requests: Vec<FixturePullRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureBranch {
    pub name: String,
    pub commit_id: String,
    /// Raw git committer date, e.g. `"1484167798 -0800"`.
    #[serde(default)]
    pub committer_date: Option<String>,
    #[serde(default)]
    pub approval_rule_templates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturePullRequest {
    #[serde(flatten)]
    pub details: PullRequestDetails,
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub comments: usize,
    #[serde(default = "default_true")]
    pub mergeable: bool,
}

fn default_true() -> bool {
    true
}

impl FixtureRepository {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Some(format!("{}-id", name)),
            name,
            ..Default::default()
        }
    }

    pub fn default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }

    pub fn last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    pub fn branch(mut self, branch: FixtureBranch) -> Self {
        self.branches.push(branch);
        self
    }

    pub fn file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn pull_request(mut self, pull_request: FixturePullRequest) -> Self {
        self.pull_requests.push(pull_request);
        self
    }
}

impl FixtureBranch {
    pub fn new(name: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commit_id: commit_id.into(),
            ..Default::default()
        }
    }

    pub fn committed_at(mut self, raw_date: impl Into<String>) -> Self {
        self.committer_date = Some(raw_date.into());
        self
    }

    pub fn approval_rule_template(mut self, name: impl Into<String>) -> Self {
        self.approval_rule_templates.push(name.into());
        self
    }
}

impl FixturePullRequest {
    /// An open pull request from `source` into `destination` of `repository`.
    pub fn open(
        id: impl Into<String>,
        repository: &str,
        title: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            details: PullRequestDetails {
                revision_id: Some(format!("rev-{}", id)),
                pull_request_id: id,
                title: title.into(),
                pull_request_status: Some("OPEN".to_string()),
                pull_request_targets: vec![PullRequestTarget {
                    repository_name: repository.to_string(),
                    source_reference: source.into(),
                    destination_reference: destination.into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            approved: None,
            comments: 0,
            mergeable: true,
        }
    }

    pub fn approved(mut self, approved: bool) -> Self {
        self.approved = Some(approved);
        self
    }

    pub fn comments(mut self, comments: usize) -> Self {
        self.comments = comments;
        self
    }

    pub fn mergeable(mut self, mergeable: bool) -> Self {
        self.mergeable = mergeable;
        self
    }

    /// Marks the pull request closed by a merge.
    pub fn merged(mut self) -> Self {
        self.details.pull_request_status = Some("CLOSED".to_string());
        for target in &mut self.details.pull_request_targets {
            target.merge_metadata = Some(MergeMetadata {
                is_merged: true,
                ..Default::default()
            });
        }
        self
    }
}

#[derive(Default)]
struct State {
    fixture: Fixture,
    next_pull_request_id: u64,
    posted_comments: Vec<PullRequestComment>,
    calls: Vec<String>,
}

/// [`CodeCommitApi`] served from an in-memory [`Fixture`].
///
/// Every call is recorded as `"{operation}:{subject}"` (for example
/// `"get_branch:service/main"`), and [`fail_on`](Self::fail_on) makes the
/// call with that key fail with a provider error code.
#[derive(Default)]
pub struct InMemoryCodeCommit {
    state: Mutex<State>,
    failures: HashMap<String, ProviderError>,
}

impl InMemoryCodeCommit {
    pub fn new(fixture: Fixture) -> Self {
        let next_pull_request_id = fixture
            .repositories
            .iter()
            .flat_map(|repo| &repo.pull_requests)
            .filter_map(|pr| pr.details.pull_request_id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        Self {
            state: Mutex::new(State {
                fixture,
                next_pull_request_id,
                ..Default::default()
            }),
            failures: HashMap::new(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GitServiceError::IoError)?;
        let fixture: Fixture = serde_json::from_str(&content)?;
        Ok(Self::new(fixture))
    }

    pub fn with_repository(self, repository: FixtureRepository) -> Self {
        self.lock().fixture.repositories.push(repository);
        self.renumber()
    }

    pub fn with_caller(self, caller: CallerIdentity) -> Self {
        self.lock().fixture.caller = Some(caller);
        self
    }

    pub fn fail_on(mut self, call: impl Into<String>, code: &str) -> Self {
        let call = call.into();
        let message = format!("injected failure for {}", call);
        self.failures.insert(call, ProviderError::new(code, message));
        self
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn posted_comments(&self) -> Vec<PullRequestComment> {
        self.lock().posted_comments.clone()
    }

    fn renumber(self) -> Self {
        let fixture = std::mem::take(&mut self.lock().fixture);
        let failures = self.failures;
        let mut rebuilt = Self::new(fixture);
        rebuilt.failures = failures;
        rebuilt
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, call: String) -> ProviderResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        let failure = self.failures.get(&call).cloned();
        state.calls.push(call);
        match failure {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

fn find_repository<'a>(state: &'a State, name: &str) -> ProviderResult<&'a FixtureRepository> {
    state
        .fixture
        .repositories
        .iter()
        .find(|repo| repo.name == name)
        .ok_or_else(|| {
            ProviderError::new(
                REPOSITORY_DOES_NOT_EXIST,
                format!("{} does not exist", name),
            )
        })
}

fn find_pull_request<'a>(state: &'a State, id: &str) -> ProviderResult<&'a FixturePullRequest> {
    state
        .fixture
        .repositories
        .iter()
        .flat_map(|repo| &repo.pull_requests)
        .find(|pr| pr.details.pull_request_id == id)
        .ok_or_else(|| {
            ProviderError::new(
                PULL_REQUEST_DOES_NOT_EXIST,
                format!("Pull request {} does not exist", id),
            )
        })
}

#[async_trait]
impl CodeCommitApi for InMemoryCodeCommit {
    async fn list_repositories(&self) -> ProviderResult<Vec<String>> {
        let state = self.enter("list_repositories".to_string())?;
        Ok(state
            .fixture
            .repositories
            .iter()
            .map(|repo| repo.name.clone())
            .collect())
    }

    async fn get_repository(&self, repository: &str) -> ProviderResult<RepositoryMetadata> {
        let state = self.enter(format!("get_repository:{}", repository))?;
        let repo = find_repository(&state, repository)?;
        Ok(RepositoryMetadata {
            repository_name: repo.name.clone(),
            repository_id: repo.id.clone(),
            default_branch: repo.default_branch.clone(),
            last_modified_date: repo.last_modified,
        })
    }

    async fn list_branches(&self, repository: &str) -> ProviderResult<Vec<String>> {
        let state = self.enter(format!("list_branches:{}", repository))?;
        let repo = find_repository(&state, repository)?;
        Ok(repo.branches.iter().map(|b| b.name.clone()).collect())
    }

    async fn get_branch(&self, repository: &str, branch: &str) -> ProviderResult<Option<String>> {
        let state = self.enter(format!("get_branch:{}/{}", repository, branch))?;
        let repo = find_repository(&state, repository)?;
        repo.branches
            .iter()
            .find(|b| b.name == branch)
            .map(|b| Some(b.commit_id.clone()))
            .ok_or_else(|| {
                ProviderError::new(
                    BRANCH_DOES_NOT_EXIST,
                    format!("Branch {} does not exist", branch),
                )
            })
    }

    async fn get_commit(&self, repository: &str, commit_id: &str) -> ProviderResult<CommitInfo> {
        let state = self.enter(format!("get_commit:{}/{}", repository, commit_id))?;
        let repo = find_repository(&state, repository)?;
        repo.branches
            .iter()
            .find(|b| b.commit_id == commit_id)
            .map(|b| CommitInfo {
                commit_id: b.commit_id.clone(),
                committer_date: b
                    .committer_date
                    .as_deref()
                    .and_then(crate::utils::time::parse_git_date),
            })
            .ok_or_else(|| {
                ProviderError::new(
                    COMMIT_DOES_NOT_EXIST,
                    format!("Commit {} does not exist", commit_id),
                )
            })
    }

    async fn approval_rule_templates_for_branch(
        &self,
        repository: &str,
        branch: &str,
    ) -> ProviderResult<Vec<String>> {
        let state = self.enter(format!("approval_rule_templates:{}/{}", repository, branch))?;
        let repo = find_repository(&state, repository)?;
        Ok(repo
            .branches
            .iter()
            .find(|b| b.name == branch)
            .map(|b| b.approval_rule_templates.clone())
            .unwrap_or_default())
    }

    async fn create_pull_request(
        &self,
        input: &CreatePullRequestInput,
    ) -> ProviderResult<PullRequestDetails> {
        let mut state = self.enter(format!("create_pull_request:{}", input.repository_name))?;
        find_repository(&state, &input.repository_name)?;

        let commit_of = |state: &State, reference: &str| {
            find_repository(state, &input.repository_name)
                .ok()
                .and_then(|repo| repo.branches.iter().find(|b| b.name == reference))
                .map(|b| b.commit_id.clone())
        };
        let source_commit = commit_of(&*state, &input.source_reference);
        let destination_commit = commit_of(&*state, &input.destination_reference);

        let id = state.next_pull_request_id.to_string();
        state.next_pull_request_id += 1;

        let details = PullRequestDetails {
            revision_id: Some(format!("rev-{}", id)),
            pull_request_id: id,
            title: input.title.clone(),
            description: Some(input.description.clone()),
            pull_request_status: Some("OPEN".to_string()),
            creation_date: Some(Utc::now()),
            pull_request_targets: vec![PullRequestTarget {
                repository_name: input.repository_name.clone(),
                source_reference: input.source_reference.clone(),
                destination_reference: input.destination_reference.clone(),
                source_commit,
                destination_commit,
                merge_base: None,
                merge_metadata: None,
            }],
            ..Default::default()
        };

        let pull_request = FixturePullRequest {
            details: details.clone(),
            approved: None,
            comments: 0,
            mergeable: true,
        };
        if let Some(repo) = state
            .fixture
            .repositories
            .iter_mut()
            .find(|repo| repo.name == input.repository_name)
        {
            repo.pull_requests.push(pull_request);
        }

        Ok(details)
    }

    async fn get_pull_request(&self, pull_request_id: &str) -> ProviderResult<PullRequestDetails> {
        let state = self.enter(format!("get_pull_request:{}", pull_request_id))?;
        Ok(find_pull_request(&state, pull_request_id)?.details.clone())
    }

    async fn list_open_pull_requests(&self, repository: &str) -> ProviderResult<Vec<String>> {
        let state = self.enter(format!("list_pull_requests:{}", repository))?;
        let repo = find_repository(&state, repository)?;
        Ok(repo
            .pull_requests
            .iter()
            .filter(|pr| pr.details.is_open().unwrap_or(false))
            .map(|pr| pr.details.pull_request_id.clone())
            .collect())
    }

    async fn evaluate_pull_request_approval_rules(
        &self,
        pull_request_id: &str,
        _revision_id: &str,
    ) -> ProviderResult<Option<bool>> {
        let state = self.enter(format!("evaluate_approval_rules:{}", pull_request_id))?;
        Ok(find_pull_request(&state, pull_request_id)?.approved)
    }

    async fn get_comments_for_pull_request(&self, pull_request_id: &str) -> ProviderResult<usize> {
        let state = self.enter(format!("get_comments:{}", pull_request_id))?;
        let pull_request = find_pull_request(&state, pull_request_id)?;
        let posted = state
            .posted_comments
            .iter()
            .filter(|c| c.pull_request_id == pull_request_id)
            .count();
        Ok(pull_request.comments + posted)
    }

    async fn post_comment_for_pull_request(
        &self,
        comment: &PullRequestComment,
    ) -> ProviderResult<()> {
        let mut state = self.enter(format!("post_comment:{}", comment.pull_request_id))?;
        find_pull_request(&state, &comment.pull_request_id)?;
        state.posted_comments.push(comment.clone());
        Ok(())
    }

    async fn test_repository_triggers(
        &self,
        repository: &str,
        source_reference: &str,
        destination_reference: &str,
    ) -> ProviderResult<TriggerTestOutcome> {
        let state = self.enter(format!("test_triggers:{}", repository))?;
        let repo = find_repository(&state, repository)?;
        let mergeable = repo
            .pull_requests
            .iter()
            .filter_map(|pr| pr.details.first_target().map(|target| (pr, target)))
            .find(|(_, target)| {
                target.source_reference == source_reference
                    && target.destination_reference == destination_reference
            })
            .map(|(pr, _)| pr.mergeable)
            .unwrap_or(true);

        Ok(if mergeable {
            TriggerTestOutcome {
                successful_executions: vec!["test-merge".to_string()],
                failed_executions: Vec::new(),
            }
        } else {
            TriggerTestOutcome {
                successful_executions: Vec::new(),
                failed_executions: vec!["test-merge".to_string()],
            }
        })
    }

    async fn get_file(&self, repository: &str, path: &str) -> ProviderResult<Vec<u8>> {
        let state = self.enter(format!("get_file:{}/{}", repository, path))?;
        let repo = find_repository(&state, repository)?;
        repo.files
            .get(path.trim_start_matches('/'))
            .map(|content| content.as_bytes().to_vec())
            .ok_or_else(|| {
                ProviderError::new(
                    FILE_DOES_NOT_EXIST,
                    format!("The specified file does not exist: {}", path),
                )
            })
    }

    async fn get_folder(
        &self,
        repository: &str,
        folder: &str,
        _commit_specifier: Option<&str>,
    ) -> ProviderResult<Vec<String>> {
        let state = self.enter(format!("get_folder:{}/{}", repository, folder))?;
        let repo = find_repository(&state, repository)?;
        let prefix = format!("{}/", folder.trim_matches('/'));

        let mut exists = false;
        let mut files = Vec::new();
        for path in repo.files.keys() {
            if let Some(rest) = path.strip_prefix(&prefix) {
                exists = true;
                if !rest.contains('/') {
                    files.push(path.clone());
                }
            }
        }

        if !exists {
            return Err(ProviderError::new(
                FOLDER_DOES_NOT_EXIST,
                format!("The specified folder does not exist: {}", folder),
            ));
        }
        Ok(files)
    }

    async fn get_caller_identity(&self) -> ProviderResult<CallerIdentity> {
        let state = self.enter("get_caller_identity".to_string())?;
        state.fixture.caller.clone().ok_or_else(|| {
            ProviderError::new("AccessDenied", "no caller identity configured")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> InMemoryCodeCommit {
        InMemoryCodeCommit::default().with_repository(
            FixtureRepository::new("service")
                .branch(FixtureBranch::new("main", "c1"))
                .file("docs/a.md", "a")
                .file("docs/nested/b.md", "b")
                .pull_request(FixturePullRequest::open("7", "service", "Fix", "feature", "main")),
        )
    }

    #[test]
    fn test_records_calls_and_injects_failures() {
        let api = adapter().fail_on("get_branch:service/main", "ThrottlingException");

        let err = tokio_test::block_on(api.get_branch("service", "main")).unwrap_err();
        assert!(err.has_code("ThrottlingException"));
        assert_eq!(api.calls(), vec!["get_branch:service/main".to_string()]);
    }

    #[test]
    fn test_folder_listing_is_not_recursive() {
        let api = adapter();
        let files = tokio_test::block_on(api.get_folder("service", "docs", None)).unwrap();
        assert_eq!(files, vec!["docs/a.md".to_string()]);

        let err = tokio_test::block_on(api.get_folder("service", "missing", None)).unwrap_err();
        assert!(err.has_code(FOLDER_DOES_NOT_EXIST));
    }

    #[test]
    fn test_created_pull_requests_get_fresh_ids() {
        let api = adapter();
        let created = tokio_test::block_on(api.create_pull_request(&CreatePullRequestInput {
            repository_name: "service".to_string(),
            title: "New".to_string(),
            description: "body".to_string(),
            source_reference: "feature".to_string(),
            destination_reference: "main".to_string(),
        }))
        .unwrap();

        assert_eq!(created.pull_request_id, "8");
        assert_eq!(
            created.first_target().unwrap().destination_commit.as_deref(),
            Some("c1")
        );
        let open = tokio_test::block_on(api.list_open_pull_requests("service")).unwrap();
        assert_eq!(open, vec!["7".to_string(), "8".to_string()]);
    }

    #[test]
    fn test_fixture_from_json() {
        let json = r#"{
            "repositories": [{
                "name": "infra",
                "default_branch": "trunk",
                "branches": [{"name": "trunk", "commit_id": "abc", "committer_date": "1484167798 -0800"}],
                "pull_requests": [{"pullRequestId": "3", "title": "Bump", "pullRequestStatus": "OPEN", "approved": false}]
            }],
            "caller": {"user_id": "AIDA", "account": "123456789012", "arn": "arn:aws:iam::123456789012:user/dev"}
        }"#;
        let fixture: Fixture = serde_json::from_str(json).unwrap();
        let api = InMemoryCodeCommit::new(fixture);

        let pr = tokio_test::block_on(api.get_pull_request("3")).unwrap();
        assert_eq!(pr.title, "Bump");
        let approved =
            tokio_test::block_on(api.evaluate_pull_request_approval_rules("3", "rev")).unwrap();
        assert_eq!(approved, Some(false));
    }
}
