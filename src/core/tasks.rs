use crate::core::service::CodeCommitService;
use crate::domain::model::{ProviderType, PullRequestDetails, SuggestedTask, TaskType};
use crate::domain::ports::CodeCommitApi;
use crate::utils::error::Result;

impl<A: CodeCommitApi> CodeCommitService<A> {
    /// Scans the open pull requests of every repository for work the user
    /// may want to pick up.
    ///
    /// Only the repository listing can fail the call. A repository whose pull
    /// requests cannot be listed, or a pull request whose details cannot be
    /// fetched, is skipped. Each signal is probed on its own, so one failing
    /// probe never hides the others.
    pub async fn get_suggested_tasks(&self) -> Result<Vec<SuggestedTask>> {
        let repositories = self.api().list_repositories().await?;
        let mut tasks = Vec::new();

        for repository in &repositories {
            let ids = match self.api().list_open_pull_requests(repository).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!("Error listing pull requests for {}: {}", repository, e);
                    continue;
                }
            };

            for id in &ids {
                let Ok(number) = id.parse::<u64>() else {
                    tracing::warn!("Skipping pull request with non-numeric id {}", id);
                    continue;
                };
                let details = match self.api().get_pull_request(id).await {
                    Ok(details) => details,
                    Err(e) => {
                        tracing::warn!("Error getting details for pull request {}: {}", id, e);
                        continue;
                    }
                };

                let task = |task_type| SuggestedTask {
                    git_provider: ProviderType::CodeCommit,
                    task_type,
                    repo: repository.clone(),
                    issue_number: number,
                    title: details.title.clone(),
                };

                if self.may_have_merge_conflicts(repository, &details).await {
                    tasks.push(task(TaskType::MergeConflicts));
                }
                if self.has_failing_checks(&details).await {
                    tasks.push(task(TaskType::FailingChecks));
                }
                if self.has_comments(&details).await {
                    tasks.push(task(TaskType::UnresolvedComments));
                }
            }
        }

        tracing::debug!("Found {} suggested tasks", tasks.len());
        Ok(tasks)
    }

    /// Test-fires a trigger between the pull request's references; no
    /// successful execution is read as a possible conflict.
    async fn may_have_merge_conflicts(&self, repository: &str, details: &PullRequestDetails) -> bool {
        if details.is_merged() {
            return false;
        }
        let Some(target) = details.first_target() else {
            tracing::debug!("Pull request {} has no target", details.pull_request_id);
            return false;
        };

        match self
            .api()
            .test_repository_triggers(
                repository,
                &target.source_reference,
                &target.destination_reference,
            )
            .await
        {
            Ok(outcome) => outcome.successful_executions.is_empty(),
            Err(e) => {
                tracing::warn!(
                    "Could not test merge of pull request {}: {}",
                    details.pull_request_id,
                    e
                );
                false
            }
        }
    }

    /// CodeCommit has no CI checks; unmet approval rules stand in for them.
    async fn has_failing_checks(&self, details: &PullRequestDetails) -> bool {
        let Some(revision_id) = details.revision_id.as_deref() else {
            return false;
        };

        match self
            .api()
            .evaluate_pull_request_approval_rules(&details.pull_request_id, revision_id)
            .await
        {
            Ok(approved) => !approved.unwrap_or(true),
            Err(e) => {
                tracing::warn!(
                    "Could not evaluate approval rules of pull request {}: {}",
                    details.pull_request_id,
                    e
                );
                false
            }
        }
    }

    // CodeCommit does not track resolution, so any comment counts.
    async fn has_comments(&self, details: &PullRequestDetails) -> bool {
        match self
            .api()
            .get_comments_for_pull_request(&details.pull_request_id)
            .await
        {
            Ok(count) => count > 0,
            Err(e) => {
                tracing::warn!(
                    "Could not read comments of pull request {}: {}",
                    details.pull_request_id,
                    e
                );
                false
            }
        }
    }
}
