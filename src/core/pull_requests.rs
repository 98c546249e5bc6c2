use crate::core::service::{repository_name, CodeCommitService};
use crate::domain::model::{NewPullRequest, PullRequestDetails};
use crate::domain::ports::{CodeCommitApi, CreatePullRequestInput, PullRequestComment};
use crate::utils::error::Result;

const CONSOLE_URL: &str = "https://console.aws.amazon.com/codesuite/codecommit/repositories";

/// Console link to a pull request; formatted only, never checked.
pub fn pull_request_url(region: &str, repository: &str, pull_request_id: &str) -> String {
    format!(
        "{}/{}/pull-requests/{}/details?region={}",
        CONSOLE_URL, repository, pull_request_id, region
    )
}

fn default_description(source: &str, target: &str) -> String {
    format!("Merging changes from {} into {}", source, target)
}

impl<A: CodeCommitApi> CodeCommitService<A> {
    /// Opens a pull request and returns its console URL.
    ///
    /// CodeCommit has neither draft pull requests nor labels: `draft` is
    /// ignored and labels are posted as a `Labels: ...` comment, whose failure
    /// does not fail the call.
    pub async fn create_pr(&self, request: &NewPullRequest) -> Result<String> {
        let repository = repository_name(&request.repository);
        if request.draft {
            tracing::debug!(
                "Draft pull requests are not supported by CodeCommit; opening {} as ready",
                request.title
            );
        }

        let description = request
            .body
            .as_deref()
            .filter(|body| !body.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_description(&request.source_branch, &request.target_branch));

        let created = self
            .api()
            .create_pull_request(&CreatePullRequestInput {
                repository_name: repository.to_string(),
                title: request.title.clone(),
                description,
                source_reference: request.source_branch.clone(),
                destination_reference: request.target_branch.clone(),
            })
            .await?;

        tracing::info!(
            "Created pull request {} in {}",
            created.pull_request_id,
            repository
        );

        if !request.labels.is_empty() {
            self.post_labels(repository, &created, &request.labels).await;
        }

        Ok(pull_request_url(
            self.region(),
            repository,
            &created.pull_request_id,
        ))
    }

    async fn post_labels(&self, repository: &str, pull_request: &PullRequestDetails, labels: &[String]) {
        let commits = pull_request
            .first_target()
            .and_then(|target| Some((target.destination_commit.clone()?, target.source_commit.clone()?)));
        let Some((before_commit_id, after_commit_id)) = commits else {
            tracing::warn!(
                "Pull request {} reports no commits; labels not recorded",
                pull_request.pull_request_id
            );
            return;
        };

        let comment = PullRequestComment {
            pull_request_id: pull_request.pull_request_id.clone(),
            repository_name: repository.to_string(),
            before_commit_id,
            after_commit_id,
            content: format!("Labels: {}", labels.join(", ")),
        };
        if let Err(e) = self.api().post_comment_for_pull_request(&comment).await {
            tracing::warn!(
                "Failed to add labels to pull request {}: {}",
                pull_request.pull_request_id,
                e
            );
        }
    }

    /// Pull request ids are global in CodeCommit; `repository` is only used
    /// for logging.
    pub async fn get_pr_details(
        &self,
        repository: &str,
        pr_number: u64,
    ) -> Result<PullRequestDetails> {
        tracing::debug!("Fetching pull request {}#{}", repository, pr_number);
        Ok(self.api().get_pull_request(&pr_number.to_string()).await?)
    }

    /// An undeterminable state counts as open.
    pub async fn is_pr_open(&self, repository: &str, pr_number: u64) -> bool {
        match self.get_pr_details(repository, pr_number).await {
            Ok(details) => details.is_open().unwrap_or_else(|| {
                tracing::warn!(
                    "No status on pull request {}#{}; assuming it is open",
                    repository,
                    pr_number
                );
                true
            }),
            Err(e) => {
                tracing::warn!(
                    "Could not check pull request {}#{}: {}; assuming it is open",
                    repository,
                    pr_number,
                    e
                );
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        FixtureBranch, FixturePullRequest, FixtureRepository, InMemoryCodeCommit,
    };

    fn api() -> InMemoryCodeCommit {
        InMemoryCodeCommit::default().with_repository(
            FixtureRepository::new("service")
                .branch(FixtureBranch::new("main", "base1"))
                .branch(FixtureBranch::new("feature", "head1"))
                .pull_request(FixturePullRequest::open("1", "service", "Open one", "feature", "main")),
        )
    }

    fn request(labels: &[&str]) -> NewPullRequest {
        NewPullRequest {
            repository: "team/service".to_string(),
            source_branch: "feature".to_string(),
            target_branch: "main".to_string(),
            title: "Add feature".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pull_request_url() {
        assert_eq!(
            pull_request_url("eu-west-1", "service", "42"),
            "https://console.aws.amazon.com/codesuite/codecommit/repositories/service/pull-requests/42/details?region=eu-west-1"
        );
    }

    #[tokio::test]
    async fn test_create_pr_defaults_description_and_posts_labels() {
        let service = CodeCommitService::new(api(), "eu-west-1");

        let url = service.create_pr(&request(&["bug", "urgent"])).await.unwrap();
        assert!(url.ends_with("/repositories/service/pull-requests/2/details?region=eu-west-1"));

        let details = service.get_pr_details("service", 2).await.unwrap();
        assert_eq!(
            details.description.as_deref(),
            Some("Merging changes from feature into main")
        );

        let comments = service.api().posted_comments();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "Labels: bug, urgent");
        assert_eq!(comments[0].before_commit_id, "base1");
        assert_eq!(comments[0].after_commit_id, "head1");
    }

    #[tokio::test]
    async fn test_create_pr_survives_label_failure() {
        let service = CodeCommitService::new(
            api().fail_on("post_comment:2", "CommentContentSizeLimitExceededException"),
            "us-east-1",
        );

        let url = service.create_pr(&request(&["bug"])).await.unwrap();
        assert!(url.contains("/pull-requests/2/"));
        assert!(service.api().posted_comments().is_empty());
    }

    #[tokio::test]
    async fn test_create_pr_without_labels_posts_nothing() {
        let service = CodeCommitService::new(api(), "us-east-1");
        let mut request = request(&[]);
        request.body = Some("Explained".to_string());
        request.draft = true;

        service.create_pr(&request).await.unwrap();
        assert!(!service.api().calls().iter().any(|c| c.starts_with("post_comment")));
        let details = service.get_pr_details("service", 2).await.unwrap();
        assert_eq!(details.description.as_deref(), Some("Explained"));
    }

    #[tokio::test]
    async fn test_is_pr_open() {
        let mut closed = FixturePullRequest::open("2", "service", "Closed", "old", "main");
        closed.details.pull_request_status = Some("CLOSED".to_string());
        let mut unknown = FixturePullRequest::open("3", "service", "Unknown", "x", "main");
        unknown.details.pull_request_status = None;

        let service = CodeCommitService::new(
            InMemoryCodeCommit::default().with_repository(
                FixtureRepository::new("service")
                    .pull_request(FixturePullRequest::open("1", "service", "Open", "f", "main"))
                    .pull_request(closed)
                    .pull_request(unknown),
            ),
            "us-east-1",
        );

        assert!(service.is_pr_open("service", 1).await);
        assert!(!service.is_pr_open("service", 2).await);
        assert!(service.is_pr_open("service", 3).await);
        assert!(service.is_pr_open("service", 99).await);
    }
}
