use crate::adapters::sdk::SdkCodeCommit;
use crate::config::ServiceConfig;
use crate::domain::model::{
    Branch, MicroagentContent, MicroagentResponse, NewPullRequest, PaginatedBranches,
    ProviderType, PullRequestDetails, Repository, SuggestedTask, User,
};
use crate::domain::ports::{CodeCommitApi, GitService};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use async_trait::async_trait;

/// AWS CodeCommit behind the provider-agnostic [`GitService`] interface.
///
/// Feature logic lives in the sibling modules (`branches`, `repos`,
/// `pull_requests`, `tasks`, `resolver`) as inherent methods; the trait impl
/// below only forwards to them.
pub struct CodeCommitService<A: CodeCommitApi> {
    api: A,
    region: String,
}

impl<A: CodeCommitApi> CodeCommitService<A> {
    pub fn new(api: A, region: impl Into<String>) -> Self {
        Self {
            api,
            region: region.into(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Lists repositories as an access probe.
    pub async fn verify_access(&self) -> Result<bool> {
        tracing::debug!("Verifying CodeCommit access in {}", self.region);
        self.api.list_repositories().await?;
        Ok(true)
    }

    pub async fn get_user(&self) -> Result<User> {
        let identity = self.api.get_caller_identity().await?;
        let login = login_from_arn(&identity.arn).to_string();

        Ok(User {
            id: identity.user_id,
            name: Some(login.clone()),
            login,
            avatar_url: String::new(),
            email: None,
            company: None,
        })
    }
}

impl CodeCommitService<SdkCodeCommit> {
    /// Builds the service over the AWS SDK. The SDK clients themselves are
    /// created on first use.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Using CodeCommit endpoint {}", config.base_url());
        let api = SdkCodeCommit::new(config)?;
        Ok(Self::new(api, config.region()))
    }
}

/// CodeCommit addresses repositories by bare name; `owner/name` keeps `name`.
pub fn repository_name(repository: &str) -> &str {
    repository.rsplit('/').next().unwrap_or(repository)
}

/// `arn:aws:iam::123:user/dev` gives `dev`; ARNs without a path give their
/// last `:` segment.
fn login_from_arn(arn: &str) -> &str {
    let tail = if arn.contains('/') {
        arn.rsplit('/').next()
    } else {
        arn.rsplit(':').next()
    };
    tail.unwrap_or(arn)
}

#[async_trait]
impl<A: CodeCommitApi> GitService for CodeCommitService<A> {
    fn provider(&self) -> ProviderType {
        ProviderType::CodeCommit
    }

    async fn verify_access(&self) -> Result<bool> {
        CodeCommitService::verify_access(self).await
    }

    async fn get_user(&self) -> Result<User> {
        CodeCommitService::get_user(self).await
    }

    async fn get_branches(&self, repository: &str) -> Result<Vec<Branch>> {
        CodeCommitService::get_branches(self, repository).await
    }

    async fn get_paginated_branches(
        &self,
        repository: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PaginatedBranches> {
        CodeCommitService::get_paginated_branches(self, repository, page, per_page).await
    }

    async fn get_default_branch(&self, repository: &str) -> Result<String> {
        CodeCommitService::get_default_branch(self, repository).await
    }

    async fn search_branches(
        &self,
        repository: &str,
        query: &str,
        per_page: u32,
    ) -> Result<Vec<Branch>> {
        CodeCommitService::search_branches(self, repository, query, per_page).await
    }

    async fn get_all_repositories(&self) -> Result<Vec<Repository>> {
        CodeCommitService::get_all_repositories(self).await
    }

    async fn get_paginated_repos(
        &self,
        page: u32,
        per_page: u32,
        query: Option<&str>,
    ) -> Result<Vec<Repository>> {
        CodeCommitService::get_paginated_repos(self, page, per_page, query).await
    }

    async fn search_repositories(&self, query: &str, per_page: u32) -> Result<Vec<Repository>> {
        CodeCommitService::search_repositories(self, query, per_page).await
    }

    async fn create_pr(&self, request: &NewPullRequest) -> Result<String> {
        CodeCommitService::create_pr(self, request).await
    }

    async fn get_pr_details(
        &self,
        repository: &str,
        pr_number: u64,
    ) -> Result<PullRequestDetails> {
        CodeCommitService::get_pr_details(self, repository, pr_number).await
    }

    async fn is_pr_open(&self, repository: &str, pr_number: u64) -> bool {
        CodeCommitService::is_pr_open(self, repository, pr_number).await
    }

    async fn get_suggested_tasks(&self) -> Result<Vec<SuggestedTask>> {
        CodeCommitService::get_suggested_tasks(self).await
    }

    async fn get_microagents(&self, repository: &str) -> Result<Vec<MicroagentResponse>> {
        CodeCommitService::get_microagents(self, repository).await
    }

    async fn get_microagent_content(
        &self,
        repository: &str,
        path: &str,
    ) -> Result<MicroagentContent> {
        CodeCommitService::get_microagent_content(self, repository, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCodeCommit;
    use crate::domain::ports::CallerIdentity;
    use crate::utils::error::GitServiceError;

    #[test]
    fn test_repository_name() {
        assert_eq!(repository_name("team/service"), "service");
        assert_eq!(repository_name("service"), "service");
    }

    #[test]
    fn test_login_from_arn() {
        assert_eq!(login_from_arn("arn:aws:iam::123456789012:user/dev"), "dev");
        assert_eq!(
            login_from_arn("arn:aws:sts::123456789012:assumed-role/Admin/session"),
            "session"
        );
        assert_eq!(login_from_arn("arn:aws:iam::123456789012:root"), "root");
    }

    #[tokio::test]
    async fn test_get_user_from_caller_identity() {
        let api = InMemoryCodeCommit::default().with_caller(CallerIdentity {
            user_id: "AIDAEXAMPLE".to_string(),
            account: Some("123456789012".to_string()),
            arn: "arn:aws:iam::123456789012:user/dev".to_string(),
        });
        let service = CodeCommitService::new(api, "us-east-1");

        let user = service.get_user().await.unwrap();
        assert_eq!(user.id, "AIDAEXAMPLE");
        assert_eq!(user.login, "dev");
        assert_eq!(user.name.as_deref(), Some("dev"));
        assert!(user.avatar_url.is_empty());
        assert!(user.email.is_none());
    }

    #[tokio::test]
    async fn test_verify_access_maps_access_denied() {
        let api = InMemoryCodeCommit::default().fail_on("list_repositories", "AccessDeniedException");
        let service = CodeCommitService::new(api, "us-east-1");

        assert!(matches!(
            service.verify_access().await,
            Err(GitServiceError::Authentication(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_bad_token() {
        let config = ServiceConfig {
            token: Some(crate::config::SecretToken::new("not json")),
            ..Default::default()
        };
        assert!(matches!(
            CodeCommitService::<SdkCodeCommit>::from_config(&config),
            Err(GitServiceError::Authentication(_))
        ));
    }

    #[test]
    fn test_provider_is_codecommit() {
        let service = CodeCommitService::new(InMemoryCodeCommit::default(), "us-east-1");
        assert_eq!(service.provider(), ProviderType::CodeCommit);
    }
}
