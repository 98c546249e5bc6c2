use crate::core::pagination::{matches_query, page_window};
use crate::core::service::CodeCommitService;
use crate::domain::model::{OwnerType, ProviderType, Repository};
use crate::domain::ports::{CodeCommitApi, RepositoryMetadata};
use crate::utils::error::Result;
use crate::utils::time::format_timestamp;

impl<A: CodeCommitApi> CodeCommitService<A> {
    pub async fn get_all_repositories(&self) -> Result<Vec<Repository>> {
        let names = self.repository_names(None).await?;
        Ok(self.describe_repositories(&names).await)
    }

    pub async fn get_paginated_repos(
        &self,
        page: u32,
        per_page: u32,
        query: Option<&str>,
    ) -> Result<Vec<Repository>> {
        let names = self.repository_names(query).await?;
        let window = page_window(names.len(), page, per_page);
        Ok(self.describe_repositories(&names[window]).await)
    }

    /// First `per_page` repositories whose name contains `query`.
    pub async fn search_repositories(&self, query: &str, per_page: u32) -> Result<Vec<Repository>> {
        let names = self.repository_names(Some(query)).await?;
        let keep = names.len().min(per_page as usize);
        Ok(self.describe_repositories(&names[..keep]).await)
    }

    async fn repository_names(&self, query: Option<&str>) -> Result<Vec<String>> {
        let names = self.api().list_repositories().await?;
        Ok(match query {
            Some(query) => names
                .into_iter()
                .filter(|name| matches_query(name, query))
                .collect(),
            None => names,
        })
    }

    async fn describe_repositories(&self, names: &[String]) -> Vec<Repository> {
        let mut repositories = Vec::with_capacity(names.len());
        for name in names {
            match self.api().get_repository(name).await {
                Ok(metadata) => repositories.push(to_repository(metadata)),
                Err(e) => tracing::warn!("Skipping repository {}: {}", name, e),
            }
        }
        repositories
    }
}

fn to_repository(metadata: RepositoryMetadata) -> Repository {
    Repository {
        id: metadata
            .repository_id
            .unwrap_or_else(|| metadata.repository_name.clone()),
        full_name: metadata.repository_name,
        git_provider: ProviderType::CodeCommit,
        is_public: false,
        stargazers_count: 0,
        pushed_at: metadata.last_modified_date.as_ref().map(format_timestamp),
        owner_type: OwnerType::Organization,
        main_branch: metadata.default_branch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{FixtureRepository, InMemoryCodeCommit};
    use crate::utils::error::GitServiceError;
    use chrono::{TimeZone, Utc};

    fn api() -> InMemoryCodeCommit {
        ["api-gateway", "billing", "api-client", "web"]
            .into_iter()
            .fold(InMemoryCodeCommit::default(), |api, name| {
                api.with_repository(FixtureRepository::new(name).default_branch("main"))
            })
    }

    fn service() -> CodeCommitService<InMemoryCodeCommit> {
        CodeCommitService::new(api(), "us-east-1")
    }

    #[tokio::test]
    async fn test_repository_facts() {
        let service = CodeCommitService::new(
            InMemoryCodeCommit::default().with_repository(
                FixtureRepository::new("billing")
                    .default_branch("trunk")
                    .last_modified(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            ),
            "us-east-1",
        );

        let repos = service.get_all_repositories().await.unwrap();
        assert_eq!(repos.len(), 1);
        let repo = &repos[0];
        assert_eq!(repo.id, "billing-id");
        assert_eq!(repo.full_name, "billing");
        assert_eq!(repo.main_branch.as_deref(), Some("trunk"));
        assert_eq!(repo.pushed_at.as_deref(), Some("2024-01-02T03:04:05Z"));
        assert!(!repo.is_public);
        assert_eq!(repo.stargazers_count, 0);
        assert_eq!(repo.owner_type, OwnerType::Organization);
        assert_eq!(repo.git_provider, ProviderType::CodeCommit);
    }

    #[tokio::test]
    async fn test_paginated_repos_filter_then_window() {
        let service = service();

        let page = service.get_paginated_repos(1, 1, Some("API")).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].full_name, "api-gateway");

        let page = service.get_paginated_repos(2, 1, Some("api")).await.unwrap();
        assert_eq!(page[0].full_name, "api-client");

        let all = service.get_paginated_repos(1, 10, Some("")).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_search_repositories_limits_results() {
        let service = service();
        let found = service.search_repositories("api", 1).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(service.search_repositories("nothing", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_failure_drops_repository() {
        let service = CodeCommitService::new(
            api().fail_on("get_repository:billing", "EncryptionKeyAccessDeniedException"),
            "us-east-1",
        );
        let names: Vec<String> = service
            .get_all_repositories()
            .await
            .unwrap()
            .into_iter()
            .map(|repo| repo.full_name)
            .collect();
        assert_eq!(names, vec!["api-gateway", "api-client", "web"]);
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let service = CodeCommitService::new(
            InMemoryCodeCommit::default().fail_on("list_repositories", "AccessDeniedException"),
            "us-east-1",
        );
        assert!(matches!(
            service.get_all_repositories().await,
            Err(GitServiceError::Authentication(_))
        ));
    }
}
