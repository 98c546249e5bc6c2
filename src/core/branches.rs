use crate::core::pagination::{matches_query, page_window};
use crate::core::service::{repository_name, CodeCommitService};
use crate::domain::model::{Branch, PaginatedBranches};
use crate::domain::ports::CodeCommitApi;
use crate::utils::error::{GitServiceError, Result};
use crate::utils::time::format_timestamp;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_BRANCHES_PER_PAGE: u32 = 100;

impl<A: CodeCommitApi> CodeCommitService<A> {
    /// First page of branches at the default page size.
    pub async fn get_branches(&self, repository: &str) -> Result<Vec<Branch>> {
        let page = self
            .get_paginated_branches(repository, 1, DEFAULT_BRANCHES_PER_PAGE)
            .await?;
        Ok(page.branches)
    }

    /// Lists every branch name, then describes only the requested 1-based
    /// page. Branches whose details cannot be fetched are left out of the page.
    pub async fn get_paginated_branches(
        &self,
        repository: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PaginatedBranches> {
        let name = repository_name(repository);
        let names = self.api().list_branches(name).await?;
        let total_count = names.len();
        let window = page_window(total_count, page, per_page);
        let has_next_page = window.end < total_count;

        tracing::debug!(
            "Describing branches {}..{} of {} in {}",
            window.start,
            window.end,
            total_count,
            name
        );

        let mut branches = Vec::with_capacity(window.len());
        for branch in &names[window] {
            match self.describe_branch(name, branch).await {
                Ok(described) => branches.push(described),
                Err(e) => tracing::warn!("Skipping branch {} in {}: {}", branch, name, e),
            }
        }

        Ok(PaginatedBranches {
            branches,
            has_next_page,
            current_page: page,
            per_page,
            total_count,
        })
    }

    /// Filters the first page only; matches beyond `per_page` branches are
    /// not found.
    pub async fn search_branches(
        &self,
        repository: &str,
        query: &str,
        per_page: u32,
    ) -> Result<Vec<Branch>> {
        let page = self.get_paginated_branches(repository, 1, per_page).await?;
        Ok(page
            .branches
            .into_iter()
            .filter(|branch| matches_query(&branch.name, query))
            .collect())
    }

    pub async fn get_default_branch(&self, repository: &str) -> Result<String> {
        let metadata = self.api().get_repository(repository_name(repository)).await?;
        Ok(metadata
            .default_branch
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string()))
    }

    async fn describe_branch(&self, repository: &str, branch: &str) -> Result<Branch> {
        let commit_id = self
            .api()
            .get_branch(repository, branch)
            .await?
            .ok_or_else(|| GitServiceError::Unknown(format!("Branch {} has no commit", branch)))?;
        let commit = self.api().get_commit(repository, &commit_id).await?;
        let protected = self.is_protected(repository, branch).await;

        Ok(Branch {
            name: branch.to_string(),
            commit_sha: commit_id,
            protected,
            last_push_date: commit.committer_date.as_ref().map(format_timestamp),
        })
    }

    /// A branch counts as protected when an approval-rule template covers it.
    async fn is_protected(&self, repository: &str, branch: &str) -> bool {
        match self
            .api()
            .approval_rule_templates_for_branch(repository, branch)
            .await
        {
            Ok(templates) => !templates.is_empty(),
            Err(e) => {
                tracing::debug!("No approval rules for {}/{}: {}", repository, branch, e);
                false
            }
        }
    }
}
