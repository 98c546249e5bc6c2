use crate::config::{SecretToken, ServiceConfig};
use crate::domain::model::{ApprovalRule, MergeMetadata, PullRequestDetails, PullRequestTarget};
use crate::domain::ports::{
    CallerIdentity, CodeCommitApi, CommitInfo, CreatePullRequestInput, PullRequestComment,
    RepositoryMetadata, TriggerTestOutcome,
};
use crate::utils::error::{GitServiceError, ProviderError, ProviderResult, Result};
use crate::utils::time::parse_git_date;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_codecommit::config::Credentials;
use aws_sdk_codecommit::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_codecommit::primitives::{Blob, DateTime as SmithyDateTime};
use aws_sdk_codecommit::types;
use aws_sdk_codecommit::Client as CodeCommitClient;
use aws_sdk_sts::Client as StsClient;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::OnceCell;

const MERGE_PROBE_TRIGGER: &str = "test-merge";
const TRIGGER_DESTINATION_ARN_REQUIRED: &str = "RepositoryTriggerDestinationArnRequiredException";

#[derive(Deserialize)]
struct TokenCredentials {
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    aws_session_token: Option<String>,
}

/// Decodes the secret token into static AWS credentials.
pub fn parse_credentials(token: &SecretToken) -> Result<Credentials> {
    let parsed: TokenCredentials = serde_json::from_str(token.expose_secret()).map_err(|e| {
        GitServiceError::Authentication(format!("Failed to parse AWS credentials: {}", e))
    })?;

    let (Some(access_key_id), Some(secret_access_key)) =
        (parsed.aws_access_key_id, parsed.aws_secret_access_key)
    else {
        return Err(GitServiceError::Authentication(
            "Failed to parse AWS credentials: aws_access_key_id and aws_secret_access_key are required"
                .to_string(),
        ));
    };

    Ok(Credentials::new(
        access_key_id,
        secret_access_key,
        parsed.aws_session_token,
        None,
        "codecommit-token",
    ))
}

struct Clients {
    codecommit: CodeCommitClient,
    sts: StsClient,
}

/// [`CodeCommitApi`] backed by the AWS SDK.
///
/// The SDK clients are built on first use and then shared for the adapter's
/// lifetime; concurrent first calls wait on the same initialization.
pub struct SdkCodeCommit {
    region: String,
    credentials: Option<Credentials>,
    trigger_destination_arn: Option<String>,
    clients: OnceCell<Clients>,
}

impl SdkCodeCommit {
    /// Fails with an authentication error when the configured token is not a
    /// usable credential blob. Without a token the default AWS chain applies.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let credentials = config.token.as_ref().map(parse_credentials).transpose()?;
        let trigger_destination_arn = config
            .trigger_destination_arn
            .clone()
            .filter(|arn| !arn.trim().is_empty());
        if trigger_destination_arn.is_none() {
            tracing::warn!(
                "No trigger_destination_arn configured; merge conflict detection is disabled"
            );
        }

        Ok(Self {
            region: config.region().to_string(),
            credentials,
            trigger_destination_arn,
            clients: OnceCell::new(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn clients(&self) -> &Clients {
        self.clients
            .get_or_init(|| async {
                tracing::debug!("Building AWS clients for region {}", self.region);
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.region.clone()));
                if let Some(credentials) = &self.credentials {
                    loader = loader.credentials_provider(credentials.clone());
                }
                let sdk_config = loader.load().await;
                Clients {
                    codecommit: CodeCommitClient::new(&sdk_config),
                    sts: StsClient::new(&sdk_config),
                }
            })
            .await
    }

    async fn codecommit(&self) -> &CodeCommitClient {
        &self.clients().await.codecommit
    }
}

fn provider_error<E>(err: E) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = err
        .message()
        .map(str::to_owned)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    ProviderError {
        code: err.code().map(str::to_owned),
        message,
    }
}

fn to_chrono(value: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

fn branch_name(reference: &str) -> &str {
    reference.strip_prefix("refs/heads/").unwrap_or(reference)
}

/// Whether an approval-rule template body covers `branch`. A template with
/// no `DestinationReferences` applies to every branch.
pub fn template_applies_to(content: &str, branch: &str) -> bool {
    let Ok(body) = serde_json::from_str::<serde_json::Value>(content) else {
        tracing::debug!("Ignoring approval rule template with unreadable content");
        return false;
    };

    match body.get("DestinationReferences").and_then(|refs| refs.as_array()) {
        None => true,
        Some(references) => references
            .iter()
            .filter_map(|reference| reference.as_str())
            .any(|reference| branch_name(reference) == branch_name(branch)),
    }
}

fn pull_request_details(pull_request: &types::PullRequest) -> PullRequestDetails {
    PullRequestDetails {
        pull_request_id: pull_request.pull_request_id().unwrap_or_default().to_owned(),
        title: pull_request.title().unwrap_or_default().to_owned(),
        description: pull_request.description().map(str::to_owned),
        pull_request_status: pull_request
            .pull_request_status()
            .map(|status| status.as_str().to_owned()),
        revision_id: pull_request.revision_id().map(str::to_owned),
        author_arn: pull_request.author_arn().map(str::to_owned),
        creation_date: pull_request.creation_date().and_then(to_chrono),
        last_activity_date: pull_request.last_activity_date().and_then(to_chrono),
        pull_request_targets: pull_request
            .pull_request_targets()
            .iter()
            .map(|target| PullRequestTarget {
                repository_name: target.repository_name().unwrap_or_default().to_owned(),
                source_reference: target.source_reference().unwrap_or_default().to_owned(),
                destination_reference: target
                    .destination_reference()
                    .unwrap_or_default()
                    .to_owned(),
                source_commit: target.source_commit().map(str::to_owned),
                destination_commit: target.destination_commit().map(str::to_owned),
                merge_base: target.merge_base().map(str::to_owned),
                merge_metadata: target.merge_metadata().map(|metadata| MergeMetadata {
                    is_merged: metadata.is_merged(),
                    merged_by: metadata.merged_by().map(str::to_owned),
                    merge_commit_id: metadata.merge_commit_id().map(str::to_owned),
                }),
            })
            .collect(),
        approval_rules: pull_request
            .approval_rules()
            .iter()
            .map(|rule| ApprovalRule {
                approval_rule_name: rule.approval_rule_name().unwrap_or_default().to_owned(),
                origin_approval_rule_template: rule
                    .origin_approval_rule_template()
                    .and_then(|origin| origin.approval_rule_template_name())
                    .map(str::to_owned),
            })
            .collect(),
    }
}

#[async_trait]
impl CodeCommitApi for SdkCodeCommit {
    async fn list_repositories(&self) -> ProviderResult<Vec<String>> {
        let client = self.codecommit().await;
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = client
                .list_repositories()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(provider_error)?;

            names.extend(
                output
                    .repositories()
                    .iter()
                    .filter_map(|repo| repo.repository_name())
                    .map(str::to_owned),
            );

            match output.next_token() {
                Some(token) => next_token = Some(token.to_owned()),
                None => break,
            }
        }

        tracing::debug!("ListRepositories returned {} repositories", names.len());
        Ok(names)
    }

    async fn get_repository(&self, repository: &str) -> ProviderResult<RepositoryMetadata> {
        let output = self
            .codecommit()
            .await
            .get_repository()
            .repository_name(repository)
            .send()
            .await
            .map_err(provider_error)?;

        let metadata = output.repository_metadata();
        Ok(RepositoryMetadata {
            repository_name: metadata
                .and_then(|m| m.repository_name())
                .unwrap_or(repository)
                .to_owned(),
            repository_id: metadata.and_then(|m| m.repository_id()).map(str::to_owned),
            default_branch: metadata.and_then(|m| m.default_branch()).map(str::to_owned),
            last_modified_date: metadata
                .and_then(|m| m.last_modified_date())
                .and_then(to_chrono),
        })
    }

    async fn list_branches(&self, repository: &str) -> ProviderResult<Vec<String>> {
        let client = self.codecommit().await;
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = client
                .list_branches()
                .repository_name(repository)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(provider_error)?;

            names.extend(output.branches().iter().cloned());

            match output.next_token() {
                Some(token) => next_token = Some(token.to_owned()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn get_branch(&self, repository: &str, branch: &str) -> ProviderResult<Option<String>> {
        let output = self
            .codecommit()
            .await
            .get_branch()
            .repository_name(repository)
            .branch_name(branch)
            .send()
            .await
            .map_err(provider_error)?;

        Ok(output
            .branch()
            .and_then(|info| info.commit_id())
            .map(str::to_owned))
    }

    async fn get_commit(&self, repository: &str, commit_id: &str) -> ProviderResult<CommitInfo> {
        let output = self
            .codecommit()
            .await
            .get_commit()
            .repository_name(repository)
            .commit_id(commit_id)
            .send()
            .await
            .map_err(provider_error)?;

        let commit: Option<&types::Commit> = output.commit().into();
        Ok(CommitInfo {
            commit_id: commit
                .and_then(|c| c.commit_id())
                .unwrap_or(commit_id)
                .to_owned(),
            committer_date: commit
                .and_then(|c| c.committer())
                .and_then(|committer| committer.date())
                .and_then(parse_git_date),
        })
    }

    async fn approval_rule_templates_for_branch(
        &self,
        repository: &str,
        branch: &str,
    ) -> ProviderResult<Vec<String>> {
        let client = self.codecommit().await;
        let mut associated = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = client
                .list_associated_approval_rule_templates_for_repository()
                .repository_name(repository)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(provider_error)?;

            associated.extend(output.approval_rule_template_names().iter().cloned());

            match output.next_token() {
                Some(token) => next_token = Some(token.to_owned()),
                None => break,
            }
        }

        let mut applying = Vec::new();
        for name in associated {
            let output = client
                .get_approval_rule_template()
                .approval_rule_template_name(&name)
                .send()
                .await
                .map_err(provider_error)?;

            let template: Option<&types::ApprovalRuleTemplate> =
                output.approval_rule_template().into();
            let content: Option<&str> =
                template.and_then(|t| t.approval_rule_template_content().into());

            if content.is_some_and(|content| template_applies_to(content, branch)) {
                applying.push(name);
            }
        }

        Ok(applying)
    }

    async fn create_pull_request(
        &self,
        input: &CreatePullRequestInput,
    ) -> ProviderResult<PullRequestDetails> {
        let target = types::Target::builder()
            .repository_name(&input.repository_name)
            .source_reference(&input.source_reference)
            .destination_reference(&input.destination_reference)
            .build()
            .map_err(|e| ProviderError::without_code(format!("invalid pull request target: {}", e)))?;

        let output = self
            .codecommit()
            .await
            .create_pull_request()
            .title(&input.title)
            .description(&input.description)
            .targets(target)
            .send()
            .await
            .map_err(provider_error)?;

        let pull_request: Option<&types::PullRequest> = output.pull_request().into();
        pull_request
            .map(pull_request_details)
            .ok_or_else(|| ProviderError::without_code("CreatePullRequest returned no pull request"))
    }

    async fn get_pull_request(&self, pull_request_id: &str) -> ProviderResult<PullRequestDetails> {
        let output = self
            .codecommit()
            .await
            .get_pull_request()
            .pull_request_id(pull_request_id)
            .send()
            .await
            .map_err(provider_error)?;

        let pull_request: Option<&types::PullRequest> = output.pull_request().into();
        pull_request
            .map(pull_request_details)
            .ok_or_else(|| ProviderError::without_code("GetPullRequest returned no pull request"))
    }

    async fn list_open_pull_requests(&self, repository: &str) -> ProviderResult<Vec<String>> {
        let client = self.codecommit().await;
        let mut ids = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = client
                .list_pull_requests()
                .repository_name(repository)
                .pull_request_status(types::PullRequestStatusEnum::Open)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(provider_error)?;

            ids.extend(output.pull_request_ids().iter().cloned());

            match output.next_token() {
                Some(token) => next_token = Some(token.to_owned()),
                None => break,
            }
        }

        Ok(ids)
    }

    async fn evaluate_pull_request_approval_rules(
        &self,
        pull_request_id: &str,
        revision_id: &str,
    ) -> ProviderResult<Option<bool>> {
        let output = self
            .codecommit()
            .await
            .evaluate_pull_request_approval_rules()
            .pull_request_id(pull_request_id)
            .revision_id(revision_id)
            .send()
            .await
            .map_err(provider_error)?;

        let evaluation: Option<&types::Evaluation> = output.evaluation().into();
        let approved: Option<bool> = evaluation.and_then(|evaluation| evaluation.approved().into());
        Ok(approved)
    }

    async fn get_comments_for_pull_request(&self, pull_request_id: &str) -> ProviderResult<usize> {
        let output = self
            .codecommit()
            .await
            .get_comments_for_pull_request()
            .pull_request_id(pull_request_id)
            .send()
            .await
            .map_err(provider_error)?;

        Ok(output.comments_for_pull_request_data().len())
    }

    async fn post_comment_for_pull_request(
        &self,
        comment: &PullRequestComment,
    ) -> ProviderResult<()> {
        self.codecommit()
            .await
            .post_comment_for_pull_request()
            .pull_request_id(&comment.pull_request_id)
            .repository_name(&comment.repository_name)
            .before_commit_id(&comment.before_commit_id)
            .after_commit_id(&comment.after_commit_id)
            .content(&comment.content)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn test_repository_triggers(
        &self,
        repository: &str,
        source_reference: &str,
        destination_reference: &str,
    ) -> ProviderResult<TriggerTestOutcome> {
        let Some(destination_arn) = self.trigger_destination_arn.as_deref() else {
            return Err(ProviderError::new(
                TRIGGER_DESTINATION_ARN_REQUIRED,
                "no trigger destination ARN configured",
            ));
        };
        let trigger = types::RepositoryTrigger::builder()
            .name(MERGE_PROBE_TRIGGER)
            .destination_arn(destination_arn)
            .branches(branch_name(source_reference))
            .branches(branch_name(destination_reference))
            .events(types::RepositoryTriggerEventEnum::UpdateReference)
            .build()
            .map_err(|e| ProviderError::without_code(format!("invalid repository trigger: {}", e)))?;

        let output = self
            .codecommit()
            .await
            .test_repository_triggers()
            .repository_name(repository)
            .triggers(trigger)
            .send()
            .await
            .map_err(provider_error)?;

        Ok(TriggerTestOutcome {
            successful_executions: output.successful_executions().to_vec(),
            failed_executions: output
                .failed_executions()
                .iter()
                .filter_map(|failure| failure.trigger())
                .map(str::to_owned)
                .collect(),
        })
    }

    async fn get_file(&self, repository: &str, path: &str) -> ProviderResult<Vec<u8>> {
        let output = self
            .codecommit()
            .await
            .get_file()
            .repository_name(repository)
            .file_path(path)
            .send()
            .await
            .map_err(provider_error)?;

        let content: Option<&Blob> = output.file_content().into();
        Ok(content.map(|blob| blob.as_ref().to_vec()).unwrap_or_default())
    }

    async fn get_folder(
        &self,
        repository: &str,
        folder: &str,
        commit_specifier: Option<&str>,
    ) -> ProviderResult<Vec<String>> {
        let output = self
            .codecommit()
            .await
            .get_folder()
            .repository_name(repository)
            .folder_path(folder)
            .set_commit_specifier(commit_specifier.map(str::to_owned))
            .send()
            .await
            .map_err(provider_error)?;

        Ok(output
            .files()
            .iter()
            .filter_map(|file| file.absolute_path())
            .map(str::to_owned)
            .collect())
    }

    async fn get_caller_identity(&self) -> ProviderResult<CallerIdentity> {
        let output = self
            .clients()
            .await
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(provider_error)?;

        Ok(CallerIdentity {
            user_id: output.user_id().unwrap_or_default().to_owned(),
            account: output.account().map(str::to_owned),
            arn: output.arn().unwrap_or_default().to_owned(),
        })
    }
}
