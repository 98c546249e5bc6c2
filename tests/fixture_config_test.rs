use codecommit_git_service::config::toml_config::TomlConfig;
use codecommit_git_service::utils::validation::Validate;
use codecommit_git_service::{CodeCommitService, GitServiceError, InMemoryCodeCommit};
use std::io::Write;
use tempfile::NamedTempFile;

const FIXTURE: &str = r#"{
  "repositories": [
    {
      "name": "inventory",
      "id": "0e4a-inventory",
      "default_branch": "main",
      "last_modified": "2024-05-01T12:00:00Z",
      "branches": [
        {"name": "main", "commit_id": "f00d", "committer_date": "1714564800 +0200"}
      ],
      "files": {
        ".openhands/microagents/deploy.md": "---\ntriggers: [deploy, release]\n---\nShip it.\n"
      },
      "pull_requests": [
        {
          "pullRequestId": "5",
          "title": "Tune reorder threshold",
          "pullRequestStatus": "CLOSED",
          "pullRequestTargets": [
            {"repositoryName": "inventory", "sourceReference": "refs/heads/tune", "destinationReference": "refs/heads/main"}
          ]
        }
      ]
    }
  ],
  "caller": {"user_id": "AIDAFIXTURE", "account": "210987654321", "arn": "arn:aws:iam::210987654321:user/ops"}
}"#;

fn fixture_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_service_over_fixture_file() {
    let file = fixture_file(FIXTURE);
    let api = InMemoryCodeCommit::from_file(file.path()).unwrap();
    let service = CodeCommitService::new(api, "eu-west-1");

    let user = service.get_user().await.unwrap();
    assert_eq!(user.login, "ops");

    let repos = service.get_all_repositories().await.unwrap();
    assert_eq!(repos[0].id, "0e4a-inventory");
    assert_eq!(repos[0].pushed_at.as_deref(), Some("2024-05-01T12:00:00Z"));

    let branches = service.get_branches("inventory").await.unwrap();
    assert_eq!(branches[0].last_push_date.as_deref(), Some("2024-05-01T12:00:00Z"));

    assert!(!service.is_pr_open("inventory", 5).await);
    assert!(service.get_suggested_tasks().await.unwrap().is_empty());

    let microagents = service.get_microagents("inventory").await.unwrap();
    assert_eq!(microagents.len(), 1);
    assert_eq!(microagents[0].name, "deploy.md");

    let content = service
        .get_microagent_content("inventory", &microagents[0].path)
        .await
        .unwrap();
    assert_eq!(content.triggers, vec!["deploy", "release"]);
}

#[test]
fn test_malformed_fixture_is_a_serialization_error() {
    let file = fixture_file("{\"repositories\": [");
    assert!(matches!(
        InMemoryCodeCommit::from_file(file.path()),
        Err(GitServiceError::SerializationError(_))
    ));
}

#[test]
fn test_toml_config_builds_service() {
    let file = fixture_file(
        r#"
[codecommit]
base_domain = "ap-northeast-1"
region = "us-west-2"
token = '{"aws_access_key_id":"AKIAFIXTURE","aws_secret_access_key":"fixture-secret"}'
"#,
    );

    let config = TomlConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();
    let service_config = config.into_service_config();

    let service = CodeCommitService::from_config(&service_config).unwrap();
    assert_eq!(service.region(), "ap-northeast-1");
    assert_eq!(service.api().region(), "ap-northeast-1");
}

#[test]
fn test_incomplete_token_is_an_authentication_error() {
    let file = fixture_file(
        r#"
[codecommit]
token = '{"aws_access_key_id":"AKIAFIXTURE"}'
"#,
    );

    let service_config = TomlConfig::from_file(file.path())
        .unwrap()
        .into_service_config();
    match CodeCommitService::from_config(&service_config) {
        Err(err @ GitServiceError::Authentication(_)) => assert_eq!(err.exit_code(), 3),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected an authentication error"),
    }
}
