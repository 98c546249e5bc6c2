use crate::config::toml_config::TomlConfig;
use crate::config::ServiceConfig;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "codecommit-git")]
#[command(about = "Query AWS CodeCommit through the provider-agnostic Git service interface")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "AWS_REGION", help = "AWS region of the repositories")]
    pub region: Option<String>,

    #[arg(long, help = "Region override; takes precedence over --region")]
    pub base_domain: Option<String>,

    #[arg(long, help = "Serve requests from a JSON fixture instead of AWS")]
    pub fixture: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check that the credentials can list repositories
    Verify,
    /// Show the caller identity
    User,
    /// List a page of branches
    Branches {
        repository: String,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "100")]
        per_page: u32,
    },
    /// Print the default branch
    DefaultBranch { repository: String },
    /// Search the first page of branches by name
    SearchBranches {
        repository: String,
        query: String,
        #[arg(long, default_value = "30")]
        per_page: u32,
    },
    /// List repositories, optionally paginated and filtered
    Repos {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, default_value = "100")]
        per_page: u32,
        #[arg(long)]
        query: Option<String>,
    },
    /// Search repositories by name
    SearchRepos {
        query: String,
        #[arg(long, default_value = "30")]
        per_page: u32,
    },
    /// Open a pull request
    CreatePr {
        repository: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        draft: bool,
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
    },
    /// Show a pull request record
    Pr { repository: String, number: u64 },
    /// Report whether a pull request is still open
    PrOpen { repository: String, number: u64 },
    /// Compute suggested tasks across all repositories
    Tasks,
    /// List microagents of a repository
    Microagents { repository: String },
    /// Print a microagent file with its triggers
    Microagent { repository: String, path: String },
    /// Print the .cursorrules file, if any
    Cursorrules { repository: String },
}

impl CliConfig {
    /// Merges the optional config file, the command line and `CODECOMMIT_TOKEN`.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let file = TomlConfig::from_file(path)?;
                file.validate()?;
                file.into_service_config()
            }
            None => ServiceConfig::default(),
        };

        if self.region.is_some() {
            config.region = self.region.clone();
        }
        if self.base_domain.is_some() {
            config.base_domain = self.base_domain.clone();
        }

        let config = config.with_token_from_env();
        config.validate()?;
        Ok(config)
    }

    /// `(verbose, json)`: command-line flags, else the file's `[logging]` table.
    pub fn log_settings(&self) -> (bool, bool) {
        let file = self
            .config
            .as_ref()
            .and_then(|path| TomlConfig::from_file(path).ok());
        let logging = file.as_ref().and_then(|file| file.logging.as_ref());

        let file_verbose = logging
            .and_then(|logging| logging.level.as_deref())
            .is_some_and(|level| matches!(level, "debug" | "trace"));
        let file_json = file.as_ref().is_some_and(TomlConfig::json_logs);

        (self.verbose || file_verbose, self.json_logs || file_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_branches_command() {
        let cli = CliConfig::parse_from([
            "codecommit-git",
            "--base-domain",
            "eu-west-2",
            "branches",
            "team/service",
            "--page",
            "2",
            "--per-page",
            "10",
        ]);

        match cli.command {
            Command::Branches {
                ref repository,
                page,
                per_page,
            } => {
                assert_eq!(repository, "team/service");
                assert_eq!(page, 2);
                assert_eq!(per_page, 10);
            }
            ref other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.service_config().unwrap().region(), "eu-west-2");
        assert_eq!(cli.log_settings(), (false, false));
    }

    #[test]
    fn test_log_settings_from_file() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut temp_file,
            b"[codecommit]\nregion = \"us-west-2\"\n\n[logging]\nlevel = \"debug\"\njson = true\n",
        )
        .unwrap();

        let path = temp_file.path().to_string_lossy().to_string();
        let cli = CliConfig::parse_from(["codecommit-git", "--config", path.as_str(), "tasks"]);
        assert_eq!(cli.log_settings(), (true, true));
    }

    #[test]
    fn test_parse_create_pr_labels() {
        let cli = CliConfig::parse_from([
            "codecommit-git",
            "create-pr",
            "service",
            "--source",
            "feature",
            "--target",
            "main",
            "--title",
            "Add feature",
            "--labels",
            "bug,urgent",
        ]);

        match cli.command {
            Command::CreatePr { labels, draft, .. } => {
                assert_eq!(labels, vec!["bug".to_string(), "urgent".to_string()]);
                assert!(!draft);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
