use clap::Parser;
use codecommit_git_service::domain::model::NewPullRequest;
use codecommit_git_service::utils::logger;
use codecommit_git_service::utils::validation::{validate_non_empty_string, validate_page};
use codecommit_git_service::{
    CliConfig, CodeCommitApi, CodeCommitService, Command, GitServiceError, InMemoryCodeCommit,
};
use serde::Serialize;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let (verbose, json_logs) = cli.log_settings();
    if json_logs {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting codecommit-git");
    if verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run_cli(cli).await {
        let exit_code = e
            .downcast_ref::<GitServiceError>()
            .map(GitServiceError::exit_code)
            .unwrap_or(1);
        tracing::error!("❌ {:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(exit_code);
    }
}

async fn run_cli(cli: CliConfig) -> anyhow::Result<()> {
    let config = cli.service_config()?;

    match &cli.fixture {
        Some(path) => {
            tracing::info!("Serving requests from fixture {}", path.display());
            let api = InMemoryCodeCommit::from_file(path)?;
            run(CodeCommitService::new(api, config.region()), cli.command).await
        }
        None => run(CodeCommitService::from_config(&config)?, cli.command).await,
    }
}

async fn run<A: CodeCommitApi>(service: CodeCommitService<A>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Verify => print(&service.verify_access().await?),
        Command::User => print(&service.get_user().await?),
        Command::Branches {
            repository,
            page,
            per_page,
        } => {
            validate_page(page, per_page)?;
            print(
                &service
                    .get_paginated_branches(&repository, page, per_page)
                    .await?,
            )
        }
        Command::DefaultBranch { repository } => {
            print(&service.get_default_branch(&repository).await?)
        }
        Command::SearchBranches {
            repository,
            query,
            per_page,
        } => {
            validate_page(1, per_page)?;
            print(&service.search_branches(&repository, &query, per_page).await?)
        }
        Command::Repos {
            page: None,
            query: None,
            ..
        } => print(&service.get_all_repositories().await?),
        Command::Repos {
            page,
            per_page,
            query,
        } => {
            let page = page.unwrap_or(1);
            validate_page(page, per_page)?;
            print(
                &service
                    .get_paginated_repos(page, per_page, query.as_deref())
                    .await?,
            )
        }
        Command::SearchRepos { query, per_page } => {
            validate_page(1, per_page)?;
            print(&service.search_repositories(&query, per_page).await?)
        }
        Command::CreatePr {
            repository,
            source,
            target,
            title,
            body,
            draft,
            labels,
        } => {
            validate_non_empty_string("source", &source)?;
            validate_non_empty_string("target", &target)?;
            validate_non_empty_string("title", &title)?;
            let request = NewPullRequest {
                repository,
                source_branch: source,
                target_branch: target,
                title,
                body,
                draft,
                labels,
            };
            print(&service.create_pr(&request).await?)
        }
        Command::Pr { repository, number } => {
            print(&service.get_pr_details(&repository, number).await?)
        }
        Command::PrOpen { repository, number } => {
            print(&service.is_pr_open(&repository, number).await)
        }
        Command::Tasks => print(&service.get_suggested_tasks().await?),
        Command::Microagents { repository } => {
            print(&service.get_microagents(&repository).await?)
        }
        Command::Microagent { repository, path } => {
            print(&service.get_microagent_content(&repository, &path).await?)
        }
        Command::Cursorrules { repository } => {
            print(&service.get_cursorrules(&repository).await?)
        }
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
