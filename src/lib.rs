pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, Command};

pub use adapters::{InMemoryCodeCommit, SdkCodeCommit};
pub use config::ServiceConfig;
pub use core::service::CodeCommitService;
pub use domain::ports::{CodeCommitApi, GitService};
pub use utils::error::{GitServiceError, Result};
