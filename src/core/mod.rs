pub mod branches;
pub mod pagination;
pub mod pull_requests;
pub mod repos;
pub mod resolver;
pub mod service;
pub mod tasks;

pub use crate::domain::ports::{CodeCommitApi, GitService};
pub use crate::utils::error::Result;
pub use service::CodeCommitService;
