pub mod memory;
pub mod sdk;

pub use memory::{Fixture, FixtureBranch, FixturePullRequest, FixtureRepository, InMemoryCodeCommit};
pub use sdk::SdkCodeCommit;
