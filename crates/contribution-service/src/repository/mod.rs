//! 数据库仓储层

pub mod contribution_repo;
pub mod repo_repo;
pub mod traits;
pub mod user_repo;

pub use contribution_repo::ContributionRepository;
pub use repo_repo::RepoRepository;
pub use traits::{ContributionRepositoryTrait, RepoRepositoryTrait, UserRepositoryTrait};
pub use user_repo::UserRepository;

#[cfg(any(test, feature = "mocks"))]
pub use traits::{MockContributionRepositoryTrait, MockRepoRepositoryTrait, MockUserRepositoryTrait};
