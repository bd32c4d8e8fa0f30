//! 领域模型

pub mod contribution;
pub mod enums;
pub mod repository;
pub mod user;

pub use contribution::{
    Contribution, ContributionFilter, ContributionStats, MintCandidate, NewContribution,
};
pub use enums::{ContributionKind, ContributionStatus, Eligibility};
pub use repository::{NewRepository, Repository};
pub use user::{GithubProfile, User, normalize_wallet_address};
