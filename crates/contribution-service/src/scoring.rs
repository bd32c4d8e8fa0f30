//! 贡献评分与铸造资格判定
//!
//! 分数由 base / size / files / message / merged_bonus 五部分相加，
//! 资格规则按顺序判定，命中第一条即返回对应原因。

use serde::{Deserialize, Serialize};

use crate::models::{ContributionKind, Eligibility};

const BASE_COMMIT: i32 = 10;
const BASE_PULL_REQUEST: i32 = 20;
const MAX_FILES_POINTS: i32 = 10;
const MESSAGE_POINTS: i32 = 5;
const MESSAGE_MIN_LEN: usize = 15;
const MERGED_BONUS: i32 = 15;

const LOW_EFFORT_MESSAGES: [&str; 5] = ["wip", "fix", "update", "typo", "."];

/// 评分输入
#[derive(Debug, Clone)]
pub struct ContributionFacts<'a> {
    pub kind: ContributionKind,
    /// commit message 或 PR 标题
    pub message: &'a str,
    pub author_login: &'a str,
    pub additions: i32,
    pub deletions: i32,
    pub changed_files: i32,
    /// commit 的父提交数，PR 为 0
    pub parent_count: usize,
    /// 仅对 PR 有意义
    pub merged: bool,
}

/// 分项得分，始终包含全部分项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub base: i32,
    pub size: i32,
    pub files: i32,
    pub message: i32,
    pub merged_bonus: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.base
            .saturating_add(self.size)
            .saturating_add(self.files)
            .saturating_add(self.message)
            .saturating_add(self.merged_bonus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    MergeCommit,
    BotAuthor,
    NotMerged,
    BelowThreshold,
}

impl IneligibleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MergeCommit => "merge_commit",
            Self::BotAuthor => "bot_author",
            Self::NotMerged => "not_merged",
            Self::BelowThreshold => "below_threshold",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub score: i32,
    pub breakdown: ScoreBreakdown,
    pub eligibility: Eligibility,
    pub ineligible_reason: Option<IneligibleReason>,
}

#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    threshold: i32,
}

impl Default for Scorer {
    fn default() -> Self {
        Self { threshold: 20 }
    }
}

impl Scorer {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn score(&self, facts: &ContributionFacts<'_>) -> ScoreResult {
        let is_pr = facts.kind == ContributionKind::PullRequest;

        let breakdown = ScoreBreakdown {
            base: if is_pr { BASE_PULL_REQUEST } else { BASE_COMMIT },
            size: size_points(facts.additions.max(0).saturating_add(facts.deletions.max(0))),
            files: facts.changed_files.clamp(0, MAX_FILES_POINTS),
            message: message_points(facts.message),
            merged_bonus: if is_pr && facts.merged { MERGED_BONUS } else { 0 },
        };
        let score = breakdown.total();

        let ineligible_reason = if !is_pr && is_merge_commit(facts.message, facts.parent_count) {
            Some(IneligibleReason::MergeCommit)
        } else if facts.author_login.ends_with("[bot]") {
            Some(IneligibleReason::BotAuthor)
        } else if is_pr && !facts.merged {
            Some(IneligibleReason::NotMerged)
        } else if score < self.threshold {
            Some(IneligibleReason::BelowThreshold)
        } else {
            None
        };

        ScoreResult {
            score,
            breakdown,
            eligibility: if ineligible_reason.is_some() {
                Eligibility::Ineligible
            } else {
                Eligibility::Eligible
            },
            ineligible_reason,
        }
    }
}

/// 变更行数分档，超大改动打折
fn size_points(lines: i32) -> i32 {
    match lines {
        i32::MIN..=0 => 0,
        1..=9 => 2,
        10..=49 => 5,
        50..=199 => 10,
        200..=999 => 15,
        _ => 8,
    }
}

fn message_points(message: &str) -> i32 {
    let first_line = message.lines().next().unwrap_or("").trim();
    let low_effort = LOW_EFFORT_MESSAGES
        .iter()
        .any(|m| first_line.eq_ignore_ascii_case(m));

    if first_line.chars().count() >= MESSAGE_MIN_LEN && !low_effort {
        MESSAGE_POINTS
    } else {
        0
    }
}

fn is_merge_commit(message: &str, parent_count: usize) -> bool {
    message.starts_with("Merge ") || parent_count > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit<'a>(message: &'a str, additions: i32, files: i32) -> ContributionFacts<'a> {
        ContributionFacts {
            kind: ContributionKind::Commit,
            message,
            author_login: "octocat",
            additions,
            deletions: 0,
            changed_files: files,
            parent_count: 1,
            merged: false,
        }
    }

    #[test]
    fn test_size_buckets() {
        assert_eq!(size_points(0), 0);
        assert_eq!(size_points(1), 2);
        assert_eq!(size_points(9), 2);
        assert_eq!(size_points(10), 5);
        assert_eq!(size_points(49), 5);
        assert_eq!(size_points(50), 10);
        assert_eq!(size_points(199), 10);
        assert_eq!(size_points(200), 15);
        assert_eq!(size_points(999), 15);
        assert_eq!(size_points(1000), 8);
    }

    #[test]
    fn test_message_points() {
        assert_eq!(message_points("Add retry to the webhook consumer"), 5);
        assert_eq!(message_points("short msg"), 0);
        assert_eq!(message_points("WIP"), 0);
        // 只看首行
        assert_eq!(message_points("fix\n\nLonger explanation of the fix here"), 0);
    }

    #[test]
    fn test_eligible_commit() {
        let result = Scorer::default().score(&commit("Implement contribution scoring", 120, 4));
        assert_eq!(
            result.breakdown,
            ScoreBreakdown {
                base: 10,
                size: 10,
                files: 4,
                message: 5,
                merged_bonus: 0
            }
        );
        assert_eq!(result.score, 29);
        assert_eq!(result.eligibility, Eligibility::Eligible);
        assert!(result.ineligible_reason.is_none());
    }

    #[test]
    fn test_huge_line_counts_do_not_overflow() {
        let facts = ContributionFacts {
            deletions: 1,
            ..commit("Vendor generated protocol bindings", i32::MAX, 3)
        };
        let result = Scorer::default().score(&facts);
        assert_eq!(result.breakdown.size, 8);
        assert_eq!(result.score, 26);

        let breakdown = ScoreBreakdown {
            base: i32::MAX,
            merged_bonus: 15,
            ..Default::default()
        };
        assert_eq!(breakdown.total(), i32::MAX);
    }

    #[test]
    fn test_files_are_capped() {
        let result = Scorer::default().score(&commit("Rename modules across the crate", 300, 40));
        assert_eq!(result.breakdown.files, 10);
    }

    #[test]
    fn test_below_threshold() {
        let result = Scorer::default().score(&commit("typo", 1, 1));
        assert_eq!(result.score, 13);
        assert_eq!(result.eligibility, Eligibility::Ineligible);
        assert_eq!(
            result.ineligible_reason,
            Some(IneligibleReason::BelowThreshold)
        );
    }

    #[test]
    fn test_merge_commit_wins_over_other_rules() {
        let facts = ContributionFacts {
            author_login: "dependabot[bot]",
            ..commit("Merge branch 'main' into feature", 500, 10)
        };
        let result = Scorer::default().score(&facts);
        assert_eq!(result.ineligible_reason, Some(IneligibleReason::MergeCommit));

        let two_parents = ContributionFacts {
            parent_count: 2,
            ..commit("Integrate upstream changes", 500, 10)
        };
        assert_eq!(
            Scorer::default().score(&two_parents).ineligible_reason,
            Some(IneligibleReason::MergeCommit)
        );
    }

    #[test]
    fn test_bot_author() {
        let facts = ContributionFacts {
            author_login: "renovate[bot]",
            ..commit("Update dependency tokio to 1.43", 300, 2)
        };
        assert_eq!(
            Scorer::default().score(&facts).ineligible_reason,
            Some(IneligibleReason::BotAuthor)
        );
    }

    #[test]
    fn test_pull_request_scoring() {
        let merged = ContributionFacts {
            kind: ContributionKind::PullRequest,
            message: "Add wallet linking endpoint",
            author_login: "octocat",
            additions: 150,
            deletions: 30,
            changed_files: 6,
            parent_count: 0,
            merged: true,
        };
        let result = Scorer::default().score(&merged);
        assert_eq!(result.score, 20 + 10 + 6 + 5 + 15);
        assert_eq!(result.eligibility, Eligibility::Eligible);

        let closed = ContributionFacts {
            merged: false,
            ..merged
        };
        let result = Scorer::default().score(&closed);
        assert_eq!(result.breakdown.merged_bonus, 0);
        assert_eq!(result.ineligible_reason, Some(IneligibleReason::NotMerged));
    }

    #[test]
    fn test_custom_threshold() {
        let scorer = Scorer::new(50);
        let result = scorer.score(&commit("Implement contribution scoring", 120, 4));
        assert_eq!(result.eligibility, Eligibility::Ineligible);
    }

    #[test]
    fn test_breakdown_serializes_all_parts() {
        let json = serde_json::to_value(ScoreBreakdown::default()).unwrap();
        for key in ["base", "size", "files", "message", "mergedBonus"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
