//! Reindex decision logic
//!
//! Pure functions deciding whether the persisted index for a repository must be
//! rebuilt or can be reused. Nothing here touches the network or the filesystem;
//! callers pass in everything the decision depends on.

use crate::metadata::IndexMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of the reindex check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReindexDecision {
    /// Discard any existing index and build a fresh one
    Rebuild(RebuildReason),
    /// Open the index that is already on disk
    Reuse,
}

/// Why a rebuild was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebuildReason {
    /// No metadata record exists for the repository
    NoPriorIndex,
    /// The caller asked for a rebuild
    Forced,
    /// The default branch moved since the last build
    CommitChanged { previous: String, current: String },
    /// A record exists but its index directory is gone
    IndexMissing,
    /// The latest commit could not be resolved and the policy says rebuild
    ResolverUnavailable,
    /// The stored vectors came from a different embedding model
    ModelChanged { previous: String, current: String },
}

impl ReindexDecision {
    pub fn is_rebuild(&self) -> bool {
        matches!(self, ReindexDecision::Rebuild(_))
    }
}

impl fmt::Display for ReindexDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReindexDecision::Reuse => write!(f, "reusing existing index"),
            ReindexDecision::Rebuild(reason) => write!(f, "rebuilding index ({})", reason),
        }
    }
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildReason::NoPriorIndex => write!(f, "no previous index"),
            RebuildReason::Forced => write!(f, "forced"),
            RebuildReason::CommitChanged { previous, current } => {
                write!(f, "commit changed {} -> {}", short_sha(previous), short_sha(current))
            }
            RebuildReason::IndexMissing => write!(f, "index directory missing"),
            RebuildReason::ResolverUnavailable => write!(f, "latest commit unavailable"),
            RebuildReason::ModelChanged { previous, current } => {
                write!(f, "embedding model changed {} -> {}", previous, current)
            }
        }
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// What to do when the latest commit cannot be resolved for a transient reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverPolicy {
    /// Abort the run with the resolver error
    #[default]
    Fail,
    /// Rebuild from whatever the clone yields
    Rebuild,
    /// Reuse an existing index if there is one, otherwise rebuild
    ReuseExisting,
}

impl FromStr for ResolverPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(ResolverPolicy::Fail),
            "rebuild" => Ok(ResolverPolicy::Rebuild),
            "reuse-existing" | "reuse_existing" | "reuse" => Ok(ResolverPolicy::ReuseExisting),
            other => Err(format!(
                "unknown resolver policy '{}', expected fail, rebuild or reuse-existing",
                other
            )),
        }
    }
}

impl fmt::Display for ResolverPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolverPolicy::Fail => "fail",
            ResolverPolicy::Rebuild => "rebuild",
            ResolverPolicy::ReuseExisting => "reuse-existing",
        };
        f.write_str(name)
    }
}

/// Decide from the current commit SHA, the force flag and the stored record
pub fn decide(current_sha: &str, force: bool, stored: Option<&IndexMetadata>) -> ReindexDecision {
    let Some(stored) = stored else {
        return ReindexDecision::Rebuild(RebuildReason::NoPriorIndex);
    };

    if force {
        return ReindexDecision::Rebuild(RebuildReason::Forced);
    }

    if stored.last_commit_sha != current_sha {
        return ReindexDecision::Rebuild(RebuildReason::CommitChanged {
            previous: stored.last_commit_sha.clone(),
            current: current_sha.to_string(),
        });
    }

    ReindexDecision::Reuse
}

/// Like [`decide`], but also rebuilds when the index directory is missing on disk
pub fn decide_with_index(
    current_sha: &str,
    force: bool,
    stored: Option<&IndexMetadata>,
    index_exists: bool,
) -> ReindexDecision {
    match decide(current_sha, force, stored) {
        ReindexDecision::Reuse if !index_exists => {
            ReindexDecision::Rebuild(RebuildReason::IndexMissing)
        }
        decision => decision,
    }
}

/// Decide after a transient resolver failure
///
/// Returns `None` when the policy is [`ResolverPolicy::Fail`]; the caller then
/// propagates the resolver error.
pub fn decide_without_remote(
    policy: ResolverPolicy,
    force: bool,
    stored: Option<&IndexMetadata>,
    index_exists: bool,
) -> Option<ReindexDecision> {
    match policy {
        ResolverPolicy::Fail => None,
        ResolverPolicy::Rebuild => Some(ReindexDecision::Rebuild(
            RebuildReason::ResolverUnavailable,
        )),
        ResolverPolicy::ReuseExisting => Some(match (stored, force, index_exists) {
            (Some(_), false, true) => ReindexDecision::Reuse,
            (None, _, _) => ReindexDecision::Rebuild(RebuildReason::NoPriorIndex),
            (Some(_), true, _) => ReindexDecision::Rebuild(RebuildReason::Forced),
            (Some(_), false, false) => ReindexDecision::Rebuild(RebuildReason::IndexMissing),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexStats;
    use chrono::Utc;

    fn record(sha: &str) -> IndexMetadata {
        IndexMetadata {
            owner: "testowner".to_string(),
            repo: "testrepo".to_string(),
            branch: "main".to_string(),
            last_commit_sha: sha.to_string(),
            last_indexed: Utc::now(),
            index_path: "/tmp/index".into(),
            stats: IndexStats::default(),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
        }
    }

    #[test]
    fn test_no_record_always_rebuilds() {
        for force in [false, true] {
            for sha in ["abc123", "def456", ""] {
                assert_eq!(
                    decide(sha, force, None),
                    ReindexDecision::Rebuild(RebuildReason::NoPriorIndex)
                );
            }
        }
    }

    #[test]
    fn test_same_sha_without_force_reuses() {
        let stored = record("abc123");
        assert_eq!(decide("abc123", false, Some(&stored)), ReindexDecision::Reuse);
    }

    #[test]
    fn test_force_always_rebuilds() {
        for (stored_sha, current) in [("abc123", "abc123"), ("abc123", "def456")] {
            let stored = record(stored_sha);
            assert_eq!(
                decide(current, true, Some(&stored)),
                ReindexDecision::Rebuild(RebuildReason::Forced)
            );
        }
    }

    #[test]
    fn test_changed_sha_rebuilds() {
        let stored = record("abc123");
        assert_eq!(
            decide("def456", false, Some(&stored)),
            ReindexDecision::Rebuild(RebuildReason::CommitChanged {
                previous: "abc123".to_string(),
                current: "def456".to_string(),
            })
        );
    }

    #[test]
    fn test_decide_is_idempotent() {
        let stored = record("abc123");
        let first = decide("abc123", false, Some(&stored));
        let second = decide("abc123", false, Some(&stored));
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_index_dir_forces_rebuild() {
        let stored = record("abc123");
        assert_eq!(
            decide_with_index("abc123", false, Some(&stored), false),
            ReindexDecision::Rebuild(RebuildReason::IndexMissing)
        );
        assert_eq!(
            decide_with_index("abc123", false, Some(&stored), true),
            ReindexDecision::Reuse
        );
    }

    #[test]
    fn test_policy_fail_defers_to_caller() {
        let stored = record("abc123");
        assert_eq!(
            decide_without_remote(ResolverPolicy::Fail, false, Some(&stored), true),
            None
        );
    }

    #[test]
    fn test_policy_rebuild() {
        let stored = record("abc123");
        assert_eq!(
            decide_without_remote(ResolverPolicy::Rebuild, false, Some(&stored), true),
            Some(ReindexDecision::Rebuild(RebuildReason::ResolverUnavailable))
        );
    }

    #[test]
    fn test_policy_reuse_existing() {
        let stored = record("abc123");
        assert_eq!(
            decide_without_remote(ResolverPolicy::ReuseExisting, false, Some(&stored), true),
            Some(ReindexDecision::Reuse)
        );
        assert_eq!(
            decide_without_remote(ResolverPolicy::ReuseExisting, false, None, false),
            Some(ReindexDecision::Rebuild(RebuildReason::NoPriorIndex))
        );
        assert_eq!(
            decide_without_remote(ResolverPolicy::ReuseExisting, true, Some(&stored), true),
            Some(ReindexDecision::Rebuild(RebuildReason::Forced))
        );
        assert_eq!(
            decide_without_remote(ResolverPolicy::ReuseExisting, false, Some(&stored), false),
            Some(ReindexDecision::Rebuild(RebuildReason::IndexMissing))
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("fail".parse::<ResolverPolicy>(), Ok(ResolverPolicy::Fail));
        assert_eq!("Rebuild".parse::<ResolverPolicy>(), Ok(ResolverPolicy::Rebuild));
        assert_eq!("reuse-existing".parse::<ResolverPolicy>(), Ok(ResolverPolicy::ReuseExisting));
        assert!("sometimes".parse::<ResolverPolicy>().is_err());
    }

    #[test]
    fn test_display_shortens_shas() {
        let decision = ReindexDecision::Rebuild(RebuildReason::CommitChanged {
            previous: "abc1234567890".to_string(),
            current: "def4567890123".to_string(),
        });
        assert_eq!(
            decision.to_string(),
            "rebuilding index (commit changed abc1234 -> def4567)"
        );
        assert_eq!(ReindexDecision::Reuse.to_string(), "reusing existing index");
    }
}
