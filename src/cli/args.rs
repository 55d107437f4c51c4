//! Command-line argument definitions using clap derive

use crate::config::Config;
use crate::decision::ResolverPolicy;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Ask natural-language questions about a GitHub repository
///
/// Without a repository URL the tool runs interactively.
#[derive(Parser, Debug)]
#[command(name = "repo-chat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Repository to ask about, e.g. https://github.com/owner/repo or owner/repo
    pub repo_url: Option<String>,

    /// Question to ask; prompted for when omitted
    pub question: Option<String>,

    /// Rebuild the index even if the latest commit is already indexed
    #[arg(short, long)]
    pub force_reindex: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "REPO_CHAT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding metadata and indexes
    #[arg(long, value_name = "PATH")]
    pub storage_dir: Option<PathBuf>,

    /// Chat model used to answer
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Number of chunks retrieved per question
    #[arg(long, value_name = "N", value_parser = parse_top_k)]
    pub top_k: Option<usize>,

    /// What to do when the latest commit cannot be looked up: fail, rebuild or reuse-existing
    #[arg(long, value_name = "POLICY")]
    pub on_resolver_error: Option<ResolverPolicy>,

    /// List indexed repositories and exit
    #[arg(long)]
    pub list: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only print answers and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Whether to prompt for the repository and questions
    pub fn interactive(&self) -> bool {
        self.repo_url.is_none() && !self.list
    }

    /// Apply command-line overrides on top of file and environment settings
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(dir) = &self.storage_dir {
            config.storage.dir = dir.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(top_k) = self.top_k {
            config.search.limit = top_k;
        }
        if let Some(policy) = self.on_resolver_error {
            config.resolver.on_error = policy;
        }
    }

    /// Default log filter for the verbosity flags
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }
}

fn parse_top_k(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
