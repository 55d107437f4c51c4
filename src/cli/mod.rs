//! Command-line front end
//!
//! Argument mode answers one question and exits; without a repository URL the tool
//! prompts for one, then keeps answering follow-up questions until an empty line.

mod args;
mod prompt;

pub use args::Cli;
pub use prompt::Prompter;

use crate::client::{DefaultClient, PreparedIndex, RepoChatClient};
use crate::config::Config;
use crate::error::{Result, ValidationError, exit_code};
use crate::github::CommitResolver;
use crate::index::{IndexBuilder, RepoIndex};
use crate::llm::{Answer, ChatQueryEngine, QueryEngine};
use crate::metadata::MetadataStore;
use crate::types::{AskRequest, RepoRef, SearchResult};
use std::io::{BufRead, Write};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the stderr log subscriber; `RUST_LOG` takes precedence over the flags
pub fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Run the CLI and return the process exit code
pub async fn run(cli: Cli) -> i32 {
    match execute(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

async fn execute(cli: &Cli) -> Result<i32> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;
    tracing::debug!("Storage root: {}", config.storage.dir.display());

    if cli.list {
        print_list(&MetadataStore::new(config.storage.dir.clone()))?;
        return Ok(exit_code::SUCCESS);
    }

    if cli.interactive() {
        let client = DefaultClient::from_config(&config).await?;
        return interactive(&client, &mut Prompter::stdio()).await;
    }
    ask_once(cli, &config, cli.repo_url.as_deref().unwrap_or_default()).await
}

/// Argument mode; stdout carries only the answer, so a missing question is asked on stderr
async fn ask_once(cli: &Cli, config: &Config, url: &str) -> Result<i32> {
    let repo = RepoRef::parse(url)?;
    let engine = ChatQueryEngine::from_config(config)?;
    QueryEngine::<RepoIndex>::check_credentials(&engine)?;

    let question = match &cli.question {
        Some(question) => question.clone(),
        None => Prompter::stderr()
            .line("Enter your question about the repository: ")?
            .unwrap_or_default(),
    };
    let request = AskRequest {
        repo,
        question,
        force_reindex: cli.force_reindex,
    };
    request.validate()?;

    let client = DefaultClient::with_engine(config, engine).await?;

    let progress = |message: &str| {
        if !cli.quiet {
            eprintln!("{}", message);
        }
    };

    progress("Loading repository...");
    let prepared = client
        .prepare(&request.repo, request.force_reindex)
        .await?;
    progress(&format!("{}: {}", prepared.repo, prepared.decision));

    progress("Asking the AI your question...");
    let answer = client.answer(&prepared, &request.question).await?;

    println!("{}", answer.text);
    if !cli.quiet && !answer.sources.is_empty() {
        eprintln!("\nSources:\n{}", format_sources(&answer.sources));
    }
    Ok(exit_code::SUCCESS)
}

/// Prompt-driven session: repository, question, optional rebuild, then follow-ups
pub async fn interactive<R, B, Q, In, Out>(
    client: &RepoChatClient<R, B, Q>,
    prompter: &mut Prompter<In, Out>,
) -> Result<i32>
where
    R: CommitResolver,
    B: IndexBuilder,
    Q: QueryEngine<B::Handle>,
    In: BufRead,
    Out: Write,
{
    let prepared = 'session: loop {
        let Some(repo) = read_repo(prompter)? else {
            return Ok(exit_code::SUCCESS);
        };
        let Some(question) = read_question(prompter)? else {
            return Ok(exit_code::SUCCESS);
        };
        let force = prompter.confirm("Force reindex? [y/N] ")?;

        loop {
            match ask_interactive(client, prompter, &repo, &question, force).await {
                Ok(prepared) => break 'session prepared,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    if !prompter.confirm("Try again? [y/N] ")? {
                        return Ok(e.exit_code());
                    }
                    if e.is_retryable_input() {
                        continue 'session;
                    }
                }
            }
        }
    };

    while let Some(question) =
        prompter.line("\nFollow-up question (empty line to quit): ")?
    {
        if question.trim().is_empty() {
            break;
        }
        match client.answer(&prepared, &question).await {
            Ok(answer) => show_answer(prompter, &answer)?,
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(exit_code::SUCCESS)
}

async fn ask_interactive<R, B, Q, In, Out>(
    client: &RepoChatClient<R, B, Q>,
    prompter: &mut Prompter<In, Out>,
    repo: &RepoRef,
    question: &str,
    force: bool,
) -> Result<PreparedIndex<B::Handle>>
where
    R: CommitResolver,
    B: IndexBuilder,
    Q: QueryEngine<B::Handle>,
    In: BufRead,
    Out: Write,
{
    prompter.say("Loading repository...")?;
    let prepared = client.prepare(repo, force).await?;
    prompter.say(&format!("{}: {}", repo, prepared.decision))?;

    prompter.say("Asking the AI your question...")?;
    let answer = client.answer(&prepared, question).await?;
    show_answer(prompter, &answer)?;

    Ok(prepared)
}

/// Prompt until the input parses as a repository; `None` at end of input
fn read_repo<In: BufRead, Out: Write>(prompter: &mut Prompter<In, Out>) -> Result<Option<RepoRef>> {
    loop {
        let Some(input) = prompter.line("Enter the GitHub repository URL: ")? else {
            return Ok(None);
        };
        match RepoRef::parse(&input) {
            Ok(repo) => return Ok(Some(repo)),
            Err(e) => prompter.say(&e.to_string())?,
        }
    }
}

fn read_question<In: BufRead, Out: Write>(
    prompter: &mut Prompter<In, Out>,
) -> Result<Option<String>> {
    loop {
        let Some(question) = prompter.line("Enter your question about the repository: ")? else {
            return Ok(None);
        };
        if question.trim().is_empty() {
            prompter.say(&ValidationError::EmptyQuestion.to_string())?;
            continue;
        }
        return Ok(Some(question));
    }
}

fn show_answer<In: BufRead, Out: Write>(
    prompter: &mut Prompter<In, Out>,
    answer: &Answer,
) -> Result<()> {
    prompter.say("\nAI Response:")?;
    prompter.say(&answer.text)?;
    if !answer.sources.is_empty() {
        prompter.say(&format!("\nSources:\n{}", format_sources(&answer.sources)))?;
    }
    Ok(())
}

fn format_sources(sources: &[SearchResult]) -> String {
    sources
        .iter()
        .map(|source| format!("  {} ({:.2})", source.location(), source.score))
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_list(store: &MetadataStore) -> Result<()> {
    let records = store.list()?;
    if records.is_empty() {
        println!("No repositories indexed in {}", store.root().display());
        return Ok(());
    }

    for record in records {
        println!(
            "{}/{}\t{}@{}\t{} files, {} chunks\t{}",
            record.owner,
            record.repo,
            record.branch,
            record.last_commit_sha.get(..12).unwrap_or(&record.last_commit_sha),
            record.stats.files_indexed,
            record.stats.chunks_indexed,
            record.last_indexed.format("%Y-%m-%d %H:%M UTC")
        );
    }
    Ok(())
}
