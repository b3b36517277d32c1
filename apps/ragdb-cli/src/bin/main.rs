use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use ragdb_core::config::{resolve_with_base, Config};
use ragdb_core::types::ChatMessage;
use ragdb_embed::get_default_embedder;
use ragdb_retrieval::chat::prepare_messages;
use ragdb_retrieval::{IngestWorker, RetrievalService};

#[derive(Parser)]
#[command(name = "ragdb", about = "Local chunked vector index for document chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and index files (.txt, .md, .pdf) or directories of them
    Ingest {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Print the retrieved context for a query
    Query {
        text: String,
        /// Print ordinals and distances as JSON instead of the joined context
        #[arg(long)]
        hits: bool,
    },
    /// Show index size, model and storage location
    Status,
    /// Print the chat messages that would be sent for a question
    Prompt {
        question: String,
        #[arg(long)]
        no_rag: bool,
    },
}

const INGESTIBLE: &[&str] = &["txt", "md", "pdf"];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn is_ingestible(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| INGESTIBLE.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

fn collect_files(base: &Path, inputs: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        let path = resolve_with_base(base, input);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(&path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| match e {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping unreadable entry");
                        None
                    }
                })
                .filter(|e| e.file_type().is_file() && is_ingestible(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path);
        }
    }
    files
}

async fn ingest(service: Arc<RetrievalService>, base: &Path, inputs: &[String]) -> anyhow::Result<()> {
    let files = collect_files(base, inputs);
    if files.is_empty() {
        println!("No ingestible files found");
        return Ok(());
    }
    let worker = IngestWorker::new(service);
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );

    let mut added = 0usize;
    let mut failed = 0usize;
    for file in files {
        pb.set_message(file.display().to_string());
        match worker.submit_file(file.clone()).await? {
            Ok(report) => added += report.chunks_added,
            Err(e) => {
                failed += 1;
                pb.suspend(|| tracing::error!(path = %file.display(), error = %e, "ingest failed"));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    println!("Ingest complete: {} chunks added, {} total", added, worker.service().len());
    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed to ingest");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = Config::load()?.settings()?;
    let embedder = get_default_embedder(&settings.embedding)?;
    let service = Arc::new(RetrievalService::open(embedder, &settings).context("opening index")?);
    let base = std::env::current_dir()?;

    match cli.command {
        Command::Ingest { paths } => ingest(Arc::clone(&service), &base, &paths).await?,
        Command::Query { text, hits } => {
            if hits {
                println!("{}", serde_json::to_string_pretty(&service.search_hits(&text)?)?);
            } else {
                println!("{}", service.search(&text)?);
            }
        }
        Command::Status => {
            println!("chunks:  {}", service.len());
            println!("dim:     {}", service.dim());
            println!("model:   {}", service.model_id());
            println!("top_k:   {}", service.top_k());
            println!("index:   {}", settings.storage.index_path().display());
            println!("texts:   {}", settings.storage.chunks_path().display());
        }
        Command::Prompt { question, no_rag } => {
            let history = vec![ChatMessage::user(question)];
            let messages = prepare_messages(&service, &history, !no_rag)?.unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&messages)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_supported_extensions() {
        assert!(is_ingestible(Path::new("a.TXT")));
        assert!(is_ingestible(Path::new("dir/b.pdf")));
        assert!(!is_ingestible(Path::new("c.docx")));
        assert!(!is_ingestible(Path::new("noext")));
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["ragdb", "query", "hello", "--hits"]).unwrap();
        assert!(matches!(cli.command, Command::Query { hits: true, .. }));
        let cli = Cli::try_parse_from(["ragdb", "prompt", "why", "--no-rag"]).unwrap();
        assert!(matches!(cli.command, Command::Prompt { no_rag: true, .. }));
        assert!(Cli::try_parse_from(["ragdb", "ingest"]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn walk_errors_are_skipped_not_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.txt"), "some readable notes").unwrap();
        std::os::unix::fs::symlink(&docs, docs.join("loop")).unwrap();

        let files = collect_files(tmp.path(), &["docs".to_string()]);
        assert_eq!(files, vec![docs.join("a.txt")]);
    }

    #[tokio::test]
    async fn ingest_without_files_writes_no_artifacts() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("skip.docx"), "not ingestible").unwrap();
        let mut settings = ragdb_core::config::Settings::default();
        settings.storage.dir = tmp.path().join("state").to_string_lossy().into_owned();
        let service = Arc::new(
            RetrievalService::open(Arc::new(ragdb_embed::FakeEmbedder::default()), &settings).unwrap(),
        );

        ingest(Arc::clone(&service), tmp.path(), &[".".to_string()]).await.unwrap();
        assert!(service.is_empty());
        assert!(!settings.storage.index_path().exists());
        assert!(!settings.storage.chunks_path().exists());
    }
}
