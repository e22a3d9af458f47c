use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use media_core::store::SledStore;
use media_core::{now_ms, Ingestor, InvertedIndex, Keyspace, MediaKind, RawHit, StoreHandle};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load provider dumps into the catalog and maintain the term index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Store directory path
    #[arg(long, default_value = "./catalog.db")]
    data: String,
    /// Namespace root for every key
    #[arg(long, default_value = "catalog")]
    namespace: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest raw provider hits from JSON/JSONL files or a directory
    Ingest {
        #[command(flatten)]
        store: StoreArgs,
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Term every ingested record is indexed under
        #[arg(long)]
        term: String,
        /// Media type of the hits: image or video
        #[arg(long = "type", default_value = "image")]
        kind: String,
    },
    /// Drop orphaned entries under a term and cap how many ids it keeps
    Prune {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        term: String,
        #[arg(long, default_value_t = 1000)]
        max_entries: usize,
    },
    /// Print how many ids a term currently holds
    Stats {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        term: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { store, input, term, kind } => {
            let (db, handle) = open(&store)?;
            let hits = load_hits(Path::new(&input))?;
            let kind = MediaKind::parse_lenient(&kind);
            let stored = Ingestor::new(handle).ingest(&hits, kind, &term, now_ms()).await?;
            db.flush().await?;
            println!("{}", serde_json::json!({ "term": term, "read": hits.len(), "ingested": stored.len() }));
        }
        Commands::Prune { store, term, max_entries } => {
            let (db, handle) = open(&store)?;
            let report = InvertedIndex::new(handle).prune(&term, max_entries).await?;
            db.flush().await?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Commands::Stats { store, term } => {
            let (_db, handle) = open(&store)?;
            let ids = InvertedIndex::new(handle).ids(&term).await?;
            println!("{}", serde_json::json!({ "term": term, "entries": ids.len() }));
        }
    }
    Ok(())
}

fn open(args: &StoreArgs) -> Result<(SledStore, StoreHandle)> {
    let db = SledStore::open(&args.data)?;
    let handle = StoreHandle::new(Arc::new(db.clone()), Keyspace::new(&args.namespace));
    Ok((db, handle))
}

fn load_hits(input: &Path) -> Result<Vec<RawHit>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        return Err(anyhow!("input not found: {}", input.display()));
    }

    let mut hits = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut hits)?;
        } else {
            read_json(&file, &mut hits)?;
        }
    }
    tracing::info!(hits = hits.len(), input = %input.display(), "loaded raw hits");
    Ok(hits)
}

fn read_jsonl(file: &Path, hits: &mut Vec<RawHit>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        hits.push(serde_json::from_str(&line)?);
    }
    Ok(())
}

/// Accepts a bare array of hits, a provider response envelope (`{"hits": [...]}`) or one hit.
fn read_json(file: &Path, hits: &mut Vec<RawHit>) -> Result<()> {
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(File::open(file)?))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                hits.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(mut obj) => match obj.remove("hits") {
            Some(serde_json::Value::Array(arr)) => {
                for v in arr {
                    hits.push(serde_json::from_value(v)?);
                }
            }
            _ => hits.push(serde_json::from_value(serde_json::Value::Object(obj))?),
        },
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_envelopes_arrays_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"{"total": 2, "hits": [{"id": 1}, {"id": 2}]}"#).unwrap();
        fs::write(dir.path().join("b.json"), r#"[{"id": 3}]"#).unwrap();
        fs::write(dir.path().join("c.jsonl"), "{\"id\": 4}\n\n{\"id\": 5}\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let hits = load_hits(dir.path()).unwrap();
        assert_eq!(hits.len(), 5);
    }

    #[tokio::test]
    async fn ingest_then_stats_and_prune() {
        let dir = tempfile::tempdir().unwrap();
        let (_db, handle) = open(&StoreArgs { data: dir.path().join("db").to_string_lossy().into(), namespace: "t".into() }).unwrap();
        let hits: Vec<RawHit> = (1..=4).map(|i| serde_json::from_value(serde_json::json!({ "id": i })).unwrap()).collect();
        Ingestor::new(handle.clone()).ingest(&hits, MediaKind::Image, "Forest", 0).await.unwrap();
        let index = InvertedIndex::new(handle);
        assert_eq!(index.ids("forest").await.unwrap().len(), 4);
        let report = index.prune("forest", 3).await.unwrap();
        assert_eq!(report.overflow_removed, 1);
        assert_eq!(index.ids("forest").await.unwrap().len(), 3);
    }
}
