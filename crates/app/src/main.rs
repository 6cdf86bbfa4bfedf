use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use standards_search_core::{
    default_sources, discover_sources, load_sources, open_by_name, render_for_display, rerank,
    search, synthesize, CorpusLoader, DefaultFetcher, Document, DocumentOpener, DocumentOrigin,
    LoadedCorpus, LoaderOptions, LopdfDecoder, OpenRouterClient, SearchResult, SourceDescriptor,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "standards-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON file with the ordered list of corpus sources.
    #[arg(long, env = "STANDARDS_CORPUS")]
    corpus: Option<PathBuf>,

    /// Folder scanned recursively for PDFs instead of a corpus file.
    #[arg(long, conflicts_with = "corpus")]
    folder: Option<PathBuf>,

    /// Directory that relative source paths are read from.
    #[arg(long, default_value = "public")]
    root: PathBuf,

    /// Base URL that relative source paths are fetched from.
    #[arg(long, env = "STANDARDS_BASE_URL")]
    base_url: Option<String>,

    /// Timeout for fetching one source, in seconds.
    #[arg(long, default_value = "30")]
    fetch_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Load the corpus and summarize what was extracted.
    Load,
    /// Full-text search over every page of the corpus.
    Search {
        #[arg(long)]
        query: String,
    },
    /// Search, re-rank for relevance, and optionally ask for a synthesized answer.
    Ask {
        #[arg(long)]
        query: String,
        /// Send the best results to the answer service.
        #[arg(long, default_value_t = false)]
        ai: bool,
        #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        #[arg(long, env = "OPENROUTER_MODEL")]
        model: Option<String>,
        /// Timeout for the answer service request, in seconds.
        #[arg(long, default_value = "30")]
        answer_timeout_secs: u64,
    },
    /// Render one page of a document.
    Show {
        /// Display name or file name of the document.
        #[arg(long)]
        document: String,
        #[arg(long, default_value = "1")]
        page: u32,
    },
}

struct ConsoleOpener {
    opened: bool,
}

impl DocumentOpener for ConsoleOpener {
    fn on_document_click(&mut self, document: &Document, page: u32) {
        let Some(content) = document.page(page) else {
            println!(
                "{} has {} page(s), page {page} does not exist",
                document.display_name, document.pages
            );
            return;
        };

        self.opened = true;
        println!(
            "Abriendo {}, página {page} de {}",
            document.display_name, document.pages
        );
        println!("{}", render_for_display(&content.text));
        if !content.images.is_empty() {
            println!("images={}", content.images.len());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "standards-search boot"
    );

    let sources = resolve_sources(cli.corpus.as_deref(), cli.folder.as_deref())?;
    let options = LoaderOptions {
        fetch_timeout: Duration::from_secs(cli.fetch_timeout_secs),
        ..LoaderOptions::default()
    };

    let mut fetcher = DefaultFetcher::new(&cli.root, options.fetch_timeout)?;
    if let Some(base_url) = &cli.base_url {
        fetcher = fetcher
            .with_base_url(base_url)
            .with_context(|| format!("invalid base url {base_url}"))?;
    }

    let mut loader = CorpusLoader::new(fetcher, LopdfDecoder, options);
    let corpus = loader.load_all(&sources).await;
    if !corpus.is_live() {
        warn!("serving placeholder documents only");
    }

    match cli.command {
        Command::Load => print_corpus(&corpus),
        Command::Search { query } => {
            let results = search(&corpus.documents, &query);
            println!("query: {query}");
            println!("{} result(s)", results.len());
            print_results(&results);
        }
        Command::Ask {
            query,
            ai,
            api_key,
            model,
            answer_timeout_secs,
        } => {
            let results = rerank(search(&corpus.documents, &query), &query);

            if results.is_empty() {
                println!("No encontré resultados exactos para \"{query}\".");
            } else {
                println!(
                    "He encontrado {} resultados relevantes sobre \"{query}\".",
                    results.len()
                );
                print_results(&results);
            }

            if ai {
                let mut client =
                    OpenRouterClient::new(api_key, Duration::from_secs(answer_timeout_secs))
                        .context("unable to build the answer service client")?;
                if let Some(model) = model {
                    client = client.with_model(model);
                }

                let answer = synthesize(&client, &query, &results).await;
                if answer.is_fallback() {
                    warn!("answer service fell back");
                }
                println!("\n{}", answer.text());
            }
        }
        Command::Show { document, page } => {
            let mut opener = ConsoleOpener { opened: false };
            if !open_by_name(&corpus.documents, &document, page, &mut opener) {
                bail!("document {document} is not part of the corpus");
            }
            if !opener.opened {
                bail!("page {page} of {document} could not be shown");
            }
        }
    }

    Ok(())
}

fn resolve_sources(
    corpus: Option<&Path>,
    folder: Option<&Path>,
) -> anyhow::Result<Vec<SourceDescriptor>> {
    if let Some(path) = corpus {
        return load_sources(path)
            .with_context(|| format!("unable to read corpus file {}", path.display()));
    }

    if let Some(folder) = folder {
        let sources = discover_sources(folder);
        info!(folder = %folder.display(), count = sources.len(), "discovered sources");
        return Ok(sources);
    }

    Ok(default_sources())
}

fn print_corpus(corpus: &LoadedCorpus) {
    println!("mode={:?} documents={}", corpus.mode, corpus.documents.len());

    for document in &corpus.documents {
        let origin = match document.origin {
            DocumentOrigin::Extracted => "extracted",
            DocumentOrigin::Placeholder => "placeholder",
        };
        println!(
            "[{origin}] {} ({}) category={} pages={} size={} author={}",
            document.display_name,
            document.name,
            document.category,
            document.pages,
            document.size,
            document.author()
        );
    }

    for skipped in &corpus.skipped {
        println!("skipped: path={} reason={}", skipped.path, skipped.reason);
    }
}

fn print_results(results: &[SearchResult]) {
    for result in results {
        println!(
            "[{}] page={} score={:.4} matches={} category={}",
            result.file_name, result.page, result.score, result.matches, result.category
        );
        if let Some(url) = &result.url {
            println!("  source={url}");
        }
        for context in &result.contexts {
            println!("  {context}");
        }
    }
}
