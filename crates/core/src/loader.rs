use crate::cache::DocumentCache;
use crate::error::LoadError;
use crate::extractor::PageExtractor;
use crate::models::{Document, DocumentOrigin, LoaderOptions, SourceDescriptor};
use crate::pdf::PdfDecoder;
use crate::placeholder::PlaceholderRegistry;
use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use walkdir::WalkDir;

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<u8>, LoadError>;
}

/// Fetches absolute `http(s)` paths over HTTP, relative paths against an
/// optional base URL, and everything else from a local root directory.
pub struct DefaultFetcher {
    client: Client,
    root: PathBuf,
    base_url: Option<Url>,
}

impl DefaultFetcher {
    pub fn new(root: impl Into<PathBuf>, fetch_timeout: Duration) -> Result<Self, LoadError> {
        Ok(Self {
            client: Client::builder().timeout(fetch_timeout).build()?,
            root: root.into(),
            base_url: None,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, LoadError> {
        self.base_url = Some(Url::parse(base_url)?);
        Ok(self)
    }

    fn remote_url(&self, path: &str) -> Result<Option<Url>, LoadError> {
        if let Ok(url) = Url::parse(path) {
            return match url.scheme() {
                "http" | "https" => Ok(Some(url)),
                "file" => Ok(None),
                other => Err(LoadError::InvalidSource(format!(
                    "unsupported scheme {other} in {path}"
                ))),
            };
        }

        match &self.base_url {
            Some(base) => Ok(Some(base.join(path)?)),
            None => Ok(None),
        }
    }

    fn local_path(&self, path: &str) -> PathBuf {
        let trimmed = path.strip_prefix("file://").unwrap_or(path);
        let candidate = Path::new(trimmed);
        if candidate.is_absolute() && candidate.exists() {
            candidate.to_path_buf()
        } else {
            self.root.join(trimmed.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl SourceFetcher for DefaultFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<u8>, LoadError> {
        let Some(url) = self.remote_url(&source.path)? else {
            let path = self.local_path(&source.path);
            return Ok(tokio::fs::read(&path).await?);
        };

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(LoadError::Status {
                source_path: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusMode {
    Live,
    PlaceholderOnly,
}

#[derive(Debug, Clone)]
pub struct SkippedSource {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub documents: Vec<Arc<Document>>,
    pub mode: CorpusMode,
    pub skipped: Vec<SkippedSource>,
}

impl LoadedCorpus {
    pub fn is_live(&self) -> bool {
        self.mode == CorpusMode::Live
    }
}

pub struct CorpusLoader<F, D>
where
    F: SourceFetcher,
    D: PdfDecoder,
{
    fetcher: F,
    decoder: D,
    extractor: PageExtractor,
    cache: DocumentCache,
    placeholders: PlaceholderRegistry,
}

impl<F, D> CorpusLoader<F, D>
where
    F: SourceFetcher,
    D: PdfDecoder,
{
    pub fn new(fetcher: F, decoder: D, options: LoaderOptions) -> Self {
        Self {
            fetcher,
            decoder,
            extractor: PageExtractor::new(options.extraction),
            cache: DocumentCache::new(),
            placeholders: PlaceholderRegistry::default(),
        }
    }

    pub fn with_cache(mut self, cache: DocumentCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_placeholders(mut self, placeholders: PlaceholderRegistry) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Loads every source in order. Never fails: sources that cannot be
    /// fetched or decoded are replaced by their registered placeholder, and
    /// when nothing was extracted the whole placeholder set is returned.
    pub async fn load_all(&mut self, sources: &[SourceDescriptor]) -> LoadedCorpus {
        let mut documents = Vec::new();
        let mut skipped = Vec::new();
        let mut extracted = 0usize;

        for source in sources {
            match self.load_document(source).await {
                Ok(document) => {
                    extracted += 1;
                    documents.push(document);
                }
                Err(error) => {
                    warn!(path = %source.path, %error, "failed to load document");
                    skipped.push(SkippedSource {
                        path: source.path.clone(),
                        reason: error.to_string(),
                    });
                    if let Some(placeholder) = self.placeholders.for_source(source) {
                        documents.push(Arc::new(placeholder));
                    }
                }
            }
        }

        if extracted == 0 {
            warn!(
                sources = sources.len(),
                "no document could be extracted, serving placeholder corpus"
            );
            return LoadedCorpus {
                documents: self.placeholders.all().into_iter().map(Arc::new).collect(),
                mode: CorpusMode::PlaceholderOnly,
                skipped,
            };
        }

        info!(extracted, total = sources.len(), "corpus loaded");
        LoadedCorpus {
            documents,
            mode: CorpusMode::Live,
            skipped,
        }
    }

    pub async fn load_document(
        &mut self,
        source: &SourceDescriptor,
    ) -> Result<Arc<Document>, LoadError> {
        if let Some(document) = self.cache.get(&source.path) {
            debug!(path = %source.path, "using cached document");
            return Ok(document);
        }

        let bytes = self.fetcher.fetch(source).await?;
        let size = bytes.len() as u64;
        let checksum = digest_bytes(&bytes);
        info!(path = %source.path, size, "fetched pdf");

        let pdf = self.decoder.decode(bytes).await?;
        let text_content = self.extractor.extract_pages(pdf.as_ref()).await;
        let metadata = pdf.metadata().await.unwrap_or_else(|error| {
            warn!(path = %source.path, %error, "could not read pdf metadata");
            Default::default()
        });

        let title = metadata
            .title
            .clone()
            .unwrap_or_else(|| last_path_segment(&source.path));

        let document = Arc::new(Document {
            name: source.name.clone(),
            display_name: source.display_name.clone(),
            category: source.category.clone(),
            pages: pdf.num_pages(),
            size,
            text_content,
            metadata: Some(metadata),
            url: Some(source.path.clone()),
            title,
            checksum: Some(checksum),
            origin: DocumentOrigin::Extracted,
        });

        info!(
            path = %source.path,
            pages = document.pages,
            "document processed and cached"
        );
        self.cache.put(source.path.clone(), Arc::clone(&document));
        Ok(document)
    }
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn last_path_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

pub fn load_sources(path: &Path) -> Result<Vec<SourceDescriptor>, LoadError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn default_sources() -> Vec<SourceDescriptor> {
    const DEFAULTS: [(&str, &str); 6] = [
        ("estandares-camineria.pdf", "estandares-camineria"),
        ("estandares-generales.pdf", "estandares-generales"),
        (
            "estandares-operativos-carga-y-gestion-de-acopios.pdf",
            "estandares-operativos-carga-y-gestion-de-acopios",
        ),
        (
            "estandares-operativos-cosecha-y-ext-madera.pdf",
            "estandares-operativos-cosecha-y-extraccion-madera",
        ),
        (
            "estandares-operativos-vivero-san-francisco.pdf",
            "estandares-operativos-vivero-san-francisco",
        ),
        (
            "estandares-operativos-vivero-santana.pdf",
            "estandares-operativos-vivero-santana",
        ),
    ];

    DEFAULTS
        .iter()
        .map(|(name, display_name)| SourceDescriptor {
            path: format!("/assets/pdfs/{name}"),
            name: (*name).to_string(),
            display_name: (*display_name).to_string(),
            category: "Estándares".to_string(),
        })
        .collect()
}

pub fn discover_sources(folder: &Path) -> Vec<SourceDescriptor> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            Some(SourceDescriptor {
                path: path.to_string_lossy().to_string(),
                display_name: format_file_name(&name),
                category: category_from_file_name(&name).to_string(),
                name,
            })
        })
        .collect()
}

pub fn format_file_name(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.contains('/') => stem,
        _ => file_name,
    };

    stem.replace(['-', '_'], " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn category_from_file_name(file_name: &str) -> &'static str {
    let name = file_name.to_lowercase();

    if name.contains("norma") || name.contains("iso") {
        "normativo"
    } else if name.contains("procedimiento") {
        "procedimiento"
    } else if name.contains("guia") || name.contains("manual") {
        "guía"
    } else if name.contains("tecnico") {
        "técnico"
    } else {
        "documento"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::models::DocumentMetadata;
    use crate::pdf::PdfDocument;
    use crate::testing::{FakeDecoder, FakeDocument, FakePage};
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Default)]
    struct MapFetcher {
        files: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl MapFetcher {
        fn with(mut self, path: &str, bytes: &[u8]) -> Self {
            self.files.insert(path.to_string(), bytes.to_vec());
            self
        }
    }

    #[async_trait]
    impl SourceFetcher for MapFetcher {
        async fn fetch(&self, source: &SourceDescriptor) -> Result<Vec<u8>, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.files.get(&source.path).cloned().ok_or(LoadError::Status {
                source_path: source.path.clone(),
                status: 404,
            })
        }
    }

    fn source(path: &str, display_name: &str, category: &str) -> SourceDescriptor {
        SourceDescriptor {
            path: path.to_string(),
            name: last_path_segment(path),
            display_name: display_name.to_string(),
            category: category.to_string(),
        }
    }

    #[tokio::test]
    async fn partial_failure_substitutes_registered_placeholder() {
        let fetcher = MapFetcher::default().with(
            "/pdfs/alambrado.pdf",
            "Especificaciones técnicas de alambrado\u{000c}Mantenimiento".as_bytes(),
        );
        let mut loader = CorpusLoader::new(fetcher, FakeDecoder, LoaderOptions::default());

        let corpus = loader
            .load_all(&[
                source("/pdfs/alambrado.pdf", "alambrado", "Estándares"),
                source("/pdfs/missing.pdf", "faltante", "guía"),
                source("/pdfs/other.pdf", "otro", "sin placeholder"),
            ])
            .await;

        assert!(corpus.is_live());
        assert_eq!(corpus.skipped.len(), 2);
        assert_eq!(corpus.documents.len(), 2);

        let live = &corpus.documents[0];
        assert_eq!(live.origin, DocumentOrigin::Extracted);
        assert_eq!(live.pages, 2);
        assert_eq!(live.text_content.len(), 2);
        assert_eq!(live.title, "alambrado.pdf");
        assert_eq!(live.url.as_deref(), Some("/pdfs/alambrado.pdf"));
        assert!(live.checksum.is_some());

        assert_eq!(corpus.documents[1].origin, DocumentOrigin::Placeholder);
        assert_eq!(corpus.documents[1].category, "guía");
    }

    #[tokio::test]
    async fn total_failure_serves_placeholder_corpus() {
        let fetcher = MapFetcher::default().with("/pdfs/broken.pdf", b"%BROKEN");
        let mut loader = CorpusLoader::new(fetcher, FakeDecoder, LoaderOptions::default());

        let corpus = loader
            .load_all(&[
                source("/pdfs/broken.pdf", "roto", "Estándares"),
                source("/pdfs/missing.pdf", "faltante", "Estándares"),
            ])
            .await;

        assert_eq!(corpus.mode, CorpusMode::PlaceholderOnly);
        assert!(!corpus.documents.is_empty());
        assert!(corpus
            .documents
            .iter()
            .all(|document| document.origin == DocumentOrigin::Placeholder));
        assert!(corpus.skipped[0].reason.contains("decode"));
        assert!(corpus.skipped[1].reason.contains("404"));
    }

    #[tokio::test]
    async fn cached_documents_are_not_fetched_twice() {
        let fetcher = MapFetcher::default().with("/pdfs/a.pdf", b"uno");
        let mut loader = CorpusLoader::new(fetcher, FakeDecoder, LoaderOptions::default());
        let sources = [source("/pdfs/a.pdf", "a", "Estándares")];

        loader.load_all(&sources).await;
        let second = loader.load_all(&sources).await;

        assert!(second.is_live());
        assert_eq!(loader.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(loader.cache().len(), 1);

        loader.clear_cache();
        loader.load_all(&sources).await;
        assert_eq!(loader.fetcher.calls.load(Ordering::SeqCst), 2);
    }

    struct TitledDecoder;

    #[async_trait]
    impl PdfDecoder for TitledDecoder {
        async fn decode(&self, _bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, ExtractError> {
            let metadata = DocumentMetadata {
                title: Some("Estándares de Caminería".to_string()),
                author: Some("Área Forestal".to_string()),
                ..DocumentMetadata::default()
            };
            Ok(Box::new(
                FakeDocument::new(vec![FakePage::text("Caminos forestales")]).with_metadata(metadata),
            ))
        }
    }

    #[tokio::test]
    async fn document_title_comes_from_metadata() {
        let fetcher = MapFetcher::default().with("/pdfs/camineria.pdf", b"bytes");
        let mut loader = CorpusLoader::new(fetcher, TitledDecoder, LoaderOptions::default());

        let document = loader
            .load_document(&source("/pdfs/camineria.pdf", "camineria", "Estándares"))
            .await
            .expect("document should load");

        assert_eq!(document.title, "Estándares de Caminería");
        assert_eq!(document.author(), "Área Forestal");
        assert_eq!(document.size, 5);
        assert_eq!(document.checksum.as_deref(), Some(digest_bytes(b"bytes").as_str()));
    }

    #[tokio::test]
    async fn default_fetcher_reads_relative_paths_from_root() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("assets/pdfs"))?;
        fs::write(dir.path().join("assets/pdfs/a.pdf"), b"%PDF-1.4")?;

        let fetcher = DefaultFetcher::new(dir.path(), Duration::from_secs(1))?;
        let bytes = fetcher
            .fetch(&source("/assets/pdfs/a.pdf", "a", "Estándares"))
            .await?;

        assert_eq!(bytes, b"%PDF-1.4");
        Ok(())
    }

    #[test]
    fn sources_are_discovered_recursively_with_derived_names() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        fs::write(dir.path().join("norma-iso-9001.pdf"), b"%PDF-1.4")?;
        fs::write(nested.join("guia_de_campo.PDF"), b"%PDF-1.4")?;
        fs::write(dir.path().join("notas.txt"), b"no pdf")?;

        let sources = discover_sources(dir.path());

        assert_eq!(sources.len(), 2);
        let names = sources
            .iter()
            .map(|source| (source.display_name.as_str(), source.category.as_str()))
            .collect::<Vec<_>>();
        assert!(names.contains(&("Norma Iso 9001", "normativo")));
        assert!(names.contains(&("Guia De Campo", "guía")));
        Ok(())
    }

    #[test]
    fn corpus_configuration_is_read_from_json() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("corpus.json");
        fs::write(
            &path,
            r#"[{"path": "/assets/pdfs/a.pdf", "name": "a.pdf", "displayName": "A", "category": "Estándares"}]"#,
        )?;

        let sources = load_sources(&path)?;
        assert_eq!(sources, vec![source("/assets/pdfs/a.pdf", "A", "Estándares")]);
        Ok(())
    }

    #[test]
    fn default_sources_point_at_bundled_assets() {
        let sources = default_sources();
        assert_eq!(sources.len(), 6);
        assert!(sources
            .iter()
            .all(|source| source.path.starts_with("/assets/pdfs/") && source.category == "Estándares"));
    }
}
