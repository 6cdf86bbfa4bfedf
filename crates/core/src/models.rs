use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub path: String,
    pub name: String,
    pub display_name: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentOrigin {
    Extracted,
    Placeholder,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub display_name: String,
    pub category: String,
    pub pages: u32,
    pub size: u64,
    pub text_content: Vec<Page>,
    pub metadata: Option<DocumentMetadata>,
    pub url: Option<String>,
    pub title: String,
    pub checksum: Option<String>,
    pub origin: DocumentOrigin,
}

impl Document {
    pub fn page(&self, number: u32) -> Option<&Page> {
        self.text_content.iter().find(|page| page.page == number)
    }

    pub fn author(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.author.as_deref())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageImage {
    pub data: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub page: u32,
    pub text: String,
    pub images: Vec<PageImage>,
    pub page_size: PageSize,
}

impl Page {
    pub fn failed(number: u32) -> Self {
        Self {
            page: number,
            text: format!("Error al procesar la página {number}"),
            images: Vec::new(),
            page_size: PageSize::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub file_name: String,
    pub document_name: String,
    pub page: u32,
    pub contexts: Vec<String>,
    pub score: f64,
    pub matches: usize,
    pub category: String,
    pub url: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub batch_size: usize,
    pub min_image_dimension: u32,
    pub image_timeout: Duration,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            batch_size: 3,
            min_image_dimension: 100,
            image_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: usize,
    pub context_radius: usize,
    pub min_term_chars: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 20,
            context_radius: 100,
            min_term_chars: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub fetch_timeout: Duration,
    pub extraction: ExtractionOptions,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            extraction: ExtractionOptions::default(),
        }
    }
}
