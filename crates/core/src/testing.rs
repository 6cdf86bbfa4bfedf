use crate::error::ExtractError;
use crate::models::DocumentMetadata;
use crate::pdf::{DrawOp, ImagePixels, PdfDecoder, PdfDocument, PdfPage, RawImage, TextRun, Viewport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct FakeImage {
    raw: Option<RawImage>,
    delay: Duration,
}

impl FakeImage {
    pub(crate) fn gray(width: u32, height: u32) -> Self {
        Self {
            raw: Some(RawImage {
                width,
                height,
                pixels: ImagePixels::Gray8(vec![128; (width * height) as usize]),
            }),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn broken() -> Self {
        Self {
            raw: None,
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakePage {
    text: Option<String>,
    delay: Duration,
    images: Vec<(String, FakeImage)>,
}

impl FakePage {
    pub(crate) fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            delay: Duration::ZERO,
            images: Vec::new(),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            text: None,
            delay: Duration::ZERO,
            images: Vec::new(),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_image(mut self, name: &str, image: FakeImage) -> Self {
        self.images.push((name.to_string(), image));
        self
    }
}

pub(crate) struct FakeDocument {
    pages: Vec<FakePage>,
    metadata: DocumentMetadata,
    in_flight: Arc<AtomicUsize>,
    pub(crate) peak_in_flight: Arc<AtomicUsize>,
}

impl FakeDocument {
    pub(crate) fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            metadata: DocumentMetadata::default(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[async_trait]
impl PdfDocument for FakeDocument {
    fn num_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn page(&self, number: u32) -> Result<Box<dyn PdfPage>, ExtractError> {
        let spec = number
            .checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
            .cloned()
            .ok_or(ExtractError::PageOutOfRange {
                page: number,
                total: self.num_pages(),
            })?;

        Ok(Box::new(FakePageHandle {
            number,
            spec,
            in_flight: Arc::clone(&self.in_flight),
            peak_in_flight: Arc::clone(&self.peak_in_flight),
        }))
    }

    async fn metadata(&self) -> Result<DocumentMetadata, ExtractError> {
        Ok(self.metadata.clone())
    }
}

struct FakePageHandle {
    number: u32,
    spec: FakePage,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

#[async_trait]
impl PdfPage for FakePageHandle {
    fn number(&self) -> u32 {
        self.number
    }

    async fn text_content(&self) -> Result<Vec<TextRun>, ExtractError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.spec.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let text = self.spec.text.as_ref().ok_or(ExtractError::PageText {
            page: self.number,
            details: "simulated failure".to_string(),
        })?;

        Ok(text
            .lines()
            .enumerate()
            .map(|(index, line)| TextRun {
                text: line.to_string(),
                transform: [1.0, 0.0, 0.0, 1.0, 0.0, index as f32 * 12.0],
            })
            .collect())
    }

    async fn operator_list(&self) -> Result<Vec<DrawOp>, ExtractError> {
        let mut operations = vec![DrawOp::Other("BT".to_string())];
        operations.extend(
            self.spec
                .images
                .iter()
                .map(|(name, _)| DrawOp::PaintImage(name.clone())),
        );
        Ok(operations)
    }

    async fn resolve_image(&self, name: &str) -> Result<RawImage, ExtractError> {
        let image = self
            .spec
            .images
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, image)| image.clone())
            .ok_or_else(|| ExtractError::Image {
                name: name.to_string(),
                details: "unknown image".to_string(),
            })?;

        tokio::time::sleep(image.delay).await;
        image.raw.ok_or_else(|| ExtractError::Image {
            name: name.to_string(),
            details: "simulated failure".to_string(),
        })
    }

    fn viewport(&self, scale: f32) -> Viewport {
        Viewport {
            width: 612.0 * scale,
            height: 792.0 * scale,
        }
    }
}

/// Decodes UTF-8 bytes as a document whose pages are separated by form feeds.
/// Bytes starting with `%BROKEN` fail to decode.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FakeDecoder;

#[async_trait]
impl PdfDecoder for FakeDecoder {
    async fn decode(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, ExtractError> {
        if bytes.starts_with(b"%BROKEN") {
            return Err(ExtractError::Decode("simulated decode failure".to_string()));
        }
        let text = String::from_utf8_lossy(&bytes);
        let pages = text.split('\u{000c}').map(FakePage::text).collect();
        Ok(Box::new(FakeDocument::new(pages)))
    }
}
