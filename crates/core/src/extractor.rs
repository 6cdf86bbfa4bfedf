use crate::error::ExtractError;
use crate::models::{ExtractionOptions, Page, PageImage, PageSize};
use crate::normalizer::normalize;
use crate::pdf::{DrawOp, ImagePixels, PdfDocument, PdfPage, RawImage, TextRun};
use base64::{engine::general_purpose::STANDARD, Engine};
use futures::future::join_all;
use futures::stream::{self, Stream, StreamExt};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct PageExtractor {
    options: ExtractionOptions,
}

impl PageExtractor {
    pub fn new(options: ExtractionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    pub async fn extract_pages(&self, document: &dyn PdfDocument) -> Vec<Page> {
        self.page_stream(document).collect().await
    }

    /// Lazily yields pages in page-number order, one batch at a time.
    ///
    /// Pages inside a batch are extracted concurrently; the next batch starts
    /// only after the previous one finished. Calling this again restarts from
    /// page 1.
    pub fn page_stream<'a>(
        &'a self,
        document: &'a dyn PdfDocument,
    ) -> impl Stream<Item = Page> + 'a {
        let batches = page_batches(document.num_pages(), self.options.batch_size);
        stream::iter(batches)
            .then(move |batch| self.extract_batch(document, batch))
            .flat_map(stream::iter)
    }

    async fn extract_batch(&self, document: &dyn PdfDocument, batch: Vec<u32>) -> Vec<Page> {
        let mut pages = join_all(
            batch
                .into_iter()
                .map(|number| self.extract_page(document, number)),
        )
        .await;
        pages.sort_by_key(|page| page.page);
        pages
    }

    async fn extract_page(&self, document: &dyn PdfDocument, number: u32) -> Page {
        match self.try_extract_page(document, number).await {
            Ok(page) => page,
            Err(error) => {
                warn!(page = number, %error, "page extraction failed, using placeholder text");
                Page::failed(number)
            }
        }
    }

    async fn try_extract_page(
        &self,
        document: &dyn PdfDocument,
        number: u32,
    ) -> Result<Page, ExtractError> {
        let page = document.page(number).await?;
        let runs = page.text_content().await?;
        let text = normalize(&join_runs_into_lines(&runs));

        let images = match self.extract_images(page.as_ref()).await {
            Ok(images) => images,
            Err(error) => {
                warn!(page = number, %error, "image extraction failed");
                Vec::new()
            }
        };

        let viewport = page.viewport(1.0);
        Ok(Page {
            page: number,
            text,
            images,
            page_size: PageSize {
                width: viewport.width,
                height: viewport.height,
            },
        })
    }

    async fn extract_images(&self, page: &dyn PdfPage) -> Result<Vec<PageImage>, ExtractError> {
        let names = page
            .operator_list()
            .await?
            .into_iter()
            .filter_map(|operation| match operation {
                DrawOp::PaintImage(name) => Some(name),
                DrawOp::Other(_) => None,
            });

        let resolved = join_all(names.map(|name| self.extract_image(page, name))).await;

        Ok(resolved
            .into_iter()
            .filter_map(|result| match result {
                Ok(image) => image,
                Err(error) => {
                    debug!(page = page.number(), %error, "skipping image");
                    None
                }
            })
            .collect())
    }

    async fn extract_image(
        &self,
        page: &dyn PdfPage,
        name: String,
    ) -> Result<Option<PageImage>, ExtractError> {
        let timeout = self.options.image_timeout;
        let raw = tokio::time::timeout(timeout, page.resolve_image(&name))
            .await
            .map_err(|_| ExtractError::ImageTimeout {
                name: name.clone(),
                timeout,
            })??;

        let minimum = self.options.min_image_dimension;
        if raw.width <= minimum || raw.height <= minimum {
            return Ok(None);
        }

        encode_png(&name, raw).map(Some)
    }
}

pub fn page_batches(num_pages: u32, batch_size: usize) -> Vec<Vec<u32>> {
    let pages = (1..=num_pages).collect::<Vec<_>>();
    pages
        .chunks(batch_size.max(1))
        .map(<[u32]>::to_vec)
        .collect()
}

/// Rebuilds reading order from positioned runs: runs sharing a rounded
/// vertical offset form one line, lines are emitted top to bottom.
pub fn join_runs_into_lines(runs: &[TextRun]) -> String {
    let mut lines: BTreeMap<i64, Vec<&str>> = BTreeMap::new();
    for run in runs {
        lines
            .entry(run.vertical_offset().round() as i64)
            .or_default()
            .push(run.text.as_str());
    }

    lines
        .into_values()
        .map(|words| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_png(name: &str, raw: RawImage) -> Result<PageImage, ExtractError> {
    let RawImage {
        width,
        height,
        pixels,
    } = raw;

    let decoded = match pixels {
        ImagePixels::Rgb8(data) => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        ImagePixels::Gray8(data) => {
            GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
        }
        ImagePixels::Encoded(bytes) => Some(image::load_from_memory(&bytes)?),
    }
    .ok_or_else(|| ExtractError::Image {
        name: name.to_string(),
        details: format!("pixel buffer does not match {width}x{height}"),
    })?;

    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    Ok(PageImage {
        data: format!("data:image/png;base64,{}", STANDARD.encode(&png)),
        width,
        height,
        format: "png".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDocument, FakeImage, FakePage};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn run(text: &str, y: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            transform: [1.0, 0.0, 0.0, 1.0, 0.0, y],
        }
    }

    #[test]
    fn batches_cover_every_page_in_groups_of_three() {
        assert_eq!(
            page_batches(7, 3),
            vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]
        );
        assert!(page_batches(0, 3).is_empty());
    }

    #[test]
    fn runs_are_grouped_by_rounded_vertical_offset() {
        let runs = vec![
            run("mínima", 20.2),
            run("Altura", 19.8),
            run("alambrado", 10.0),
            run("Especificaciones", 10.4),
        ];
        assert_eq!(
            join_runs_into_lines(&runs),
            "alambrado Especificaciones\nmínima Altura"
        );
    }

    #[tokio::test]
    async fn failed_page_keeps_its_slot_with_placeholder_text() {
        let document = FakeDocument::new(vec![
            FakePage::text("primera página"),
            FakePage::failing(),
            FakePage::text("tercera página"),
        ]);

        let pages = PageExtractor::default().extract_pages(&document).await;

        let numbers = pages.iter().map(|page| page.page).collect::<Vec<_>>();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(pages[1].text, "Error al procesar la página 2");
        assert!(pages[1].images.is_empty());
        assert_eq!(pages[2].text, "tercera página");
    }

    #[tokio::test]
    async fn completion_order_does_not_change_page_order() {
        let pages = (0..7u64)
            .map(|index| {
                FakePage::text(&format!("contenido {index}"))
                    .with_delay(Duration::from_millis(70 - index * 10))
            })
            .collect();
        let document = FakeDocument::new(pages);

        let extracted = PageExtractor::default().extract_pages(&document).await;

        let numbers = extracted.iter().map(|page| page.page).collect::<Vec<_>>();
        assert_eq!(numbers, (1..=7).collect::<Vec<_>>());
        assert_eq!(extracted[0].text, "contenido 0");
    }

    #[tokio::test]
    async fn at_most_one_batch_is_in_flight() {
        let pages = (0..8)
            .map(|_| FakePage::text("texto").with_delay(Duration::from_millis(15)))
            .collect();
        let document = FakeDocument::new(pages);

        PageExtractor::default().extract_pages(&document).await;

        assert_eq!(document.peak_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn small_and_slow_images_are_skipped() {
        let page = FakePage::text("con imágenes")
            .with_image("logo", FakeImage::gray(50, 50))
            .with_image("foto", FakeImage::gray(120, 110))
            .with_image("lenta", FakeImage::gray(300, 300).slow(Duration::from_millis(300)))
            .with_image("rota", FakeImage::broken());
        let document = FakeDocument::new(vec![page]);
        let extractor = PageExtractor::new(ExtractionOptions {
            image_timeout: Duration::from_millis(50),
            ..ExtractionOptions::default()
        });

        let pages = extractor.extract_pages(&document).await;

        assert_eq!(pages[0].images.len(), 1);
        let image = &pages[0].images[0];
        assert_eq!((image.width, image.height), (120, 110));
        assert_eq!(image.format, "png");
        assert!(image.data.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn stream_is_restartable() {
        let document = FakeDocument::new(vec![FakePage::text("uno"), FakePage::text("dos")]);
        let extractor = PageExtractor::default();

        let first = extractor.page_stream(&document).collect::<Vec<_>>().await;
        let second = extractor.page_stream(&document).collect::<Vec<_>>().await;

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
