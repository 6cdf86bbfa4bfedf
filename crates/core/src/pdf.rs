use crate::error::ExtractError;
use crate::models::DocumentMetadata;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_INHERITANCE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub transform: [f32; 6],
}

impl TextRun {
    pub fn vertical_offset(&self) -> f32 {
        self.transform[5]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    PaintImage(String),
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePixels {
    Rgb8(Vec<u8>),
    Gray8(Vec<u8>),
    Encoded(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub pixels: ImagePixels,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

#[async_trait]
pub trait PdfDecoder: Send + Sync {
    async fn decode(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, ExtractError>;
}

#[async_trait]
pub trait PdfDocument: Send + Sync {
    fn num_pages(&self) -> u32;

    async fn page(&self, number: u32) -> Result<Box<dyn PdfPage>, ExtractError>;

    async fn metadata(&self) -> Result<DocumentMetadata, ExtractError>;
}

/// A single decoded page.
///
/// Text run transforms use a top-left origin, so a larger vertical offset
/// means further down the page.
#[async_trait]
pub trait PdfPage: Send + Sync {
    fn number(&self) -> u32;

    async fn text_content(&self) -> Result<Vec<TextRun>, ExtractError>;

    async fn operator_list(&self) -> Result<Vec<DrawOp>, ExtractError>;

    async fn resolve_image(&self, name: &str) -> Result<RawImage, ExtractError>;

    fn viewport(&self, scale: f32) -> Viewport;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfDecoder;

#[async_trait]
impl PdfDecoder for LopdfDecoder {
    async fn decode(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>, ExtractError> {
        let document = tokio::task::spawn_blocking(move || Document::load_mem(&bytes))
            .await
            .map_err(|error| ExtractError::Decode(error.to_string()))?
            .map_err(|error| ExtractError::Decode(error.to_string()))?;

        Ok(Box::new(LopdfDocument::new(document)))
    }
}

pub struct LopdfDocument {
    inner: Arc<Document>,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfDocument {
    pub fn new(document: Document) -> Self {
        let pages = document.get_pages();
        Self {
            inner: Arc::new(document),
            pages,
        }
    }
}

#[async_trait]
impl PdfDocument for LopdfDocument {
    fn num_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn page(&self, number: u32) -> Result<Box<dyn PdfPage>, ExtractError> {
        let id = *self
            .pages
            .get(&number)
            .ok_or(ExtractError::PageOutOfRange {
                page: number,
                total: self.num_pages(),
            })?;

        Ok(Box::new(LopdfPage {
            document: Arc::clone(&self.inner),
            number,
            id,
        }))
    }

    async fn metadata(&self) -> Result<DocumentMetadata, ExtractError> {
        let info = self
            .inner
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|object| resolve(&self.inner, object))
            .and_then(|object| object.as_dict().ok());

        let Some(info) = info else {
            return Ok(DocumentMetadata::default());
        };

        let text = |key: &[u8]| {
            info.get(key)
                .ok()
                .and_then(|object| resolve(&self.inner, object))
                .and_then(object_text)
                .filter(|value| !value.trim().is_empty())
        };

        Ok(DocumentMetadata {
            title: text(b"Title"),
            author: text(b"Author"),
            creation_date: text(b"CreationDate").and_then(|value| parse_pdf_date(&value)),
            modification_date: text(b"ModDate").and_then(|value| parse_pdf_date(&value)),
        })
    }
}

struct LopdfPage {
    document: Arc<Document>,
    number: u32,
    id: ObjectId,
}

impl LopdfPage {
    fn operations(&self) -> Result<Vec<lopdf::content::Operation>, ExtractError> {
        let bytes = self
            .document
            .get_page_content(self.id)
            .map_err(|error| self.text_error(error))?;
        let content = Content::decode(&bytes).map_err(|error| self.text_error(error))?;
        Ok(content.operations)
    }

    fn text_error(&self, error: impl std::fmt::Display) -> ExtractError {
        ExtractError::PageText {
            page: self.number,
            details: error.to_string(),
        }
    }

    fn inherited(&self, key: &[u8]) -> Option<&Object> {
        let mut current = self.id;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            let dictionary = self.document.get_dictionary(current).ok()?;
            if let Ok(value) = dictionary.get(key) {
                return resolve(&self.document, value);
            }
            current = dictionary.get(b"Parent").ok()?.as_reference().ok()?;
        }
        None
    }

    fn xobjects(&self) -> Option<&Dictionary> {
        let resources = self.inherited(b"Resources")?.as_dict().ok()?;
        let xobjects = resources.get(b"XObject").ok()?;
        resolve(&self.document, xobjects)?.as_dict().ok()
    }

    fn is_image(&self, name: &str) -> bool {
        self.xobjects()
            .and_then(|xobjects| xobjects.get(name.as_bytes()).ok())
            .and_then(|object| resolve(&self.document, object))
            .and_then(|object| object.as_stream().ok())
            .and_then(|stream| stream.dict.get(b"Subtype").ok())
            .and_then(|subtype| subtype.as_name().ok())
            .is_some_and(|subtype| subtype == b"Image")
    }

    fn media_box(&self) -> Option<[f32; 4]> {
        let values = self.inherited(b"MediaBox")?.as_array().ok()?;
        if values.len() != 4 {
            return None;
        }
        let mut media_box = [0f32; 4];
        for (slot, value) in media_box.iter_mut().zip(values) {
            *slot = number(resolve(&self.document, value)?)?;
        }
        Some(media_box)
    }
}

#[async_trait]
impl PdfPage for LopdfPage {
    fn number(&self) -> u32 {
        self.number
    }

    async fn text_content(&self) -> Result<Vec<TextRun>, ExtractError> {
        let page_height = self.viewport(1.0).height;
        let encodings = self
            .document
            .get_page_fonts(self.id)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, font)| {
                font.get_font_encoding(&self.document)
                    .ok()
                    .map(|encoding| (name, encoding))
            })
            .collect::<BTreeMap<Vec<u8>, _>>();

        let decode = |font: Option<&[u8]>, bytes: &[u8]| {
            font.and_then(|name| encodings.get(name))
                .and_then(|encoding| Document::decode_text(encoding, bytes).ok())
                .unwrap_or_else(|| decode_pdf_string(bytes))
        };
        let mut runs = runs_from_operations(&self.operations()?, decode);

        if runs.is_empty() {
            let text = self
                .document
                .extract_text(&[self.number])
                .map_err(|error| self.text_error(error))?;
            return Ok(text
                .lines()
                .enumerate()
                .map(|(index, line)| TextRun {
                    text: line.to_string(),
                    transform: [1.0, 0.0, 0.0, 1.0, 0.0, index as f32],
                })
                .collect());
        }

        for run in &mut runs {
            run.transform[5] = page_height - run.transform[5];
        }
        Ok(runs)
    }

    async fn operator_list(&self) -> Result<Vec<DrawOp>, ExtractError> {
        Ok(self
            .operations()?
            .into_iter()
            .map(|operation| {
                let target = (operation.operator == "Do")
                    .then(|| operation.operands.first())
                    .flatten()
                    .and_then(|operand| operand.as_name().ok())
                    .map(|name| String::from_utf8_lossy(name).into_owned());

                match target {
                    Some(name) if self.is_image(&name) => DrawOp::PaintImage(name),
                    _ => DrawOp::Other(operation.operator),
                }
            })
            .collect())
    }

    async fn resolve_image(&self, name: &str) -> Result<RawImage, ExtractError> {
        let image_error = |details: &str| ExtractError::Image {
            name: name.to_string(),
            details: details.to_string(),
        };

        let stream = self
            .xobjects()
            .and_then(|xobjects| xobjects.get(name.as_bytes()).ok())
            .and_then(|object| resolve(&self.document, object))
            .and_then(|object| object.as_stream().ok())
            .ok_or_else(|| image_error("xobject not found"))?;

        let dimension = |key: &[u8]| {
            stream
                .dict
                .get(key)
                .ok()
                .and_then(|object| object.as_i64().ok())
                .and_then(|value| u32::try_from(value).ok())
        };
        let width = dimension(b"Width").ok_or_else(|| image_error("missing width"))?;
        let height = dimension(b"Height").ok_or_else(|| image_error("missing height"))?;

        let filter = stream
            .dict
            .get(b"Filter")
            .ok()
            .and_then(|object| match object {
                Object::Array(filters) => filters.last(),
                other => Some(other),
            })
            .and_then(|object| object.as_name().ok());

        if matches!(filter, Some(b"DCTDecode") | Some(b"JPXDecode")) {
            return Ok(RawImage {
                width,
                height,
                pixels: ImagePixels::Encoded(stream.content.clone()),
            });
        }

        let bits = stream
            .dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|object| object.as_i64().ok())
            .unwrap_or(8);
        if bits != 8 {
            return Err(image_error("only 8-bit components are supported"));
        }

        let color_space = stream
            .dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|object| resolve(&self.document, object))
            .and_then(|object| object.as_name().ok());

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let pixels = match color_space {
            Some(b"DeviceRGB") => ImagePixels::Rgb8(data),
            Some(b"DeviceGray") => ImagePixels::Gray8(data),
            _ => return Err(image_error("unsupported color space")),
        };

        Ok(RawImage {
            width,
            height,
            pixels,
        })
    }

    fn viewport(&self, scale: f32) -> Viewport {
        self.media_box()
            .map(|[x0, y0, x1, y1]| Viewport {
                width: (x1 - x0).abs() * scale,
                height: (y1 - y0).abs() * scale,
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
struct TextState {
    matrix: [f32; 6],
    line_matrix: [f32; 6],
    leading: f32,
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl TextState {
    fn new() -> Self {
        Self {
            matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
        }
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.line_matrix;
        self.line_matrix = [a, b, c, d, e + tx * a + ty * c, f + tx * b + ty * d];
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }
}

/// Walks a content stream and emits one run per text-showing operator.
/// `decode` turns string bytes into text using the font selected by the
/// last `Tf`, or `None` when no font was selected.
fn runs_from_operations<F>(operations: &[lopdf::content::Operation], decode: F) -> Vec<TextRun>
where
    F: Fn(Option<&[u8]>, &[u8]) -> String,
{
    let mut state = TextState::new();
    let mut font: Option<Vec<u8>> = None;
    let mut runs = Vec::new();

    for operation in operations {
        let operands = &operation.operands;
        let numbers = || operands.iter().filter_map(number).collect::<Vec<_>>();

        match operation.operator.as_str() {
            "BT" => state = TextState::new(),
            "Tf" => {
                if let Some(Ok(name)) = operands.first().map(Object::as_name) {
                    font = Some(name.to_vec());
                }
            }
            "Tm" => {
                if let Ok(matrix) = <[f32; 6]>::try_from(numbers()) {
                    state.matrix = matrix;
                    state.line_matrix = matrix;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = numbers()[..] {
                    if operation.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate(tx, ty);
                }
            }
            "TL" => {
                if let [leading] = numbers()[..] {
                    state.leading = leading;
                }
            }
            "T*" => state.next_line(),
            "Tj" | "'" | "\"" => {
                if operation.operator != "Tj" {
                    state.next_line();
                }
                let text = operands
                    .last()
                    .and_then(string_bytes)
                    .map(|bytes| decode(font.as_deref(), bytes));
                if let Some(text) = text {
                    push_run(&mut runs, text, state.matrix);
                }
            }
            "TJ" => {
                let text = operands
                    .first()
                    .and_then(|operand| operand.as_array().ok())
                    .map(|parts| {
                        parts
                            .iter()
                            .map(|part| match part {
                                Object::String(bytes, _) => decode(font.as_deref(), bytes),
                                other if number(other).is_some_and(|gap| gap < -200.0) => {
                                    " ".to_string()
                                }
                                _ => String::new(),
                            })
                            .collect::<String>()
                    });
                if let Some(text) = text {
                    push_run(&mut runs, text, state.matrix);
                }
            }
            _ => {}
        }
    }

    runs
}

fn push_run(runs: &mut Vec<TextRun>, text: String, transform: [f32; 6]) {
    if !text.trim().is_empty() {
        runs.push(TextRun { text, transform });
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn string_bytes(object: &Object) -> Option<&[u8]> {
    match object {
        Object::String(bytes, _) => Some(bytes),
        _ => None,
    }
}

/// Text strings outside content streams (the Info dictionary) are either
/// UTF-16BE with a byte order mark or PDFDocEncoding, whose printable range
/// matches Latin-1.
fn object_text(object: &Object) -> Option<String> {
    string_bytes(object).map(decode_pdf_string)
}

fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

/// Parses `D:YYYYMMDDHHmmSSOHH'mm'` dates; every part after the year is optional.
pub fn parse_pdf_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    let raw = trimmed.strip_prefix("D:").unwrap_or(trimmed);
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return None;
    }

    let part = |start: usize, len: usize, default: u32| {
        digits
            .get(start..start + len)
            .and_then(|slice| slice.parse::<u32>().ok())
            .unwrap_or(default)
    };
    let year = i32::try_from(part(0, 4, 0)).ok()?;
    let naive = NaiveDate::from_ymd_opt(year, part(4, 2, 1), part(6, 2, 1))?
        .and_hms_opt(part(8, 2, 0), part(10, 2, 0), part(12, 2, 0))?;

    let zone = &raw[digits.len()..];
    let offset_seconds = match zone.chars().next() {
        Some(sign @ ('+' | '-')) => {
            let zone_digits: String = zone.chars().filter(char::is_ascii_digit).collect();
            let hours = zone_digits.get(0..2).and_then(|h| h.parse::<i32>().ok()).unwrap_or(0);
            let minutes = zone_digits.get(2..4).and_then(|m| m.parse::<i32>().ok()).unwrap_or(0);
            let seconds = hours * 3600 + minutes * 60;
            if sign == '-' {
                -seconds
            } else {
                seconds
            }
        }
        _ => 0,
    };

    let offset = FixedOffset::east_opt(offset_seconds)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|moment| moment.with_timezone(&Utc))
}
