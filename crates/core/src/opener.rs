use crate::models::{Document, SearchResult};
use std::borrow::Borrow;
use tracing::debug;

/// Receives "open this page" requests coming from search result interaction.
pub trait DocumentOpener {
    fn on_document_click(&mut self, document: &Document, page: u32);
}

/// Resolves a result back to its document, by display name first and then
/// by file name, and hands it to the opener. Returns `false` when the
/// document is not part of the corpus.
pub fn open_result<D, O>(corpus: &[D], result: &SearchResult, opener: &mut O) -> bool
where
    D: Borrow<Document>,
    O: DocumentOpener + ?Sized,
{
    open_by_name(corpus, &result.file_name, result.page, opener)
        || open_by_name(corpus, &result.document_name, result.page, opener)
}

pub fn open_by_name<D, O>(corpus: &[D], name: &str, page: u32, opener: &mut O) -> bool
where
    D: Borrow<Document>,
    O: DocumentOpener + ?Sized,
{
    for item in corpus {
        let document: &Document = item.borrow();
        if document.display_name == name || document.name == name {
            debug!(document = %document.name, page, "opening document");
            opener.on_document_click(document, page);
            return true;
        }
    }
    false
}
