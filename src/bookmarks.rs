//! PDF outline (bookmark) injection built on top of `lopdf`.
//!
//! The renderer records the first page of every section while laying the
//! document out; [`apply_outline`] reopens the finished bytes and adds one
//! top-level outline item per section pointing at that page.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

/// Errors that can occur while embedding bookmarks into a rendered PDF document.
#[derive(Debug, thiserror::Error)]
pub enum BookmarkError {
    /// The PDF bytes could not be parsed or written by `lopdf`.
    #[error("failed to process PDF bytes: {0}")]
    Parse(#[from] lopdf::Error),
    /// The trailer has no usable `/Root` reference.
    #[error("PDF catalog entry is missing")]
    MissingCatalog,
    /// The catalog object is not a dictionary.
    #[error("PDF catalog entry is not a dictionary")]
    InvalidCatalog,
    /// A bookmark points past the last rendered page.
    #[error("bookmark '{title}' refers to missing page {page_number}")]
    MissingPage {
        /// Bookmark title.
        title: String,
        /// Requested 1-indexed page.
        page_number: usize,
    },
}

/// A bookmark to add to the outline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineTarget {
    /// Text shown in the viewer's outline panel.
    pub title: String,
    /// First page (1-indexed) of the bookmarked content; `None` skips the entry.
    pub page: Option<usize>,
}

/// Adds a flat outline with one `/Dest [page /Fit]` item per target that has
/// a page.
///
/// Returns the input unchanged when no target has a page.
pub fn apply_outline(pdf_bytes: &[u8], targets: &[OutlineTarget]) -> Result<Vec<u8>, BookmarkError> {
    let mut document = Document::load_mem(pdf_bytes)?;
    let pages = document.get_pages();

    let mut resolved = Vec::new();
    for target in targets {
        let Some(page_number) = target.page else {
            continue;
        };
        let page = u32::try_from(page_number)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or_else(|| BookmarkError::MissingPage {
                title: target.title.clone(),
                page_number,
            })?;
        resolved.push((target.title.as_str(), page));
    }
    if resolved.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let catalog_id = catalog_id(&document)?;
    let root_id = document.new_object_id();
    let item_ids: Vec<ObjectId> = resolved.iter().map(|_| document.new_object_id()).collect();

    for (index, (title, page)) in resolved.iter().enumerate() {
        let mut item = Dictionary::new();
        item.set("Title", text_string(title));
        item.set("Parent", Object::Reference(root_id));
        item.set(
            "Dest",
            Object::Array(vec![Object::Reference(*page), Object::Name(b"Fit".to_vec())]),
        );
        if let Some(prev) = index.checked_sub(1).map(|prev| item_ids[prev]) {
            item.set("Prev", Object::Reference(prev));
        }
        if let Some(next) = item_ids.get(index + 1) {
            item.set("Next", Object::Reference(*next));
        }
        document.objects.insert(item_ids[index], Object::Dictionary(item));
    }

    let mut root = Dictionary::new();
    root.set("Type", Object::Name(b"Outlines".to_vec()));
    root.set("Count", Object::Integer(item_ids.len() as i64));
    if let (Some(first), Some(last)) = (item_ids.first(), item_ids.last()) {
        root.set("First", Object::Reference(*first));
        root.set("Last", Object::Reference(*last));
    }
    document.objects.insert(root_id, Object::Dictionary(root));

    let catalog = document
        .objects
        .get_mut(&catalog_id)
        .ok_or(BookmarkError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| BookmarkError::InvalidCatalog)?;
    catalog.set("Outlines", Object::Reference(root_id));
    catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

    let mut buffer = Vec::new();
    document
        .save_to(&mut buffer)
        .map_err(|err| BookmarkError::Parse(err.into()))?;
    Ok(buffer)
}

fn catalog_id(document: &Document) -> Result<ObjectId, BookmarkError> {
    document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)
}

/// Encodes `text` as a PDF text string: literal when ASCII, UTF-16BE with a
/// byte order mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
