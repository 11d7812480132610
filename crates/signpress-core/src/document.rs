//! Loading and saving the source PDF
//!
//! Thin wrapper around `lopdf::Document` scoped to one composition pass:
//! the handle is exclusively owned by the call that opened it and is
//! dropped on every exit path.

use std::path::Path;

use lopdf::{Document, Object, ObjectId};

use crate::coords::PageSize;
use crate::error::ComposeError;

/// How far up the page tree to look for an inherited MediaBox.
const PARENT_LOOKUP_DEPTH: usize = 8;

/// An opened source PDF.
pub struct SourceDocument {
    doc: Document,
}

impl SourceDocument {
    /// Open a PDF from disk.
    pub fn open(path: &Path) -> Result<Self, ComposeError> {
        let doc = Document::load(path)
            .map_err(|e| ComposeError::SourceOpen(format!("{}: {}", path.display(), e)))?;
        Ok(Self { doc })
    }

    /// Load a PDF from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ComposeError> {
        let doc = Document::load_mem(bytes).map_err(|e| ComposeError::SourceOpen(e.to_string()))?;
        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Object id for a 1-indexed page number.
    pub fn page_id(&self, page_number: u32) -> Option<ObjectId> {
        self.doc.get_pages().get(&page_number).copied()
    }

    /// Native size of a page, from its MediaBox. Falls back to the page
    /// tree's inherited MediaBox, then to US Letter.
    pub fn page_size(&self, page_id: ObjectId) -> PageSize {
        self.media_box(page_id)
            .map(|[x0, y0, x1, y1]| PageSize::new(x1 - x0, y1 - y0))
            .unwrap_or_else(PageSize::letter)
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Garbage-collect unreferenced objects, deflate streams, and
    /// serialize. Repeated image embeds stay bounded this way.
    pub fn save_compacted(&mut self) -> Result<Vec<u8>, ComposeError> {
        self.doc.prune_objects();
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| ComposeError::Serialization(e.to_string()))?;
        Ok(buffer)
    }

    /// MediaBox as `[x0, y0, x1, y1]`, walking up the page tree when the
    /// page itself carries none.
    fn media_box(&self, page_id: ObjectId) -> Option<[f64; 4]> {
        let mut current = page_id;
        for _ in 0..PARENT_LOOKUP_DEPTH {
            let dict = self.doc.get_object(current).ok()?.as_dict().ok()?;
            if let Ok(obj) = dict.get(b"MediaBox") {
                if let Some(rect) = self.parse_rect(obj) {
                    return Some(rect);
                }
            }
            current = dict.get(b"Parent").ok()?.as_reference().ok()?;
        }
        None
    }

    fn parse_rect(&self, obj: &Object) -> Option<[f64; 4]> {
        let arr = match obj {
            Object::Array(a) => a,
            Object::Reference(id) => self.doc.get_object(*id).ok()?.as_array().ok()?,
            _ => return None,
        };
        if arr.len() != 4 {
            return None;
        }

        let mut values = [0.0f64; 4];
        for (value, obj) in values.iter_mut().zip(arr) {
            *value = self.extract_number(obj)?;
        }
        Some(values)
    }

    fn extract_number(&self, obj: &Object) -> Option<f64> {
        match obj {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            Object::Reference(id) => self.extract_number(self.doc.get_object(*id).ok()?),
            _ => None,
        }
    }
}

/// Build a minimal valid PDF in memory. Test helper shared by the
/// engine's test modules.
#[cfg(test)]
pub(crate) fn test_pdf(num_pages: u32) -> Vec<u8> {
    use lopdf::{content::Content, content::Operation, Dictionary, Stream};

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut page_ids = Vec::new();
    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                ),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Page {}", i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Dictionary;

    #[test]
    fn test_from_bytes_valid_pdf() {
        let source = SourceDocument::from_bytes(&test_pdf(3)).unwrap();
        assert_eq!(source.page_count(), 3);
    }

    #[test]
    fn test_from_bytes_garbage_fails() {
        assert!(matches!(
            SourceDocument::from_bytes(&[0u8; 100]),
            Err(ComposeError::SourceOpen(_))
        ));
    }

    #[test]
    fn test_from_bytes_empty_fails() {
        assert!(SourceDocument::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let result = SourceDocument::open(Path::new("/nonexistent/source.pdf"));
        assert!(matches!(result, Err(ComposeError::SourceOpen(_))));
    }

    #[test]
    fn test_page_id_lookup() {
        let source = SourceDocument::from_bytes(&test_pdf(2)).unwrap();
        assert!(source.page_id(1).is_some());
        assert!(source.page_id(2).is_some());
        assert!(source.page_id(3).is_none());
        assert!(source.page_id(0).is_none());
    }

    #[test]
    fn test_page_size_from_media_box() {
        let source = SourceDocument::from_bytes(&test_pdf(1)).unwrap();
        let page_id = source.page_id(1).unwrap();
        let size = source.page_size(page_id);
        assert_eq!(size.width, 612.0);
        assert_eq!(size.height, 792.0);
    }

    #[test]
    fn test_page_size_defaults_to_letter_without_media_box() {
        // Page with no MediaBox anywhere in its tree.
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(Dictionary::from_iter(vec![(
            "Type",
            Object::Name(b"Page".to_vec()),
        )]));
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(1)),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
        ]);
        let pages_id = doc.add_object(pages);
        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();

        let source = SourceDocument::from_bytes(&buffer).unwrap();
        let page_id = source.page_id(1).unwrap();
        let size = source.page_size(page_id);
        assert_eq!(size.width, 612.0);
        assert_eq!(size.height, 792.0);
    }

    #[test]
    fn test_save_compacted_roundtrips() {
        let mut source = SourceDocument::from_bytes(&test_pdf(2)).unwrap();
        let bytes = source.save_compacted().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let reopened = SourceDocument::from_bytes(&bytes).unwrap();
        assert_eq!(reopened.page_count(), 2);
    }
}
