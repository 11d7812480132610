//! Burning signature marks into page content
//!
//! The compositor is a one-shot open → iterate → save pipeline: it opens
//! the source document, stamps each mark in input order, and serializes
//! a compacted copy to the output path. The source file is never
//! modified, and a failure anywhere before the final rename leaves no
//! output behind.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::{debug, warn};

use signpress_types::SignatureMark;

use crate::coords::{self, PageSize, PlacementRect};
use crate::document::SourceDocument;
use crate::error::ComposeError;
use crate::payload;

/// Gray tone of the underline and caption.
const MARK_GRAY: f64 = 0.4;

/// Stroke width of the underline.
const UNDERLINE_WIDTH: f64 = 0.5;

/// Caption font size, in points.
const CAPTION_FONT_SIZE: f64 = 7.0;

/// Resource name the caption font is registered under.
const CAPTION_FONT: &str = "SpCaption";

/// Outcome of a successful composition.
#[derive(Debug, Clone, Serialize)]
pub struct Composition {
    pub output_path: PathBuf,
    /// Marks drawn onto a page.
    pub applied: usize,
    /// Marks skipped for a missing payload or an out-of-range page.
    pub skipped: usize,
}

/// Embed `marks` into the PDF at `source_path`, writing the result to
/// `output_path` (parent directories are created as needed).
///
/// Marks are applied in input order, so where rectangles overlap the
/// later mark paints over the earlier one. Marks with no payload or a
/// page outside the document are skipped; a payload that cannot be
/// decoded fails the whole call.
pub fn compose(
    source_path: &Path,
    output_path: &Path,
    marks: &[SignatureMark],
) -> Result<Composition, ComposeError> {
    let mut source = SourceDocument::open(source_path)?;
    let (applied, skipped) = apply_marks(&mut source, marks)?;

    let bytes = source.save_compacted()?;
    write_atomic(output_path, &bytes)?;

    debug!(
        applied,
        skipped,
        output = %output_path.display(),
        "composition complete"
    );

    Ok(Composition {
        output_path: output_path.to_path_buf(),
        applied,
        skipped,
    })
}

/// Stamp every mark onto the opened document, in input order. Returns
/// `(applied, skipped)`.
pub fn apply_marks(
    source: &mut SourceDocument,
    marks: &[SignatureMark],
) -> Result<(usize, usize), ComposeError> {
    let page_count = source.page_count();
    let mut stamper = Stamper::new();
    let mut applied = 0;
    let mut skipped = 0;

    for (index, mark) in marks.iter().enumerate() {
        let Some(data) = mark.image_data.as_deref().filter(|d| !d.is_empty()) else {
            debug!(mark = index, "mark has no payload, skipping");
            skipped += 1;
            continue;
        };

        // Decode before the page check: a corrupt payload aborts the
        // call even when its mark would have been skipped.
        let image_bytes = payload::decode_payload(data)?;

        let Some(page_id) = source.page_id(mark.page_number) else {
            warn!(
                mark = index,
                page = mark.page_number,
                pages = page_count,
                "mark targets a page outside the document, skipping"
            );
            skipped += 1;
            continue;
        };

        let page_size = source.page_size(page_id);
        let rect = coords::resolve(page_size, mark);
        stamper.stamp(
            source.doc_mut(),
            page_id,
            page_size,
            rect,
            mark,
            &image_bytes,
            index,
        )?;
        applied += 1;
    }

    Ok((applied, skipped))
}

/// Draws marks onto pages, tracking the per-document state one pass
/// needs: which pages already had their original content fenced, and the
/// lazily created caption font.
struct Stamper {
    fenced: HashSet<ObjectId>,
    caption_font: Option<ObjectId>,
}

impl Stamper {
    fn new() -> Self {
        Self {
            fenced: HashSet::new(),
            caption_font: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn stamp(
        &mut self,
        doc: &mut Document,
        page_id: ObjectId,
        page: PageSize,
        rect: PlacementRect,
        mark: &SignatureMark,
        image_bytes: &[u8],
        index: usize,
    ) -> Result<(), ComposeError> {
        let raster = payload::raster_xobject(image_bytes)?;

        let smask_id = raster.smask.map(|s| doc.add_object(Object::Stream(s)));
        let mut stream = raster.stream;
        if let Some(id) = smask_id {
            stream.dict.set("SMask", Object::Reference(id));
        }
        let image_id = doc.add_object(Object::Stream(stream));

        let image_name = format!("SpSig{}", index);
        add_resource(doc, page_id, b"XObject", &image_name, image_id)?;

        if mark.signer_name.is_some() {
            let font_id = self.caption_font_id(doc);
            add_resource(doc, page_id, b"Font", CAPTION_FONT, font_id)?;
        }

        // Fence the page's original content in q/Q once, so overlays
        // start from a clean graphics state whatever the original stream
        // leaves behind.
        if self.fenced.insert(page_id) {
            fence_existing_content(doc, page_id)?;
        }

        let content = overlay_content(page, rect, &image_name, mark.signer_name.as_deref());
        append_content(doc, page_id, content)
    }

    fn caption_font_id(&mut self, doc: &mut Document) -> ObjectId {
        *self.caption_font.get_or_insert_with(|| {
            let mut font = Dictionary::new();
            font.set("Type", Object::Name(b"Font".to_vec()));
            font.set("Subtype", Object::Name(b"Type1".to_vec()));
            font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
            doc.add_object(Object::Dictionary(font))
        })
    }
}

/// Build the drawing operators for one mark.
///
/// Placement rects are captured top-left-down; PDF user space runs
/// bottom-up, so every y value flips against the page height here.
fn overlay_content(
    page: PageSize,
    rect: PlacementRect,
    image_name: &str,
    signer_name: Option<&str>,
) -> String {
    let mut content = String::new();

    // Image, scaled into the placement rect
    let image_y = page.height - rect.y1;
    let _ = writeln!(content, "q");
    let _ = writeln!(
        content,
        "{:.4} 0 0 {:.4} {:.4} {:.4} cm",
        rect.width(),
        rect.height(),
        rect.x0,
        image_y
    );
    let _ = writeln!(content, "/{} Do", image_name);
    let _ = writeln!(content, "Q");

    // "Signed here" underline beneath the mark
    let line_y = page.height - rect.underline_y();
    let _ = writeln!(content, "q");
    let _ = writeln!(content, "{} {} {} RG", MARK_GRAY, MARK_GRAY, MARK_GRAY);
    let _ = writeln!(content, "{} w", UNDERLINE_WIDTH);
    let _ = writeln!(content, "{:.4} {:.4} m", rect.x0, line_y);
    let _ = writeln!(content, "{:.4} {:.4} l", rect.x1, line_y);
    let _ = writeln!(content, "S");
    let _ = writeln!(content, "Q");

    if let Some(name) = signer_name {
        let (caption_x, caption_top) = rect.caption_anchor();
        let caption_y = page.height - caption_top;
        let _ = writeln!(content, "q");
        let _ = writeln!(content, "BT");
        let _ = writeln!(content, "/{} {} Tf", CAPTION_FONT, CAPTION_FONT_SIZE);
        let _ = writeln!(content, "{} {} {} rg", MARK_GRAY, MARK_GRAY, MARK_GRAY);
        let _ = writeln!(content, "{:.4} {:.4} Td", caption_x, caption_y);
        let _ = writeln!(content, "(Signed by: {}) Tj", escape_pdf_string(name));
        let _ = writeln!(content, "ET");
        let _ = writeln!(content, "Q");
    }

    content
}

/// Escape special characters for PDF string literals.
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            _ if c.is_ascii() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

#[derive(Clone, Copy)]
enum ResourcesLocation {
    /// Inline dictionary in the page's `Resources` entry.
    Inline,
    /// Indirect object holding the resources dictionary.
    Indirect(ObjectId),
}

/// Register `target` under `category` (`XObject`, `Font`) in the page's
/// resources, creating dictionaries as needed.
fn add_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    target: ObjectId,
) -> Result<(), ComposeError> {
    let location = ensure_resources(doc, page_id)?;

    // The category subdictionary may itself be an indirect object.
    let category_ref = {
        let resources = resources_dict(doc, page_id, location)?;
        match resources.get(category) {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    if let Some(id) = category_ref {
        let dict = doc
            .get_object_mut(id)
            .map_err(|e| ComposeError::Unclassified(e.to_string()))?
            .as_dict_mut()
            .map_err(|e| ComposeError::Unclassified(e.to_string()))?;
        dict.set(name, Object::Reference(target));
        return Ok(());
    }

    let resources = resources_dict_mut(doc, page_id, location)?;
    if let Ok(Object::Dictionary(dict)) = resources.get_mut(category) {
        dict.set(name, Object::Reference(target));
    } else {
        let mut dict = Dictionary::new();
        dict.set(name, Object::Reference(target));
        resources.set(category, Object::Dictionary(dict));
    }
    Ok(())
}

/// Find the page's resources, creating the entry when absent. A created
/// entry starts as a copy of the inherited resources so the original
/// content keeps the fonts it references.
fn ensure_resources(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<ResourcesLocation, ComposeError> {
    let existing = {
        let page = page_dict(doc, page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(ResourcesLocation::Indirect(*id)),
            Ok(Object::Dictionary(_)) => Some(ResourcesLocation::Inline),
            _ => None,
        }
    };
    if let Some(location) = existing {
        return Ok(location);
    }

    let inherited = inherited_resources(doc, page_id).unwrap_or_default();
    let page = page_dict_mut(doc, page_id)?;
    page.set("Resources", Object::Dictionary(inherited));
    Ok(ResourcesLocation::Inline)
}

/// Resources inherited from the page tree, if any.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = doc
        .get_object(page_id)
        .ok()?
        .as_dict()
        .ok()?
        .get(b"Parent")
        .ok()?
        .as_reference()
        .ok()?;

    for _ in 0..8 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(d)) => return Some(d.clone()),
            Ok(Object::Reference(id)) => {
                return doc.get_object(*id).ok()?.as_dict().ok().cloned()
            }
            _ => {}
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Wrap the page's existing content streams in a `q`/`Q` pair.
fn fence_existing_content(doc: &mut Document, page_id: ObjectId) -> Result<(), ComposeError> {
    let contents = page_dict(doc, page_id)?.get(b"Contents").ok().cloned();

    let push_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        b"q\n".to_vec(),
    )));
    let pop_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        b"\nQ\n".to_vec(),
    )));

    let mut fenced = vec![Object::Reference(push_id)];
    match contents {
        Some(Object::Reference(id)) => fenced.push(Object::Reference(id)),
        Some(Object::Array(existing)) => fenced.extend(existing),
        // Contents held directly in the page dictionary; hoist it into
        // its own object so the array form stays uniform.
        Some(Object::Stream(stream)) => {
            let id = doc.add_object(Object::Stream(stream));
            fenced.push(Object::Reference(id));
        }
        _ => {}
    }
    fenced.push(Object::Reference(pop_id));

    let page = page_dict_mut(doc, page_id)?;
    page.set("Contents", Object::Array(fenced));
    Ok(())
}

/// Append a new content stream after the page's existing ones.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: String,
) -> Result<(), ComposeError> {
    let stream_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        content.into_bytes(),
    )));

    let page = page_dict_mut(doc, page_id)?;
    match page.get(b"Contents").ok().cloned() {
        Some(Object::Reference(id)) => {
            page.set(
                "Contents",
                Object::Array(vec![Object::Reference(id), Object::Reference(stream_id)]),
            );
        }
        Some(Object::Array(mut streams)) => {
            streams.push(Object::Reference(stream_id));
            page.set("Contents", Object::Array(streams));
        }
        _ => {
            page.set("Contents", Object::Reference(stream_id));
        }
    }
    Ok(())
}

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, ComposeError> {
    doc.get_object(page_id)
        .map_err(|e| ComposeError::Unclassified(e.to_string()))?
        .as_dict()
        .map_err(|e| ComposeError::Unclassified(e.to_string()))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, ComposeError> {
    doc.get_object_mut(page_id)
        .map_err(|e| ComposeError::Unclassified(e.to_string()))?
        .as_dict_mut()
        .map_err(|e| ComposeError::Unclassified(e.to_string()))
}

fn resources_dict(
    doc: &Document,
    page_id: ObjectId,
    location: ResourcesLocation,
) -> Result<&Dictionary, ComposeError> {
    match location {
        ResourcesLocation::Indirect(id) => doc
            .get_object(id)
            .map_err(|e| ComposeError::Unclassified(e.to_string()))?
            .as_dict()
            .map_err(|e| ComposeError::Unclassified(e.to_string())),
        ResourcesLocation::Inline => match page_dict(doc, page_id)?.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => Ok(dict),
            _ => Err(ComposeError::Unclassified(
                "page resources disappeared".to_string(),
            )),
        },
    }
}

fn resources_dict_mut(
    doc: &mut Document,
    page_id: ObjectId,
    location: ResourcesLocation,
) -> Result<&mut Dictionary, ComposeError> {
    match location {
        ResourcesLocation::Indirect(id) => doc
            .get_object_mut(id)
            .map_err(|e| ComposeError::Unclassified(e.to_string()))?
            .as_dict_mut()
            .map_err(|e| ComposeError::Unclassified(e.to_string())),
        ResourcesLocation::Inline => match page_dict_mut(doc, page_id)?.get_mut(b"Resources") {
            Ok(Object::Dictionary(dict)) => Ok(dict),
            _ => Err(ComposeError::Unclassified(
                "page resources disappeared".to_string(),
            )),
        },
    }
}

/// Create parent directories and write via a temporary file + rename so
/// a failed save cannot leave a torn output file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ComposeError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| ComposeError::Serialization(format!("{}: {}", parent.display(), e)))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)
        .map_err(|e| ComposeError::Serialization(format!("{}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        ComposeError::Serialization(format!("{}: {}", path.display(), e))
    })
}
