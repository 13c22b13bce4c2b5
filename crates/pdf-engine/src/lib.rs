//! Editable PDF documents backed by lopdf.
//!
//! A [`PdfDocument`] owns one parsed PDF for the length of an editing session.
//! Edits are appended to the page content stream as plain PDF operators, so
//! they survive a save and reload and render in any viewer.

mod encoding;
mod geometry;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

pub use encoding::encode_win_ansi;
pub use geometry::PageGeometry;

use doc_model::{DocPoint, DocRect};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Resource name the editor registers its text font under.
pub const EDITOR_FONT_RESOURCE: &str = "EdHelv";

/// Line spacing for multi-line text, as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.2;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    fn operands(self) -> Vec<Object> {
        vec![self.r.into(), self.g.into(), self.b.into()]
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("document has no pages")]
    NoPages,
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("malformed document: {0}")]
    Malformed(String),
}

pub type PdfEngineResult<T> = Result<T, PdfEngineError>;

#[derive(Debug)]
pub struct PdfDocument {
    handle: DocumentHandle,
    source_path: Option<PathBuf>,
    inner: Document,
    pages: Vec<ObjectId>,
    geometry: Vec<PageGeometry>,
    revision: u64,
    font_id: Option<ObjectId>,
    // Page id to the content stream this document wrote for it.
    edit_streams: HashMap<ObjectId, ObjectId>,
}

impl PdfDocument {
    pub fn open(source: impl Into<OpenSource>) -> PdfEngineResult<Self> {
        let (inner, source_path) = match source.into() {
            OpenSource::Path(path) => {
                let bytes = fs::read(&path)?;
                (Document::load_mem(&bytes)?, Some(path))
            }
            OpenSource::Bytes(bytes) => (Document::load_mem(&bytes)?, None),
        };

        if inner.is_encrypted() {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let pages: Vec<ObjectId> = inner.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(PdfEngineError::NoPages);
        }

        let geometry = pages.iter().map(|&page_id| PageGeometry::read(&inner, page_id)).collect();

        let handle = DocumentHandle::next();
        log::debug!("opened document {} with {} pages", handle.raw(), pages.len());

        Ok(Self {
            handle,
            source_path,
            inner,
            pages,
            geometry,
            revision: 0,
            font_id: None,
            edit_streams: HashMap::new(),
        })
    }

    pub fn handle(&self) -> DocumentHandle {
        self.handle
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Incremented by every applied edit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn page_geometry(&self, page_index: u32) -> PdfEngineResult<PageGeometry> {
        self.geometry.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: self.page_count(),
        })
    }

    /// Draws `text` with its baseline starting at `origin`. Lines split on `\n`.
    pub fn insert_text(
        &mut self,
        page_index: u32,
        origin: DocPoint,
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> PdfEngineResult<()> {
        let page_id = self.page_id(page_index)?;
        let geometry = self.page_geometry(page_index)?;
        self.register_font(page_id)?;

        let [a, b, c, d, e, f] = geometry.text_matrix(origin);
        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", color.operands()),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(EDITOR_FONT_RESOURCE.as_bytes().to_vec()), font_size.into()],
            ),
            Operation::new("TL", vec![(font_size * LINE_HEIGHT).into()]),
            Operation::new("Tm", vec![a.into(), b.into(), c.into(), d.into(), e.into(), f.into()]),
        ];

        for (line_number, line) in text.lines().enumerate() {
            if line_number > 0 {
                operations.push(Operation::new("T*", vec![]));
            }

            let (bytes, substituted) = encode_win_ansi(line);
            if substituted > 0 {
                log::warn!("{substituted} character(s) not representable in WinAnsi replaced with '?'");
            }
            operations.push(Operation::new("Tj", vec![Object::String(bytes, StringFormat::Literal)]));
        }

        operations.extend([Operation::new("ET", vec![]), Operation::new("Q", vec![])]);

        self.append_operations(page_id, operations)?;
        log::info!(
            "inserted text on page {} at ({:.1}, {:.1}) size {font_size}",
            page_index + 1,
            origin.x,
            origin.y
        );
        Ok(())
    }

    /// Paints an opaque filled rectangle over the page.
    pub fn fill_rect(&mut self, page_index: u32, rect: DocRect, color: Rgb) -> PdfEngineResult<()> {
        let page_id = self.page_id(page_index)?;
        let [x, y, width, height] = self.page_geometry(page_index)?.rect_to_user_space(rect);

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", color.operands()),
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ];

        self.append_operations(page_id, operations)?;
        log::info!(
            "filled rectangle on page {} at ({:.1}, {:.1}) {}x{}",
            page_index + 1,
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
        Ok(())
    }

    /// Decoded content-stream operators of one page.
    pub fn page_operations(&self, page_index: u32) -> PdfEngineResult<Vec<Operation>> {
        let page_id = self.page_id(page_index)?;
        let content = self.inner.get_page_content(page_id)?;

        Ok(Content::decode(&content)?.operations)
    }

    /// Serializes the document with every applied edit. Objects no longer
    /// reachable from the trailer, such as replaced page content, are dropped.
    pub fn to_bytes(&mut self) -> PdfEngineResult<Vec<u8>> {
        let pruned = self.inner.prune_objects();
        if !pruned.is_empty() {
            log::debug!("dropped {} unreferenced objects", pruned.len());
        }

        let mut output = Vec::new();
        self.inner.save_to(&mut output)?;
        Ok(output)
    }

    /// Writes the document to `path` through a temporary sibling file, so a
    /// failed save never leaves a truncated PDF behind. The source path is untouched.
    pub fn save_as(&mut self, path: &Path) -> PdfEngineResult<()> {
        let bytes = self.to_bytes()?;

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(directory)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|err| PdfEngineError::Io(err.error))?;

        log::info!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn page_id(&self, page_index: u32) -> PdfEngineResult<ObjectId> {
        self.pages.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: self.page_count(),
        })
    }

    /// Appends operators after the page's existing content. The first edit on a
    /// page wraps the original content in `q`/`Q` so graphics state it leaves
    /// behind cannot leak into the edits, and gives the page its own content
    /// stream. Later edits rewrite that stream in place.
    fn append_operations(
        &mut self,
        page_id: ObjectId,
        operations: Vec<Operation>,
    ) -> PdfEngineResult<()> {
        let existing = self.inner.get_page_content(page_id)?;
        let addition = Content { operations }.encode()?;
        let owned_stream = self.edit_streams.get(&page_id).copied();

        let mut content = Vec::with_capacity(existing.len() + addition.len() + 8);
        if owned_stream.is_none() {
            content.extend_from_slice(b"q\n");
            content.extend_from_slice(&existing);
            content.extend_from_slice(b"\nQ\n");
        } else {
            content.extend_from_slice(&existing);
            content.push(b'\n');
        }
        content.extend_from_slice(&addition);

        let mut stream = Stream::new(Dictionary::new(), content);
        if let Err(err) = stream.compress() {
            log::debug!("leaving page content uncompressed: {err}");
        }

        match owned_stream {
            Some(stream_id) => {
                self.inner.objects.insert(stream_id, Object::Stream(stream));
            }
            None => {
                let stream_id = self.inner.add_object(stream);
                self.inner
                    .get_object_mut(page_id)?
                    .as_dict_mut()?
                    .set("Contents", Object::Reference(stream_id));
                self.edit_streams.insert(page_id, stream_id);
            }
        }
        self.revision += 1;

        Ok(())
    }

    fn register_font(&mut self, page_id: ObjectId) -> PdfEngineResult<()> {
        let font_id = match self.font_id {
            Some(id) => id,
            None => {
                let id = self.inner.add_object(Dictionary::from_iter([
                    ("Type", Object::Name(b"Font".to_vec())),
                    ("Subtype", Object::Name(b"Type1".to_vec())),
                    ("BaseFont", Object::Name(b"Helvetica".to_vec())),
                    ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
                ]));
                self.font_id = Some(id);
                id
            }
        };

        self.font_dictionary_mut(page_id)?.set(EDITOR_FONT_RESOURCE, Object::Reference(font_id));
        Ok(())
    }

    /// Font dictionary of the page's own resources. Inherited resources are
    /// copied onto the page first so the page keeps every font it already used.
    fn font_dictionary_mut(&mut self, page_id: ObjectId) -> PdfEngineResult<&mut Dictionary> {
        let resources_location = match self.inner.get_dictionary(page_id)?.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(Some(*id)),
            Ok(Object::Dictionary(_)) => Some(None),
            _ => None,
        };

        let resources_id = match resources_location {
            Some(location) => location,
            None => {
                let inherited = geometry::inherited(&self.inner, page_id, b"Resources")
                    .and_then(|value| value.as_dict().ok())
                    .cloned()
                    .unwrap_or_else(Dictionary::new);
                self.inner
                    .get_object_mut(page_id)?
                    .as_dict_mut()?
                    .set("Resources", Object::Dictionary(inherited));
                None
            }
        };

        let font_reference = {
            let resources = match resources_id {
                Some(id) => self.inner.get_dictionary(id)?,
                None => self.inner.get_dictionary(page_id)?.get(b"Resources")?.as_dict()?,
            };
            match resources.get(b"Font") {
                Ok(Object::Reference(id)) => Some(*id),
                _ => None,
            }
        };

        if let Some(id) = font_reference {
            return self
                .inner
                .get_object_mut(id)?
                .as_dict_mut()
                .map_err(|_| PdfEngineError::Malformed("font resource is not a dictionary".into()));
        }

        let resources = match resources_id {
            Some(id) => self.inner.get_object_mut(id)?.as_dict_mut()?,
            None => self.inner.get_object_mut(page_id)?.as_dict_mut()?.get_mut(b"Resources")?.as_dict_mut()?,
        };

        if !matches!(resources.get(b"Font"), Ok(Object::Dictionary(_))) {
            resources.set("Font", Object::Dictionary(Dictionary::new()));
        }

        Ok(resources.get_mut(b"Font")?.as_dict_mut()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{build_pdf, sample_pdf, FixturePage};

    fn open_sample(page_count: u32) -> PdfDocument {
        PdfDocument::open(sample_pdf(page_count)).expect("open should succeed")
    }

    fn operators(doc: &PdfDocument, page_index: u32) -> Vec<String> {
        doc.page_operations(page_index)
            .expect("content should decode")
            .into_iter()
            .map(|operation| operation.operator)
            .collect()
    }

    fn floats(operation: &Operation) -> Vec<f32> {
        operation.operands.iter().map(|operand| operand.as_float().expect("numeric operand")).collect()
    }

    fn last_op<'a>(operations: &'a [Operation], operator: &str) -> &'a Operation {
        operations
            .iter()
            .rev()
            .find(|operation| operation.operator == operator)
            .unwrap_or_else(|| panic!("no {operator} operator"))
    }

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let doc = open_sample(3);

        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.revision(), 0);
        assert!(doc.source_path().is_none());
        assert_eq!(doc.page_geometry(0).expect("page 0").display_size(), (612.0, 792.0));
    }

    #[test]
    fn handles_are_unique_per_open() {
        let first = open_sample(1);
        let second = open_sample(1);

        assert_ne!(first.handle(), second.handle());
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = PdfDocument::open(b"definitely not a pdf".to_vec()).expect_err("should fail");
        assert!(matches!(err, PdfEngineError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        let err = PdfDocument::open(temp.path().join("missing.pdf")).expect_err("should fail");

        assert!(matches!(err, PdfEngineError::Io(_)));
    }

    #[test]
    fn empty_document_is_rejected() {
        let err = PdfDocument::open(build_pdf(&[])).expect_err("should fail");
        assert!(matches!(err, PdfEngineError::NoPages));
    }

    #[test]
    fn out_of_range_page_is_reported() {
        let mut doc = open_sample(2);

        let err = doc
            .insert_text(5, DocPoint::new(1.0, 1.0), "x", 12.0, Rgb::BLACK)
            .expect_err("should fail");
        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 5, page_count: 2 }));
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn insert_text_places_baseline_in_user_space() {
        let mut doc = open_sample(1);

        doc.insert_text(0, DocPoint::new(100.0, 50.0), "Hello", 14.0, Rgb::BLACK)
            .expect("insert should succeed");

        let operations = doc.page_operations(0).expect("decode");
        assert_eq!(floats(last_op(&operations, "Tm")), vec![1.0, 0.0, 0.0, 1.0, 100.0, 742.0]);
        assert_eq!(floats(last_op(&operations, "rg")), vec![0.0, 0.0, 0.0]);

        let tf = last_op(&operations, "Tf");
        assert_eq!(tf.operands[0].as_name().expect("font name"), EDITOR_FONT_RESOURCE.as_bytes());
        assert_eq!(tf.operands[1].as_float().expect("size"), 14.0);

        let tj = last_op(&operations, "Tj");
        assert_eq!(tj.operands[0].as_str().expect("string"), b"Hello");
        assert_eq!(doc.revision(), 1);
    }

    #[test]
    fn original_content_is_kept_and_isolated() {
        let mut doc = open_sample(1);

        doc.insert_text(0, DocPoint::new(10.0, 10.0), "one", 12.0, Rgb::BLACK).expect("insert");
        doc.insert_text(0, DocPoint::new(10.0, 30.0), "two", 12.0, Rgb::BLACK).expect("insert");

        let ops = operators(&doc, 0);
        assert_eq!(ops.first().map(String::as_str), Some("q"));
        assert_eq!(ops.iter().filter(|op| op.as_str() == "Tj").count(), 3);
        assert_eq!(
            ops.iter().filter(|op| op.as_str() == "q").count(),
            ops.iter().filter(|op| op.as_str() == "Q").count()
        );
        assert_eq!(doc.revision(), 2);
    }

    #[test]
    fn multi_line_text_advances_with_leading() {
        let mut doc = open_sample(1);

        doc.insert_text(0, DocPoint::new(20.0, 20.0), "first\nsecond", 10.0, Rgb::BLACK)
            .expect("insert");

        let operations = doc.page_operations(0).expect("decode");
        assert_eq!(floats(last_op(&operations, "TL")), vec![12.0]);
        assert!(operations.iter().any(|operation| operation.operator == "T*"));
    }

    #[test]
    fn font_is_registered_next_to_inherited_fonts() {
        let mut doc = open_sample(1);
        doc.insert_text(0, DocPoint::new(10.0, 10.0), "x", 12.0, Rgb::BLACK).expect("insert");

        let page_id = doc.pages[0];
        let fonts = doc
            .inner
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Resources"))
            .and_then(Object::as_dict)
            .and_then(|resources| resources.get(b"Font"))
            .and_then(Object::as_dict)
            .expect("page should own a font dictionary");

        assert!(fonts.has(b"F1"));
        assert!(fonts.has(EDITOR_FONT_RESOURCE.as_bytes()));
    }

    #[test]
    fn fill_rect_covers_exact_bounds() {
        let mut doc = open_sample(1);

        doc.fill_rect(0, DocRect::new(DocPoint::new(100.0, 50.0), 140.0, 30.0), Rgb::WHITE)
            .expect("fill should succeed");

        let operations = doc.page_operations(0).expect("decode");
        assert_eq!(floats(last_op(&operations, "re")), vec![100.0, 712.0, 140.0, 30.0]);
        assert_eq!(floats(last_op(&operations, "rg")), vec![1.0, 1.0, 1.0]);
        assert_eq!(operations.last().map(|op| op.operator.as_str()), Some("Q"));
        assert!(operations.iter().any(|operation| operation.operator == "f"));
    }

    #[test]
    fn rotated_page_edits_use_rotated_matrix() {
        let mut page = FixturePage::letter("rotated");
        page.rotation = 90;
        let mut doc = PdfDocument::open(build_pdf(&[page])).expect("open");

        assert_eq!(doc.page_geometry(0).expect("page").display_size(), (792.0, 612.0));

        doc.insert_text(0, DocPoint::new(100.0, 50.0), "up", 12.0, Rgb::BLACK).expect("insert");
        let operations = doc.page_operations(0).expect("decode");
        assert_eq!(floats(last_op(&operations, "Tm")), vec![0.0, 1.0, -1.0, 0.0, 50.0, 100.0]);
    }

    #[test]
    fn edits_survive_save_and_reopen() {
        let temp = tempfile::tempdir().expect("temp dir");
        let output = temp.path().join("edited.pdf");

        let mut doc = open_sample(2);
        doc.insert_text(1, DocPoint::new(100.0, 50.0), "Hello", 14.0, Rgb::BLACK).expect("insert");
        doc.fill_rect(1, DocRect::new(DocPoint::new(10.0, 10.0), 50.0, 20.0), Rgb::WHITE)
            .expect("fill");
        doc.save_as(&output).expect("save should succeed");

        let reopened = PdfDocument::open(output.clone()).expect("reopen should succeed");
        assert_eq!(reopened.page_count(), 2);
        assert_eq!(reopened.source_path(), Some(output.as_path()));

        let operations = reopened.page_operations(1).expect("decode");
        let tm = floats(last_op(&operations, "Tm"));
        assert!((tm[4] - 100.0).abs() < 0.01 && (tm[5] - 742.0).abs() < 0.01);
        assert_eq!(last_op(&operations, "Tj").operands[0].as_str().expect("string"), b"Hello");
        assert_eq!(floats(last_op(&operations, "re")), vec![10.0, 762.0, 50.0, 20.0]);

        assert!(reopened.page_operations(0).expect("decode").iter().all(|op| op.operator != "re"));
    }

    fn stream_count(document: &Document) -> usize {
        document.objects.values().filter(|object| matches!(object, Object::Stream(_))).count()
    }

    #[test]
    fn repeated_edits_reuse_the_page_stream() {
        let mut doc = open_sample(1);
        let area = DocRect::new(DocPoint::new(10.0, 10.0), 50.0, 20.0);

        doc.fill_rect(0, area, Rgb::WHITE).expect("fill");
        doc.fill_rect(0, area, Rgb::WHITE).expect("fill");
        let after_two = stream_count(&doc.inner);

        for _ in 0..18 {
            doc.fill_rect(0, area, Rgb::WHITE).expect("fill");
        }
        assert_eq!(stream_count(&doc.inner), after_two);

        let operations = doc.page_operations(0).expect("decode");
        assert_eq!(operations.iter().filter(|op| op.operator == "re").count(), 20);
        assert_eq!(operations.iter().filter(|op| op.operator == "BT").count(), 1);
    }

    #[test]
    fn saved_file_holds_only_live_content() {
        let mut once = open_sample(1);
        let mut many = open_sample(1);
        let area = DocRect::new(DocPoint::new(10.0, 10.0), 50.0, 20.0);

        once.fill_rect(0, area, Rgb::WHITE).expect("fill");
        for _ in 0..20 {
            many.fill_rect(0, area, Rgb::WHITE).expect("fill");
        }

        let once = Document::load_mem(&once.to_bytes().expect("save")).expect("reload");
        let many = Document::load_mem(&many.to_bytes().expect("save")).expect("reload");

        assert_eq!(stream_count(&many), stream_count(&once));
        assert_eq!(many.objects.len(), once.objects.len());
    }

    #[test]
    fn save_does_not_change_source_path() {
        let temp = tempfile::tempdir().expect("temp dir");
        let source = temp.path().join("source.pdf");
        fs::write(&source, sample_pdf(1)).expect("write fixture");

        let mut doc = PdfDocument::open(source.clone()).expect("open");
        doc.save_as(&temp.path().join("copy.pdf")).expect("save");

        assert_eq!(doc.source_path(), Some(source.as_path()));
    }

    #[test]
    fn save_into_missing_directory_fails_without_output() {
        let temp = tempfile::tempdir().expect("temp dir");
        let target = temp.path().join("no-such-dir").join("out.pdf");

        let mut doc = open_sample(1);
        let err = doc.save_as(&target).expect_err("should fail");

        assert!(matches!(err, PdfEngineError::Io(_)));
        assert!(!target.exists());
    }
}
