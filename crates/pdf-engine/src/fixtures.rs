//! In-memory PDF builders for tests across the workspace.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

#[derive(Debug, Clone)]
pub struct FixturePage {
    pub media_box: [f32; 4],
    pub rotation: i64,
    pub text: Option<String>,
    /// Paint the whole page black before the text.
    pub black_background: bool,
}

impl FixturePage {
    pub fn letter(text: impl Into<String>) -> Self {
        Self {
            media_box: [0.0, 0.0, 612.0, 792.0],
            rotation: 0,
            text: Some(text.into()),
            black_background: false,
        }
    }
}

/// `page_count` US Letter pages, each labelled "Page N" at (72, 700) in user space.
pub fn sample_pdf(page_count: u32) -> Vec<u8> {
    let pages: Vec<FixturePage> =
        (1..=page_count).map(|number| FixturePage::letter(format!("Page {number}"))).collect();

    build_pdf(&pages)
}

/// Builds a PDF whose font resources live on the page tree root, so every page inherits them.
pub fn build_pdf(pages: &[FixturePage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let resources = Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]);

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = page_content(page);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let [x0, y0, x1, y1] = page.media_box;
        let mut page_dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("MediaBox", Object::Array(vec![x0.into(), y0.into(), x1.into(), y1.into()])),
        ]);
        if page.rotation != 0 {
            page_dict.set("Rotate", Object::Integer(page.rotation));
        }

        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    let page_tree = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(kids.len() as i64)),
        ("Kids", Object::Array(kids)),
        ("Resources", Object::Dictionary(resources)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("fixture PDF should serialize");
    output
}

fn page_content(page: &FixturePage) -> Vec<u8> {
    let mut operations = Vec::new();

    if page.black_background {
        let [x0, y0, x1, y1] = page.media_box;
        operations.extend([
            Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
            Operation::new("re", vec![x0.into(), y0.into(), (x1 - x0).into(), (y1 - y0).into()]),
            Operation::new("f", vec![]),
        ]);
    }

    if let Some(text) = &page.text {
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
            Operation::new("ET", vec![]),
        ]);
    }

    Content { operations }.encode().expect("fixture content should encode")
}
