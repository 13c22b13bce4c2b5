//! Page boxes, rotation, and the mapping from page space to PDF user space.
//!
//! Page space is what the viewer shows: origin at the top-left of the rotated
//! page, y growing downwards, measured in points. PDF user space has its origin
//! at the bottom-left of the unrotated page box with y growing upwards.

use doc_model::{DocPoint, DocRect};
use lopdf::{Document, Object, ObjectId};

const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Visible box in user space as `[x0, y0, x1, y1]` with `x0 <= x1`, `y0 <= y1`.
    pub bounds: [f32; 4],
    /// Clockwise display rotation: 0, 90, 180 or 270.
    pub rotation: u16,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self { bounds: LETTER, rotation: 0 }
    }
}

impl PageGeometry {
    pub fn new(bounds: [f32; 4], rotation: i64) -> Self {
        Self { bounds: normalize_box(bounds), rotation: normalize_rotation(rotation) }
    }

    pub fn box_width(&self) -> f32 {
        self.bounds[2] - self.bounds[0]
    }

    pub fn box_height(&self) -> f32 {
        self.bounds[3] - self.bounds[1]
    }

    /// Size of the page as displayed, in points.
    pub fn display_size(&self) -> (f32, f32) {
        match self.rotation {
            90 | 270 => (self.box_height(), self.box_width()),
            _ => (self.box_width(), self.box_height()),
        }
    }

    pub fn to_user_space(&self, point: DocPoint) -> (f32, f32) {
        let [x0, y0, x1, y1] = self.bounds;
        let DocPoint { x, y } = point;

        match self.rotation {
            90 => (x0 + y, y0 + x),
            180 => (x1 - x, y0 + y),
            270 => (x1 - y, y1 - x),
            _ => (x0 + x, y1 - y),
        }
    }

    /// User-space rectangle as `[x, y, width, height]`, ready for the `re` operator.
    pub fn rect_to_user_space(&self, rect: DocRect) -> [f32; 4] {
        let mut min = (f32::MAX, f32::MAX);
        let mut max = (f32::MIN, f32::MIN);

        for corner in rect.corners() {
            let (ux, uy) = self.to_user_space(corner);
            min = (min.0.min(ux), min.1.min(uy));
            max = (max.0.max(ux), max.1.max(uy));
        }

        [min.0, min.1, max.0 - min.0, max.1 - min.1]
    }

    /// Text matrix placing an upright baseline at `origin` on the displayed page.
    pub fn text_matrix(&self, origin: DocPoint) -> [f32; 6] {
        let (ux, uy) = self.to_user_space(origin);

        match self.rotation {
            90 => [0.0, 1.0, -1.0, 0.0, ux, uy],
            180 => [-1.0, 0.0, 0.0, -1.0, ux, uy],
            270 => [0.0, -1.0, 1.0, 0.0, ux, uy],
            _ => [1.0, 0.0, 0.0, 1.0, ux, uy],
        }
    }

    pub(crate) fn read(doc: &Document, page_id: ObjectId) -> Self {
        let media = inherited(doc, page_id, b"MediaBox")
            .and_then(|value| read_box(doc, value))
            .map(normalize_box)
            .unwrap_or(LETTER);

        let bounds = inherited(doc, page_id, b"CropBox")
            .and_then(|value| read_box(doc, value))
            .map(normalize_box)
            .and_then(|crop| intersect(crop, media))
            .unwrap_or(media);

        let rotation = inherited(doc, page_id, b"Rotate")
            .and_then(|value| value.as_i64().ok())
            .unwrap_or(0);

        Self { bounds, rotation: normalize_rotation(rotation) }
    }
}

pub(crate) fn normalize_rotation(raw: i64) -> u16 {
    let quarter_turns = (raw as f64 / 90.0).round() as i64;
    (quarter_turns.rem_euclid(4) * 90) as u16
}

fn normalize_box([a, b, c, d]: [f32; 4]) -> [f32; 4] {
    [a.min(c), b.min(d), a.max(c), b.max(d)]
}

fn intersect(a: [f32; 4], b: [f32; 4]) -> Option<[f32; 4]> {
    let clipped = [a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])];
    (clipped[0] < clipped[2] && clipped[1] < clipped[3]).then_some(clipped)
}

fn read_box(doc: &Document, value: &Object) -> Option<[f32; 4]> {
    let array = value.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }

    let mut out = [0.0; 4];
    for (slot, entry) in out.iter_mut().zip(array) {
        *slot = resolve(doc, entry)?.as_float().ok()?;
    }

    Some(out)
}

/// Looks `key` up on the page, then on its ancestors in the page tree.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return resolve(doc, value);
        }

        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }

    None
}

fn resolve<'a>(doc: &'a Document, value: &'a Object) -> Option<&'a Object> {
    match value {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: (f32, f32), expected: (f32, f32)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-3 && (actual.1 - expected.1).abs() < 1e-3,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn unrotated_page_flips_y_axis() {
        let geometry = PageGeometry::new([0.0, 0.0, 612.0, 792.0], 0);

        assert_close(geometry.to_user_space(DocPoint::new(100.0, 50.0)), (100.0, 742.0));
        assert_eq!(geometry.display_size(), (612.0, 792.0));
    }

    #[test]
    fn box_offset_is_respected() {
        let geometry = PageGeometry::new([10.0, 20.0, 210.0, 320.0], 0);

        assert_close(geometry.to_user_space(DocPoint::new(0.0, 0.0)), (10.0, 320.0));
        assert_close(geometry.to_user_space(DocPoint::new(200.0, 300.0)), (210.0, 20.0));
    }

    #[test]
    fn quarter_turns_swap_display_size_and_map_corners() {
        let bounds = [0.0, 0.0, 600.0, 800.0];

        let rotated = PageGeometry::new(bounds, 90);
        assert_eq!(rotated.display_size(), (800.0, 600.0));
        // Display top-left is the user-space bottom-left for a clockwise quarter turn.
        assert_close(rotated.to_user_space(DocPoint::new(0.0, 0.0)), (0.0, 0.0));
        assert_close(rotated.to_user_space(DocPoint::new(800.0, 600.0)), (600.0, 800.0));

        let upside_down = PageGeometry::new(bounds, 180);
        assert_close(upside_down.to_user_space(DocPoint::new(0.0, 0.0)), (600.0, 0.0));

        let counter = PageGeometry::new(bounds, 270);
        assert_eq!(counter.display_size(), (800.0, 600.0));
        assert_close(counter.to_user_space(DocPoint::new(0.0, 0.0)), (600.0, 800.0));
    }

    #[test]
    fn rect_maps_to_user_space_bounds() {
        let geometry = PageGeometry::new([0.0, 0.0, 612.0, 792.0], 0);
        let rect = DocRect::new(DocPoint::new(100.0, 50.0), 140.0, 30.0);

        assert_eq!(geometry.rect_to_user_space(rect), [100.0, 712.0, 140.0, 30.0]);
    }

    #[test]
    fn rotated_rect_keeps_its_area() {
        let geometry = PageGeometry::new([0.0, 0.0, 600.0, 800.0], 90);
        let [_, _, width, height] =
            geometry.rect_to_user_space(DocRect::new(DocPoint::new(10.0, 20.0), 140.0, 30.0));

        assert_eq!((width, height), (30.0, 140.0));
    }

    #[test]
    fn rotation_is_normalized() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(540), 180);
    }

    #[test]
    fn reversed_boxes_are_normalized() {
        let geometry = PageGeometry::new([612.0, 792.0, 0.0, 0.0], 0);
        assert_eq!(geometry.bounds, [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn crop_box_outside_media_box_falls_back() {
        assert_eq!(intersect([700.0, 0.0, 800.0, 10.0], LETTER), None);
        assert_eq!(
            intersect([-10.0, 10.0, 300.0, 900.0], LETTER),
            Some([0.0, 10.0, 300.0, 792.0])
        );
    }
}
