use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 1.2;

pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 6..=128;
pub const WHITEOUT_SIZE_RANGE: RangeInclusive<u32> = 10..=2000;

pub const DEFAULT_FONT_SIZE: u32 = 12;
pub const DEFAULT_WHITEOUT_WIDTH: u32 = 140;
pub const DEFAULT_WHITEOUT_HEIGHT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InteractionMode {
    #[default]
    View,
    InsertText,
    Whiteout,
}

impl InteractionMode {
    pub const ALL: [InteractionMode; 3] =
        [InteractionMode::View, InteractionMode::InsertText, InteractionMode::Whiteout];

    pub fn label(self) -> &'static str {
        match self {
            InteractionMode::View => "View",
            InteractionMode::InsertText => "Insert Text",
            InteractionMode::Whiteout => "Whiteout",
        }
    }
}

/// Position in page space: points, origin at the top-left of the displayed page, y down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocPoint {
    pub x: f32,
    pub y: f32,
}

impl DocPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in page space, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DocRect {
    pub fn new(origin: DocPoint, width: f32, height: f32) -> Self {
        Self { x: origin.x, y: origin.y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn corners(&self) -> [DocPoint; 4] {
        [
            DocPoint::new(self.x, self.y),
            DocPoint::new(self.right(), self.y),
            DocPoint::new(self.right(), self.bottom()),
            DocPoint::new(self.x, self.bottom()),
        ]
    }
}

/// Position on the canvas in logical pixels, relative to the top-left of the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

pub fn clamp_zoom(scale: f32) -> f32 {
    if !scale.is_finite() {
        return DEFAULT_ZOOM;
    }

    scale.clamp(MIN_ZOOM, MAX_ZOOM)
}

pub fn screen_to_document(point: ScreenPoint, scale: f32) -> DocPoint {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    DocPoint { x: point.x / scale, y: point.y / scale }
}

pub fn document_to_screen(point: DocPoint, scale: f32) -> ScreenPoint {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    ScreenPoint { x: point.x * scale, y: point.y * scale }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub page_index: u32,
    pub page_count: u32,
    pub scale: f32,
    pub mode: InteractionMode,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { page_index: 0, page_count: 0, scale: DEFAULT_ZOOM, mode: InteractionMode::View }
    }
}

impl ViewState {
    pub fn with_scale(scale: f32) -> Self {
        Self { scale: clamp_zoom(scale), ..Self::default() }
    }

    pub fn has_document(&self) -> bool {
        self.page_count > 0
    }

    pub fn page_number(&self) -> Option<u32> {
        self.has_document().then_some(self.page_index + 1)
    }

    pub fn can_go_previous(&self) -> bool {
        self.has_document() && self.page_index > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.has_document() && self.page_index + 1 < self.page_count
    }

    pub fn page_label(&self) -> String {
        match self.page_number() {
            Some(number) => format!("Page: {}/{}", number, self.page_count),
            None => "Page: -/-".to_owned(),
        }
    }

    /// Zoom in thousandths; stable key for cached renders.
    pub fn zoom_permille(&self) -> u32 {
        (self.scale * 1000.0).round() as u32
    }

    pub fn to_document(&self, point: ScreenPoint) -> DocPoint {
        screen_to_document(point, self.scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewAction {
    DocumentLoaded { page_count: u32 },
    PreviousPage,
    NextPage,
    SetZoom(f32),
    SetMode(InteractionMode),
}

/// Applies `action` and reports whether anything visible changed.
pub fn apply_view_action(state: &mut ViewState, action: ViewAction) -> bool {
    match action {
        ViewAction::DocumentLoaded { page_count } => {
            state.page_count = page_count;
            state.page_index = 0;
            true
        }
        ViewAction::PreviousPage => {
            if !state.can_go_previous() {
                return false;
            }
            state.page_index -= 1;
            true
        }
        ViewAction::NextPage => {
            if !state.can_go_next() {
                return false;
            }
            state.page_index += 1;
            true
        }
        ViewAction::SetZoom(scale) => {
            if !scale.is_finite() {
                return false;
            }

            let scale = clamp_zoom(scale);
            if (scale - state.scale).abs() < f32::EPSILON {
                return false;
            }
            state.scale = scale;
            true
        }
        ViewAction::SetMode(mode) => {
            let changed = state.mode != mode;
            state.mode = mode;
            changed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub default_zoom: f32,
    pub default_font_size: u32,
    pub default_whiteout_width: u32,
    pub default_whiteout_height: u32,
    pub last_directory: Option<PathBuf>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_zoom: DEFAULT_ZOOM,
            default_font_size: DEFAULT_FONT_SIZE,
            default_whiteout_width: DEFAULT_WHITEOUT_WIDTH,
            default_whiteout_height: DEFAULT_WHITEOUT_HEIGHT,
            last_directory: None,
        }
    }
}

impl Preferences {
    /// Copy with every numeric value pulled back into its valid range.
    pub fn sanitized(&self) -> Self {
        Self {
            default_zoom: clamp_zoom(self.default_zoom),
            default_font_size: clamp_to(self.default_font_size, &FONT_SIZE_RANGE),
            default_whiteout_width: clamp_to(self.default_whiteout_width, &WHITEOUT_SIZE_RANGE),
            default_whiteout_height: clamp_to(self.default_whiteout_height, &WHITEOUT_SIZE_RANGE),
            last_directory: self.last_directory.clone(),
        }
    }
}

fn clamp_to(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(page_count: u32) -> ViewState {
        let mut state = ViewState::default();
        apply_view_action(&mut state, ViewAction::DocumentLoaded { page_count });
        state
    }

    #[test]
    fn three_page_document_walks_to_last_page_and_stops() {
        let mut state = loaded(3);
        assert_eq!(state.page_index, 0);
        assert!(state.page_label().ends_with("1/3"));

        assert!(apply_view_action(&mut state, ViewAction::NextPage));
        assert!(apply_view_action(&mut state, ViewAction::NextPage));
        assert_eq!(state.page_index, 2);
        assert!(state.page_label().ends_with("3/3"));

        assert!(!apply_view_action(&mut state, ViewAction::NextPage));
        assert_eq!(state.page_index, 2);
    }

    #[test]
    fn previous_at_first_page_is_a_no_op() {
        let mut state = loaded(2);

        assert!(!apply_view_action(&mut state, ViewAction::PreviousPage));
        assert_eq!(state.page_index, 0);
    }

    #[test]
    fn paging_without_document_is_ignored() {
        let mut state = ViewState::default();

        assert!(!apply_view_action(&mut state, ViewAction::NextPage));
        assert!(!apply_view_action(&mut state, ViewAction::PreviousPage));
        assert_eq!(state.page_index, 0);
        assert_eq!(state.page_label(), "Page: -/-");
    }

    #[test]
    fn paging_stays_within_bounds_for_any_sequence() {
        let mut state = loaded(4);
        let actions = [
            ViewAction::PreviousPage,
            ViewAction::NextPage,
            ViewAction::NextPage,
            ViewAction::NextPage,
            ViewAction::NextPage,
            ViewAction::NextPage,
            ViewAction::PreviousPage,
        ];

        for action in actions {
            apply_view_action(&mut state, action);
            assert!(state.page_index < state.page_count);
        }
        assert_eq!(state.page_index, 2);
    }

    #[test]
    fn loading_a_document_resets_page_index() {
        let mut state = loaded(5);
        apply_view_action(&mut state, ViewAction::NextPage);

        apply_view_action(&mut state, ViewAction::DocumentLoaded { page_count: 2 });
        assert_eq!(state.page_index, 0);
        assert_eq!(state.page_count, 2);
    }

    #[test]
    fn zoom_is_clamped_and_non_finite_values_are_ignored() {
        let mut state = ViewState::default();

        assert!(apply_view_action(&mut state, ViewAction::SetZoom(10.0)));
        assert_eq!(state.scale, MAX_ZOOM);

        assert!(apply_view_action(&mut state, ViewAction::SetZoom(0.01)));
        assert_eq!(state.scale, MIN_ZOOM);

        assert!(!apply_view_action(&mut state, ViewAction::SetZoom(f32::NAN)));
        assert_eq!(state.scale, MIN_ZOOM);

        assert!(!apply_view_action(&mut state, ViewAction::SetZoom(MIN_ZOOM)));
    }

    #[test]
    fn click_maps_through_zoom_scale() {
        let point = screen_to_document(ScreenPoint::new(120.0, 60.0), 1.2);

        assert!((point.x - 100.0).abs() < 1e-3);
        assert!((point.y - 50.0).abs() < 1e-3);
    }

    #[test]
    fn coordinate_mapping_is_invertible() {
        for scale in [0.5_f32, 0.8, 1.0, 1.2, 2.5, 3.0] {
            let screen = ScreenPoint::new(37.0, 411.0);
            let back = document_to_screen(screen_to_document(screen, scale), scale);

            assert!((back.x - screen.x).abs() < 1e-3);
            assert!((back.y - screen.y).abs() < 1e-3);
        }
    }

    #[test]
    fn mode_switch_reports_change_only_when_different() {
        let mut state = ViewState::default();

        assert!(apply_view_action(&mut state, ViewAction::SetMode(InteractionMode::Whiteout)));
        assert!(!apply_view_action(&mut state, ViewAction::SetMode(InteractionMode::Whiteout)));
        assert!(apply_view_action(&mut state, ViewAction::SetMode(InteractionMode::View)));
    }

    #[test]
    fn zoom_permille_is_stable_for_slider_values() {
        let state = ViewState::with_scale(1.2);
        assert_eq!(state.zoom_permille(), 1200);
    }

    #[test]
    fn preferences_are_sanitized_into_valid_ranges() {
        let prefs = Preferences {
            default_zoom: 9.0,
            default_font_size: 1,
            default_whiteout_width: 5000,
            default_whiteout_height: 0,
            last_directory: None,
        };

        let sanitized = prefs.sanitized();
        assert_eq!(sanitized.default_zoom, MAX_ZOOM);
        assert_eq!(sanitized.default_font_size, 6);
        assert_eq!(sanitized.default_whiteout_width, 2000);
        assert_eq!(sanitized.default_whiteout_height, 10);
    }

    #[test]
    fn preferences_deserialize_with_missing_fields() {
        let prefs: Preferences =
            serde_json::from_str(r#"{ "default_font_size": 18 }"#).expect("valid json");

        assert_eq!(prefs.default_font_size, 18);
        assert_eq!(prefs.default_zoom, DEFAULT_ZOOM);
    }
}
