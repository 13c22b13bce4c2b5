//! PDF Editor - egui-based UI
//!
//! Single-document viewer with text insertion and whiteout.

mod args;
mod dialogs;
mod logging;

use anyhow::Result;
use clap::Parser;
use dialogs::{MessageDialog, PromptAction};
use doc_model::{InteractionMode, Preferences, ScreenPoint, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
use eframe::egui;
use pdf_editor_core::{EditorSession, RenderKey};
use pdf_editor_render::PageRasterizer;
use std::path::{Path, PathBuf};
use storage::Storage;

fn main() -> Result<()> {
    let args = args::Args::parse();
    logging::init(args.log_level, args.log_file.as_deref())?;
    log::info!("starting PDF Editor {}", env!("CARGO_PKG_VERSION"));

    let storage = match Storage::from_default_project() {
        Ok(storage) => Some(storage),
        Err(err) => {
            log::warn!("preferences disabled: {err}");
            None
        }
    };

    let mut preferences = storage.as_ref().map(Storage::load_or_default).unwrap_or_default();
    if let Some(zoom) = args.zoom {
        preferences.default_zoom = zoom;
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("PDF Editor"),
        ..Default::default()
    };

    let initial_file = args.file;
    eframe::run_native(
        "PDF Editor",
        options,
        Box::new(move |_cc| Ok(Box::new(PdfEditorApp::new(preferences, storage, initial_file)))),
    )
    .map_err(|err| anyhow::anyhow!("failed to run the window: {err}"))
}

/// Texture of the page currently on screen.
struct PageTexture {
    key: RenderKey,
    pixels_per_point: f32,
    /// Size on screen in points.
    size: egui::Vec2,
    handle: egui::TextureHandle,
}

struct PdfEditorApp {
    session: EditorSession,
    storage: Option<Storage>,

    rasterizer: Result<PageRasterizer, String>,
    page_texture: Option<PageTexture>,
    // Key that last failed to render, so a broken page is not retried every frame.
    render_failure: Option<(RenderKey, String)>,

    dialog: Option<MessageDialog>,
}

impl PdfEditorApp {
    fn new(preferences: Preferences, storage: Option<Storage>, initial_file: Option<PathBuf>) -> Self {
        let rasterizer = PageRasterizer::new().map_err(|err| {
            log::error!("page rendering unavailable: {err}");
            err.to_string()
        });

        let mut app = Self {
            session: EditorSession::new(preferences),
            storage,
            rasterizer,
            page_texture: None,
            render_failure: None,
            dialog: None,
        };

        if let Some(path) = initial_file {
            app.load_pdf(path);
        }

        app
    }

    fn is_modal(&self) -> bool {
        self.dialog.is_some() || self.session.prompt().is_some()
    }

    /// Open a PDF file using the file picker
    fn open_file(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("PDF", &["pdf"]);
        if let Some(dir) = &self.session.preferences().last_directory {
            dialog = dialog.set_directory(dir);
        }

        if let Some(path) = dialog.pick_file() {
            self.load_pdf(path);
        }
    }

    fn load_pdf(&mut self, path: PathBuf) {
        match self.session.open(&path) {
            Ok(_) => {
                if let Ok(rasterizer) = &mut self.rasterizer {
                    rasterizer.invalidate();
                }
                self.remember(&path);
            }
            Err(err) => self.dialog = Some(MessageDialog::open_failed(&err)),
        }
    }

    fn save_file(&mut self) {
        if self.session.document().is_none() {
            self.dialog = Some(MessageDialog::no_file());
            return;
        }

        let mut dialog =
            rfd::FileDialog::new().add_filter("PDF", &["pdf"]).set_file_name("edited.pdf");
        if let Some(dir) = &self.session.preferences().last_directory {
            dialog = dialog.set_directory(dir);
        }

        let Some(path) = dialog.save_file() else {
            return;
        };

        match self.session.save_as(&path) {
            Ok(()) => {
                self.dialog = Some(MessageDialog::saved(&path));
                self.remember(&path);
            }
            Err(err) => self.dialog = Some(MessageDialog::save_failed(&err)),
        }
    }

    fn submit_prompt(&mut self) {
        if let Err(err) = self.session.submit_prompt() {
            log::error!("edit failed: {err}");
            self.dialog = Some(MessageDialog::edit_failed(&err));
        }
    }

    /// Stores the directory of `path` and the current zoom as preferences.
    fn remember(&mut self, path: &Path) {
        let zoom = self.session.view().scale;
        let preferences = self.session.preferences_mut();
        preferences.default_zoom = zoom;
        if let Some(parent) = path.parent() {
            preferences.last_directory = Some(parent.to_path_buf());
        }

        if let Some(storage) = &self.storage {
            if let Err(err) = storage.save_preferences(self.session.preferences()) {
                log::warn!("failed to save preferences: {err}");
            }
        }
    }

    fn refresh_page_texture(&mut self, ctx: &egui::Context) {
        let Some(key) = self.session.render_key() else {
            self.page_texture = None;
            return;
        };

        let pixels_per_point = ctx.pixels_per_point();
        let current = self
            .page_texture
            .as_ref()
            .is_some_and(|texture| texture.key == key && texture.pixels_per_point == pixels_per_point);
        let failed = self.render_failure.as_ref().is_some_and(|(failed, _)| *failed == key);
        if current || failed {
            return;
        }

        let Ok(rasterizer) = &mut self.rasterizer else {
            return;
        };

        let scale = self.session.view().scale;
        let Some(document) = self.session.document_mut() else {
            return;
        };

        let display_size = match document.page_geometry(key.page_index) {
            Ok(geometry) => geometry.display_size(),
            Err(err) => {
                self.render_failure = Some((key, err.to_string()));
                return;
            }
        };

        match rasterizer.render_page(document, key.page_index, scale, pixels_per_point) {
            Ok(page) => {
                let image = egui::ColorImage::from_rgba_unmultiplied(
                    [page.width as usize, page.height as usize],
                    &page.rgba,
                );
                let handle = ctx.load_texture(
                    format!("page_{}_{}", key.page_index, key.zoom_permille),
                    image,
                    egui::TextureOptions::LINEAR,
                );

                self.page_texture = Some(PageTexture {
                    key,
                    pixels_per_point,
                    size: egui::vec2(display_size.0 * scale, display_size.1 * scale),
                    handle,
                });
                self.render_failure = None;
            }
            Err(err) => {
                log::error!("failed to render page {}: {err}", key.page_index + 1);
                self.page_texture = None;
                self.render_failure = Some((key, err.to_string()));
            }
        }
    }
}

impl eframe::App for PdfEditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keyboard_shortcuts(ctx);
        self.draw_toolbar(ctx);
        self.draw_status_bar(ctx);
        self.refresh_page_texture(ctx);
        self.draw_canvas(ctx);
        self.draw_dialogs(ctx);
    }
}

impl PdfEditorApp {
    fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        let (open, save, previous, next, confirm, cancel) = ctx.input(|i| {
            let cmd_or_ctrl = i.modifiers.command || i.modifiers.ctrl;
            (
                cmd_or_ctrl && i.key_pressed(egui::Key::O),
                cmd_or_ctrl && i.key_pressed(egui::Key::S),
                i.key_pressed(egui::Key::ArrowLeft) || i.key_pressed(egui::Key::PageUp),
                i.key_pressed(egui::Key::ArrowRight) || i.key_pressed(egui::Key::PageDown),
                i.key_pressed(egui::Key::Enter),
                i.key_pressed(egui::Key::Escape),
            )
        });

        if self.dialog.is_some() {
            if confirm || cancel {
                self.dialog = None;
            }
            return;
        }

        if self.session.prompt().is_some() {
            if cancel {
                self.session.cancel_prompt();
            } else if confirm {
                self.submit_prompt();
            }
            return;
        }

        if open {
            self.open_file();
        } else if save {
            self.save_file();
        } else if previous {
            self.session.prev_page();
        } else if next {
            self.session.next_page();
        }
    }

    fn draw_toolbar(&mut self, ctx: &egui::Context) {
        let enabled = !self.is_modal();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| {
                ui.horizontal(|ui| {
                    ui.add_space(8.0);

                    if ui.button("Open").clicked() {
                        self.open_file();
                    }
                    if ui.button("Save As").clicked() {
                        self.save_file();
                    }

                    ui.separator();

                    let view = self.session.view().clone();
                    if ui.add_enabled(view.can_go_previous(), egui::Button::new("Prev")).clicked() {
                        self.session.prev_page();
                    }
                    if ui.add_enabled(view.can_go_next(), egui::Button::new("Next")).clicked() {
                        self.session.next_page();
                    }
                    ui.label(view.page_label());

                    ui.separator();

                    let mut zoom = view.scale;
                    let slider = egui::Slider::new(&mut zoom, MIN_ZOOM..=MAX_ZOOM)
                        .step_by(f64::from(ZOOM_STEP))
                        .text("Zoom");
                    if ui.add(slider).changed() {
                        self.session.set_zoom(zoom);
                    }

                    ui.separator();

                    let mut mode = view.mode;
                    for candidate in InteractionMode::ALL {
                        ui.radio_value(&mut mode, candidate, candidate.label());
                    }
                    if mode != view.mode {
                        self.session.set_mode(mode);
                    }
                });
            });
        });
    }

    fn draw_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(self.session.status());
        });
    }

    fn draw_canvas(&mut self, ctx: &egui::Context) {
        let accepts_clicks = !self.is_modal();

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.session.document().is_none() {
                ui.centered_and_justified(|ui| {
                    ui.heading(pdf_editor_core::INITIAL_STATUS);
                });
                return;
            }

            if let Err(message) = &self.rasterizer {
                ui.colored_label(ui.visuals().error_fg_color, format!("Cannot render pages: {message}"));
                return;
            }

            if let Some((_, message)) = &self.render_failure {
                ui.colored_label(ui.visuals().error_fg_color, format!("Render failed: {message}"));
                return;
            }

            let Some((texture_id, size)) =
                self.page_texture.as_ref().map(|texture| (texture.handle.id(), texture.size))
            else {
                return;
            };

            egui::ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
                let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click());

                ui.painter().image(
                    texture_id,
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );

                if accepts_clicks && response.clicked() {
                    if let Some(pointer) = response.interact_pointer_pos() {
                        let local = pointer - rect.min;
                        self.session.click(ScreenPoint::new(local.x, local.y));
                    }
                }
            });
        });
    }

    fn draw_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(dialog) = &self.dialog {
            if dialogs::show_message(ctx, dialog) {
                self.dialog = None;
            }
            return;
        }

        let Some(flow) = self.session.prompt_mut() else {
            return;
        };

        match dialogs::show_prompt(ctx, flow) {
            PromptAction::Submit => self.submit_prompt(),
            PromptAction::Cancel => {
                self.session.cancel_prompt();
            }
            PromptAction::None => {}
        }
    }
}
