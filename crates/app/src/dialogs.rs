//! Modal windows: message dialogs and the prompt flow.

use eframe::egui;
use pdf_editor_core::{EditorError, PromptFlow};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Error,
    Info,
}

impl Severity {
    fn icon(&self) -> &'static str {
        match self {
            Severity::Error => "❌",
            Severity::Info => "ℹ️",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDialog {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl MessageDialog {
    fn new(severity: Severity, title: &str, message: impl Into<String>) -> Self {
        Self { severity, title: title.to_string(), message: message.into() }
    }

    pub fn open_failed(error: &EditorError) -> Self {
        Self::new(Severity::Error, "Open Failed", format!("Could not open PDF.\n\n{error}"))
    }

    pub fn save_failed(error: &EditorError) -> Self {
        Self::new(Severity::Error, "Save Failed", format!("Could not save PDF.\n\n{error}"))
    }

    pub fn edit_failed(error: &EditorError) -> Self {
        Self::new(Severity::Error, "Edit Failed", format!("Could not apply the edit.\n\n{error}"))
    }

    pub fn no_file() -> Self {
        Self::new(Severity::Info, "No File", "Open a PDF before saving.")
    }

    pub fn saved(path: &Path) -> Self {
        Self::new(Severity::Info, "Saved", format!("Saved edited PDF to:\n{}", path.display()))
    }
}

/// Draws `dialog`; returns true once it was dismissed.
pub fn show_message(ctx: &egui::Context, dialog: &MessageDialog) -> bool {
    let title = format!("{} {}", dialog.severity.icon(), dialog.title);

    let mut should_close = false;
    egui::Window::new(title)
        .id(egui::Id::new("message_dialog"))
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(&dialog.message);
            ui.add_space(12.0);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                if ui.button("OK").clicked() {
                    should_close = true;
                }
            });
        });

    should_close
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    None,
    Submit,
    Cancel,
}

pub fn show_prompt(ctx: &egui::Context, flow: &mut PromptFlow) -> PromptAction {
    let mut action = PromptAction::None;

    egui::Window::new(flow.title())
        .id(egui::Id::new("prompt_dialog"))
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(flow.step().label());

            let response =
                ui.add(egui::TextEdit::singleline(flow.input_mut()).desired_width(240.0));
            if !response.has_focus() {
                response.request_focus();
            }

            if let Some(message) = flow.message() {
                ui.colored_label(ui.visuals().error_fg_color, message);
            }

            ui.add_space(12.0);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                if ui.button("OK").clicked() {
                    action = PromptAction::Submit;
                }
                if ui.button("Cancel").clicked() {
                    action = PromptAction::Cancel;
                }
            });
        });

    action
}
