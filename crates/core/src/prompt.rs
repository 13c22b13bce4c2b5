//! Modal prompt flows started by a canvas click.
//!
//! A flow is the continuation of one click: it remembers where the click
//! landed and walks through its input steps one submission at a time. The GUI
//! edits [`PromptFlow::input_mut`] and calls [`PromptFlow::submit`] on OK.

use crate::edit::EditRequest;
use doc_model::{DocPoint, FONT_SIZE_RANGE, WHITEOUT_SIZE_RANGE};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStep {
    Text,
    FontSize,
    Width,
    Height,
}

impl PromptStep {
    pub fn label(self) -> &'static str {
        match self {
            PromptStep::Text => "Text to insert:",
            PromptStep::FontSize => "Font size:",
            PromptStep::Width => "Rectangle width:",
            PromptStep::Height => "Rectangle height:",
        }
    }

    fn range(self) -> Option<RangeInclusive<u32>> {
        match self {
            PromptStep::Text => None,
            PromptStep::FontSize => Some(FONT_SIZE_RANGE),
            PromptStep::Width | PromptStep::Height => Some(WHITEOUT_SIZE_RANGE),
        }
    }
}

/// Result of submitting the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptProgress {
    /// Moved on to the next step.
    Next,
    /// Input rejected; the flow stays on the same step.
    Invalid(String),
    Complete(EditRequest),
    /// Empty text. Nothing will be applied.
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptFlow {
    page_index: u32,
    at: DocPoint,
    step: PromptStep,
    input: String,
    message: Option<String>,
    text: Option<String>,
    width: Option<u32>,
    /// Initial value offered by the step after the first one.
    follow_up_default: u32,
}

impl PromptFlow {
    pub fn insert_text(page_index: u32, at: DocPoint, default_font_size: u32) -> Self {
        Self {
            page_index,
            at,
            step: PromptStep::Text,
            input: String::new(),
            message: None,
            text: None,
            width: None,
            follow_up_default: default_font_size,
        }
    }

    pub fn whiteout(page_index: u32, at: DocPoint, default_width: u32, default_height: u32) -> Self {
        Self {
            page_index,
            at,
            step: PromptStep::Width,
            input: default_width.to_string(),
            message: None,
            text: None,
            width: None,
            follow_up_default: default_height,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.step {
            PromptStep::Text | PromptStep::FontSize => "Insert Text",
            PromptStep::Width | PromptStep::Height => "Whiteout",
        }
    }

    pub fn step(&self) -> PromptStep {
        self.step
    }

    pub fn position(&self) -> DocPoint {
        self.at
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    /// Validation message from the last rejected submission.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Takes the current input as the answer to the current step.
    /// Text made only of whitespace counts as empty and aborts the flow.
    pub fn submit(&mut self) -> PromptProgress {
        if self.step == PromptStep::Text {
            if self.input.trim().is_empty() {
                return PromptProgress::Aborted;
            }

            self.text = Some(std::mem::take(&mut self.input));
            self.advance(PromptStep::FontSize);
            return PromptProgress::Next;
        }

        let value = match self.step.range().map(|range| parse_in_range(&self.input, range)) {
            Some(Ok(value)) => value,
            Some(Err(message)) => {
                self.message = Some(message.clone());
                return PromptProgress::Invalid(message);
            }
            None => return PromptProgress::Aborted,
        };

        match self.step {
            PromptStep::Width => {
                self.width = Some(value);
                self.advance(PromptStep::Height);
                PromptProgress::Next
            }
            PromptStep::FontSize => PromptProgress::Complete(EditRequest::InsertText {
                page_index: self.page_index,
                at: self.at,
                text: self.text.clone().unwrap_or_default(),
                font_size: value,
            }),
            PromptStep::Height => match self.width {
                Some(width) => PromptProgress::Complete(EditRequest::Whiteout {
                    page_index: self.page_index,
                    at: self.at,
                    width,
                    height: value,
                }),
                None => PromptProgress::Aborted,
            },
            PromptStep::Text => PromptProgress::Aborted,
        }
    }

    fn advance(&mut self, step: PromptStep) {
        self.step = step;
        self.input = self.follow_up_default.to_string();
        self.message = None;
    }
}

fn parse_in_range(input: &str, range: RangeInclusive<u32>) -> Result<u32, String> {
    let message = || format!("Enter a whole number from {} to {}.", range.start(), range.end());

    match input.trim().parse::<i64>() {
        Ok(value) if value >= i64::from(*range.start()) && value <= i64::from(*range.end()) => {
            Ok(value as u32)
        }
        _ => Err(message()),
    }
}
