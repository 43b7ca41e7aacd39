use std::path::Path;

use eframe::egui;

use crate::error::FileError;
use crate::exchange::InputFormat;

/// A file read into memory and recognised as an upload format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub name: String,
    pub format: InputFormat,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct FileHandler {
    dropped_files: Vec<egui::DroppedFile>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects files dropped onto the window this frame.
    /// Returns true if any arrived.
    pub fn check_for_dropped_files(&mut self, ctx: &egui::Context) -> bool {
        ctx.input(|i| {
            if i.raw.dropped_files.is_empty() {
                false
            } else {
                self.dropped_files = i.raw.dropped_files.clone();
                true
            }
        })
    }

    /// Reads every pending dropped file. Unsupported or unreadable files are
    /// reported individually.
    pub fn take_dropped_files(&mut self) -> Vec<Result<LoadedFile, FileError>> {
        std::mem::take(&mut self.dropped_files)
            .into_iter()
            .map(|file| load_dropped(&file))
            .collect()
    }

    /// Shows an overlay while files are dragged over the window.
    pub fn preview_files_being_dropped(&self, ctx: &egui::Context) {
        use egui::{Align2, Color32, Id, LayerId, Order};

        if ctx.input(|i| i.raw.hovered_files.is_empty()) {
            return;
        }
        let text = ctx.input(|i| {
            let mut text = "Drop to upload:\n".to_owned();
            for file in &i.raw.hovered_files {
                match &file.path {
                    Some(path) => text += &format!("\n{}", path.display()),
                    None => text += "\n(Path not available)",
                }
            }
            text
        });

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
        let screen_rect = ctx.screen_rect();
        painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
        painter.text(
            screen_rect.center(),
            Align2::CENTER_CENTER,
            text,
            egui::TextStyle::Heading.resolve(&ctx.style()),
            Color32::WHITE,
        );
    }
}

/// Reads an upload chosen by path.
pub fn load_path(path: &Path) -> Result<LoadedFile, FileError> {
    let name = display_name(path);
    let format = InputFormat::from_path(path).ok_or_else(|| FileError::Unsupported { name: name.clone() })?;
    log::info!("Reading upload from {}", path.display());
    let bytes = std::fs::read(path).map_err(|source| FileError::Read {
        name: name.clone(),
        source,
    })?;
    Ok(LoadedFile { name, format, bytes })
}

fn load_dropped(file: &egui::DroppedFile) -> Result<LoadedFile, FileError> {
    if let Some(path) = &file.path {
        return load_path(path);
    }
    let name = if file.name.is_empty() {
        "unknown".to_owned()
    } else {
        file.name.clone()
    };
    let format = InputFormat::from_path(Path::new(&name)).ok_or_else(|| FileError::Unsupported { name: name.clone() })?;
    match &file.bytes {
        Some(bytes) => {
            log::info!("Processing dropped file from memory: {} ({} bytes)", name, bytes.len());
            Ok(LoadedFile {
                name,
                format,
                bytes: bytes.to_vec(),
            })
        }
        None => Err(FileError::NoContents { name }),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
