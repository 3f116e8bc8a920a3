use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Semantic category assigned to every scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Video,
    Image,
    Audio,
    Document,
    Archive,
    Application,
    Other,
}

impl FileType {
    /// Parses a user-facing type name, as written in config remaps.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "video" | "videos" => Some(FileType::Video),
            "image" | "images" => Some(FileType::Image),
            "audio" => Some(FileType::Audio),
            "document" | "documents" => Some(FileType::Document),
            "archive" | "archives" => Some(FileType::Archive),
            "application" | "applications" => Some(FileType::Application),
            "other" => Some(FileType::Other),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileType::Video => "Videos",
            FileType::Image => "Images",
            FileType::Audio => "Audio",
            FileType::Document => "Documents",
            FileType::Archive => "Archives",
            FileType::Application => "Applications",
            FileType::Other => "Other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn map_extension(ext: &str) -> FileType {
    match ext {
        "mp4" | "avi" | "mkv" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg" => {
            FileType::Video
        }
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" | "tiff" | "heic"
        | "heif" | "raw" => FileType::Image,
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "wma" | "opus" | "aiff" => {
            FileType::Audio
        }
        "pdf" | "doc" | "docx" | "txt" | "odt" | "rtf" | "tex" | "md" | "pages" | "xls"
        | "xlsx" | "csv" | "numbers" | "ppt" | "pptx" | "key" => FileType::Document,
        "zip" | "tar" | "gz" | "bz2" | "7z" | "rar" | "xz" | "zst" | "tgz" | "dmg" | "iso" => {
            FileType::Archive
        }
        "app" | "pkg" | "exe" | "msi" | "deb" | "rpm" | "appimage" => FileType::Application,
        _ => FileType::Other,
    }
}

/// Maps a path to its semantic file type.
///
/// Pure and total: comparison is case-insensitive on the extension, any
/// `.app` path segment classifies as an application, and everything
/// unrecognized falls back to `Other`.
pub fn classify(path: &Path) -> FileType {
    classify_with(path, None)
}

/// Per-scan extension remaps layered over the built-in extension sets,
/// typically sourced from the config file.
#[derive(Debug, Clone, Default)]
pub struct TypeOverrides {
    map: HashMap<String, FileType>,
}

impl TypeOverrides {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, FileType)>) -> Self {
        Self {
            map: pairs
                .into_iter()
                .map(|(ext, file_type)| (ext.to_lowercase(), file_type))
                .collect(),
        }
    }

    /// Same contract as `classify`, with the override table consulted
    /// before the built-in mapping. Bundle detection is not overridable.
    pub fn classify(&self, path: &Path) -> FileType {
        classify_with(path, Some(&self.map))
    }
}

fn classify_with(path: &Path, overrides: Option<&HashMap<String, FileType>>) -> FileType {
    // An .app bundle anywhere in the path marks application internals.
    let inside_bundle = path
        .components()
        .any(|c| c.as_os_str().to_string_lossy().to_lowercase().ends_with(".app"));
    if inside_bundle {
        return FileType::Application;
    }

    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let ext = e.to_lowercase();
            overrides
                .and_then(|map| map.get(&ext).copied())
                .unwrap_or_else(|| map_extension(&ext))
        })
        .unwrap_or(FileType::Other)
}
