use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    FILE_ITEM_ICON, TEXT_ITEM_ICON, TITLE_ELLIPSIS, TITLE_MAX_CHARS, TITLE_TRUNCATED_CHARS,
};
use crate::utils::MarkError;

/// A single unit of context contributed to the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextItem {
    Text(TextItem),
    File(FileItem),
}

impl ContextItem {
    /// Short glyph shown next to the item in lists
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Text(_) => TEXT_ITEM_ICON,
            Self::File(_) => FILE_ITEM_ICON,
        }
    }

    /// Short display label, never longer than 50 characters for text items
    pub fn title(&self) -> String {
        match self {
            Self::Text(item) => item.title(),
            Self::File(item) => item.title(),
        }
    }

    /// Full text this item contributes to the prompt
    pub fn message(&self) -> String {
        match self {
            Self::Text(item) => item.message().to_string(),
            Self::File(item) => item.message(),
        }
    }

    /// Icon and title joined the way lists render them
    pub fn label(&self) -> String {
        format!("{} {}", self.icon(), self.title())
    }
}

impl From<TextItem> for ContextItem {
    fn from(item: TextItem) -> Self {
        Self::Text(item)
    }
}

impl From<FileItem> for ContextItem {
    fn from(item: FileItem) -> Self {
        Self::File(item)
    }
}

/// User-entered text, trimmed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    content: String,
}

impl TextItem {
    pub fn new(content: impl AsRef<str>) -> Self {
        Self {
            content: content.as_ref().trim().to_string(),
        }
    }

    pub fn title(&self) -> String {
        if self.content.chars().count() > TITLE_MAX_CHARS {
            let head: String = self.content.chars().take(TITLE_TRUNCATED_CHARS).collect();
            format!("{}{}", head, TITLE_ELLIPSIS)
        } else {
            self.content.clone()
        }
    }

    pub fn message(&self) -> &str {
        &self.content
    }
}

/// A file on disk, validated at construction and read lazily
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    path: PathBuf,
}

impl FileItem {
    /// Create a file item, failing if the path is missing or not a regular file
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, MarkError> {
        let path = path.into();
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MarkError::NotFound(path));
            }
            Err(e) => return Err(MarkError::Io(e)),
        };

        if !metadata.is_file() {
            return Err(MarkError::NotAFile(path));
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name of the file
    pub fn title(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Formatted file block; read errors degrade into an inline diagnostic
    pub fn message(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(contents) => format!("File: {}\n\n{}", self.path.display(), contents),
            Err(e) => format!("Error reading file {}: {}", self.path.display(), e),
        }
    }
}
