use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Extensions read as plain text
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "text"];

/// Images and documents a vision-capable provider reads directly
pub const MEDIA_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf"];

/// Document and image formats that need a parser or OCR first
const UNSUPPORTED_EXTENSIONS: &[&str] = &["docx", "doc", "odt", "rtf", "epub", "gif", "bmp", "tif", "tiff", "webp"];

/// Media formats sent to the provider as inline bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Png,
    Jpeg,
    Pdf,
}

impl MediaType {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Pdf => "application/pdf",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// An image or document loaded for text extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInput {
    /// File name, for logs
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl MediaInput {
    /// Load `path` as `media_type`
    pub fn read<P: AsRef<Path>>(path: P, media_type: MediaType) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self { name, media_type, bytes })
    }
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Output path for a translated text, `<stem>.<target>.txt`
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(target_language);
        output_filename.push_str(".txt");

        output_dir.as_ref().join(output_filename)
    }

    /// Whether `path` looks like a translation this tool already produced
    pub fn is_translation_output<P: AsRef<Path>>(path: P, target_language: &str) -> bool {
        path.as_ref()
            .file_stem()
            .map(|stem| {
                stem.to_string_lossy()
                    .to_lowercase()
                    .ends_with(&format!(".{}", target_language.to_lowercase()))
            })
            .unwrap_or(false)
    }

    /// Find files with any of `extensions` below `dir`, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy();
                let wanted = extensions
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate.trim_start_matches('.')));
                if wanted {
                    result.push(path.to_path_buf());
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Classify an input file by extension
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(FileType::PlainText);
        }
        if let Some(media_type) = MediaType::from_extension(&ext) {
            return Ok(FileType::Media(media_type));
        }
        if UNSUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(FileType::Unsupported(ext));
        }

        // No known extension: accept anything that decodes as UTF-8
        match fs::read(path) {
            Ok(bytes) if std::str::from_utf8(&bytes).is_ok() => Ok(FileType::PlainText),
            _ => Ok(FileType::Unknown),
        }
    }
}

/// Input file classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    /// UTF-8 text, translated as is
    PlainText,
    /// An image or PDF whose text must be extracted first
    Media(MediaType),
    /// A document or image format that is not read (carries the extension)
    Unsupported(String),
    /// Binary or otherwise unrecognized content
    Unknown,
}
