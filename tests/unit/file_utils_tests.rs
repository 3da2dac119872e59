/*!
 * Tests for file and folder utilities
 */

use anyhow::Result;
use std::fs;

use vitranslate::file_utils::{FileManager, FileType, MEDIA_EXTENSIONS, MediaInput, MediaType, TEXT_EXTENSIONS};

use crate::common;

#[test]
fn test_write_to_file_withMissingParent_shouldCreateIt() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("out/nested/notes.vi.txt");

    FileManager::write_to_file(&path, "Xin chào")?;

    assert_eq!(FileManager::read_to_string(&path)?, "Xin chào");
    assert!(dir.path().join("out/nested").is_dir());
    assert!(path.is_file());
    Ok(())
}

#[test]
fn test_read_to_string_withMissingFile_shouldFail() {
    assert!(FileManager::read_to_string("/definitely/not/here.txt").is_err());
}

#[test]
fn test_append_to_log_file_shouldTimestampEachLine() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let log = dir.path().join("issues.log");

    FileManager::append_to_log_file(&log, "first")?;
    FileManager::append_to_log_file(&log, "second")?;

    let content = fs::read_to_string(&log)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('[') && lines[0].ends_with("] first"));
    assert!(lines[1].ends_with("] second"));
    Ok(())
}

#[test]
fn test_detect_file_type_withMarkdownAndDocx_shouldClassify() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let markdown = common::create_test_file(dir.path(), "readme.md", "# Title")?;
    let docx = common::create_test_file(dir.path(), "report.DOCX", "PK")?;
    let no_ext = common::create_test_file(dir.path(), "LICENSE", "MIT License")?;

    assert_eq!(FileManager::detect_file_type(&markdown)?, FileType::PlainText);
    assert_eq!(FileManager::detect_file_type(&docx)?, FileType::Unsupported("docx".to_string()));
    assert_eq!(FileManager::detect_file_type(&no_ext)?, FileType::PlainText);
    Ok(())
}

#[test]
fn test_find_files_shouldIgnoreOtherExtensions() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(dir.path(), "a.txt", "a")?;
    common::create_test_file(dir.path(), "deep/er/b.markdown", "b")?;
    common::create_test_file(dir.path(), "c.rs", "fn main() {}")?;

    let files = FileManager::find_files(dir.path(), TEXT_EXTENSIONS)?;

    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.extension().is_some_and(|e| e != "rs")));
    Ok(())
}

#[test]
fn test_generate_output_path_withoutExtension_shouldStillSuffix() {
    let path = FileManager::generate_output_path("LICENSE", "out", "vi");
    assert_eq!(path, std::path::PathBuf::from("out/LICENSE.vi.txt"));
    assert!(FileManager::is_translation_output(&path, "vi"));
}

#[test]
fn test_detect_file_type_withImagesAndPdf_shouldClassifyAsMedia() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let photo = common::create_test_file(dir.path(), "photo.JPEG", "jpeg")?;
    let screenshot = common::create_test_file(dir.path(), "shot.png", "png")?;
    let gif = common::create_test_file(dir.path(), "anim.gif", "gif")?;

    assert_eq!(FileManager::detect_file_type(&photo)?, FileType::Media(MediaType::Jpeg));
    assert_eq!(FileManager::detect_file_type(&screenshot)?, FileType::Media(MediaType::Png));
    assert_eq!(FileManager::detect_file_type(&gif)?, FileType::Unsupported("gif".to_string()));
    Ok(())
}

#[test]
fn test_media_input_read_shouldKeepBytesAndName() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("page.pdf");
    fs::write(&path, [0x25u8, 0x50, 0x44, 0x46, 0x00, 0xff])?;

    let input = MediaInput::read(&path, MediaType::Pdf)?;

    assert_eq!(input.name, "page.pdf");
    assert_eq!(input.media_type.mime_type(), "application/pdf");
    assert_eq!(input.bytes, vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xff]);
    assert!(MediaInput::read(dir.path().join("missing.png"), MediaType::Png).is_err());
    Ok(())
}

#[test]
fn test_find_files_withMediaExtensions_shouldFindScans() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(dir.path(), "a.txt", "a")?;
    common::create_test_file(dir.path(), "b.jpg", "b")?;
    common::create_test_file(dir.path(), "c.pdf", "c")?;

    assert_eq!(FileManager::find_files(dir.path(), MEDIA_EXTENSIONS)?.len(), 2);
    Ok(())
}
