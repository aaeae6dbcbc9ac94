pub mod interactive;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use verifile_core::models::FileDraft;
use verifile_core::validation::validate_file_size;

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays parseable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Size in kilobytes with two decimals, e.g. "500.00 KB".
pub fn format_file_size(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// MIME type from a file extension; unknown types are sent as octet-stream.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Read a local file into a draft ready for the wizard.
///
/// Files over `max_bytes` are refused from their metadata without being read.
pub fn load_file_draft(path: &Path, max_bytes: u64) -> Result<FileDraft> {
    if path
        .components()
        .any(|c| c == std::path::Component::ParentDir)
    {
        return Err(anyhow::anyhow!("Invalid input: {}", path.display()));
    }
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    validate_file_size(metadata.len(), max_bytes)?;

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();

    Ok(FileDraft::new(name, mime_for_path(path), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use verifile_core::constants::MAX_FILE_SIZE_BYTES;
    use verifile_core::validation::ValidationError;

    #[test]
    fn file_size_in_kilobytes() {
        assert_eq!(format_file_size(512_000), "500.00 KB");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(0), "0.00 KB");
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a/report.PDF")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn load_reads_name_size_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello")
            .unwrap();

        let draft = load_file_draft(&path, MAX_FILE_SIZE_BYTES).unwrap();
        assert_eq!(draft.name, "notes.txt");
        assert_eq!(draft.size, 5);
        assert_eq!(draft.mime_type, "text/plain");
    }

    #[test]
    fn load_refuses_parent_dir() {
        assert!(load_file_draft(Path::new("../secret.txt"), MAX_FILE_SIZE_BYTES).is_err());
    }

    #[test]
    fn load_refuses_oversized_file_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_FILE_SIZE_BYTES + 1).unwrap();

        let err = load_file_draft(&path, MAX_FILE_SIZE_BYTES).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::FileTooLarge { .. })
        ));
        assert_eq!(err.to_string(), "File size must be less than 10MB");

        let small = load_file_draft(&path, MAX_FILE_SIZE_BYTES + 1).unwrap();
        assert_eq!(small.size, MAX_FILE_SIZE_BYTES + 1);
    }
}
