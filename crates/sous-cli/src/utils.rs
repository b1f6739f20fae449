//! Attachment helpers

use anyhow::Context;
use sous_chat::Attachment;
use std::path::Path;

/// Guess a media type from a file extension
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("txt") => "text/plain",
        Some("yaml" | "yml") => "application/yaml",
        _ => "application/octet-stream",
    }
}

/// Read a file into an attachment
pub async fn load_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading attachment {}", path.display()))?;

    let mut attachment = Attachment::new(bytes, media_type_for(path));
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        attachment = attachment.with_file_name(name);
    }
    Ok(attachment)
}
