use crm_core::CrmResult;
use std::path::Path;
use tokio::fs;

/// Temp-file-then-rename writer so a crash mid-save never leaves a
/// truncated pipeline file behind.
pub struct AtomicWriter;

impl AtomicWriter {
    pub async fn write_atomic(path: &Path, data: &[u8]) -> CrmResult<()> {
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).await?;

        // Same directory as the target so the rename never crosses filesystems
        let temp_path = tempfile::NamedTempFile::new_in(parent)?.into_temp_path();
        fs::write(&temp_path, data).await?;
        temp_path.persist(path).map_err(|e| e.error)?;

        tracing::debug!(bytes = data.len(), path = %path.display(), "Atomic write");
        Ok(())
    }

    /// `None` when the file does not exist yet.
    pub async fn read_if_exists(path: &Path) -> CrmResult<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
