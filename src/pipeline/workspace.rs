use std::ffi::OsString;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Per-request file pair under the output directory.
///
/// Every path the workspace hands out is removed when it drops, together
/// with any sidecar the extractor wrote next to the raw file, so an early
/// return or a cancelled request leaves nothing behind.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    raw: PathBuf,
    compressed: PathBuf,
}

impl Workspace {
    pub fn allocate(dir: &Path) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            raw: dir.join(format!("{id}_raw.mp4")),
            compressed: dir.join(format!("{id}_smol.mp4")),
        }
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw
    }

    pub fn compressed_path(&self) -> &Path {
        &self.compressed
    }

    /// Name offered to the client for the compressed file
    pub fn file_name(&self) -> String {
        format!("{}_smol.mp4", self.id)
    }

    /// Delete the raw download once it is no longer needed.
    pub async fn discard_raw(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.raw).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// The file pair plus extractor sidecars (`<raw>.part`, `<raw>.ytdl`,
    /// `<raw>.part-Frag3`, ...) currently on disk.
    fn leftovers(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.raw.clone(), self.compressed.clone()];

        let (Some(dir), Some(raw_name)) = (self.raw.parent(), self.raw.file_name()) else {
            return paths;
        };
        let mut sidecar_prefix = OsString::from(raw_name);
        sidecar_prefix.push(".");
        let sidecar_prefix = sidecar_prefix.to_string_lossy().into_owned();

        if let Ok(entries) = std::fs::read_dir(dir) {
            paths.extend(
                entries
                    .filter_map(Result::ok)
                    .filter(|entry| {
                        entry
                            .file_name()
                            .to_string_lossy()
                            .starts_with(&sidecar_prefix)
                    })
                    .map(|entry| entry.path()),
            );
        }
        paths
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        for path in self.leftovers() {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed workspace file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove workspace file"
                ),
            }
        }
    }
}
