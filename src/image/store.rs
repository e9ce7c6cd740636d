use super::ImageStore;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

/// Ticks (100 ns units) between 0001-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Writes images as `generated_image_<ticks>.<ext>` under `output_dir`.
pub struct DiskImageStore {
    output_dir: PathBuf,
    extension: String,
    last_tick: AtomicI64,
}

impl DiskImageStore {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            extension: "png".to_string(),
            last_tick: AtomicI64::new(0),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Next file name token; strictly greater than any previously issued one.
    fn next_tick(&self) -> i64 {
        let now = ticks_at(Utc::now());
        let previous = self
            .last_tick
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    fn file_name(&self, tick: i64) -> String {
        format!("generated_image_{}.{}", tick, self.extension)
    }
}

fn ticks_at(time: DateTime<Utc>) -> i64 {
    UNIX_EPOCH_TICKS
        + time.timestamp() * TICKS_PER_SECOND
        + i64::from(time.timestamp_subsec_nanos() / 100)
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn save_image(&self, image_data: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let path = self.output_dir.join(self.file_name(self.next_tick()));
        let partial = path.with_extension(format!("{}.part", self.extension));

        // Only whole files ever appear under the final name.
        if let Err(e) = tokio::fs::write(&partial, image_data).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        tokio::fs::rename(&partial, &path).await?;

        tracing::debug!("Wrote {} bytes to {}", image_data.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_ticks_match_dotnet_epoch() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(ticks_at(epoch), UNIX_EPOCH_TICKS);

        let later = Utc.timestamp_opt(1, 500).unwrap();
        assert_eq!(ticks_at(later), UNIX_EPOCH_TICKS + TICKS_PER_SECOND + 5);
    }

    #[test]
    fn test_ticks_are_strictly_increasing() {
        let store = DiskImageStore::new(Path::new("unused"));
        let mut previous = store.next_tick();
        for _ in 0..1000 {
            let tick = store.next_tick();
            assert!(tick > previous);
            previous = tick;
        }
    }

    #[tokio::test]
    async fn test_save_image_writes_bytes_verbatim() {
        let dir = TempDir::new().unwrap();
        let output_dir = dir.path().join("Images");
        let store = DiskImageStore::new(&output_dir);
        let data = vec![0x89, 0x50, 0x4E, 0x47, 0x00, 0x01, 0x02];

        let path = store.save_image(&data).await.unwrap();

        assert_eq!(path.parent().unwrap(), output_dir.as_path());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("generated_image_"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), data);

        let entries: Vec<_> = std::fs::read_dir(&output_dir).unwrap().collect();
        assert_eq!(entries.len(), 1, "no temp file should remain");
    }

    #[tokio::test]
    async fn test_unique_filenames() {
        let dir = TempDir::new().unwrap();
        let store = DiskImageStore::new(dir.path()).with_extension(".webp");

        let first = store.save_image(b"one").await.unwrap();
        let second = store.save_image(b"two").await.unwrap();

        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with(".webp"));
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_save_image_fails_when_output_dir_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("Images");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = DiskImageStore::new(&blocker);
        let err = store.save_image(b"data").await.unwrap_err();
        assert!(!err.is_fatal());
    }
}
