use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

const DEFAULT_NAME_PREFIX: &str = "Screenshot-";
const PICTURES_SUBDIR: &str = "Pictures";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("image name is empty")]
    MissingName,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

pub trait CaptureStorage {
    fn save_png(&self, name: &str, png: &[u8]) -> StorageResult<PathBuf>;
}

/// Writes exported images into a pictures directory.
#[derive(Debug, Clone)]
pub struct StorageService {
    pictures_dir: PathBuf,
}

impl StorageService {
    pub const fn with_pictures_dir(pictures_dir: PathBuf) -> Self {
        Self { pictures_dir }
    }

    pub fn with_default_paths() -> StorageResult<Self> {
        let home = std::env::var("HOME").map_err(|_| StorageError::MissingHomeDirectory)?;
        let mut pictures_dir = PathBuf::from(home);
        pictures_dir.push(PICTURES_SUBDIR);
        Ok(Self::with_pictures_dir(pictures_dir))
    }

    pub fn pictures_dir(&self) -> &Path {
        &self.pictures_dir
    }

    pub fn allocate_target_path(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty() {
            return Err(StorageError::MissingName);
        }
        let mut path = self.pictures_dir.clone();
        path.push(format!("{name}.png"));
        Ok(path)
    }

    pub fn save_png(&self, name: &str, png: &[u8]) -> StorageResult<PathBuf> {
        let target = self.allocate_target_path(name)?;
        write_overwrite(&target, png)?;
        tracing::info!(path = %target.display(), bytes = png.len(), "saved image");
        Ok(target)
    }
}

impl CaptureStorage for StorageService {
    fn save_png(&self, name: &str, png: &[u8]) -> StorageResult<PathBuf> {
        StorageService::save_png(self, name, png)
    }
}

/// File stem for an export made at `time`, e.g. `Screenshot-1718000000123`.
pub fn default_image_name(time: SystemTime) -> String {
    let millis = time
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0);
    format!("{DEFAULT_NAME_PREFIX}{millis}")
}

fn write_overwrite(destination: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(destination, bytes)?;
    Ok(())
}
