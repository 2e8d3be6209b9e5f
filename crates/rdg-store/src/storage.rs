//! Disk persistence for the graph store.
//!
//! The graph lives at `.rdg/graph.json` under the project root, optionally
//! zstd-compressed. A save rotates the previous graph to
//! `graph.backup.json` and lands the new image through a temp-file rename,
//! so a crash mid-write never leaves a torn graph behind and one prior
//! generation stays recoverable.

use crate::store::StoreImage;
use anyhow::{bail, Context, Result};
use rdg_core::config::StorageConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Graph format revision understood by this build. Bumped when the image
/// layout changes incompatibly; stale files are rejected with a rebuild
/// hint instead of being mis-read.
pub const FORMAT_VERSION: &str = "1.1.0";

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Handle to one project's on-disk graph.
#[derive(Debug, Clone)]
pub struct GraphStorage {
    dir: PathBuf,
    config: StorageConfig,
}

impl GraphStorage {
    /// Storage rooted at `<project_root>/.rdg` with default options.
    pub fn open(project_root: &Path) -> Self {
        Self::with_config(project_root, StorageConfig::default())
    }

    pub fn with_config(project_root: &Path, config: StorageConfig) -> Self {
        Self {
            dir: project_root.join(".rdg"),
            config,
        }
    }

    pub fn graph_path(&self) -> PathBuf {
        self.dir.join("graph.json")
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join("graph.backup.json")
    }

    pub fn exists(&self) -> bool {
        self.graph_path().exists()
    }

    /// Load the persisted image. The format revision is checked on the raw
    /// JSON before the full decode, so an incompatible file produces a
    /// usable error rather than a field-level deserialization failure.
    pub fn load(&self) -> Result<StoreImage> {
        let path = self.graph_path();
        let raw =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let json = if raw.starts_with(&ZSTD_MAGIC) {
            let bytes = zstd::stream::decode_all(raw.as_slice())
                .context("failed to decompress graph image")?;
            String::from_utf8(bytes).context("decompressed graph image is not UTF-8")?
        } else {
            String::from_utf8(raw).context("graph image is not UTF-8")?
        };

        let value: serde_json::Value =
            serde_json::from_str(&json).context("graph image is not valid JSON")?;
        match value.get("version").and_then(serde_json::Value::as_str) {
            Some(FORMAT_VERSION) => {}
            Some(found) => bail!(
                "graph image format {found} is not supported by this build \
                 (expected {FORMAT_VERSION}); delete {} and re-run analysis",
                self.dir.display()
            ),
            None => bail!(
                "graph image carries no format version; delete {} and re-run analysis",
                self.dir.display()
            ),
        }
        serde_json::from_value(value).context("failed to decode graph image")
    }

    /// Persist an image: rotate the previous graph to the backup path,
    /// then write the new one atomically.
    pub fn store(&self, image: &StoreImage) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        self.scaffold();

        let json =
            serde_json::to_string_pretty(image).context("failed to encode graph image")?;
        let bytes = if self.config.compress {
            zstd::encode_all(json.as_bytes(), 3).context("failed to compress graph image")?
        } else {
            json.into_bytes()
        };

        let path = self.graph_path();
        if path.exists() {
            fs::rename(&path, self.backup_path()).context("failed to rotate graph backup")?;
        }
        let tmp = self.dir.join("graph.json.tmp");
        fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move graph image into {}", path.display()))?;
        Ok(())
    }

    /// First-save scaffolding: keep local config out of version control.
    fn scaffold(&self) {
        let gitignore = self.dir.join(".gitignore");
        if !gitignore.exists() {
            let _ = fs::write(&gitignore, "config.toml\n");
        }
    }
}
