// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! On-disk cache path layout.
//!
//! Entries live under `<user-data>/<vendor>/imagecache/` and are addressed
//! by the MD5 of the source's absolute path. The first two hex digits of
//! the digest shard entries across subdirectories so no single directory
//! grows huge: `<base>/<2 hex>/<32 hex>[_levelNN].<ext>`.

use std::path::{Path, PathBuf};

/// Resolves and builds cache entry paths for one vendor.
#[derive(Debug, Clone)]
pub struct CacheDirs {
    base: PathBuf,
}

impl CacheDirs {
    /// Discovers the per-user image cache directory for `vendor`, falling
    /// back to the shared temp directory when the platform has no user-data
    /// convention.
    pub fn discover(vendor: &str) -> Self {
        let root = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            base: root.join(vendor).join("imagecache"),
        }
    }

    /// Uses an explicit base directory. Tests point this at a tempdir.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The cache base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The entry path for `source`'s whole-image cache file.
    pub fn image_entry(&self, source: &Path, ext: &str) -> PathBuf {
        self.entry(source, None, ext)
    }

    /// The entry path for one mip level of `source`.
    pub fn level_entry(&self, source: &Path, level: u32, ext: &str) -> PathBuf {
        self.entry(source, Some(level), ext)
    }

    fn entry(&self, source: &Path, level: Option<u32>, ext: &str) -> PathBuf {
        let digest = format!("{:x}", md5::compute(absolute_key(source).as_bytes()));
        let shard = &digest[..2];
        let name = match level {
            Some(level) => format!("{digest}_level{level:02}.{ext}"),
            None => format!("{digest}.{ext}"),
        };
        self.base.join(shard).join(name)
    }
}

// Cache identity is the absolute path string, so the same file referenced
// relatively and absolutely maps to one entry.
fn absolute_key(source: &Path) -> String {
    if source.is_absolute() {
        source.to_string_lossy().into_owned()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(source))
            .unwrap_or_else(|_| source.to_path_buf())
            .to_string_lossy()
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_sharded_by_digest_prefix() {
        let dirs = CacheDirs::with_base("/tmp/embercache");
        let path = dirs.image_entry(Path::new("/assets/brick.png"), "dds");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let shard = path
            .parent()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert_eq!(name.len(), 32 + 4);
        assert!(name.ends_with(".dds"));
        assert_eq!(shard, name[..2].to_string());
    }

    #[test]
    fn level_suffix_is_zero_padded() {
        let dirs = CacheDirs::with_base("/tmp/embercache");
        let path = dirs.level_entry(Path::new("/assets/brick.png"), 3, "dds");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.contains("_level03."), "{name}");
    }

    #[test]
    fn same_source_same_entry() {
        let dirs = CacheDirs::with_base("/tmp/embercache");
        let a = dirs.image_entry(Path::new("/assets/brick.png"), "dds");
        let b = dirs.image_entry(Path::new("/assets/brick.png"), "dds");
        let c = dirs.image_entry(Path::new("/assets/other.png"), "dds");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
