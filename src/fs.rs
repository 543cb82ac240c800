use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File access used by project discovery and the image check.
#[tower_lsp::async_trait]
pub trait FileSystem: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<String>;

    async fn file_exists(&self, path: &Path) -> bool;

    /// Files under `root` whose name matches `pattern` (`*` matches any run
    /// of characters), sorted.
    async fn find_files(&self, pattern: &str, root: &Path) -> Vec<PathBuf>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

#[tower_lsp::async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_file(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn file_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false)
    }

    async fn find_files(&self, pattern: &str, root: &Path) -> Vec<PathBuf> {
        let pattern = pattern.to_string();
        let root = root.to_path_buf();
        let walk = tokio::task::spawn_blocking(move || {
            let mut found: Vec<PathBuf> = WalkDir::new(&root)
                .follow_links(false)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        log::warn!("skipping unreadable entry under {}: {}", root.display(), err);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    entry
                        .file_name()
                        .to_str()
                        .map(|name| matches_pattern(&pattern, name))
                        .unwrap_or(false)
                })
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            found
        });

        match walk.await {
            Ok(found) => found,
            Err(err) => {
                log::warn!("workspace scan failed: {}", err);
                Vec::new()
            }
        }
    }
}

/// Match a file name against a pattern where `*` stands for any run of
/// characters. Extensions compare case-insensitively.
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let name = name.to_ascii_lowercase();
    let mut parts = pattern.split('*');

    let first = parts.next().unwrap_or("");
    let Some(mut rest) = name.strip_prefix(first) else {
        return false;
    };

    let remaining: Vec<&str> = parts.collect();
    let Some((last, middle)) = remaining.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::HashMap;

    /// In-memory file system for tests.
    #[derive(Debug, Default)]
    pub struct MemoryFileSystem {
        files: HashMap<PathBuf, String>,
    }

    impl MemoryFileSystem {
        pub fn with_files(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(path, text)| (PathBuf::from(path), text.to_string()))
                    .collect(),
            }
        }
    }

    #[tower_lsp::async_trait]
    impl FileSystem for MemoryFileSystem {
        async fn read_file(&self, path: &Path) -> Result<String> {
            self.files.get(path).cloned().ok_or_else(|| Error::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }

        async fn file_exists(&self, path: &Path) -> bool {
            self.files.contains_key(path)
        }

        async fn find_files(&self, pattern: &str, root: &Path) -> Vec<PathBuf> {
            let mut found: Vec<PathBuf> = self
                .files
                .keys()
                .filter(|path| path.starts_with(root))
                .filter(|path| {
                    path.file_name()
                        .and_then(|name| name.to_str())
                        .map(|name| matches_pattern(pattern, name))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            found.sort();
            found
        }
    }
}
