use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// Supplies the text of imported scripts. `None` means the path does not
/// resolve to a readable script.
#[mockall::automock]
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn read_script(&self, path: &str) -> Option<String>;
}

/// Resolves `path` against `cwd` into an absolute `/`-separated path,
/// collapsing `.`, `..` and repeated slashes. `..` at the root stays at the root.
pub fn normalize_path(path: &str, cwd: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd, path)
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/').filter(|p| !p.is_empty()) {
        match part {
            "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    format!("/{}", parts.join("/"))
}

/// In-memory file tree keyed by normalized absolute path.
#[derive(Debug)]
pub struct MemoryScriptSource {
    files: DashMap<String, String>,
    cwd: String,
}

impl Default for MemoryScriptSource {
    fn default() -> Self {
        Self {
            files: DashMap::new(),
            cwd: "/".to_string(),
        }
    }
}

impl MemoryScriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative import paths resolve against `cwd`.
    pub fn with_cwd(cwd: impl AsRef<str>) -> Self {
        Self {
            files: DashMap::new(),
            cwd: normalize_path(cwd.as_ref(), "/"),
        }
    }

    pub fn insert(&self, path: &str, content: impl Into<String>) {
        self.files
            .insert(normalize_path(path, &self.cwd), content.into());
    }

    pub fn remove(&self, path: &str) -> Option<String> {
        self.files
            .remove(&normalize_path(path, &self.cwd))
            .map(|(_, content)| content)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl ScriptSource for MemoryScriptSource {
    async fn read_script(&self, path: &str) -> Option<String> {
        let resolved = normalize_path(path, &self.cwd);
        self.files.get(&resolved).map(|entry| entry.value().clone())
    }
}

/// Reads scripts from the file system. Relative paths resolve against `root`.
#[derive(Debug, Clone)]
pub struct FsScriptSource {
    root: PathBuf,
}

impl FsScriptSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl ScriptSource for FsScriptSource {
    async fn read_script(&self, path: &str) -> Option<String> {
        let resolved = self.resolve(path);
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("cannot read script {}: {}", resolved.display(), e);
                None
            }
        }
    }
}
