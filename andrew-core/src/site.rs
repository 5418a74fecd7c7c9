use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One entry produced by [`SiteFiles::walk`]. `path` is relative to the
/// site root and always `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub is_dir: bool,
}

impl Entry {
    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn extension(&self) -> Option<&str> {
        get_extension(&self.path)
    }
}

/// The read-only content tree a server renders from.
///
/// Paths handed to these methods are site-relative and `/`-separated. A
/// leading `/` or `./` is ignored, and both `""` and `"."` name the root.
/// Implementations must tolerate concurrent calls from many requests.
pub trait SiteFiles: Send + Sync {
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    fn modified(&self, path: &str) -> Result<SystemTime>;

    fn is_dir(&self, path: &str) -> bool;

    /// Every entry at or below `root`, the root itself included.
    fn walk(&self, root: &str) -> Result<Vec<Entry>>;
}

/// A site tree backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        for segment in normalize(path).split('/').filter(|s| !s.is_empty()) {
            full.push(segment);
        }
        full
    }
}

impl SiteFiles for DirFs {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        std::fs::read(self.resolve(path)).map_err(|e| Error::io(normalize(path), e))
    }

    fn modified(&self, path: &str) -> Result<SystemTime> {
        std::fs::metadata(self.resolve(path))
            .and_then(|meta| meta.modified())
            .map_err(|e| Error::io(normalize(path), e))
    }

    fn is_dir(&self, path: &str) -> bool {
        self.resolve(path).is_dir()
    }

    fn walk(&self, root: &str) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(self.resolve(root)).sort_by_file_name() {
            let entry = entry.map_err(|source| Error::Walk {
                path: normalize(root).to_string(),
                source,
            })?;

            let relative = entry.path().strip_prefix(&self.root).map_err(|_| {
                Error::io(
                    entry.path().display().to_string(),
                    io::Error::other("entry escaped the site root"),
                )
            })?;

            entries.push(Entry {
                path: to_site_path(relative),
                is_dir: entry.file_type().is_dir(),
            });
        }

        Ok(entries)
    }
}

#[derive(Debug, Clone)]
struct MemFile {
    data: Vec<u8>,
    modified: SystemTime,
}

/// An in-memory site tree. Directories exist implicitly as the parents of
/// the files inserted into it.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    files: BTreeMap<String, MemFile>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with a modification time of the unix epoch.
    pub fn with_file(self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.with_file_modified(path, data, SystemTime::UNIX_EPOCH)
    }

    pub fn with_file_modified(
        mut self,
        path: &str,
        data: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) -> Self {
        self.insert(path, data, modified);
        self
    }

    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>, modified: SystemTime) {
        self.files.insert(
            normalize(path).to_string(),
            MemFile {
                data: data.into(),
                modified,
            },
        );
    }

    fn has_dir(&self, dir: &str) -> bool {
        if dir.is_empty() {
            return true;
        }
        let prefix = format!("{dir}/");
        self.files.keys().any(|path| path.starts_with(&prefix))
    }
}

impl SiteFiles for MemFs {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        match self.files.get(path) {
            Some(file) => Ok(file.data.clone()),
            None if self.has_dir(path) => Err(Error::io(
                path,
                io::Error::other("is a directory"),
            )),
            None => Err(Error::io(path, io::Error::from(io::ErrorKind::NotFound))),
        }
    }

    fn modified(&self, path: &str) -> Result<SystemTime> {
        let path = normalize(path);
        match self.files.get(path) {
            Some(file) => Ok(file.modified),
            None if self.has_dir(path) => Ok(SystemTime::UNIX_EPOCH),
            None => Err(Error::io(path, io::Error::from(io::ErrorKind::NotFound))),
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        let path = normalize(path);
        !self.files.contains_key(path) && self.has_dir(path)
    }

    fn walk(&self, root: &str) -> Result<Vec<Entry>> {
        let root = normalize(root);

        if self.files.contains_key(root) {
            return Ok(vec![Entry {
                path: root.to_string(),
                is_dir: false,
            }]);
        }
        if !self.has_dir(root) {
            return Err(Error::io(root, io::Error::from(io::ErrorKind::NotFound)));
        }

        let prefix = if root.is_empty() {
            String::new()
        } else {
            format!("{root}/")
        };

        // path -> is_dir, so implied directories sort in among the files
        let mut found: BTreeMap<String, bool> = BTreeMap::new();
        found.insert(root.to_string(), true);

        for path in self.files.keys().filter(|p| p.starts_with(&prefix)) {
            let mut parent = parent_dir(path);
            while parent.len() > root.len() {
                found.insert(parent.to_string(), true);
                parent = parent_dir(parent);
            }
            found.insert(path.clone(), false);
        }

        Ok(found
            .into_iter()
            .map(|(path, is_dir)| Entry { path, is_dir })
            .collect())
    }
}

/// Strip a leading `/` or `./` and map `.` to the root.
pub fn normalize(path: &str) -> &str {
    let path = path.trim_start_matches('/');
    let path = path.strip_prefix("./").unwrap_or(path);
    if path == "." { "" } else { path.trim_end_matches('/') }
}

/// The directory containing `path`, `""` for entries at the root.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

pub fn get_extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => Some(&name[idx + 1..]),
        _ => None,
    }
}

fn to_site_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
