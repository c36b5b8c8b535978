//! Filesystem capability scoped to a single mounted storage root.
//!
//! Paths passed to [`ContentFs`] are virtual absolute paths such as
//! `/atmosphere/contents/0100000000001000/toolbox.json`. [`LocalFs`] maps them
//! below a host directory standing in for the SD card mount. Name lookup
//! ignores ASCII case per component, like the card's filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use mockall::automock;
use tracing::debug;

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One entry returned by [`ContentFs::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Storage operations the module core needs.
#[automock]
pub trait ContentFs {
    /// Enumerates a directory. Fails when the directory cannot be opened.
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    fn file_size(&self, path: &str) -> io::Result<u64>;

    /// Reads the whole file.
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;

    /// True when the file can be opened for reading.
    fn file_exists(&self, path: &str) -> bool;

    fn create_dir(&self, path: &str) -> io::Result<()>;

    /// Creates an empty file. Creating an existing file leaves it untouched.
    fn create_file(&self, path: &str) -> io::Result<()>;

    fn delete_file(&self, path: &str) -> io::Result<()>;

    /// Releases the storage session. Further calls fail.
    fn close(&self);
}

/// [`ContentFs`] backed by a host directory.
#[derive(Debug)]
pub struct LocalFs {
    root: PathBuf,
    open: AtomicBool,
}

impl LocalFs {
    /// Mounts `root`. Fails when it is not an existing directory.
    pub fn mount(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("storage root {} is not mounted", root.display()),
            ));
        }
        debug!("Mounted storage root {}", root.display());
        Ok(Self {
            root,
            open: AtomicBool::new(true),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        if !self.is_open() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "storage session closed",
            ));
        }
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path escapes storage root: {}", path),
            ));
        }
        let mut resolved = self.root.clone();
        for component in relative.components() {
            let name = component.as_os_str();
            let exact = resolved.join(name);
            resolved = if exact.exists() {
                exact
            } else {
                match find_ignoring_case(&resolved, &name.to_string_lossy()) {
                    Some(found) => found,
                    None => exact,
                }
            };
        }
        Ok(resolved)
    }
}

/// Entry of `dir` whose name equals `name` up to ASCII case. Storage on the
/// target is case-insensitive, so folder names may be written in either case.
fn find_ignoring_case(dir: &Path, name: &str) -> Option<PathBuf> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(name))
        .map(|entry| entry.path())
}

impl ContentFs for LocalFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let dir = self.resolve(path)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        Ok(entries)
    }

    fn file_size(&self, path: &str) -> io::Result<u64> {
        Ok(fs::metadata(self.resolve(path)?)?.len())
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        let mut file = File::open(self.resolve(path)?)?;
        let size = file.metadata()?.len();
        let mut data = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    fn file_exists(&self, path: &str) -> bool {
        self.resolve(path)
            .and_then(File::open)
            .map(|file| file.metadata().map(|m| m.is_file()).unwrap_or(false))
            .unwrap_or(false)
    }

    fn create_dir(&self, path: &str) -> io::Result<()> {
        fs::create_dir(self.resolve(path)?)
    }

    fn create_file(&self, path: &str) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.resolve(path)?)
            .map(|_| ())
    }

    fn delete_file(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path)?)
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            debug!("Closed storage session {}", self.root.display());
        }
    }
}

impl Drop for LocalFs {
    fn drop(&mut self) {
        self.close();
    }
}
