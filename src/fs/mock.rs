use super::{FileSystem, normalize_path};
use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(BTreeSet<String>), // Child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, MockEntry>,
    /// Writes at or below any of these paths fail.
    read_only: Vec<PathBuf>,
}

/// In-memory filesystem for tests.
///
/// Paths are normalised (`./md/a.md` and `md/a.md` are the same entry), and
/// parent directories are created implicitly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock()
            .entries
            .insert(PathBuf::from("."), MockEntry::Dir(BTreeSet::new()));
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize_path(path.as_ref());
        let mut state = self.lock();
        Self::insert_child(&mut state.entries, &path);
        state.entries.insert(path, MockEntry::File(content.into()));
    }

    /// Make every write at or below `path` fail.
    pub fn deny_writes_under(&self, path: impl AsRef<Path>) {
        self.lock().read_only.push(normalize_path(path.as_ref()));
    }

    /// Contents of a file as UTF-8, if present.
    pub fn file_string(&self, path: impl AsRef<Path>) -> Option<String> {
        let state = self.lock();
        match state.entries.get(&normalize_path(path.as_ref())) {
            Some(MockEntry::File(content)) => Some(String::from_utf8_lossy(content).into_owned()),
            _ => None,
        }
    }

    /// All file paths currently stored, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .entries
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn parent_of(path: &Path) -> Option<PathBuf> {
        let parent = path.parent()?;
        if parent.as_os_str().is_empty() {
            if path == Path::new(".") {
                None
            } else {
                Some(PathBuf::from("."))
            }
        } else {
            Some(parent.to_path_buf())
        }
    }

    /// Register `path` in its parent's child list, creating ancestors.
    fn insert_child(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = Self::parent_of(path) else {
            return;
        };
        Self::ensure_dir_entry(entries, &parent);
        if let (Some(MockEntry::Dir(children)), Some(name)) =
            (entries.get_mut(&parent), path.file_name().and_then(|n| n.to_str()))
        {
            children.insert(name.to_string());
        }
    }

    fn ensure_dir_entry(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        if entries.contains_key(path) {
            return;
        }
        entries.insert(path.to_path_buf(), MockEntry::Dir(BTreeSet::new()));
        Self::insert_child(entries, path);
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.lock();
        match state.entries.get(&normalize_path(path)) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8 in {:?}: {}", path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let normalized = normalize_path(path);
        {
            let state = self.lock();
            if state.read_only.iter().any(|ro| normalized.starts_with(ro)) {
                return Err(anyhow!("Permission denied: {:?}", path));
            }
            if let Some(MockEntry::Dir(_)) = state.entries.get(&normalized) {
                return Err(anyhow!("Is a directory: {:?}", path));
            }
        }
        self.add_file(normalized, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(&normalize_path(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(
            self.lock().entries.get(&normalize_path(path)),
            Some(MockEntry::File(_))
        )
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.lock().entries.get(&normalize_path(path)),
            Some(MockEntry::Dir(_))
        )
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        match state.entries.get(&normalize_path(path)) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let target = normalize_path(path);
        let mut state = self.lock();
        if !state.entries.contains_key(&target) {
            return Ok(());
        }

        state.entries.retain(|p, _| !p.starts_with(&target));

        if let Some(parent) = Self::parent_of(&target) {
            if let (Some(MockEntry::Dir(children)), Some(name)) = (
                state.entries.get_mut(&parent),
                target.file_name().and_then(|n| n.to_str()),
            ) {
                children.remove(name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_and_parent_dirs_are_linked() {
        let fs = MockFileSystem::new();
        fs.add_file("md/index.md", "# hi");
        fs.add_file("./md/about.md", "# about");

        assert!(fs.is_dir(Path::new("md")));
        let mut listed = fs.read_dir(Path::new("./md")).unwrap();
        listed.sort();
        assert_eq!(
            listed,
            vec![PathBuf::from("./md/about.md"), PathBuf::from("./md/index.md")]
        );
        assert_eq!(fs.read_to_string(Path::new("md/index.md")).unwrap(), "# hi");
    }

    #[test]
    fn remove_dir_all_is_idempotent() {
        let fs = MockFileSystem::new();
        fs.add_file("dist/graphics/logo.png", vec![1, 2, 3]);
        fs.remove_dir_all(Path::new("dist")).unwrap();
        assert!(!fs.exists(Path::new("dist/graphics/logo.png")));
        assert!(fs.read_dir(Path::new(".")).unwrap().is_empty());
        fs.remove_dir_all(Path::new("dist")).unwrap();
    }

    #[test]
    fn denied_writes_fail() {
        let fs = MockFileSystem::new();
        fs.deny_writes_under("dist");
        assert!(fs.write(Path::new("dist/a.html"), b"x").is_err());
        assert!(fs.write(Path::new("build/a.js"), b"x").is_ok());
    }
}
