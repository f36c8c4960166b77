//! Package file discovery under a project directory.
use crate::error::{PublishError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const PACKAGE_EXT: &str = ".nupkg";
pub const SYMBOLS_EXT: &str = ".snupkg";

/// Recursively list regular files under `dir`, depth-first, as absolute
/// paths. Entries are visited in file-name order.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let root = fs::canonicalize(dir).map_err(|err| PublishError::io("resolve", dir, err))?;
    let mut files = Vec::new();
    walk(&root, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .map_err(|err| PublishError::io("read directory", dir, err))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|err| PublishError::io("read directory", dir, err))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|err| PublishError::io("stat", &path, err))?;
        if file_type.is_dir() {
            walk(&path, files)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_package(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(PACKAGE_EXT) || name.ends_with(SYMBOLS_EXT)
}

/// Packages found by a post-pack scan, sorted by path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub packages: Vec<PathBuf>,
    pub symbols: Vec<PathBuf>,
}

impl ArtifactSet {
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut set = ArtifactSet::default();
        for path in list_files(dir)? {
            let name = path.to_string_lossy();
            if name.ends_with(SYMBOLS_EXT) {
                set.symbols.push(path);
            } else if name.ends_with(PACKAGE_EXT) {
                set.packages.push(path);
            }
        }
        Ok(set)
    }

    pub fn primary(&self) -> Option<&Path> {
        self.packages.first().map(PathBuf::as_path)
    }

    pub fn symbols_package(&self) -> Option<&Path> {
        self.symbols.first().map(PathBuf::as_path)
    }

    pub fn all(&self) -> impl Iterator<Item = &Path> {
        self.packages
            .iter()
            .chain(self.symbols.iter())
            .map(PathBuf::as_path)
    }
}

/// Delete package and symbols files left by earlier runs. Returns the
/// removed paths.
pub fn remove_stale_packages(dir: &Path) -> Result<Vec<PathBuf>> {
    let stale: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|path| is_package(path))
        .collect();
    for path in &stale {
        tracing::info!(path = %path.display(), "unlinking stale package");
        fs::remove_file(path).map_err(|err| PublishError::io("remove", path, err))?;
    }
    Ok(stale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(path, b"").expect("write file");
    }

    #[test]
    fn lists_nested_files_without_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("Foo.csproj"));
        touch(&dir.path().join("bin/Release/Foo.1.0.0.nupkg"));
        touch(&dir.path().join("obj/deep/nested/tree/x.json"));
        fs::create_dir_all(dir.path().join("empty")).expect("mkdir");

        let files = list_files(dir.path()).expect("list");
        let root = fs::canonicalize(dir.path()).expect("canonical root");
        let relative: Vec<String> = files
            .iter()
            .map(|path| {
                assert!(path.is_absolute());
                assert!(path.is_file());
                path.strip_prefix(&root)
                    .expect("under root")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(
            relative,
            vec![
                "Foo.csproj",
                "bin/Release/Foo.1.0.0.nupkg",
                "obj/deep/nested/tree/x.json",
            ]
        );
    }

    #[test]
    fn discovers_primary_and_symbols_packages() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("bin/Release/Foo.1.2.3.nupkg"));
        touch(&dir.path().join("bin/Release/Foo.1.2.3.snupkg"));
        touch(&dir.path().join("bin/Release/Foo.dll"));

        let set = ArtifactSet::discover(dir.path()).expect("discover");
        assert_eq!(set.packages.len(), 1);
        assert_eq!(set.symbols.len(), 1);
        assert!(set
            .primary()
            .expect("primary")
            .to_string_lossy()
            .ends_with("Foo.1.2.3.nupkg"));
        assert!(set
            .symbols_package()
            .expect("symbols")
            .to_string_lossy()
            .ends_with("Foo.1.2.3.snupkg"));
        assert_eq!(set.all().count(), 2);
    }

    #[test]
    fn stale_cleanup_only_touches_packages() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("Foo.csproj"));
        touch(&dir.path().join("bin/Foo.0.9.0.nupkg"));
        touch(&dir.path().join("bin/Foo.0.9.0.snupkg"));

        let removed = remove_stale_packages(dir.path()).expect("cleanup");
        assert_eq!(removed.len(), 2);
        assert_eq!(ArtifactSet::discover(dir.path()).expect("rescan"), ArtifactSet::default());
        assert!(dir.path().join("Foo.csproj").is_file());
    }
}
