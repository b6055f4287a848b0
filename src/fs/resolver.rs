//! Resource name resolution
//!
//! A resource name is tried as a path first (absolute, or relative to the
//! working directory). When that fails, the name is looked up under each
//! configured asset root in order. There is no implicit search path: the
//! roots a resolver consults are exactly the ones it was built with.

use crate::error::{CopyBenchError, Result, StreamRole};
use crate::fs::{InputHandle, OutputHandle};
use std::io;
use std::path::{Path, PathBuf};

/// Directory holding the sample inputs shipped with the crate
pub const BUNDLED_ASSETS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");

/// Opens task streams from resource names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResolver {
    roots: Vec<PathBuf>,
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::bundled()
    }
}

impl AssetResolver {
    /// Create a resolver consulting `roots` in order
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Resolver over the bundled asset directory only
    pub fn bundled() -> Self {
        Self::new(vec![PathBuf::from(BUNDLED_ASSETS)])
    }

    /// Resolver with no asset roots (paths only)
    pub fn paths_only() -> Self {
        Self::new(Vec::new())
    }

    /// Configured asset roots, in search order
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Open an input by resource name
    pub fn open_input(&self, name: &str) -> Result<InputHandle> {
        if name.is_empty() {
            return Err(CopyBenchError::resource(
                StreamRole::Input,
                name,
                io::Error::new(io::ErrorKind::InvalidInput, "empty resource name"),
            ));
        }

        let direct = Path::new(name);
        let direct_err = match InputHandle::open(direct) {
            Ok(handle) => {
                tracing::debug!("Resolved input '{}' directly", name);
                return Ok(handle);
            }
            Err(e) => e,
        };

        if !direct.is_absolute() {
            for root in &self.roots {
                let candidate = root.join(direct);
                match InputHandle::open(&candidate) {
                    Ok(handle) => {
                        tracing::debug!("Resolved input '{}' under asset root {:?}", name, root);
                        return Ok(handle);
                    }
                    Err(e) => {
                        tracing::trace!("Asset root {:?} has no '{}': {}", root, name, e);
                    }
                }
            }
        }

        // Anything other than "not there" on the direct attempt is the more useful cause
        let cause = if direct_err.kind() == io::ErrorKind::NotFound {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "not found in working directory or {} asset root(s)",
                    self.roots.len()
                ),
            )
        } else {
            direct_err
        };

        Err(CopyBenchError::resource(StreamRole::Input, name, cause))
    }

    /// Open an output by path, truncating prior content
    pub fn open_output(&self, name: &str) -> Result<OutputHandle> {
        OutputHandle::create(Path::new(name))
            .map_err(|e| CopyBenchError::resource(StreamRole::Output, name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn read_all(mut handle: InputHandle) -> Vec<u8> {
        let mut buf = Vec::new();
        handle.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_direct_path_wins() {
        let dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let direct = dir.path().join("data.txt");
        std::fs::write(&direct, b"direct").unwrap();
        std::fs::write(root.path().join("data.txt"), b"asset").unwrap();

        let resolver = AssetResolver::new(vec![root.path().to_path_buf()]);
        let handle = resolver.open_input(direct.to_str().unwrap()).unwrap();
        assert_eq!(read_all(handle), b"direct");
    }

    #[test]
    fn test_roots_searched_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(second.path().join("only-second.txt"), b"second").unwrap();
        std::fs::write(first.path().join("both.txt"), b"first").unwrap();
        std::fs::write(second.path().join("both.txt"), b"second").unwrap();

        let resolver = AssetResolver::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);

        assert_eq!(read_all(resolver.open_input("both.txt").unwrap()), b"first");
        assert_eq!(
            read_all(resolver.open_input("only-second.txt").unwrap()),
            b"second"
        );
    }

    #[test]
    fn test_nested_name_under_root() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("texts")).unwrap();
        std::fs::write(root.path().join("texts/a.txt"), b"nested").unwrap();

        let resolver = AssetResolver::new(vec![root.path().to_path_buf()]);
        assert_eq!(read_all(resolver.open_input("texts/a.txt").unwrap()), b"nested");
    }

    #[test]
    fn test_missing_input_is_resource_error() {
        let root = TempDir::new().unwrap();
        let resolver = AssetResolver::new(vec![root.path().to_path_buf()]);

        let err = resolver.open_input("definitely-not-here.bin").unwrap_err();
        assert_eq!(err.kind(), "resource_error");
        assert_eq!(err.stream(), Some(StreamRole::Input));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = AssetResolver::paths_only().open_input("").unwrap_err();
        assert_eq!(err.stream(), Some(StreamRole::Input));
    }

    #[test]
    fn test_output_in_missing_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing/out.bin");

        let err = AssetResolver::paths_only()
            .open_output(target.to_str().unwrap())
            .unwrap_err();
        assert_eq!(err.stream(), Some(StreamRole::Output));
        assert!(!target.exists());
    }

    #[test]
    fn test_bundled_sample_resolves() {
        let handle = AssetResolver::bundled().open_input("alice.txt").unwrap();
        assert!(handle.len().unwrap() > 0);
    }
}
