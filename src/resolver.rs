//! Containment of untrusted file names inside the images directory.
//!
//! [`SafePathResolver::resolve`] turns a raw, still percent-encoded request
//! value into a [`ResolvedPath`] whose canonical form lies inside the
//! [`BaseDirectory`], or into a [`Rejection`]. The containment test is a
//! component-wise prefix check on two canonical paths, so `/srv/images-evil`
//! never passes for `/srv/images`.

use crate::security;
use std::{
    fs::{self, File},
    io,
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

/// Why a requested name was refused. The attempted path is never carried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("empty input")]
    EmptyInput,
    #[error("absolute path rejected")]
    AbsolutePathRejected,
    #[error("null byte rejected")]
    NullByteRejected,
    #[error("invalid percent-encoding")]
    InvalidEncoding,
    #[error("traversal rejected")]
    TraversalRejected,
    #[error("not found")]
    NotFound,
    #[error("not a regular file")]
    NotRegularFile,
    #[error("filesystem unavailable: {0}")]
    Unavailable(io::ErrorKind),
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::EmptyInput => "EmptyInput",
            Rejection::AbsolutePathRejected => "AbsolutePathRejected",
            Rejection::NullByteRejected => "NullByteRejected",
            Rejection::InvalidEncoding => "InvalidEncoding",
            Rejection::TraversalRejected => "TraversalRejected",
            Rejection::NotFound => "NotFound",
            Rejection::NotRegularFile => "NotRegularFile",
            Rejection::Unavailable(_) => "Unavailable",
        }
    }
}

/// Canonical, existing directory fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDirectory(Arc<PathBuf>);

impl BaseDirectory {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let canon = crate::config::canonical_root(path)?;
        if !canon.is_dir() {
            anyhow::bail!("images_dir is not a directory: {}", canon.display());
        }
        Ok(Self(Arc::new(canon)))
    }

    pub fn path(&self) -> &Path { &self.0 }
}

/// A contained regular file, already open. Reads must go through
/// [`ResolvedPath::into_file`] so a path swapped after the check is never
/// reopened.
#[derive(Debug)]
pub struct ResolvedPath {
    path: PathBuf,
    len: u64,
    file: File,
}

impl ResolvedPath {
    pub fn path(&self) -> &Path { &self.path }
    /// Size reported by the regular-file check.
    pub fn size_bytes(&self) -> u64 { self.len }
    pub fn into_file(self) -> File { self.file }
}

impl PartialEq for ResolvedPath {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.len == other.len
    }
}

impl Eq for ResolvedPath {}

/// Upper bound on dangling-link hops followed when classifying a missing
/// target. Matches the Linux `ELOOP` limit.
const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
pub struct SafePathResolver {
    base: BaseDirectory,
}

impl SafePathResolver {
    pub fn new(base: BaseDirectory) -> Self { Self { base } }

    pub fn base(&self) -> &BaseDirectory { &self.base }

    /// Blocking: canonicalizes, stats and opens on the file system.
    pub fn resolve(&self, requested: &str) -> Result<ResolvedPath, Rejection> {
        let decoded = security::normalize_request(requested)?;
        security::lexical_within(&decoded)?;

        let base = self.base.path();
        let joined = base.join(&decoded);
        let canon = match dunce::canonicalize(&joined) {
            Ok(canon) => canon,
            Err(e) if is_missing(&e) => return Err(missing_target(base, &joined)),
            Err(e) => return Err(fs_rejection(e)),
        };

        if !canon.starts_with(base) {
            return Err(Rejection::TraversalRejected);
        }

        // lstat: the canonical path holds no links unless it was swapped since
        let checked = fs::symlink_metadata(&canon).map_err(fs_rejection)?;
        if !checked.is_file() {
            return Err(Rejection::NotRegularFile);
        }
        let file = File::open(&canon).map_err(fs_rejection)?;
        let opened = file.metadata().map_err(fs_rejection)?;
        if !opened.is_file() || !same_file(&checked, &opened) {
            return Err(Rejection::TraversalRejected);
        }
        Ok(ResolvedPath { path: canon, len: opened.len(), file })
    }
}

#[cfg(unix)]
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    a.len() == b.len() && a.modified().ok() == b.modified().ok()
}

fn is_missing(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory)
}

fn fs_rejection(e: io::Error) -> Rejection {
    if is_missing(&e) {
        Rejection::NotFound
    } else {
        Rejection::Unavailable(e.kind())
    }
}

/// Canonicalization failed because something is missing. Decide whether the
/// missing target would have been inside the base, so that a link to a
/// missing outside path answers the same as a link to an existing one.
fn missing_target(base: &Path, joined: &Path) -> Rejection {
    match missing_lands_outside(base, joined, MAX_LINK_HOPS) {
        Ok(true) => Rejection::TraversalRejected,
        Ok(false) => Rejection::NotFound,
        Err(e) => fs_rejection(e),
    }
}

/// Walks `path` with `lstat`, following dangling links by hand, until the
/// first component that does not exist. Its parent exists and is
/// canonicalized; the answer is whether that parent is outside `base`.
fn missing_lands_outside(base: &Path, path: &Path, hops: usize) -> io::Result<bool> {
    let comps: Vec<Component<'_>> = path.components().collect();
    let mut current = PathBuf::new();
    for (i, comp) in comps.iter().enumerate() {
        current.push(comp);
        let meta = match fs::symlink_metadata(&current) {
            Ok(meta) => meta,
            Err(e) if is_missing(&e) => {
                let parent = current.parent().unwrap_or(Path::new("/"));
                let parent = dunce::canonicalize(parent)?;
                return Ok(!parent.starts_with(base));
            }
            Err(e) => return Err(e),
        };
        if meta.file_type().is_symlink() && fs::metadata(&current).is_err() {
            if hops == 0 {
                return Err(io::Error::other("too many levels of symbolic links"));
            }
            let target = fs::read_link(&current)?;
            let mut next = match current.parent() {
                Some(parent) if target.is_relative() => parent.join(target),
                _ => target,
            };
            next.extend(&comps[i + 1..]);
            return missing_lands_outside(base, &next, hops - 1);
        }
    }
    Ok(false)
}
