//! Request path resolution
//!
//! Turns an untrusted URL path into a candidate filesystem path under the
//! served root. Resolution is purely lexical; the filesystem is never touched
//! here.

use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR};

/// URL path separator
pub const PATH_SEPARATOR: char = '/';

/// How a candidate path is checked against the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Containment {
    /// The candidate's string form must start with the root's string form.
    ///
    /// A sibling such as `/srv/rootX` passes against a root of `/srv/root`.
    #[default]
    Prefix,
    /// The candidate must have the root as a leading run of path components
    Component,
}

impl Containment {
    pub const fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Component
        } else {
            Self::Prefix
        }
    }
}

/// Maps request paths onto the served directory tree
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    containment: Containment,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, containment: Containment) -> Self {
        Self {
            root: root.into(),
            containment,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join every segment of `request_path` onto the root, then clean the result.
    ///
    /// Empty, `.` and `..` segments are kept through the join and collapsed
    /// by [`clean`], so `..` may walk above the root. Callers must run the
    /// result through [`PathResolver::contains`] before using it.
    pub fn resolve(&self, request_path: &str) -> PathBuf {
        let mut joined = OsString::from(self.root.as_os_str());
        for segment in request_path.split(PATH_SEPARATOR) {
            joined.push(MAIN_SEPARATOR_STR);
            joined.push(segment);
        }
        clean(Path::new(&joined))
    }

    /// Whether `candidate` lies within the root
    pub fn contains(&self, candidate: &Path) -> bool {
        match self.containment {
            Containment::Prefix => candidate
                .as_os_str()
                .as_encoded_bytes()
                .starts_with(self.root.as_os_str().as_encoded_bytes()),
            Containment::Component => candidate.starts_with(&self.root),
        }
    }
}

/// Lexically normalize a path.
///
/// Drops `.` components and repeated separators, and lets `..` remove the
/// preceding component. `..` at the root stays at the root; leading `..` of a
/// relative path is kept. An empty result becomes `.`.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Percent-decode the path component of a request URI.
///
/// Returns `None` when the decoded bytes are not valid UTF-8.
pub fn decode_request_path(raw: &str) -> Option<Cow<'_, str>> {
    percent_decode_str(raw).decode_utf8().ok()
}
