//! Mapping request paths onto cache records.

use oxserve_cache::{CacheStore, FileRecord, FolderRecord};
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::query::{QueryFlags, query_suffix, with_param};

/// Strip a route prefix from a request path.
///
/// Matches on segment boundaries: `/apps` matches `/apps` and `/apps/x`
/// but not `/apps2`. The root prefix `/` matches everything.
pub fn strip_route_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Join a percent-encoded request path onto `root`.
///
/// `.` and `..` are resolved lexically and never climb above `root`.
/// A trailing separator is dropped.
pub fn resolve_path(root: &Path, request_path: &str) -> PathBuf {
    let decoded = percent_decode_str(request_path).decode_utf8_lossy();
    let mut segments: Vec<&str> = Vec::new();

    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut path = root.to_path_buf();
    for segment in segments {
        // A segment could still smuggle a prefix or root on some platforms.
        if Path::new(segment)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            path.push(segment);
        }
    }
    path
}

/// What a request resolved to.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Serve this file.
    File(Arc<FileRecord>),
    /// Render a listing of this folder.
    Listing {
        /// Filesystem path of the folder.
        path: PathBuf,
        /// The folder record.
        folder: Arc<FolderRecord>,
    },
    /// HTTP redirect to this location.
    Redirect(String),
    /// Nothing cached at this path.
    NotFound,
}

/// Resolve a request against the store.
///
/// `url_path` is the full (still encoded) request path, used to build
/// redirects; `relative` is the part below the route prefix.
pub fn resolve(
    store: &CacheStore,
    root: &Path,
    url_path: &str,
    relative: &str,
    query: Option<&str>,
    flags: &QueryFlags,
) -> Resolution {
    let fs_path = resolve_path(root, relative);
    let folder = store.get_folder(&fs_path);
    let has_slash = url_path.ends_with('/');

    let mut target = fs_path.clone();
    if let Some(folder) = &folder
        && let Some(index) = &folder.index_path
        && !flags.ignore_index
    {
        if has_slash {
            target.clone_from(index);
        } else {
            return Resolution::Redirect(format!("{url_path}/{}", query_suffix(query)));
        }
    }

    if let Some(file) = store.get_file(&target) {
        return Resolution::File(file);
    }

    match folder {
        Some(_) if !has_slash => {
            let query = with_param(query, "ignoreIndex", "1");
            Resolution::Redirect(format!("{url_path}/?{query}"))
        }
        Some(folder) => Resolution::Listing {
            path: fs_path,
            folder,
        },
        None => Resolution::NotFound,
    }
}
