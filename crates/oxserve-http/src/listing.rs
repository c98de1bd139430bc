//! Directory listing pages.
//!
//! Listings are assembled from five small templates with bare-word
//! placeholders. Each placeholder is filled once, in a single pass, so
//! substituted text is never scanned again.

use oxserve_cache::{EntryKind, FolderRecord};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::query::{QueryFlags, query_suffix};

/// Characters escaped in a single path segment of an href.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Default base URL for listing icons.
pub const DEFAULT_ICON_BASE: &str = "/ipl/folderIndex/icon";

/// The five listing templates.
#[derive(Debug, Clone)]
pub struct ListingTemplates {
    /// Outer page; contains `listDivContents`.
    pub page: String,
    /// One entry; contains `fileIcon`, `fileRedirect`, `fileName`,
    /// `fileSoundClass`.
    pub directory_item: String,
    /// Heading; contains `fileSystemPath`.
    pub directory_header: String,
    /// Footer mark.
    pub watermark: String,
    /// Index notice; contains `indexPath`.
    pub index_found: String,
}

impl Default for ListingTemplates {
    fn default() -> Self {
        Self {
            page: include_str!("../templates/page.html").to_string(),
            directory_item: include_str!("../templates/directoryItem.xml").to_string(),
            directory_header: include_str!("../templates/directoryHeader.xml").to_string(),
            watermark: include_str!("../templates/watermark.xml").to_string(),
            index_found: include_str!("../templates/indexFound.xml").to_string(),
        }
    }
}

impl ListingTemplates {
    /// Load templates from `dir`, falling back to the built-in version of
    /// each file that is missing or unreadable.
    pub fn load(dir: Option<&Path>) -> Self {
        let builtin = Self::default();
        let Some(dir) = dir else {
            return builtin;
        };

        let read = |name: &str, fallback: String| -> String {
            let path = dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!(path = %path.display(), error = %e, "Failed to read listing template, using built-in");
                    }
                    fallback
                }
            }
        };

        Self {
            page: read("page.html", builtin.page),
            directory_item: read("directoryItem.xml", builtin.directory_item),
            directory_header: read("directoryHeader.xml", builtin.directory_header),
            watermark: read("watermark.xml", builtin.watermark),
            index_found: read("indexFound.xml", builtin.index_found),
        }
    }
}

/// Fill the first occurrence of each placeholder in `template`.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut hits: Vec<(usize, &str, &str)> = values
        .iter()
        .filter_map(|(key, value)| template.find(*key).map(|at| (at, *key, *value)))
        .collect();
    hits.sort_by_key(|(at, _, _)| *at);

    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut cursor = 0;
    for (at, key, value) in hits {
        if at < cursor {
            continue;
        }
        out.push_str(&template[cursor..at]);
        out.push_str(value);
        cursor = at + key.len();
    }
    out.push_str(&template[cursor..]);
    out
}

/// Renders folder records into HTML listings.
#[derive(Debug, Clone)]
pub struct ListingRenderer {
    templates: ListingTemplates,
    icon_base: String,
    display_base: PathBuf,
}

impl ListingRenderer {
    /// Create a renderer. Headers show folder paths relative to
    /// `display_base`.
    pub fn new(templates: ListingTemplates, icon_base: impl Into<String>, display_base: PathBuf) -> Self {
        Self {
            templates,
            icon_base: icon_base.into().trim_end_matches('/').to_string(),
            display_base,
        }
    }

    fn icon(&self, kind: EntryKind) -> String {
        let name = if kind.is_directory() { "folder" } else { "file" };
        format!("{}/{name}", self.icon_base)
    }

    fn display_path(&self, fs_path: &Path) -> String {
        match fs_path.strip_prefix(&self.display_base) {
            Ok(relative) => {
                let joined = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                format!("/{joined}")
            }
            Err(_) => fs_path.to_string_lossy().replace('\\', "/"),
        }
    }

    /// Render the listing fragment (everything inside the page).
    ///
    /// `url_path` is the request path with its trailing slash.
    pub fn render_fragment(
        &self,
        fs_path: &Path,
        folder: &FolderRecord,
        url_path: &str,
        query: Option<&str>,
        flags: &QueryFlags,
    ) -> String {
        let suffix = query_suffix(query);
        let header_path = html_escape::encode_text(&self.display_path(fs_path)).into_owned();
        let mut contents = fill(
            &self.templates.directory_header,
            &[("fileSystemPath", header_path.as_str())],
        );

        let up_icon = self.icon(EntryKind::Directory);
        let up_href = format!("../{suffix}");
        let up_href = html_escape::encode_double_quoted_attribute(&up_href);
        contents.push_str(&fill(
            &self.templates.directory_item,
            &[
                ("fileIcon", up_icon.as_str()),
                ("fileRedirect", &*up_href),
                ("fileName", ".."),
                ("fileSoundClass", "soundBack"),
            ],
        ));

        let base = url_path.trim_end_matches('/');
        for entry in &folder.entries {
            if entry.is_hidden() && !flags.ignore_hidden {
                continue;
            }
            let is_dir = entry.kind.is_directory();
            let encoded = utf8_percent_encode(&entry.name, SEGMENT);
            let href = if is_dir {
                format!("{base}/{encoded}/{suffix}")
            } else {
                format!("{base}/{encoded}")
            };
            let sound = if is_dir { "soundFolderOpen" } else { "soundFileOpen" };
            let icon = self.icon(entry.kind);
            let href = html_escape::encode_double_quoted_attribute(&href);
            let name = html_escape::encode_quoted_attribute(&entry.name);

            contents.push_str(&fill(
                &self.templates.directory_item,
                &[
                    ("fileIcon", icon.as_str()),
                    ("fileRedirect", &*href),
                    ("fileName", &*name),
                    ("fileSoundClass", sound),
                ],
            ));
        }

        contents.push_str(&self.templates.watermark);

        if folder.index_path.is_some() {
            contents.push_str(&fill(&self.templates.index_found, &[("indexPath", "./")]));
        }

        contents.push_str(&String::from_utf8_lossy(&folder.readme_html));
        contents
    }

    /// Render the listing, as a full page unless `listDivContentsOnly=1`.
    pub fn render(
        &self,
        fs_path: &Path,
        folder: &FolderRecord,
        url_path: &str,
        query: Option<&str>,
        flags: &QueryFlags,
    ) -> String {
        let fragment = self.render_fragment(fs_path, folder, url_path, query, flags);
        if flags.list_div_contents_only {
            fragment
        } else {
            fill(&self.templates.page, &[("listDivContents", fragment.as_str())])
        }
    }
}
