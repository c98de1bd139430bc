//! Query-string flags understood by file routes.

use url::form_urlencoded;

/// Flags parsed from the query string.
///
/// Unknown parameters are ignored; a flag is set only by the exact value
/// `1` (or `0` for the negative `partial` case).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryFlags {
    /// `ignoreIndex=1`: list a folder even when it has an `index.html`.
    pub ignore_index: bool,
    /// `ignoreHidden=1`: include dotfiles in listings.
    pub ignore_hidden: bool,
    /// `partial=1` forces range delivery, `partial=0` forbids it.
    pub partial: Option<bool>,
    /// `listDivContentsOnly=1`: render the listing fragment without the page.
    pub list_div_contents_only: bool,
}

impl QueryFlags {
    /// Parse a raw query string (without the leading `?`).
    pub fn parse(query: Option<&str>) -> Self {
        let mut flags = Self::default();
        let Some(query) = query else {
            return flags;
        };

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match (key.as_ref(), value.as_ref()) {
                ("ignoreIndex", "1") => flags.ignore_index = true,
                ("ignoreHidden", "1") => flags.ignore_hidden = true,
                ("partial", "1") => flags.partial = Some(true),
                ("partial", "0") => flags.partial = Some(false),
                ("listDivContentsOnly", "1") => flags.list_div_contents_only = true,
                _ => {}
            }
        }
        flags
    }
}

/// Render `?query` or the empty string.
pub fn query_suffix(query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("?{q}"),
        _ => String::new(),
    }
}

/// Set `key=value` in `query`, replacing an existing value.
pub fn with_param(query: Option<&str>, key: &str, value: &str) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut replaced = false;
    if let Some(query) = query {
        for (k, v) in form_urlencoded::parse(query.as_bytes()) {
            if k == key {
                if !replaced {
                    serializer.append_pair(key, value);
                    replaced = true;
                }
            } else {
                serializer.append_pair(&k, &v);
            }
        }
    }
    if !replaced {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
