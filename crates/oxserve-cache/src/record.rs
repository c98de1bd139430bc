//! Cache records for files and folders.
//!
//! Records are immutable once published. The single exception is the
//! compressed representation of a file, which is produced in the background
//! and attached later through a write-once cell, so a reader sees either no
//! compressed bytes or all of them.

use bytes::Bytes;
use std::fs::{FileType, Metadata};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::pipeline::content_hash;

/// Filesystem metadata captured when a file record is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Modification time in milliseconds since the Unix epoch.
    pub modified_at: u64,
    /// Symbolic permissions such as `-rw-r--r--`.
    pub unix_permissions: String,
    /// Owning user id.
    pub owner: u32,
    /// Owning group id.
    pub group: u32,
}

impl FileMeta {
    /// Capture metadata from a `stat` result.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let modified_at = metadata.modified().map(system_time_ms).unwrap_or(0);
        let created_at = metadata
            .created()
            .map(system_time_ms)
            .unwrap_or(modified_at);

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self {
                created_at,
                modified_at,
                unix_permissions: permissions_string(metadata.mode()),
                owner: metadata.uid(),
                group: metadata.gid(),
            }
        }

        #[cfg(not(unix))]
        {
            let kind = if metadata.is_dir() { 'd' } else { '-' };
            let write = if metadata.permissions().readonly() { '-' } else { 'w' };
            Self {
                created_at,
                modified_at,
                unix_permissions: format!("{kind}r{write}-r{write}-r{write}-"),
                owner: 0,
                group: 0,
            }
        }
    }
}

impl Default for FileMeta {
    fn default() -> Self {
        Self {
            created_at: 0,
            modified_at: 0,
            unix_permissions: "----------".to_string(),
            owner: 0,
            group: 0,
        }
    }
}

/// Cached state of a regular file.
#[derive(Debug)]
pub struct FileRecord {
    /// Lowercase hex SHA-256 of `content`; doubles as the ETag.
    pub hash: String,
    /// Resolved MIME type.
    pub mime_type: String,
    /// Timestamps and ownership.
    pub meta: FileMeta,
    /// Raw (possibly optimized) bytes.
    pub content: Bytes,
    compressed: OnceLock<Bytes>,
}

impl FileRecord {
    /// Build a record, hashing `content`.
    pub fn new(mime_type: impl Into<String>, content: Bytes, meta: FileMeta) -> Self {
        Self {
            hash: content_hash(&content),
            mime_type: mime_type.into(),
            meta,
            content,
            compressed: OnceLock::new(),
        }
    }

    /// Compressed representation, once background compression has finished.
    pub fn compressed_content(&self) -> Option<&Bytes> {
        self.compressed.get()
    }

    /// Attach the compressed representation.
    ///
    /// Write-once: returns `false` (and drops `bytes`) if a representation
    /// was already attached.
    pub fn attach_compressed(&self, bytes: Bytes) -> bool {
        self.compressed.set(bytes).is_ok()
    }

    /// Length of the uncompressed content.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the uncompressed content is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (not followed).
    Symlink,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
    /// Block device.
    BlockDevice,
    /// Character device.
    CharDevice,
    /// Anything the platform reports that we cannot classify.
    Unknown,
}

impl EntryKind {
    /// Classify a `readdir` file type without following symlinks.
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            return EntryKind::Symlink;
        }
        if file_type.is_dir() {
            return EntryKind::Directory;
        }
        if file_type.is_file() {
            return EntryKind::File;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_fifo() {
                return EntryKind::Fifo;
            }
            if file_type.is_socket() {
                return EntryKind::Socket;
            }
            if file_type.is_block_device() {
                return EntryKind::BlockDevice;
            }
            if file_type.is_char_device() {
                return EntryKind::CharDevice;
            }
        }

        EntryKind::Unknown
    }

    /// Regular file check.
    pub fn is_file(self) -> bool {
        self == EntryKind::File
    }

    /// Directory check.
    pub fn is_directory(self) -> bool {
        self == EntryKind::Directory
    }
}

/// A serialized directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (lossy UTF-8).
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
}

impl DirEntry {
    /// Create an entry.
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Dotfiles are hidden from listings by default.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Cached state of a directory.
#[derive(Debug, Clone, Default)]
pub struct FolderRecord {
    /// Absolute path of `index.html` inside the directory, if present.
    pub index_path: Option<PathBuf>,
    /// Bytes of `.fsindex.readme.html`, empty if absent.
    pub readme_html: Bytes,
    /// Directory entries sorted by name.
    pub entries: Vec<DirEntry>,
}

/// A published cache entry: exactly one of file or folder.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Regular file.
    File(Arc<FileRecord>),
    /// Directory.
    Folder(Arc<FolderRecord>),
}

impl CacheEntry {
    /// The file record, if this entry is a file.
    pub fn as_file(&self) -> Option<&Arc<FileRecord>> {
        match self {
            CacheEntry::File(record) => Some(record),
            CacheEntry::Folder(_) => None,
        }
    }

    /// The folder record, if this entry is a folder.
    pub fn as_folder(&self) -> Option<&Arc<FolderRecord>> {
        match self {
            CacheEntry::Folder(record) => Some(record),
            CacheEntry::File(_) => None,
        }
    }

    /// Directory check.
    pub fn is_folder(&self) -> bool {
        matches!(self, CacheEntry::Folder(_))
    }
}

impl From<FileRecord> for CacheEntry {
    fn from(record: FileRecord) -> Self {
        CacheEntry::File(Arc::new(record))
    }
}

impl From<FolderRecord> for CacheEntry {
    fn from(record: FolderRecord) -> Self {
        CacheEntry::Folder(Arc::new(record))
    }
}

/// Render a `st_mode` as the 10-character `ls -l` form (type + rwx x3).
pub fn permissions_string(mode: u32) -> String {
    const S_IFMT: u32 = 0o170_000;

    let kind = match mode & S_IFMT {
        0o100_000 => '-',
        0o040_000 => 'd',
        0o120_000 => 'l',
        0o010_000 => 'p',
        0o140_000 => 's',
        0o020_000 => 'c',
        0o060_000 => 'b',
        0 => '-',
        _ => '?',
    };

    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

/// Milliseconds since the Unix epoch, saturating at zero for earlier times.
pub fn system_time_ms(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
