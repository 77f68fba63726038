//! Path plumbing shared by the file-backed components.

use std::path::Path;

/// Directory holding `path`; a bare file name resolves to the current
/// directory.
pub(crate) fn containing_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
