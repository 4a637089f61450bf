use std::path::Path;

/// Check that `candidate` resolves to a location inside `root`.
///
/// Both paths are canonicalized, so symlinks pointing out of the root and
/// `..` components in crafted names are caught. Returns `false` rather than
/// an error when either path does not exist; delete checks rely on that.
pub fn is_within_root(root: &Path, candidate: &Path) -> bool {
    let root = match root.canonicalize() {
        Ok(p) => p,
        Err(_) => return false,
    };
    match candidate.canonicalize() {
        Ok(resolved) => resolved.starts_with(&root),
        Err(_) => false,
    }
}
