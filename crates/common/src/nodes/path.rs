//! Pure path helpers. Paths are `/`-separated, relative, and carry no
//! leading or trailing separator; `""` is the root.

use std::collections::BTreeSet;

use object_store::{DIR_MARKER, SEPARATOR};

use super::node::{NodeType, StorageNode};

/// Sorts after any character a file name can contain.
pub const FILE_SORT_SENTINEL: char = '\u{FFFF}';

/// Trim blanks and drop empty segments, so `" /a//b/ "` becomes `"a/b"`.
pub fn normalize(path: &str) -> String {
    path.trim()
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Why a path was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path segment '{0}' is not allowed")]
    ReservedSegment(String),
    #[error("path contains illegal character {0:?}")]
    IllegalCharacter(char),
    #[error("name '{0}' must be a single path segment")]
    NotASegment(String),
}

/// Normalize and validate a path naming an actual node.
pub fn validate(path: &str) -> Result<String, PathError> {
    let normalized = normalize(path);
    if normalized.is_empty() {
        return Err(PathError::Empty);
    }
    if let Some(c) = normalized
        .chars()
        .find(|c| c.is_control() || *c == '\\' || *c == FILE_SORT_SENTINEL)
    {
        return Err(PathError::IllegalCharacter(c));
    }
    if let Some(segment) = normalized
        .split(SEPARATOR)
        .find(|s| *s == "." || *s == ".." || *s == DIR_MARKER)
    {
        return Err(PathError::ReservedSegment(segment.to_string()));
    }
    Ok(normalized)
}

/// Validate a single leaf name, as used by renames.
pub fn validate_name(name: &str) -> Result<String, PathError> {
    let trimmed = name.trim();
    if trimmed.contains(SEPARATOR) {
        return Err(PathError::NotASegment(trimmed.to_string()));
    }
    validate(trimmed)
}

/// Every ancestor of every input path down to the path itself, de-duplicated.
///
/// `"a/b/c"` yields `{"a", "a/b", "a/b/c"}`. Empty inputs contribute nothing.
pub fn split_hierarchy<I, S>(paths: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = BTreeSet::new();
    for path in paths {
        let normalized = normalize(path.as_ref());
        let mut current = String::new();
        for segment in normalized.split(SEPARATOR).filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push(SEPARATOR);
            }
            current.push_str(segment);
            out.insert(current.clone());
        }
    }
    out
}

/// A raw key ending in the separator is a directory.
pub fn classify(raw_key: &str) -> NodeType {
    if raw_key.ends_with(SEPARATOR) {
        NodeType::Dir
    } else {
        NodeType::File
    }
}

/// Join two relative paths, ignoring empty sides.
pub fn join(base: &str, path: &str) -> String {
    match (base.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}{SEPARATOR}{path}"),
    }
}

/// Split a path into `(dir, name)`.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Parent directory of a path; the root's parent is the root.
pub fn parent(path: &str) -> &str {
    split(path).0
}

/// True when `path` lies strictly below `ancestor`. Everything except the
/// root lies below the root.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return !path.is_empty();
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path[ancestor.len()..].starts_with(SEPARATOR)
}

/// Rewrite `path` from under `from` to under `to`.
pub fn rebase(path: &str, from: &str, to: &str) -> String {
    if path == from {
        return to.to_string();
    }
    if !is_descendant(path, from) {
        return path.to_string();
    }
    let rest = path[from.len()..].trim_start_matches(SEPARATOR);
    join(to, rest)
}

/// Store key for a file at `path` under `base`.
pub fn file_key(base: &str, path: &str) -> String {
    join(base, path)
}

/// Store key for a directory at `path` under `base`. The root directory's
/// key is the listing prefix of the whole scope.
pub fn dir_key(base: &str, path: &str) -> String {
    let full = join(base, path);
    if full.is_empty() {
        full
    } else {
        format!("{full}{SEPARATOR}")
    }
}

/// Strip `base` from a raw store key. Returns the relative path and the
/// node type, or `None` when the key lies outside `base` or is the scope
/// root itself.
pub fn relativize(base: &str, raw_key: &str) -> Option<(String, NodeType)> {
    let node_type = classify(raw_key);
    let trimmed = raw_key.trim_end_matches(SEPARATOR);
    let relative = if base.is_empty() {
        trimmed
    } else {
        trimmed.strip_prefix(base)?.strip_prefix(SEPARATOR)?
    };
    if relative.is_empty() {
        return None;
    }
    Some((relative.to_string(), node_type))
}

/// Display-order key: depth first, directories before files at each level.
pub fn sort_key(node: &StorageNode) -> String {
    match node.node_type {
        NodeType::Dir => node.path.clone(),
        NodeType::File => format!("{}{}{}", node.dir, FILE_SORT_SENTINEL, node.name),
    }
}

/// Sort nodes into display order.
pub fn sort_nodes(nodes: &mut [StorageNode]) {
    nodes.sort_by_cached_key(sort_key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" /a//b/ "), "a/b");
        assert_eq!(normalize("/"), "");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("a"), "a");
    }

    #[test]
    fn test_validate_rejects_bad_paths() {
        assert_eq!(validate("  / "), Err(PathError::Empty));
        assert_eq!(
            validate("a/../b"),
            Err(PathError::ReservedSegment("..".to_string()))
        );
        assert_eq!(
            validate("docs/.shelf-dir"),
            Err(PathError::ReservedSegment(".shelf-dir".to_string()))
        );
        assert_eq!(validate("a\\b"), Err(PathError::IllegalCharacter('\\')));
        assert_eq!(validate("a\nb"), Err(PathError::IllegalCharacter('\n')));
        assert_eq!(validate("/photos/a.png/"), Ok("photos/a.png".to_string()));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("b.txt"), Ok("b.txt".to_string()));
        assert_eq!(
            validate_name("x/y"),
            Err(PathError::NotASegment("x/y".to_string()))
        );
    }

    #[test]
    fn test_split_hierarchy() {
        let set = split_hierarchy(["a/b/c", "/a/d/", "", "e"]);
        let expected: Vec<&str> = vec!["a", "a/b", "a/b/c", "a/d", "e"];
        assert_eq!(set.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("a/b/"), NodeType::Dir);
        assert_eq!(classify("a/b"), NodeType::File);
    }

    #[test]
    fn test_descendant_checks() {
        assert!(is_descendant("a/b", "a"));
        assert!(!is_descendant("ab", "a"));
        assert!(!is_descendant("a", "a"));
        assert!(is_descendant("a", ""));
        assert!(!is_descendant("", ""));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("photos/a.png", "photos", "archive/photos"), "archive/photos/a.png");
        assert_eq!(rebase("photos", "photos", "archive/photos"), "archive/photos");
        assert_eq!(rebase("other", "photos", "x"), "other");
        assert_eq!(rebase("photosX/a", "photos", "x"), "photosX/a");
    }

    #[test]
    fn test_keys_and_relativize() {
        assert_eq!(dir_key("users/u1", "a/b"), "users/u1/a/b/");
        assert_eq!(file_key("users/u1", "a/b.txt"), "users/u1/a/b.txt");
        assert_eq!(dir_key("", ""), "");
        assert_eq!(dir_key("users/u1", ""), "users/u1/");

        assert_eq!(
            relativize("users/u1", "users/u1/a/b/"),
            Some(("a/b".to_string(), NodeType::Dir))
        );
        assert_eq!(relativize("users/u1", "users/u1/"), None);
        assert_eq!(relativize("users/u1", "users/u10/x"), None);
        assert_eq!(
            relativize("", "x.txt"),
            Some(("x.txt".to_string(), NodeType::File))
        );
    }

    #[test]
    fn test_sort_order_dirs_before_files_depth_first() {
        let mut nodes = vec![
            StorageNode::virtual_dir("a"),
            StorageNode::virtual_file("a/z.txt"),
            StorageNode::virtual_file("root.txt"),
            StorageNode::virtual_dir("a/b"),
            StorageNode::virtual_file("a/b/c.txt"),
            StorageNode::virtual_dir("b"),
        ];
        sort_nodes(&mut nodes);
        let paths: Vec<_> = nodes.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["a", "a/b", "a/b/c.txt", "a/z.txt", "b", "root.txt"]
        );
    }
}
