use std::sync::LazyLock;

use regex::{Captures, Regex};
use storage_base::StorageResult;

use super::{PathModule, current_dir_string, env_lookup, split_extension};

/// Path functions for POSIX hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixModule;

pub static POSIX: PosixModule = PosixModule;

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\w+|\{[^}]*\})").expect("variable pattern is valid"));

pub(crate) fn join(base: &str, part: &str) -> String {
    if part.starts_with('/') {
        part.to_string()
    } else if base.is_empty() || base.ends_with('/') {
        format!("{}{}", base, part)
    } else {
        format!("{}/{}", base, part)
    }
}

pub(crate) fn split(path: &str) -> (String, String) {
    let index = path.rfind('/').map_or(0, |i| i + 1);
    let (head, tail) = path.split_at(index);
    // Keep a root made only of separators ("/", "//")
    let trimmed = head.trim_end_matches('/');
    let head = if trimmed.is_empty() { head } else { trimmed };
    (head.to_string(), tail.to_string())
}

pub(crate) fn normpath(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    // Exactly two leading slashes are implementation defined and preserved
    let initial_slashes = if path.starts_with("//") && !path.starts_with("///") {
        2
    } else if path.starts_with('/') {
        1
    } else {
        0
    };
    let mut components: Vec<&str> = Vec::new();
    for component in path.split('/') {
        if component.is_empty() || component == "." {
            continue;
        }
        if component != ".."
            || (initial_slashes == 0 && components.is_empty())
            || components.last() == Some(&"..")
        {
            components.push(component);
        } else {
            components.pop();
        }
    }
    let normalized = format!("{}{}", "/".repeat(initial_slashes), components.join("/"));
    if normalized.is_empty() {
        ".".to_string()
    } else {
        normalized
    }
}

pub(crate) fn expanduser_with(path: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    if !path.starts_with('~') {
        return path.to_string();
    }
    let end = path[1..].find('/').map_or(path.len(), |i| i + 1);
    if end != 1 {
        // ~user needs a password database lookup; left untouched
        return path.to_string();
    }
    let Some(home) = lookup("HOME") else {
        return path.to_string();
    };
    let expanded = format!("{}{}", home.trim_end_matches('/'), &path[end..]);
    if expanded.is_empty() {
        "/".to_string()
    } else {
        expanded
    }
}

pub(crate) fn expandvars_with(path: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    if !path.contains('$') {
        return path.to_string();
    }
    VARIABLE
        .replace_all(path, |captures: &Captures| {
            let raw = &captures[1];
            let name = raw
                .strip_prefix('{')
                .and_then(|name| name.strip_suffix('}'))
                .unwrap_or(raw);
            lookup(name).unwrap_or_else(|| captures[0].to_string())
        })
        .into_owned()
}

impl PathModule for PosixModule {
    fn sep(&self) -> &'static str {
        "/"
    }

    fn join(&self, base: &str, part: &str) -> String {
        join(base, part)
    }

    fn split(&self, path: &str) -> (String, String) {
        split(path)
    }

    fn splitext(&self, path: &str) -> (String, String) {
        split_extension(path, &['/'])
    }

    fn splitdrive(&self, path: &str) -> (String, String) {
        (String::new(), path.to_string())
    }

    fn normpath(&self, path: &str) -> String {
        normpath(path)
    }

    fn isabs(&self, path: &str) -> bool {
        path.starts_with('/')
    }

    fn normcase(&self, path: &str) -> String {
        path.to_string()
    }

    fn expanduser(&self, path: &str) -> String {
        expanduser_with(path, env_lookup)
    }

    fn expandvars(&self, path: &str) -> String {
        expandvars_with(path, env_lookup)
    }

    fn abspath(&self, path: &str) -> StorageResult<String> {
        if self.isabs(path) {
            return Ok(normpath(path));
        }
        Ok(normpath(&join(&current_dir_string()?, path)))
    }

    fn realpath(&self, path: &str) -> StorageResult<String> {
        match std::fs::canonicalize(path) {
            Ok(resolved) => Ok(resolved.to_string_lossy().into_owned()),
            // Nothing to resolve for paths that do not exist yet
            Err(_) => self.abspath(path),
        }
    }
}
