use storage_base::StorageResult;

use super::{PathModule, current_dir_string, env_lookup, split_extension};

/// Path functions for Windows hosts.
///
/// Both `\` and `/` are accepted as separators; `\` is produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsModule;

pub static WINDOWS: WindowsModule = WindowsModule;

const SEPARATORS: [char; 2] = ['\\', '/'];

fn is_sep(c: char) -> bool {
    SEPARATORS.contains(&c)
}

pub(crate) fn splitdrive(path: &str) -> (String, String) {
    let whole = || (String::new(), path.to_string());
    if path.len() < 2 {
        return whole();
    }
    let normalized = path.replace('/', "\\");
    let bytes = normalized.as_bytes();
    if normalized.starts_with("\\\\") && bytes.get(2) != Some(&b'\\') {
        // UNC share: \\server\share
        let Some(server_end) = normalized[2..].find('\\').map(|i| i + 2) else {
            return whole();
        };
        let share_end = normalized[server_end + 1..]
            .find('\\')
            .map_or(normalized.len(), |i| i + server_end + 1);
        if share_end == server_end + 1 {
            return whole();
        }
        let (drive, rest) = path.split_at(share_end);
        return (drive.to_string(), rest.to_string());
    }
    if bytes[1] == b':' {
        let (drive, rest) = path.split_at(2);
        return (drive.to_string(), rest.to_string());
    }
    whole()
}

pub(crate) fn split(path: &str) -> (String, String) {
    let (drive, rest) = splitdrive(path);
    let index = rest.rfind(SEPARATORS).map_or(0, |i| i + 1);
    let (head, tail) = rest.split_at(index);
    let trimmed = head.trim_end_matches(SEPARATORS);
    let head = if trimmed.is_empty() { head } else { trimmed };
    (format!("{}{}", drive, head), tail.to_string())
}

pub(crate) fn join(base: &str, part: &str) -> String {
    let (mut result_drive, mut result_path) = splitdrive(base);
    let (part_drive, part_path) = splitdrive(part);
    if part_path.starts_with(SEPARATORS) {
        // Second path is absolute
        if !part_drive.is_empty() || result_drive.is_empty() {
            result_drive = part_drive;
        }
        result_path = part_path;
    } else if !part_drive.is_empty() && part_drive != result_drive {
        if part_drive.to_lowercase() != result_drive.to_lowercase() {
            // Different drives, the first path is dropped entirely
            result_drive = part_drive;
            result_path = part_path;
        } else {
            result_drive = part_drive;
            append_relative(&mut result_path, &part_path);
        }
    } else {
        append_relative(&mut result_path, &part_path);
    }
    // A UNC share needs a separator before a relative remainder
    if !result_path.is_empty()
        && !result_path.starts_with(SEPARATORS)
        && !result_drive.is_empty()
        && !result_drive.ends_with(':')
    {
        return format!("{}\\{}", result_drive, result_path);
    }
    format!("{}{}", result_drive, result_path)
}

fn append_relative(result_path: &mut String, part_path: &str) {
    if !result_path.is_empty() && !result_path.ends_with(SEPARATORS) {
        result_path.push('\\');
    }
    result_path.push_str(part_path);
}

pub(crate) fn normpath(path: &str) -> String {
    if path.starts_with("\\\\.\\") || path.starts_with("\\\\?\\") {
        // Device and literal paths are passed through untouched
        return path.to_string();
    }
    let path = path.replace('/', "\\");
    let (mut prefix, rest) = splitdrive(&path);
    let mut rest = rest.as_str();
    if rest.starts_with('\\') {
        prefix.push('\\');
        rest = rest.trim_start_matches('\\');
    }
    let mut components: Vec<&str> = Vec::new();
    for component in rest.split('\\') {
        match component {
            "" | "." => {}
            ".." => match components.last() {
                Some(&last) if last != ".." => {
                    components.pop();
                }
                None if prefix.ends_with('\\') => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }
    if prefix.is_empty() && components.is_empty() {
        return ".".to_string();
    }
    format!("{}{}", prefix, components.join("\\"))
}

pub(crate) fn isabs(path: &str) -> bool {
    let (_, rest) = splitdrive(path);
    rest.starts_with(SEPARATORS)
}

pub(crate) fn expanduser_with(path: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    if !path.starts_with('~') {
        return path.to_string();
    }
    let end = path[1..]
        .find(is_sep)
        .map_or(path.len(), |i| i + 1);
    let home = match lookup("USERPROFILE") {
        Some(profile) => profile,
        None => match lookup("HOMEPATH") {
            Some(home_path) => join(&lookup("HOMEDRIVE").unwrap_or_default(), &home_path),
            None => return path.to_string(),
        },
    };
    let home = if end != 1 {
        // ~user resolves to a sibling of the current user's profile
        join(&split(&home).0, &path[1..end])
    } else {
        home
    };
    format!("{}{}", home, &path[end..])
}

pub(crate) fn expandvars_with(path: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    if !path.contains(['$', '%']) {
        return path.to_string();
    }
    let is_var_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
    let mut result = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(c) = rest.chars().next() {
        let body = &rest[c.len_utf8()..];
        match c {
            '\'' => match body.find('\'') {
                // Quoted text is copied verbatim, quotes included
                Some(end) => {
                    result.push_str(&rest[..end + 2]);
                    rest = &body[end + 1..];
                }
                None => {
                    result.push_str(rest);
                    rest = "";
                }
            },
            '%' if body.starts_with('%') => {
                result.push('%');
                rest = &body[1..];
            }
            '%' => match body.find('%') {
                Some(end) => {
                    let name = &body[..end];
                    match lookup(name) {
                        Some(value) => result.push_str(&value),
                        None => result.push_str(&rest[..end + 2]),
                    }
                    rest = &body[end + 1..];
                }
                None => {
                    result.push_str(rest);
                    rest = "";
                }
            },
            '$' if body.starts_with('$') => {
                result.push('$');
                rest = &body[1..];
            }
            '$' if body.starts_with('{') => match body[1..].find('}') {
                Some(end) => {
                    let name = &body[1..end + 1];
                    match lookup(name) {
                        Some(value) => result.push_str(&value),
                        None => result.push_str(&rest[..end + 3]),
                    }
                    rest = &body[end + 2..];
                }
                None => {
                    result.push_str(rest);
                    rest = "";
                }
            },
            '$' => {
                let end = body.find(|c: char| !is_var_char(c)).unwrap_or(body.len());
                let name = &body[..end];
                match lookup(name).filter(|_| !name.is_empty()) {
                    Some(value) => result.push_str(&value),
                    None => result.push_str(&rest[..end + 1]),
                }
                rest = &body[end..];
            }
            _ => {
                result.push(c);
                rest = body;
            }
        }
    }
    result
}

impl PathModule for WindowsModule {
    fn sep(&self) -> &'static str {
        "\\"
    }

    fn join(&self, base: &str, part: &str) -> String {
        join(base, part)
    }

    fn split(&self, path: &str) -> (String, String) {
        split(path)
    }

    fn splitext(&self, path: &str) -> (String, String) {
        split_extension(path, &SEPARATORS)
    }

    fn splitdrive(&self, path: &str) -> (String, String) {
        splitdrive(path)
    }

    fn normpath(&self, path: &str) -> String {
        normpath(path)
    }

    fn isabs(&self, path: &str) -> bool {
        isabs(path)
    }

    fn normcase(&self, path: &str) -> String {
        path.replace('/', "\\").to_lowercase()
    }

    fn expanduser(&self, path: &str) -> String {
        expanduser_with(path, env_lookup)
    }

    fn expandvars(&self, path: &str) -> String {
        expandvars_with(path, env_lookup)
    }

    fn abspath(&self, path: &str) -> StorageResult<String> {
        if isabs(path) {
            return Ok(normpath(path));
        }
        Ok(normpath(&join(&current_dir_string()?, path)))
    }

    fn realpath(&self, path: &str) -> StorageResult<String> {
        self.abspath(path)
    }
}
