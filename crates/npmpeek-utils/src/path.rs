use std::{
    env,
    path::{Path, PathBuf},
};

use crate::error::{PathError, PathResult};

/// Resolves a user-supplied path string.
///
/// Expands `$VAR` and `${VAR}` references, replaces a leading `~` with the
/// home directory and makes relative results absolute against the current
/// working directory.
///
/// # Errors
///
/// * [`PathError::Empty`] if the path is empty
/// * [`PathError::MissingEnvVar`] if a referenced variable is not set
/// * [`PathError::UnclosedVariable`] for a `${` without a closing brace
/// * [`PathError::CurrentDir`] if the working directory cannot be read
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let expanded = PathBuf::from(expand_variables(path)?);
    if expanded.is_absolute() {
        return Ok(expanded);
    }

    env::current_dir()
        .map(|cwd| cwd.join(expanded))
        .map_err(|source| PathError::CurrentDir { source })
}

fn expand_variables(input: &str) -> PathResult<String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(PathError::UnclosedVariable {
                        input: format!("${{{name}"),
                    });
                }
                result.push_str(&lookup_var(&name, input)?);
            }
            '$' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    result.push('$');
                } else {
                    result.push_str(&lookup_var(&name, input)?);
                }
            }
            '~' if result.is_empty() => result.push_str(&home_dir().to_string_lossy()),
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn lookup_var(name: &str, input: &str) -> PathResult<String> {
    match name {
        "HOME" => Ok(home_dir().to_string_lossy().into_owned()),
        "XDG_CONFIG_HOME" => Ok(xdg_config_home().to_string_lossy().into_owned()),
        "XDG_CACHE_HOME" => Ok(xdg_cache_home().to_string_lossy().into_owned()),
        _ => {
            env::var(name).map_err(|_| {
                PathError::MissingEnvVar {
                    var: name.to_string(),
                    input: input.to_string(),
                }
            })
        }
    }
}

/// Returns `$HOME`, or the system temp directory when it is unset.
pub fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir())
}

/// Returns `$XDG_CONFIG_HOME`, defaulting to `$HOME/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns `$XDG_CACHE_HOME`, defaulting to `$HOME/.cache`.
pub fn xdg_cache_home() -> PathBuf {
    env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".cache"))
}

/// Lexically normalizes a path that must stay inside some root.
///
/// Backslashes are treated as separators, `.` segments are dropped and `..`
/// pops the previous segment. The result is a relative path with no `..`
/// components; an empty result refers to the root itself.
///
/// # Errors
///
/// * [`PathError::Empty`] if the input is blank
/// * [`PathError::InvalidCharacter`] if the input contains a NUL byte
/// * [`PathError::Absolute`] if the input starts at a filesystem root
/// * [`PathError::OutsideRoot`] if a `..` would climb above the root
pub fn normalize_relative(requested: &str) -> PathResult<PathBuf> {
    if requested.contains('\0') {
        return Err(PathError::InvalidCharacter {
            path: requested.replace('\0', "\\0"),
        });
    }

    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }

    let unified = trimmed.replace('\\', "/");
    let has_drive = unified.len() >= 2
        && unified.as_bytes()[1] == b':'
        && unified.as_bytes()[0].is_ascii_alphabetic();
    if unified.starts_with('/') || has_drive {
        return Err(PathError::Absolute {
            path: trimmed.to_string(),
        });
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::OutsideRoot {
                        path: trimmed.to_string(),
                    });
                }
            }
            other => segments.push(other),
        }
    }

    Ok(segments.iter().collect())
}

/// Joins a requested relative path onto `root` after normalization and checks
/// that the result is still prefixed by `root`.
///
/// No filesystem access happens here; symlinks are the caller's concern.
pub fn resolve_within(root: &Path, requested: &str) -> PathResult<PathBuf> {
    let relative = normalize_relative(requested)?;
    let joined = root.join(relative);

    if !joined.starts_with(root) {
        return Err(PathError::OutsideRoot {
            path: requested.to_string(),
        });
    }

    Ok(joined)
}
