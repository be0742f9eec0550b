// src/editor.rs
// Editor resolution and argument vector construction.
//
// A requested editor may be an absolute path (used as-is after an existence
// check) or a bare name searched across PATH. When nothing usable was
// requested, a short list of common graphical editors is probed instead.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::EditorError;

#[cfg(not(windows))]
const FALLBACK_EDITORS: &[&str] = &["gvim", "sublime", "gedit", "kate", "mousepad", "leafpad"];

#[cfg(windows)]
const FALLBACK_EDITORS: &[&str] = &[
    "gedit.exe",
    "sublime_text.exe",
    "notepad++.exe",
    "notepad.exe",
];

/// A resolved editor invocation. The scratch-file path is appended by the
/// session as the final positional argument.
#[derive(Debug, Clone)]
pub struct EditorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Resolves the requested editor, falling back to the stock list.
pub fn resolve(requested: Option<&str>) -> Result<PathBuf, EditorError> {
    if let Some(name) = requested {
        if let Some(path) = which(name) {
            return Ok(path);
        }
        debug!(editor = name, "requested editor not found, trying fallbacks");
    }

    for candidate in FALLBACK_EDITORS {
        if let Some(path) = which(candidate) {
            debug!(editor = %path.display(), "using fallback editor");
            return Ok(path);
        }
    }

    Err(EditorError::NotFound(
        requested.unwrap_or("<no editor requested>").to_string(),
    ))
}

/// Builds the argument vector: request args in order, then a synthesized
/// `-f` foreground flag for the vim family so the GUI process does not
/// detach before the user is done editing.
pub fn build_command(program: PathBuf, extra_args: &[String]) -> EditorCommand {
    let mut args = extra_args.to_vec();
    if is_vim(&program) {
        args.push("-f".to_string());
    }
    EditorCommand { program, args }
}

/// `which`-style lookup. Absolute paths bypass the search.
fn which(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }
    which_in(name, env::var_os("PATH")?.as_os_str())
}

fn which_in(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn is_vim(program: &Path) -> bool {
    program
        .file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.ends_with("vim"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn absolute_path_passes_through_when_it_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exe = dir.path().join("myedit");
        fs::write(&exe, "#!/bin/sh\n").expect("write");

        let resolved = which(exe.to_str().unwrap()).expect("should resolve");
        assert_eq!(resolved, exe);
    }

    #[test]
    fn missing_absolute_path_does_not_resolve() {
        assert_eq!(which("/definitely/not/here/editor"), None);
    }

    #[test]
    fn path_search_finds_the_first_match() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        fs::write(second.path().join("ed"), "").expect("write");

        let search = env::join_paths([first.path(), second.path()]).expect("join");
        let found = which_in("ed", &search).expect("should find");
        assert_eq!(found, second.path().join("ed"));
    }

    #[test]
    fn path_search_skips_directories_without_the_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let search = env::join_paths([dir.path()]).expect("join");
        assert_eq!(which_in("ed", &search), None);
    }

    #[test]
    fn vim_family_gets_foreground_flag_after_user_args() {
        let command = build_command(PathBuf::from("/usr/bin/gvim"), &["-n".to_string()]);
        assert_eq!(command.args, vec!["-n".to_string(), "-f".to_string()]);
    }

    #[test]
    fn non_vim_editors_get_args_verbatim() {
        let command = build_command(PathBuf::from("/usr/bin/gedit"), &["--wait".to_string()]);
        assert_eq!(command.args, vec!["--wait".to_string()]);
    }

    #[test]
    fn bare_vim_suffix_is_matched_on_the_file_name_only() {
        assert!(is_vim(Path::new("/opt/vim/bin/mvim")));
        assert!(!is_vim(Path::new("/home/vim/bin/gedit")));
    }
}
