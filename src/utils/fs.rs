//! Path display helpers

use std::path::Path;

/// Replaces the user's home directory prefix with `~`
pub fn tilde_home(path: &str) -> String {
    let Some(home) = dirs::home_dir() else {
        return path.to_string();
    };
    match Path::new(path).strip_prefix(&home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => path.to_string(),
    }
}

/// Fits a repository path into `max_length` columns.
///
/// The home prefix collapses to `~` first; if that is still too wide only the
/// parent directory and the repository name are kept.
pub fn shorten_path(path: &str, max_length: usize) -> String {
    let shown = tilde_home(path);
    if shown.chars().count() <= max_length {
        return shown;
    }

    let names: Vec<&str> = shown.split('/').filter(|s| !s.is_empty()).collect();
    match names.as_slice() {
        [.., parent, repo] if names.len() > 2 => format!(".../{parent}/{repo}"),
        _ => shown,
    }
}
