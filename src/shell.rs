use std::path::{Path, PathBuf};

pub const DEFAULT_KNOWN_SHELL_PATHS: &[&str] = &[
    "/run/current-system/sw/bin/bash",
    "/bin/bash",
    "/usr/bin/bash",
    "/usr/local/bin/bash",
    "/opt/homebrew/bin/bash",
    "/bin/sh",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellNotFound {
    pub checked: Vec<PathBuf>,
}

impl std::fmt::Display for ShellNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let checked = self
            .checked
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<String>>()
            .join(", ");
        write!(
            f,
            "unable to resolve shell executable; checked configured shell and known paths: {checked}"
        )
    }
}

impl std::error::Error for ShellNotFound {}

/// Picks the shell used to run managed commands.
///
/// A configured path wins when it is absolute and exists; otherwise the first
/// existing entry of `known_paths` is used.
pub fn resolve_shell_executable<P>(
    configured: Option<&Path>,
    known_paths: &[P],
) -> Result<PathBuf, ShellNotFound>
where
    P: AsRef<Path>,
{
    if let Some(path) = configured.filter(|path| is_existing_absolute(path)) {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = known_paths
        .iter()
        .map(AsRef::as_ref)
        .find(|path| is_existing_absolute(path))
    {
        return Ok(path.to_path_buf());
    }

    let mut checked = configured
        .map(|path| vec![path.to_path_buf()])
        .unwrap_or_default();
    checked.extend(known_paths.iter().map(|path| path.as_ref().to_path_buf()));
    Err(ShellNotFound { checked })
}

fn is_existing_absolute(path: &Path) -> bool {
    path.is_absolute() && path.exists()
}
