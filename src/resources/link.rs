//! Symlink resource.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A symlink at `target` that should point at `source`.
#[derive(Debug, Clone)]
pub struct LinkResource {
    /// What the link points to (file or directory in the repo).
    pub source: PathBuf,
    /// Where the link lives (under `$HOME`).
    pub target: PathBuf,
}

impl LinkResource {
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }
}

impl Applicable for LinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.target.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        if let Some(parent) = self.target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir: {}", parent.display()))?;
        }

        // Replace whatever sits at the target, link or file.
        if self.target.symlink_metadata().is_ok() {
            remove_link_target(&self.target)
                .with_context(|| format!("remove existing: {}", self.target.display()))?;
        }

        create_symlink(&self.source, &self.target)
            .with_context(|| format!("create link: {}", self.target.display()))?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        // Materialise the content so the user keeps a real copy after the
        // link is gone.
        materialize(&self.source, &self.target).with_context(|| {
            format!(
                "materialize {} -> {}",
                self.target.display(),
                self.source.display()
            )
        })?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for LinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }

        // A real directory at the target is never replaced.
        let target_meta = self.target.symlink_metadata();
        if let Ok(meta) = &target_meta {
            if meta.is_dir() && !meta.is_symlink() {
                return Ok(ResourceState::Invalid {
                    reason: "target is a real directory".to_string(),
                });
            }
        }

        match std::fs::read_link(&self.target) {
            Ok(existing) => {
                if existing == self.source {
                    Ok(ResourceState::Correct)
                } else {
                    Ok(ResourceState::Incorrect {
                        observed: format!("points to {}", existing.display()),
                    })
                }
            }
            Err(_) => {
                if target_meta.is_ok() {
                    Ok(ResourceState::Incorrect {
                        observed: "target is a regular file".to_string(),
                    })
                } else {
                    Ok(ResourceState::Missing)
                }
            }
        }
    }
}

fn create_symlink(source: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, link)
            .with_context(|| format!("symlink {} -> {}", link.display(), source.display()))?;
    }

    #[cfg(windows)]
    {
        let result = if source.is_dir() {
            std::os::windows::fs::symlink_dir(source, link)
        } else {
            std::os::windows::fs::symlink_file(source, link)
        };
        result.with_context(|| format!("symlink {} -> {}", link.display(), source.display()))?;
    }

    Ok(())
}

/// Replace the symlink at `target` with a real copy of `source`.
///
/// The copy is staged to a temp sibling so the rename stays on one
/// filesystem; the symlink is only removed once the copy succeeded.
fn materialize(source: &Path, target: &Path) -> Result<()> {
    let staged = target.with_extension("converge_tmp");
    if source.is_dir() {
        copy_dir_recursive(source, &staged)?;
    } else {
        std::fs::copy(source, &staged)
            .with_context(|| format!("copy {} to {}", source.display(), staged.display()))?;
    }

    if let Err(e) = remove_link_target(target) {
        let _ = if staged.is_dir() {
            std::fs::remove_dir_all(&staged)
        } else {
            std::fs::remove_file(&staged)
        };
        return Err(e).with_context(|| format!("remove link: {}", target.display()));
    }

    std::fs::rename(&staged, target)
        .with_context(|| format!("move {} into place", staged.display()))?;
    Ok(())
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("create dir: {}", dest.display()))?;
    for entry in std::fs::read_dir(source)
        .with_context(|| format!("read dir: {}", source.display()))?
    {
        let entry = entry?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)
                .with_context(|| format!("copy {} to {}", from.display(), to.display()))?;
        }
    }
    Ok(())
}

/// Remove the link (or stray file) at `path`. Directory symlinks need
/// `remove_dir` on Windows.
fn remove_link_target(path: &Path) -> Result<()> {
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("reading metadata: {}", path.display()))?;
    if meta.is_dir() {
        std::fs::remove_dir(path).with_context(|| format!("remove dir: {}", path.display()))?;
    } else {
        std::fs::remove_file(path).with_context(|| format!("remove file: {}", path.display()))?;
    }
    Ok(())
}
