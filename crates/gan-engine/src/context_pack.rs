//! Context pack collaborator (§4.8 step 4): builds the repository context
//! handed to the judge, scope-dependent. Kept intentionally minimal — the
//! spec treats this as out-of-scope at the interface only, so
//! [`ContextPackBuilder`] exists mainly so a caller can substitute a richer
//! implementation without touching [`crate::engine::GanEngine`].

use std::path::PathBuf;

use gan_core::{GanError, Scope, SessionConfig};

pub trait ContextPackBuilder: Send + Sync {
    fn build(&self, config: &SessionConfig) -> Result<String, GanError>;
}

/// Reads `scope`/`paths` directly off a working directory on disk.
pub struct DiskContextPackBuilder {
    pub root: PathBuf,
}

impl DiskContextPackBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn git_diff(&self) -> String {
        std::process::Command::new("git")
            .arg("diff")
            .current_dir(&self.root)
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).into_owned())
            .unwrap_or_default()
    }

    fn read_paths(&self, paths: &[String]) -> String {
        let mut out = String::new();
        for path in paths {
            let Ok(content) = std::fs::read_to_string(self.root.join(path)) else {
                continue;
            };
            out.push_str("--- ");
            out.push_str(path);
            out.push_str(" ---\n");
            out.push_str(&content);
            out.push('\n');
        }
        out
    }
}

impl ContextPackBuilder for DiskContextPackBuilder {
    fn build(&self, config: &SessionConfig) -> Result<String, GanError> {
        let pack = match config.scope {
            Scope::Diff => self.git_diff(),
            Scope::Paths => self.read_paths(&config.paths),
            Scope::Workspace => format!("workspace root: {}", self.root.display()),
        };
        Ok(pack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_scope_reads_listed_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
        let builder = DiskContextPackBuilder::new(dir.path());
        let config = SessionConfig {
            scope: Scope::Paths,
            paths: vec!["a.rs".to_string()],
            ..Default::default()
        };
        let pack = builder.build(&config).unwrap();
        assert!(pack.contains("fn a() {}"));
    }

    #[test]
    fn paths_scope_skips_unreadable_entries() {
        let dir = tempfile::tempdir().unwrap();
        let builder = DiskContextPackBuilder::new(dir.path());
        let config = SessionConfig {
            scope: Scope::Paths,
            paths: vec!["missing.rs".to_string()],
            ..Default::default()
        };
        assert_eq!(builder.build(&config).unwrap(), "");
    }

    #[test]
    fn workspace_scope_names_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let builder = DiskContextPackBuilder::new(dir.path());
        let pack = builder.build(&SessionConfig::default()).unwrap();
        assert!(pack.contains(&dir.path().display().to_string()));
    }
}
