//! Shared fixture: a throwaway configuration repository plus an isolated
//! home directory, with the environment serialized across tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::TempDir;

use converge::cli::{ApplyOpts, GlobalOpts, RemoveOpts, VerifyOpts};
use converge::commands;
use converge::logging::Logger;

/// `HOME` and `XDG_CACHE_HOME` are process-wide; one test at a time.
static ENV_LOCK: Mutex<()> = Mutex::new(());

pub struct TestBed {
    pub repo: TempDir,
    pub home: TempDir,
    cache: TempDir,
}

/// Build a repository with the given links.toml and source files under
/// `links/`, plus an empty home to converge into.
pub fn testbed(links_toml: &str, sources: &[(&str, &str)]) -> TestBed {
    let repo = tempfile::tempdir().expect("create repo dir");
    std::fs::create_dir(repo.path().join("conf")).expect("create conf/");
    std::fs::create_dir(repo.path().join("links")).expect("create links/");
    std::fs::write(repo.path().join("conf").join("links.toml"), links_toml)
        .expect("write links.toml");
    for (name, content) in sources {
        let path = repo.path().join("links").join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create source parent");
        }
        std::fs::write(path, content).expect("write source");
    }
    TestBed {
        repo,
        home: tempfile::tempdir().expect("create home dir"),
        cache: tempfile::tempdir().expect("create cache dir"),
    }
}

impl TestBed {
    fn lock_env(&self) -> MutexGuard<'static, ()> {
        let guard = ENV_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::env::set_var("HOME", self.home.path());
        std::env::set_var("XDG_CACHE_HOME", self.cache.path());
        std::env::remove_var("CONVERGE_ROOT");
        guard
    }

    fn global(&self, dry_run: bool) -> GlobalOpts {
        GlobalOpts {
            profile: None,
            dry_run,
            root: Some(self.repo.path().to_path_buf()),
            parallel: false,
        }
    }

    pub fn apply(&self) -> anyhow::Result<()> {
        self.apply_with(false, &[], &[])
    }

    pub fn apply_dry_run(&self) -> anyhow::Result<()> {
        self.apply_with(true, &[], &[])
    }

    pub fn apply_with(&self, dry_run: bool, skip: &[&str], only: &[&str]) -> anyhow::Result<()> {
        let _env = self.lock_env();
        let log = Arc::new(Logger::new("apply"));
        let opts = ApplyOpts {
            skip: skip.iter().map(ToString::to_string).collect(),
            only: only.iter().map(ToString::to_string).collect(),
        };
        commands::apply::run(&self.global(dry_run), &opts, &log)
    }

    pub fn remove(&self) -> anyhow::Result<()> {
        let _env = self.lock_env();
        let log = Arc::new(Logger::new("remove"));
        commands::remove::run(&self.global(false), &RemoveOpts {}, &log)
    }

    pub fn verify(&self) -> anyhow::Result<()> {
        let _env = self.lock_env();
        let log = Arc::new(Logger::new("verify"));
        commands::verify::run(&self.global(false), &VerifyOpts {}, &log)
    }

    /// A path inside the isolated home.
    pub fn home_path(&self, rel: &str) -> PathBuf {
        self.home.path().join(rel)
    }
}
