//! End-to-end runs of the real subcommands against a throwaway repository
//! and an isolated home directory.

mod common;

use common::testbed;

const ONE_LINK: &str = r#"
[[link]]
source = "bashrc"
"#;

#[cfg(unix)]
#[test]
fn apply_creates_declared_links() {
    let bed = testbed(ONE_LINK, &[("bashrc", "export EDITOR=nvim\n")]);
    bed.apply().expect("apply succeeds");

    let target = bed.home_path(".bashrc");
    assert!(target.symlink_metadata().expect("target exists").is_symlink());
    assert_eq!(
        std::fs::read_to_string(&target).expect("read through link"),
        "export EDITOR=nvim\n"
    );
}

#[cfg(unix)]
#[test]
fn apply_twice_changes_nothing_new() {
    let bed = testbed(ONE_LINK, &[("bashrc", "alias ll='ls -l'\n")]);
    bed.apply().expect("first apply");
    bed.apply().expect("second apply");
    assert!(bed
        .home_path(".bashrc")
        .symlink_metadata()
        .expect("still present")
        .is_symlink());
}

#[test]
fn dry_run_touches_nothing() {
    let bed = testbed(ONE_LINK, &[("bashrc", "set -o vi\n")]);
    bed.apply_dry_run().expect("dry-run apply");
    assert!(!bed.home_path(".bashrc").exists());
}

#[cfg(unix)]
#[test]
fn verify_previews_without_changing() {
    let bed = testbed(ONE_LINK, &[("bashrc", "set -o vi\n")]);
    bed.verify().expect("verify succeeds on a drifted home");
    assert!(!bed.home_path(".bashrc").exists());

    bed.apply().expect("apply");
    bed.verify().expect("verify succeeds on a converged home");
    assert!(bed
        .home_path(".bashrc")
        .symlink_metadata()
        .expect("link survived verify")
        .is_symlink());
}

#[cfg(unix)]
#[test]
fn remove_materialises_link_content() {
    let bed = testbed(ONE_LINK, &[("bashrc", "export PAGER=less\n")]);
    bed.apply().expect("apply");
    bed.remove().expect("remove");

    let target = bed.home_path(".bashrc");
    let meta = target.symlink_metadata().expect("target still present");
    assert!(!meta.is_symlink());
    assert_eq!(
        std::fs::read_to_string(&target).expect("read real file"),
        "export PAGER=less\n"
    );
}

#[cfg(unix)]
#[test]
fn explicit_target_overrides_derived_name() {
    let bed = testbed(
        r#"
[[link]]
source = "config/nvim/init.lua"
target = ".config/nvim/init.lua"
"#,
        &[("config/nvim/init.lua", "vim.opt.number = true\n")],
    );
    bed.apply().expect("apply");
    assert!(bed
        .home_path(".config/nvim/init.lua")
        .symlink_metadata()
        .expect("nested target exists")
        .is_symlink());
}

#[cfg(unix)]
#[test]
fn only_filter_limits_the_run_to_matching_tasks() {
    let bed = testbed(ONE_LINK, &[("bashrc", "umask 022\n")]);
    bed.apply_with(false, &[], &["links"]).expect("filtered apply");
    assert!(bed.home_path(".bashrc").exists());
}

#[cfg(unix)]
#[test]
fn skip_filter_suppresses_matching_tasks() {
    let bed = testbed(ONE_LINK, &[("bashrc", "umask 022\n")]);
    bed.apply_with(false, &["links"], &[]).expect("filtered apply");
    assert!(!bed.home_path(".bashrc").exists());
}

#[test]
fn missing_repository_root_is_an_error() {
    use converge::cli::{ApplyOpts, GlobalOpts};
    use converge::logging::Logger;
    use std::sync::Arc;

    let empty = tempfile::tempdir().expect("create empty dir");
    let global = GlobalOpts {
        profile: None,
        dry_run: false,
        root: Some(empty.path().to_path_buf()),
        parallel: false,
    };
    let log = Arc::new(Logger::new("apply"));
    let opts = ApplyOpts {
        skip: vec![],
        only: vec![],
    };
    let err = converge::commands::apply::run(&global, &opts, &log).unwrap_err();
    assert!(err.to_string().contains("conf/"));
}
