//! Declarative local machine-configuration engine.
//!
//! `converge` brings a set of declared configuration items (symlinks,
//! permission bits, registry values, installed packages, enabled service
//! units) into a desired state, idempotently, across repeated runs.
//!
//! The crate is organised in four layers, leaf-first:
//!
//! - **[`resources`]**: idempotent check + apply primitives, one per item kind
//! - **[`tasks`]**: named, dependency-ordered units of work driving batches
//!   of resources through the generic reconciliation loop
//! - **[`logging`]**: direct, buffered-parallel, and diagnostic output
//! - **[`commands`]**: subcommand orchestration (`apply`, `remove`, `verify`)
//!
//! Configuration is read from TOML files under `conf/` and filtered by the
//! resolved profile and the detected platform.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod resources;
pub mod tasks;
