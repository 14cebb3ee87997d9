//! Configuration detection, backup and restore engine.
//!
//! Finds which developer tools are present on a machine, captures their
//! configuration files into a verifiable backup, and restores them without
//! ever destroying what is already there.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: component catalog, sensitivity rules and settings from TOML
//! - **[`detect`]**: multi-signal detection of installed components
//! - **[`filter`]**: sensitivity rules applied before anything is copied
//! - **[`backup`]** / **[`manifest`]**: capture artifacts and describe them
//! - **[`restore`]**: preserve-before-overwrite restore
//! - **[`commands`]**: top-level subcommand orchestration (`export`, `restore`, `scan`, `verify`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod backup;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod detect;
pub mod error;
pub mod exec;
pub mod filter;
pub mod logging;
pub mod manifest;
pub mod platform;
pub mod restore;
