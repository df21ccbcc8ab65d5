// `libgit2-sys` (via `git2`) doesn't always pull in advapi32 on MSVC.
#[cfg(windows)]
#[link(name = "advapi32")]
unsafe extern "system" {}

pub mod analyzer;
pub mod config;
pub mod core;
pub mod persistence;
pub mod web;
