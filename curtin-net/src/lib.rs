//! Install-time network configuration for a target filesystem.
//!
//! Given a curtin network config and the root of a system being provisioned,
//! this crate either hands the config to the target's own configurator
//! (passthrough) or renders an ifupdown interfaces file and udev naming rules
//! into the target with [`eni_core`], then applies a few idempotent fixes.
//!
//! # Modules
//!
//! - [`apply_net`] — the apply run: passthrough decision, rendering, patches
//! - [`net_meta`] — generate an interfaces file from devices, a copy, or a config
//! - [`artifacts`] — every file written into the target, built before writing
//! - [`passthrough`] — passthrough policy and the in-target version probe
//! - [`patches`] — known-content cleanups and MTU hooks
//! - [`config`] — YAML config loading and `key/path=value` overrides
//! - [`sysnet`] — `/sys/class/net` queries for device aliases
//! - [`report`] — terminal output for parsed interfaces files
//! - [`target`] — file helpers rooted at the target

pub mod apply_net;
pub mod artifacts;
pub mod config;
pub mod net_meta;
pub mod passthrough;
pub mod patches;
pub mod report;
pub mod sysnet;
pub mod target;
