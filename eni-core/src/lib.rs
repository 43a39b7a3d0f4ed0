//! Network configuration model and boot-time artifact renderers.
//!
//! A versioned network document ([`schema`]) is normalized into a
//! [`NetworkState`], which the renderers turn into an ifupdown interfaces file
//! ([`eni`]) and udev naming rules ([`udev`]). Existing interfaces files can be
//! read with [`legacy`].

pub mod eni;
pub mod legacy;
pub mod schema;
pub mod state;
pub mod udev;

pub use eni::{render_interfaces, render_route};
pub use legacy::{LegacyInterface, LegacyInterfaces, LegacyParseError};
pub use schema::{SchemaError, Stanza, StanzaKind};
pub use state::{Control, Dns, Interface, InterfaceKind, NetworkState, Route, Subnet, SubnetType};
pub use udev::{generate_rule, render_persistent_net};
