//! Versioned declarative network configuration (`version: 1`, `config: [...]`).
//!
//! Each stanza in `config` is tagged by `type`. The tag is checked against
//! [`StanzaKind`] first so that an unknown kind is reported as such, then the
//! stanza is decoded into its typed [`Stanza`] variant and applied to a
//! [`NetworkState`]. Nothing is returned unless every stanza applied cleanly.

use std::str::FromStr;

use log::{debug, warn};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::state::{
    scalar, Control, InterfaceKind, NetworkState, Route, Subnet,
};

/// Bridge parameters understood by bridge-utils' ifupdown hooks. Anything
/// else under a bridge stanza's `params` is dropped.
pub const BRIDGE_OPTIONS: &[&str] = &[
    "bridge_ageing",
    "bridge_bridgeprio",
    "bridge_fd",
    "bridge_gcint",
    "bridge_hello",
    "bridge_hw",
    "bridge_maxage",
    "bridge_maxwait",
    "bridge_pathcost",
    "bridge_portprio",
    "bridge_stp",
    "bridge_waitport",
];

/// Errors raised while turning a network document into a [`NetworkState`].
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Stanza `type` is not one of the supported kinds.
    #[error("unknown stanza type '{kind}' in config entry {index}")]
    UnknownStanza { index: usize, kind: String },
    /// Stanza has no `type` key.
    #[error("config entry {index} has no 'type' key")]
    MissingStanzaType { index: usize },
    /// Stanza fields do not match its kind.
    #[error("invalid {kind} stanza in config entry {index}: {source}")]
    InvalidStanza {
        index: usize,
        kind: StanzaKind,
        source: serde_yaml::Error,
    },
    /// `version`/`config` have the wrong shape.
    #[error("invalid network document: {0}")]
    InvalidDocument(serde_yaml::Error),
    /// Route destination is not in `network/prefix` form.
    #[error("route destination '{destination}' is not in network/prefix form")]
    InvalidDestination { destination: String },
    /// A default route stanza has nothing to route through.
    #[error("default route '{destination}' has no gateway")]
    MissingGateway { destination: String },
    /// Input text is not YAML.
    #[error("failed to parse network config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The closed set of stanza kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StanzaKind {
    Physical,
    Vlan,
    Bond,
    Bridge,
    Route,
    Nameserver,
}

impl FromStr for StanzaKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "physical" => Ok(StanzaKind::Physical),
            "vlan" => Ok(StanzaKind::Vlan),
            "bond" => Ok(StanzaKind::Bond),
            "bridge" => Ok(StanzaKind::Bridge),
            "route" => Ok(StanzaKind::Route),
            "nameserver" => Ok(StanzaKind::Nameserver),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for StanzaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StanzaKind::Physical => "physical",
            StanzaKind::Vlan => "vlan",
            StanzaKind::Bond => "bond",
            StanzaKind::Bridge => "bridge",
            StanzaKind::Route => "route",
            StanzaKind::Nameserver => "nameserver",
        };
        f.write_str(name)
    }
}

/// Fields shared by every interface-like stanza.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkStanza {
    pub name: String,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    /// Kept as a YAML mapping so parameters render in document order.
    #[serde(default)]
    pub params: Mapping,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VlanStanza {
    #[serde(flatten)]
    pub link: LinkStanza,
    pub vlan_link: String,
    pub vlan_id: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BondStanza {
    #[serde(flatten)]
    pub link: LinkStanza,
    pub bond_interfaces: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeStanza {
    #[serde(flatten)]
    pub link: LinkStanza,
    pub bridge_interfaces: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteStanza {
    pub destination: String,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub metric: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameserverStanza {
    #[serde(default, deserialize_with = "scalar::list")]
    pub address: Vec<String>,
    #[serde(default, deserialize_with = "scalar::list")]
    pub search: Vec<String>,
}

/// One typed entry of the `config` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Stanza {
    Physical(LinkStanza),
    Vlan(VlanStanza),
    Bond(BondStanza),
    Bridge(BridgeStanza),
    Route(RouteStanza),
    Nameserver(NameserverStanza),
}

#[derive(Debug, Deserialize)]
struct NetworkDocument {
    version: i64,
    config: Vec<Value>,
}

/// Parse YAML text holding a network document (without the `network:` wrapper).
pub fn parse_str(yaml: &str) -> Result<Option<NetworkState>, SchemaError> {
    let value: Value = serde_yaml::from_str(yaml)?;
    parse(&value)
}

/// Build a [`NetworkState`] from a network document.
///
/// Returns `Ok(None)` when `version` or `config` is absent: no network
/// configuration was requested.
pub fn parse(document: &Value) -> Result<Option<NetworkState>, SchemaError> {
    let Some(map) = document.as_mapping() else {
        return Ok(None);
    };
    if !map.contains_key("version") || !map.contains_key("config") {
        return Ok(None);
    }

    let doc: NetworkDocument =
        serde_yaml::from_value(document.clone()).map_err(SchemaError::InvalidDocument)?;
    if doc.version != 1 {
        warn!("network config version {} is not 1; parsing as version 1", doc.version);
    }

    let stanzas = decode_stanzas(doc.config)?;
    let mut state = NetworkState::new();
    for stanza in stanzas {
        apply_stanza(&mut state, stanza)?;
    }
    Ok(Some(state))
}

/// Decode every entry before touching any state.
fn decode_stanzas(config: Vec<Value>) -> Result<Vec<Stanza>, SchemaError> {
    config
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let tag = value
                .get("type")
                .and_then(Value::as_str)
                .ok_or(SchemaError::MissingStanzaType { index })?;
            let kind = tag.parse::<StanzaKind>().map_err(|_| SchemaError::UnknownStanza {
                index,
                kind: tag.to_string(),
            })?;
            serde_yaml::from_value::<Stanza>(value)
                .map_err(|source| SchemaError::InvalidStanza { index, kind, source })
        })
        .collect()
}

fn apply_stanza(state: &mut NetworkState, stanza: Stanza) -> Result<(), SchemaError> {
    match stanza {
        Stanza::Physical(link) => handle_physical(state, link, InterfaceKind::Physical),
        Stanza::Vlan(vlan) => handle_vlan(state, vlan),
        Stanza::Bond(bond) => handle_bond(state, bond),
        Stanza::Bridge(bridge) => handle_bridge(state, bridge),
        Stanza::Route(route) => handle_route(state, route)?,
        Stanza::Nameserver(ns) => handle_nameserver(state, ns),
    }
    Ok(())
}

fn handle_physical(state: &mut NetworkState, link: LinkStanza, kind: InterfaceKind) {
    let iface = state.entry(&link.name, kind);
    iface.kind = kind;
    iface.mac_address = link.mac_address;
    iface.mtu = link.mtu;
    iface.control = link
        .subnets
        .first()
        .and_then(|subnet| subnet.control)
        .unwrap_or(Control::Auto);
    iface.subnets = link.subnets;
}

fn handle_vlan(state: &mut NetworkState, vlan: VlanStanza) {
    let name = vlan.link.name.clone();
    handle_physical(state, vlan.link, InterfaceKind::Vlan);
    let iface = state.entry(&name, InterfaceKind::Vlan);
    iface.vlan_raw_device = Some(vlan.vlan_link);
    iface.vlan_id = Some(vlan.vlan_id);
}

fn handle_bond(state: &mut NetworkState, bond: BondStanza) {
    let name = bond.link.name.clone();
    let options = params_to_text(&bond.link.params);
    handle_physical(state, bond.link, InterfaceKind::Bond);
    let iface = state.entry(&name, InterfaceKind::Bond);
    iface.bond_options = options.clone();
    iface.bond_slaves = Some("none".to_string());

    for slave in &bond.bond_interfaces {
        ensure_member(state, slave, &name);
        let member = state.entry(slave, InterfaceKind::Physical);
        member.bond_master = Some(name.clone());
        member.bond_options = options.clone();
    }
}

fn handle_bridge(state: &mut NetworkState, bridge: BridgeStanza) {
    for port in &bridge.bridge_interfaces {
        ensure_member(state, port, &bridge.link.name);
    }

    let name = bridge.link.name.clone();
    let mut options = Vec::new();
    for (key, value) in params_to_text(&bridge.link.params) {
        if BRIDGE_OPTIONS.contains(&key.as_str()) {
            options.push((key, value));
        } else {
            debug!("dropping unsupported bridge parameter '{key}' on {name}");
        }
    }
    handle_physical(state, bridge.link, InterfaceKind::Bridge);
    let iface = state.entry(&name, InterfaceKind::Bridge);
    iface.bridge_ports = bridge.bridge_interfaces;
    iface.bridge_options = options;
}

/// Insert a manual placeholder for a member that was never declared.
fn ensure_member(state: &mut NetworkState, member: &str, owner: &str) {
    if state.contains(member) {
        return;
    }
    warn!("{owner} references undeclared interface {member}; adding a manual placeholder");
    state.entry(member, InterfaceKind::Physical);
}

fn handle_route(state: &mut NetworkState, route: RouteStanza) -> Result<(), SchemaError> {
    let (network, prefix) =
        route
            .destination
            .split_once('/')
            .ok_or_else(|| SchemaError::InvalidDestination {
                destination: route.destination.clone(),
            })?;
    let prefix: u8 = prefix.parse().map_err(|_| SchemaError::InvalidDestination {
        destination: route.destination.clone(),
    })?;

    let is_default = matches!((network, prefix), ("0.0.0.0" | "::", 0));
    if is_default && route.gateway.as_deref().map_or(true, str::is_empty) {
        return Err(SchemaError::MissingGateway {
            destination: route.destination.clone(),
        });
    }

    let netmask = if network.contains(':') {
        prefix.to_string()
    } else {
        if prefix > 32 {
            return Err(SchemaError::InvalidDestination {
                destination: route.destination.clone(),
            });
        }
        cidr_to_netmask(prefix)
    };

    state.routes.push(Route {
        network: Some(network.to_string()),
        netmask: Some(netmask),
        gateway: route.gateway,
        metric: route.metric,
    });
    Ok(())
}

fn handle_nameserver(state: &mut NetworkState, ns: NameserverStanza) {
    state.dns.nameservers.extend(ns.address);
    state.dns.search.extend(ns.search);
}

fn params_to_text(params: &Mapping) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| Some((scalar::to_text(key)?, scalar::to_text(value)?)))
        .collect()
}

/// Dotted IPv4 netmask for a prefix length of at most 32.
pub fn cidr_to_netmask(prefix: u8) -> String {
    let bits: u32 = match prefix {
        0 => 0,
        p => u32::MAX << (32 - u32::from(p.min(32))),
    };
    let octets = bits.to_be_bytes();
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}
