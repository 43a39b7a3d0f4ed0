use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Interface type. Variant order is the declaration order used by renderers:
/// physical devices before the bonds, bridges and vlans built on top of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Physical,
    Bond,
    Bridge,
    Vlan,
}

impl Display for InterfaceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterfaceKind::Physical => "physical",
            InterfaceKind::Bond => "bond",
            InterfaceKind::Bridge => "bridge",
            InterfaceKind::Vlan => "vlan",
        };
        f.write_str(name)
    }
}

/// How ifupdown brings an interface up at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    #[default]
    Auto,
    Hotplug,
    Manual,
}

/// Addressing method of a subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetType {
    Static,
    Static6,
    Dhcp,
    Dhcp4,
    Dhcp6,
    Manual,
}

impl SubnetType {
    pub fn as_str(self) -> &'static str {
        match self {
            SubnetType::Static => "static",
            SubnetType::Static6 => "static6",
            SubnetType::Dhcp => "dhcp",
            SubnetType::Dhcp4 => "dhcp4",
            SubnetType::Dhcp6 => "dhcp6",
            SubnetType::Manual => "manual",
        }
    }

    pub fn is_dhcp(self) -> bool {
        self.as_str().starts_with("dhcp")
    }
}

/// A static route, either global or scoped to a subnet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default, deserialize_with = "crate::state::scalar::optional")]
    pub netmask: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub metric: Option<u32>,
}

impl Route {
    /// True for `0.0.0.0/0.0.0.0`.
    pub fn is_ipv4_default(&self) -> bool {
        self.network.as_deref() == Some("0.0.0.0") && self.netmask.as_deref() == Some("0.0.0.0")
    }

    /// True for `::` with a zero mask written as a prefix length or an address.
    pub fn is_ipv6_default(&self) -> bool {
        self.network.as_deref() == Some("::")
            && matches!(self.netmask.as_deref(), Some("0" | "::" | "::0"))
    }
}

/// One addressing method attached to an interface.
///
/// Position inside [`Interface::subnets`] matters: index 0 is the primary
/// address and later entries become `name:index` alias stanzas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    #[serde(rename = "type")]
    pub subnet_type: SubnetType,
    #[serde(default)]
    pub control: Option<Control>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "crate::state::scalar::optional")]
    pub netmask: Option<String>,
    #[serde(default)]
    pub broadcast: Option<String>,
    #[serde(default)]
    pub metric: Option<u32>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub pointopoint: Option<String>,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "crate::state::scalar::list")]
    pub dns_search: Vec<String>,
    #[serde(default, deserialize_with = "crate::state::scalar::list")]
    pub dns_nameservers: Vec<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl Subnet {
    pub fn new(subnet_type: SubnetType) -> Self {
        Self {
            subnet_type,
            control: None,
            address: None,
            netmask: None,
            broadcast: None,
            metric: None,
            gateway: None,
            pointopoint: None,
            mtu: None,
            scope: None,
            dns_search: Vec::new(),
            dns_nameservers: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// `static6`/`dhcp6`, or a `static` subnet whose address contains a colon.
    pub fn is_ipv6(&self) -> bool {
        if self.subnet_type.as_str().ends_with('6') {
            return true;
        }
        self.subnet_type == SubnetType::Static
            && self.address.as_deref().is_some_and(|a| a.contains(':'))
    }
}

/// A normalized interface entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub name: String,
    pub kind: InterfaceKind,
    pub mac_address: Option<String>,
    pub mtu: Option<u32>,
    pub control: Control,
    pub subnets: Vec<Subnet>,
    /// Raw device of a vlan.
    pub vlan_raw_device: Option<String>,
    pub vlan_id: Option<u16>,
    /// Set on bond members.
    pub bond_master: Option<String>,
    /// Set on the bond itself; ifenslave expects `none` when members point
    /// back at the master.
    pub bond_slaves: Option<String>,
    /// `bond-*` parameters in document order, carried by the bond and copied
    /// onto its members.
    pub bond_options: Vec<(String, String)>,
    pub bridge_ports: Vec<String>,
    /// Allow-listed `bridge_*` parameters in document order.
    pub bridge_options: Vec<(String, String)>,
}

impl Interface {
    pub fn new(name: impl Into<String>, kind: InterfaceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mac_address: None,
            mtu: None,
            control: Control::Auto,
            subnets: Vec::new(),
            vlan_raw_device: None,
            vlan_id: None,
            bond_master: None,
            bond_slaves: None,
            bond_options: Vec::new(),
            bridge_ports: Vec::new(),
            bridge_options: Vec::new(),
        }
    }

    pub fn bond_option(&self, key: &str) -> Option<&str> {
        lookup(&self.bond_options, key)
    }

    pub fn bridge_option(&self, key: &str) -> Option<&str> {
        lookup(&self.bridge_options, key)
    }

    /// Renderer sort key: type order first, then name.
    pub fn sort_key(&self) -> (InterfaceKind, &str) {
        (self.kind, self.name.as_str())
    }
}

fn lookup<'a>(options: &'a [(String, String)], key: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Global resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Dns {
    pub nameservers: Vec<String>,
    pub search: Vec<String>,
}

impl Dns {
    pub fn is_empty(&self) -> bool {
        self.nameservers.is_empty() && self.search.is_empty()
    }
}

/// Renderer-agnostic network model built from one input document.
///
/// Interfaces keep document order and are unique by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NetworkState {
    interfaces: Vec<Interface>,
    pub routes: Vec<Route>,
    pub dns: Dns,
}

impl NetworkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interfaces in the order they were first declared.
    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|iface| iface.name == name)
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|iface| iface.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.interface(name).is_some()
    }

    /// Return the entry for `name`, inserting a fresh one of `kind` if absent.
    /// An existing entry keeps its position and its fields.
    pub fn entry(&mut self, name: &str, kind: InterfaceKind) -> &mut Interface {
        let idx = match self.interfaces.iter().position(|iface| iface.name == name) {
            Some(idx) => idx,
            None => {
                self.interfaces.push(Interface::new(name, kind));
                self.interfaces.len() - 1
            }
        };
        &mut self.interfaces[idx]
    }

    /// Interfaces ordered physical < bond < bridge < vlan, then by name.
    pub fn sorted_interfaces(&self) -> Vec<&Interface> {
        let mut sorted: Vec<&Interface> = self.interfaces.iter().collect();
        sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        sorted
    }
}

/// Lenient deserializers for YAML scalars that may be written as numbers.
pub(crate) mod scalar {
    use serde::{Deserialize, Deserializer};
    use serde_yaml::Value;

    pub(crate) fn to_text(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(if *b { "on" } else { "off" }.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Sequence(items) => {
                let parts: Vec<String> = items.iter().filter_map(to_text).collect();
                Some(parts.join(" "))
            }
            Value::Mapping(_) | Value::Tagged(_) => None,
        }
    }

    pub(crate) fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(to_text(&value))
    }

    /// Accept a list or a single space-separated string.
    pub(crate) fn list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Sequence(items) => items.iter().filter_map(to_text).collect(),
            other => to_text(&other)
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }
}
