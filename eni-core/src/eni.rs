//! `/etc/network/interfaces` renderer.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::state::{Control, Interface, NetworkState, Route, Subnet, SubnetType};

const INDENT: &str = "    ";
const SOURCE_INTERFACES_D: &str = "source /etc/network/interfaces.d/*.cfg";

/// Control directive for one stanza. `Alias` marks a secondary stanza whose
/// device already has its `auto` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StanzaControl {
    Auto,
    Hotplug,
    Manual,
    Alias,
}

impl From<Control> for StanzaControl {
    fn from(control: Control) -> Self {
        match control {
            Control::Auto => StanzaControl::Auto,
            Control::Hotplug => StanzaControl::Hotplug,
            Control::Manual => StanzaControl::Manual,
        }
    }
}

impl StanzaControl {
    fn directive(self, name: &str) -> String {
        match self {
            StanzaControl::Auto => format!("auto {name}"),
            StanzaControl::Hotplug => format!("allow-hotplug {name}"),
            StanzaControl::Manual => format!("# control-manual {name}"),
            StanzaControl::Alias => format!("# control-alias {name}"),
        }
    }
}

/// Text buffer that never ends up with two consecutive blank lines.
#[derive(Debug, Default)]
struct Buffer {
    text: String,
}

impl Buffer {
    fn line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    fn option(&mut self, key: &str, value: impl std::fmt::Display) {
        let _ = writeln!(self.text, "{INDENT}{key} {value}");
    }

    fn blank_line(&mut self) {
        if !self.text.ends_with("\n\n") {
            self.text.push('\n');
        }
    }
}

/// Render the interfaces file for `state`.
///
/// Loopback and global DNS come first, then every interface ordered
/// physical < bond < bridge < vlan and by name, then global routes.
pub fn render_interfaces(state: &NetworkState) -> String {
    let mut out = Buffer::default();
    out.line("auto lo");
    out.line("iface lo inet loopback");
    if !state.dns.nameservers.is_empty() {
        out.option("dns-nameservers", state.dns.nameservers.join(" "));
    }
    if !state.dns.search.is_empty() {
        out.option("dns-search", state.dns.search.join(" "));
    }

    let mut auto_emitted: HashSet<&str> = HashSet::new();
    for iface in state.sorted_interfaces() {
        out.blank_line();
        if iface.subnets.is_empty() {
            render_unconfigured(&mut out, iface, &mut auto_emitted);
            continue;
        }
        for (index, subnet) in iface.subnets.iter().enumerate() {
            out.blank_line();
            render_subnet_stanza(&mut out, iface, index, subnet, &mut auto_emitted);
        }
    }

    for route in &state.routes {
        for line in render_route(route, "") {
            out.line(&line);
        }
    }

    let mut content = out.text.replace("mac_address", "hwaddress ether");
    if !content.ends_with("\n\n") {
        content.push('\n');
    }
    content.push_str(SOURCE_INTERFACES_D);
    content.push('\n');
    content
}

fn render_subnet_stanza<'a>(
    out: &mut Buffer,
    iface: &'a Interface,
    index: usize,
    subnet: &Subnet,
    auto_emitted: &mut HashSet<&'a str>,
) {
    let mut control: StanzaControl = if index == 0 {
        iface.control.into()
    } else {
        subnet.control.unwrap_or(Control::Auto).into()
    };
    if control == StanzaControl::Auto && !auto_emitted.insert(iface.name.as_str()) {
        control = StanzaControl::Alias;
    }

    let family = if subnet.is_ipv6() { "inet6" } else { "inet" };
    let method = stanza_method(subnet.subnet_type);
    let fullname = if index == 0 {
        iface.name.clone()
    } else {
        format!("{}:{index}", iface.name)
    };

    out.line(&control.directive(&iface.name));
    out.line(&format!("iface {fullname} {family} {method}"));
    render_subnet_options(out, subnet);
    if index == 0 {
        render_interface_options(out, iface);
    }
    for route in &subnet.routes {
        for line in render_route(route, INDENT) {
            out.line(&line);
        }
    }
}

/// An interface with no subnets is declared `manual`; bond members also get
/// an `auto` line since ifenslave needs them brought up.
fn render_unconfigured<'a>(
    out: &mut Buffer,
    iface: &'a Interface,
    auto_emitted: &mut HashSet<&'a str>,
) {
    let bonded = iface.bond_master.is_some() || iface.bond_slaves.is_some();
    if bonded && auto_emitted.insert(iface.name.as_str()) {
        out.line(&format!("auto {}", iface.name));
    }
    out.line(&format!("iface {} inet manual", iface.name));
    render_interface_options(out, iface);
}

fn stanza_method(subnet_type: SubnetType) -> &'static str {
    match subnet_type {
        SubnetType::Static | SubnetType::Static6 => "static",
        SubnetType::Dhcp | SubnetType::Dhcp4 | SubnetType::Dhcp6 => "dhcp",
        SubnetType::Manual => "manual",
    }
}

/// Allow-listed subnet fields, underscores rewritten to hyphens.
fn render_subnet_options(out: &mut Buffer, subnet: &Subnet) {
    let text_fields = [
        ("address", subnet.address.as_deref()),
        ("netmask", subnet.netmask.as_deref()),
        ("broadcast", subnet.broadcast.as_deref()),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            out.option(key, value);
        }
    }
    if let Some(metric) = subnet.metric.filter(|m| *m != 0) {
        out.option("metric", metric);
    }
    let text_fields = [
        ("gateway", subnet.gateway.as_deref()),
        ("pointopoint", subnet.pointopoint.as_deref()),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            out.option(key, value);
        }
    }
    if let Some(mtu) = subnet.mtu.filter(|m| *m != 0) {
        out.option("mtu", mtu);
    }
    if let Some(scope) = subnet.scope.as_deref().filter(|s| !s.is_empty()) {
        out.option("scope", scope);
    }
    if !subnet.dns_search.is_empty() {
        out.option("dns-search", subnet.dns_search.join(" "));
    }
    if !subnet.dns_nameservers.is_empty() {
        out.option("dns-nameservers", subnet.dns_nameservers.join(" "));
    }
}

/// Interface-level attributes. Only the primary stanza carries these; alias
/// stanzas would otherwise repeat them on the same device.
fn render_interface_options(out: &mut Buffer, iface: &Interface) {
    if let Some(mtu) = iface.mtu.filter(|m| *m != 0) {
        out.option("mtu", mtu);
    }
    if iface.kind != crate::state::InterfaceKind::Physical {
        if let Some(mac) = iface.mac_address.as_deref().filter(|m| !m.is_empty()) {
            out.option("mac_address", mac);
        }
    }
    if let Some(raw) = &iface.vlan_raw_device {
        out.option("vlan-raw-device", raw);
    }
    if let Some(id) = iface.vlan_id {
        out.option("vlan_id", id);
    }
    if let Some(master) = &iface.bond_master {
        out.option("bond-master", master);
    }
    for (key, value) in &iface.bond_options {
        if !value.is_empty() {
            out.option(key, value);
        }
    }
    if let Some(slaves) = &iface.bond_slaves {
        out.option("bond-slaves", slaves);
    }
    if !iface.bridge_ports.is_empty() {
        out.option("bridge_ports", iface.bridge_ports.join(" "));
    }
    for (key, value) in &iface.bridge_options {
        if !value.is_empty() {
            out.option(key, value);
        }
    }
}

/// Render the `post-up`/`pre-down` pair for a route.
///
/// Every line ends in `|| true` so ifup/ifdown keep going when the route is
/// already present or already gone.
pub fn render_route(route: &Route, indent: &str) -> [String; 2] {
    let up = format!("{indent}post-up route add");
    let down = format!("{indent}pre-down route del");
    let or_true = " || true";
    let gateway = match route.gateway.as_deref() {
        Some(gw) if !gw.is_empty() => format!(" gw {gw}"),
        _ => String::new(),
    };

    let tail = if route.is_ipv4_default() {
        format!(" default{gateway}")
    } else if route.is_ipv6_default() {
        format!(" -A inet6 default{gateway}")
    } else {
        let mut tail = String::new();
        let fields = [
            ("-net", route.network.clone()),
            ("netmask", route.netmask.clone()),
            ("gw", route.gateway.clone()),
            ("metric", route.metric.map(|m| m.to_string())),
        ];
        for (flag, value) in fields {
            if let Some(value) = value {
                let _ = write!(tail, " {flag} {value}");
            }
        }
        tail
    };

    [
        format!("{up}{tail}{or_true}"),
        format!("{down}{tail}{or_true}"),
    ]
}
