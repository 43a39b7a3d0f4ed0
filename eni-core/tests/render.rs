use std::fs;
use std::path::PathBuf;

use eni_core::{render_interfaces, render_persistent_net, schema, NetworkState};
use pretty_assertions::assert_eq;
use serde_yaml::Value;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn load_state(path: &str) -> NetworkState {
    let raw = fs::read_to_string(fixture(path)).expect("fixture read");
    let doc: Value = serde_yaml::from_str(&raw).expect("fixture yaml");
    schema::parse(&doc["network"])
        .expect("parse should succeed")
        .expect("network state")
}

#[test]
fn bond_renders_master_and_manual_slaves() {
    let state = load_state("fixtures/bond.yaml");
    let expected = "\
auto lo
iface lo inet loopback

auto eth0
iface eth0 inet manual
    bond-master bond0
    bond-mode 802.3ad
    bond-miimon 100

auto eth1
iface eth1 inet manual
    bond-master bond0
    bond-mode 802.3ad
    bond-miimon 100

auto bond0
iface bond0 inet static
    address 192.168.0.10
    netmask 255.255.255.0
    gateway 192.168.0.1
    bond-mode 802.3ad
    bond-miimon 100
    bond-slaves none

source /etc/network/interfaces.d/*.cfg
";
    assert_eq!(render_interfaces(&state), expected);
}

#[test]
fn mixed_document_renders_in_type_order() {
    let state = load_state("fixtures/multi.yaml");
    let expected = "\
auto lo
iface lo inet loopback
    dns-nameservers 8.8.8.8
    dns-search corp.example

auto eth0
iface eth0 inet static
    address 10.0.0.5
    netmask 255.255.255.0
    gateway 10.0.0.1
    dns-search example.com
    dns-nameservers 10.0.0.2
    mtu 1500
    post-up route add -net 172.16.0.0 netmask 255.240.0.0 gw 10.0.0.254 || true
    pre-down route del -net 172.16.0.0 netmask 255.240.0.0 gw 10.0.0.254 || true

# control-alias eth0
iface eth0:1 inet6 static
    address 2001:db8::5/64

# control-alias eth0
iface eth0:2 inet6 dhcp

iface eth1 inet manual

auto br0
iface br0 inet dhcp
    bridge_ports eth1
    bridge_stp off
    bridge_fd 0

auto eth0.101
iface eth0.101 inet static
    address 10.101.0.5
    netmask 255.255.255.0
    hwaddress ether 52:54:00:AB:CD:EF
    vlan-raw-device eth0
    vlan_id 101
post-up route add default gw 10.0.0.1 || true
pre-down route del default gw 10.0.0.1 || true

source /etc/network/interfaces.d/*.cfg
";
    assert_eq!(render_interfaces(&state), expected);
}

#[test]
fn rendering_is_deterministic() {
    let state = load_state("fixtures/multi.yaml");
    let first = render_interfaces(&state);
    for _ in 0..5 {
        assert_eq!(render_interfaces(&state), first);
    }
    assert_eq!(render_persistent_net(&state), render_persistent_net(&state));
}

#[test]
fn exactly_one_auto_line_per_interface() {
    let state = load_state("fixtures/multi.yaml");
    let text = render_interfaces(&state);
    assert_eq!(text.lines().filter(|l| *l == "auto eth0").count(), 1);
    assert_eq!(text.lines().filter(|l| *l == "auto eth0.101").count(), 1);
}

#[test]
fn no_consecutive_blank_lines() {
    for path in ["fixtures/bond.yaml", "fixtures/multi.yaml"] {
        let text = render_interfaces(&load_state(path));
        assert!(!text.contains("\n\n\n"), "{path} has a double blank line");
    }
}

#[test]
fn static_subnet_with_ipv6_address_uses_inet6() {
    let state = schema::parse_str(
        "version: 1\nconfig:\n  - type: physical\n    name: eth0\n    subnets:\n      - type: static\n        address: 'fd00::10'\n",
    )
    .expect("parse")
    .expect("state");
    let text = render_interfaces(&state);
    assert!(text.contains("iface eth0 inet6 static\n"), "{text}");
}

#[test]
fn binding_rules_follow_declaration_order() {
    let state = load_state("fixtures/bond.yaml");
    let expected = "\
# Autogenerated by curtin-net
SUBSYSTEM==\"net\", ACTION==\"add\", DRIVERS==\"?*\", ATTR{address}==\"52:54:00:12:34:00\", NAME=\"eth0\"
SUBSYSTEM==\"net\", ACTION==\"add\", DRIVERS==\"?*\", ATTR{address}==\"52:54:00:12:34:02\", NAME=\"eth1\"
";
    assert_eq!(render_persistent_net(&state), expected);
}

#[test]
fn vlan_mac_is_lowercased_only_in_rules() {
    let state = load_state("fixtures/multi.yaml");
    let rules = render_persistent_net(&state);
    assert!(rules.contains("ATTR{address}==\"52:54:00:ab:cd:ef\", NAME=\"eth0\""));
    assert!(!rules.contains("eth0.101"));
}

fn render_yaml(yaml: &str) -> String {
    let state = schema::parse_str(yaml).expect("parse").expect("state");
    render_interfaces(&state)
}

#[test]
fn hotplug_control_renders_allow_hotplug() {
    let text = render_yaml(
        "version: 1\nconfig:\n  - type: physical\n    name: eth0\n    subnets:\n      - type: dhcp\n        control: hotplug\n",
    );
    assert!(text.contains("allow-hotplug eth0\niface eth0 inet dhcp\n"), "{text}");
    assert!(!text.contains("auto eth0"), "{text}");
}

#[test]
fn manual_control_renders_marker_comment() {
    let text = render_yaml(
        "version: 1\nconfig:\n  - type: physical\n    name: eth0\n    subnets:\n      - type: dhcp\n        control: manual\n",
    );
    assert!(text.contains("# control-manual eth0\niface eth0 inet dhcp\n"), "{text}");
    assert!(!text.contains("auto eth0"), "{text}");
}

#[test]
fn static6_subnet_renders_inet6_static() {
    let text = render_yaml(
        "version: 1\nconfig:\n  - type: physical\n    name: eth0\n    subnets:\n      - type: static6\n        address: '2001:db8::5/64'\n",
    );
    assert!(text.contains("auto eth0\niface eth0 inet6 static\n"), "{text}");
    assert!(!text.contains("iface eth0 inet static"), "{text}");
}

#[test]
fn hotplug_primary_leaves_auto_to_alias() {
    let text = render_yaml(
        "version: 1\nconfig:\n  - type: physical\n    name: eth0\n    subnets:\n      - type: dhcp\n        control: hotplug\n      - type: static\n        address: 10.0.0.3\n        netmask: 255.255.255.0\n",
    );
    assert!(text.contains("allow-hotplug eth0\niface eth0 inet dhcp\n"), "{text}");
    assert!(text.contains("auto eth0\niface eth0:1 inet static\n"), "{text}");
    assert_eq!(text.lines().filter(|line| *line == "auto eth0").count(), 1);
}
