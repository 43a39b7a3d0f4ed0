//! Persistent interface naming rules for udev.

use crate::state::{InterfaceKind, NetworkState};

pub const RULES_HEADER: &str = "# Autogenerated by curtin-net";

/// `KEY=="value"`
fn equality(key: &str, value: &str) -> String {
    debug_assert_eq!(key, key.to_uppercase());
    format!("{key}==\"{value}\"")
}

/// `ATTR{attr}=="value"`
fn attr_equality(attribute: &str, value: &str) -> String {
    debug_assert_eq!(attribute, attribute.to_lowercase());
    format!("ATTR{{{attribute}}}==\"{value}\"")
}

/// `KEY="value"`
fn setting(key: &str, value: &str) -> String {
    debug_assert_eq!(key, key.to_uppercase());
    format!("{key}=\"{value}\"")
}

/// A single rule line naming the device that has `mac` as `interface`.
pub fn generate_rule(interface: &str, mac: &str) -> String {
    [
        equality("SUBSYSTEM", "net"),
        equality("ACTION", "add"),
        equality("DRIVERS", "?*"),
        attr_equality("address", mac),
        setting("NAME", interface),
    ]
    .join(", ")
}

/// Rules for every physical interface with a full-length MAC, in declaration
/// order. MACs are lowercased.
pub fn render_persistent_net(state: &NetworkState) -> String {
    let mut content = format!("{RULES_HEADER}\n");
    for iface in state.interfaces() {
        if iface.kind != InterfaceKind::Physical || iface.name.is_empty() {
            continue;
        }
        let Some(mac) = iface.mac_address.as_deref() else {
            continue;
        };
        // aa:bb:cc:dd:ee:ff
        if mac.len() != 17 {
            continue;
        }
        content.push_str(&generate_rule(&iface.name, &mac.to_lowercase()));
        content.push('\n');
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_format_is_exact() {
        assert_eq!(
            generate_rule("eth0", "aa:bb:cc:dd:ee:ff"),
            r#"SUBSYSTEM=="net", ACTION=="add", DRIVERS=="?*", ATTR{address}=="aa:bb:cc:dd:ee:ff", NAME="eth0""#
        );
    }

    #[test]
    fn only_physical_interfaces_with_full_mac() {
        let mut state = NetworkState::new();
        state.entry("eth0", InterfaceKind::Physical).mac_address =
            Some("AA:BB:CC:DD:EE:01".to_string());
        state.entry("eth1", InterfaceKind::Physical).mac_address = Some("aa:bb".to_string());
        state.entry("eth2", InterfaceKind::Physical);
        state.entry("bond0", InterfaceKind::Bond).mac_address =
            Some("aa:bb:cc:dd:ee:02".to_string());

        let rules = render_persistent_net(&state);
        let lines: Vec<&str> = rules.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], RULES_HEADER);
        assert!(lines[1].contains(r#"ATTR{address}=="aa:bb:cc:dd:ee:01""#));
        assert!(lines[1].ends_with(r#"NAME="eth0""#));
    }
}
