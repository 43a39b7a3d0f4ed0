use colored::Colorize;
use eni_core::{LegacyInterface, LegacyInterfaces};

/// Render parsed interfaces for terminal output.
pub fn render_legacy_text(interfaces: &LegacyInterfaces) -> String {
    let mut out = Vec::new();
    for (name, iface) in interfaces {
        out.push(render_header(name, iface));
        out.extend(render_details(iface).into_iter().map(|line| format!("  {line}")));
    }
    out.push(format!("interfaces={}", interfaces.len()).cyan().to_string());
    out.join("\n")
}

fn render_header(name: &str, iface: &LegacyInterface) -> String {
    let family = iface.family.as_deref().unwrap_or("-");
    let method = match iface.method.as_deref() {
        Some("static") => "static".green().to_string(),
        Some(m) if m.starts_with("dhcp") => m.green().to_string(),
        Some(m) => m.yellow().to_string(),
        None => "-".dimmed().to_string(),
    };
    let control = iface.control.as_deref().unwrap_or("manual");
    format!(
        "{} family={family} method={method} control={control} auto={}",
        name.bold(),
        iface.auto
    )
}

fn render_details(iface: &LegacyInterface) -> Vec<String> {
    let mut lines = vec![format!("source={}", iface.source_path.display())];
    if let Some(hw) = &iface.hwaddress {
        lines.push(format!("hwaddress={hw}"));
    }
    for (key, value) in &iface.options {
        lines.push(format!("{key}={value}"));
    }
    for (phase, commands) in &iface.commands {
        for command in commands {
            lines.push(format!("{phase}: {command}"));
        }
    }
    if let Some(dns) = &iface.dns {
        if !dns.nameservers.is_empty() {
            lines.push(format!("dns-nameservers={}", dns.nameservers.join(" ")));
        }
        if !dns.search.is_empty() {
            lines.push(format!("dns-search={}", dns.search.join(" ")));
        }
    }
    if let Some(bridge) = &iface.bridge {
        lines.push(format!("bridge_ports={}", bridge.ports.join(" ")));
        for (key, value) in &bridge.options {
            lines.push(format!("bridge_{key}={value}"));
        }
    }
    if let Some(bond) = &iface.bond {
        for (key, value) in bond {
            lines.push(format!("bond-{key}={value}"));
        }
    }
    lines
}
