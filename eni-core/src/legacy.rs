//! Reader for the ifupdown `interfaces(5)` dialect.
//!
//! Records are keyed by interface name and carry the file they were first
//! seen in. `source` and `source-directory` are followed recursively.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Single-value options copied verbatim into [`LegacyInterface::options`].
pub const NET_CONFIG_OPTIONS: &[&str] = &[
    "address",
    "netmask",
    "broadcast",
    "network",
    "metric",
    "gateway",
    "pointtopoint",
    "media",
    "mtu",
    "hostname",
    "leasehours",
    "leasetime",
    "vendor",
    "client",
    "bootfile",
    "server",
    "hwaddr",
    "provider",
    "frame",
    "netnum",
    "endpoint",
    "local",
    "ttl",
];

/// Hook directives; repeated lines accumulate.
pub const NET_CONFIG_COMMANDS: &[&str] = &["pre-up", "up", "post-up", "down", "pre-down", "post-down"];

/// Bridge options stored without their `bridge_` prefix.
pub const NET_CONFIG_BRIDGE_OPTIONS: &[&str] = &[
    "bridge_ageing",
    "bridge_bridgeprio",
    "bridge_fd",
    "bridge_gcinit",
    "bridge_hello",
    "bridge_maxage",
    "bridge_maxwait",
    "bridge_stp",
];

/// Errors raised while reading an interfaces file.
#[derive(Debug, Error)]
pub enum LegacyParseError {
    /// An option line appeared before any `iface` line.
    #[error("{path}:{line}: '{directive}' appears before any iface stanza")]
    NoCurrentInterface {
        directive: String,
        path: String,
        line: usize,
    },
    /// A directive is missing its argument(s).
    #[error("{path}:{line}: '{directive}' is missing an argument")]
    MissingArgument {
        directive: String,
        path: String,
        line: usize,
    },
    /// An included file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// A `source` chain leads back to a file that is still being read.
    #[error("{path} is sourced from within itself")]
    SourceCycle { path: String },
    /// A `source` pattern is not a valid glob.
    #[error("invalid include pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyDns {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyBridge {
    /// Known `bridge_*` options with the prefix stripped (`stp`, `fd`, ...).
    pub options: BTreeMap<String, String>,
    pub ports: Vec<String>,
    pub mac: Option<String>,
    pub pathcost: BTreeMap<String, String>,
    pub portprio: BTreeMap<String, String>,
}

/// One interface as described by an interfaces file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyInterface {
    /// File that first mentioned this interface.
    pub source_path: PathBuf,
    pub auto: bool,
    /// `auto`, an `allow-<class>` class, or `manual` when neither was given.
    pub control: Option<String>,
    pub family: Option<String>,
    pub method: Option<String>,
    pub hwaddress: Option<String>,
    pub options: BTreeMap<String, String>,
    pub commands: BTreeMap<String, Vec<String>>,
    pub dns: Option<LegacyDns>,
    pub bridge: Option<LegacyBridge>,
    pub bond: Option<BTreeMap<String, String>>,
}

impl LegacyInterface {
    fn new(source_path: &Path) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            auto: false,
            control: None,
            family: None,
            method: None,
            hwaddress: None,
            options: BTreeMap::new(),
            commands: BTreeMap::new(),
            dns: None,
            bridge: None,
            bond: None,
        }
    }
}

static FRAGMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z0-9_-]+$").unwrap());

pub type LegacyInterfaces = BTreeMap<String, LegacyInterface>;

/// Parse an interfaces file from disk.
pub fn parse_file(path: &Path) -> Result<LegacyInterfaces, LegacyParseError> {
    let abs = absolute(path);
    let contents = read(&abs)?;
    let dir = abs.parent().map(Path::to_path_buf).unwrap_or_default();
    parse(&contents, &dir, &abs)
}

/// Parse interfaces text. `source_dir` resolves relative includes and
/// `source_path` is recorded on every interface first seen in `contents`.
pub fn parse(
    contents: &str,
    source_dir: &Path,
    source_path: &Path,
) -> Result<LegacyInterfaces, LegacyParseError> {
    let mut ifaces = LegacyInterfaces::new();
    let mut reading = vec![canonical(source_path)];
    parse_into(&mut ifaces, &mut reading, contents, source_dir, source_path)?;
    for iface in ifaces.values_mut() {
        if iface.control.is_none() {
            iface.control = Some("manual".to_string());
        }
    }
    Ok(ifaces)
}

fn parse_into(
    ifaces: &mut LegacyInterfaces,
    reading: &mut Vec<PathBuf>,
    contents: &str,
    source_dir: &Path,
    source_path: &Path,
) -> Result<(), LegacyParseError> {
    let mut current: Option<String> = None;

    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let option = fields[0];
        let args = &fields[1..];
        let at = Location {
            directive: option,
            path: source_path,
            line: idx + 1,
        };

        match option {
            "source-directory" => {
                let pattern = resolve(source_dir, at.arg(args, 0)?);
                for dir in expand(&pattern)? {
                    for entry in directory_fragments(&dir)? {
                        include(ifaces, reading, &entry)?;
                    }
                }
            }
            "source" => {
                let pattern = resolve(source_dir, at.arg(args, 0)?);
                for path in expand(&pattern)? {
                    include(ifaces, reading, &path)?;
                }
            }
            "auto" => {
                for name in args {
                    let iface = record(ifaces, name, source_path);
                    iface.auto = true;
                    iface.control = Some("auto".to_string());
                }
            }
            _ if option.starts_with("allow-") => {
                let class = &option["allow-".len()..];
                for name in args {
                    let iface = record(ifaces, name, source_path);
                    iface.auto = false;
                    iface.control = Some(class.to_string());
                }
            }
            "mapping" => {
                // `script` and `map` lines that follow belong to the mapping.
                log::debug!("{}:{}: skipping mapping stanza", source_path.display(), idx + 1);
                current = None;
            }
            "iface" => {
                if args.len() < 3 {
                    return Err(at.missing());
                }
                let iface = record(ifaces, args[0], source_path);
                // Repeated stanzas for the same name are merged.
                iface.family = Some(args[1].to_string());
                iface.method = Some(args[2].to_string());
                current = Some(args[0].to_string());
            }
            _ if current.is_none() && !attaches_to_interface(option) => {
                log::debug!("{}:{}: skipping '{option}'", source_path.display(), idx + 1);
            }
            _ => {
                let iface = at.current(ifaces, current.as_deref())?;
                apply_option(iface, &at, args)?;
            }
        }
    }
    Ok(())
}

/// Directives that only make sense inside an `iface` stanza.
fn attaches_to_interface(option: &str) -> bool {
    option == "hwaddress"
        || NET_CONFIG_OPTIONS.contains(&option)
        || NET_CONFIG_COMMANDS.contains(&option)
        || option.starts_with("dns-")
        || option.starts_with("bridge_")
        || option.starts_with("bond-")
}

fn apply_option(
    iface: &mut LegacyInterface,
    at: &Location<'_>,
    args: &[&str],
) -> Result<(), LegacyParseError> {
    let option = at.directive;
    if option == "hwaddress" {
        let mac = match args {
            ["ether", mac, ..] => *mac,
            [mac, ..] => *mac,
            [] => return Err(at.missing()),
        };
        iface.hwaddress = Some(mac.to_string());
    } else if NET_CONFIG_OPTIONS.contains(&option) {
        iface
            .options
            .insert(option.to_string(), at.arg(args, 0)?.to_string());
    } else if NET_CONFIG_COMMANDS.contains(&option) {
        iface
            .commands
            .entry(option.to_string())
            .or_default()
            .push(args.join(" "));
    } else if let Some(dns_option) = option.strip_prefix("dns-") {
        let dns = iface.dns.get_or_insert_with(LegacyDns::default);
        let values = args.iter().map(|s| s.to_string()).collect();
        match dns_option {
            "search" => dns.search = values,
            "nameservers" => dns.nameservers = values,
            _ => {}
        }
    } else if option.starts_with("bridge_") {
        let bridge = iface.bridge.get_or_insert_with(LegacyBridge::default);
        if NET_CONFIG_BRIDGE_OPTIONS.contains(&option) {
            bridge.options.insert(
                option["bridge_".len()..].to_string(),
                at.arg(args, 0)?.to_string(),
            );
        } else {
            match (option, args) {
                ("bridge_ports", ports) => {
                    bridge.ports = ports.iter().map(|s| s.to_string()).collect();
                }
                ("bridge_hw", [kind, mac, ..]) if kind.eq_ignore_ascii_case("mac") => {
                    bridge.mac = Some(mac.to_string());
                }
                ("bridge_pathcost", [port, cost, ..]) => {
                    bridge.pathcost.insert(port.to_string(), cost.to_string());
                }
                ("bridge_portprio", [port, prio, ..]) => {
                    bridge.portprio.insert(port.to_string(), prio.to_string());
                }
                _ => {}
            }
        }
    } else if let Some(bond_option) = option.strip_prefix("bond-") {
        iface
            .bond
            .get_or_insert_with(BTreeMap::new)
            .insert(bond_option.to_string(), at.arg(args, 0)?.to_string());
    }
    Ok(())
}

struct Location<'a> {
    directive: &'a str,
    path: &'a Path,
    line: usize,
}

impl Location<'_> {
    fn missing(&self) -> LegacyParseError {
        LegacyParseError::MissingArgument {
            directive: self.directive.to_string(),
            path: self.path.display().to_string(),
            line: self.line,
        }
    }

    fn arg<'b>(&self, args: &[&'b str], idx: usize) -> Result<&'b str, LegacyParseError> {
        args.get(idx).copied().ok_or_else(|| self.missing())
    }

    fn current<'m>(
        &self,
        ifaces: &'m mut LegacyInterfaces,
        current: Option<&str>,
    ) -> Result<&'m mut LegacyInterface, LegacyParseError> {
        current
            .and_then(|name| ifaces.get_mut(name))
            .ok_or_else(|| LegacyParseError::NoCurrentInterface {
                directive: self.directive.to_string(),
                path: self.path.display().to_string(),
                line: self.line,
            })
    }
}

fn record<'m>(
    ifaces: &'m mut LegacyInterfaces,
    name: &str,
    source_path: &Path,
) -> &'m mut LegacyInterface {
    ifaces
        .entry(name.to_string())
        .or_insert_with(|| LegacyInterface::new(source_path))
}

fn include(
    ifaces: &mut LegacyInterfaces,
    reading: &mut Vec<PathBuf>,
    path: &Path,
) -> Result<(), LegacyParseError> {
    let abs = absolute(path);
    let key = canonical(&abs);
    if reading.contains(&key) {
        return Err(LegacyParseError::SourceCycle {
            path: abs.display().to_string(),
        });
    }
    let contents = read(&abs)?;
    let dir = abs.parent().map(Path::to_path_buf).unwrap_or_default();
    reading.push(key);
    let result = parse_into(ifaces, reading, &contents, &dir, &abs);
    reading.pop();
    result
}

fn resolve(source_dir: &Path, target: &str) -> String {
    if target.starts_with('/') {
        target.to_string()
    } else {
        source_dir.join(target).display().to_string()
    }
}

fn expand(pattern: &str) -> Result<Vec<PathBuf>, LegacyParseError> {
    let paths = glob::glob(pattern).map_err(|source| LegacyParseError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    // Unreadable matches are skipped, as the shell glob would.
    Ok(paths.filter_map(Result::ok).collect())
}

/// Regular files in `dir` whose names ifupdown accepts in a source-directory.
fn directory_fragments(dir: &Path) -> Result<Vec<PathBuf>, LegacyParseError> {
    let entries = fs::read_dir(dir).map_err(|source| LegacyParseError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let mut out: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| FRAGMENT_NAME.is_match(name))
        })
        .collect();
    out.sort();
    Ok(out)
}

fn read(path: &Path) -> Result<String, LegacyParseError> {
    let contents = fs::read_to_string(path).map_err(|source| LegacyParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(contents.trim().to_string())
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| absolute(path))
}
