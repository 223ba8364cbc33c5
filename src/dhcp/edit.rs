//! Structured edits over a parsed config document.
//!
//! Subnets and host reservations are projections over top-level blocks; a
//! mutation consumes the document and returns the edited value, leaving
//! every untouched span byte-identical. Subnet identity is network+netmask:
//! re-keying a subnet is an explicit remove + add.

use crate::dhcp::grammar::{Block, ConfigDocument, Directive, Item};
use crate::error::Error;
use ipnetwork::Ipv4Network;
use serde::Deserialize;
use std::net::Ipv4Addr;

/// A new subnet declaration. Field set mirrors the directives the service
/// understands: address pool range, router and DNS options, lease times.
#[derive(Debug, Clone, Deserialize)]
pub struct SubnetSpec {
    pub network: String,
    pub netmask: String,
    #[serde(default)]
    pub range_start: Option<String>,
    #[serde(default)]
    pub range_end: Option<String>,
    #[serde(default)]
    pub routers: Option<String>,
    #[serde(default)]
    pub domain_name_servers: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default = "SubnetSpec::default_lease")]
    pub default_lease_time: u64,
    #[serde(default = "SubnetSpec::default_max_lease")]
    pub max_lease_time: u64,
}

impl SubnetSpec {
    fn default_lease() -> u64 {
        86_400
    }

    fn default_max_lease() -> u64 {
        172_800
    }
}

/// A partial subnet edit; only present fields are rewritten.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubnetPatch {
    #[serde(default)]
    pub range: Option<(String, String)>,
    #[serde(default)]
    pub routers: Option<String>,
    #[serde(default)]
    pub domain_name_servers: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub default_lease_time: Option<u64>,
    #[serde(default)]
    pub max_lease_time: Option<u64>,
}

/// A new static reservation.
#[derive(Debug, Clone, Deserialize)]
pub struct HostSpec {
    pub hostname: String,
    pub mac: String,
    pub ip: String,
}

/// Read-only view over a `subnet` block.
#[derive(Debug, Clone, Copy)]
pub struct SubnetView<'a> {
    block: &'a Block,
}

impl<'a> SubnetView<'a> {
    #[must_use]
    pub fn network(&self) -> Option<&'a str> {
        self.block.name().split_whitespace().next()
    }

    #[must_use]
    pub fn netmask(&self) -> Option<&'a str> {
        self.block.name().split_whitespace().nth(2)
    }

    #[must_use]
    pub fn range(&self) -> Option<(&'a str, &'a str)> {
        let d = self.block.directive(&["range"])?;
        Some((d.arg(0)?, d.arg(1)?))
    }

    #[must_use]
    pub fn routers(&self) -> Option<&'a str> {
        self.block.directive(&["option", "routers"])?.arg(1)
    }

    #[must_use]
    pub fn domain_name_servers(&self) -> Option<&'a str> {
        self.block
            .directive(&["option", "domain-name-servers"])?
            .arg(1)
    }

    #[must_use]
    pub fn domain_name(&self) -> Option<&'a str> {
        let raw = self.block.directive(&["option", "domain-name"])?.arg(1)?;
        Some(unquote(raw))
    }

    #[must_use]
    pub fn default_lease_time(&self) -> Option<u64> {
        self.block
            .directive(&["default-lease-time"])?
            .arg(0)?
            .parse()
            .ok()
    }

    #[must_use]
    pub fn max_lease_time(&self) -> Option<u64> {
        self.block
            .directive(&["max-lease-time"])?
            .arg(0)?
            .parse()
            .ok()
    }
}

/// Read-only view over a `host` block.
#[derive(Debug, Clone, Copy)]
pub struct HostView<'a> {
    block: &'a Block,
}

impl<'a> HostView<'a> {
    #[must_use]
    pub fn hostname(&self) -> &'a str {
        self.block.name()
    }

    #[must_use]
    pub fn mac(&self) -> Option<&'a str> {
        self.block.directive(&["hardware", "ethernet"])?.arg(1)
    }

    #[must_use]
    pub fn fixed_address(&self) -> Option<&'a str> {
        self.block.directive(&["fixed-address"])?.arg(0)
    }
}

/// Subnet views over the document's top-level `subnet` blocks.
#[must_use]
pub fn subnets(doc: &ConfigDocument) -> Vec<SubnetView<'_>> {
    doc.blocks("subnet").map(|block| SubnetView { block }).collect()
}

/// Host views over the document's top-level `host` blocks.
#[must_use]
pub fn hosts(doc: &ConfigDocument) -> Vec<HostView<'_>> {
    doc.blocks("host").map(|block| HostView { block }).collect()
}

/// Add a subnet block. Placed after the last existing top-level `subnet`
/// block to keep related blocks grouped, else appended at the end.
///
/// # Errors
///
/// Returns [`Error::DuplicateBlock`] when a subnet with the same
/// network+netmask identity exists, [`Error::InvalidAddress`] /
/// [`Error::InvalidNetwork`] for malformed addresses.
pub fn add_subnet(doc: &ConfigDocument, spec: &SubnetSpec) -> Result<ConfigDocument, Error> {
    let identity = parse_network(&spec.network, &spec.netmask)?;
    for existing in subnets(doc) {
        if let (Some(network), Some(netmask)) = (existing.network(), existing.netmask()) {
            if parse_network(network, netmask).ok() == Some(identity) {
                return Err(Error::DuplicateBlock {
                    keyword: "subnet".to_string(),
                    name: format!("{} netmask {}", spec.network, spec.netmask),
                });
            }
        }
    }
    let block = subnet_block(spec)?;
    let mut doc = doc.clone();
    insert_grouped(&mut doc, "subnet", block);
    Ok(doc)
}

/// Rewrite only the directives named in `patch` inside the identified
/// subnet; everything else in the block keeps its original bytes.
///
/// # Errors
///
/// Returns [`Error::BlockNotFound`] when no subnet matches the identity.
pub fn update_subnet(
    doc: &ConfigDocument,
    network: &str,
    netmask: &str,
    patch: &SubnetPatch,
) -> Result<ConfigDocument, Error> {
    let identity = parse_network(network, netmask)?;
    let position = doc.items().iter().position(|item| {
        matches!(item, Item::Block(b) if b.keyword() == "subnet"
            && subnet_identity(b).ok() == Some(identity))
    });
    let Some(position) = position else {
        return Err(Error::BlockNotFound {
            keyword: "subnet".to_string(),
            name: format!("{network} netmask {netmask}"),
        });
    };
    let mut doc = doc.clone();
    let Item::Block(block) = &mut doc.items_mut()[position] else {
        unreachable!("position selects a block");
    };
    if let Some((start, end)) = &patch.range {
        parse_addr(start)?;
        parse_addr(end)?;
        block.set_directive(&["range"], Directive::new("range", [start, end]));
    }
    if let Some(routers) = &patch.routers {
        parse_addr(routers)?;
        block.set_directive(
            &["option", "routers"],
            Directive::new("option", ["routers", routers]),
        );
    }
    if let Some(servers) = &patch.domain_name_servers {
        block.set_directive(
            &["option", "domain-name-servers"],
            Directive::new("option", ["domain-name-servers", servers]),
        );
    }
    if let Some(domain) = &patch.domain_name {
        block.set_directive(
            &["option", "domain-name"],
            Directive::new("option", ["domain-name".to_string(), quote(domain)]),
        );
    }
    if let Some(seconds) = patch.default_lease_time {
        block.set_directive(
            &["default-lease-time"],
            Directive::new("default-lease-time", [seconds.to_string()]),
        );
    }
    if let Some(seconds) = patch.max_lease_time {
        block.set_directive(
            &["max-lease-time"],
            Directive::new("max-lease-time", [seconds.to_string()]),
        );
    }
    Ok(doc)
}

/// Remove the identified subnet block (and a single-line `#` comment label
/// directly above it, when one exists).
///
/// # Errors
///
/// Returns [`Error::BlockNotFound`] when no subnet matches; the input
/// document is untouched.
pub fn remove_subnet(
    doc: &ConfigDocument,
    network: &str,
    netmask: &str,
) -> Result<ConfigDocument, Error> {
    let identity = parse_network(network, netmask)?;
    remove_block(doc, "subnet", &format!("{network} netmask {netmask}"), |b| {
        subnet_identity(b).ok() == Some(identity)
    })
}

/// Add a host reservation block after the last existing `host` block.
///
/// # Errors
///
/// Returns [`Error::DuplicateBlock`] for an existing hostname and
/// [`Error::InvalidAddress`] for a malformed fixed address.
pub fn add_host(doc: &ConfigDocument, spec: &HostSpec) -> Result<ConfigDocument, Error> {
    parse_addr(&spec.ip)?;
    if doc.blocks("host").any(|b| b.name() == spec.hostname) {
        return Err(Error::DuplicateBlock {
            keyword: "host".to_string(),
            name: spec.hostname.clone(),
        });
    }
    let mut block = Block::new("host", &spec.hostname);
    block.push(Item::Directive(Directive::new(
        "hardware",
        ["ethernet", spec.mac.as_str()],
    )));
    block.push(Item::Directive(Directive::new(
        "fixed-address",
        [spec.ip.as_str()],
    )));
    let mut doc = doc.clone();
    insert_grouped(&mut doc, "host", block);
    Ok(doc)
}

/// Remove the host block with the given name (and its single-line comment
/// label, when present).
///
/// # Errors
///
/// Returns [`Error::BlockNotFound`] when the host isn't declared.
pub fn remove_host(doc: &ConfigDocument, hostname: &str) -> Result<ConfigDocument, Error> {
    remove_block(doc, "host", hostname, |b| b.name() == hostname)
}

fn remove_block(
    doc: &ConfigDocument,
    keyword: &str,
    name: &str,
    matches: impl Fn(&Block) -> bool,
) -> Result<ConfigDocument, Error> {
    let position = doc
        .items()
        .iter()
        .position(|item| matches!(item, Item::Block(b) if b.keyword() == keyword && matches(b)));
    let Some(position) = position else {
        return Err(Error::BlockNotFound {
            keyword: keyword.to_string(),
            name: name.to_string(),
        });
    };
    let mut doc = doc.clone();
    doc.items_mut().remove(position);
    // Best effort: drop a directly preceding comment that reads as a label.
    // Anything other than a single comment line is ambiguous and stays.
    let take_label = position > 0
        && matches!(&doc.items()[position - 1], Item::Opaque(raw) if is_single_comment_line(raw));
    if take_label {
        doc.items_mut().remove(position - 1);
    }
    Ok(doc)
}

fn is_single_comment_line(raw: &str) -> bool {
    let body = raw.trim();
    body.starts_with('#') && !body.contains('\n')
}

/// Insert a top-level block after the last block with the same keyword;
/// otherwise append at the end of the document (before a trailing
/// whitespace-only span, so a final newline stays final).
fn insert_grouped(doc: &mut ConfigDocument, keyword: &str, block: Block) {
    let items = doc.items_mut();
    let after_last = items
        .iter()
        .rposition(|item| matches!(item, Item::Block(b) if b.keyword() == keyword))
        .map(|i| i + 1);
    let position = after_last.unwrap_or_else(|| {
        match items.last() {
            Some(Item::Opaque(raw)) if raw.chars().all(char::is_whitespace) => items.len() - 1,
            _ => items.len(),
        }
    });
    items.insert(position, Item::Block(block));
}

fn subnet_block(spec: &SubnetSpec) -> Result<Block, Error> {
    let mut block = Block::new("subnet", &format!("{} netmask {}", spec.network, spec.netmask));
    match (&spec.range_start, &spec.range_end) {
        (Some(start), Some(end)) => {
            parse_addr(start)?;
            parse_addr(end)?;
            block.push(Item::Directive(Directive::new("range", [start, end])));
        }
        (None, None) => {}
        _ => {
            return Err(Error::InvalidAddress(
                "range requires both a start and an end address".to_string(),
            ))
        }
    }
    if let Some(routers) = &spec.routers {
        parse_addr(routers)?;
        block.push(Item::Directive(Directive::new(
            "option",
            ["routers", routers.as_str()],
        )));
    }
    if let Some(servers) = &spec.domain_name_servers {
        block.push(Item::Directive(Directive::new(
            "option",
            ["domain-name-servers", servers.as_str()],
        )));
    }
    if let Some(domain) = &spec.domain_name {
        block.push(Item::Directive(Directive::new(
            "option",
            ["domain-name".to_string(), quote(domain)],
        )));
    }
    block.push(Item::Directive(Directive::new(
        "default-lease-time",
        [spec.default_lease_time.to_string()],
    )));
    block.push(Item::Directive(Directive::new(
        "max-lease-time",
        [spec.max_lease_time.to_string()],
    )));
    Ok(block)
}

fn subnet_identity(block: &Block) -> Result<Ipv4Network, Error> {
    let view = SubnetView { block };
    let network = view
        .network()
        .ok_or_else(|| Error::InvalidAddress(block.name().to_string()))?;
    let netmask = view
        .netmask()
        .ok_or_else(|| Error::InvalidAddress(block.name().to_string()))?;
    parse_network(network, netmask)
}

fn parse_network(network: &str, netmask: &str) -> Result<Ipv4Network, Error> {
    Ok(Ipv4Network::with_netmask(
        parse_addr(network)?,
        parse_addr(netmask)?,
    )?)
}

fn parse_addr(s: &str) -> Result<Ipv4Addr, Error> {
    s.parse()
        .map_err(|_| Error::InvalidAddress(s.to_string()))
}

fn quote(s: &str) -> String {
    format!("\"{s}\"")
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "\
# global options
default-lease-time 600;

subnet 192.168.1.0 netmask 255.255.255.0 {
    range 192.168.1.100 192.168.1.200;
    option routers 192.168.1.1;
}

# office printer
host printer-01 {
    hardware ethernet 00:11:22:33:44:55;
    fixed-address 192.168.1.50;
}
";

    fn parse(text: &str) -> ConfigDocument {
        ConfigDocument::parse(text).unwrap()
    }

    #[test]
    fn partial_update_touches_only_named_fields() {
        let doc = parse(BASE);
        let patch = SubnetPatch {
            range: Some(("192.168.1.110".to_string(), "192.168.1.150".to_string())),
            ..SubnetPatch::default()
        };
        let updated = update_subnet(&doc, "192.168.1.0", "255.255.255.0", &patch).unwrap();
        let expected = BASE.replace(
            "    range 192.168.1.100 192.168.1.200;",
            "    range 192.168.1.110 192.168.1.150;",
        );
        assert_eq!(updated.serialize(), expected);
    }

    #[test]
    fn update_inserts_missing_directive_at_block_end() {
        let doc = parse("subnet 10.0.0.0 netmask 255.0.0.0 {\n    range 10.0.0.10 10.0.0.20;\n}\n");
        let patch = SubnetPatch {
            routers: Some("10.0.0.1".to_string()),
            ..SubnetPatch::default()
        };
        let updated = update_subnet(&doc, "10.0.0.0", "255.0.0.0", &patch).unwrap();
        assert_eq!(
            updated.serialize(),
            "subnet 10.0.0.0 netmask 255.0.0.0 {\n    range 10.0.0.10 10.0.0.20;\n    option routers 10.0.0.1;\n}\n"
        );
    }

    #[test]
    fn update_missing_subnet_is_block_not_found() {
        let err = update_subnet(
            &parse(BASE),
            "10.9.9.0",
            "255.255.255.0",
            &SubnetPatch::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::BlockNotFound { keyword, .. } if keyword == "subnet"));
    }

    #[test]
    fn add_subnet_groups_after_existing_subnets() {
        let spec = SubnetSpec {
            network: "192.168.2.0".to_string(),
            netmask: "255.255.255.0".to_string(),
            range_start: Some("192.168.2.100".to_string()),
            range_end: Some("192.168.2.200".to_string()),
            routers: Some("192.168.2.1".to_string()),
            domain_name_servers: None,
            domain_name: Some("test.local".to_string()),
            default_lease_time: SubnetSpec::default_lease(),
            max_lease_time: SubnetSpec::default_max_lease(),
        };
        let updated = add_subnet(&parse(BASE), &spec).unwrap();
        let text = updated.serialize();
        let new_block = "\
subnet 192.168.2.0 netmask 255.255.255.0 {
    range 192.168.2.100 192.168.2.200;
    option routers 192.168.2.1;
    option domain-name \"test.local\";
    default-lease-time 86400;
    max-lease-time 172800;
}";
        assert!(text.contains(new_block), "{text}");
        // new subnet lands between the old subnet and the host block
        let subnet_pos = text.find("subnet 192.168.2.0").unwrap();
        assert!(subnet_pos > text.find("subnet 192.168.1.0").unwrap());
        assert!(subnet_pos < text.find("host printer-01").unwrap());
        // untouched spans stay verbatim
        assert!(text.contains("    range 192.168.1.100 192.168.1.200;"));
    }

    #[test]
    fn add_duplicate_subnet_rejected() {
        let spec = SubnetSpec {
            network: "192.168.1.0".to_string(),
            netmask: "255.255.255.0".to_string(),
            range_start: None,
            range_end: None,
            routers: None,
            domain_name_servers: None,
            domain_name: None,
            default_lease_time: 86_400,
            max_lease_time: 172_800,
        };
        let err = add_subnet(&parse(BASE), &spec).unwrap_err();
        assert!(matches!(err, Error::DuplicateBlock { keyword, .. } if keyword == "subnet"));
    }

    #[test]
    fn add_host_appends_and_rejects_duplicates() {
        let spec = HostSpec {
            hostname: "scanner".to_string(),
            mac: "aa:bb:cc:dd:ee:ff".to_string(),
            ip: "192.168.1.60".to_string(),
        };
        let updated = add_host(&parse(BASE), &spec).unwrap();
        let text = updated.serialize();
        assert!(text.ends_with(
            "host scanner {\n    hardware ethernet aa:bb:cc:dd:ee:ff;\n    fixed-address 192.168.1.60;\n}\n"
        ), "{text}");
        let err = add_host(&updated, &spec).unwrap_err();
        assert!(matches!(err, Error::DuplicateBlock { name, .. } if name == "scanner"));
    }

    #[test]
    fn remove_host_takes_comment_label() {
        let updated = remove_host(&parse(BASE), "printer-01").unwrap();
        let text = updated.serialize();
        assert!(!text.contains("host printer-01"));
        assert!(!text.contains("# office printer"));
        // the rest of the document is untouched
        assert!(text.starts_with("# global options\ndefault-lease-time 600;\n\nsubnet 192.168.1.0"));
    }

    #[test]
    fn remove_missing_host_leaves_document_unchanged() {
        let doc = parse(BASE);
        let before = doc.serialize();
        let err = remove_host(&doc, "printer-99").unwrap_err();
        assert!(matches!(err, Error::BlockNotFound { name, .. } if name == "printer-99"));
        // removal is all-or-nothing; a fresh parse of the untouched text matches
        assert_eq!(parse(&before).serialize(), before);
    }

    #[test]
    fn remove_subnet_by_identity() {
        let updated = remove_subnet(&parse(BASE), "192.168.1.0", "255.255.255.0").unwrap();
        assert!(!updated.serialize().contains("subnet 192.168.1.0"));
    }

    #[test]
    fn views_project_parsed_fields() {
        let doc = parse(BASE);
        let subnets = subnets(&doc);
        assert_eq!(subnets.len(), 1);
        assert_eq!(subnets[0].network(), Some("192.168.1.0"));
        assert_eq!(subnets[0].netmask(), Some("255.255.255.0"));
        assert_eq!(
            subnets[0].range(),
            Some(("192.168.1.100", "192.168.1.200"))
        );
        assert_eq!(subnets[0].routers(), Some("192.168.1.1"));
        let hosts = hosts(&doc);
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].hostname(), "printer-01");
        assert_eq!(hosts[0].mac(), Some("00:11:22:33:44:55"));
        assert_eq!(hosts[0].fixed_address(), Some("192.168.1.50"));
    }
}
