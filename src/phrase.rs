//! Command phrases for the external administrative tool.
//!
//! A phrase is an ordered token vector; tokens are never pre-joined here,
//! since quoting for a shell is the remote executor's concern. Token order
//! is a compatibility contract with the tool and must not be reordered:
//!
//! | op         | tokens                                                            |
//! |------------|-------------------------------------------------------------------|
//! | dns add    | `samba-tool dns add <server> <zone> <name> <TYPE> <data> --ttl <n>`|
//! | dns delete | `samba-tool dns delete <server> <zone> <name> <TYPE> <data>`       |
//! | dns query  | `samba-tool dns query <server> <zone> <name> <TYPE\|ALL>`          |
//! | zonelist   | `samba-tool dns zonelist <server>`                                 |
//! | gpo create | `samba-tool gpo create <name>`                                     |
//! | gpo del    | `samba-tool gpo del <gpo>`                                         |
//! | setlink    | `samba-tool gpo setlink <container-dn> <gpo>`                      |
//! | dellink    | `samba-tool gpo dellink <container-dn> <gpo>`                      |
//! | listall    | `samba-tool gpo listall`                                           |

use crate::error::Error;
use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use trust_dns_client::rr::{Name, RecordType};

const TOOL: &str = "samba-tool";
const DEFAULT_TTL: u32 = 3600;

/// An ordered token sequence for one external-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPhrase(Vec<String>);

impl CommandPhrase {
    pub(crate) fn new(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        CommandPhrase(tokens.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn into_tokens(self) -> Vec<String> {
        self.0
    }
}

/// Build a DNS record-add phrase.
///
/// # Errors
///
/// Returns [`Error::InvalidRecordData`] when `data` doesn't match the shape
/// the record type requires, or [`Error::DNSError`] for a malformed zone or
/// record name.
pub fn dns_add(
    server: &str,
    zone: &str,
    name: &str,
    rtype: RecordType,
    data: &str,
    ttl: Option<u32>,
) -> Result<CommandPhrase, Error> {
    validate_names(zone, name)?;
    let value = record_value(rtype, data)?;
    Ok(CommandPhrase::new([
        TOOL.to_string(),
        "dns".to_string(),
        "add".to_string(),
        server.to_string(),
        zone.to_string(),
        name.to_string(),
        rtype.to_string(),
        value,
        "--ttl".to_string(),
        ttl.unwrap_or(DEFAULT_TTL).to_string(),
    ]))
}

/// Build a DNS record-delete phrase. The tool identifies the record by its
/// value, so `data` is required and validated the same way as for add.
///
/// # Errors
///
/// Same failure modes as [`dns_add`].
pub fn dns_delete(
    server: &str,
    zone: &str,
    name: &str,
    rtype: RecordType,
    data: &str,
) -> Result<CommandPhrase, Error> {
    validate_names(zone, name)?;
    let value = record_value(rtype, data)?;
    Ok(CommandPhrase::new([
        TOOL.to_string(),
        "dns".to_string(),
        "delete".to_string(),
        server.to_string(),
        zone.to_string(),
        name.to_string(),
        rtype.to_string(),
        value,
    ]))
}

/// Build a DNS query phrase; `name` defaults to the zone root (`@`) and the
/// type filter defaults to `ALL`.
///
/// # Errors
///
/// Returns [`Error::DNSError`] for a malformed zone or record name.
pub fn dns_query(
    server: &str,
    zone: &str,
    name: Option<&str>,
    rtype: Option<RecordType>,
) -> Result<CommandPhrase, Error> {
    let name = name.unwrap_or("@");
    validate_names(zone, name)?;
    Ok(CommandPhrase::new([
        TOOL.to_string(),
        "dns".to_string(),
        "query".to_string(),
        server.to_string(),
        zone.to_string(),
        name.to_string(),
        rtype.map_or_else(|| "ALL".to_string(), |t| t.to_string()),
    ]))
}

/// Build a DNS zone-list phrase.
#[must_use]
pub fn dns_zonelist(server: &str) -> CommandPhrase {
    CommandPhrase::new([TOOL, "dns", "zonelist", server])
}

/// Build a group-policy create phrase.
#[must_use]
pub fn gpo_create(name: &str) -> CommandPhrase {
    CommandPhrase::new([TOOL, "gpo", "create", name])
}

/// Build a group-policy delete phrase; `gpo` is the policy's GUID.
#[must_use]
pub fn gpo_delete(gpo: &str) -> CommandPhrase {
    CommandPhrase::new([TOOL, "gpo", "del", gpo])
}

/// Build a phrase linking a policy to a container (OU or domain root).
#[must_use]
pub fn gpo_setlink(container_dn: &str, gpo: &str) -> CommandPhrase {
    CommandPhrase::new([TOOL, "gpo", "setlink", container_dn, gpo])
}

/// Build a phrase removing a policy link from a container.
#[must_use]
pub fn gpo_dellink(container_dn: &str, gpo: &str) -> CommandPhrase {
    CommandPhrase::new([TOOL, "gpo", "dellink", container_dn, gpo])
}

/// Build a list-all-policies phrase.
#[must_use]
pub fn gpo_listall() -> CommandPhrase {
    CommandPhrase::new([TOOL, "gpo", "listall"])
}

fn validate_names(zone: &str, name: &str) -> Result<(), Error> {
    Name::from_str(zone)?;
    if name != "@" {
        Name::from_str(name)?;
    }
    Ok(())
}

fn invalid(rtype: RecordType, data: &str, reason: &str) -> Error {
    Error::InvalidRecordData {
        rtype,
        data: data.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate record data against its type's required shape and produce the
/// single value token the tool expects. MX input is `<priority> <host>` and
/// SRV input is `<priority> <weight> <port> <target>`; the tool itself wants
/// `<host> <priority>` and `<target> <port> <priority> <weight>`, so those
/// are re-ordered here.
fn record_value(rtype: RecordType, data: &str) -> Result<String, Error> {
    let fields: Vec<&str> = data.split_whitespace().collect();
    match rtype {
        RecordType::A => {
            let &[addr] = &fields[..] else {
                return Err(invalid(rtype, data, "expected a single IPv4 address"));
            };
            Ipv4Addr::from_str(addr)
                .map_err(|_| invalid(rtype, data, "expected a literal IPv4 address"))?;
            Ok(addr.to_string())
        }
        RecordType::AAAA => {
            let &[addr] = &fields[..] else {
                return Err(invalid(rtype, data, "expected a single IPv6 address"));
            };
            Ipv6Addr::from_str(addr)
                .map_err(|_| invalid(rtype, data, "expected a literal IPv6 address"))?;
            Ok(addr.to_string())
        }
        RecordType::CNAME | RecordType::TXT | RecordType::NS | RecordType::PTR => {
            let &[value] = &fields[..] else {
                return Err(invalid(rtype, data, "expected a single value token"));
            };
            Ok(value.to_string())
        }
        RecordType::MX => {
            let &[priority, host] = &fields[..] else {
                return Err(invalid(rtype, data, "expected \"<priority> <host>\""));
            };
            priority
                .parse::<u16>()
                .map_err(|_| invalid(rtype, data, "priority must be an integer"))?;
            Ok(format!("{host} {priority}"))
        }
        RecordType::SRV => {
            let &[priority, weight, port, target] = &fields[..] else {
                return Err(invalid(
                    rtype,
                    data,
                    "expected \"<priority> <weight> <port> <target>\"",
                ));
            };
            for numeric in [priority, weight, port] {
                numeric
                    .parse::<u16>()
                    .map_err(|_| invalid(rtype, data, "priority/weight/port must be integers"))?;
            }
            Ok(format!("{target} {port} {priority} {weight}"))
        }
        other => Err(invalid(other, data, "unsupported record type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_add_token_order() {
        let phrase = dns_add(
            "dc1.example.local",
            "example.local",
            "www",
            RecordType::A,
            "192.168.1.10",
            None,
        )
        .unwrap();
        assert_eq!(
            phrase.tokens(),
            [
                "samba-tool",
                "dns",
                "add",
                "dc1.example.local",
                "example.local",
                "www",
                "A",
                "192.168.1.10",
                "--ttl",
                "3600",
            ]
        );
    }

    #[test]
    fn mx_data_is_priority_then_host_and_reordered_for_the_tool() {
        let phrase = dns_add(
            "dc1",
            "example.local",
            "@",
            RecordType::MX,
            "10 mail.example.local",
            Some(600),
        )
        .unwrap();
        assert_eq!(phrase.tokens()[7], "mail.example.local 10");
        assert_eq!(&phrase.tokens()[8..], ["--ttl", "600"]);

        let err = dns_add("dc1", "example.local", "@", RecordType::MX, "mail.example.local", None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRecordData { .. }));
    }

    #[test]
    fn srv_data_shape() {
        let phrase = dns_add(
            "dc1",
            "example.local",
            "_ldap._tcp",
            RecordType::SRV,
            "0 100 389 dc1.example.local",
            None,
        )
        .unwrap();
        assert_eq!(phrase.tokens()[7], "dc1.example.local 389 0 100");

        let err = dns_add(
            "dc1",
            "example.local",
            "_ldap._tcp",
            RecordType::SRV,
            "0 100 dc1.example.local",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidRecordData { .. }));
    }

    #[test]
    fn address_literals_are_checked() {
        assert!(matches!(
            dns_add("dc1", "z.local", "www", RecordType::A, "not-an-ip", None),
            Err(Error::InvalidRecordData { .. })
        ));
        assert!(matches!(
            dns_add("dc1", "z.local", "www", RecordType::AAAA, "192.168.1.1", None),
            Err(Error::InvalidRecordData { .. })
        ));
        assert!(dns_add("dc1", "z.local", "www", RecordType::AAAA, "fd00::1", None).is_ok());
    }

    #[test]
    fn single_token_types_reject_extra_fields() {
        assert!(matches!(
            dns_add("dc1", "z.local", "www", RecordType::CNAME, "a b", None),
            Err(Error::InvalidRecordData { .. })
        ));
        assert!(dns_add("dc1", "z.local", "www", RecordType::TXT, "token", None).is_ok());
    }

    #[test]
    fn unsupported_type_rejected() {
        assert!(matches!(
            dns_add("dc1", "z.local", "www", RecordType::SOA, "x", None),
            Err(Error::InvalidRecordData { .. })
        ));
    }

    #[test]
    fn delete_requires_valid_data_and_omits_ttl() {
        let phrase = dns_delete("dc1", "z.local", "www", RecordType::A, "10.0.0.1").unwrap();
        assert_eq!(
            phrase.tokens(),
            ["samba-tool", "dns", "delete", "dc1", "z.local", "www", "A", "10.0.0.1"]
        );
    }

    #[test]
    fn query_defaults() {
        let phrase = dns_query("dc1", "z.local", None, None).unwrap();
        assert_eq!(
            phrase.tokens(),
            ["samba-tool", "dns", "query", "dc1", "z.local", "@", "ALL"]
        );
    }

    #[test]
    fn gpo_phrases() {
        assert_eq!(
            gpo_create("Default Workstation Policy").tokens(),
            ["samba-tool", "gpo", "create", "Default Workstation Policy"]
        );
        assert_eq!(
            gpo_setlink("OU=Workstations,DC=example,DC=local", "{31B2F340-016D-11D2-945F-00C04FB984F9}").tokens(),
            [
                "samba-tool",
                "gpo",
                "setlink",
                "OU=Workstations,DC=example,DC=local",
                "{31B2F340-016D-11D2-945F-00C04FB984F9}",
            ]
        );
        assert_eq!(gpo_listall().tokens(), ["samba-tool", "gpo", "listall"]);
    }
}
