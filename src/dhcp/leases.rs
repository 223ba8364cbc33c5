//! Lease database reader.
//!
//! `dhcpd.leases` uses the same block grammar as the config file, so the
//! lease records come straight out of [`grammar`][super::grammar]. Times in
//! the file are UTC in `weekday year/month/day hour:minute:second` form.

use crate::dhcp::grammar::{Block, ConfigDocument, Item};
use crate::error::Error;
use lazy_static::lazy_static;
use time::macros::format_description;
use time::PrimitiveDateTime;

lazy_static! {
    static ref LEASE_TIME_FORMATTER: &'static [time::format_description::FormatItem<'static>] =
        format_description!(
            version = 2,
            "[year]/[month]/[day] [hour]:[minute]:[second]"
        );
}

/// One lease record from the lease database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub ip: String,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub starts: Option<PrimitiveDateTime>,
    pub ends: Option<PrimitiveDateTime>,
    pub state: String,
}

/// Parse lease database text into lease records, in file order. When the
/// server has rewritten a lease several times the later record wins for a
/// given address.
///
/// # Errors
///
/// Returns [`Error::Syntax`] when the text doesn't parse.
pub fn parse_leases(text: &str) -> Result<Vec<Lease>, Error> {
    let doc = ConfigDocument::parse(text)?;
    let mut leases: Vec<Lease> = Vec::new();
    for item in doc.items() {
        let Item::Block(block) = item else { continue };
        if block.keyword() != "lease" {
            continue;
        }
        let lease = project_lease(block);
        match leases.iter_mut().find(|l| l.ip == lease.ip) {
            Some(existing) => *existing = lease,
            None => leases.push(lease),
        }
    }
    Ok(leases)
}

fn project_lease(block: &Block) -> Lease {
    Lease {
        ip: block.name().to_string(),
        mac: block
            .directive(&["hardware", "ethernet"])
            .and_then(|d| d.arg(1))
            .map(ToString::to_string),
        hostname: block
            .directive(&["client-hostname"])
            .and_then(|d| d.arg(0))
            .map(|raw| raw.trim_matches('"').to_string()),
        starts: lease_time(block, "starts"),
        ends: lease_time(block, "ends"),
        state: block
            .directive(&["binding", "state"])
            .and_then(|d| d.arg(1))
            .unwrap_or("active")
            .to_string(),
    }
}

/// `starts`/`ends` directives carry a leading weekday number the timestamp
/// format doesn't need: `starts 5 2024/01/05 10:00:00;`.
fn lease_time(block: &Block, key: &str) -> Option<PrimitiveDateTime> {
    let d = block.directive(&[key])?;
    let stamp = format!("{} {}", d.arg(1)?, d.arg(2)?);
    PrimitiveDateTime::parse(&stamp, &LEASE_TIME_FORMATTER).ok()
}
