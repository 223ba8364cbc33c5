//! Error types.

use trust_dns_client::proto::error::ProtoError;
use trust_dns_client::rr::RecordType;

/// Error enumerates the possible dirforge error states.
///
/// Every failure carries the offending identifier or line so callers can
/// build a user-facing message without re-parsing anything.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when config text can't be parsed. The parse is aborted as a
    /// whole; no partial document is produced.
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Returned by [`build_add`][crate::ldif::build_add] when the fixed
    /// mandatory attribute set for the object category is incomplete.
    #[error("missing mandatory attribute \"{attribute}\" for {category} add")]
    MissingMandatoryAttribute {
        category: &'static str,
        attribute: &'static str,
    },

    /// Returned by [`build_modify`][crate::ldif::build_modify] when given an
    /// empty change list.
    #[error("modify record requires at least one attribute change")]
    EmptyChangeSet,

    /// Returned when a distinguished name has no RDN components.
    #[error("distinguished name is empty")]
    EmptyDn,

    /// Returned when a distinguished name component is not a `key=value`
    /// pair.
    #[error("malformed RDN component \"{0}\"")]
    InvalidDn(String),

    /// Returned when an [`AttributeChange`][crate::ldif::AttributeChange]
    /// with op `add` carries no values.
    #[error("add change for \"{0}\" requires at least one value")]
    EmptyAddValues(String),

    /// Returned when DNS record data does not match the shape required by
    /// its record type (see the token table in [`crate::phrase`]).
    #[error("invalid {rtype} record data \"{data}\": {reason}")]
    InvalidRecordData {
        rtype: RecordType,
        data: String,
        reason: String,
    },

    /// Returned when a config mutation targets a block that isn't in the
    /// document. The input document is left unmodified.
    #[error("no {keyword} block named \"{name}\" in document")]
    BlockNotFound { keyword: String, name: String },

    /// Returned when adding a block whose identity already exists in the
    /// document (subnet identity is network+netmask, host identity is name).
    #[error("{keyword} block \"{name}\" already exists")]
    DuplicateBlock { keyword: String, name: String },

    /// Returned when an address or network field doesn't parse as an IP
    /// literal.
    #[error("\"{0}\" is not a valid address")]
    InvalidAddress(String),

    /// Returned when a subnet network/netmask pair is not a valid network.
    #[error("invalid network")]
    InvalidNetwork(#[from] ipnetwork::IpNetworkError),

    /// Returned when a remote command finishes with a non-zero exit
    /// indicator.
    #[error("remote command exited {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// Returned when a remote command exceeds the configured exec timeout.
    #[error("remote command timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON (e.g. trying to load a
    /// [`Config`][crate::config::Config], or decoding an intent file) fails
    /// due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when a zone or record name is not a well-formed DNS name.
    #[error("DNS name error")]
    DNSError(#[from] ProtoError),
}
