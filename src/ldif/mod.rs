//! Directory change records.
//!
//! Models add/modify/delete mutations against a directory service and
//! renders them as the line-oriented change-record text consumed by
//! `ldapmodify` and friends. Rendering is deterministic: attributes appear
//! exactly in the order the caller supplied them, which is what makes
//! byte-exact comparison of generated records possible.

use crate::error::Error;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub mod builder;
pub mod password;

pub use builder::{
    build_add, build_delete, build_member_add, build_member_remove, build_modify,
    build_password_change, build_user_add, NewUser, ObjectCategory,
};
pub use password::encode_unicode_pwd;

lazy_static! {
    // Well-known directory attribute spellings. Attribute names are matched
    // case-insensitively but always rendered in these canonical forms.
    static ref CANONICAL_ATTRIBUTES: HashMap<&'static str, &'static str> = [
        "objectClass",
        "cn",
        "sn",
        "givenName",
        "displayName",
        "description",
        "mail",
        "member",
        "memberOf",
        "sAMAccountName",
        "userPrincipalName",
        "userAccountControl",
        "unicodePwd",
        "groupType",
        "operatingSystem",
        "operatingSystemVersion",
        "dNSHostName",
        "distinguishedName",
    ]
    .into_iter()
    .map(|name| (Box::leak(name.to_ascii_lowercase().into_boxed_str()) as &str, name))
    .collect();
}

/// Map an attribute name to its canonical spelling, case-insensitively.
/// Names outside the well-known table are kept as given.
#[must_use]
pub fn canonical_attribute(name: &str) -> String {
    CANONICAL_ATTRIBUTES
        .get(name.to_ascii_lowercase().as_str())
        .map_or_else(|| name.to_string(), |canon| (*canon).to_string())
}

/// Attributes whose values are pre-encoded binary and must be rendered with
/// the `::` base64 value marker.
fn is_base64_attribute(name: &str) -> bool {
    name.eq_ignore_ascii_case("unicodePwd")
}

/// One RDN component of a distinguished name, e.g. `CN=ivanov`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    pub key: String,
    pub value: String,
}

/// A distinguished name: an ordered, non-empty sequence of RDN components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dn(Vec<Rdn>);

impl Dn {
    /// The RDN components, leaf first.
    #[must_use]
    pub fn components(&self) -> &[Rdn] {
        &self.0
    }
}

impl FromStr for Dn {
    type Err = Error;

    /// Parse a DN string such as `CN=ivanov,CN=Users,DC=example,DC=local`.
    /// A backslash escapes the following character, so values may contain
    /// commas (`CN=Doe\, John`).
    fn from_str(s: &str) -> Result<Self, Error> {
        let mut components = Vec::new();
        let mut part = String::new();
        let mut chars = s.chars();
        loop {
            match chars.next() {
                Some('\\') => {
                    part.push('\\');
                    if let Some(escaped) = chars.next() {
                        part.push(escaped);
                    }
                }
                Some(',') | None => {
                    let trimmed = part.trim();
                    if !trimmed.is_empty() {
                        let (key, value) = trimmed
                            .split_once('=')
                            .ok_or_else(|| Error::InvalidDn(trimmed.to_string()))?;
                        components.push(Rdn {
                            key: key.trim().to_string(),
                            value: value.trim().to_string(),
                        });
                    }
                    part.clear();
                    if chars.as_str().is_empty() {
                        break;
                    }
                }
                Some(c) => part.push(c),
            }
        }
        if components.is_empty() {
            return Err(Error::EmptyDn);
        }
        Ok(Dn(components))
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", rdn.key, rdn.value)?;
        }
        Ok(())
    }
}

/// One named attribute with one-or-many values, in caller order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValues {
    pub name: String,
    pub values: Vec<String>,
}

impl AttributeValues {
    pub fn new(name: &str, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        AttributeValues {
            name: canonical_attribute(name),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn single(name: &str, value: impl Into<String>) -> Self {
        Self::new(name, [value.into()])
    }
}

/// Identifies a directory entry and its attribute mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryObjectSpec {
    pub dn: Dn,
    pub attributes: Vec<AttributeValues>,
}

impl DirectoryObjectSpec {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValues> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// The operation kind of a single attribute mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Add,
    Replace,
    Delete,
}

impl ChangeOp {
    fn keyword(self) -> &'static str {
        match self {
            ChangeOp::Add => "add",
            ChangeOp::Replace => "replace",
            ChangeOp::Delete => "delete",
        }
    }
}

/// A single attribute mutation inside a modify block.
///
/// `replace` with zero values clears the attribute; `add` must carry at
/// least one value (enforced by [`build_modify`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub op: ChangeOp,
    pub attr: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl AttributeChange {
    pub fn new(op: ChangeOp, attr: &str, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        AttributeChange {
            op,
            attr: canonical_attribute(attr),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// The payload of one change-record block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePayload {
    Add(Vec<AttributeValues>),
    Modify(Vec<AttributeChange>),
    Delete,
}

/// One `dn:`-headed block of a change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBlock {
    pub dn: Dn,
    pub payload: ChangePayload,
}

/// A complete change record: one or more blocks separated by a blank line
/// when rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    blocks: Vec<ChangeBlock>,
}

impl ChangeRecord {
    #[must_use]
    pub fn new(blocks: Vec<ChangeBlock>) -> Self {
        ChangeRecord { blocks }
    }

    #[must_use]
    pub fn blocks(&self) -> &[ChangeBlock] {
        &self.blocks
    }

    /// Render the record as change-record text: one line per attribute
    /// statement, `dn:` and `changetype:` headers, modify changes terminated
    /// by a line containing only `-`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            render_block(&mut out, block);
        }
        out
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_block(out: &mut String, block: &ChangeBlock) {
    out.push_str("dn: ");
    out.push_str(&block.dn.to_string());
    out.push('\n');
    match &block.payload {
        ChangePayload::Add(attributes) => {
            out.push_str("changetype: add\n");
            for attr in attributes {
                for value in &attr.values {
                    render_value_line(out, &attr.name, value);
                }
            }
        }
        ChangePayload::Modify(changes) => {
            out.push_str("changetype: modify\n");
            for change in changes {
                out.push_str(change.op.keyword());
                out.push_str(": ");
                out.push_str(&change.attr);
                out.push('\n');
                for value in &change.values {
                    render_value_line(out, &change.attr, value);
                }
                out.push_str("-\n");
            }
        }
        ChangePayload::Delete => {
            out.push_str("changetype: delete\n");
        }
    }
}

fn render_value_line(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    if is_base64_attribute(name) {
        out.push_str(":: ");
    } else {
        out.push_str(": ");
    }
    out.push_str(value);
    out.push('\n');
}
