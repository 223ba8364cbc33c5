//! Builders for directory change records.

use crate::error::Error;
use crate::ldif::{
    encode_unicode_pwd, AttributeChange, AttributeValues, ChangeBlock, ChangeOp, ChangePayload,
    ChangeRecord, DirectoryObjectSpec, Dn,
};
use serde::{Deserialize, Serialize};

/// The directory object categories this engine manages. Each carries a fixed
/// mandatory attribute set that [`build_add`] enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectCategory {
    User,
    Computer,
    Group,
}

impl ObjectCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ObjectCategory::User => "user",
            ObjectCategory::Computer => "computer",
            ObjectCategory::Group => "group",
        }
    }

    /// Attributes that must be present before an add record is generated.
    fn mandatory(self) -> &'static [&'static str] {
        match self {
            ObjectCategory::User | ObjectCategory::Computer => {
                &["objectClass", "cn", "sAMAccountName"]
            }
            ObjectCategory::Group => &["objectClass", "cn"],
        }
    }
}

/// Build an add record for a new directory object.
///
/// # Errors
///
/// Returns [`Error::MissingMandatoryAttribute`] if the category's mandatory
/// set (object class plus naming attributes) is absent or empty.
pub fn build_add(
    category: ObjectCategory,
    spec: DirectoryObjectSpec,
) -> Result<ChangeRecord, Error> {
    for required in category.mandatory() {
        let present = spec
            .get(required)
            .is_some_and(|attr| attr.values.iter().any(|v| !v.is_empty()));
        if !present {
            return Err(Error::MissingMandatoryAttribute {
                category: category.label(),
                attribute: required,
            });
        }
    }
    Ok(ChangeRecord::new(vec![ChangeBlock {
        dn: spec.dn,
        payload: ChangePayload::Add(spec.attributes),
    }]))
}

/// Build a modify record applying the given attribute changes in order.
///
/// # Errors
///
/// Returns [`Error::EmptyChangeSet`] for an empty change list and
/// [`Error::EmptyAddValues`] for an `add` change without values.
pub fn build_modify(dn: Dn, changes: Vec<AttributeChange>) -> Result<ChangeRecord, Error> {
    if changes.is_empty() {
        return Err(Error::EmptyChangeSet);
    }
    for change in &changes {
        if change.op == ChangeOp::Add && change.values.is_empty() {
            return Err(Error::EmptyAddValues(change.attr.clone()));
        }
    }
    Ok(ChangeRecord::new(vec![ChangeBlock {
        dn,
        payload: ChangePayload::Modify(changes),
    }]))
}

/// Build a delete record for the entry at `dn`.
#[must_use]
pub fn build_delete(dn: Dn) -> ChangeRecord {
    ChangeRecord::new(vec![ChangeBlock {
        dn,
        payload: ChangePayload::Delete,
    }])
}

/// Build a password-change record: a single `replace` of the password
/// attribute with the encoded value. The plaintext is consumed here and is
/// never stored or logged.
#[must_use]
pub fn build_password_change(dn: Dn, plaintext: &str) -> ChangeRecord {
    let change = AttributeChange::new(
        ChangeOp::Replace,
        "unicodePwd",
        [encode_unicode_pwd(plaintext)],
    );
    ChangeRecord::new(vec![ChangeBlock {
        dn,
        payload: ChangePayload::Modify(vec![change]),
    }])
}

/// Build a modify record adding `member_dn` to the group at `group_dn`.
/// A single-attribute `add: member` block, not a full-object rewrite.
#[must_use]
pub fn build_member_add(group_dn: Dn, member_dn: &Dn) -> ChangeRecord {
    member_change(group_dn, member_dn, ChangeOp::Add)
}

/// Build a modify record removing `member_dn` from the group at `group_dn`.
#[must_use]
pub fn build_member_remove(group_dn: Dn, member_dn: &Dn) -> ChangeRecord {
    member_change(group_dn, member_dn, ChangeOp::Delete)
}

fn member_change(group_dn: Dn, member_dn: &Dn, op: ChangeOp) -> ChangeRecord {
    let change = AttributeChange::new(op, "member", [member_dn.to_string()]);
    ChangeRecord::new(vec![ChangeBlock {
        dn: group_dn,
        payload: ChangePayload::Modify(vec![change]),
    }])
}

/// Parameters for the stock user-add record.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub sam_account_name: String,
    pub cn: String,
    pub password: String,
    /// Container the user is created under, relative to the base DN.
    #[serde(default = "NewUser::default_ou")]
    pub ou: String,
    #[serde(default)]
    pub sn: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
}

impl NewUser {
    fn default_ou() -> String {
        "CN=Users".to_string()
    }
}

/// Normal account, enabled (`userAccountControl` flag set).
const UAC_NORMAL_ACCOUNT: &str = "512";

/// Assemble the full attribute set for a new user account and build the add
/// record: object class chain, naming attributes, enabled-account control
/// flag, encoded password and the optional person attributes, in that order.
///
/// # Errors
///
/// Returns [`Error::InvalidDn`] or [`Error::EmptyDn`] if the composed DN is
/// malformed.
pub fn build_user_add(base_dn: &str, domain: &str, user: &NewUser) -> Result<ChangeRecord, Error> {
    let dn: Dn = format!("CN={},{},{}", user.cn, user.ou, base_dn).parse()?;
    let upn = format!("{}@{}", user.sam_account_name, domain);

    let mut attributes = vec![
        AttributeValues::new(
            "objectClass",
            ["top", "person", "organizationalPerson", "user"],
        ),
        AttributeValues::single("cn", user.cn.clone()),
        AttributeValues::single("sAMAccountName", user.sam_account_name.clone()),
        AttributeValues::single("userAccountControl", UAC_NORMAL_ACCOUNT),
        AttributeValues::single("unicodePwd", encode_unicode_pwd(&user.password)),
    ];
    if let Some(sn) = &user.sn {
        attributes.push(AttributeValues::single("sn", sn.clone()));
    }
    if let Some(given_name) = &user.given_name {
        attributes.push(AttributeValues::single("givenName", given_name.clone()));
    }
    if let Some(mail) = &user.mail {
        attributes.push(AttributeValues::single("mail", mail.clone()));
    }
    attributes.push(AttributeValues::single("userPrincipalName", upn));

    build_add(
        ObjectCategory::User,
        DirectoryObjectSpec { dn, attributes },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dn(s: &str) -> Dn {
        s.parse().unwrap()
    }

    #[test]
    fn add_requires_mandatory_set() {
        let spec = DirectoryObjectSpec {
            dn: dn("CN=ws01,CN=Computers,DC=example,DC=local"),
            attributes: vec![AttributeValues::single("cn", "ws01")],
        };
        let err = build_add(ObjectCategory::Computer, spec).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingMandatoryAttribute {
                category: "computer",
                attribute: "objectClass",
            }
        ));
    }

    #[test]
    fn add_record_shape() {
        let spec = DirectoryObjectSpec {
            dn: dn("CN=staff,CN=Users,DC=example,DC=local"),
            attributes: vec![
                AttributeValues::new("objectClass", ["top", "group"]),
                AttributeValues::single("cn", "staff"),
                AttributeValues::single("description", "Staff group"),
            ],
        };
        let record = build_add(ObjectCategory::Group, spec).unwrap();
        let text = record.render();
        assert_eq!(text.matches("dn: ").count(), 1);
        assert_eq!(
            text,
            "dn: CN=staff,CN=Users,DC=example,DC=local\n\
             changetype: add\n\
             objectClass: top\n\
             objectClass: group\n\
             cn: staff\n\
             description: Staff group\n"
        );
    }

    #[test]
    fn modify_rejects_empty_changeset() {
        let err = build_modify(dn("CN=a,DC=b"), vec![]).unwrap_err();
        assert!(matches!(err, Error::EmptyChangeSet));
    }

    #[test]
    fn modify_rejects_add_without_values() {
        let change = AttributeChange {
            op: ChangeOp::Add,
            attr: "member".to_string(),
            values: vec![],
        };
        let err = build_modify(dn("CN=a,DC=b"), vec![change]).unwrap_err();
        assert!(matches!(err, Error::EmptyAddValues(attr) if attr == "member"));
    }

    #[test]
    fn replace_with_no_values_clears_attribute() {
        let change = AttributeChange::new(ChangeOp::Replace, "description", Vec::<String>::new());
        let record = build_modify(dn("CN=a,DC=b"), vec![change]).unwrap();
        assert_eq!(
            record.render(),
            "dn: CN=a,DC=b\nchangetype: modify\nreplace: description\n-\n"
        );
    }

    #[test]
    fn password_change_is_single_replace() {
        let record = build_password_change(dn("CN=ivanov,DC=example,DC=local"), "newPassword");
        assert_eq!(
            record.render(),
            "dn: CN=ivanov,DC=example,DC=local\n\
             changetype: modify\n\
             replace: unicodePwd\n\
             unicodePwd:: IgBuAGUAdwBQAGEAcwBzAHcAbwByAGQAIgA=\n\
             -\n"
        );
    }

    #[test]
    fn member_add_is_single_attribute_block() {
        let record = build_member_add(
            dn("CN=staff,CN=Users,DC=example,DC=local"),
            &dn("CN=ivanov,CN=Users,DC=example,DC=local"),
        );
        assert_eq!(
            record.render(),
            "dn: CN=staff,CN=Users,DC=example,DC=local\n\
             changetype: modify\n\
             add: member\n\
             member: CN=ivanov,CN=Users,DC=example,DC=local\n\
             -\n"
        );
    }

    #[test]
    fn user_add_assembles_mandatory_attributes() {
        let user = NewUser {
            sam_account_name: "ivanov".to_string(),
            cn: "Ivan Ivanov".to_string(),
            password: "P@ssw0rd!".to_string(),
            ou: NewUser::default_ou(),
            sn: Some("Ivanov".to_string()),
            given_name: Some("Ivan".to_string()),
            mail: None,
        };
        let record = build_user_add("DC=example,DC=local", "example.local", &user).unwrap();
        let text = record.render();
        assert!(text.starts_with("dn: CN=Ivan Ivanov,CN=Users,DC=example,DC=local\n"));
        assert_eq!(text.matches("dn: ").count(), 1);
        assert!(text.contains("changetype: add\n"));
        assert!(text.contains("objectClass: user\n"));
        assert!(text.contains("sAMAccountName: ivanov\n"));
        assert!(text.contains("userAccountControl: 512\n"));
        assert!(text.contains("unicodePwd:: IgBQAEAAcwBzAHcAMAByAGQAIQAiAA==\n"));
        assert!(text.contains("userPrincipalName: ivanov@example.local\n"));
    }
}
