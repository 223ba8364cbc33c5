//! Translation façade.
//!
//! [`translate`] is the single entry point: it accepts one validated
//! [`Intent`] and returns the artifact the remote tooling consumes — a
//! directory change record, a command phrase, or an edited config document.
//! Every call is an independent, pure function of its input; the façade
//! holds no state and knows nothing about transport or storage.

use crate::config::Config;
use crate::dhcp::{self, ConfigDocument, HostSpec, SubnetPatch, SubnetSpec};
use crate::error::Error;
use crate::ldif::{
    self, AttributeChange, AttributeValues, DirectoryObjectSpec, Dn, NewUser, ObjectCategory,
};
use crate::phrase::{self, CommandPhrase};
use serde::Deserialize;
use trust_dns_client::rr::RecordType;

/// Direction of a group membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipAction {
    Add,
    Remove,
}

/// A validated operator intent, ready for translation. DHCP intents carry
/// the target file's current text so a call stays a pure function of its
/// arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "intent", rename_all = "kebab-case")]
pub enum Intent {
    DirectoryAdd {
        category: ObjectCategory,
        dn: String,
        attributes: Vec<AttributeValues>,
    },
    DirectoryModify {
        dn: String,
        changes: Vec<AttributeChange>,
    },
    DirectoryDelete {
        dn: String,
    },
    /// Create a user with the stock attribute set; DN and principal name
    /// are derived from the configured base DN and domain.
    UserCreate {
        #[serde(flatten)]
        user: NewUser,
    },
    PasswordChange {
        dn: String,
        password: String,
    },
    GroupMembershipChange {
        group_dn: String,
        member_dn: String,
        action: MembershipAction,
    },
    DnsRecordAdd {
        server: String,
        zone: String,
        name: String,
        record_type: RecordType,
        data: String,
        #[serde(default)]
        ttl: Option<u32>,
    },
    DnsRecordDelete {
        server: String,
        zone: String,
        name: String,
        record_type: RecordType,
        data: String,
    },
    GpoCreate {
        name: String,
    },
    GpoLink {
        container_dn: String,
        gpo: String,
    },
    GpoUnlink {
        container_dn: String,
        gpo: String,
    },
    GpoDelete {
        gpo: String,
    },
    DhcpSubnetAdd {
        #[serde(default)]
        current_config: String,
        subnet: SubnetSpec,
    },
    DhcpSubnetUpdate {
        #[serde(default)]
        current_config: String,
        network: String,
        netmask: String,
        patch: SubnetPatch,
    },
    DhcpSubnetRemove {
        #[serde(default)]
        current_config: String,
        network: String,
        netmask: String,
    },
    DhcpReservationAdd {
        #[serde(default)]
        current_config: String,
        host: HostSpec,
    },
    DhcpReservationRemove {
        #[serde(default)]
        current_config: String,
        hostname: String,
    },
}

impl Intent {
    /// True for intents that edit the DHCP config file.
    #[must_use]
    pub fn edits_dhcp_config(&self) -> bool {
        matches!(
            self,
            Intent::DhcpSubnetAdd { .. }
                | Intent::DhcpSubnetUpdate { .. }
                | Intent::DhcpSubnetRemove { .. }
                | Intent::DhcpReservationAdd { .. }
                | Intent::DhcpReservationRemove { .. }
        )
    }

    /// For DHCP intents, replace the embedded config text (used by callers
    /// that fetch the live file themselves). Returns false for intents that
    /// don't edit a config file.
    pub fn set_current_config(&mut self, text: String) -> bool {
        match self {
            Intent::DhcpSubnetAdd { current_config, .. }
            | Intent::DhcpSubnetUpdate { current_config, .. }
            | Intent::DhcpSubnetRemove { current_config, .. }
            | Intent::DhcpReservationAdd { current_config, .. }
            | Intent::DhcpReservationRemove { current_config, .. } => {
                *current_config = text;
                true
            }
            _ => false,
        }
    }
}

/// The edited config document together with the text it was derived from.
#[derive(Debug, Clone)]
pub struct ConfigChange {
    pub original: String,
    doc: ConfigDocument,
}

impl ConfigChange {
    /// Serialized text of the edited document.
    #[must_use]
    pub fn text(&self) -> String {
        self.doc.serialize()
    }

    #[must_use]
    pub fn document(&self) -> &ConfigDocument {
        &self.doc
    }
}

/// What a translation produced.
#[derive(Debug, Clone)]
pub enum Artifact {
    Record(ldif::ChangeRecord),
    Phrase(CommandPhrase),
    Config(ConfigChange),
}

/// Translate one intent into its artifact.
///
/// # Errors
///
/// Propagates the typed error of whichever builder the intent dispatches
/// to; see [`Error`].
pub fn translate(config: &Config, intent: Intent) -> Result<Artifact, Error> {
    match intent {
        Intent::DirectoryAdd {
            category,
            dn,
            attributes,
        } => {
            let dn: Dn = dn.parse()?;
            let attributes = attributes
                .into_iter()
                .map(|a| AttributeValues::new(&a.name, a.values))
                .collect();
            let spec = DirectoryObjectSpec { dn, attributes };
            Ok(Artifact::Record(ldif::build_add(category, spec)?))
        }
        Intent::DirectoryModify { dn, changes } => {
            let changes = changes
                .into_iter()
                .map(|c| AttributeChange::new(c.op, &c.attr, c.values))
                .collect();
            Ok(Artifact::Record(ldif::build_modify(dn.parse()?, changes)?))
        }
        Intent::DirectoryDelete { dn } => Ok(Artifact::Record(ldif::build_delete(dn.parse()?))),
        Intent::UserCreate { user } => Ok(Artifact::Record(ldif::build_user_add(
            &config.base_dn,
            &config.domain,
            &user,
        )?)),
        Intent::PasswordChange { dn, password } => Ok(Artifact::Record(
            ldif::build_password_change(dn.parse()?, &password),
        )),
        Intent::GroupMembershipChange {
            group_dn,
            member_dn,
            action,
        } => {
            let group_dn: Dn = group_dn.parse()?;
            let member_dn: Dn = member_dn.parse()?;
            let record = match action {
                MembershipAction::Add => ldif::build_member_add(group_dn, &member_dn),
                MembershipAction::Remove => ldif::build_member_remove(group_dn, &member_dn),
            };
            Ok(Artifact::Record(record))
        }
        Intent::DnsRecordAdd {
            server,
            zone,
            name,
            record_type,
            data,
            ttl,
        } => Ok(Artifact::Phrase(phrase::dns_add(
            &server,
            &zone,
            &name,
            record_type,
            &data,
            ttl,
        )?)),
        Intent::DnsRecordDelete {
            server,
            zone,
            name,
            record_type,
            data,
        } => Ok(Artifact::Phrase(phrase::dns_delete(
            &server,
            &zone,
            &name,
            record_type,
            &data,
        )?)),
        Intent::GpoCreate { name } => Ok(Artifact::Phrase(phrase::gpo_create(&name))),
        Intent::GpoLink { container_dn, gpo } => {
            Ok(Artifact::Phrase(phrase::gpo_setlink(&container_dn, &gpo)))
        }
        Intent::GpoUnlink { container_dn, gpo } => {
            Ok(Artifact::Phrase(phrase::gpo_dellink(&container_dn, &gpo)))
        }
        Intent::GpoDelete { gpo } => Ok(Artifact::Phrase(phrase::gpo_delete(&gpo))),
        Intent::DhcpSubnetAdd {
            current_config,
            subnet,
        } => config_change(&current_config, |doc| dhcp::add_subnet(doc, &subnet)),
        Intent::DhcpSubnetUpdate {
            current_config,
            network,
            netmask,
            patch,
        } => config_change(&current_config, |doc| {
            dhcp::update_subnet(doc, &network, &netmask, &patch)
        }),
        Intent::DhcpSubnetRemove {
            current_config,
            network,
            netmask,
        } => config_change(&current_config, |doc| {
            dhcp::remove_subnet(doc, &network, &netmask)
        }),
        Intent::DhcpReservationAdd {
            current_config,
            host,
        } => config_change(&current_config, |doc| dhcp::add_host(doc, &host)),
        Intent::DhcpReservationRemove {
            current_config,
            hostname,
        } => config_change(&current_config, |doc| dhcp::remove_host(doc, &hostname)),
    }
}

fn config_change(
    current: &str,
    edit: impl FnOnce(&ConfigDocument) -> Result<ConfigDocument, Error>,
) -> Result<Artifact, Error> {
    let doc = ConfigDocument::parse(current)?;
    let edited = edit(&doc)?;
    Ok(Artifact::Config(ConfigChange {
        original: current.to_string(),
        doc: edited,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ldif::ChangeOp;

    fn config() -> Config {
        Config::for_tests()
    }

    #[test]
    fn modify_intent_translates_to_record() {
        let intent = Intent::DirectoryModify {
            dn: "CN=ivanov,CN=Users,DC=example,DC=local".to_string(),
            changes: vec![AttributeChange {
                op: ChangeOp::Replace,
                attr: "mail".to_string(),
                values: vec!["ivanov@x".to_string()],
            }],
        };
        let Artifact::Record(record) = translate(&config(), intent).unwrap() else {
            panic!("expected a change record");
        };
        assert_eq!(
            record.render(),
            "dn: CN=ivanov,CN=Users,DC=example,DC=local\n\
             changetype: modify\n\
             replace: mail\n\
             mail: ivanov@x\n\
             -\n"
        );
    }

    #[test]
    fn dns_intent_translates_to_phrase() {
        let intent = Intent::DnsRecordAdd {
            server: "dc1.example.local".to_string(),
            zone: "example.local".to_string(),
            name: "www".to_string(),
            record_type: RecordType::A,
            data: "192.168.1.10".to_string(),
            ttl: None,
        };
        let Artifact::Phrase(phrase) = translate(&config(), intent).unwrap() else {
            panic!("expected a phrase");
        };
        assert_eq!(phrase.tokens()[0], "samba-tool");
        assert_eq!(phrase.tokens()[2], "add");
    }

    #[test]
    fn dhcp_update_touches_only_named_fields() {
        let current = "subnet 192.168.1.0 netmask 255.255.255.0 {\n    range 192.168.1.100 192.168.1.200;\n    option routers 192.168.1.1;\n}\n";
        let intent = Intent::DhcpSubnetUpdate {
            current_config: current.to_string(),
            network: "192.168.1.0".to_string(),
            netmask: "255.255.255.0".to_string(),
            patch: SubnetPatch {
                range: Some(("192.168.1.100".to_string(), "192.168.1.150".to_string())),
                ..SubnetPatch::default()
            },
        };
        let Artifact::Config(change) = translate(&config(), intent).unwrap() else {
            panic!("expected a config change");
        };
        assert_eq!(
            change.text(),
            current.replace("192.168.1.200", "192.168.1.150")
        );
        assert_eq!(change.original, current);
    }

    #[test]
    fn intents_deserialize_from_tagged_json() {
        let intent: Intent = serde_json::from_str(
            r#"{
                "intent": "dns-record-add",
                "server": "dc1.example.local",
                "zone": "example.local",
                "name": "mail",
                "record_type": "MX",
                "data": "10 mail.example.local"
            }"#,
        )
        .unwrap();
        assert!(matches!(intent, Intent::DnsRecordAdd { .. }));

        let intent: Intent = serde_json::from_str(
            r#"{
                "intent": "user-create",
                "sam_account_name": "ivanov",
                "cn": "Ivan Ivanov",
                "password": "P@ssw0rd!"
            }"#,
        )
        .unwrap();
        let Artifact::Record(record) = translate(&config(), intent).unwrap() else {
            panic!("expected a change record");
        };
        assert!(record
            .render()
            .starts_with("dn: CN=Ivan Ivanov,CN=Users,DC=example,DC=local\n"));
    }

    #[test]
    fn translation_is_idempotent() {
        let intent = Intent::PasswordChange {
            dn: "CN=a,DC=b".to_string(),
            password: "secret".to_string(),
        };
        let first = translate(&config(), intent.clone()).unwrap();
        let second = translate(&config(), intent).unwrap();
        let (Artifact::Record(a), Artifact::Record(b)) = (first, second) else {
            panic!("expected change records");
        };
        assert_eq!(a.render(), b.render());
    }
}
