use crate::error::Error;
use crate::ldif::Dn;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type SharedConfig = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Base DN of the directory, e.g. `DC=example,DC=local`.
    pub base_dn: String,
    /// DNS domain used to derive principal names, e.g. `example.local`.
    pub domain: String,
    /// Host the samba-tool and ldapmodify phrases run on.
    pub directory_host: String,
    /// Host holding the DHCP config and lease files.
    pub dhcp_host: String,
    #[serde(default = "default_dhcpd_conf_path")]
    pub dhcpd_conf_path: String,
    #[serde(default = "default_dhcpd_leases_path")]
    pub dhcpd_leases_path: String,
    #[serde(default = "default_dhcp_reload_unit")]
    pub dhcp_reload_unit: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout: Duration,
}

fn default_dhcpd_conf_path() -> String {
    "/etc/dhcp/dhcpd.conf".to_string()
}

fn default_dhcpd_leases_path() -> String {
    "/var/lib/dhcp/dhcpd.leases".to_string()
}

fn default_dhcp_reload_unit() -> String {
    "isc-dhcp-server".to_string()
}

fn default_exec_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    /// Load a config from a JSON file, validating the base DN on the way in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] when the file can't be read, [`Error::InvalidJSON`]
    /// when it doesn't parse, and a DN error when `base_dn` is malformed.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.base_dn.parse::<Dn>()?;
        Ok(conf)
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Config {
            base_dn: "DC=example,DC=local".to_string(),
            domain: "example.local".to_string(),
            directory_host: "dc1.example.local".to_string(),
            dhcp_host: "dhcp1.example.local".to_string(),
            dhcpd_conf_path: default_dhcpd_conf_path(),
            dhcpd_leases_path: default_dhcpd_leases_path(),
            dhcp_reload_unit: default_dhcp_reload_unit(),
            exec_timeout: default_exec_timeout(),
        }
    }
}
