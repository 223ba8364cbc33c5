//! Artifact application.
//!
//! [`Applier`] closes the loop from intent to managed host: it translates
//! an [`Intent`] and carries the resulting artifact over a
//! [`RemoteExecutor`]. Directory records go through `ldapmodify` on the
//! directory host, command phrases run as-is, and DHCP config edits follow
//! a fetch, stage, validate, install, reload sequence under a lock so two
//! edits can't interleave on the same file.

use crate::config::SharedConfig;
use crate::error::Error;
use crate::executor::{DynExecutor, ExecOutput};
use crate::intent::{Artifact, Intent};
use crate::phrase::CommandPhrase;
use crate::{intent, ldif};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// What applying an intent did on the remote side.
#[derive(Debug, Clone)]
pub enum Applied {
    /// A directory change record was pushed through `ldapmodify`.
    Directory { record: ldif::ChangeRecord },
    /// A command phrase ran; its output is returned verbatim.
    Command { output: ExecOutput },
    /// The DHCP config was rewritten and the service reloaded.
    DhcpConfig { new_text: String },
}

pub struct Applier {
    config: SharedConfig,
    executor: DynExecutor,
    // Serializes the fetch/edit/install cycle on the DHCP config file.
    dhcp_lock: Mutex<()>,
}

impl Applier {
    #[must_use]
    pub fn new(config: SharedConfig, executor: DynExecutor) -> Self {
        Applier {
            config,
            executor,
            dhcp_lock: Mutex::new(()),
        }
    }

    /// Translate an intent and apply the artifact to the managed hosts.
    ///
    /// # Errors
    ///
    /// Propagates translation errors unchanged. Remote failures surface as
    /// [`Error::CommandFailed`], [`Error::Timeout`] or [`Error::IO`]. A DHCP
    /// edit that fails validation never reaches the live config path.
    pub async fn apply(&self, intent: Intent) -> Result<Applied, Error> {
        if intent.edits_dhcp_config() {
            return self.apply_dhcp(intent).await;
        }
        match intent::translate(&self.config, intent)? {
            Artifact::Record(record) => self.apply_record(record).await,
            Artifact::Phrase(phrase) => {
                let output = self
                    .run(&self.config.directory_host, &phrase)
                    .await?
                    .into_result()?;
                Ok(Applied::Command { output })
            }
            // edits_dhcp_config covered every config-producing intent
            Artifact::Config(_) => unreachable!("config artifact outside the DHCP path"),
        }
    }

    async fn apply_record(&self, record: ldif::ChangeRecord) -> Result<Applied, Error> {
        let host = &self.config.directory_host;
        let stage = stage_path("ldif");
        self.executor.put(host, &stage, &record.render()).await?;
        let result = self
            .run(
                host,
                &CommandPhrase::new(["ldapmodify", "-H", "ldapi:///", "-f", stage.as_str()]),
            )
            .await
            .and_then(ExecOutput::into_result);
        // Best-effort cleanup of the staged record either way.
        let _ = self
            .run(host, &CommandPhrase::new(["rm", "-f", stage.as_str()]))
            .await;
        result?;
        tracing::info!(host = host.as_str(), "directory change applied");
        Ok(Applied::Directory { record })
    }

    async fn apply_dhcp(&self, mut intent: Intent) -> Result<Applied, Error> {
        let _guard = self.dhcp_lock.lock().await;
        let host = &self.config.dhcp_host;
        let conf_path = &self.config.dhcpd_conf_path;

        let current = self.executor.fetch(host, conf_path).await?;
        intent.set_current_config(current);
        let Artifact::Config(change) = intent::translate(&self.config, intent)? else {
            unreachable!("DHCP intent produced a non-config artifact");
        };
        let new_text = change.text();

        let stage = format!("{conf_path}.candidate");
        self.executor.put(host, &stage, &new_text).await?;
        self.run(
            host,
            &CommandPhrase::new(["dhcpd", "-t", "-cf", stage.as_str()]),
        )
        .await?
        .into_result()?;

        self.executor.put(host, conf_path, &new_text).await?;
        self.run(
            host,
            &CommandPhrase::new([
                "systemctl",
                "reload",
                self.config.dhcp_reload_unit.as_str(),
            ]),
        )
        .await?
        .into_result()?;
        tracing::info!(
            host = host.as_str(),
            path = conf_path.as_str(),
            "dhcp config installed"
        );
        Ok(Applied::DhcpConfig { new_text })
    }

    async fn run(&self, host: &str, phrase: &CommandPhrase) -> Result<ExecOutput, Error> {
        let timeout = self.config.exec_timeout;
        tracing::debug!(host, tokens = ?phrase.tokens(), "running remote command");
        tokio::time::timeout(timeout, self.executor.run(host, phrase))
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }
}

fn stage_path(suffix: &str) -> String {
    let n = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("/tmp/dirforge-{n}.{suffix}")
}
