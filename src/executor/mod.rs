//! Remote command and file transport.
//!
//! Translation produces artifacts; something still has to carry them to the
//! managed hosts. [`RemoteExecutor`] is that seam: run a command phrase,
//! fetch a file, put a file. [`memory::InMemoryExecutor`] backs the tests;
//! production deployments plug in their own transport (SSH, an agent, a
//! local shell on the host itself).

use crate::error::Error;
use crate::phrase::CommandPhrase;
use std::sync::Arc;

pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryExecutor;

/// `DynExecutor` is a type alias for a [`RemoteExecutor`] shared between
/// consumers through an [`Arc`].
#[allow(clippy::module_name_repetitions)]
pub type DynExecutor = Arc<dyn RemoteExecutor + Send + Sync>;

/// Output of one remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convert a non-zero exit into [`Error::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandFailed`] carrying the exit code and stderr.
    pub fn into_result(self) -> Result<ExecOutput, Error> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// An async trait describing the transport to a managed host.
#[async_trait::async_trait]
pub trait RemoteExecutor {
    /// Run a command phrase on the given host.
    async fn run(&self, host: &str, phrase: &CommandPhrase) -> Result<ExecOutput, Error>;

    /// Read a file from the given host.
    async fn fetch(&self, host: &str, path: &str) -> Result<String, Error>;

    /// Write a file on the given host, replacing any existing contents.
    async fn put(&self, host: &str, path: &str, contents: &str) -> Result<(), Error>;
}
