use crate::error::Error;
use crate::executor::{ExecOutput, RemoteExecutor};
use crate::phrase::CommandPhrase;
use std::collections::HashMap;
use std::io;
use tokio::sync::RwLock;

/// A transport backed by in-process maps. Commands succeed with empty output
/// unless their first token matches a configured failure, files live in a
/// `(host, path)` map. Not durable, test use only.
#[derive(Default, Debug)]
pub struct InMemoryExecutor {
    files: RwLock<HashMap<(String, String), String>>,
    commands: RwLock<Vec<(String, Vec<String>)>>,
    fail_token: RwLock<Option<String>>,
}

impl InMemoryExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file as if it already existed on the host.
    pub async fn seed_file(&self, host: &str, path: &str, contents: &str) {
        self.files
            .write()
            .await
            .insert((host.to_string(), path.to_string()), contents.to_string());
    }

    /// Make every subsequent command whose tokens contain `token` exit 1.
    pub async fn fail_commands_containing(&self, token: &str) {
        *self.fail_token.write().await = Some(token.to_string());
    }

    /// Every command run so far, as `(host, tokens)` pairs in order.
    pub async fn command_log(&self) -> Vec<(String, Vec<String>)> {
        self.commands.read().await.clone()
    }

    pub async fn file(&self, host: &str, path: &str) -> Option<String> {
        self.files
            .read()
            .await
            .get(&(host.to_string(), path.to_string()))
            .cloned()
    }
}

#[async_trait::async_trait]
impl RemoteExecutor for InMemoryExecutor {
    async fn run(&self, host: &str, phrase: &CommandPhrase) -> Result<ExecOutput, Error> {
        let tokens: Vec<String> = phrase.tokens().to_vec();
        self.commands
            .write()
            .await
            .push((host.to_string(), tokens.clone()));
        let failed = match self.fail_token.read().await.as_deref() {
            Some(token) => tokens.iter().any(|t| t == token),
            None => false,
        };
        if failed {
            return Ok(ExecOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: format!("simulated failure: {}", tokens.join(" ")),
            });
        }
        Ok(ExecOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn fetch(&self, host: &str, path: &str) -> Result<String, Error> {
        self.files
            .read()
            .await
            .get(&(host.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| {
                Error::IO(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{host}:{path}"),
                ))
            })
    }

    async fn put(&self, host: &str, path: &str, contents: &str) -> Result<(), Error> {
        self.files
            .write()
            .await
            .insert((host.to_string(), path.to_string()), contents.to_string());
        Ok(())
    }
}
