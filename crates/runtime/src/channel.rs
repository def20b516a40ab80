use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uiaquery_script::decode_command;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("remote command failed: {0}")]
    Failed(String),

    /// The command may or may not have run on the host.
    #[error("remote command did not finish within {0:?}")]
    Timeout(Duration),

    #[error("command channel is closed")]
    Closed,
}

/// Transport to the remote scripting host.
///
/// `execute` sends one wrapped command and returns everything the host wrote
/// to its output stream. Framing, process lifecycle and recovery belong to the
/// implementation.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn execute(&self, command: &str) -> Result<String, ChannelError>;
}

type Responder = Box<dyn Fn(&str) -> Result<String, ChannelError> + Send + Sync>;

/// A channel that answers from a closure and records every command.
///
/// The responder sees the readable script (the command with its base64
/// wrapping removed), so answers can be chosen by what a query asks for.
pub struct ReplayChannel {
    responder: Responder,
    recorded: Mutex<Vec<String>>,
}

impl ReplayChannel {
    pub fn new(responder: impl Fn(&str) -> Result<String, ChannelError> + Send + Sync + 'static) -> Self {
        Self { responder: Box::new(responder), recorded: Mutex::new(Vec::new()) }
    }

    /// Answer every command with the same output.
    pub fn constant(output: impl Into<String>) -> Self {
        let output = output.into();
        Self::new(move |_| Ok(output.clone()))
    }

    /// Answer commands with `outputs` in order, then with empty output.
    pub fn sequence<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue: Mutex<std::collections::VecDeque<String>> =
            Mutex::new(outputs.into_iter().map(Into::into).collect());
        Self::new(move |_| Ok(queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front().unwrap_or_default()))
    }

    /// Raw commands in the order they were sent.
    pub fn commands(&self) -> Vec<String> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Readable scripts in the order they were sent.
    pub fn scripts(&self) -> Vec<String> {
        self.commands().iter().map(|command| unwrap_script(command)).collect()
    }

    pub fn call_count(&self) -> usize {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl std::fmt::Debug for ReplayChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayChannel").field("calls", &self.call_count()).finish_non_exhaustive()
    }
}

#[async_trait]
impl CommandChannel for ReplayChannel {
    async fn execute(&self, command: &str) -> Result<String, ChannelError> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).push(command.to_owned());
        (self.responder)(&unwrap_script(command))
    }
}

fn unwrap_script(command: &str) -> String {
    decode_command(command).unwrap_or_else(|_| command.to_owned())
}
