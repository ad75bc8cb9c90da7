//! The contract with the external provisioning agent.
//!
//! Every pod operation ends in exactly one agent invocation of the form
//! `openshift-sdn-ovs <command> <args...>` with a fixed argument count per
//! command. The agent's output is only logged; its exit status is the result.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

/// Executable name of the provisioning agent.
pub const AGENT_EXECUTABLE: &str = "openshift-sdn-ovs";

const SETUP_CMD: &str = "setup";
const TEARDOWN_CMD: &str = "teardown";
const UPDATE_CMD: &str = "update";

/// Placeholder for the network parameters teardown does not need.
const TEARDOWN_SENTINEL: &str = "-1";

/// A single agent request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand {
    /// `setup <container-id> <vnid> <ingress> <egress> <mtu>`
    Setup {
        container_id: String,
        vnid: String,
        ingress: String,
        egress: String,
        mtu: u32,
    },
    /// `teardown <container-id> -1 -1 -1`
    ///
    /// Older callers passed a fourth `-1`. The agent reads none of the
    /// sentinels on teardown, so either arity works.
    Teardown { container_id: String },
    /// `update <container-id> <vnid>`
    Update { container_id: String, vnid: String },
}

impl AgentCommand {
    /// Command word passed as the agent's first argument
    pub fn name(&self) -> &'static str {
        match self {
            AgentCommand::Setup { .. } => SETUP_CMD,
            AgentCommand::Teardown { .. } => TEARDOWN_CMD,
            AgentCommand::Update { .. } => UPDATE_CMD,
        }
    }

    /// Container the command applies to
    pub fn container_id(&self) -> &str {
        match self {
            AgentCommand::Setup { container_id, .. }
            | AgentCommand::Teardown { container_id }
            | AgentCommand::Update { container_id, .. } => container_id,
        }
    }

    /// Positional arguments following the command word
    pub fn args(&self) -> Vec<String> {
        match self {
            AgentCommand::Setup {
                container_id,
                vnid,
                ingress,
                egress,
                mtu,
            } => vec![
                container_id.clone(),
                vnid.clone(),
                ingress.clone(),
                egress.clone(),
                mtu.to_string(),
            ],
            AgentCommand::Teardown { container_id } => vec![
                container_id.clone(),
                TEARDOWN_SENTINEL.to_string(),
                TEARDOWN_SENTINEL.to_string(),
                TEARDOWN_SENTINEL.to_string(),
            ],
            AgentCommand::Update { container_id, vnid } => {
                vec![container_id.clone(), vnid.clone()]
            }
        }
    }

    /// Command word followed by the positional arguments
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.name().to_string()];
        argv.extend(self.args());
        argv
    }
}

/// What came back from one agent run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutput {
    /// Exit code, `None` if the agent was killed by a signal
    pub code: Option<i32>,
    /// Combined stdout and stderr, for diagnostics only
    pub output: String,
}

impl AgentOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs agent commands.
///
/// Implementations must not interpret the output; callers decide success from
/// [`AgentOutput::code`] alone.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, command: &AgentCommand) -> Result<AgentOutput>;
}

/// Runs the agent as a child process
#[derive(Debug, Clone)]
pub struct ProcessAgent {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessAgent {
    /// Run [`AGENT_EXECUTABLE`] from `PATH`, optionally bounded by `timeout`
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::with_program(AGENT_EXECUTABLE, timeout)
    }

    /// Run the agent from an explicit location
    pub fn with_program(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AgentRunner for ProcessAgent {
    async fn run(&self, command: &AgentCommand) -> Result<AgentOutput> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.arg(command.name())
            .args(command.args())
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(duration) => tokio::time::timeout(duration, cmd.output())
                .await
                .map_err(|_| Error::AgentTimeout {
                    command: command.name(),
                    duration,
                })?,
            None => cmd.output().await,
        }
        .map_err(|source| Error::AgentSpawn {
            program: self.program.display().to_string(),
            command: command.name(),
            source,
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(AgentOutput {
            code: output.status.code(),
            output: combined,
        })
    }
}

/// Run one command and turn a non-zero exit into [`Error::AgentFailed`]
pub async fn invoke(runner: &dyn AgentRunner, command: &AgentCommand) -> Result<()> {
    let result = runner.run(command).await;
    match &result {
        Ok(out) => debug!(
            command = command.name(),
            container_id = command.container_id(),
            code = ?out.code,
            "network plugin output: {}",
            out.output
        ),
        Err(err) => debug!(
            command = command.name(),
            container_id = command.container_id(),
            "network plugin error: {}",
            err
        ),
    }

    let out = result?;
    if out.success() {
        Ok(())
    } else {
        Err(Error::AgentFailed {
            command: command.name(),
            code: out.code,
            output: out.output,
        })
    }
}
