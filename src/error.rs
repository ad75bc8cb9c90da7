use std::time::Duration;

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the plugin core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Master or node start was requested twice on the same plugin.
    #[error("{0} already started")]
    AlreadyStarted(&'static str),

    /// A pod operation needed the MTU before the node was started.
    #[error("node has not been started")]
    NodeNotStarted,

    /// The pod registry has no record of the pod.
    #[error("failed to retrieve pod {namespace}/{name}")]
    PodNotFound { namespace: String, name: String },

    /// The tenant map has no VNID for the namespace.
    #[error("error fetching VNID for namespace: {0}")]
    VnidNotFound(String),

    /// A bandwidth annotation could not be parsed.
    #[error("invalid {field} quantity {value:?}: {reason}")]
    InvalidQuantity {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// A bandwidth annotation parsed but fell outside the accepted range.
    #[error("{field} value {value} is unreasonably {bound}")]
    BandwidthOutOfRange {
        field: &'static str,
        value: i64,
        bound: &'static str,
    },

    /// Bandwidth extraction failed for a pod; wraps the field error.
    #[error("failed to parse pod {namespace}/{name} ingress/egress quantity: {source}")]
    Bandwidth {
        namespace: String,
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// The agent executable could not be started.
    #[error("failed to run {program} {command}: {source}")]
    AgentSpawn {
        program: String,
        command: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The agent exited with a non-zero status.
    #[error("{command} failed with {}: {output}", describe_exit(.code))]
    AgentFailed {
        command: &'static str,
        code: Option<i32>,
        output: String,
    },

    /// The agent did not finish before the configured deadline.
    #[error("{command} timed out after {duration:?}")]
    AgentTimeout {
        command: &'static str,
        duration: Duration,
    },

    /// A collaborator (subnet controller, VNID controller, pod registry) failed.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "termination by signal".to_string(),
    }
}
