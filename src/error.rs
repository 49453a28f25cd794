use std::io;

use thiserror::Error;

use crate::info::ServerInfo;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("address `{0}` has no port separator")]
    InvalidAddress(String),
    #[error("failed to bind a local port: {0}")]
    FailedPortBind(#[source] io::Error),
    #[error("host is unreachable: {0}")]
    UnreachableHost(#[source] io::Error),
    #[error("failed to send request: {0}")]
    SendError(#[source] io::Error),
    /// A receive failed or timed out. `partial` holds whatever the replies
    /// received before the failure filled in.
    #[error("received {received} of 3 replies before failing: {cause}")]
    Incomplete {
        received: usize,
        partial: Box<ServerInfo>,
        #[source]
        cause: io::Error,
    },
    #[error("packet truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("query task was aborted before it finished")]
    Aborted,
}

impl QueryError {
    /// The partially populated [ServerInfo] of a failed receive loop, if any.
    pub fn partial(&self) -> Option<&ServerInfo> {
        match self {
            QueryError::Incomplete { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// True if this error came from a receive hitting its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            QueryError::Incomplete { cause, .. } if cause.kind() == io::ErrorKind::TimedOut
        )
    }
}
