use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::{debug, warn};
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::QueryError;
use crate::info::ServerInfo;
use crate::packet::{PacketType, RequestPacket, ResponsePacket, MAX_PACKET_SIZE};

/// Deadline for each individual receive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// Deadline for resolving the host and for each of the three receives.
    pub timeout: Duration,
    /// Size of the receive buffer. Longer datagrams are cut off.
    pub buffer_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            timeout: DEFAULT_TIMEOUT,
            buffer_size: MAX_PACKET_SIZE,
        }
    }
}

impl QueryConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

/// One status exchange with one server.
///
/// [QuerySession::connect] sends all three requests up front;
/// [QuerySession::receive_all] then collects the three replies in whatever
/// order they arrive.
#[derive(Debug)]
pub struct QuerySession {
    sock: UdpSocket,
    target: SocketAddr,
    info: ServerInfo,
    config: QueryConfig,
}

impl QuerySession {
    /// Open a UDP association to `address` (`host:port`) and send the
    /// server-info, game-info and player-info requests, in that order.
    pub async fn connect(address: &str, config: QueryConfig) -> Result<Self, QueryError> {
        let host = host_part(address)?;

        let target = timeout(config.timeout, lookup_host(address))
            .await
            .map_err(|elapsed| {
                QueryError::UnreachableHost(io::Error::new(io::ErrorKind::TimedOut, elapsed))
            })?
            .map_err(QueryError::UnreachableHost)?
            .next()
            .ok_or_else(|| {
                QueryError::UnreachableHost(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no addresses found for {address}"),
                ))
            })?;

        // bind whatever port is free, in the target's address family
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let sock = UdpSocket::bind(local)
            .await
            .map_err(QueryError::FailedPortBind)?;
        sock.connect(target)
            .await
            .map_err(QueryError::UnreachableHost)?;

        for packet_type in PacketType::ALL {
            let request = RequestPacket::new(packet_type);
            sock.send(&request.pack())
                .await
                .map_err(QueryError::SendError)?;
            debug!("[{}] sent {:?} request", target, request.packet_type());
        }

        Ok(QuerySession {
            sock,
            target,
            info: ServerInfo::new(host.to_owned()),
            config,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Receive exactly three datagrams and decode each into the result.
    ///
    /// Stops at the first receive error or timeout and returns
    /// [QueryError::Incomplete] with whatever had been decoded by then.
    /// Datagrams that carry no known header, or whose body is cut short,
    /// still count as one of the three but leave the result untouched.
    pub async fn receive_all(mut self) -> Result<ServerInfo, QueryError> {
        let mut buf = vec![0u8; self.config.buffer_size];

        for received in 0..PacketType::ALL.len() {
            let len = match timeout(self.config.timeout, self.sock.recv(&mut buf)).await {
                Ok(Ok(len)) => len,
                Ok(Err(cause)) => return Err(self.incomplete(received, cause)),
                Err(elapsed) => {
                    let cause = io::Error::new(io::ErrorKind::TimedOut, elapsed);
                    return Err(self.incomplete(received, cause));
                }
            };
            self.handle_datagram(&buf[..len]);
        }

        Ok(self.info)
    }

    /// Run [QuerySession::receive_all] on its own task and report the
    /// outcome through the returned handle.
    pub fn spawn(self) -> QueryHandle {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let outcome = self.receive_all().await;
            // nobody may be waiting anymore
            let _ = tx.send(outcome);
        });

        QueryHandle { rx, task }
    }

    fn handle_datagram(&mut self, datagram: &[u8]) {
        let Some(packet) = ResponsePacket::unpack(datagram) else {
            debug!(
                "[{}] ignoring {} byte datagram with no known header",
                self.target,
                datagram.len()
            );
            return;
        };

        debug!(
            "[{}] received {:?} reply ({} bytes)",
            self.target,
            packet.packet_type(),
            datagram.len()
        );
        if let Err(err) = self.info.apply(&packet) {
            warn!(
                "[{}] discarding malformed {:?} reply: {}",
                self.target,
                packet.packet_type(),
                err
            );
        }
    }

    fn incomplete(self, received: usize, cause: io::Error) -> QueryError {
        debug!(
            "[{}] receive failed after {} replies: {}",
            self.target, received, cause
        );
        QueryError::Incomplete {
            received,
            partial: Box::new(self.info),
            cause,
        }
    }
}

/// Completion signal of a spawned [QuerySession].
#[derive(Debug)]
pub struct QueryHandle {
    rx: oneshot::Receiver<Result<ServerInfo, QueryError>>,
    task: JoinHandle<()>,
}

impl QueryHandle {
    /// Wait for the session to finish.
    pub async fn outcome(self) -> Result<ServerInfo, QueryError> {
        self.rx.await.unwrap_or_else(|_| Err(QueryError::Aborted))
    }

    /// Stop the session without waiting out its remaining receives.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Query `address` (`host:port`) for its server info, game info and players.
///
/// If `timeout_dur` is `Some(Duration)`, each receive will use `timeout_dur`.
/// The default is 2 seconds if `timeout_dur` is `None`.
///
/// Example usage:
/// ```no_run
/// # async fn run() -> Result<(), utquery::error::QueryError> {
/// let info = utquery::query::query("203.0.113.10:7778", None).await?;
/// println!("{} on {} ({}/{})", info.name, info.map, info.players, info.max_players);
/// # Ok(())
/// # }
/// ```
pub async fn query(address: &str, timeout_dur: Option<Duration>) -> Result<ServerInfo, QueryError> {
    let config = QueryConfig::default().with_timeout(timeout_dur.unwrap_or(DEFAULT_TIMEOUT));
    QuerySession::connect(address, config)
        .await?
        .receive_all()
        .await
}

/// Everything before the last `:`, without IPv6 brackets.
fn host_part(address: &str) -> Result<&str, QueryError> {
    let (host, _port) = address
        .rsplit_once(':')
        .ok_or_else(|| QueryError::InvalidAddress(address.to_owned()))?;
    Ok(host.trim_start_matches('[').trim_end_matches(']'))
}
