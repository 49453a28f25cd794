//! Pure Rust async implementation of the UT2004 server query protocol.
//!
//! Three requests go out over one UDP association (server info, game info,
//! player info) and the three replies are decoded into a single
//! [info::ServerInfo].
pub mod error;
pub mod info;
pub mod packet;
pub mod parse;
pub mod query;

pub use error::QueryError;
pub use info::{PlayerInfo, ServerInfo};
pub use query::{query, QueryConfig, QueryHandle, QuerySession};
