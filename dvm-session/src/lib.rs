#![feature(try_blocks)]

//! The peer-to-master session core: state machine, listen/maintenance
//! tasks, opcode dispatch, and the data model behind them. `spec.md` §3,
//! §4.10, §5.

pub mod events;
pub mod session;
pub mod state;

pub use events::{DisconnectReason, KeyResponse, ProtocolEvent};
pub use session::{Session, MAX_MISSED_PEER_PINGS};
pub use state::{ChannelInfo, ConnectionState, PeerDetails, PeerInformation, RconInfo, SiteInfo};
