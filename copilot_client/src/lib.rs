//! Command/status synchronization with a CNC controller.
//!
//! ```text
//!   caller ──send_*──► Session ──CommandMessage──► Transport ──► controller
//!                         ▲                           │
//!                         └──── StatusSnapshot ◄──────┘ (polled)
//! ```
//!
//! - [`transport`]: the [`Transport`] trait, its shared-memory and pub/sub
//!   implementations, and connect-with-retry.
//! - [`session`]: [`Session`], one `send_*` per operator action plus the
//!   receipt/completion wait.
//! - [`wait`]: the [`CommandTracker`] state machine behind every wait.
//! - [`worker`]: [`SessionWorker`], a session on a background thread with
//!   results delivered as futures.

pub mod error;
pub mod messages;
pub mod session;
pub mod transport;
pub mod wait;
pub mod worker;

pub use error::{ConnectError, SessionError, TransportError, ValidationError, status_code};
pub use messages::OperatorMessages;
pub use session::{Session, SessionSettings};
pub use transport::{PubSubTransport, ShmTransport, StatusPoll, Transport, connect_with_retry};
pub use wait::{CommandTracker, TrackerState};
pub use worker::{Reply, SessionWorker};
