pub mod hub;
pub mod msg_handler;
pub mod session;

pub use hub::{Hub, HubError, HubHandle, HubStats, SessionId, SessionInfo};
pub use msg_handler::MessageHandler;
pub use session::{run_session, SessionSettings};
