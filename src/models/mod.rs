pub mod health;
pub mod messages;
pub mod node;
pub mod room;
pub mod diagnostics;
pub mod error;

pub use health::*;
pub use messages::*;
pub use node::*;
pub use room::*;
pub use diagnostics::*;
pub use error::*;
