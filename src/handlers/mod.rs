pub mod health;
pub mod ws_connect;
pub mod room_users;
pub mod nodes;
pub mod diagnostics;

pub use health::*;
pub use ws_connect::*;
pub use room_users::*;
pub use nodes::*;
pub use diagnostics::*;
