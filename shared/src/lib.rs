pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod protocol;

pub use config::*;
pub use error::*;
pub use models::*;
pub use protocol::*;

#[doc(hidden)]
pub use paste;
