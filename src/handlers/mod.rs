pub mod analyze;
pub mod config;
pub mod debug;
pub mod session;

pub use analyze::*;
pub use config::*;
pub use debug::*;
pub use session::*;