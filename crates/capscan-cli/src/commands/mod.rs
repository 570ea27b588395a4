//! Command implementations.

pub mod extract;
pub mod history;
pub mod init;

pub use self::extract::execute_extract;
pub use self::history::execute_history;
pub use self::init::execute_init;
