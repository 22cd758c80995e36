pub mod command;
pub mod messages;
pub mod report;
pub mod server;

pub use command::{CommandError, Override};
pub use messages::MessageBoard;
pub use report::{sexagesimal, Level, ValueWriter};
pub use server::{router, run_server, ControlHandle, ControlRequest};
