pub mod cli;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod project;
pub mod reason;
pub mod request;
pub mod response;
pub mod token;
pub mod transport;

pub use command::{Action, Command, Flags};
pub use config::{Config, Credentials};
pub use dispatch::{Dispatcher, Report};
pub use error::{MagikError, Result};
pub use project::Endpoint;
pub use response::{ApiResponse, Outcome};
pub use transport::{HttpTransport, Mode, Transport};
