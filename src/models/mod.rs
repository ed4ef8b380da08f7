pub mod environ;
pub mod error;
pub mod event;

pub use environ::Environ;
pub use error::AdapterError;
pub use event::{Identity, InvocationEvent, InvocationResponse, RequestContext};
