pub mod error;
pub mod registry;
pub mod traits;

pub use error::{InterceptorError, OperationError};
pub(crate) use error::panic_message;
pub use registry::{Registry, Snapshot};
pub use traits::Interceptor;
