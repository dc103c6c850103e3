pub mod registry;
pub mod state;

pub use registry::{BindingId, ExternalRegistry};
pub use state::{release_text, ExternalState, NativeError, NativeFunction, NativeResult};
