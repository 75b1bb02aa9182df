pub mod combine;
pub mod error;
pub mod remote;
pub mod subprocess;
pub mod transform;

pub use combine::{combine, run_both};
pub use error::WorkerError;
pub use remote::RemoteTransform;
pub use subprocess::SubprocessTransform;
pub use transform::Transform;
