pub mod chain;
pub mod handle;
pub mod status;
pub mod types;

pub use handle::{ObjectType, RealId, SurrogateId};
pub use status::Status;
