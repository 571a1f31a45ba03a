pub mod first;
pub mod third;

pub use first::{FirstPersonIdentity, RequestEnvelope};
pub use third::ThirdPersonIdentity;
