pub mod error;
mod features;
mod host;
mod options;

pub use crate::features::{Feature, supports};
pub use crate::host::{HostConfig, MAX_PAYLOAD_BYTES};
pub use crate::options::{DEFAULT_HOST, DEFAULT_SDK_VERSION, MIN_CHANNEL_LENGTH, Options};
