mod types;

pub use types::{IoError, Result, RtioError};
