mod error;
mod interface;
mod service;

pub use error::*;
pub use interface::*;
pub use service::*;
