mod arg;
mod request;
mod source;

pub use arg::*;
pub use request::*;
pub use source::*;
