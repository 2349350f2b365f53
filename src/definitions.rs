mod definition;
mod factory;
mod resource;

pub use definition::*;
pub use factory::*;
pub use resource::*;
