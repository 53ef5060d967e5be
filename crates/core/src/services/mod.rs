mod paginator;
mod resolver;

pub use paginator::*;
pub use resolver::*;
