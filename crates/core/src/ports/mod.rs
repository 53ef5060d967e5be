mod filter;
mod node;
mod pagination;
mod range;
mod repository;

pub use filter::*;
pub use node::*;
pub use pagination::*;
pub use range::*;
pub use repository::*;
