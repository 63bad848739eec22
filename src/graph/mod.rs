pub mod collapse;
pub mod expand;
pub mod meta;
mod store;
pub mod visible;

pub use store::{GraphStore, Link, NodeRecord};
