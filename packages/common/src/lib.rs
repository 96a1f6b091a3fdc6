pub mod filesystem;
pub mod location;
pub mod visitor;

pub use filesystem::*;
pub use location::*;
pub use visitor::*;
