mod discovery;
mod interface;
mod lease;
mod network;

pub use discovery::*;
pub use interface::*;
pub use lease::*;
pub use network::*;
