pub mod family;
pub mod interface_resolver;
pub mod key_locks;
pub mod lease_handler;
pub mod lease_processor;
pub mod subnet_resolver;

pub use interface_resolver::{InterfaceResolver, InterfaceSet};
pub use key_locks::KeyedLocks;
pub use lease_processor::{LeaseOutcome, LeaseProcessor};
pub use subnet_resolver::SubnetResolver;
