pub mod spool;

pub use spool::{check_spool, EventSpool, SpoolPass};
