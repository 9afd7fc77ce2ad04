pub mod mem;
pub mod scoped;
pub mod ttl;
