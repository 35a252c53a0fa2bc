//! Impls - concrete ports.
//!
//! - **MoltbookClient**: the real platform over HTTPS
//! - **InMemoryPlatform**: tests and local dry runs

pub mod inmem_platform;
pub mod moltbook;

pub use self::inmem_platform::InMemoryPlatform;
pub use self::moltbook::MoltbookClient;
