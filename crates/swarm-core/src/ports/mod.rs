//! Ports - abstraction layer
//!
//! Each trait here is the interface to something outside the node: the
//! social platform, the wall clock, id generation. `impls` provides the
//! concrete versions.

pub mod clock;
pub mod id_generator;
pub mod platform;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::platform::{CommentSort, FeedSort, Platform, PlatformError};
