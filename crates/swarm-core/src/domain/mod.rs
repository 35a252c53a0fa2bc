//! Domain model: ids, tasks, capability tags, claim/delivery records, lease state.
//!
//! Nothing in here talks to the network or reads a clock on its own; time is
//! always passed in.

pub mod capability;
pub mod delivery;
pub mod errors;
pub mod ids;
pub mod lease;
pub mod post;
pub mod task;
pub mod timestamp;

pub use capability::{default_tag, normalize_tag};
pub use delivery::{ClaimRecord, Delivery, DeliveryStatus};
pub use errors::{DecodeError, HandlerError};
pub use ids::{CommentId, JobId, PostId};
pub use lease::LeaseState;
pub use post::{Author, Comment, Post};
pub use task::{PROTOCOL_VERSION, Provenance, TaskDescriptor, TaskSpec};
pub use timestamp::parse_timestamp;
