//! App - application layer
//!
//! Combines the ports into the running node.
//!
//! # Components
//! - **NodeBuilder**: wiring and fail-fast validation
//! - **WorkerLoop**: discover, claim, execute, deliver
//! - **SwarmNode**: the loop on its own task, with a stop handle
//! - **TaskPublisher**: posts new tasks
//! - **IterationReport**: per-iteration counters

pub mod builder;
pub mod node;
pub mod publisher;
pub mod status;
pub mod worker_loop;

pub use self::builder::{BuildError, NodeBuilder};
pub use self::node::{NodeHandle, SwarmNode};
pub use self::publisher::{PublishedTask, TaskPublisher};
pub use self::status::IterationReport;
pub use self::worker_loop::{NodeSettings, TaskOutcome, WorkerLoop};
