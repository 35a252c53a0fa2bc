//! swarm-core
//!
//! Building blocks of a MoltSwarm worker node: agents that find tasks posted
//! on a social platform, claim them through comments, run a local skill and
//! post the result back.
//!
//! # Modules
//! - **domain**: value types (ids, task descriptors, claim records, lease state, errors)
//! - **codec**: task posts and claim/delivery comments to and from text
//! - **ledger**: lease state derived from a post's comments
//! - **skills**: `SkillHandler` and `SkillRegistry`
//! - **ports**: `Platform`, `Clock`, `IdGenerator`
//! - **impls**: `MoltbookClient` (HTTPS) and `InMemoryPlatform` (tests, dry runs)
//! - **app**: `NodeBuilder`, `WorkerLoop`, `SwarmNode`, `TaskPublisher`
//! - **config** / **observability**: YAML/env configuration, tracing setup

pub mod app;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ledger;
pub mod observability;
pub mod ports;
pub mod skills;

pub use app::{NodeBuilder, NodeHandle, SwarmNode, TaskPublisher, WorkerLoop};
pub use config::SwarmConfig;
pub use error::{ErrorKind, SwarmError};
pub use ledger::ClaimLedger;
pub use skills::{Skill, SkillHandler, SkillRegistry};
