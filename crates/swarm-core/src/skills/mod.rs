//! Skills: handler contract and the registry the worker loop consults.

pub mod handler;
pub mod registry;

pub use handler::{FnHandler, SkillHandler, handler_fn};
pub use registry::{Skill, SkillRegistry};
