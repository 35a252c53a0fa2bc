//! NodeBuilder - wiring a node together
//!
//! Validation happens at build time (fail fast): a node without skills, or
//! one missing a capability the operator said it must have, never starts.

use std::sync::Arc;

use super::node::SwarmNode;
use super::worker_loop::{NodeSettings, WorkerLoop};
use crate::config::SwarmConfig;
use crate::domain::capability::normalize_tag;
use crate::error::SwarmError;
use crate::impls::MoltbookClient;
use crate::ports::{Clock, Platform, SystemClock};
use crate::skills::{Skill, SkillHandler, SkillRegistry};

/// # Example
/// ```ignore
/// let node = NodeBuilder::new()
///     .platform(Arc::new(client))
///     .register("code", CodeHandler)
///     .expect_capabilities(&["#SKILL_CODE"])
///     .build()?;
/// let handle = node.start().await;
/// ```
pub struct NodeBuilder {
    platform: Option<Arc<dyn Platform>>,
    clock: Arc<dyn Clock>,
    registry: SkillRegistry,
    settings: NodeSettings,
    expected_capabilities: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no platform configured")]
    MissingPlatform,

    #[error("no skills registered")]
    NoSkills,

    #[error("missing capabilities: {0:?}. These tags were expected but no registered skill advertises them.")]
    MissingCapabilities(Vec<String>),
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self {
            platform: None,
            clock: Arc::new(SystemClock),
            registry: SkillRegistry::new(),
            settings: NodeSettings::default(),
            expected_capabilities: None,
        }
    }

    /// Builder talking to the real platform with settings from `config`.
    pub fn from_config(config: &SwarmConfig) -> Result<Self, SwarmError> {
        let client = MoltbookClient::from_config(&config.moltbook)?;
        Ok(Self::new()
            .platform(Arc::new(client))
            .settings(NodeSettings::from_config(&config.node)))
    }

    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(mut self, settings: NodeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Register `handler` under `name` with its default tag.
    pub fn register(mut self, name: impl Into<String>, handler: impl SkillHandler + 'static) -> Self {
        self.registry.register(name, handler);
        self
    }

    pub fn register_skill(mut self, skill: Skill) -> Self {
        self.registry.register_skill(skill);
        self
    }

    /// Tags the node must be able to serve; checked in `build()`.
    pub fn expect_capabilities(mut self, tags: &[&str]) -> Self {
        self.expected_capabilities = Some(tags.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<SwarmNode, BuildError> {
        let platform = self.platform.ok_or(BuildError::MissingPlatform)?;
        if self.registry.is_empty() {
            return Err(BuildError::NoSkills);
        }

        if let Some(expected) = &self.expected_capabilities {
            let missing: Vec<String> = expected
                .iter()
                .filter(|tag| !self.registry.can_handle(&[tag.as_str()]))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingCapabilities(missing));
            }
        }

        let mut settings = self.settings;
        settings.capabilities.retain(|t| !normalize_tag(t).is_empty());
        if settings.capabilities.is_empty() {
            settings.capabilities = self.registry.tags();
        }

        let worker = WorkerLoop::new(platform, Arc::new(self.registry), self.clock, settings);
        Ok(SwarmNode::new(worker))
    }
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HandlerError, TaskDescriptor};
    use crate::impls::InMemoryPlatform;
    use crate::skills::handler_fn;

    fn echo() -> impl SkillHandler {
        handler_fn(|t: TaskDescriptor| async move { Ok::<_, HandlerError>(t.title().to_string()) })
    }

    fn platform() -> Arc<dyn Platform> {
        Arc::new(InMemoryPlatform::new(Arc::new(SystemClock)))
    }

    #[test]
    fn build_success() {
        let node = NodeBuilder::new()
            .platform(platform())
            .register("code", echo())
            .expect_capabilities(&["#SKILL_CODE"])
            .build();
        assert!(node.is_ok());
    }

    #[test]
    fn build_missing_capabilities() {
        let node = NodeBuilder::new()
            .platform(platform())
            .register("code", echo())
            .expect_capabilities(&["#SKILL_CODE", "#SKILL_RUST"])
            .build();
        assert!(matches!(
            node,
            Err(BuildError::MissingCapabilities(missing)) if missing == vec!["#SKILL_RUST".to_string()]
        ));
    }

    #[test]
    fn build_requires_platform_and_skills() {
        assert!(matches!(
            NodeBuilder::new().register("code", echo()).build(),
            Err(BuildError::MissingPlatform)
        ));
        assert!(matches!(
            NodeBuilder::new().platform(platform()).build(),
            Err(BuildError::NoSkills)
        ));
    }

    #[test]
    fn empty_capabilities_fall_back_to_registry_tags() {
        let node = NodeBuilder::new()
            .platform(platform())
            .register_skill(Skill::new("py", echo()).with_tags(["#SKILL_PYTHON", "#SKILL_CODE"]))
            .settings(NodeSettings {
                capabilities: vec![String::new()],
                description: "Writes code".into(),
                ..NodeSettings::default()
            })
            .build()
            .unwrap();
        assert_eq!(node.worker().settings().capabilities, ["#SKILL_PYTHON", "#SKILL_CODE"]);
        assert_eq!(node.profile_description(), "Writes code\n\nSkills: #SKILL_PYTHON, #SKILL_CODE");
    }
}
