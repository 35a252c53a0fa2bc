//! SkillRegistry - capability names to handlers and advertised tags.
//!
//! The registry is a plain value owned by the node. It is filled before the
//! loop starts and only read afterwards.

use std::sync::Arc;

use super::handler::SkillHandler;
use crate::domain::capability::{default_tag, intersects, normalize_tag};

/// One registered capability.
#[derive(Clone)]
pub struct Skill {
    name: String,
    description: String,
    tags: Vec<String>,
    handler: Arc<dyn SkillHandler>,
}

impl Skill {
    /// Skill with the default tag derived from `name` (`python` -> `#SKILL_PYTHON`).
    pub fn new(name: impl Into<String>, handler: impl SkillHandler + 'static) -> Self {
        Self::from_arc(name, Arc::new(handler))
    }

    pub fn from_arc(name: impl Into<String>, handler: Arc<dyn SkillHandler>) -> Self {
        let name = name.into();
        Self {
            tags: vec![default_tag(&name)],
            description: String::new(),
            name,
            handler,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the advertised tags. An empty list keeps the default tag.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags
            .into_iter()
            .map(Into::into)
            .filter(|t| !normalize_tag(t).is_empty())
            .collect();
        if !tags.is_empty() {
            self.tags = tags;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn handler(&self) -> Arc<dyn SkillHandler> {
        Arc::clone(&self.handler)
    }

    fn matches<S: AsRef<str>>(&self, task_skills: &[S]) -> bool {
        intersects(task_skills, &self.tags)
    }
}

impl std::fmt::Debug for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skill")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Registered skills in registration order.
///
/// # Example
/// ```ignore
/// let mut registry = SkillRegistry::new();
/// registry.register("python", PythonHandler);
/// registry.register_skill(Skill::new("review", ReviewHandler).with_tags(["#SKILL_CODE"]));
///
/// assert!(registry.can_handle(&["#SKILL_PYTHON"]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    skills: Vec<Skill>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name` with the default tag.
    pub fn register(&mut self, name: impl Into<String>, handler: impl SkillHandler + 'static) {
        self.register_skill(Skill::new(name, handler));
    }

    /// Register a fully described skill. Re-registering a name replaces the
    /// earlier entry in place, so its position in the first-match order is kept.
    pub fn register_skill(&mut self, skill: Skill) {
        match self.skills.iter_mut().find(|s| s.name == skill.name) {
            Some(existing) => *existing = skill,
            None => self.skills.push(skill),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name == name)
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    /// Every advertised tag, deduplicated, in registration order.
    pub fn tags(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.skills
            .iter()
            .flat_map(|s| s.tags.iter())
            .filter(|t| seen.insert(normalize_tag(t)))
            .cloned()
            .collect()
    }

    /// Does the union of all registered tags intersect `task_skills`?
    pub fn can_handle<S: AsRef<str>>(&self, task_skills: &[S]) -> bool {
        self.skills.iter().any(|s| s.matches(task_skills))
    }

    /// First registered skill whose tags intersect `task_skills`.
    pub fn find_skill<S: AsRef<str>>(&self, task_skills: &[S]) -> Option<&Skill> {
        self.skills.iter().find(|s| s.matches(task_skills))
    }

    /// Handler of the first matching skill. First-match, not best-match.
    pub fn find_handler<S: AsRef<str>>(&self, task_skills: &[S]) -> Option<Arc<dyn SkillHandler>> {
        self.find_skill(task_skills).map(Skill::handler)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
