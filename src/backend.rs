//! Backend registry.
//!
//! A backend names a target execution framework: the emitter picks its
//! template table, the rewrite engine picks its extra rules, and the
//! external runner receives the artifact. Two backends are built in:
//! `spark` (batch) and `flinks` (stream-windowed; registers the window
//! rewrite).

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::rewrite::{rules, Rule, RuleRegistry};

/// A supported target framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Spark,
    /// Flink streaming ("flinks")
    FlinkStreaming,
}

impl Backend {
    pub fn from_name(name: &str) -> Result<Backend, BackendError> {
        match name {
            "spark" => Ok(Backend::Spark),
            "flinks" => Ok(Backend::FlinkStreaming),
            other => Err(BackendError::UnknownBackend {
                name: other.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Spark => "spark",
            Backend::FlinkStreaming => "flinks",
        }
    }

    /// Name of the template table the emitter renders from.
    pub fn template_file(self) -> &'static str {
        match self {
            Backend::Spark => "spark.st",
            Backend::FlinkStreaming => "flinks.st",
        }
    }

    /// Extension of the emitted artifact.
    pub fn file_suffix(self) -> &'static str {
        ".scala"
    }

    /// Append the backend-specific rewrite rules to a registry.
    pub fn register_rules(self, registry: &mut RuleRegistry) {
        if let Backend::FlinkStreaming = self {
            registry.register(Rule::new("window-apply", rules::apply_window));
        }
    }
}

/// Contract of the external job runner: it receives the emitted artifact
/// and submits it to the cluster. A nonzero status is surfaced as the
/// process exit code.
pub trait BackendRunner {
    fn execute(
        &self,
        artifact: &std::path::Path,
        master: &str,
        args: &std::collections::HashMap<String, String>,
        profiling: bool,
    ) -> Result<(), BackendError>;
}

/// Holds the selected backend for a compilation.
#[derive(Debug, Clone, Copy)]
pub struct BackendManager {
    pub backend: Backend,
}

impl BackendManager {
    pub fn new(name: &str) -> Result<Self, BackendError> {
        Ok(BackendManager {
            backend: Backend::from_name(name)?,
        })
    }

    /// The full rule registry for this backend: the standard rules plus
    /// whatever the backend registers on top.
    pub fn rule_registry(&self) -> RuleRegistry {
        let mut registry = RuleRegistry::standard();
        self.backend.register_rules(&mut registry);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_lookup() {
        assert_eq!(Backend::from_name("spark").unwrap(), Backend::Spark);
        assert_eq!(
            Backend::from_name("flinks").unwrap(),
            Backend::FlinkStreaming
        );
        assert!(Backend::from_name("storm").is_err());
    }

    #[test]
    fn test_flinks_registers_window_rule() {
        let manager = BackendManager::new("flinks").unwrap();
        let registry = manager.rule_registry();
        assert!(registry.rules().iter().any(|r| r.name == "window-apply"));

        let spark = BackendManager::new("spark").unwrap().rule_registry();
        assert!(!spark.rules().iter().any(|r| r.name == "window-apply"));
    }
}
