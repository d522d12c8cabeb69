//! Persisted script sources.
//!
//! Only source text is ever stored. Each script belongs to a category
//! (the area or subsystem that owns it) and runs either before or after the
//! world is loaded.

use crate::error::InterpretError;
use crate::vm::Vm;

/// When a script runs relative to world loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ExecOrder {
    /// Before areas load: class definitions, shared helpers.
    Pre,
    /// After areas load: hooks that expect entities to exist.
    Post,
}

/// One stored script.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScriptSource {
    pub category: String,
    pub filename: String,
    pub order: ExecOrder,
    pub source: String,
}

impl ScriptSource {
    pub fn new(
        category: impl Into<String>,
        filename: impl Into<String>,
        order: ExecOrder,
        source: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            filename: filename.into(),
            order,
            source: source.into(),
        }
    }
}

/// A stored script failed to compile or run.
#[derive(Debug, thiserror::Error)]
#[error("{category}/{filename}: {error}")]
pub struct ScriptLoadError {
    pub category: String,
    pub filename: String,
    #[source]
    pub error: InterpretError,
}

impl Vm {
    /// Compile and run one stored script.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(category = %script.category, filename = %script.filename)
    )]
    pub fn load_script(&mut self, script: &ScriptSource) -> Result<(), ScriptLoadError> {
        self.interpret(&script.source).map_err(|error| ScriptLoadError {
            category: script.category.clone(),
            filename: script.filename.clone(),
            error,
        })
    }

    /// Run every script scheduled for `order`, sorted by category then
    /// filename. A failing script is logged and skipped; the failures are
    /// returned once the rest have run.
    pub fn load_scripts(
        &mut self,
        scripts: &[ScriptSource],
        order: ExecOrder,
    ) -> Vec<ScriptLoadError> {
        let mut due: Vec<&ScriptSource> = scripts.iter().filter(|s| s.order == order).collect();
        due.sort_by(|a, b| (&a.category, &a.filename).cmp(&(&b.category, &b.filename)));

        let mut failures = Vec::new();
        for script in due {
            if let Err(error) = self.load_script(script) {
                tracing::warn!(%error, "script failed to load");
                failures.push(error);
            }
        }
        tracing::debug!(?order, failed = failures.len(), "scripts loaded");
        failures
    }
}
