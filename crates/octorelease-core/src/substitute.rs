//! Build-variable substitution for job configuration values.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .expect("variable pattern is a valid regex")
    })
}

/// Resolves `${NAME}` and `$NAME` references against a variable map.
///
/// References to unknown variables are left untouched, so a literal `$`
/// survives substitution unless it happens to name a defined variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableResolver {
    variables: BTreeMap<String, String>,
}

impl VariableResolver {
    pub fn new(variables: BTreeMap<String, String>) -> Self {
        Self { variables }
    }

    /// Resolver over the current process environment.
    pub fn from_env() -> Self {
        Self::new(std::env::vars().collect())
    }

    /// Add or override a variable (host build variables win over the environment).
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.variables.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn substitute(&self, input: &str) -> String {
        variable_pattern()
            .replace_all(input, |caps: &Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.variables.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
