//! Turning filter source into a loadable [`FilterDefinition`].

use std::fs;
use std::path::Path;

use sieve_core::{FilterDefinition, FilterError, Result};

/// Compiles filter source into a definition a factory can instantiate.
pub trait FilterCompiler: Send + Sync {
    /// Compile a source file. Unreadable files are [`FilterError::Io`].
    fn compile_file(&self, path: &Path) -> Result<FilterDefinition>;

    /// Compile inline source pushed under an explicit name.
    fn compile_source(&self, code: &str, name: &str) -> Result<FilterDefinition>;
}

/// Compiles YAML filter documents.
///
/// ```yaml
/// name: auth-check      # optional, defaults to the file stem / inline name
/// type: pre
/// priority: 10
/// abstract: false       # templates are valid but never instantiated
/// params:
///   header: Authorization
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlCompiler;

impl YamlCompiler {
    pub fn new() -> Self {
        Self
    }

    fn parse(code: &str, default_name: &str) -> Result<FilterDefinition> {
        let mut definition: FilterDefinition =
            serde_yaml::from_str(code).map_err(|e| FilterError::compile(default_name, e))?;

        if definition.name.trim().is_empty() {
            definition.name = default_name.to_string();
        }
        if definition.filter_type.trim().is_empty() {
            return Err(FilterError::compile(
                &definition.name,
                "filter type must not be empty",
            ));
        }
        Ok(definition)
    }
}

impl FilterCompiler for YamlCompiler {
    fn compile_file(&self, path: &Path) -> Result<FilterDefinition> {
        let code = fs::read_to_string(path).map_err(|e| FilterError::io(path, e))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        Self::parse(&code, stem)
    }

    fn compile_source(&self, code: &str, name: &str) -> Result<FilterDefinition> {
        Self::parse(code, name)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn compile_source_fills_in_name() {
        let def = YamlCompiler
            .compile_source("type: pre\npriority: 3\n", "inline-auth")
            .unwrap();
        assert_eq!(def.name, "inline-auth");
        assert_eq!(def.filter_type, "pre");
        assert_eq!(def.priority, 3);
        assert!(def.is_instantiable());
    }

    #[test]
    fn explicit_name_wins_over_default() {
        let def = YamlCompiler
            .compile_source("name: declared\ntype: post\n", "fallback")
            .unwrap();
        assert_eq!(def.name, "declared");
        assert_eq!(def.priority, 0);
    }

    #[test]
    fn abstract_flag_and_params_are_carried() {
        let yaml =
            "type: route\nabstract: true\ndescription: base router\nparams:\n  upstream: api\n";
        let def = YamlCompiler.compile_source(yaml, "base").unwrap();
        assert!(!def.is_instantiable());
        assert_eq!(def.description.as_deref(), Some("base router"));
        assert_eq!(def.params["upstream"].as_str(), Some("api"));
    }

    #[test]
    fn compile_file_uses_file_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rate-limit.yml");
        fs::write(&path, "type: pre\npriority: 1\n").unwrap();

        let def = YamlCompiler.compile_file(&path).unwrap();
        assert_eq!(def.name, "rate-limit");
    }

    #[test]
    fn malformed_yaml_is_compile_error() {
        let err = YamlCompiler
            .compile_source("type: [unterminated", "broken")
            .unwrap_err();
        assert!(matches!(err, FilterError::Compile { ref name, .. } if name == "broken"));
    }

    #[test]
    fn missing_or_blank_type_is_compile_error() {
        assert!(matches!(
            YamlCompiler.compile_source("priority: 1\n", "no-type"),
            Err(FilterError::Compile { .. })
        ));
        assert!(matches!(
            YamlCompiler.compile_source("type: \"  \"\n", "blank-type"),
            Err(FilterError::Compile { .. })
        ));
    }

    #[test]
    fn unreadable_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = YamlCompiler
            .compile_file(&dir.path().join("missing.yml"))
            .unwrap_err();
        assert!(matches!(err, FilterError::Io { .. }));
        assert!(!err.is_fatal());
    }
}
