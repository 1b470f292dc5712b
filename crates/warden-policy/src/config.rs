//! Policy configuration loader
//!
//! Reads the `policies:` section of a YAML configuration document. The
//! order of entries in the document is the evaluation order.

use std::path::Path;

use serde::{Deserialize, Serialize};
use warden_core::{Error, Result};

/// Configuration for a single policy module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfigEntry {
    /// Name of the policy; must match a registered policy name
    pub name: String,

    /// Whether this policy should be evaluated
    pub enabled: bool,

    /// Policy-specific option bag, passed to `PolicyModule::configure`
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Load the ordered policy list from a YAML configuration file.
///
/// The document must contain a top-level `policies` list; each entry must
/// carry `name` and `enabled`, and may carry a policy-specific `config`
/// mapping. A missing `name` or `enabled` fails with `InvalidConfig` naming
/// the offending index and field.
pub fn load_policy_config(path: impl AsRef<Path>) -> Result<Vec<PolicyConfigEntry>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "failed to read policy configuration {}: {e}",
            path.display()
        ))
    })?;

    parse_policy_config(&content)
}

/// Parse the `policies:` section from YAML text
pub fn parse_policy_config(content: &str) -> Result<Vec<PolicyConfigEntry>> {
    let document: serde_yaml::Value = serde_yaml::from_str(content)?;

    let mapping = document
        .as_mapping()
        .ok_or_else(|| Error::config("configuration document must be a YAML mapping"))?;

    let policies = mapping
        .get("policies")
        .ok_or_else(|| Error::config("configuration document must contain a 'policies' key"))?;

    let entries = policies
        .as_sequence()
        .ok_or_else(|| Error::config("'policies' must be a list"))?;

    let mut parsed = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let entry = entry.as_mapping().ok_or_else(|| {
            Error::config(format!("policy at index {index} must be a mapping"))
        })?;

        let name = entry
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or(Error::InvalidConfig {
                index,
                field: "name",
            })?
            .to_string();

        let enabled = entry
            .get("enabled")
            .and_then(|v| v.as_bool())
            .ok_or(Error::InvalidConfig {
                index,
                field: "enabled",
            })?;

        let config = match entry.get("config") {
            Some(value) => serde_json::to_value(value)?,
            None => serde_json::Value::Object(serde_json::Map::new()),
        };

        parsed.push(PolicyConfigEntry {
            name,
            enabled,
            config,
        });
    }

    Ok(parsed)
}

/// Load only the enabled policies, preserving document order
pub fn enabled_policies(path: impl AsRef<Path>) -> Result<Vec<PolicyConfigEntry>> {
    Ok(load_policy_config(path)?
        .into_iter()
        .filter(|entry| entry.enabled)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config_preserves_order() {
        let file = write_config(
            r#"
policies:
  - name: pii_redaction
    enabled: true
    config:
      redact_emails: true
  - name: mnpi_guard
    enabled: false
  - name: prompt_length
    enabled: true
"#,
        );

        let entries = load_policy_config(file.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "pii_redaction");
        assert_eq!(entries[1].name, "mnpi_guard");
        assert_eq!(entries[2].name, "prompt_length");
        assert!(entries[0].enabled);
        assert!(!entries[1].enabled);
        assert_eq!(entries[0].config["redact_emails"], true);
    }

    #[test]
    fn test_missing_config_bag_defaults_to_empty_object() {
        let file = write_config("policies:\n  - name: a\n    enabled: true\n");
        let entries = load_policy_config(file.path()).unwrap();
        assert!(entries[0].config.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_missing_name_reports_index_and_field() {
        let file = write_config(
            r#"
policies:
  - name: ok
    enabled: true
  - enabled: true
"#,
        );

        let err = load_policy_config(file.path()).unwrap_err();
        assert!(
            matches!(err, warden_core::Error::InvalidConfig { index: 1, field: "name" }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_missing_enabled_reports_index_and_field() {
        let file = write_config("policies:\n  - name: a\n");
        let err = load_policy_config(file.path()).unwrap_err();
        assert!(matches!(
            err,
            warden_core::Error::InvalidConfig {
                index: 0,
                field: "enabled"
            }
        ));
    }

    #[test]
    fn test_missing_policies_key_fails() {
        let file = write_config("model_router:\n  default_model: gpt-4\n");
        assert!(load_policy_config(file.path()).is_err());
    }

    #[test]
    fn test_policies_must_be_a_list() {
        let file = write_config("policies:\n  name: a\n");
        assert!(load_policy_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(load_policy_config("/nonexistent/policies.yaml").is_err());
    }

    #[test]
    fn test_enabled_policies_filters_disabled() {
        let file = write_config(
            r#"
policies:
  - name: a
    enabled: true
  - name: b
    enabled: false
  - name: c
    enabled: true
"#,
        );

        let enabled = enabled_policies(file.path()).unwrap();
        let names: Vec<_> = enabled.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
