//! Config validation: identifiers, duplicates, association shape.

use crate::config::{AssociationKind, ModelConfig};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier pattern"))
}

/// Names that reach SQL as identifiers must be plain identifiers.
pub fn check_identifier(name: &str) -> Result<(), ConfigError> {
    if identifier_re().is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier(name.to_string()))
    }
}

pub fn validate(config: &ModelConfig) -> Result<(), ConfigError> {
    check_identifier(&config.name)?;
    if let Some(t) = &config.table {
        check_identifier(t)?;
    }
    if let Some(s) = &config.schema {
        check_identifier(s)?;
    }
    if config.paranoid && !config.timestamps {
        return Err(ConfigError::Validation(format!(
            "model {}: paranoid requires timestamps",
            config.name
        )));
    }

    let mut names = HashSet::new();
    let mut pk_count = 0;
    for f in &config.fields {
        check_identifier(&f.name)?;
        if let Some(c) = &f.column {
            check_identifier(c)?;
        }
        if !names.insert(f.name.as_str()) {
            return Err(ConfigError::DuplicateField(f.name.clone()));
        }
        if f.primary_key {
            pk_count += 1;
        }
    }
    if pk_count > 1 {
        return Err(ConfigError::Validation(format!(
            "model {}: composite primary keys are not supported",
            config.name
        )));
    }

    let mut scope_names = HashSet::new();
    for s in &config.scopes {
        if !scope_names.insert(s.name.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate scope: {}", s.name)));
        }
    }

    let mut association_names = HashSet::new();
    for a in &config.associations {
        check_identifier(&a.name)?;
        check_identifier(&a.target)?;
        if let Some(s) = &a.target_schema {
            check_identifier(s)?;
        }
        if let Some(k) = &a.remote_key {
            check_identifier(k)?;
        }
        if names.contains(a.name.as_str()) || !association_names.insert(a.name.as_str()) {
            return Err(ConfigError::DuplicateField(a.name.clone()));
        }
        match (&a.kind, &a.through) {
            (AssociationKind::BelongsToMany, None) => {
                return Err(ConfigError::MissingReference {
                    kind: "association through",
                    id: a.name.clone(),
                });
            }
            (AssociationKind::BelongsToMany, Some(t)) => {
                check_identifier(&t.table)?;
                check_identifier(&t.local_key)?;
                check_identifier(&t.remote_key)?;
                if let Some(s) = &t.schema {
                    check_identifier(s)?;
                }
            }
            (_, Some(_)) => {
                return Err(ConfigError::Validation(format!(
                    "association {}: through is only valid for belongs_to_many",
                    a.name
                )));
            }
            (_, None) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(check_identifier("display_name").is_ok());
        assert!(check_identifier("displayName2").is_ok());
        assert!(check_identifier("1abc").is_err());
        assert!(check_identifier("users; drop table").is_err());
        assert!(check_identifier("a\"b").is_err());
    }
}
