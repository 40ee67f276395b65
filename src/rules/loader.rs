//! YAML rule loading and the reloadable rule store
//!
//! Rules are read once and shared read-only. A batch takes a snapshot before it
//! starts, so a reload between batches never changes rules mid-batch.

use super::finance::{FinanceRules, FinanceRulesDoc};
use super::health::{HealthRules, HealthRulesDoc};
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

/// Built-in finance rules, used when no rules file is configured
pub const DEFAULT_FINANCE_RULES: &str = include_str!("../../rules/finance_score_rules.yaml");

/// Built-in health rules, used when no rules file is configured
pub const DEFAULT_HEALTH_RULES: &str = include_str!("../../rules/health_score_rules.yaml");

/// Parse a YAML document, rejecting empty or null documents
fn parse_document<T: DeserializeOwned>(text: &str) -> Result<T, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    let empty = match &value {
        serde_yaml::Value::Null => true,
        serde_yaml::Value::Mapping(m) => m.is_empty(),
        _ => false,
    };
    if empty {
        return Err(ConfigError::Empty);
    }
    Ok(serde_yaml::from_value(value)?)
}

fn read_rules_file(path: &Path) -> Result<String, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// A compiled rule set that can be built from YAML text
pub trait RuleSet: Sized + Send + Sync {
    /// Human-readable name for log lines
    const NAME: &'static str;

    fn from_yaml(text: &str) -> Result<Self, ConfigError>;

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = read_rules_file(path)?;
        let rules = Self::from_yaml(&text)?;
        log::info!("Loaded {} rules from {}", Self::NAME, path.display());
        Ok(rules)
    }
}

impl RuleSet for FinanceRules {
    const NAME: &'static str = "finance";

    fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        FinanceRules::compile(parse_document::<FinanceRulesDoc>(text)?)
    }
}

impl RuleSet for HealthRules {
    const NAME: &'static str = "health";

    fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        HealthRules::compile(parse_document::<HealthRulesDoc>(text)?)
    }
}

impl FinanceRules {
    /// The built-in finance rule set
    pub fn default_rules() -> Result<Self, ConfigError> {
        Self::from_yaml(DEFAULT_FINANCE_RULES)
    }
}

impl HealthRules {
    /// The built-in health rule set
    pub fn default_rules() -> Result<Self, ConfigError> {
        Self::from_yaml(DEFAULT_HEALTH_RULES)
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Holder for the active rule set, swappable between batches
#[derive(Debug)]
pub struct RuleStore<R> {
    path: Option<PathBuf>,
    current: RwLock<Arc<R>>,
    loaded_at: Mutex<Option<SystemTime>>,
}

impl<R: RuleSet> RuleStore<R> {
    /// Load rules from a file
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let rules = R::from_path(&path)?;
        Ok(Self {
            loaded_at: Mutex::new(modified_time(&path)),
            path: Some(path),
            current: RwLock::new(Arc::new(rules)),
        })
    }

    /// Wrap rules that did not come from a file; reloads are no-ops
    pub fn from_rules(rules: R) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(rules)),
            loaded_at: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The active rules. Hold the returned Arc for the whole batch.
    pub fn snapshot(&self) -> Arc<R> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Re-read the rules file. On failure the previous rules stay active.
    pub fn reload(&self) -> Result<Arc<R>, ConfigError> {
        let Some(path) = &self.path else {
            return Ok(self.snapshot());
        };
        let rules = Arc::new(R::from_path(path)?);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&rules);
        *self.loaded_at.lock().unwrap_or_else(|e| e.into_inner()) = modified_time(path);
        Ok(rules)
    }

    /// Reload only when the file's modification time moved. Returns whether it did.
    pub fn reload_if_changed(&self) -> Result<bool, ConfigError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        let seen = *self.loaded_at.lock().unwrap_or_else(|e| e.into_inner());
        let now = modified_time(path);
        if now.is_some() && now != seen {
            log::info!("{} rules changed on disk, reloading", R::NAME);
            self.reload()?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FinanceComponent;
    use std::io::Write;

    #[test]
    fn test_default_rules_compile() {
        let finance = FinanceRules::default_rules().unwrap();
        assert_eq!(finance.weight(FinanceComponent::Sar), 0.5);
        assert!(!finance.decisions().categories().is_empty());

        let health = HealthRules::default_rules().unwrap();
        assert!(!health.decisions().categories().is_empty());
    }

    #[test]
    fn test_empty_documents_rejected() {
        assert!(matches!(FinanceRules::from_yaml(""), Err(ConfigError::Empty)));
        assert!(matches!(FinanceRules::from_yaml("~"), Err(ConfigError::Empty)));
        assert!(matches!(HealthRules::from_yaml("{}"), Err(ConfigError::Empty)));
        assert!(matches!(FinanceRules::from_yaml("weights: ["), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = FinanceRules::from_path(Path::new("/nonexistent/rules.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_store_reload_keeps_snapshot_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finance.yaml");
        fs::write(&path, DEFAULT_FINANCE_RULES).unwrap();

        let store: RuleStore<FinanceRules> = RuleStore::open(&path).unwrap();
        let before = store.snapshot();
        assert_eq!(before.weight(FinanceComponent::Sar), 0.5);

        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "weights: {{sar_income_ratio: 1.0}}").unwrap();
        writeln!(file, "components: {{sar_income_ratio: [{{score: 3}}]}}").unwrap();
        drop(file);

        let after = store.reload().unwrap();
        assert_eq!(after.weight(FinanceComponent::Sar), 1.0);
        // The earlier snapshot is untouched
        assert_eq!(before.weight(FinanceComponent::Sar), 0.5);
        assert_eq!(store.snapshot().weight(FinanceComponent::Sar), 1.0);
    }

    #[test]
    fn test_failed_reload_keeps_previous_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finance.yaml");
        fs::write(&path, DEFAULT_FINANCE_RULES).unwrap();
        let store: RuleStore<FinanceRules> = RuleStore::open(&path).unwrap();

        fs::write(&path, "").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.snapshot().weight(FinanceComponent::Sar), 0.5);
    }

    #[test]
    fn test_in_memory_store() {
        let store = RuleStore::from_rules(HealthRules::default_rules().unwrap());
        assert!(store.path().is_none());
        assert!(!store.reload_if_changed().unwrap());
        assert!(store.reload().is_ok());
    }
}
