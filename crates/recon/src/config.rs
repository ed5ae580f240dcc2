use serde::Deserialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Reconciliation settings: the installation whitelist used by the location
/// rule. An empty whitelist disables that rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub installations: Vec<InstallationRule>,
}

/// A known installation: the location must contain every keyword.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstallationRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl InstallationRule {
    fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// `normalized_location` must already be upper-cased and accent-free.
    pub fn matches(&self, normalized_location: &str) -> bool {
        self.keywords
            .iter()
            .all(|k| normalized_location.contains(&normalize_location(k)))
    }
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            installations: vec![
                InstallationRule::new("FPSO Frade", &["FPSO", "FRADE"]),
                InstallationRule::new("FPSO Forte", &["FPSO", "FORTE"]),
                InstallationRule::new("FPSO Bravo", &["FPSO", "BRAVO"]),
                InstallationRule::new("Polvo", &["POLVO"]),
                InstallationRule::new("Peregrino", &["PEREGRINO"]),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    /// A config with no whitelist (location rule disabled).
    pub fn without_whitelist() -> Self {
        Self {
            installations: Vec::new(),
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for (idx, rule) in self.installations.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "installation #{} has an empty name",
                    idx + 1
                )));
            }
            if rule.keywords.is_empty() || rule.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "installation '{}' needs at least one non-empty keyword",
                    rule.name
                )));
            }
        }
        Ok(())
    }

    /// First whitelist entry whose keywords all occur in `location`.
    pub fn identify(&self, location: &str) -> Option<&InstallationRule> {
        let normalized = normalize_location(location);
        if normalized.trim().is_empty() {
            return None;
        }
        self.installations.iter().find(|rule| rule.matches(&normalized))
    }
}

/// Upper-case and strip diacritics: `Plataforma Peregrino São João` becomes
/// `PLATAFORMA PEREGRINO SAO JOAO`.
pub fn normalize_location(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
