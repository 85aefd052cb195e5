//! Message catalog — static templated text for every user-facing prompt.
//!
//! Templates live in `data/messages.json` (embedded at compile time) as a
//! `category -> key -> template` map with `{placeholder}` substitution.
//! Missing entries are a configuration defect, so the full key set is
//! validated once at startup rather than per request.

use std::collections::HashMap;

use crate::error::CatalogError;

/// Every (category, key) the engine can ask for. `validate()` checks the
/// loaded catalog against this table so a broken catalog fails at boot.
const REQUIRED_KEYS: &[(&str, &str)] = &[
    ("onboarding", "welcome"),
    ("onboarding", "ask_name"),
    ("onboarding", "confirm_name"),
    ("menu", "greeting"),
    ("menu", "options"),
    ("menu", "invalid_choice"),
    ("interview", "type_prompt"),
    ("interview", "role_prompt_college"),
    ("interview", "role_prompt_job"),
    ("interview", "role_confirm_college"),
    ("interview", "role_confirm_job"),
    ("interview", "question"),
    ("interview", "continue_prompt"),
    ("interview", "invalid_continue"),
    ("interview", "closing"),
    ("advice", "category_prompt"),
    ("advice", "invalid_category"),
    ("advice", "followup_prompt"),
    ("advice", "more_questions_prompt"),
    ("advice", "more_advice_prompt"),
    ("advice", "invalid_yes_no"),
    ("advice", "closing"),
    ("commands", "farewell"),
    ("commands", "options_notice"),
    ("commands", "help"),
    ("commands", "restart_onboarding"),
    ("commands", "restart_interview"),
    ("commands", "restart_advice"),
    ("commands", "restart_menu"),
    ("errors", "generation_failed"),
    ("idle", "disconnect"),
];

/// Immutable catalog of message templates, loaded once at process start.
pub struct MessageCatalog {
    messages: HashMap<String, HashMap<String, String>>,
}

impl MessageCatalog {
    /// Load the embedded catalog and validate it against the engine's
    /// required key set.
    pub fn builtin() -> Result<Self, CatalogError> {
        let catalog = Self::from_json(include_str!("../data/messages.json"))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse a catalog from JSON without validating.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let messages: HashMap<String, HashMap<String, String>> =
            serde_json::from_str(raw).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Self { messages })
    }

    /// Check that every (category, key) the engine uses exists.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (category, key) in REQUIRED_KEYS {
            self.template(category, key)?;
        }
        Ok(())
    }

    fn template(&self, category: &str, key: &str) -> Result<&str, CatalogError> {
        let entries = self
            .messages
            .get(category)
            .ok_or_else(|| CatalogError::UnknownCategory(category.to_string()))?;
        entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| CatalogError::UnknownKey {
                category: category.to_string(),
                key: key.to_string(),
            })
    }

    /// Render a template with named-placeholder substitution.
    ///
    /// Substitutions are `(placeholder, value)` pairs; `{placeholder}`
    /// occurrences in the template are replaced.
    pub fn render(
        &self,
        category: &str,
        key: &str,
        substitutions: &[(&str, &str)],
    ) -> Result<String, CatalogError> {
        let mut text = self.template(category, key)?.to_string();
        for (placeholder, value) in substitutions {
            text = text.replace(&format!("{{{placeholder}}}"), value);
        }
        Ok(text)
    }

    /// Render a template that takes no substitutions.
    pub fn get(&self, category: &str, key: &str) -> Result<String, CatalogError> {
        self.render(category, key, &[])
    }
}
