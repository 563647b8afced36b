//! Fund domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub region: Option<String>,
    pub currency: Option<String>,
    pub manager_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn uppercase_code(code: &str) -> Result<(), ValidationError> {
    if code.trim().is_empty() || code != code.to_uppercase() {
        let mut err = ValidationError::new("uppercase");
        err.message = Some("Fund code must be a non-empty uppercase string".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewFund {
    #[validate(custom(function = "uppercase_code"))]
    pub code: String,

    #[validate(length(min = 1, max = 200, message = "Fund name is required"))]
    pub name: String,

    pub region: Option<String>,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    #[serde(default)]
    pub manager_ids: Vec<Uuid>,
}

/// Partial update. `manager_ids`, when present, replaces the manager set.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FundChanges {
    #[validate(custom(function = "uppercase_code"))]
    pub code: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Fund name cannot be empty"))]
    pub name: Option<String>,

    pub region: Option<String>,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    pub manager_ids: Option<Vec<Uuid>>,
}

impl Fund {
    pub fn new(input: NewFund) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            region: input.region,
            currency: input.currency,
            manager_ids: input.manager_ids,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: FundChanges) {
        if let Some(code) = changes.code {
            self.code = code.trim().to_string();
        }
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if changes.region.is_some() {
            self.region = changes.region;
        }
        if changes.currency.is_some() {
            self.currency = changes.currency;
        }
        if let Some(managers) = changes.manager_ids {
            self.manager_ids = managers;
        }
        self.updated_at = Utc::now();
    }

    pub fn is_managed_by(&self, user_id: &Uuid) -> bool {
        self.manager_ids.contains(user_id)
    }
}
