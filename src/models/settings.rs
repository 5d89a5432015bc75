//! Settings model: the single global configuration record.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MAX_PER_PAGE: i64 = 20;
pub const DEFAULT_PER_PAGE: i64 = 10;

/// How word rows are rendered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Layout {
    #[serde(rename = "list")]
    List,
    #[default]
    #[serde(rename = "two-column")]
    TwoColumn,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::List => "list",
            Layout::TwoColumn => "two-column",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Layout::List),
            "two-column" => Some(Layout::TwoColumn),
            _ => None,
        }
    }
}

/// The singleton settings row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub per_page: i64,
    pub layout: Layout,
    pub hide_meanings: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_book_id: Option<i64>,
    pub updated_at: String,
}

impl Settings {
    /// Settings used when no row exists yet.
    pub fn defaults(updated_at: String) -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            layout: Layout::default(),
            hide_meanings: true,
            selected_book_id: None,
            updated_at,
        }
    }
}

/// Request body for updating settings. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub per_page: Option<i64>,
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub hide_meanings: Option<bool>,
    #[serde(default)]
    pub selected_book_id: Option<i64>,
}

impl UpdateSettingsRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(per_page) = self.per_page {
            validate_per_page(per_page)?;
        }
        Ok(())
    }
}

/// Request body for remembering the last-viewed book. `null` clears it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBookRequest {
    pub book_id: Option<i64>,
}

pub fn validate_per_page(per_page: i64) -> Result<(), AppError> {
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(AppError::Validation(format!(
            "perPage must be between 1 and {}",
            MAX_PER_PAGE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_wire_names() {
        assert_eq!(serde_json::to_value(Layout::List).unwrap(), "list");
        assert_eq!(serde_json::to_value(Layout::TwoColumn).unwrap(), "two-column");
        assert_eq!(Layout::parse("two-column"), Some(Layout::TwoColumn));
        assert_eq!(Layout::parse("grid"), None);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::defaults("2024-01-01T00:00:00.000Z".to_string());
        assert_eq!(settings.per_page, 10);
        assert_eq!(settings.layout, Layout::TwoColumn);
        assert!(settings.hide_meanings);
        assert!(settings.selected_book_id.is_none());
    }

    #[test]
    fn test_per_page_bounds() {
        assert!(validate_per_page(1).is_ok());
        assert!(validate_per_page(MAX_PER_PAGE).is_ok());
        assert!(validate_per_page(0).is_err());
        assert!(validate_per_page(MAX_PER_PAGE + 1).is_err());

        let request = UpdateSettingsRequest {
            per_page: Some(25),
            ..Default::default()
        };
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));
    }
}
