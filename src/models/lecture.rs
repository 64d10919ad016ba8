//! Represents an uploaded lecture and its backing file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::record_store::Record;

/// A lecture entry from `lectures.json`.
///
/// Each lecture is paired with exactly one file in the asset store,
/// referenced by `file_name`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    /// Unique identifier, never reused.
    pub id: String,

    /// Human readable title. Defaults to the uploaded file's original name.
    pub title: String,

    /// Generated on-disk name of the lecture file.
    pub file_name: String,

    /// When the lecture was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

impl Lecture {
    /// Build a new lecture for an already stored asset.
    ///
    /// An empty or missing `title` falls back to `original_name`.
    pub fn new(title: Option<String>, original_name: &str, file_name: String) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| original_name.to_string());

        Self {
            id: Uuid::new_v4().to_string(),
            title,
            file_name,
            uploaded_at: Utc::now(),
        }
    }
}

impl Record for Lecture {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_to_original_name() {
        let lecture = Lecture::new(Some("   ".into()), "week 1.pdf", "1-week_1.pdf".into());
        assert_eq!(lecture.title, "week 1.pdf");

        let lecture = Lecture::new(None, "week 2.pdf", "2-week_2.pdf".into());
        assert_eq!(lecture.title, "week 2.pdf");

        let lecture = Lecture::new(Some("Intro".into()), "week 3.pdf", "3-week_3.pdf".into());
        assert_eq!(lecture.title, "Intro");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let lecture = Lecture::new(Some("Intro".into()), "intro.pdf", "1-intro.pdf".into());
        let value = serde_json::to_value(&lecture).unwrap();
        assert_eq!(value["fileName"], "1-intro.pdf");
        assert!(value.get("uploadedAt").is_some());
        assert!(value.get("file_name").is_none());
    }

    #[test]
    fn reads_legacy_timestamp_ids() {
        let raw = r#"{
            "id": "1718000000000",
            "title": "Old",
            "fileName": "1718000000000-old.pdf",
            "uploadedAt": "2024-06-10T06:13:20.000Z"
        }"#;
        let lecture: Lecture = serde_json::from_str(raw).unwrap();
        assert_eq!(lecture.id, "1718000000000");
        assert_eq!(lecture.file_name, "1718000000000-old.pdf");
    }
}
