//! Represents a student and the grade data attached to them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::record_store::Record;

/// A student entry from `students.json`.
///
/// The collection is seeded externally and never written by this service.
/// Fields other than the three below are ignored when reading.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Student {
    /// Student identifier used for lookups.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Grade data, passed through without interpretation.
    #[serde(default)]
    pub grades: Value,
}

impl Record for Student {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Public view returned by the grade lookup.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StudentGrades {
    pub id: String,
    pub name: String,
    pub grades: Value,
}

impl From<Student> for StudentGrades {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            grades: student.grades,
        }
    }
}
