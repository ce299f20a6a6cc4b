//! API request/response models for students.

use super::pagination::Pagination;
use crate::db::models::students::{StudentDBResponse, StudentStatsDBResponse};
use crate::types::StudentId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
#[sqlx(type_name = "student_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
    Graduated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "sports_house", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SportsHouse {
    Yellow,
    Green,
    Blue,
}

/// Compulsory co-curricular activity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "cca", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Cca {
    Silat,
    Taekwondo,
}

/// Optional co-curricular activity. `none` is stored explicitly rather than as NULL.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "cca_optional", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CcaOptional {
    Badminton,
    Swimming,
    #[default]
    #[sqlx(rename = "none")]
    #[serde(rename = "none")]
    NoActivity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Create payload. Fields are taken as raw strings and checked by the handler so that every
/// problem is reported back as a field error in one response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StudentCreate {
    pub full_name: Option<String>,
    /// ISO 8601 date, e.g. `2005-03-15`
    pub date_of_birth: Option<String>,
    pub class: Option<String>,
    #[schema(value_type = StudentStatus)]
    pub status: Option<String>,
    #[schema(value_type = Option<SportsHouse>)]
    pub sports_house: Option<String>,
    #[schema(value_type = Option<Cca>)]
    pub cca: Option<String>,
    #[schema(value_type = Option<CcaOptional>)]
    pub cca_optional: Option<String>,
    pub quran_teacher: Option<String>,
    #[schema(value_type = Option<Gender>)]
    pub gender: Option<String>,
}

/// Partial update payload. For the nullable columns an explicit `null` (or empty string) clears
/// the stored value, while an absent key leaves it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StudentUpdate {
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub class: Option<String>,
    #[schema(value_type = Option<StudentStatus>)]
    pub status: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<SportsHouse>)]
    pub sports_house: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Cca>)]
    pub cca: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<CcaOptional>)]
    pub cca_optional: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub quran_teacher: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Gender>)]
    pub gender: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentResponse {
    pub id: StudentId,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub class: String,
    pub status: StudentStatus,
    pub sports_house: Option<SportsHouse>,
    pub cca: Option<Cca>,
    pub cca_optional: CcaOptional,
    pub quran_teacher: Option<String>,
    pub gender: Option<Gender>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for listing students
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListStudentsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
    /// Exact class code, e.g. `10A`
    pub class: Option<String>,
    /// Comma-separated list of class codes, e.g. `10A,10B`
    pub class_in: Option<String>,
    /// Student status
    pub status: Option<StudentStatus>,
}

impl ListStudentsQuery {
    /// Class codes from `class_in`, trimmed, with empty entries dropped.
    pub fn classes(&self) -> Option<Vec<String>> {
        let classes: Vec<String> = self
            .class_in
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if classes.is_empty() { None } else { Some(classes) }
    }
}

/// One page of students
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentListResponse {
    pub students: Vec<StudentResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenderCount {
    pub gender: Option<Gender>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassCount {
    pub class: String,
    pub count: i64,
}

/// Aggregate counts across all students regardless of status
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentStatsResponse {
    pub total_students: i64,
    pub gender_stats: Vec<GenderCount>,
    pub class_stats: Vec<ClassCount>,
}

impl From<StudentDBResponse> for StudentResponse {
    fn from(db: StudentDBResponse) -> Self {
        Self {
            id: db.id,
            full_name: db.full_name,
            date_of_birth: db.date_of_birth,
            class: db.class,
            status: db.status,
            sports_house: db.sports_house,
            cca: db.cca,
            cca_optional: db.cca_optional,
            quran_teacher: db.quran_teacher,
            gender: db.gender,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<StudentStatsDBResponse> for StudentStatsResponse {
    fn from(db: StudentStatsDBResponse) -> Self {
        Self {
            total_students: db.total_students,
            gender_stats: db
                .gender_counts
                .into_iter()
                .map(|(gender, count)| GenderCount { gender, count })
                .collect(),
            class_stats: db.class_counts.into_iter().map(|(class, count)| ClassCount { class, count }).collect(),
        }
    }
}
