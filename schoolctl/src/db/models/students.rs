//! Database models for students.

use crate::api::models::students::{Cca, CcaOptional, Gender, SportsHouse, StudentStatus};
use crate::types::StudentId;
use chrono::{DateTime, NaiveDate, Utc};

/// Database request for creating a new student
#[derive(Debug, Clone)]
pub struct StudentCreateDBRequest {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub class: String,
    pub status: StudentStatus,
    pub sports_house: Option<SportsHouse>,
    pub cca: Option<Cca>,
    pub cca_optional: CcaOptional,
    pub quran_teacher: Option<String>,
    pub gender: Option<Gender>,
}

/// Database request for a partial student update.
///
/// The outer `Option` says whether the column is touched at all; for nullable columns the inner
/// `Option` is the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct StudentUpdateDBRequest {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub class: Option<String>,
    pub status: Option<StudentStatus>,
    pub sports_house: Option<Option<SportsHouse>>,
    pub cca: Option<Option<Cca>>,
    pub cca_optional: Option<CcaOptional>,
    pub quran_teacher: Option<Option<String>>,
    pub gender: Option<Option<Gender>>,
}

impl StudentUpdateDBRequest {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.date_of_birth.is_none()
            && self.class.is_none()
            && self.status.is_none()
            && self.sports_house.is_none()
            && self.cca.is_none()
            && self.cca_optional.is_none()
            && self.quran_teacher.is_none()
            && self.gender.is_none()
    }

    /// Apply the touched columns to an existing row.
    pub fn apply_to(&self, student: &mut StudentDBResponse) {
        if let Some(full_name) = &self.full_name {
            student.full_name = full_name.clone();
        }
        if let Some(date_of_birth) = self.date_of_birth {
            student.date_of_birth = date_of_birth;
        }
        if let Some(class) = &self.class {
            student.class = class.clone();
        }
        if let Some(status) = self.status {
            student.status = status;
        }
        if let Some(sports_house) = self.sports_house {
            student.sports_house = sports_house;
        }
        if let Some(cca) = self.cca {
            student.cca = cca;
        }
        if let Some(cca_optional) = self.cca_optional {
            student.cca_optional = cca_optional;
        }
        if let Some(quran_teacher) = &self.quran_teacher {
            student.quran_teacher = quran_teacher.clone();
        }
        if let Some(gender) = self.gender {
            student.gender = gender;
        }
    }
}

/// Database response for a student
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentDBResponse {
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

/// Filter for listing and counting students
#[derive(Debug, Clone)]
pub struct StudentFilter {
    pub class: Option<String>,
    pub classes: Option<Vec<String>>,
    pub status: Option<StudentStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl StudentFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            class: None,
            classes: None,
            status: None,
            skip,
            limit,
        }
    }

    /// Whether a row passes the class and status predicates (pagination not applied).
    pub fn matches(&self, student: &StudentDBResponse) -> bool {
        self.class.as_ref().is_none_or(|c| &student.class == c)
            && self.classes.as_ref().is_none_or(|cs| cs.contains(&student.class))
            && self.status.is_none_or(|s| student.status == s)
    }
}

/// Aggregate counts over the whole students table
#[derive(Debug, Clone, Default)]
pub struct StudentStatsDBResponse {
    pub total_students: i64,
    /// Ordered by count descending
    pub gender_counts: Vec<(Option<Gender>, i64)>,
    /// Ordered by class code
    pub class_counts: Vec<(String, i64)>,
}
