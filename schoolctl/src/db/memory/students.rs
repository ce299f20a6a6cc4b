use super::MemoryStore;
use crate::api::models::students::Gender;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{Repository, StudentRepository},
    models::students::{StudentCreateDBRequest, StudentDBResponse, StudentFilter, StudentStatsDBResponse, StudentUpdateDBRequest},
};
use crate::types::StudentId;
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::instrument;

pub struct MemoryStudents<'a> {
    store: &'a MemoryStore,
}

impl<'a> MemoryStudents<'a> {
    pub fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl<'a> Repository for MemoryStudents<'a> {
    type CreateRequest = StudentCreateDBRequest;
    type UpdateRequest = StudentUpdateDBRequest;
    type Response = StudentDBResponse;
    type Id = StudentId;
    type Filter = StudentFilter;

    #[instrument(skip(self, request), fields(class = %request.class), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tables = self.store.tables.write().await;

        let now = Utc::now();
        let id = tables.students.allocate_id();
        let student = StudentDBResponse {
            id,
            full_name: request.full_name.clone(),
            date_of_birth: request.date_of_birth,
            class: request.class.clone(),
            status: request.status,
            sports_house: request.sports_house,
            cca: request.cca,
            cca_optional: request.cca_optional,
            quran_teacher: request.quran_teacher.clone(),
            gender: request.gender,
            created_at: now,
            updated_at: now,
        };
        tables.students.insert(id, student.clone());

        Ok(student)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(self.store.tables.read().await.students.get(id).cloned())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let tables = self.store.tables.read().await;
        let mut students: Vec<_> = tables.students.values().filter(|s| filter.matches(s)).collect();
        students.sort_by_key(|s| Reverse((s.created_at, s.id)));

        Ok(students
            .into_iter()
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tables = self.store.tables.write().await;
        if tables.students.remove(id).is_none() {
            return Ok(false);
        }

        // ON DELETE CASCADE
        tables.terms.retain(|_, term| term.student_id != id);

        Ok(true)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tables = self.store.tables.write().await;
        let student = tables.students.get_mut(id).ok_or(DbError::NotFound)?;

        request.apply_to(student);
        student.updated_at = Utc::now();

        Ok(student.clone())
    }
}

#[async_trait::async_trait]
impl<'a> StudentRepository for MemoryStudents<'a> {
    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &StudentFilter) -> Result<i64> {
        let tables = self.store.tables.read().await;
        Ok(tables.students.values().filter(|s| filter.matches(s)).count() as i64)
    }

    #[instrument(skip(self), err)]
    async fn stats(&mut self) -> Result<StudentStatsDBResponse> {
        let tables = self.store.tables.read().await;

        let mut genders: BTreeMap<Option<Gender>, i64> = BTreeMap::new();
        let mut classes: BTreeMap<String, i64> = BTreeMap::new();
        for student in tables.students.values() {
            *genders.entry(student.gender).or_default() += 1;
            *classes.entry(student.class.clone()).or_default() += 1;
        }

        // Count descending, then gender with unset last
        let mut gender_counts: Vec<_> = genders.into_iter().collect();
        gender_counts.sort_by_key(|(gender, count)| (Reverse(*count), gender.is_none(), *gender));

        Ok(StudentStatsDBResponse {
            total_students: tables.students.values().count() as i64,
            gender_counts,
            class_counts: classes.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::students::{CcaOptional, SportsHouse, StudentStatus};
    use crate::db::handlers::repository::TermRepository;
    use crate::db::memory::MemoryTerms;
    use crate::db::models::terms::{TermFilter, TermUpsertDBRequest};
    use chrono::NaiveDate;

    fn student(name: &str, class: &str, status: StudentStatus, gender: Option<Gender>) -> StudentCreateDBRequest {
        StudentCreateDBRequest {
            full_name: name.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2009, 9, 9).unwrap(),
            class: class.to_string(),
            status,
            sports_house: Some(SportsHouse::Yellow),
            cca: None,
            cca_optional: CcaOptional::Swimming,
            quran_teacher: None,
            gender,
        }
    }

    #[tokio::test]
    async fn test_list_filters_paginates_newest_first() {
        let store = MemoryStore::new();
        let mut repo = MemoryStudents::new(&store);

        for (name, class, status) in [
            ("a", "1A", StudentStatus::Active),
            ("b", "1B", StudentStatus::Active),
            ("c", "1A", StudentStatus::Graduated),
            ("d", "1A", StudentStatus::Active),
        ] {
            repo.create(&student(name, class, status, None)).await.unwrap();
        }

        let mut filter = StudentFilter::new(0, 2);
        filter.class = Some("1A".to_string());
        let page: Vec<_> = repo.list(&filter).await.unwrap().into_iter().map(|s| s.full_name).collect();
        assert_eq!(page, vec!["d", "c"]);
        assert_eq!(repo.count(&filter).await.unwrap(), 3);

        filter.status = Some(StudentStatus::Active);
        assert_eq!(repo.count(&filter).await.unwrap(), 2);

        let mut filter = StudentFilter::new(0, 10);
        filter.classes = Some(vec!["1B".to_string(), "9Z".to_string()]);
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stats_orders_gender_by_count() {
        let store = MemoryStore::new();
        let mut repo = MemoryStudents::new(&store);

        repo.create(&student("a", "2A", StudentStatus::Active, Some(Gender::Male))).await.unwrap();
        repo.create(&student("b", "1A", StudentStatus::Active, Some(Gender::Female))).await.unwrap();
        repo.create(&student("c", "1A", StudentStatus::Active, Some(Gender::Female))).await.unwrap();
        repo.create(&student("d", "1A", StudentStatus::Active, None)).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total_students, 4);
        assert_eq!(
            stats.gender_counts,
            vec![(Some(Gender::Female), 2), (Some(Gender::Male), 1), (None, 1)]
        );
        assert_eq!(stats.class_counts, vec![("1A".to_string(), 3), ("2A".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_terms() {
        let store = MemoryStore::new();
        let created = MemoryStudents::new(&store)
            .create(&student("a", "1A", StudentStatus::Active, None))
            .await
            .unwrap();

        let term = TermUpsertDBRequest {
            student_id: created.id,
            term_number: 1,
            academic_year: "2024-2025".to_string(),
            attendance: 90.0,
            academic_score: 70.0,
            remarks: None,
            attachment: None,
        };
        MemoryTerms::new(&store).upsert(&term).await.unwrap();

        assert!(MemoryStudents::new(&store).delete(created.id).await.unwrap());
        let remaining = MemoryTerms::new(&store).list(&TermFilter::new(created.id)).await.unwrap();
        assert!(remaining.is_empty());
    }
}
