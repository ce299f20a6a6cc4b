use super::MemoryStore;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::TermRepository,
    models::terms::{TermDBResponse, TermFilter, TermUpsertDBRequest, TermUpsertDBResponse},
};
use crate::types::{StudentId, TermId};
use chrono::Utc;
use tracing::instrument;

pub struct MemoryTerms<'a> {
    store: &'a MemoryStore,
}

impl<'a> MemoryTerms<'a> {
    pub fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl<'a> TermRepository for MemoryTerms<'a> {
    #[instrument(skip(self, request), fields(student_id = request.student_id, term_number = request.term_number, academic_year = %request.academic_year), err)]
    async fn upsert(&mut self, request: &TermUpsertDBRequest) -> Result<TermUpsertDBResponse> {
        let mut tables = self.store.tables.write().await;

        if !tables.students.contains(request.student_id) {
            return Err(DbError::foreign_key_violation("student_terms", "student_terms_student_id_fkey"));
        }

        let now = Utc::now();
        let existing = tables.terms.values_mut().find(|t| {
            t.student_id == request.student_id && t.term_number == request.term_number && t.academic_year == request.academic_year
        });

        if let Some(term) = existing {
            term.attendance = request.attendance;
            term.academic_score = request.academic_score;
            term.remarks = request.remarks.clone();
            term.updated_at = now;

            let mut replaced_file_path = None;
            if let Some(attachment) = &request.attachment {
                if term.file_path.as_ref().is_some_and(|old| old != &attachment.file_path) {
                    replaced_file_path = term.file_path.take();
                }
                term.file_name = Some(attachment.file_name.clone());
                term.file_path = Some(attachment.file_path.clone());
                term.file_size = Some(attachment.file_size);
                term.file_type = Some(attachment.file_type.clone());
            }

            return Ok(TermUpsertDBResponse {
                term: term.clone(),
                replaced_file_path,
            });
        }

        let id = tables.terms.allocate_id();
        let attachment = request.attachment.as_ref();
        let term = TermDBResponse {
            id,
            student_id: request.student_id,
            term_number: request.term_number,
            academic_year: request.academic_year.clone(),
            attendance: request.attendance,
            academic_score: request.academic_score,
            remarks: request.remarks.clone(),
            file_name: attachment.map(|a| a.file_name.clone()),
            file_path: attachment.map(|a| a.file_path.clone()),
            file_size: attachment.map(|a| a.file_size),
            file_type: attachment.map(|a| a.file_type.clone()),
            created_at: now,
            updated_at: now,
        };
        tables.terms.insert(id, term.clone());

        Ok(TermUpsertDBResponse {
            term,
            replaced_file_path: None,
        })
    }

    #[instrument(skip(self), err)]
    async fn get_for_student(&mut self, student_id: StudentId, term_id: TermId) -> Result<Option<TermDBResponse>> {
        let tables = self.store.tables.read().await;
        Ok(tables.terms.get(term_id).filter(|t| t.student_id == student_id).cloned())
    }

    #[instrument(skip(self, filter), fields(student_id = filter.student_id), err)]
    async fn list(&mut self, filter: &TermFilter) -> Result<Vec<TermDBResponse>> {
        let tables = self.store.tables.read().await;
        let mut terms: Vec<_> = tables.terms.values().filter(|t| filter.matches(t)).cloned().collect();
        terms.sort_by(|a, b| (&a.academic_year, a.term_number).cmp(&(&b.academic_year, b.term_number)));

        Ok(terms)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, term_id: TermId) -> Result<bool> {
        Ok(self.store.tables.write().await.terms.remove(term_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::students::{CcaOptional, StudentStatus};
    use crate::db::handlers::repository::Repository;
    use crate::db::memory::MemoryStudents;
    use crate::db::models::{students::StudentCreateDBRequest, terms::TermAttachment};
    use chrono::NaiveDate;

    async fn create_student(store: &MemoryStore) -> StudentId {
        let request = StudentCreateDBRequest {
            full_name: "Nadia".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(),
            class: "4A".to_string(),
            status: StudentStatus::Active,
            sports_house: None,
            cca: None,
            cca_optional: CcaOptional::NoActivity,
            quran_teacher: None,
            gender: None,
        };
        MemoryStudents::new(store).create(&request).await.unwrap().id
    }

    fn upsert(student_id: StudentId, term_number: i32, year: &str, file: Option<&str>) -> TermUpsertDBRequest {
        TermUpsertDBRequest {
            student_id,
            term_number,
            academic_year: year.to_string(),
            attendance: 88.0,
            academic_score: 91.5,
            remarks: Some("Good".to_string()),
            attachment: file.map(|path| TermAttachment {
                file_name: "scan.png".to_string(),
                file_path: path.to_string(),
                file_size: 3,
                file_type: "image/png".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_term_and_year() {
        let store = MemoryStore::new();
        let student_id = create_student(&store).await;
        let mut repo = MemoryTerms::new(&store);

        let first = repo.upsert(&upsert(student_id, 2, "2024-2025", Some("old.png"))).await.unwrap();
        let kept = repo.upsert(&upsert(student_id, 2, "2024-2025", None)).await.unwrap();
        assert_eq!(kept.term.id, first.term.id);
        assert_eq!(kept.term.file_path.as_deref(), Some("old.png"));
        assert_eq!(kept.replaced_file_path, None);

        let replaced = repo.upsert(&upsert(student_id, 2, "2024-2025", Some("new.png"))).await.unwrap();
        assert_eq!(replaced.replaced_file_path.as_deref(), Some("old.png"));

        // A different year is a different record
        repo.upsert(&upsert(student_id, 2, "2025-2026", None)).await.unwrap();
        let all = repo.list(&TermFilter::new(student_id)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].academic_year, "2024-2025");
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = MemoryStore::new();
        let student_id = create_student(&store).await;
        let mut repo = MemoryTerms::new(&store);

        repo.upsert(&upsert(student_id, 3, "2024-2025", None)).await.unwrap();
        repo.upsert(&upsert(student_id, 1, "2025-2026", None)).await.unwrap();
        repo.upsert(&upsert(student_id, 1, "2024-2025", None)).await.unwrap();

        let order: Vec<_> = repo
            .list(&TermFilter::new(student_id))
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.academic_year, t.term_number))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2024-2025".to_string(), 1),
                ("2024-2025".to_string(), 3),
                ("2025-2026".to_string(), 1)
            ]
        );

        let mut filter = TermFilter::new(student_id);
        filter.term_number = Some(1);
        assert_eq!(repo.list(&filter).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_requires_student() {
        let store = MemoryStore::new();
        let result = MemoryTerms::new(&store).upsert(&upsert(99, 1, "2024-2025", None)).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
    }

    #[tokio::test]
    async fn test_get_is_scoped_to_student() {
        let store = MemoryStore::new();
        let student_id = create_student(&store).await;
        let other = create_student(&store).await;
        let mut repo = MemoryTerms::new(&store);

        let term = repo.upsert(&upsert(student_id, 1, "2024-2025", None)).await.unwrap().term;
        assert!(repo.get_for_student(student_id, term.id).await.unwrap().is_some());
        assert!(repo.get_for_student(other, term.id).await.unwrap().is_none());
    }
}
