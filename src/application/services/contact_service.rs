//! Public contact form intake and its superuser inbox.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::application::services::access_control::{Action, Resource, authorize};
use crate::domain::entities::{Account, ContactSubmission, NewContactSubmission};
use crate::domain::repositories::ContactRepository;
use crate::error::AppError;

/// Largest page returned by [`ContactService::list`].
pub const MAX_SUBMISSION_PAGE: i64 = 100;

pub struct ContactService {
    submissions: Arc<dyn ContactRepository>,
}

impl ContactService {
    pub fn new(submissions: Arc<dyn ContactRepository>) -> Self {
        Self { submissions }
    }

    /// Stores a message from an anonymous visitor. Fields are trimmed.
    pub async fn submit(&self, input: NewContactSubmission) -> Result<ContactSubmission, AppError> {
        let submission = NewContactSubmission {
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            message: input.message.trim().to_string(),
        };
        if submission.first_name.is_empty() || submission.message.is_empty() {
            return Err(AppError::bad_request(
                "First name and message must not be blank",
                json!({}),
            ));
        }

        let stored = self.submissions.create(submission).await?;
        info!(submission_id = stored.id, "Contact submission received");
        Ok(stored)
    }

    /// A page of submissions, newest first.
    ///
    /// `limit` is clamped to `1..=`[`MAX_SUBMISSION_PAGE`]; a negative
    /// `skip` counts as zero.
    pub async fn list(
        &self,
        actor: &Account,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ContactSubmission>, AppError> {
        authorize(actor, Action::ListSubmissions, Resource::Site)?;
        self.submissions
            .list(skip.max(0), limit.clamp(1, MAX_SUBMISSION_PAGE))
            .await
    }

    /// Removes a submission and returns what was removed.
    ///
    /// # Errors
    ///
    /// - [`AppError::Forbidden`] for non-superusers
    /// - [`AppError::NotFound`] if no submission has this id
    pub async fn delete(&self, actor: &Account, id: i64) -> Result<ContactSubmission, AppError> {
        authorize(actor, Action::DeleteSubmission, Resource::Site)?;

        let removed = self.submissions.delete(id).await?.ok_or_else(|| {
            AppError::not_found("Submission not found", json!({ "submission_id": id }))
        })?;
        info!(submission_id = id, actor_id = actor.id, "Contact submission deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockContactRepository;
    use crate::infrastructure::persistence::MemoryStore;
    use chrono::Utc;

    fn account(id: i64, is_superuser: bool) -> Account {
        Account {
            id,
            email: format!("user{id}@example.com"),
            password_hash: String::new(),
            is_active: true,
            is_superuser,
            is_verified: true,
            created_at: Utc::now(),
        }
    }

    fn message(first_name: &str, body: &str) -> NewContactSubmission {
        NewContactSubmission {
            first_name: first_name.to_string(),
            last_name: "Lovelace".to_string(),
            email: " Ada@Example.com ".to_string(),
            message: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_trims_and_normalizes_email() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));

        let stored = service
            .submit(message("  Ada ", "  Hello there \n"))
            .await
            .unwrap();

        assert_eq!(stored.first_name, "Ada");
        assert_eq!(stored.email, "ada@example.com");
        assert_eq!(stored.message, "Hello there");
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_message() {
        let mut repo = MockContactRepository::new();
        repo.expect_create().never();
        let service = ContactService::new(Arc::new(repo));

        let err = service.submit(message("Ada", "   ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_inbox_is_superuser_only() {
        let mut repo = MockContactRepository::new();
        repo.expect_list().never();
        repo.expect_delete().never();
        let service = ContactService::new(Arc::new(repo));
        let user = account(2, false);

        let err = service.list(&user, 0, 10).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let err = service.delete(&user, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_list_clamps_paging() {
        let mut repo = MockContactRepository::new();
        repo.expect_list()
            .withf(|skip, limit| *skip == 0 && *limit == MAX_SUBMISSION_PAGE)
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let service = ContactService::new(Arc::new(repo));

        let page = service.list(&account(1, true), -5, 10_000).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paged() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));
        for body in ["first", "second", "third"] {
            service.submit(message("Ada", body)).await.unwrap();
        }
        let admin = account(1, true);

        let page = service.list(&admin, 0, 2).await.unwrap();
        let bodies: Vec<&str> = page.iter().map(|s| s.message.as_str()).collect();
        assert_eq!(bodies, vec!["third", "second"]);

        let rest = service.list(&admin, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].message, "first");
    }

    #[tokio::test]
    async fn test_delete_returns_removed_then_not_found() {
        let service = ContactService::new(Arc::new(MemoryStore::new()));
        let stored = service.submit(message("Ada", "hello")).await.unwrap();
        let admin = account(1, true);

        let removed = service.delete(&admin, stored.id).await.unwrap();
        assert_eq!(removed, stored);

        let err = service.delete(&admin, stored.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
