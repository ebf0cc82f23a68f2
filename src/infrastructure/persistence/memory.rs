//! In-process storage backend.
//!
//! Implements every repository trait over one mutex-guarded state so that
//! multi-table operations (cascading deletes, click batches with rollups)
//! are atomic. Used with `STORAGE_BACKEND=memory` and throughout the tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::domain::entities::{
    Account, AnalyticsScope, Click, ContactSubmission, Dimension, Interval, Link, NewAccount,
    NewClick, NewContactSubmission, NewLink, RollupRow, TimeBucket, TimeRange,
};
use crate::domain::repositories::{
    AccountRepository, ClickRepository, ContactRepository, LinkRepository,
};
use crate::error::AppError;

const TOTAL_DIMENSION: &str = "total";

type RollupKey = (i64, NaiveDate, &'static str, String);

#[derive(Default)]
struct State {
    next_link_id: i64,
    next_click_id: i64,
    next_account_id: i64,
    links: BTreeMap<i64, Link>,
    codes: HashMap<String, i64>,
    clicks: Vec<Click>,
    rollups: HashMap<RollupKey, i64>,
    accounts: BTreeMap<i64, Account>,
    emails: HashMap<String, i64>,
    tokens: HashMap<String, (i64, DateTime<Utc>)>,
    next_submission_id: i64,
    submissions: BTreeMap<i64, ContactSubmission>,
}

impl State {
    fn in_scope(&self, scope: AnalyticsScope, link_id: i64) -> bool {
        match scope {
            AnalyticsScope::Link(id) => id == link_id,
            AnalyticsScope::Owner(owner) => self
                .links
                .get(&link_id)
                .is_some_and(|link| link.owner_id == owner),
            AnalyticsScope::All => true,
        }
    }

    fn scoped_clicks(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
    ) -> impl Iterator<Item = &Click> + '_ {
        self.clicks
            .iter()
            .filter(move |c| self.in_scope(scope, c.link_id) && range.contains(c.occurred_at))
    }

    fn add_rollups(&mut self, click: &Click) {
        let day = click.occurred_at.date_naive();
        *self
            .rollups
            .entry((click.link_id, day, TOTAL_DIMENSION, String::new()))
            .or_default() += 1;
        for dimension in Dimension::ALL {
            let category = category_of(click, dimension).to_string();
            *self
                .rollups
                .entry((click.link_id, day, dimension.as_str(), category))
                .or_default() += 1;
        }
    }

    fn remove_link(&mut self, id: i64) -> bool {
        let Some(link) = self.links.remove(&id) else {
            return false;
        };
        self.codes.remove(&link.short_code);
        self.clicks.retain(|c| c.link_id != id);
        self.rollups.retain(|(link_id, ..), _| *link_id != id);
        true
    }
}

fn category_of(click: &Click, dimension: Dimension) -> &str {
    match dimension {
        Dimension::Country => &click.country,
        Dimension::Referrer => &click.referrer,
        Dimension::Browser => &click.browser,
        Dimension::Device => &click.device,
    }
}

fn newest_first(mut links: Vec<Link>) -> Vec<Link> {
    links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    links
}

/// Storage backend that lives entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::internal("Memory store lock poisoned", serde_json::json!({})))
    }
}

#[async_trait]
impl LinkRepository for MemoryStore {
    async fn insert_if_absent(&self, new_link: NewLink) -> Result<Option<Link>, AppError> {
        let mut state = self.lock()?;
        if state.codes.contains_key(&new_link.short_code) {
            return Ok(None);
        }

        state.next_link_id += 1;
        let link = Link {
            id: state.next_link_id,
            short_code: new_link.short_code,
            original_url: new_link.original_url,
            owner_id: new_link.owner_id,
            tag: new_link.tag,
            created_at: Utc::now(),
            expires_at: new_link.expires_at,
            click_count: 0,
        };
        state.codes.insert(link.short_code.clone(), link.id);
        state.links.insert(link.id, link.clone());
        Ok(Some(link))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        Ok(self.lock()?.links.get(&id).cloned())
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<Link>, AppError> {
        let state = self.lock()?;
        Ok(state
            .codes
            .get(short_code)
            .and_then(|id| state.links.get(id))
            .cloned())
    }

    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError> {
        let state = self.lock()?;
        Ok(newest_first(
            state
                .links
                .values()
                .filter(|l| l.owner_id == owner_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Link>, AppError> {
        Ok(newest_first(self.lock()?.links.values().cloned().collect()))
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Link>, AppError> {
        let state = self.lock()?;
        let mut expired: Vec<Link> = state
            .links
            .values()
            .filter(|l| l.is_expired_at(now))
            .cloned()
            .collect();
        expired.sort_by(|a, b| b.expires_at.cmp(&a.expires_at).then(b.id.cmp(&a.id)));
        Ok(expired)
    }

    async fn update_expiration(
        &self,
        id: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Link>, AppError> {
        let mut state = self.lock()?;
        Ok(state.links.get_mut(&id).map(|link| {
            link.expires_at = expires_at;
            link.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.lock()?.remove_link(id))
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.lock()?.links.len() as i64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }

    async fn increment_clicks(&self, short_code: &str, by: i64) -> Result<(), AppError> {
        let mut state = self.lock()?;
        if let Some(id) = state.codes.get(short_code).copied()
            && let Some(link) = state.links.get_mut(&id)
        {
            link.click_count += by;
        }
        Ok(())
    }

    async fn reconcile_click_counts(&self) -> Result<u64, AppError> {
        let mut state = self.lock()?;
        let mut actual: HashMap<i64, i64> = HashMap::new();
        for click in &state.clicks {
            *actual.entry(click.link_id).or_default() += 1;
        }

        let mut changed = 0;
        for link in state.links.values_mut() {
            let count = actual.get(&link.id).copied().unwrap_or(0);
            if link.click_count != count {
                link.click_count = count;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl ClickRepository for MemoryStore {
    async fn insert_batch(&self, clicks: &[NewClick]) -> Result<u64, AppError> {
        let mut state = self.lock()?;
        let mut written = 0;

        for new_click in clicks {
            if !state.links.contains_key(&new_click.link_id) {
                continue;
            }
            state.next_click_id += 1;
            let click = Click {
                id: state.next_click_id,
                link_id: new_click.link_id,
                occurred_at: new_click.occurred_at,
                country: new_click.country.clone(),
                referrer: new_click.referrer.clone(),
                browser: new_click.browser.clone(),
                device: new_click.device.clone(),
                ip_address: new_click.ip_address.clone(),
            };
            state.add_rollups(&click);
            state.clicks.push(click);
            written += 1;
        }

        Ok(written)
    }

    async fn count(&self, scope: AnalyticsScope, range: TimeRange) -> Result<i64, AppError> {
        Ok(self.lock()?.scoped_clicks(scope, range).count() as i64)
    }

    async fn last_clicked_at(&self, link_id: i64) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self
            .lock()?
            .clicks
            .iter()
            .filter(|c| c.link_id == link_id)
            .map(|c| c.occurred_at)
            .max())
    }

    async fn count_by_bucket(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        interval: Interval,
    ) -> Result<Vec<TimeBucket>, AppError> {
        let state = self.lock()?;
        let mut buckets: BTreeMap<DateTime<Utc>, i64> = BTreeMap::new();
        for click in state.scoped_clicks(scope, range) {
            *buckets.entry(interval.bucket_start(click.occurred_at)).or_default() += 1;
        }

        Ok(buckets
            .into_iter()
            .map(|(bucket_start, count)| TimeBucket {
                bucket_start,
                count,
            })
            .collect())
    }

    async fn count_by_category(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        dimension: Dimension,
    ) -> Result<HashMap<String, i64>, AppError> {
        let state = self.lock()?;
        let mut counts: HashMap<String, i64> = HashMap::new();
        for click in state.scoped_clicks(scope, range) {
            *counts
                .entry(category_of(click, dimension).to_string())
                .or_default() += 1;
        }
        Ok(counts)
    }

    async fn rollup_rows(
        &self,
        scope: AnalyticsScope,
        range: TimeRange,
        dimension: Option<Dimension>,
    ) -> Result<Vec<RollupRow>, AppError> {
        let state = self.lock()?;
        let wanted = dimension.map_or(TOTAL_DIMENSION, |d| d.as_str());

        let mut folded: BTreeMap<(NaiveDate, String), i64> = BTreeMap::new();
        for ((link_id, day, dim, category), clicks) in &state.rollups {
            if *dim == wanted && range.contains_day(*day) && state.in_scope(scope, *link_id) {
                *folded.entry((*day, category.clone())).or_default() += clicks;
            }
        }

        Ok(folded
            .into_iter()
            .map(|((day, category), clicks)| RollupRow {
                day,
                category,
                clicks,
            })
            .collect())
    }

    async fn rebuild_rollups(&self) -> Result<u64, AppError> {
        let mut state = self.lock()?;
        state.rollups.clear();
        let clicks = std::mem::take(&mut state.clicks);
        for click in &clicks {
            state.add_rollups(click);
        }
        state.clicks = clicks;
        Ok(state.rollups.len() as u64)
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create(&self, new_account: NewAccount) -> Result<Account, AppError> {
        let mut state = self.lock()?;
        if state.emails.contains_key(&new_account.email) {
            return Err(AppError::conflict(
                "Email already registered",
                serde_json::json!({ "email": new_account.email }),
            ));
        }

        state.next_account_id += 1;
        let account = Account {
            id: state.next_account_id,
            email: new_account.email,
            password_hash: new_account.password_hash,
            is_active: true,
            is_superuser: new_account.is_superuser,
            is_verified: false,
            created_at: Utc::now(),
        };
        state.emails.insert(account.email.clone(), account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, AppError> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let state = self.lock()?;
        Ok(state
            .emails
            .get(email)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.lock()?.accounts.values().cloned().collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.lock()?.accounts.len() as i64)
    }

    async fn set_active(&self, id: i64, is_active: bool) -> Result<Option<Account>, AppError> {
        let mut state = self.lock()?;
        Ok(state.accounts.get_mut(&id).map(|account| {
            account.is_active = is_active;
            account.clone()
        }))
    }

    async fn mark_verified(&self, id: i64) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        Ok(state
            .accounts
            .get_mut(&id)
            .map(|account| account.is_verified = true)
            .is_some())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        let Some(account) = state.accounts.remove(&id) else {
            return Ok(false);
        };
        state.emails.remove(&account.email);
        state.tokens.retain(|_, (account_id, _)| *account_id != id);

        let owned: Vec<i64> = state
            .links
            .values()
            .filter(|l| l.owner_id == id)
            .map(|l| l.id)
            .collect();
        for link_id in owned {
            state.remove_link(link_id);
        }
        Ok(true)
    }

    async fn store_verification_token(
        &self,
        account_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.lock()?
            .tokens
            .insert(token_hash.to_string(), (account_id, expires_at));
        Ok(())
    }

    async fn consume_verification_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, AppError> {
        let mut state = self.lock()?;
        Ok(state
            .tokens
            .remove(token_hash)
            .filter(|(_, expires_at)| now < *expires_at)
            .map(|(account_id, _)| account_id))
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn create(&self, submission: NewContactSubmission) -> Result<ContactSubmission, AppError> {
        let mut state = self.lock()?;
        state.next_submission_id += 1;
        let stored = ContactSubmission {
            id: state.next_submission_id,
            first_name: submission.first_name,
            last_name: submission.last_name,
            email: submission.email,
            message: submission.message,
            created_at: Utc::now(),
        };
        state.submissions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<ContactSubmission>, AppError> {
        let state = self.lock()?;
        let mut submissions: Vec<ContactSubmission> = state.submissions.values().cloned().collect();
        submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(submissions
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<Option<ContactSubmission>, AppError> {
        Ok(self.lock()?.submissions.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn seeded() -> (MemoryStore, Account, Link) {
        let store = MemoryStore::new();
        let account = AccountRepository::create(
            &store,
            NewAccount {
                email: "owner@example.com".to_string(),
                password_hash: "hash".to_string(),
                is_superuser: false,
            },
        )
        .await
        .unwrap();
        let link = store
            .insert_if_absent(NewLink {
                short_code: "abc1234".to_string(),
                original_url: "https://example.com".to_string(),
                owner_id: account.id,
                tag: None,
                expires_at: None,
            })
            .await
            .unwrap()
            .unwrap();
        (store, account, link)
    }

    fn click(link_id: i64, at: DateTime<Utc>, country: &str) -> NewClick {
        NewClick {
            link_id,
            short_code: "abc1234".to_string(),
            occurred_at: at,
            country: country.to_string(),
            referrer: "Direct".to_string(),
            browser: "Chrome".to_string(),
            device: "Desktop".to_string(),
            ip_address: None,
        }
    }

    #[tokio::test]
    async fn test_insert_if_absent_rejects_taken_code() {
        let (store, account, _) = seeded().await;

        let again = store
            .insert_if_absent(NewLink {
                short_code: "abc1234".to_string(),
                original_url: "https://other.example".to_string(),
                owner_id: account.id,
                tag: None,
                expires_at: None,
            })
            .await
            .unwrap();

        assert!(again.is_none());
        assert_eq!(LinkRepository::count(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_batch_skips_orphans_and_writes_rollups() {
        let (store, _, link) = seeded().await;
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

        let written = store
            .insert_batch(&[click(link.id, at, "US"), click(999, at, "US")])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let totals = store
            .rollup_rows(AnalyticsScope::Link(link.id), TimeRange::default(), None)
            .await
            .unwrap();
        assert_eq!(
            totals,
            vec![RollupRow {
                day: at.date_naive(),
                category: String::new(),
                clicks: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_delete_link_cascades() {
        let (store, _, link) = seeded().await;
        store
            .insert_batch(&[click(link.id, Utc::now(), "US")])
            .await
            .unwrap();

        assert!(LinkRepository::delete(&store, link.id).await.unwrap());
        assert_eq!(
            ClickRepository::count(&store, AnalyticsScope::All, TimeRange::default())
                .await
                .unwrap(),
            0
        );
        assert!(
            store
                .rollup_rows(AnalyticsScope::All, TimeRange::default(), None)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(store.find_by_code("abc1234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_account_cascades_to_links() {
        let (store, account, link) = seeded().await;

        assert!(AccountRepository::delete(&store, account.id).await.unwrap());
        assert!(LinkRepository::find_by_id(&store, link.id).await.unwrap().is_none());
        assert!(store.find_by_email("owner@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reconcile_resets_counters() {
        let (store, _, link) = seeded().await;
        store
            .insert_batch(&[click(link.id, Utc::now(), "US"), click(link.id, Utc::now(), "DE")])
            .await
            .unwrap();
        store.increment_clicks("abc1234", 5).await.unwrap();

        assert_eq!(store.reconcile_click_counts().await.unwrap(), 1);
        let link = LinkRepository::find_by_id(&store, link.id).await.unwrap().unwrap();
        assert_eq!(link.click_count, 2);
        assert_eq!(store.reconcile_click_counts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rebuild_rollups_matches_incremental() {
        let (store, _, link) = seeded().await;
        let day = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        store
            .insert_batch(&[
                click(link.id, day, "US"),
                click(link.id, day, "US"),
                click(link.id, day + Duration::days(1), "DE"),
            ])
            .await
            .unwrap();

        let before = store
            .rollup_rows(AnalyticsScope::All, TimeRange::default(), Some(Dimension::Country))
            .await
            .unwrap();
        store.rebuild_rollups().await.unwrap();
        let after = store
            .rollup_rows(AnalyticsScope::All, TimeRange::default(), Some(Dimension::Country))
            .await
            .unwrap();

        assert_eq!(before, after);
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn test_verification_token_is_single_use_and_expires() {
        let (store, account, _) = seeded().await;
        let now = Utc::now();

        store
            .store_verification_token(account.id, "h1", now + Duration::hours(1))
            .await
            .unwrap();
        store
            .store_verification_token(account.id, "h2", now - Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(
            store.consume_verification_token("h1", now).await.unwrap(),
            Some(account.id)
        );
        assert_eq!(store.consume_verification_token("h1", now).await.unwrap(), None);
        assert_eq!(store.consume_verification_token("h2", now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (store, _, _) = seeded().await;
        let err = AccountRepository::create(
            &store,
            NewAccount {
                email: "owner@example.com".to_string(),
                password_hash: "x".to_string(),
                is_superuser: false,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
    }
}
