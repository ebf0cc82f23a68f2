//! Superuser operations on accounts and site-wide figures.

use chrono::NaiveTime;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::services::access_control::{Action, Resource, authorize};
use crate::domain::entities::{Account, AnalyticsScope, Interval, TimeBucket, TimeRange};
use crate::domain::repositories::{AccountRepository, ClickRepository, LinkRepository};
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;

/// Site-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteStats {
    pub total_users: i64,
    pub total_links: i64,
    pub total_clicks: i64,
}

pub struct AdminService {
    accounts: Arc<dyn AccountRepository>,
    links: Arc<dyn LinkRepository>,
    clicks: Arc<dyn ClickRepository>,
    cache: Arc<dyn CacheService>,
}

impl AdminService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        links: Arc<dyn LinkRepository>,
        clicks: Arc<dyn ClickRepository>,
        cache: Arc<dyn CacheService>,
    ) -> Self {
        Self {
            accounts,
            links,
            clicks,
            cache,
        }
    }

    pub async fn list_accounts(&self, actor: &Account) -> Result<Vec<Account>, AppError> {
        authorize(actor, Action::ListAccounts, Resource::Site)?;
        self.accounts.list_all().await
    }

    /// Activates or deactivates another account.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the account does not exist
    /// - [`AppError::Forbidden`] for non-superusers and for a superuser
    ///   targeting themselves
    pub async fn set_active(
        &self,
        actor: &Account,
        account_id: i64,
        is_active: bool,
    ) -> Result<Account, AppError> {
        authorize(actor, Action::UpdateAccount, Resource::Site)?;
        let target = self.find_account(account_id).await?;
        authorize(actor, Action::UpdateAccount, Resource::Account(&target))?;

        let updated = self
            .accounts
            .set_active(account_id, is_active)
            .await?
            .ok_or_else(|| account_not_found(account_id))?;

        info!(account_id, is_active, actor_id = actor.id, "Account status changed");
        Ok(updated)
    }

    /// Hard-deletes another account with its links and their clicks.
    ///
    /// Cached redirects for the removed links are evicted.
    pub async fn delete_account(&self, actor: &Account, account_id: i64) -> Result<(), AppError> {
        authorize(actor, Action::DeleteAccount, Resource::Site)?;
        let target = self.find_account(account_id).await?;
        authorize(actor, Action::DeleteAccount, Resource::Account(&target))?;

        let links_removed = self.remove_account(account_id).await?;
        info!(account_id, links_removed, actor_id = actor.id, "Account deleted");
        Ok(())
    }

    /// Deletes the caller's own account with its links and their clicks.
    ///
    /// # Errors
    ///
    /// - [`AppError::Forbidden`] for superusers
    /// - [`AppError::NotFound`] if the account is already gone
    pub async fn delete_self(&self, actor: &Account) -> Result<(), AppError> {
        authorize(actor, Action::CloseOwnAccount, Resource::Account(actor))?;

        let links_removed = self.remove_account(actor.id).await?;
        info!(account_id = actor.id, links_removed, "Account closed by owner");
        Ok(())
    }

    /// Deletes an account and evicts its cached redirects. Returns the
    /// number of links removed.
    async fn remove_account(&self, account_id: i64) -> Result<usize, AppError> {
        let owned = self.links.list_for_owner(account_id).await?;
        if !self.accounts.delete(account_id).await? {
            return Err(account_not_found(account_id));
        }

        for link in &owned {
            if let Err(e) = self.cache.invalidate(&link.short_code).await {
                warn!(short_code = %link.short_code, "Cache invalidation failed: {}", e);
            }
        }
        Ok(owned.len())
    }

    /// Totals over every account, link and stored click.
    pub async fn site_stats(&self, actor: &Account) -> Result<SiteStats, AppError> {
        authorize(actor, Action::ViewSiteStats, Resource::Site)?;

        Ok(SiteStats {
            total_users: self.accounts.count().await?,
            total_links: self.links.count().await?,
            total_clicks: self
                .clicks
                .count(AnalyticsScope::All, TimeRange::default())
                .await?,
        })
    }

    /// New accounts per calendar bucket, ascending and sparse.
    pub async fn registration_stats(
        &self,
        actor: &Account,
        interval: Interval,
    ) -> Result<Vec<TimeBucket>, AppError> {
        authorize(actor, Action::ViewSiteStats, Resource::Site)?;

        let mut buckets = BTreeMap::new();
        for account in self.accounts.list_all().await? {
            *buckets
                .entry(interval.truncate_date(account.created_at.date_naive()))
                .or_insert(0i64) += 1;
        }

        Ok(buckets
            .into_iter()
            .map(|(day, count)| TimeBucket {
                bucket_start: day.and_time(NaiveTime::MIN).and_utc(),
                count,
            })
            .collect())
    }

    async fn find_account(&self, account_id: i64) -> Result<Account, AppError> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| account_not_found(account_id))
    }
}

fn account_not_found(account_id: i64) -> AppError {
    AppError::not_found("User not found", json!({ "user_id": account_id }))
}
