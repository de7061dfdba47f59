use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, SubsecRound, Utc};
use common::FitterId;
use domain::{
    Customer, CustomerFilters, CustomerId, CustomerPage, CustomerRepository, CustomerSearch, Email,
    RepositoryError,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError, mapper,
    query::{CustomerQuery, Liveness, Window},
    record::CustomerRecord,
};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, CustomerRecord>,
    last_id: i64,
}

impl Table {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// Rows matching `query`, ordered by name then id.
    fn select(&self, query: &CustomerQuery) -> Vec<&CustomerRecord> {
        let mut rows: Vec<_> = self.rows.values().filter(|r| query.matches(r)).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        rows
    }

    /// Mirrors the partial unique index on `(COALESCE(fitter_id, 0), lower(email))`.
    fn check_unique_email(&self, record: &CustomerRecord) -> Result<()> {
        let Some(key) = record.email_key() else {
            return Ok(());
        };
        if record.is_deleted() {
            return Ok(());
        }
        let taken = self.rows.values().any(|other| {
            other.id != record.id
                && !other.is_deleted()
                && other.fitter_scope() == record.fitter_scope()
                && other.email_key().as_deref() == Some(key.as_str())
        });
        if taken {
            return Err(StoreError::EmailConflict {
                email: key,
                fitter_id: record.fitter_id.and_then(FitterId::from_raw),
            });
        }
        Ok(())
    }

    fn insert(&mut self, customer: &Customer) -> Result<CustomerRecord> {
        let mut record = mapper::to_record(customer);
        record.id = None;
        self.check_unique_email(&record)?;

        let id = self.next_id();
        record.id = Some(id);
        self.rows.insert(id, record.clone());
        Ok(record)
    }
}

/// In-memory customer repository.
///
/// Keeps records in the same shape as the `customers` table and goes through
/// the mapper on every read and write, including the email uniqueness index.
#[derive(Clone, Default)]
pub struct InMemoryCustomerRepository {
    table: Arc<RwLock<Table>>,
}

impl InMemoryCustomerRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored rows, deleted ones included.
    pub async fn row_count(&self) -> usize {
        self.table.read().await.rows.len()
    }

    /// Returns the raw stored record for an id.
    pub async fn record(&self, id: i64) -> Option<CustomerRecord> {
        self.table.read().await.rows.get(&id).cloned()
    }

    /// Stores a raw record as-is, bypassing the mapper.
    ///
    /// Useful for seeding legacy rows. Returns the assigned id.
    pub async fn insert_record(&self, mut record: CustomerRecord) -> i64 {
        let mut table = self.table.write().await;
        let id = match record.id {
            Some(id) => {
                table.last_id = table.last_id.max(id);
                id
            }
            None => table.next_id(),
        };
        record.id = Some(id);
        table.rows.insert(id, record);
        id
    }

    /// Removes every row.
    pub async fn clear(&self) {
        let mut table = self.table.write().await;
        table.rows.clear();
        table.last_id = 0;
    }

    async fn list(&self, query: CustomerQuery) -> Result<Vec<Customer>> {
        let table = self.table.read().await;
        table
            .select(&query)
            .into_iter()
            .cloned()
            .map(mapper::to_domain)
            .collect()
    }

    async fn count(&self, query: CustomerQuery) -> u64 {
        let table = self.table.read().await;
        table.rows.values().filter(|r| query.matches(r)).count() as u64
    }

    async fn first(&self, query: CustomerQuery) -> Result<Option<Customer>> {
        let table = self.table.read().await;
        let found = table.rows.values().find(|r| query.matches(r)).cloned();
        found.map(mapper::to_domain).transpose()
    }

    /// First live row holding `email`, limited to one fitter scope when given.
    async fn find_email(&self, email: &Email, scope: Option<i64>) -> Result<Option<Customer>> {
        let table = self.table.read().await;
        let found = table
            .rows
            .values()
            .find(|r| {
                !r.is_deleted()
                    && r.email_key().as_deref() == Some(email.as_str())
                    && scope.is_none_or(|scope| r.fitter_scope() == scope)
            })
            .cloned();
        found.map(mapper::to_domain).transpose()
    }

    async fn upsert(&self, customer: Customer) -> Result<Customer> {
        let mut table = self.table.write().await;

        let existing = customer.id().value().and_then(|id| table.rows.get(&id).cloned());
        let record = match existing {
            Some(existing) if existing.is_deleted() => {
                return Err(StoreError::Deleted(existing.id.unwrap_or_default()));
            }
            Some(mut record) => {
                mapper::update_record(&mut record, &customer);
                table.check_unique_email(&record)?;
                if let Some(id) = record.id {
                    table.rows.insert(id, record.clone());
                }
                record
            }
            None => table.insert(&customer)?,
        };
        mapper::to_domain(record)
    }

    async fn soft_delete(&self, id: &CustomerId) -> Result<()> {
        let Some(id) = id.value() else {
            return Ok(());
        };
        let mut table = self.table.write().await;
        let record = table.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if record.is_deleted() {
            return Ok(());
        }

        let now = Utc::now().trunc_subsecs(6);
        record.deleted = Some(true);
        record.status = "INACTIVE".to_string();
        record.updated_at = now.max(record.updated_at + Duration::microseconds(1));
        Ok(())
    }

    async fn insert_all(&self, customers: Vec<Customer>) -> Result<Vec<Customer>> {
        let mut table = self.table.write().await;

        // Stage on a copy so a conflict leaves the table untouched
        let mut staged = Table {
            rows: table.rows.clone(),
            last_id: table.last_id,
        };
        let records = customers
            .iter()
            .map(|customer| staged.insert(customer))
            .collect::<Result<Vec<_>>>()?;
        *table = staged;
        drop(table);

        records.into_iter().map(mapper::to_domain).collect()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(
        &self,
        id: &CustomerId,
    ) -> std::result::Result<Option<Customer>, RepositoryError> {
        let Some(id) = id.value() else {
            return Ok(None);
        };
        Ok(self.first(CustomerQuery::live().id(id)).await?)
    }

    async fn find_by_id_including_deleted(
        &self,
        id: &CustomerId,
    ) -> std::result::Result<Option<Customer>, RepositoryError> {
        let Some(id) = id.value() else {
            return Ok(None);
        };
        let query = CustomerQuery::live().liveness(Liveness::Any).id(id);
        Ok(self.first(query).await?)
    }

    async fn find_by_email(
        &self,
        email: &Email,
        fitter_id: Option<FitterId>,
    ) -> std::result::Result<Option<Customer>, RepositoryError> {
        let scope = fitter_id.map(|id| id.as_i64());
        Ok(self.find_email(email, scope).await?)
    }

    async fn find_by_email_in_fitter_scope(
        &self,
        email: &Email,
        fitter_id: Option<FitterId>,
    ) -> std::result::Result<Option<Customer>, RepositoryError> {
        let scope = fitter_id.map_or(0, |id| id.as_i64());
        Ok(self.find_email(email, Some(scope)).await?)
    }

    async fn exists_by_email(
        &self,
        email: &Email,
        fitter_id: Option<FitterId>,
    ) -> std::result::Result<bool, RepositoryError> {
        let scope = fitter_id.map(|id| id.as_i64());
        Ok(self.find_email(email, scope).await?.is_some())
    }

    async fn find_by_fitter_id(
        &self,
        fitter_id: FitterId,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self
            .list(CustomerQuery::live().fitter_id(fitter_id.as_i64()))
            .await?)
    }

    async fn find_by_country(
        &self,
        country: &str,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.list(CustomerQuery::live().country_equals(country)).await?)
    }

    async fn find_by_city(
        &self,
        city: &str,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.list(CustomerQuery::live().city_equals(city)).await?)
    }

    async fn find_active(&self) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.list(CustomerQuery::live()).await?)
    }

    async fn find_active_customers_without_fitter(
        &self,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.list(CustomerQuery::live().without_fitter()).await?)
    }

    async fn find_all(
        &self,
        filters: &CustomerFilters,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.list(CustomerQuery::from_filters(filters)).await?)
    }

    async fn find_all_paginated(
        &self,
        search: &CustomerSearch,
    ) -> std::result::Result<CustomerPage, RepositoryError> {
        let query = CustomerQuery::from_search(search);
        let window = Window::from(search.page);

        // One read guard covers both the count and the page
        let table = self.table.read().await;
        let matching = table.select(&query);
        let total = matching.len() as u64;
        let customers = matching
            .into_iter()
            .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
            .take(window.limit as usize)
            .cloned()
            .map(mapper::to_domain)
            .collect::<Result<Vec<_>>>()?;

        Ok(CustomerPage { customers, total })
    }

    async fn save(&self, customer: Customer) -> std::result::Result<Customer, RepositoryError> {
        Ok(self.upsert(customer).await?)
    }

    async fn delete(&self, id: &CustomerId) -> std::result::Result<(), RepositoryError> {
        Ok(self.soft_delete(id).await?)
    }

    async fn count_by_fitter_id(
        &self,
        fitter_id: FitterId,
    ) -> std::result::Result<u64, RepositoryError> {
        Ok(self
            .count(CustomerQuery::live().fitter_id(fitter_id.as_i64()))
            .await)
    }

    async fn count_active(&self) -> std::result::Result<u64, RepositoryError> {
        Ok(self.count(CustomerQuery::live()).await)
    }

    async fn bulk_create(
        &self,
        customers: Vec<Customer>,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.insert_all(customers).await?)
    }
}
