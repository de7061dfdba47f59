use async_trait::async_trait;
use common::FitterId;
use domain::{
    Customer, CustomerFilters, CustomerId, CustomerPage, CustomerRepository, CustomerSearch, Email,
    RepositoryError,
};
use sqlx::{
    PgConnection, PgPool, Postgres, QueryBuilder, Row,
    postgres::{PgArguments, PgPoolOptions, PgRow},
    query::Query,
};

use crate::{
    Result, StoreError, mapper,
    query::{CustomerQuery, Liveness, Window},
    record::CustomerRecord,
};

const COLUMNS: &str = "id, email, name, horse_name, company, address, city, state, zipcode, \
     country, phone_no, cell_no, bank_account_number, fitter_id, deleted, status, created_at, \
     updated_at";

/// PostgreSQL-backed customer repository.
#[derive(Clone)]
pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    /// Creates a new repository over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: &PgRow) -> sqlx::Result<CustomerRecord> {
        Ok(CustomerRecord {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            horse_name: row.try_get("horse_name")?,
            company: row.try_get("company")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            zipcode: row.try_get("zipcode")?,
            country: row.try_get("country")?,
            phone_no: row.try_get("phone_no")?,
            cell_no: row.try_get("cell_no")?,
            bank_account_number: row.try_get("bank_account_number")?,
            fitter_id: row.try_get("fitter_id")?,
            deleted: row.try_get("deleted")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn decode(row: &PgRow) -> Result<Customer> {
        mapper::to_domain(Self::row_to_record(row)?)
    }

    async fn list(&self, query: &CustomerQuery) -> Result<Vec<Customer>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM customers"));
        query.push_where(&mut qb);
        qb.push(" ORDER BY name ASC, id ASC");
        tracing::debug!(sql = qb.sql(), "listing customers");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::decode).collect()
    }

    async fn count(&self, query: &CustomerQuery) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers");
        query.push_where(&mut qb);

        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }

    async fn first(&self, query: &CustomerQuery) -> Result<Option<Customer>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM customers"));
        query.push_where(&mut qb);
        qb.push(" ORDER BY id ASC LIMIT 1");

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::decode).transpose()
    }

    /// First live row holding `email`, limited to one fitter scope when given.
    ///
    /// The scope expression matches the one in `customers_fitter_email_unique`.
    async fn find_email(&self, email: &Email, scope: Option<i64>) -> Result<Option<Customer>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM customers WHERE deleted IS NOT TRUE AND lower(email) = "
        ));
        qb.push_bind(email.as_str().to_string());
        if let Some(scope) = scope {
            qb.push(" AND COALESCE(fitter_id, 0) = ");
            qb.push_bind(scope);
        }
        qb.push(" ORDER BY id ASC LIMIT 1");

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::decode).transpose()
    }

    async fn search(&self, search: &CustomerSearch) -> Result<CustomerPage> {
        let query = CustomerQuery::from_search(search);
        let window = Window::from(search.page);

        // Count and page must read the same snapshot
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers");
        query.push_where(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&mut *tx).await?;

        let mut page_qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM customers"));
        query.push_where(&mut page_qb);
        page_qb.push(" ORDER BY name ASC, id ASC LIMIT ");
        page_qb.push_bind(i64::from(window.limit));
        page_qb.push(" OFFSET ");
        page_qb.push_bind(i64::try_from(window.offset).unwrap_or(i64::MAX));
        tracing::debug!(sql = page_qb.sql(), total, "searching customers");

        let rows = page_qb.build().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let customers = rows.iter().map(Self::decode).collect::<Result<Vec<_>>>()?;
        Ok(CustomerPage {
            customers,
            total: total.max(0) as u64,
        })
    }

    async fn upsert(&self, customer: Customer) -> Result<Customer> {
        let record = mapper::to_record(&customer);
        let mut tx = self.pool.begin().await?;

        // Lock the row so a concurrent soft delete cannot slip in
        let existing: Option<Option<bool>> = match record.id {
            Some(id) => {
                sqlx::query_scalar("SELECT deleted FROM customers WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            None => None,
        };

        let written = match (record.id, existing) {
            (Some(id), Some(Some(true))) => return Err(StoreError::Deleted(id)),
            (Some(id), Some(_)) => update_row(&mut tx, id, &record).await,
            _ => insert_row(&mut tx, &record).await,
        }
        .map_err(|e| StoreError::from_write(e, record.email.as_deref(), customer.fitter_id()))?;

        tx.commit().await?;
        Self::decode(&written)
    }

    async fn soft_delete(&self, id: &CustomerId) -> Result<()> {
        let Some(id) = id.value() else {
            return Ok(());
        };

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET deleted = TRUE,
                status = 'INACTIVE',
                updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')
            WHERE id = $1 AND deleted IS NOT TRUE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?;
            if !exists {
                return Err(StoreError::NotFound(id));
            }
        }
        Ok(())
    }

    async fn insert_all(&self, customers: Vec<Customer>) -> Result<Vec<Customer>> {
        let mut tx = self.pool.begin().await?;
        let mut rows = Vec::with_capacity(customers.len());

        for customer in &customers {
            let mut record = mapper::to_record(customer);
            record.id = None;
            let row = insert_row(&mut tx, &record).await.map_err(|e| {
                StoreError::from_write(e, record.email.as_deref(), customer.fitter_id())
            })?;
            rows.push(row);
        }

        tx.commit().await?;
        tracing::debug!(count = rows.len(), "bulk inserted customers");
        rows.iter().map(Self::decode).collect()
    }
}

fn bind_record<'q>(
    query: Query<'q, Postgres, PgArguments>,
    record: &'q CustomerRecord,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(&record.email)
        .bind(&record.name)
        .bind(&record.horse_name)
        .bind(&record.company)
        .bind(&record.address)
        .bind(&record.city)
        .bind(&record.state)
        .bind(&record.zipcode)
        .bind(&record.country)
        .bind(&record.phone_no)
        .bind(&record.cell_no)
        .bind(&record.bank_account_number)
        .bind(record.fitter_id)
        .bind(record.deleted)
        .bind(&record.status)
        .bind(record.created_at)
        .bind(record.updated_at)
}

async fn insert_row(conn: &mut PgConnection, record: &CustomerRecord) -> sqlx::Result<PgRow> {
    let sql = format!(
        r#"
        INSERT INTO customers (email, name, horse_name, company, address, city, state, zipcode,
            country, phone_no, cell_no, bank_account_number, fitter_id, deleted, status,
            created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING {COLUMNS}
        "#
    );
    bind_record(sqlx::query(&sql), record)
        .fetch_one(conn)
        .await
}

async fn update_row(
    conn: &mut PgConnection,
    id: i64,
    record: &CustomerRecord,
) -> sqlx::Result<PgRow> {
    let sql = format!(
        r#"
        UPDATE customers SET
            email = $1, name = $2, horse_name = $3, company = $4, address = $5, city = $6,
            state = $7, zipcode = $8, country = $9, phone_no = $10, cell_no = $11,
            bank_account_number = $12, fitter_id = $13, deleted = $14, status = $15,
            created_at = $16, updated_at = $17
        WHERE id = $18
        RETURNING {COLUMNS}
        "#
    );
    bind_record(sqlx::query(&sql), record)
        .bind(id)
        .fetch_one(conn)
        .await
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn find_by_id(
        &self,
        id: &CustomerId,
    ) -> std::result::Result<Option<Customer>, RepositoryError> {
        let Some(id) = id.value() else {
            return Ok(None);
        };
        Ok(self.first(&CustomerQuery::live().id(id)).await?)
    }

    async fn find_by_id_including_deleted(
        &self,
        id: &CustomerId,
    ) -> std::result::Result<Option<Customer>, RepositoryError> {
        let Some(id) = id.value() else {
            return Ok(None);
        };
        let query = CustomerQuery::live().liveness(Liveness::Any).id(id);
        Ok(self.first(&query).await?)
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
            .list(&CustomerQuery::live().fitter_id(fitter_id.as_i64()))
            .await?)
    }

    async fn find_by_country(
        &self,
        country: &str,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self
            .list(&CustomerQuery::live().country_equals(country))
            .await?)
    }

    async fn find_by_city(
        &self,
        city: &str,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.list(&CustomerQuery::live().city_equals(city)).await?)
    }

    async fn find_active(&self) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.list(&CustomerQuery::live()).await?)
    }

    async fn find_active_customers_without_fitter(
        &self,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.list(&CustomerQuery::live().without_fitter()).await?)
    }

    async fn find_all(
        &self,
        filters: &CustomerFilters,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.list(&CustomerQuery::from_filters(filters)).await?)
    }

    async fn find_all_paginated(
        &self,
        search: &CustomerSearch,
    ) -> std::result::Result<CustomerPage, RepositoryError> {
        Ok(self.search(search).await?)
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
            .count(&CustomerQuery::live().fitter_id(fitter_id.as_i64()))
            .await?)
    }

    async fn count_active(&self) -> std::result::Result<u64, RepositoryError> {
        Ok(self.count(&CustomerQuery::live()).await?)
    }

    async fn bulk_create(
        &self,
        customers: Vec<Customer>,
    ) -> std::result::Result<Vec<Customer>, RepositoryError> {
        Ok(self.insert_all(customers).await?)
    }
}
