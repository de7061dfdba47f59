//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p customer-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::FitterId;
use customer_store::PostgresCustomerRepository;
use domain::{
    Customer, CustomerDetails, CustomerFilters, CustomerId, CustomerRepository, CustomerSearch,
    CustomerStatus, Email, RepositoryError,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_customers_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh repository with its own pool and an empty table
async fn get_test_repo() -> PostgresCustomerRepository {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE customers RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresCustomerRepository::new(pool)
}

fn fitter(id: i64) -> FitterId {
    FitterId::from_raw(id).unwrap()
}

fn customer(details: CustomerDetails) -> Customer {
    Customer::create(CustomerId::generate(), details).unwrap()
}

#[tokio::test]
async fn save_assigns_id_and_round_trips() {
    let repo = get_test_repo().await;
    let details = CustomerDetails {
        name: "Jane Doe".into(),
        email: Some("Jane@Example.com".into()),
        horse_name: Some("Comet".into()),
        company: Some("Doe Stables".into()),
        address: Some("1 Rue de Rivoli".into()),
        city: Some("Paris".into()),
        state: Some("IDF".into()),
        zipcode: Some("75001".into()),
        country: Some("France".into()),
        phone_no: Some("0102030405".into()),
        cell_no: Some("0607080910".into()),
        bank_account_number: Some("FR76 0000".into()),
        fitter_id: Some(fitter(3)),
    };

    let saved = repo.save(customer(details)).await.unwrap();
    assert_eq!(saved.id().value(), Some(1));

    let loaded = repo.find_by_id(&saved.id()).await.unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.email().map(Email::as_str), Some("jane@example.com"));
}

#[tokio::test]
async fn save_updates_existing_row() {
    let repo = get_test_repo().await;
    let mut saved = repo
        .save(customer(CustomerDetails::named("Ann")))
        .await
        .unwrap();
    saved.assign_fitter(fitter(9)).unwrap();
    saved.deactivate().unwrap();

    let updated = repo.save(saved.clone()).await.unwrap();
    assert_eq!(updated, saved);
    assert_eq!(repo.count_by_fitter_id(fitter(9)).await.unwrap(), 1);
    assert_eq!(repo.count_active().await.unwrap(), 1);
}

#[tokio::test]
async fn soft_delete_hides_row_and_blocks_resurrection() {
    let repo = get_test_repo().await;
    let saved = repo
        .save(customer(CustomerDetails::named("Ann")))
        .await
        .unwrap();

    repo.delete(&saved.id()).await.unwrap();
    // Deleting twice is a no-op
    repo.delete(&saved.id()).await.unwrap();

    assert!(repo.find_by_id(&saved.id()).await.unwrap().is_none());
    assert!(repo.find_active().await.unwrap().is_empty());

    let historical = repo
        .find_by_id_including_deleted(&saved.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(historical.status(), CustomerStatus::Deleted);

    let (deleted, status): (Option<bool>, String) =
        sqlx::query_as("SELECT deleted, status FROM customers WHERE id = $1")
            .bind(saved.id().value())
            .fetch_one(repo.pool())
            .await
            .unwrap();
    assert_eq!(deleted, Some(true));
    assert_eq!(status, "INACTIVE");

    assert!(matches!(
        repo.save(saved).await,
        Err(RepositoryError::Deleted(_))
    ));
}

#[tokio::test]
async fn delete_unknown_id_is_not_found() {
    let repo = get_test_repo().await;
    let id = CustomerId::from_number(77).unwrap();
    assert!(matches!(
        repo.delete(&id).await,
        Err(RepositoryError::NotFound(77))
    ));
}

#[tokio::test]
async fn unique_index_backs_per_fitter_email() {
    let repo = get_test_repo().await;
    let ann = CustomerDetails::named("Ann")
        .with_email("a@b.com")
        .with_fitter(fitter(1));
    repo.save(customer(ann)).await.unwrap();

    let other_fitter = CustomerDetails::named("Bob")
        .with_email("a@b.com")
        .with_fitter(fitter(2));
    repo.save(customer(other_fitter)).await.unwrap();

    let same_fitter = CustomerDetails::named("Cid")
        .with_email("A@B.com")
        .with_fitter(fitter(1));
    let clash = repo.save(customer(same_fitter)).await;
    assert!(matches!(clash, Err(RepositoryError::EmailConflict { .. })));

    let email = Email::parse("a@b.com").unwrap();
    assert!(repo.exists_by_email(&email, None).await.unwrap());
    assert!(repo.exists_by_email(&email, Some(fitter(2))).await.unwrap());
    assert!(!repo.exists_by_email(&email, Some(fitter(3))).await.unwrap());
}

#[tokio::test]
async fn legacy_rows_read_through_mapper() {
    let repo = get_test_repo().await;
    sqlx::query(
        r#"
        INSERT INTO customers (name, fitter_id, deleted, status)
        VALUES ('Zero Fitter', 0, NULL, 'ACTIVE'),
               ('Status Only', NULL, NULL, 'DELETED')
        "#,
    )
    .execute(repo.pool())
    .await
    .unwrap();

    let without_fitter = repo.find_active_customers_without_fitter().await.unwrap();
    assert_eq!(without_fitter.len(), 2);
    assert!(without_fitter.iter().all(|c| !c.has_fitter()));

    let status_only = repo
        .find_by_id(&CustomerId::from_number(2).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status_only.status(), CustomerStatus::Inactive);
}

#[tokio::test]
async fn listings_filter_and_order() {
    let repo = get_test_repo().await;
    for (name, city, country) in [
        ("Cid", "Paris", "France"),
        ("Ann", "Parisot", "France"),
        ("Bob", "Madrid", "Spain"),
    ] {
        let details = CustomerDetails::named(name)
            .with_city(city)
            .with_country(country);
        repo.save(customer(details)).await.unwrap();
    }

    let names = |customers: Vec<Customer>| -> Vec<String> {
        customers.iter().map(|c| c.name().to_string()).collect()
    };

    assert_eq!(names(repo.find_active().await.unwrap()), ["Ann", "Bob", "Cid"]);
    assert_eq!(names(repo.find_by_city("PARIS").await.unwrap()), ["Cid"]);
    assert_eq!(
        names(repo.find_by_country("france").await.unwrap()),
        ["Ann", "Cid"]
    );
    assert_eq!(
        names(
            repo.find_all(&CustomerFilters::new().city("paris"))
                .await
                .unwrap()
        ),
        ["Ann", "Cid"]
    );
}

#[tokio::test]
async fn universal_search_matches_id_or_text() {
    let repo = get_test_repo().await;
    let batch: Vec<_> = (1..=45)
        .map(|i| customer(CustomerDetails::named(format!("Customer {i:02}"))))
        .collect();
    repo.bulk_create(batch).await.unwrap();

    // id 42 is also the only name containing "42"
    let page = repo
        .find_all_paginated(&CustomerSearch::new().search("42"))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.customers[0].id().value(), Some(42));

    // id 4 is "Customer 04"; names 04, 14, 24, 34 and 40-45 contain "4"
    let page = repo
        .find_all_paginated(&CustomerSearch::new().search("4").page(1, 5))
        .await
        .unwrap();
    assert_eq!(page.total, 10);
    assert_eq!(page.customers.len(), 5);

    let none = repo
        .find_all_paginated(&CustomerSearch::new().search("x4"))
        .await
        .unwrap();
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn numeric_search_finds_id_without_text_match() {
    let repo = get_test_repo().await;
    let mut batch: Vec<_> = (1..=41)
        .map(|_| customer(CustomerDetails::named("Filler")))
        .collect();
    batch.push(customer(
        CustomerDetails::named("Target")
            .with_email("target@example.com")
            .with_city("Paris")
            .with_country("France"),
    ));
    batch.push(customer(CustomerDetails::named("Stall 42 Riders")));
    repo.bulk_create(batch).await.unwrap();

    let page = repo
        .find_all_paginated(&CustomerSearch::new().search("42"))
        .await
        .unwrap();
    let found: Vec<_> = page
        .customers
        .iter()
        .map(|c| (c.id().value(), c.name().to_string()))
        .collect();

    assert_eq!(page.total, 2);
    assert_eq!(
        found,
        [
            (Some(43), "Stall 42 Riders".to_string()),
            (Some(42), "Target".to_string())
        ]
    );
}

#[tokio::test]
async fn fitter_queries_skip_deleted_rows() {
    let repo = get_test_repo().await;
    let ann = repo
        .save(customer(CustomerDetails::named("Ann").with_fitter(fitter(5))))
        .await
        .unwrap();
    repo.save(customer(CustomerDetails::named("Bob").with_fitter(fitter(5))))
        .await
        .unwrap();

    repo.delete(&ann.id()).await.unwrap();

    let listed = repo.find_by_fitter_id(fitter(5)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name(), "Bob");
    assert_eq!(repo.count_by_fitter_id(fitter(5)).await.unwrap(), 1);
}

#[tokio::test]
async fn scoped_email_lookup_matches_unique_index() {
    let repo = get_test_repo().await;
    repo.save(customer(CustomerDetails::named("Ann").with_email("a@b.com")))
        .await
        .unwrap();
    let bob = CustomerDetails::named("Bob")
        .with_email("a@b.com")
        .with_fitter(fitter(1));
    repo.save(customer(bob)).await.unwrap();

    let email = Email::parse("a@b.com").unwrap();
    let unassigned = repo
        .find_by_email_in_fitter_scope(&email, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unassigned.name(), "Ann");
    let scoped = repo
        .find_by_email_in_fitter_scope(&email, Some(fitter(1)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(scoped.name(), "Bob");
    assert!(
        repo.find_by_email_in_fitter_scope(&email, Some(fitter(2)))
            .await
            .unwrap()
            .is_none()
    );

    let clash = repo
        .save(customer(CustomerDetails::named("Cid").with_email("A@B.com")))
        .await;
    assert!(matches!(clash, Err(RepositoryError::EmailConflict { .. })));
}

#[tokio::test]
async fn search_escapes_like_metacharacters() {
    let repo = get_test_repo().await;
    repo.save(customer(CustomerDetails::named("100% Equine")))
        .await
        .unwrap();
    repo.save(customer(CustomerDetails::named("100 Horses")))
        .await
        .unwrap();

    let page = repo
        .find_all_paginated(&CustomerSearch::new().search("0%"))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.customers[0].name(), "100% Equine");
}

#[tokio::test]
async fn bulk_create_rolls_back_on_conflict() {
    let repo = get_test_repo().await;
    let batch = vec![
        customer(CustomerDetails::named("Ann").with_email("a@b.com")),
        customer(CustomerDetails::named("Bob").with_email("a@b.com")),
    ];

    assert!(matches!(
        repo.bulk_create(batch).await,
        Err(RepositoryError::EmailConflict { .. })
    ));
    assert_eq!(repo.count_active().await.unwrap(), 0);
}
