//! Customer service scenarios over the in-memory repository.

use common::FitterId;
use customer_store::InMemoryCustomerRepository;
use domain::{
    ContactInfoUpdate, CustomerDetails, CustomerError, CustomerEvent, CustomerFilters, CustomerId,
    CustomerRepository, CustomerSearch, CustomerService, CustomerStatus, DomainError, Email,
};

fn service() -> CustomerService<InMemoryCustomerRepository> {
    CustomerService::new(InMemoryCustomerRepository::new())
}

fn fitter(id: i64) -> FitterId {
    FitterId::from_raw(id).unwrap()
}

async fn create(
    service: &CustomerService<InMemoryCustomerRepository>,
    details: CustomerDetails,
) -> String {
    let result = service.create_customer(details).await.unwrap();
    result.customer.id.unwrap().to_string()
}

#[tokio::test]
async fn jane_doe_lifecycle() {
    let service = service();
    let id = create(&service, CustomerDetails::named("Jane Doe")).await;

    let jane = service.get_customer(&id).await.unwrap();
    assert!(!jane.deleted);
    assert_eq!(jane.fitter_id, None);
    assert_eq!(jane.email, None);
    service.ensure_order_eligible(&id).await.unwrap();

    let loaded = service
        .repository()
        .find_by_id(&CustomerId::from_string(&id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(loaded.is_active());
    assert!(!loaded.has_fitter());

    let deleted = service.delete_customer(&id).await.unwrap();
    assert!(matches!(
        deleted.events.as_slice(),
        [CustomerEvent::CustomerDeleted(_)]
    ));

    assert!(matches!(
        service.get_customer(&id).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(service.active_customers().await.unwrap().is_empty());
    assert!(matches!(
        service.ensure_order_eligible(&id).await,
        Err(DomainError::Validation(CustomerError::Deleted { .. }))
    ));

    let historical = service.get_customer_including_deleted(&id).await.unwrap();
    assert!(historical.deleted);
    assert_eq!(historical.status, CustomerStatus::Deleted);
}

#[tokio::test]
async fn shared_email_under_different_fitters() {
    let service = service();
    create(
        &service,
        CustomerDetails::named("Ann")
            .with_email("a@b.com")
            .with_fitter(fitter(1)),
    )
    .await;
    create(
        &service,
        CustomerDetails::named("Bob")
            .with_email("a@b.com")
            .with_fitter(fitter(2)),
    )
    .await;

    let repo = service.repository();
    let email = Email::parse("a@b.com").unwrap();
    assert!(repo.exists_by_email(&email, None).await.unwrap());
    assert!(repo.exists_by_email(&email, Some(fitter(1))).await.unwrap());
    assert!(repo.exists_by_email(&email, Some(fitter(2))).await.unwrap());
    assert!(!repo.exists_by_email(&email, Some(fitter(3))).await.unwrap());
}

#[tokio::test]
async fn duplicate_email_for_same_fitter_is_rejected() {
    let service = service();
    create(
        &service,
        CustomerDetails::named("Ann")
            .with_email("a@b.com")
            .with_fitter(fitter(1)),
    )
    .await;

    let result = service
        .create_customer(
            CustomerDetails::named("Bob")
                .with_email("A@B.COM")
                .with_fitter(fitter(1)),
        )
        .await;
    assert!(matches!(result, Err(DomainError::EmailConflict { .. })));
    assert_eq!(service.count_active().await.unwrap(), 1);
}

#[tokio::test]
async fn update_city_only_keeps_other_fields() {
    let service = service();
    let id = create(
        &service,
        CustomerDetails::named("Jane Doe")
            .with_email("jane@example.com")
            .with_company("Doe Stables"),
    )
    .await;
    let before = service.get_customer(&id).await.unwrap();

    let result = service
        .update_customer(&id, ContactInfoUpdate::new().city("Paris"))
        .await
        .unwrap();
    let after = result.customer;

    assert_eq!(after.city.as_deref(), Some("Paris"));
    assert_eq!(after.name, before.name);
    assert_eq!(after.email, before.email);
    assert_eq!(after.company, before.company);
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test]
async fn update_email_conflict_with_other_customer() {
    let service = service();
    create(&service, CustomerDetails::named("Ann").with_email("ann@x.io")).await;
    let bob = create(&service, CustomerDetails::named("Bob").with_email("bob@x.io")).await;

    let clash = service
        .update_customer(&bob, ContactInfoUpdate::new().email("ANN@x.io"))
        .await;
    assert!(matches!(clash, Err(DomainError::EmailConflict { .. })));

    // Re-setting one's own email is not a conflict
    let same = service
        .update_customer(&bob, ContactInfoUpdate::new().email("Bob@x.io"))
        .await;
    assert!(same.is_ok());
}

#[tokio::test]
async fn clearing_email_through_update() {
    let service = service();
    let id = create(&service, CustomerDetails::named("Ann").with_email("ann@x.io")).await;

    let result = service
        .update_customer(&id, ContactInfoUpdate::new().clear_email())
        .await
        .unwrap();
    assert_eq!(result.customer.email, None);
}

#[tokio::test]
async fn assign_fitter_twice_saves_once() {
    let service = service();
    let id = create(&service, CustomerDetails::named("Ann")).await;

    let first = service.assign_fitter(&id, fitter(5)).await.unwrap();
    assert_eq!(first.events.len(), 1);
    let second = service.assign_fitter(&id, fitter(5)).await.unwrap();
    assert!(second.events.is_empty());
    assert_eq!(second.customer.updated_at, first.customer.updated_at);

    assert_eq!(service.count_by_fitter(fitter(5)).await.unwrap(), 1);
    assert_eq!(service.customers_for_fitter(fitter(5)).await.unwrap().len(), 1);
    assert!(service.customers_without_fitter().await.unwrap().is_empty());

    let removed = service.remove_fitter(&id).await.unwrap();
    assert_eq!(removed.customer.fitter_id, None);
    assert_eq!(service.customers_without_fitter().await.unwrap().len(), 1);
}

#[tokio::test]
async fn assign_fitter_checks_email_scope() {
    let service = service();
    create(
        &service,
        CustomerDetails::named("Ann")
            .with_email("a@b.com")
            .with_fitter(fitter(1)),
    )
    .await;
    let bob = create(
        &service,
        CustomerDetails::named("Bob")
            .with_email("a@b.com")
            .with_fitter(fitter(2)),
    )
    .await;

    let moved = service.assign_fitter(&bob, fitter(1)).await;
    assert!(matches!(moved, Err(DomainError::EmailConflict { .. })));
}

#[tokio::test]
async fn unassigned_scope_is_independent_of_creation_order() {
    let unassigned = || CustomerDetails::named("Ann").with_email("a@b.com");
    let with_fitter = || {
        CustomerDetails::named("Bob")
            .with_email("a@b.com")
            .with_fitter(fitter(1))
    };

    let service_a = service();
    service_a.create_customer(unassigned()).await.unwrap();
    service_a.create_customer(with_fitter()).await.unwrap();

    let service_b = service();
    service_b.create_customer(with_fitter()).await.unwrap();
    service_b.create_customer(unassigned()).await.unwrap();

    assert_eq!(service_a.count_active().await.unwrap(), 2);
    assert_eq!(service_b.count_active().await.unwrap(), 2);

    // A second customer without a fitter shares the unassigned scope
    let clash = service_b
        .create_customer(CustomerDetails::named("Cid").with_email("A@b.com"))
        .await;
    assert!(matches!(clash, Err(DomainError::EmailConflict { .. })));
}

#[tokio::test]
async fn remove_fitter_checks_unassigned_scope() {
    let service = service();
    create(&service, CustomerDetails::named("Ann").with_email("a@b.com")).await;
    let bob = create(
        &service,
        CustomerDetails::named("Bob")
            .with_email("a@b.com")
            .with_fitter(fitter(1)),
    )
    .await;

    let removed = service.remove_fitter(&bob).await;
    assert!(matches!(removed, Err(DomainError::EmailConflict { .. })));
    let bob = service.get_customer(&bob).await.unwrap();
    assert_eq!(bob.fitter_id, Some(1));
}

#[tokio::test]
async fn fitter_listings_exclude_deleted_customers() {
    let service = service();
    let ann = create(&service, CustomerDetails::named("Ann").with_fitter(fitter(5))).await;
    create(&service, CustomerDetails::named("Bob").with_fitter(fitter(5))).await;

    service.delete_customer(&ann).await.unwrap();

    let listed = service.customers_for_fitter(fitter(5)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Bob");
    assert_eq!(service.count_by_fitter(fitter(5)).await.unwrap(), 1);
}

#[tokio::test]
async fn status_changes_are_idempotent() {
    let service = service();
    let id = create(&service, CustomerDetails::named("Ann")).await;

    let first = service.deactivate(&id).await.unwrap();
    assert_eq!(first.customer.status, CustomerStatus::Inactive);
    assert_eq!(first.events.len(), 1);

    let second = service.deactivate(&id).await.unwrap();
    assert!(second.events.is_empty());
    assert_eq!(second.customer.updated_at, first.customer.updated_at);

    // Inactive customers are still live
    assert_eq!(service.active_customers().await.unwrap().len(), 1);

    let back = service.reactivate(&id).await.unwrap();
    assert_eq!(back.customer.status, CustomerStatus::Active);
}

#[tokio::test]
async fn change_status_to_deleted_soft_deletes() {
    let service = service();
    let id = create(&service, CustomerDetails::named("Ann")).await;

    service
        .change_status(&id, CustomerStatus::Deleted)
        .await
        .unwrap();
    assert!(service.get_customer(&id).await.is_err());
    assert_eq!(service.count_active().await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_transport_ids() {
    let service = service();
    assert!(matches!(
        service.get_customer("abc").await,
        Err(DomainError::Validation(CustomerError::InvalidId(_)))
    ));
    assert!(matches!(
        service.get_customer("0").await,
        Err(DomainError::Validation(CustomerError::InvalidId(_)))
    ));
    assert!(matches!(
        service.get_customer("404").await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let service = service();
    let result = service.create_customer(CustomerDetails::named("   ")).await;
    assert!(matches!(
        result,
        Err(DomainError::Validation(CustomerError::EmptyName))
    ));
}

#[tokio::test]
async fn numeric_search_matches_id_and_text() {
    let service = service();
    for i in 1..=41 {
        create(&service, CustomerDetails::named(format!("Filler {i}"))).await;
    }
    let target = create(&service, CustomerDetails::named("Target")).await;
    assert_eq!(target, "42");
    create(&service, CustomerDetails::named("Stall 42 Riders")).await;

    let page = service
        .search_customers(CustomerSearch::new().search("42").page(1, 100))
        .await
        .unwrap();
    let names: Vec<_> = page.customers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Stall 42 Riders", "Target"]);
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn text_search_never_matches_id() {
    let service = service();
    create(&service, CustomerDetails::named("Alpha")).await;
    create(&service, CustomerDetails::named("Beta").with_city("Lyon")).await;

    let page = service
        .search_customers(CustomerSearch::new().search("ly"))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.customers[0].name, "Beta");

    let none = service
        .search_customers(CustomerSearch::new().search("1a"))
        .await
        .unwrap();
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn search_total_matches_filters_not_window() {
    let service = service();
    for i in 0..12 {
        let details = CustomerDetails::named(format!("Rider {i:02}")).with_country("France");
        create(&service, details).await;
    }
    create(&service, CustomerDetails::named("Outsider").with_country("Spain")).await;

    let page = service
        .search_customers(CustomerSearch::new().country("fra").page(2, 5))
        .await
        .unwrap();
    assert_eq!(page.total, 12);
    assert_eq!(page.customers.len(), 5);
    assert!(page.customers.len() as u32 <= page.limit);
    assert_eq!(page.page, 2);
    assert_eq!(page.customers[0].name, "Rider 05");
}

#[tokio::test]
async fn search_hides_deleted_customers() {
    let service = service();
    let id = create(&service, CustomerDetails::named("Gone")).await;
    create(&service, CustomerDetails::named("Here")).await;
    service.delete_customer(&id).await.unwrap();

    let page = service
        .search_customers(CustomerSearch::new())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.customers[0].name, "Here");
}

#[tokio::test]
async fn list_filters_compose() {
    let service = service();
    create(
        &service,
        CustomerDetails::named("Ann")
            .with_city("Paris")
            .with_fitter(fitter(1)),
    )
    .await;
    create(
        &service,
        CustomerDetails::named("Bob")
            .with_city("Paris")
            .with_fitter(fitter(2)),
    )
    .await;
    let gone = create(&service, CustomerDetails::named("Cid").with_city("Parisot")).await;
    service.delete_customer(&gone).await.unwrap();

    let all_paris = service
        .list_customers(CustomerFilters::new().city("paris"))
        .await
        .unwrap();
    assert_eq!(all_paris.len(), 3);

    let live_paris = service
        .list_customers(CustomerFilters::new().city("paris").is_active(true))
        .await
        .unwrap();
    assert_eq!(live_paris.len(), 2);

    let fitter_one = service
        .list_customers(
            CustomerFilters::new()
                .city("paris")
                .fitter_id(fitter(1))
                .is_active(true),
        )
        .await
        .unwrap();
    assert_eq!(fitter_one.len(), 1);
    assert_eq!(fitter_one[0].name, "Ann");

    let deleted = service
        .list_customers(CustomerFilters::new().is_active(false))
        .await
        .unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].name, "Cid");
}

#[tokio::test]
async fn city_and_country_listings_use_exact_match() {
    let service = service();
    create(&service, CustomerDetails::named("Ann").with_city("Paris")).await;
    create(&service, CustomerDetails::named("Bob").with_city("Parisot")).await;

    assert_eq!(service.customers_in_city("PARIS").await.unwrap().len(), 1);
    assert!(service.customers_in_country("France").await.unwrap().is_empty());
}

#[tokio::test]
async fn integrity_report_flags_blank_legacy_name() {
    let service = service();
    let id = create(&service, CustomerDetails::named("Ann")).await;
    assert!(service.validate_data_integrity(&id).await.unwrap().is_valid());

    let mut record = service.repository().record(1).await.unwrap();
    record.id = Some(2);
    record.name = String::new();
    service.repository().insert_record(record).await;

    let report = service.validate_data_integrity("2").await.unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.customer_id, "2");
    assert!(matches!(
        service.ensure_order_eligible("2").await,
        Err(DomainError::Validation(CustomerError::NotOrderEligible { .. }))
    ));
}

#[tokio::test]
async fn import_preserves_input_order() {
    let service = service();
    let created = service
        .import_customers(vec![
            CustomerDetails::named("Zed"),
            CustomerDetails::named("Amy"),
            CustomerDetails::named("Kim"),
        ])
        .await
        .unwrap();

    let names: Vec<_> = created.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Zed", "Amy", "Kim"]);
    let ids: Vec<_> = created.iter().map(|c| c.id).collect();
    assert_eq!(ids, [Some(1), Some(2), Some(3)]);
}

#[tokio::test]
async fn import_validates_before_writing() {
    let service = service();
    let result = service
        .import_customers(vec![
            CustomerDetails::named("Ok"),
            CustomerDetails::named("Bad").with_email("nope"),
        ])
        .await;

    assert!(matches!(
        result,
        Err(DomainError::Validation(CustomerError::InvalidEmail(_)))
    ));
    assert_eq!(service.repository().row_count().await, 0);
}
