//! Translation between the [`Customer`] aggregate and [`CustomerRecord`] rows.

use common::FitterId;
use domain::{Customer, CustomerDetails, CustomerId, CustomerStatus};

use crate::{Result, StoreError, record::CustomerRecord};

const STATUS_ACTIVE: &str = "ACTIVE";
const STATUS_INACTIVE: &str = "INACTIVE";

/// Flattens a customer into a new record.
pub fn to_record(customer: &Customer) -> CustomerRecord {
    let mut record = CustomerRecord {
        id: None,
        email: None,
        name: String::new(),
        horse_name: None,
        company: None,
        address: None,
        city: None,
        state: None,
        zipcode: None,
        country: None,
        phone_no: None,
        cell_no: None,
        bank_account_number: None,
        fitter_id: None,
        deleted: None,
        status: String::new(),
        created_at: customer.created_at(),
        updated_at: customer.updated_at(),
    };
    update_record(&mut record, customer);
    record
}

/// Copies every customer field onto an existing record.
///
/// The id is copied only when the customer has one, so a record keeps its
/// store-assigned id.
pub fn update_record(record: &mut CustomerRecord, customer: &Customer) {
    if let Some(id) = customer.id().value() {
        record.id = Some(id);
    }
    record.email = customer.email().map(|email| email.as_str().to_string());
    record.name = customer.name().to_string();
    record.horse_name = customer.horse_name().map(String::from);
    record.company = customer.company().map(String::from);
    record.address = customer.address().map(String::from);
    record.city = customer.city().map(String::from);
    record.state = customer.state().map(String::from);
    record.zipcode = customer.zipcode().map(String::from);
    record.country = customer.country().map(String::from);
    record.phone_no = customer.phone_no().map(String::from);
    record.cell_no = customer.cell_no().map(String::from);
    record.bank_account_number = customer.bank_account_number().map(String::from);
    record.fitter_id = customer.fitter_id().map(|id| id.as_i64());

    // Deleted rows keep an inactive status next to the flag
    let (deleted, status) = match customer.status() {
        CustomerStatus::Active => (false, STATUS_ACTIVE),
        CustomerStatus::Inactive => (false, STATUS_INACTIVE),
        CustomerStatus::Deleted => (true, STATUS_INACTIVE),
    };
    record.deleted = Some(deleted);
    record.status = status.to_string();

    record.created_at = customer.created_at();
    record.updated_at = customer.updated_at();
}

/// Rebuilds a customer from a stored record.
pub fn to_domain(record: CustomerRecord) -> Result<Customer> {
    let row_id = record.id.unwrap_or_default();
    let corrupt = |reason: String| StoreError::CorruptRecord { id: row_id, reason };

    let id = match record.id {
        Some(value) => CustomerId::from_number(value).map_err(|e| corrupt(e.to_string()))?,
        None => CustomerId::generate(),
    };
    let status = lifecycle_of(&record);

    let details = CustomerDetails {
        name: record.name,
        email: record.email,
        horse_name: record.horse_name,
        company: record.company,
        address: record.address,
        city: record.city,
        state: record.state,
        zipcode: record.zipcode,
        country: record.country,
        phone_no: record.phone_no,
        cell_no: record.cell_no,
        bank_account_number: record.bank_account_number,
        fitter_id: record.fitter_id.and_then(FitterId::from_raw),
    };

    Customer::restore(id, details, status, record.created_at, record.updated_at)
        .map_err(|e| corrupt(e.to_string()))
}

/// Reads the lifecycle state out of the flag and status columns.
///
/// The flag wins; a `DELETED` or unknown status without it reads as inactive.
fn lifecycle_of(record: &CustomerRecord) -> CustomerStatus {
    if record.is_deleted() {
        return CustomerStatus::Deleted;
    }
    match record.status.parse::<CustomerStatus>() {
        Ok(CustomerStatus::Active) => CustomerStatus::Active,
        _ => CustomerStatus::Inactive,
    }
}
