use chrono::{DateTime, Utc};

/// Flat row shape of the `customers` table.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub name: String,
    pub horse_name: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
    pub phone_no: Option<String>,
    pub cell_no: Option<String>,
    pub bank_account_number: Option<String>,
    pub fitter_id: Option<i64>,
    /// Legacy tri-state flag; only `Some(true)` marks a soft-deleted row.
    pub deleted: Option<bool>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted == Some(true)
    }

    /// Fitter scope used by the email uniqueness index; 0 stands for none.
    pub fn fitter_scope(&self) -> i64 {
        self.fitter_id.unwrap_or(0)
    }

    /// Lower-cased email as the uniqueness index sees it.
    pub fn email_key(&self) -> Option<String> {
        self.email.as_deref().map(str::to_lowercase)
    }
}
