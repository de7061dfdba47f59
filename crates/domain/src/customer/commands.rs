//! Inputs for creating and updating customers.

use common::FitterId;

/// Named fields used to create or rehydrate a customer.
///
/// Optional text fields left as `None` (or blank) are stored as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Option<String>,
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
    pub fitter_id: Option<FitterId>,
}

impl CustomerDetails {
    /// Creates details with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_fitter(mut self, fitter_id: FitterId) -> Self {
        self.fitter_id = Some(fitter_id);
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_horse_name(mut self, horse_name: impl Into<String>) -> Self {
        self.horse_name = Some(horse_name.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }
}

/// A single field in a partial update.
///
/// `Keep` leaves the current value untouched, `Clear` removes it and `Set`
/// replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            FieldUpdate::Set(value) => Some(value),
            _ => None,
        }
    }
}

/// Maps the transport "absent / null / value" triple onto an update.
impl<T> From<Option<Option<T>>> for FieldUpdate<T> {
    fn from(value: Option<Option<T>>) -> Self {
        match value {
            None => FieldUpdate::Keep,
            Some(None) => FieldUpdate::Clear,
            Some(Some(v)) => FieldUpdate::Set(v),
        }
    }
}

/// Partial update of a customer's descriptive and contact fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfoUpdate {
    pub name: FieldUpdate<String>,
    pub email: FieldUpdate<String>,
    pub horse_name: FieldUpdate<String>,
    pub company: FieldUpdate<String>,
    pub address: FieldUpdate<String>,
    pub city: FieldUpdate<String>,
    pub state: FieldUpdate<String>,
    pub zipcode: FieldUpdate<String>,
    pub country: FieldUpdate<String>,
    pub phone_no: FieldUpdate<String>,
    pub cell_no: FieldUpdate<String>,
    pub bank_account_number: FieldUpdate<String>,
}

impl ContactInfoUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = FieldUpdate::Set(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = FieldUpdate::Set(email.into());
        self
    }

    pub fn clear_email(mut self) -> Self {
        self.email = FieldUpdate::Clear;
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = FieldUpdate::Set(city.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = FieldUpdate::Set(country.into());
        self
    }

    pub fn phone_no(mut self, phone_no: impl Into<String>) -> Self {
        self.phone_no = FieldUpdate::Set(phone_no.into());
        self
    }

    /// Returns the new email if this update sets a non-blank one.
    pub fn new_email(&self) -> Option<&str> {
        self.email
            .as_set()
            .map(|email| email.trim())
            .filter(|email| !email.is_empty())
    }
}
