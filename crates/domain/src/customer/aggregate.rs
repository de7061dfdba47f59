//! Customer aggregate implementation.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use common::FitterId;

use super::{
    ContactInfoUpdate, CustomerDetails, CustomerError, CustomerEvent, CustomerId, CustomerStatus,
    Email, FieldUpdate,
};

/// Current time at the precision the store keeps (microseconds).
pub(crate) fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_optional_email(value: Option<String>) -> Result<Option<Email>, CustomerError> {
    normalize_text(value).map(|v| Email::parse(&v)).transpose()
}

/// Customer aggregate root.
///
/// All changes go through the command methods below; each returns the events
/// it produced, or an empty list when nothing happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    id: CustomerId,
    email: Option<Email>,
    name: String,
    horse_name: Option<String>,
    company: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zipcode: Option<String>,
    country: Option<String>,
    phone_no: Option<String>,
    cell_no: Option<String>,
    bank_account_number: Option<String>,
    /// Fitter reference held by value; never an object link.
    fitter_id: Option<FitterId>,
    status: CustomerStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Construction
impl Customer {
    /// Creates a new active customer.
    ///
    /// Fails if the name is blank or a supplied email is malformed.
    pub fn create(id: CustomerId, details: CustomerDetails) -> Result<Self, CustomerError> {
        if details.name.trim().is_empty() {
            return Err(CustomerError::EmptyName);
        }
        let now = timestamp_now();
        Self::from_details(id, details, CustomerStatus::Active, now, now)
    }

    /// Rebuilds a customer from persisted state.
    ///
    /// Unlike [`Customer::create`] a blank name is tolerated, since older rows
    /// may carry one; [`Customer::validate_for_order`] still rejects them.
    pub fn restore(
        id: CustomerId,
        details: CustomerDetails,
        status: CustomerStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, CustomerError> {
        Self::from_details(id, details, status, created_at, updated_at)
    }

    fn from_details(
        id: CustomerId,
        details: CustomerDetails,
        status: CustomerStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, CustomerError> {
        let email = parse_optional_email(details.email)?;

        Ok(Self {
            id,
            email,
            name: details.name.trim().to_string(),
            horse_name: normalize_text(details.horse_name),
            company: normalize_text(details.company),
            address: normalize_text(details.address),
            city: normalize_text(details.city),
            state: normalize_text(details.state),
            zipcode: normalize_text(details.zipcode),
            country: normalize_text(details.country),
            phone_no: normalize_text(details.phone_no),
            cell_no: normalize_text(details.cell_no),
            bank_account_number: normalize_text(details.bank_account_number),
            fitter_id: details.fitter_id,
            status,
            created_at,
            updated_at,
        })
    }
}

// Query methods
impl Customer {
    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn horse_name(&self) -> Option<&str> {
        self.horse_name.as_deref()
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn zipcode(&self) -> Option<&str> {
        self.zipcode.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn phone_no(&self) -> Option<&str> {
        self.phone_no.as_deref()
    }

    pub fn cell_no(&self) -> Option<&str> {
        self.cell_no.as_deref()
    }

    pub fn bank_account_number(&self) -> Option<&str> {
        self.bank_account_number.as_deref()
    }

    pub fn fitter_id(&self) -> Option<FitterId> {
        self.fitter_id
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn has_fitter(&self) -> bool {
        self.fitter_id.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.status.is_deleted()
    }

    /// Returns true unless the customer has been soft-deleted.
    ///
    /// An `Inactive` customer still counts as active here.
    pub fn is_active(&self) -> bool {
        !self.is_deleted()
    }

    /// Name shown in listings: the customer name, with the horse in
    /// parentheses when known.
    pub fn display_name(&self) -> String {
        let base = if self.name.is_empty() {
            self.company
                .clone()
                .unwrap_or_else(|| format!("Customer #{}", self.id))
        } else {
            self.name.clone()
        };

        match &self.horse_name {
            Some(horse) => format!("{base} ({horse})"),
            None => base,
        }
    }

    /// One-line summary: display name, email, company and location.
    pub fn display_info(&self) -> String {
        let location = match (&self.city, &self.country) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (Some(city), None) => Some(city.clone()),
            (None, Some(country)) => Some(country.clone()),
            (None, None) => None,
        };

        std::iter::once(self.display_name())
            .chain(self.email.as_ref().map(|e| e.to_string()))
            .chain(self.company.clone())
            .chain(location)
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Checks the rule that gates order creation.
    pub fn validate_for_order(&self) -> Result<(), CustomerError> {
        if self.is_deleted() {
            return Err(CustomerError::Deleted { id: self.id });
        }
        if self.name.trim().is_empty() {
            return Err(CustomerError::NotOrderEligible {
                id: self.id,
                reason: "customer has no name",
            });
        }
        Ok(())
    }
}

// Command methods (return events)
impl Customer {
    /// Assigns a fitter. Assigning the current fitter again is a no-op.
    pub fn assign_fitter(
        &mut self,
        fitter_id: FitterId,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_not_deleted()?;
        if self.fitter_id == Some(fitter_id) {
            return Ok(vec![]);
        }

        let previous = self.fitter_id.replace(fitter_id);
        self.touch();
        Ok(vec![CustomerEvent::fitter_assigned(
            self.id,
            fitter_id,
            previous,
            self.updated_at,
        )])
    }

    /// Clears the fitter reference, whether or not one was set.
    pub fn remove_fitter(&mut self) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_not_deleted()?;
        let previous = self.fitter_id.take();
        self.touch();
        Ok(vec![CustomerEvent::fitter_removed(
            self.id,
            previous,
            self.updated_at,
        )])
    }

    /// Moves the customer to another lifecycle state.
    ///
    /// Unchanged status is a no-op. A deleted customer cannot change status.
    pub fn change_status(
        &mut self,
        status: CustomerStatus,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        if self.status == status {
            return Ok(vec![]);
        }
        if !self.status.can_transition() {
            return Err(CustomerError::Deleted { id: self.id });
        }
        if status.is_deleted() {
            return Ok(self.soft_delete());
        }

        let from = self.status;
        self.status = status;
        self.touch();
        Ok(vec![CustomerEvent::status_changed(
            self.id,
            from,
            status,
            self.updated_at,
        )])
    }

    pub fn deactivate(&mut self) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.change_status(CustomerStatus::Inactive)
    }

    pub fn reactivate(&mut self) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.change_status(CustomerStatus::Active)
    }

    /// Marks the customer as deleted. Already-deleted customers are left alone.
    pub fn soft_delete(&mut self) -> Vec<CustomerEvent> {
        if self.is_deleted() {
            return vec![];
        }

        self.status = CustomerStatus::Deleted;
        self.touch();
        vec![CustomerEvent::customer_deleted(self.id, self.updated_at)]
    }

    /// Applies a partial update of descriptive and contact fields.
    ///
    /// Fields left as [`FieldUpdate::Keep`] are untouched. Clearing or
    /// blanking the email removes it. The update is validated as a whole
    /// before anything is written, and `updated_at` always advances.
    pub fn update_contact_info(
        &mut self,
        update: ContactInfoUpdate,
    ) -> Result<Vec<CustomerEvent>, CustomerError> {
        self.ensure_not_deleted()?;
        let name = match update.name {
            FieldUpdate::Keep => None,
            FieldUpdate::Clear => return Err(CustomerError::EmptyName),
            FieldUpdate::Set(name) if name.trim().is_empty() => {
                return Err(CustomerError::EmptyName);
            }
            FieldUpdate::Set(name) => Some(name.trim().to_string()),
        };

        let email = match update.email {
            FieldUpdate::Keep => None,
            FieldUpdate::Clear => Some(None),
            FieldUpdate::Set(email) => Some(parse_optional_email(Some(email))?),
        };

        let mut changed = Vec::new();

        if let Some(name) = name
            && name != self.name
        {
            self.name = name;
            changed.push("name".to_string());
        }
        if let Some(email) = email
            && email != self.email
        {
            self.email = email;
            changed.push("email".to_string());
        }

        let text_fields = [
            ("horse_name", &mut self.horse_name, update.horse_name),
            ("company", &mut self.company, update.company),
            ("address", &mut self.address, update.address),
            ("city", &mut self.city, update.city),
            ("state", &mut self.state, update.state),
            ("zipcode", &mut self.zipcode, update.zipcode),
            ("country", &mut self.country, update.country),
            ("phone_no", &mut self.phone_no, update.phone_no),
            ("cell_no", &mut self.cell_no, update.cell_no),
            (
                "bank_account_number",
                &mut self.bank_account_number,
                update.bank_account_number,
            ),
        ];
        for (field, slot, value) in text_fields {
            if apply_text(slot, value) {
                changed.push(field.to_string());
            }
        }

        self.touch();
        Ok(vec![CustomerEvent::contact_info_updated(
            self.id,
            changed,
            self.updated_at,
        )])
    }

    /// Deleted customers accept no further changes.
    fn ensure_not_deleted(&self) -> Result<(), CustomerError> {
        if self.is_deleted() {
            return Err(CustomerError::Deleted { id: self.id });
        }
        Ok(())
    }

    /// Advances `updated_at`, strictly past its previous value.
    fn touch(&mut self) {
        let now = timestamp_now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

fn apply_text(slot: &mut Option<String>, update: FieldUpdate<String>) -> bool {
    let next = match update {
        FieldUpdate::Keep => return false,
        FieldUpdate::Clear => None,
        FieldUpdate::Set(value) => normalize_text(Some(value)),
    };
    if *slot == next {
        return false;
    }
    *slot = next;
    true
}
