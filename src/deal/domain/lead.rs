//! Lead records: the counterpart a deal is negotiated with.

use super::{DealDomainError, LeadId, OrganizationId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Accumulated knowledge about a counterpart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadProfile {
    /// Industry or sector, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Free-form notes gathered during enrichment and negotiation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Whether the counterpart has been walked through the offering.
    #[serde(default)]
    pub informed_about_offering: bool,
}

/// Request payload for registering a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    company_name: String,
    email: String,
    contact_name: Option<String>,
    profile: LeadProfile,
}

impl NewLead {
    /// Creates a lead request with the required fields.
    #[must_use]
    pub fn new(company_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            email: email.into(),
            contact_name: None,
            profile: LeadProfile::default(),
        }
    }

    /// Sets the contact person's name.
    #[must_use]
    pub fn with_contact_name(mut self, contact_name: impl Into<String>) -> Self {
        self.contact_name = Some(contact_name.into());
        self
    }

    /// Sets the initial profile.
    #[must_use]
    pub fn with_profile(mut self, profile: LeadProfile) -> Self {
        self.profile = profile;
        self
    }
}

/// Counterpart company and contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    id: LeadId,
    organization_id: OrganizationId,
    company_name: String,
    email: String,
    contact_name: Option<String>,
    profile: LeadProfile,
    cloned_from: Option<LeadId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedLeadData {
    /// Persisted lead identifier.
    pub id: LeadId,
    /// Owning organisation.
    pub organization_id: OrganizationId,
    /// Company name.
    pub company_name: String,
    /// Contact email address.
    pub email: String,
    /// Contact person's name.
    pub contact_name: Option<String>,
    /// Accumulated profile.
    pub profile: LeadProfile,
    /// Lead this one was cloned from when a deal reopened.
    pub cloned_from: Option<LeadId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Registers a new lead.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::InvalidEmail`] when the address has no
    /// local part or domain.
    pub fn new(
        organization_id: OrganizationId,
        request: NewLead,
        clock: &impl Clock,
    ) -> Result<Self, DealDomainError> {
        let email = request.email.trim().to_owned();
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Err(DealDomainError::InvalidEmail(request.email));
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: LeadId::new(),
            organization_id,
            company_name: request.company_name.trim().to_owned(),
            email,
            contact_name: request.contact_name,
            profile: request.profile,
            cloned_from: None,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a lead from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedLeadData) -> Self {
        Self {
            id: data.id,
            organization_id: data.organization_id,
            company_name: data.company_name,
            email: data.email,
            contact_name: data.contact_name,
            profile: data.profile,
            cloned_from: data.cloned_from,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Creates a fresh lead carrying this lead's contact details and profile,
    /// used when a lost deal is reopened.
    #[must_use]
    pub fn clone_for_reopen(&self, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: LeadId::new(),
            cloned_from: Some(self.id),
            created_at: timestamp,
            updated_at: timestamp,
            ..self.clone()
        }
    }

    /// Returns the lead identifier.
    #[must_use]
    pub const fn id(&self) -> LeadId {
        self.id
    }

    /// Returns the owning organisation.
    #[must_use]
    pub const fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    /// Returns the company name.
    #[must_use]
    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    /// Returns the contact email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the contact person's name.
    #[must_use]
    pub fn contact_name(&self) -> Option<&str> {
        self.contact_name.as_deref()
    }

    /// Returns the accumulated profile.
    #[must_use]
    pub const fn profile(&self) -> &LeadProfile {
        &self.profile
    }

    /// Returns the lead this one was cloned from.
    #[must_use]
    pub const fn cloned_from(&self) -> Option<LeadId> {
        self.cloned_from
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records that the offering has been presented to the counterpart.
    ///
    /// Returns `true` when the flag changed.
    pub fn mark_informed(&mut self, clock: &impl Clock) -> bool {
        if self.profile.informed_about_offering {
            return false;
        }
        self.profile.informed_about_offering = true;
        self.updated_at = clock.utc();
        true
    }
}
