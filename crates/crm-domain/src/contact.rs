use chrono::{DateTime, Utc};
use crm_core::{CrmError, CrmResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ContactId = Uuid;

/// Client or lead identity. Deduplicated by phone first, then by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Keeps digits only so `+55 (11) 98888-7777` and `5511988887777`
    /// compare equal.
    pub fn normalize_phone(raw: &str) -> Option<String> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        (!digits.is_empty()).then_some(digits)
    }

    pub fn normalize_email(raw: &str) -> Option<String> {
        let email = raw.trim().to_lowercase();
        (!email.is_empty()).then_some(email)
    }

    pub fn matches_phone(&self, phone: &str) -> bool {
        match (&self.phone, Self::normalize_phone(phone)) {
            (Some(own), Some(other)) => *own == other,
            _ => false,
        }
    }

    pub fn matches_email(&self, email: &str) -> bool {
        match (&self.email, Self::normalize_email(email)) {
            (Some(own), Some(other)) => *own == other,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl NewContact {
    pub fn into_contact(self) -> CrmResult<Contact> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CrmError::Validation("Contact name cannot be empty".into()));
        }
        Ok(Contact {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: self.phone.as_deref().and_then(Contact::normalize_phone),
            email: self.email.as_deref().and_then(Contact::normalize_email),
            created_at: Utc::now(),
        })
    }
}

/// Phone is the primary key for deduplication; email only decides when no
/// contact shares the phone.
pub fn find_duplicate<'a>(
    contacts: &'a [Contact],
    phone: Option<&str>,
    email: Option<&str>,
) -> Option<&'a Contact> {
    phone
        .and_then(|p| contacts.iter().find(|c| c.matches_phone(p)))
        .or_else(|| email.and_then(|e| contacts.iter().find(|c| c.matches_email(e))))
}
