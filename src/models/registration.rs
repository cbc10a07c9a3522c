use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

pub const CONTACT_DIGITS: usize = 10;
pub const NOTE_MAX_CHARS: usize = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Driver,
    Rider,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Driver => "driver",
            Role::Rider => "rider",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationEntry {
    /// Insertion order within the table.
    pub id: i64,
    pub announcement_id: Uuid,
    pub participant_id: String,
    pub cohort: String,
    pub role: Role,
    pub capacity: Option<i64>,
    pub contact: Option<String>,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub participant_id: String,
    pub cohort: String,
    pub role: Role,
    pub capacity: Option<i64>,
    pub contact: Option<String>,
    pub note: Option<String>,
}

impl NewRegistration {
    pub fn validate(&self) -> Result<(), AppError> {
        match (self.role, self.capacity) {
            (Role::Driver, Some(c)) if c > 0 => {}
            (Role::Driver, _) => {
                return Err(AppError::validation(
                    "Please enter a valid positive number of seats.",
                ))
            }
            (Role::Rider, None) => {}
            (Role::Rider, Some(_)) => {
                return Err(AppError::validation("Riders do not offer seats."))
            }
        }

        if let Some(contact) = &self.contact {
            if contact.len() != CONTACT_DIGITS || !contact.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AppError::validation(
                    "Please enter a valid phone number (10 digits, no dashes).",
                ));
            }
        }

        if let Some(note) = &self.note {
            if note.chars().count() > NOTE_MAX_CHARS {
                return Err(AppError::validation(format!(
                    "Additional information is limited to {NOTE_MAX_CHARS} characters."
                )));
            }
        }

        Ok(())
    }
}
