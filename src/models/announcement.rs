use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::clock;

pub const TITLE_MAX_CHARS: usize = 256;
pub const CONTENT_MAX_CHARS: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AnnouncementState {
    Scheduled,
    Sent,
    Closed,
}

impl std::fmt::Display for AnnouncementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnnouncementState::Scheduled => "scheduled",
            AnnouncementState::Sent => "sent",
            AnnouncementState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub send_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reactable: bool,
    pub state: AnnouncementState,
    pub public_ref: Option<String>,
    pub dashboard_ref: Option<String>,
    pub dashboard_page: i64,
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    /// Registration is accepted only while published and before the end time.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.reactable && self.state == AnnouncementState::Sent && now < self.end_at
    }
}

/// Validated input for a new announcement, times already normalized to UTC.
#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    pub send_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reactable: bool,
}

impl NewAnnouncement {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_text(&self.title, &self.content)?;
        if self.end_at < self.send_at {
            return Err(AppError::validation(
                "`end_at` must be the same as or after `send_at`.",
            ));
        }
        Ok(())
    }
}

pub fn validate_text(title: &str, content: &str) -> Result<(), AppError> {
    if title.trim().is_empty() || title.chars().count() > TITLE_MAX_CHARS {
        return Err(AppError::validation(format!(
            "Title must be between 1 and {TITLE_MAX_CHARS} characters."
        )));
    }
    if content.trim().is_empty() || content.chars().count() > CONTENT_MAX_CHARS {
        return Err(AppError::validation(format!(
            "Content must be between 1 and {CONTENT_MAX_CHARS} characters."
        )));
    }
    Ok(())
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub content: String,
    /// `YYYY-MM-DD HH:MM`, local time
    pub send_at: String,
    /// `YYYY-MM-DD HH:MM`, local time
    pub end_at: String,
    pub reactable: bool,
}

impl CreateAnnouncementRequest {
    pub fn parse(self) -> Result<NewAnnouncement, AppError> {
        let send_at = clock::parse_local(&self.send_at)
            .map_err(|e| AppError::validation(format!("Invalid `send_at`: {e}")))?;
        let end_at = clock::parse_local(&self.end_at)
            .map_err(|e| AppError::validation(format!("Invalid `end_at`: {e}")))?;
        Ok(NewAnnouncement {
            title: self.title,
            content: self.content,
            send_at,
            end_at,
            reactable: self.reactable,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct EditAnnouncementRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct AnnouncementSummary {
    pub id: Uuid,
    pub title: String,
    pub state: AnnouncementState,
    pub send_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reactable: bool,
    pub preview: String,
}

const PREVIEW_MAX_CHARS: usize = 200;

impl From<Announcement> for AnnouncementSummary {
    fn from(a: Announcement) -> Self {
        let preview = if a.content.chars().count() <= PREVIEW_MAX_CHARS {
            a.content
        } else {
            let cut: String = a.content.chars().take(PREVIEW_MAX_CHARS - 3).collect();
            format!("{cut}...")
        };
        Self {
            id: a.id,
            title: a.title,
            state: a.state,
            send_at: a.send_at,
            end_at: a.end_at,
            reactable: a.reactable,
            preview,
        }
    }
}
