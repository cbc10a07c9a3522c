use tracing::debug;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        announcement::Announcement,
        interaction::{Command, InteractionOutcome},
        registration::{NewRegistration, Role},
    },
    services::{
        announcements::AnnouncementService,
        dashboard::{DashboardService, Direction},
        export,
        registrations::RegistrationService,
        transport::TransportError,
    },
    AppState,
};

const EXPORT_HINT: &str =
    "📋 Download the file, copy everything, and paste it into the sheet template.";

/// Route one control press (or form submission) for one announcement.
pub async fn dispatch(
    state: &AppState,
    announcement_id: Uuid,
    participant_id: &str,
    command: Command,
) -> Result<InteractionOutcome, AppError> {
    debug!(
        "Interaction {} from {} on {}",
        command.kind().as_str(),
        participant_id,
        announcement_id
    );

    match command {
        Command::RequestRide { contact, note } => {
            let announcement = open_announcement(state, announcement_id).await?;
            let cohort = resolve_cohort(state, participant_id).await?;
            let reg = NewRegistration {
                participant_id: participant_id.to_string(),
                cohort,
                role: Role::Rider,
                capacity: None,
                contact: Some(contact.trim().to_string()),
                note: non_empty(note),
            };
            RegistrationService::register(state, announcement.id, reg).await?;
            Ok(InteractionOutcome::message("✅ You are now registered as a rider."))
        }
        Command::RegisterDriver {
            capacity,
            contact,
            note,
        } => {
            let announcement = open_announcement(state, announcement_id).await?;
            let capacity = parse_capacity(&capacity)?;
            let cohort = resolve_cohort(state, participant_id).await?;
            let reg = NewRegistration {
                participant_id: participant_id.to_string(),
                cohort,
                role: Role::Driver,
                capacity: Some(capacity),
                contact: Some(contact.trim().to_string()),
                note: non_empty(note),
            };
            RegistrationService::register(state, announcement.id, reg).await?;
            Ok(InteractionOutcome::message("✅ You are now registered as a driver."))
        }
        Command::Withdraw => {
            let announcement = open_announcement(state, announcement_id).await?;
            RegistrationService::withdraw(state, announcement.id, participant_id).await?;
            Ok(InteractionOutcome::message("You have withdrawn."))
        }
        Command::PageNext => page(state, announcement_id, Direction::Next).await,
        Command::PagePrev => page(state, announcement_id, Direction::Prev).await,
        Command::Export => {
            let announcement = AnnouncementService::get(&state.db, announcement_id).await?;
            if !announcement.reactable {
                return Err(AppError::invalid_state("This announcement has no sign-ups to export."));
            }
            let file = export::export(state, announcement.id).await?;
            Ok(InteractionOutcome {
                message: EXPORT_HINT.to_string(),
                view: None,
                file: Some(file),
            })
        }
    }
}

async fn page(
    state: &AppState,
    announcement_id: Uuid,
    direction: Direction,
) -> Result<InteractionOutcome, AppError> {
    let view = DashboardService::navigate(state, announcement_id, direction).await?;
    Ok(InteractionOutcome {
        message: String::new(),
        view: Some(view),
        file: None,
    })
}

/// Registration changes are only accepted while the announcement is open.
async fn open_announcement(state: &AppState, id: Uuid) -> Result<Announcement, AppError> {
    let announcement = AnnouncementService::get(&state.db, id).await?;
    if !announcement.reactable {
        return Err(AppError::invalid_state("This announcement does not take sign-ups."));
    }
    if !announcement.is_open(state.now()) {
        return Err(AppError::invalid_state(
            "Requests are closed for this announcement.",
        ));
    }
    Ok(announcement)
}

/// First configured cohort the participant belongs to.
async fn resolve_cohort(state: &AppState, participant_id: &str) -> Result<String, AppError> {
    let identity = match state.outbound().resolve_identity(participant_id).await {
        Ok(identity) => identity,
        Err(TransportError::NotFound) => {
            return Err(AppError::validation("You are not a member of this community."))
        }
        Err(e) => return Err(e.into()),
    };

    state
        .config
        .cohorts
        .iter()
        .find(|c| identity.cohorts.contains(c))
        .cloned()
        .ok_or_else(|| {
            AppError::validation(format!(
                "You must belong to one of {} to sign up.",
                state.config.cohorts.join(", ")
            ))
        })
}

fn parse_capacity(raw: &str) -> Result<i64, AppError> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::validation(
            "Please enter a valid positive number of seats.",
        ));
    }
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::validation(
            "Please enter a valid positive number of seats.",
        )),
    }
}

fn non_empty(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
