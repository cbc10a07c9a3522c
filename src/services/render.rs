use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::{
    models::{announcement::Announcement, interaction::CommandKind},
    services::{
        aggregation::{CohortSummary, DashboardPage},
        clock,
        dashboard::PageView,
        transport::{Control, View},
    },
};

pub const CLOSED_LINE: &str = "🔒 Requests are now closed for this announcement.";

pub fn close_line(end_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if end_at <= now {
        CLOSED_LINE.to_string()
    } else {
        format!("⏳ Requests close {}", clock::fmt_local(end_at))
    }
}

fn control(
    announcement: &Announcement,
    command: CommandKind,
    label: &str,
    disabled: bool,
) -> Control {
    Control {
        command,
        label: label.to_string(),
        disabled,
        custom_id: format!("{}:{}", command.as_str(), announcement.id),
    }
}

/// The message participants see. Sign-up controls are attached only while `open`.
pub fn public_view(a: &Announcement, open: bool, now: DateTime<Utc>) -> View {
    if !a.reactable {
        return View {
            text: format!("**{}**\n\n{}", a.title, a.content),
            controls: Vec::new(),
        };
    }

    let status = if open {
        close_line(a.end_at, now)
    } else {
        CLOSED_LINE.to_string()
    };
    let controls = if open {
        vec![
            control(a, CommandKind::RequestRide, "Request Ride", false),
            control(a, CommandKind::RegisterDriver, "I'm a Driver", false),
            control(a, CommandKind::Withdraw, "Withdraw", false),
        ]
    } else {
        Vec::new()
    };

    View {
        text: format!("**{}**\n{}\n\n{}", a.title, status, a.content),
        controls,
    }
}

fn status_mark(summary: &CohortSummary) -> &'static str {
    if summary.covered {
        "✅"
    } else {
        "❌"
    }
}

/// The organizer dashboard at the given page.
pub fn dashboard_view(a: &Announcement, page: &PageView<'_>, now: DateTime<Utc>) -> View {
    let mut text = String::new();

    match page.page {
        DashboardPage::Summary { cohorts } => {
            let _ = writeln!(text, "**{}**\n{}", a.title, close_line(a.end_at, now));
            for s in cohorts {
                let _ = write!(
                    text,
                    "\n🏫 {}\nDrivers: **{}**\nRiders: **{}**\nSeats: **{}** {}\n",
                    s.cohort,
                    s.drivers,
                    s.riders,
                    s.capacity,
                    status_mark(s)
                );
            }
        }
        DashboardPage::Cohort { roster, summary } => {
            let _ = writeln!(text, "**🏫 {} — Ride Signups**\n", roster.cohort);
            text.push_str("**Drivers**\n");
            if roster.drivers.is_empty() {
                text.push_str("*None*\n");
            }
            for d in &roster.drivers {
                let _ = writeln!(text, "🚗 {} — {} seats", d.name, d.capacity);
            }
            text.push_str("\n**Riders**\n");
            if roster.riders.is_empty() {
                text.push_str("*None*\n");
            }
            for name in &roster.riders {
                let _ = writeln!(text, "🙋 {name}");
            }
            let _ = writeln!(
                text,
                "\n**Summary**\nSeats: **{}** | Riders: **{}** {}",
                summary.capacity,
                summary.riders,
                status_mark(summary)
            );
        }
    }

    let _ = write!(text, "\n{}", page.position());

    View {
        text,
        controls: vec![
            control(a, CommandKind::PagePrev, "◀️ Prev", page.is_first()),
            control(a, CommandKind::PageNext, "▶️ Next", page.is_last()),
            control(a, CommandKind::Export, "📊 Export Snapshot", false),
        ],
    }
}
