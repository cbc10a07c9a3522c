use serde::{Deserialize, Serialize};

use crate::services::transport::View;

/// Tag carried by every interactive control; the bridge echoes it back on click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    RequestRide,
    RegisterDriver,
    Withdraw,
    PageNext,
    PagePrev,
    Export,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::RequestRide => "request_ride",
            CommandKind::RegisterDriver => "register_driver",
            CommandKind::Withdraw => "withdraw",
            CommandKind::PageNext => "page_next",
            CommandKind::PagePrev => "page_prev",
            CommandKind::Export => "export",
        }
    }
}

/// A submitted interaction. Form fields arrive as raw text, the way the user typed them.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    RequestRide {
        contact: String,
        #[serde(default)]
        note: Option<String>,
    },
    RegisterDriver {
        capacity: String,
        contact: String,
        #[serde(default)]
        note: Option<String>,
    },
    Withdraw,
    PageNext,
    PagePrev,
    Export,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::RequestRide { .. } => CommandKind::RequestRide,
            Command::RegisterDriver { .. } => CommandKind::RegisterDriver,
            Command::Withdraw => CommandKind::Withdraw,
            Command::PageNext => CommandKind::PageNext,
            Command::PagePrev => CommandKind::PagePrev,
            Command::Export => CommandKind::Export,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub participant_id: String,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Serialize)]
pub struct ExportFile {
    pub filename: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct InteractionOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<View>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<ExportFile>,
}

impl InteractionOutcome {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            view: None,
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_commands() {
        let req: InteractionRequest = serde_json::from_value(serde_json::json!({
            "participant_id": "42",
            "command": "register_driver",
            "capacity": "3",
            "contact": "4045550123"
        }))
        .unwrap();
        assert_eq!(req.participant_id, "42");
        assert_eq!(req.command.kind(), CommandKind::RegisterDriver);

        let req: InteractionRequest = serde_json::from_value(serde_json::json!({
            "participant_id": "42",
            "command": "page_next"
        }))
        .unwrap();
        assert_eq!(req.command.kind(), CommandKind::PageNext);
    }
}
