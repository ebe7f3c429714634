//! Events delivered by the hub and setup-wizard prompt fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Lifecycle and command events from the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// The user started driver setup.
    SetupStart { request_id: String },
    /// The user answered a setup prompt. Keys are field ids.
    SetupUserInput {
        request_id: String,
        values: HashMap<String, String>,
    },
    Connect,
    Disconnect,
    EnterStandby,
    ExitStandby,
    SubscribeEntities(Vec<String>),
    UnsubscribeEntities(Vec<String>),
    EntityCommand {
        request_id: String,
        entity_id: String,
        command_id: String,
        params: serde_json::Value,
    },
}

impl HubEvent {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            HubEvent::SetupStart { .. } => "setup_start",
            HubEvent::SetupUserInput { .. } => "setup_user_input",
            HubEvent::Connect => "connect",
            HubEvent::Disconnect => "disconnect",
            HubEvent::EnterStandby => "enter_standby",
            HubEvent::ExitStandby => "exit_standby",
            HubEvent::SubscribeEntities(_) => "subscribe_entities",
            HubEvent::UnsubscribeEntities(_) => "unsubscribe_entities",
            HubEvent::EntityCommand { .. } => "entity_command",
        }
    }
}

/// One input field in a setup prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupField {
    pub id: String,
    pub label: String,
    pub field: FieldKind,
}

/// Kind of setup input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Dropdown {
        value: String,
        items: Vec<DropdownItem>,
    },
    Number {
        min: i64,
        max: i64,
        value: i64,
    },
}

/// One choice in a dropdown field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropdownItem {
    pub id: String,
    pub label: String,
}
