//! Content type system events and sinks.
//!
//! # Invariants
//! - Every structure create/update/delete through the service pushes
//!   exactly one event.
//! - Payloads are visible only to users holding READ on the structure.

use crate::access::permission::PermissionLevel;
use crate::model::structure::{Structure, StructureId, StructureType};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemEventType {
    SaveBaseContentType,
    UpdateBaseContentType,
    DeleteBaseContentType,
}

/// Audience restriction for an event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "level")]
pub enum Visibility {
    Global,
    Permission(PermissionLevel),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypePayload {
    /// Editing URL; set for created and deleted types only.
    pub action_url: Option<String>,
    pub structure_inode: StructureId,
    pub name: String,
    pub velocity_var_name: String,
    pub structure_type: StructureType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub event_type: SystemEventType,
    pub payload: ContentTypePayload,
    pub visibility: Visibility,
}

impl SystemEvent {
    /// Builds the event for a structure write. Updates carry no action URL.
    pub fn for_structure(event_type: SystemEventType, structure: &Structure) -> Self {
        let action_url = match event_type {
            SystemEventType::UpdateBaseContentType => None,
            SystemEventType::SaveBaseContentType | SystemEventType::DeleteBaseContentType => {
                Some(action_url(structure))
            }
        };
        Self {
            event_type,
            payload: ContentTypePayload {
                action_url,
                structure_inode: structure.inode,
                name: structure.name.clone(),
                velocity_var_name: structure.velocity_var_name.clone(),
                structure_type: structure.structure_type,
            },
            visibility: Visibility::Permission(PermissionLevel::Read),
        }
    }

    pub fn to_json(&self) -> Result<String, EventError> {
        serde_json::to_string(self).map_err(EventError::Serialize)
    }
}

/// Editing URL of a content type.
pub fn action_url(structure: &Structure) -> String {
    format!("/content-types/{}", structure.velocity_var_name)
}

#[derive(Debug)]
pub enum EventError {
    Serialize(serde_json::Error),
    Rejected(String),
}

impl Display for EventError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "failed to serialize system event: {err}"),
            Self::Rejected(message) => write!(f, "system event rejected: {message}"),
        }
    }
}

impl Error for EventError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Rejected(_) => None,
        }
    }
}

pub trait SystemEventSink: Send + Sync {
    fn push(&self, event: SystemEvent) -> Result<(), EventError>;
}

/// Keeps pushed events in memory, in push order.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<SystemEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SystemEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl SystemEventSink for RecordingEventSink {
    fn push(&self, event: SystemEvent) -> Result<(), EventError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| EventError::Rejected("event buffer lock poisoned".to_string()))?;
        events.push(event);
        Ok(())
    }
}

/// Writes each event as one JSON log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl SystemEventSink for LogEventSink {
    fn push(&self, event: SystemEvent) -> Result<(), EventError> {
        let body = event.to_json()?;
        info!(
            "event=system_event module=events status=ok type={:?} payload={}",
            event.event_type, body
        );
        Ok(())
    }
}
