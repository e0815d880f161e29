//! Forward Sensu events to Zenoss through its XML-RPC `sendEvent` call.
//!
//! The handler is a Sensu pipe handler: the event arrives as JSON on stdin.

use super::xmlrpc::{self, Endpoint, TransportError};
use crate::config::ZenossConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct SensuEvent {
    pub client: SensuClient,
    pub check:  SensuCheck,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensuClient {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensuCheck {
    pub name:   String,
    #[serde(default)]
    pub output: String,
    /// Kept loose: a missing or non-integer status must still map to a severity.
    #[serde(default)]
    pub status: Value,
}

/// Event document as Zenoss expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZenossEvent {
    pub device:      String,
    #[serde(rename = "eventClass")]
    pub event_class: String,
    #[serde(rename = "eventKey")]
    pub event_key:   String,
    pub component:   String,
    pub summary:     String,
    pub message:     Value,
    pub severity:    i64,
}

/// Sensu check status → Zenoss severity. Unknown, missing or
/// non-integer statuses are raised as Critical.
pub fn status_to_severity(status: &Value) -> i64 {
    match status.as_i64() {
        Some(0) => 0, // Clear
        Some(1) => 3, // Warning
        Some(2) => 5, // Critical
        _       => 5,
    }
}

pub fn build_event(raw: &Value, settings: &ZenossConfig) -> Result<ZenossEvent> {
    let event: SensuEvent = serde_json::from_value(raw.clone())
        .context("event is missing client.name or check.name")?;

    Ok(ZenossEvent {
        device:      settings.device.clone(),
        event_class: settings.event_class.clone(),
        event_key:   event.check.name,
        component:   event.client.name,
        summary:     event.check.output,
        message:     raw.clone(),
        severity:    status_to_severity(&event.check.status),
    })
}

pub fn endpoint(settings: &ZenossConfig) -> Endpoint {
    Endpoint {
        url:          format!("http://{}:{}", settings.server, settings.port),
        user:         settings.user.clone(),
        password:     settings.password.clone(),
        timeout_secs: settings.timeout_secs,
    }
}

/// Send one event. A timeout is reported and swallowed; there is no retry.
pub fn handle(input: &str, settings: &ZenossConfig) -> Result<()> {
    let raw: Value = serde_json::from_str(input).context("parsing Sensu event from stdin")?;
    let event = build_event(&raw, settings)?;
    let payload = serde_json::to_value(&event)?;

    match xmlrpc::call(&endpoint(settings), "sendEvent", &[payload]) {
        Ok(_) => {
            log::info!("sent {} event for {} (severity {})", event.event_key, event.component, event.severity);
            Ok(())
        }
        Err(TransportError::Timeout(secs)) => {
            log::debug!("sendEvent gave up after {}s", secs);
            println!(
                "Connection timed out when creating event: {} - {}",
                event.component, event.summary
            );
            Ok(())
        }
        Err(e) => Err(e).context("sending event to Zenoss"),
    }
}
