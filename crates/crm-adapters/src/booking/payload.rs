//! Normalización del payload de reserva.
//!
//! Los proveedores de calendario no son consistentes: el evento puede venir
//! envuelto en `payload` o plano, el id bajo media docena de nombres y el
//! asistente como lista o como objeto. Aquí se reduce todo a `BookingData`.

use serde::Deserialize;
use serde_json::Value;

use crm_core::CoreError;

/// Datos ya normalizados de una reserva entrante.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingData {
    pub event_id:       String,
    pub title:          String,
    pub start_time:     String,
    pub end_time:       String,
    pub customer_email: String,
    pub customer_name:  String,
    pub first_name:     String,
    pub last_name:      String,
    pub video_call_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawBooking {
    uid:        Option<String>,
    id:         Option<Value>,
    booking_id: Option<Value>,
    event_id:   Option<Value>,
    meeting_id: Option<Value>,
    uuid:       Option<String>,
    title:      Option<String>,
    start_time: Option<String>,
    end_time:   Option<String>,
    attendees:  Option<Vec<RawAttendee>>,
    attendee:   Option<RawAttendee>,
    organizer:  Option<RawAttendee>,
    metadata:   Option<RawMetadata>,
    location:   Option<String>,
    responses:  Option<RawResponses>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAttendee {
    name:  Option<String>,
    email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawMetadata {
    video_call_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawResponses {
    name:  Option<RawResponseField>,
    email: Option<RawResponseField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawResponseField {
    value: Option<String>,
}

/// Extrae los datos relevantes del body del webhook. El evento puede venir en
/// `body.payload` o directamente en `body`. Falla con `Validation` si no hay
/// email de cliente: sin email no hay forma de anclar la reserva a nadie.
pub fn extract_booking_data(body: &Value) -> Result<BookingData, CoreError> {
    let event = body.get("payload").filter(|p| p.is_object()).unwrap_or(body);
    let raw: RawBooking = serde_json::from_value(event.clone())
        .map_err(|e| CoreError::Validation(format!("unreadable booking payload: {e}")))?;

    let attendee = raw.attendees
                      .as_ref()
                      .and_then(|a| a.first().cloned())
                      .or(raw.attendee.clone());

    let customer_email = norm(attendee.as_ref().and_then(|a| a.email.clone()))
        .or_else(|| norm(raw.responses.as_ref().and_then(|r| r.email.as_ref()).and_then(|f| f.value.clone())))
        .unwrap_or_default();
    if customer_email.is_empty() {
        return Err(CoreError::Validation("booking payload has no customer email".into()));
    }

    let customer_name = norm(attendee.as_ref().and_then(|a| a.name.clone()))
        .or_else(|| norm(raw.responses.as_ref().and_then(|r| r.name.as_ref()).and_then(|f| f.value.clone())))
        .or_else(|| norm(raw.organizer.as_ref().and_then(|o| o.name.clone())))
        .unwrap_or_else(|| customer_email.clone());

    let (first_name, last_name) = split_name(&customer_name);

    let start_time = norm(raw.start_time.clone()).unwrap_or_default();
    let end_time = norm(raw.end_time.clone()).unwrap_or_default();

    // Orden de preferencia para el id del evento; como último recurso un id
    // derivado determinista, para que el reintento del proveedor deduplique.
    let event_id = norm(raw.uid.clone())
        .or_else(|| value_as_string(raw.id.as_ref()))
        .or_else(|| value_as_string(raw.booking_id.as_ref()))
        .or_else(|| value_as_string(raw.event_id.as_ref()))
        .or_else(|| value_as_string(raw.meeting_id.as_ref()))
        .or_else(|| norm(raw.uuid.clone()))
        .unwrap_or_else(|| format!("{start_time}:{customer_email}"));

    let video_call_url = raw.metadata
                            .as_ref()
                            .and_then(|m| norm(m.video_call_url.clone()))
                            .or_else(|| norm(raw.location.clone()).filter(|l| l.starts_with("http")));

    Ok(BookingData { event_id,
                     title: norm(raw.title).unwrap_or_else(|| "Beratungstermin".into()),
                     start_time,
                     end_time,
                     customer_email,
                     customer_name,
                     first_name,
                     last_name,
                     video_call_url })
}

fn norm(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn value_as_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => norm(Some(s.clone())),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn split_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = parts.collect();
    (first, rest.join(" "))
}
