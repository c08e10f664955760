//! Handler del webhook de reservas.
//!
//! Pipeline completo: firma HMAC, parseo, filtro de trigger, admisión
//! idempotente por id de evento y workflow compensable de cinco steps
//! (numeración, cliente, proyecto, cita y email de confirmación). Los dos
//! últimos steps son no-fatales: una cita o un email caídos no revierten la
//! creación del proyecto.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Datelike, Utc};
use log::{error, info, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use crm_core::constants::BOOKING_WEBHOOK_SCOPE;
use crm_core::{format_order_number, Admission, AdmissionError, AdmissionGuard, CoreError, FnStep,
               SequenceStore, Step, WorkflowEngine};

use super::directory::{Appointment, CrmDirectory, Customer, Project};
use super::payload::{extract_booking_data, BookingData};
use crate::config::WebhookConfig;
use crate::gateway::{MessageGateway, OutboundMessage};
use crate::response::ApiResponse;
use crate::signature::verify_signature;

const ORDER_NUMBER_COUNTER: &str = "order_number";
const ORDER_NUMBER_PREFIX: &str = "K-";
const ACCESS_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ACCESS_CODE_LEN: usize = 12;

/// Dependencias inyectadas del handler. Todo detrás de traits para que los
/// tests y el binario demo usen las implementaciones en memoria.
pub struct BookingWebhookDeps {
    pub guard:     AdmissionGuard,
    pub directory: Arc<dyn CrmDirectory>,
    pub sequence:  Arc<dyn SequenceStore>,
    pub gateway:   Arc<dyn MessageGateway>,
    pub config:    WebhookConfig,
}

/// Estado compartido entre los steps de un run. Cada step deposita lo que los
/// siguientes (y la respuesta final) necesitan.
#[derive(Debug, Default)]
struct BookingRunState {
    order_number:        String,
    customer_id:         Option<Uuid>,
    customer_created:    bool,
    project_id:          Option<Uuid>,
    access_code:         String,
    appointment_created: bool,
    email_sent:          bool,
}

type SharedState = Arc<Mutex<BookingRunState>>;

fn lock(state: &SharedState) -> Result<MutexGuard<'_, BookingRunState>, CoreError> {
    state.lock()
         .map_err(|_| CoreError::Internal("booking state mutex poisoned".into()))
}

/// Punto de entrada del webhook. Devuelve la respuesta HTTP abstracta que el
/// framework de turno traduce.
pub fn handle_booking_webhook(deps: &BookingWebhookDeps,
                              raw_body: &[u8],
                              signature: Option<&str>)
                              -> ApiResponse {
    if verify_signature(raw_body, signature, &deps.config).is_rejected() {
        return ApiResponse::with_status(401, json!({"error": "Invalid signature"}));
    }

    let body: Value = match serde_json::from_slice(raw_body) {
        Ok(v) => v,
        Err(err) => {
            warn!("booking:invalid-json error={err}");
            return ApiResponse::with_status(400, json!({"error": "Invalid JSON body"}));
        }
    };

    // El trigger puede venir en el sobre o dentro del payload. Sólo se
    // descarta cuando está presente y es otro evento: un body sin trigger se
    // procesa como reserva.
    let trigger = body.get("triggerEvent")
                      .or_else(|| body.get("payload").and_then(|p| p.get("triggerEvent")))
                      .and_then(Value::as_str);
    if let Some(trigger) = trigger.filter(|t| *t != "BOOKING_CREATED") {
        info!("booking:skip trigger={trigger}");
        return ApiResponse::ok(json!({
            "ok": true,
            "skipped": true,
            "reason": "Not BOOKING_CREATED",
        }));
    }

    let data = match extract_booking_data(&body) {
        Ok(d) => d,
        Err(err) => {
            warn!("booking:invalid-payload error={err}");
            return ApiResponse::with_status(400, json!({"error": err.to_string()}));
        }
    };

    match deps.guard.reserve(BOOKING_WEBHOOK_SCOPE, &data.event_id, body.clone()) {
        Ok(Admission::Reserved) => {}
        Ok(Admission::Duplicate(snapshot)) => {
            info!("booking:duplicate event_id={}", data.event_id);
            let mut response = json!({
                "ok": true,
                "skipped": true,
                "reason": "Duplicate event",
            });
            if let Some(result) = snapshot {
                response["result"] = result;
            }
            return ApiResponse::ok(response);
        }
        Err(AdmissionError::EmptyKey) => {
            return ApiResponse::with_status(400, json!({"error": "Missing event id"}));
        }
        Err(AdmissionError::Store(err)) => {
            error!("booking:admission-unavailable event_id={} error={err}", data.event_id);
            return ApiResponse::with_status(500, json!({"error": "Webhook processing failed"}));
        }
    }

    let state: SharedState = Arc::new(Mutex::new(BookingRunState::default()));
    let steps = build_steps(deps, &data, &state);
    let run = WorkflowEngine::new().run(&steps);

    if !run.succeeded {
        error!("booking:run-failed event_id={} error={:?}", data.event_id, run.first_error());
        deps.guard.release(BOOKING_WEBHOOK_SCOPE, &data.event_id);
        return ApiResponse::with_status(500, json!({"error": "Webhook processing failed"}));
    }

    let result = {
        let s = match lock(&state) {
            Ok(s) => s,
            Err(err) => {
                error!("booking:state-unreadable event_id={} error={err}", data.event_id);
                deps.guard.release(BOOKING_WEBHOOK_SCOPE, &data.event_id);
                return ApiResponse::with_status(500, json!({"error": "Webhook processing failed"}));
            }
        };
        json!({
            "ok": true,
            "customerId": s.customer_id,
            "projectId": s.project_id,
            "orderNumber": s.order_number,
            "accessCode": s.access_code,
            "emailSent": s.email_sent,
        })
    };

    if let Err(err) = deps.guard.complete(BOOKING_WEBHOOK_SCOPE, &data.event_id, result.clone()) {
        // El trabajo ya está hecho; un snapshot no grabado sólo degrada la
        // respuesta de futuros duplicados.
        warn!("booking:complete-failed event_id={} error={err}", data.event_id);
    }

    info!("booking:done event_id={} order_number={}",
          data.event_id,
          result["orderNumber"].as_str().unwrap_or(""));
    ApiResponse::ok(result)
}

fn build_steps(deps: &BookingWebhookDeps, data: &BookingData, state: &SharedState) -> Vec<Box<dyn Step>> {
    // El año del número de pedido sale del inicio de la reserva; así las
    // redeliveries tardías de un evento generan siempre el mismo formato.
    let allocate = {
        let sequence = Arc::clone(&deps.sequence);
        let state = Arc::clone(state);
        let start_time = data.start_time.clone();
        FnStep::new("allocate-order-number", move || {
            let value = sequence.next(ORDER_NUMBER_COUNTER)?;
            let year = chrono::DateTime::parse_from_rfc3339(&start_time).map(|d| d.year())
                                                                        .unwrap_or_else(|_| Utc::now().year());
            let order_number = format_order_number(ORDER_NUMBER_PREFIX, year, value);
            lock(&state)?.order_number = order_number.clone();
            Ok(json!({"orderNumber": order_number}))
        })
    };

    // Busca por email; crea sólo si no existe. La compensación borra el
    // cliente únicamente si este run lo creó.
    let customer = {
        let undo_directory = Arc::clone(&deps.directory);
        let undo_state = Arc::clone(state);
        let directory = Arc::clone(&deps.directory);
        let state = Arc::clone(state);
        let data = data.clone();
        let exec = FnStep::new("find-or-create-customer", move || {
            if let Some(existing) = directory.find_customer_by_email(&data.customer_email)? {
                let mut s = lock(&state)?;
                s.customer_id = Some(existing.id);
                s.customer_created = false;
                return Ok(json!({"customerId": existing.id, "created": false}));
            }
            let new_customer = Customer { id:         Uuid::new_v4(),
                                          email:      data.customer_email.clone(),
                                          first_name: data.first_name.clone(),
                                          last_name:  data.last_name.clone(),
                                          created_at: Utc::now() };
            directory.insert_customer(&new_customer)?;
            let mut s = lock(&state)?;
            s.customer_id = Some(new_customer.id);
            s.customer_created = true;
            Ok(json!({"customerId": new_customer.id, "created": true}))
        });
        exec.compensate(move |_result| {
                let s = lock(&undo_state)?;
                if !s.customer_created {
                    return Ok(());
                }
                if let Some(id) = s.customer_id {
                    undo_directory.delete_customer(id)?;
                }
                Ok(())
            })
    };

    let project = {
        let undo_directory = Arc::clone(&deps.directory);
        let undo_state = Arc::clone(state);
        let directory = Arc::clone(&deps.directory);
        let state = Arc::clone(state);
        let data = data.clone();
        let exec = FnStep::new("create-project", move || {
            let mut s = lock(&state)?;
            let customer_id = s.customer_id
                               .ok_or_else(|| CoreError::Internal("project step before customer step".into()))?;
            let access_code = generate_access_code();
            let mut notes = format!("Online-Buchung {} ({} - {})",
                                    data.event_id, data.start_time, data.end_time);
            if let Some(url) = &data.video_call_url {
                notes.push_str(&format!("\nVideo: {url}"));
            }
            let new_project = Project { id:           Uuid::new_v4(),
                                        customer_id,
                                        order_number: s.order_number.clone(),
                                        access_code:  access_code.clone(),
                                        notes,
                                        created_at:   Utc::now() };
            directory.insert_project(&new_project)?;
            s.project_id = Some(new_project.id);
            s.access_code = access_code;
            Ok(json!({"projectId": new_project.id, "orderNumber": new_project.order_number}))
        });
        exec.compensate(move |_result| {
                if let Some(id) = lock(&undo_state)?.project_id {
                    undo_directory.delete_project(id)?;
                }
                Ok(())
            })
    };

    // No-fatal: la reserva vive aunque la cita no se registre.
    let appointment = {
        let directory = Arc::clone(&deps.directory);
        let state = Arc::clone(state);
        let data = data.clone();
        FnStep::new("create-appointment", move || {
            let mut s = lock(&state)?;
            let project_id = match s.project_id {
                Some(id) => id,
                None => return Ok(json!({"created": false})),
            };
            let new_appointment = Appointment { id:         Uuid::new_v4(),
                                                project_id,
                                                title:      data.title.clone(),
                                                start_time: data.start_time.clone(),
                                                end_time:   data.end_time.clone(),
                                                location:   data.video_call_url.clone(),
                                                created_at: Utc::now() };
            match directory.insert_appointment(&new_appointment) {
                Ok(()) => {
                    s.appointment_created = true;
                    Ok(json!({"created": true, "appointmentId": new_appointment.id}))
                }
                Err(err) => {
                    warn!("booking:appointment-failed error={err}");
                    Ok(json!({"created": false}))
                }
            }
        }).no_retry()
    };

    // No-fatal: el email de confirmación se puede reenviar a mano.
    let email = {
        let gateway = Arc::clone(&deps.gateway);
        let state = Arc::clone(state);
        let data = data.clone();
        FnStep::new("send-confirmation-email", move || {
            let mut s = lock(&state)?;
            let mut body = format!("Hallo {},\n\nIhr Termin ist bestätigt.\nAuftragsnummer: {}\nZugangscode: {}",
                                   data.customer_name, s.order_number, s.access_code);
            if let Some(url) = &data.video_call_url {
                body.push_str(&format!("\nVideo-Link: {url}"));
            }
            let message = OutboundMessage { to:      data.customer_email.clone(),
                                            subject: format!("Terminbestätigung {}", s.order_number),
                                            body };
            match gateway.send(&message) {
                Ok(message_id) => {
                    s.email_sent = true;
                    Ok(json!({"sent": true, "messageId": message_id}))
                }
                Err(err) => {
                    warn!("booking:email-failed error={err}");
                    Ok(json!({"sent": false}))
                }
            }
        }).no_retry()
    };

    vec![Box::new(allocate),
         Box::new(customer),
         Box::new(project),
         Box::new(appointment),
         Box::new(email)]
}

/// Código de acceso corto para el portal del cliente, derivado de un UUID v4.
fn generate_access_code() -> String {
    Uuid::new_v4().as_bytes()
                  .iter()
                  .take(ACCESS_CODE_LEN)
                  .map(|b| ACCESS_CODE_ALPHABET[*b as usize % ACCESS_CODE_ALPHABET.len()] as char)
                  .collect()
}
