//! # Service Order Commands
//!
//! One OS form per collection. Opening a form pre-fills it with the last
//! submitted values; the recommended type is only a starting point.
//!
//! ```text
//! open_os_form(1) ──► edit ──► submit_os_form(1, form) ──► completed
//!        │                                                      │
//!        └──── cancel: nothing to call, nothing changes ◄───────┘ re-open
//! ```

use otica_core::prescription::Measure;
use otica_core::service_order::{OsForm, OsRecord};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::SessionState;

/// OS state of the whole session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrdersResponse {
    pub records: Vec<OsRecord>,
    /// Collections that still block a sale.
    pub pending: Vec<u32>,
    pub all_completed: bool,
}

/// Accepted values of one prescription measure, for the form selects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureOptions {
    pub measure: Measure,
    pub field: &'static str,
    pub options: Vec<String>,
}

/// Opens a collection's OS form.
///
/// ## Returns
/// The last submitted values, or defaults with the recommended type on the
/// first open.
pub fn open_os_form(session: &SessionState, collection_id: u32) -> Result<OsForm, ApiError> {
    debug!(collection_id, "open_os_form command");
    session.with_session_mut(|s| Ok(s.open_os_form(collection_id)?))
}

/// Submits a collection's OS form and marks it completed.
///
/// Prescription values outside their domains are rejected and nothing is
/// stored.
pub fn submit_os_form(
    session: &SessionState,
    collection_id: u32,
    form: OsForm,
) -> Result<OsRecord, ApiError> {
    debug!(collection_id, tipo = ?form.tipo, "submit_os_form command");
    let record = session.with_session_mut(|s| s.submit_os_form(collection_id, form))?;
    info!(collection_id, tipo = ?record.chosen_type, "OS form completed");
    Ok(record)
}

pub fn get_service_orders(session: &SessionState) -> ServiceOrdersResponse {
    debug!("get_service_orders command");
    session.with_session(|s| {
        let pending = s.pending_service_orders();
        ServiceOrdersResponse {
            records: s.composer().records().cloned().collect(),
            all_completed: pending.is_empty(),
            pending,
        }
    })
}

/// Every prescription measure with its accepted values.
pub fn get_prescription_options() -> Vec<MeasureOptions> {
    debug!("get_prescription_options command");
    [
        Measure::Sphere,
        Measure::Cylinder,
        Measure::Axis,
        Measure::Addition,
        Measure::Dnp,
        Measure::Height,
    ]
    .into_iter()
    .map(|measure| MeasureOptions {
        measure,
        field: measure.field(),
        options: measure.options(),
    })
    .collect()
}
