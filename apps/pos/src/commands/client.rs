//! # Client Commands
//!
//! Client picker, registration form and client selection.
//!
//! ## Picker Lookups
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  keystroke "ma"    ──► ticket 1 ──► store ─────────────┐               │
//! │  keystroke "mar"   ──► ticket 2 ──► store ───┐         │               │
//! │                                              ▼         ▼               │
//! │                                          answer 2   answer 1           │
//! │                                          (shown)    (stale: dropped)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Only the newest ticket's answer is shown, whatever order the answers
//! arrive in.

use chrono::Utc;
use otica_core::directory::{ClientRow, LookupTicket};
use otica_core::registration::ClientDraft;
use otica_core::validation::validate_search_query;
use otica_core::{Client, SelectedClient};
use otica_db::{ClientPhoto, DbError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commands::cart::CartResponse;
use crate::error::ApiError;
use crate::state::{ConfigState, DbState, SessionState};

/// Client picker rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSearchResponse {
    pub ticket: LookupTicket,
    pub rows: Vec<ClientRow>,
    /// A newer lookup was issued while this one ran; `rows` is empty.
    pub stale: bool,
    /// Inline warning when the lookup itself failed.
    pub warning: Option<String>,
}

impl ClientSearchResponse {
    fn empty(ticket: LookupTicket) -> Self {
        ClientSearchResponse {
            ticket,
            rows: Vec::new(),
            stale: false,
            warning: None,
        }
    }
}

/// Photo captured with the registration form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    /// File extension, e.g. `jpg` or `png`.
    pub extension: String,
}

impl From<PhotoUpload> for ClientPhoto {
    fn from(photo: PhotoUpload) -> Self {
        ClientPhoto::new(photo.bytes, photo.extension)
    }
}

/// Searches the client directory by name or CPF.
///
/// ## Returns
/// Titulars followed by their dependents. A failed lookup is reported
/// through `warning` with no rows. An answer overtaken by a newer lookup
/// comes back with `stale` set and no rows.
pub async fn search_clients(
    db: &DbState,
    session: &SessionState,
    config: &ConfigState,
    query: String,
    limit: Option<usize>,
) -> ClientSearchResponse {
    let ticket = session.client_lookups().issue();
    answer_client_search(db, session, config, ticket, query, limit).await
}

/// Runs the lookup behind an already issued ticket.
///
/// Hosts that start lookups concurrently issue one ticket per keystroke
/// and answer each here; only the newest ticket gets rows back.
pub async fn answer_client_search(
    db: &DbState,
    session: &SessionState,
    config: &ConfigState,
    ticket: LookupTicket,
    query: String,
    limit: Option<usize>,
) -> ClientSearchResponse {
    let limit = limit.unwrap_or(config.search_limit);
    debug!(query = %query, limit, ticket = ticket.0, "search_clients command");

    let query = match validate_search_query(&query) {
        Ok(q) => q,
        Err(e) => {
            return ClientSearchResponse {
                warning: Some(e.to_string()),
                ..ClientSearchResponse::empty(ticket)
            }
        }
    };

    let result = db.clients().search(&query, limit).await;

    let Some(result) = session.client_lookups().accept(ticket, result) else {
        debug!(ticket = ticket.0, "Discarding stale client lookup");
        return ClientSearchResponse {
            stale: true,
            ..ClientSearchResponse::empty(ticket)
        };
    };

    match result {
        Ok(rows) => ClientSearchResponse {
            rows,
            ..ClientSearchResponse::empty(ticket)
        },
        Err(e) => {
            warn!(error = %e, "Client lookup failed");
            ClientSearchResponse {
                warning: Some(format!("Client lookup failed: {}", e)),
                ..ClientSearchResponse::empty(ticket)
            }
        }
    }
}

/// Gets a client by id.
pub async fn get_client(db: &DbState, id: String) -> Result<Client, ApiError> {
    debug!(id = %id, "get_client command");
    db.clients()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client", &id))
}

/// Lists the dependents of a titular.
pub async fn list_dependents(db: &DbState, titular_id: String) -> Result<Vec<Client>, ApiError> {
    debug!(titular_id = %titular_id, "list_dependents command");
    Ok(db.clients().dependents_of(&titular_id).await?)
}

/// Registers a client from the registration form.
///
/// ## Behavior
/// 1. Validates the form (name, CPF check digits, phone, email, parentesco)
/// 2. Rejects a CPF already in the directory
/// 3. Dependents: the titular must exist and is flagged `temDependentes`
/// 4. Uploads the photo; a failed upload registers the client without one
pub async fn register_client(
    db: &DbState,
    draft: ClientDraft,
    photo: Option<PhotoUpload>,
) -> Result<Client, ApiError> {
    debug!(has_photo = photo.is_some(), "register_client command");

    let client = draft.build("", Utc::now())?;
    let client = db.clients().register(client, photo.map(ClientPhoto::from)).await?;

    info!(id = %client.id, "Client registered from form");
    Ok(client)
}

/// Attaches a registered client to the session.
pub async fn select_client(
    db: &DbState,
    session: &SessionState,
    client_id: String,
) -> Result<CartResponse, ApiError> {
    debug!(client_id = %client_id, "select_client command");

    let client = db
        .clients()
        .get(&client_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client", &client_id))?;

    Ok(session.with_session_mut(|s| {
        s.select_client(SelectedClient::existing(client));
        CartResponse::from(&*s)
    }))
}

/// Attaches a client typed in at the counter without registering it.
///
/// The client is validated now and registered by the finalizer.
pub async fn select_temporary_client(
    db: &DbState,
    session: &SessionState,
    draft: ClientDraft,
) -> Result<CartResponse, ApiError> {
    debug!("select_temporary_client command");

    let client = draft.build("", Utc::now())?;
    if db.clients().find_by_cpf(&client.cpf).await?.is_some() {
        return Err(DbError::duplicate("cpf", client.formatted_cpf()).into());
    }

    Ok(session.with_session_mut(|s| {
        s.select_client(SelectedClient::temporary(client));
        CartResponse::from(&*s)
    }))
}

pub fn clear_client(session: &SessionState) -> CartResponse {
    debug!("clear_client command");
    session.with_session_mut(|s| {
        s.clear_client();
        CartResponse::from(&*s)
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
