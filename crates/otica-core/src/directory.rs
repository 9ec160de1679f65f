//! # Client Directory Lookup
//!
//! Matching and flattening of client records for the client picker, plus the
//! sequencer that keeps debounced lookups from applying stale responses.
//!
//! ## Result Rows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  query "silva"                                                          │
//! │                                                                         │
//! │  Maria Silva            529.982.247-25     ← titular match              │
//! │    Pedro (Maria Silva)  ...                ← her dependents, flattened  │
//! │    Julia (Maria Silva)  ...                                             │
//! │  João Silva             ...                ← titular match              │
//! │  Ana (Carlos Souza)     ...                ← dependent matching itself  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Client;
use crate::validation::{digits_only, format_cpf};

// =============================================================================
// Matching
// =============================================================================

/// One selectable row in the client picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClientRow {
    pub client: Client,
    /// Titular's name when the row is a dependent.
    pub titular_name: Option<String>,
    /// Display label, e.g. `"Pedro (Maria Silva)"`.
    pub label: String,
    pub formatted_cpf: String,
}

impl ClientRow {
    fn new(client: &Client, titular_name: Option<&str>) -> Self {
        let label = match titular_name {
            Some(parent) => format!("{} ({})", client.name, parent),
            None => client.name.clone(),
        };
        ClientRow {
            client: client.clone(),
            titular_name: titular_name.map(str::to_string),
            label,
            formatted_cpf: format_cpf(&client.cpf),
        }
    }
}

/// Name substring (case-insensitive), CPF digits or phone digits.
pub fn client_matches(client: &Client, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }

    if client.name.to_lowercase().contains(&needle) {
        return true;
    }

    let needle_digits = digits_only(&needle);
    !needle_digits.is_empty()
        && (client.cpf.contains(&needle_digits) || digits_only(&client.phone).contains(&needle_digits))
}

/// Builds picker rows from the whole directory.
///
/// Each matching titular is followed by all of its dependents. Dependents
/// that match on their own are listed too, labeled with their titular.
pub fn search_clients(directory: &[Client], query: &str, limit: usize) -> Vec<ClientRow> {
    let by_id: HashMap<&str, &Client> = directory.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut dependents: HashMap<&str, Vec<&Client>> = HashMap::new();
    for client in directory {
        if let Some(parent) = client.dependent_of.as_deref() {
            dependents.entry(parent).or_default().push(client);
        }
    }

    let titular_name = |c: &Client| {
        c.dependent_of
            .as_deref()
            .and_then(|p| by_id.get(p))
            .map(|t| t.name.clone())
    };

    let mut seen: HashSet<&str> = HashSet::new();
    let mut rows = Vec::new();

    for client in directory.iter().filter(|c| client_matches(c, query)) {
        if !seen.insert(client.id.as_str()) {
            continue;
        }

        if client.is_dependent() {
            rows.push(ClientRow::new(client, titular_name(client).as_deref()));
            continue;
        }

        rows.push(ClientRow::new(client, None));
        for dependent in dependents.get(client.id.as_str()).into_iter().flatten() {
            if seen.insert(dependent.id.as_str()) {
                rows.push(ClientRow::new(dependent, Some(&client.name)));
            }
        }
    }

    rows.truncate(limit);
    rows
}

// =============================================================================
// Lookup Sequencer
// =============================================================================

/// Ticket handed out when a lookup is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LookupTicket(pub u64);

/// Last-request-wins guard for debounced lookups.
///
/// Each keystroke issues a ticket; a response is applied only if its ticket
/// is still the latest one issued.
#[derive(Debug, Default)]
pub struct LookupSequencer {
    latest: AtomicU64,
}

impl LookupSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new ticket, superseding all earlier ones.
    pub fn issue(&self) -> LookupTicket {
        LookupTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LookupTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Returns `response` only when `ticket` is still current.
    pub fn accept<T>(&self, ticket: LookupTicket, response: T) -> Option<T> {
        self.is_current(ticket).then_some(response)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
