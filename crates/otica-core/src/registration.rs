//! # Client Registration
//!
//! Turns the registration form into a validated [`Client`]. Directory-wide
//! rules (CPF uniqueness, the titular existing) need the store and are
//! enforced by `otica-db`.
//!
//! ```text
//!  ClientDraft ──build()──► Client
//!     nome        trimmed, 3..=120 chars
//!     cpf         check digits, stored as 11 digits
//!     telefone    10 or 11 digits
//!     email       optional, lowercased
//!     endereco    blank parts dropped
//!     dependentesDe + parentesco   both or neither
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Address, Client};
use crate::validation::{
    validate_client_name, validate_cpf, validate_email, validate_phone, ValidationResult,
};

/// Raw registration form input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClientDraft {
    pub nome: String,
    pub cpf: String,
    pub telefone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub endereco: Address,
    /// Titular id when registering a dependent.
    #[serde(default)]
    pub dependentes_de: Option<String>,
    #[serde(default)]
    pub parentesco: Option<String>,
}

fn clean(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn clean_address(address: Address) -> Address {
    Address {
        cep: clean(address.cep),
        logradouro: clean(address.logradouro),
        numero: clean(address.numero),
        complemento: clean(address.complemento),
        bairro: clean(address.bairro),
        cidade: clean(address.cidade),
        estado: clean(address.estado).map(|uf| uf.to_uppercase()),
    }
}

impl ClientDraft {
    /// Validates every field and builds the client record.
    ///
    /// `id` may be empty for a temporary client that is registered later.
    pub fn build(self, id: impl Into<String>, now: DateTime<Utc>) -> ValidationResult<Client> {
        let name = validate_client_name(&self.nome)?;
        let cpf = validate_cpf(&self.cpf)?;
        let phone = validate_phone(&self.telefone)?;
        let email = validate_email(self.email.as_deref())?;

        let dependent_of = clean(self.dependentes_de);
        let relationship = match (&dependent_of, clean(self.parentesco)) {
            (Some(_), None) => return Err(ValidationError::required("parentesco")),
            (Some(_), relationship) => relationship,
            (None, _) => None,
        };

        Ok(Client {
            id: id.into(),
            name,
            cpf,
            phone,
            email,
            address: clean_address(self.endereco),
            photo_url: None,
            dependent_of,
            relationship,
            has_dependents: false,
            cashback_balance: Money::zero(),
            created_at: now,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ClientDraft {
        ClientDraft {
            nome: "  Maria Silva ".to_string(),
            cpf: "529.982.247-25".to_string(),
            telefone: "(11) 98765-4321".to_string(),
            email: Some(" Maria@Example.com ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_normalizes_fields() {
        let client = draft().build("c1", Utc::now()).unwrap();

        assert_eq!(client.id, "c1");
        assert_eq!(client.name, "Maria Silva");
        assert_eq!(client.cpf, "52998224725");
        assert_eq!(client.phone, "11987654321");
        assert_eq!(client.email.as_deref(), Some("maria@example.com"));
        assert!(!client.is_dependent());
        assert!(client.cashback_balance.is_zero());
    }

    #[test]
    fn test_invalid_cpf_rejected() {
        let mut d = draft();
        d.cpf = "123.456.789-00".to_string();
        assert!(d.build("c1", Utc::now()).is_err());
    }

    #[test]
    fn test_dependent_requires_relationship() {
        let mut d = draft();
        d.dependentes_de = Some("titular-1".to_string());
        d.parentesco = Some("   ".to_string());

        assert_eq!(
            d.build("c2", Utc::now()),
            Err(ValidationError::required("parentesco"))
        );
    }

    #[test]
    fn test_relationship_dropped_without_titular() {
        let mut d = draft();
        d.parentesco = Some("filho".to_string());

        let client = d.build("c3", Utc::now()).unwrap();
        assert_eq!(client.relationship, None);
    }

    #[test]
    fn test_address_blanks_dropped() {
        let mut d = draft();
        d.endereco = Address {
            cep: Some("01310-100".to_string()),
            numero: Some(" ".to_string()),
            estado: Some("sp".to_string()),
            ..Default::default()
        };

        let client = d.build("c4", Utc::now()).unwrap();
        assert_eq!(client.address.cep.as_deref(), Some("01310-100"));
        assert_eq!(client.address.numero, None);
        assert_eq!(client.address.estado.as_deref(), Some("SP"));
    }
}
