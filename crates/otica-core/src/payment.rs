//! # Payment Allocator
//!
//! Splits the transaction total across one or more payment methods and tracks
//! which entries have been confirmed by their capture dialog.
//!
//! ## Distribution Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AUTO                                   MANUAL                          │
//! │  ────                                   ──────                          │
//! │  one entry                              any number of entries           │
//! │  value := total on every change         values typed by the operator    │
//! │  complete = processed && sum == total   complete = all processed        │
//! │                                                                         │
//! │  Entry state:                                                           │
//! │                                                                         │
//! │   ┌───────────┐  process(CaptureRequest)  ┌───────────┐                 │
//! │   │ pending   │ ────────────────────────► │ processed │                 │
//! │   │ no detail │ ◄──────────────────────── │ + details │                 │
//! │   └───────────┘  change_method/set_value  └───────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Manual mode does not re-check that the entries add up to the total. The
//! operator may under- or over-allocate there.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CaptureError, PaymentError};
use crate::money::Money;

// =============================================================================
// Methods
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Dinheiro,
    Cartao,
    Pix,
    Transferencia,
    Boleto,
    Crediario,
    Cripto,
    Cashback,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Dinheiro => "dinheiro",
            PaymentMethod::Cartao => "cartao",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Transferencia => "transferencia",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::Crediario => "crediario",
            PaymentMethod::Cripto => "cripto",
            PaymentMethod::Cashback => "cashback",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMode {
    #[default]
    Auto,
    Manual,
}

/// Maximum card installments offered at the counter.
pub const MAX_CARD_INSTALLMENTS: u32 = 12;

// =============================================================================
// Capture
// =============================================================================

/// What a method-specific capture dialog submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "metodo", rename_all = "lowercase")]
pub enum CaptureRequest {
    Dinheiro {
        valor_recebido: Money,
    },
    Cartao {
        ultimos_digitos: String,
        bandeira: String,
        parcelas: u32,
    },
    Pix {
        valor_confirmado: Money,
        id_transacao: Option<String>,
    },
    Transferencia {
        banco: String,
        comprovante: Option<String>,
    },
    Boleto {
        #[ts(as = "Option<String>")]
        data_vencimento: Option<NaiveDate>,
    },
    Crediario {
        parcelas: u32,
        #[ts(as = "Option<String>")]
        primeiro_vencimento: Option<NaiveDate>,
    },
    Cripto {
        moeda: String,
        endereco: String,
    },
    Cashback {
        saldo_disponivel: Money,
    },
}

/// Confirmation details stored on a processed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "metodo", rename_all = "lowercase")]
pub enum PaymentDetails {
    Dinheiro {
        valor_recebido: Money,
        troco: Money,
    },
    Cartao {
        ultimos_digitos: String,
        bandeira: String,
        parcelas: u32,
    },
    Pix {
        valor_confirmado: Money,
        id_transacao: Option<String>,
    },
    Transferencia {
        banco: String,
        comprovante: Option<String>,
    },
    Boleto {
        #[ts(as = "String")]
        data_vencimento: NaiveDate,
    },
    Crediario {
        parcelas: u32,
        valor_parcela: Money,
        #[ts(as = "String")]
        primeiro_vencimento: NaiveDate,
    },
    Cripto {
        moeda: String,
        endereco: String,
    },
    Cashback {
        saldo_utilizado: Money,
        saldo_restante: Money,
    },
}

fn non_blank(field: &str, value: &str) -> Result<String, CaptureError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CaptureError::required(field));
    }
    Ok(value.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CaptureRequest {
    pub fn method(&self) -> PaymentMethod {
        match self {
            CaptureRequest::Dinheiro { .. } => PaymentMethod::Dinheiro,
            CaptureRequest::Cartao { .. } => PaymentMethod::Cartao,
            CaptureRequest::Pix { .. } => PaymentMethod::Pix,
            CaptureRequest::Transferencia { .. } => PaymentMethod::Transferencia,
            CaptureRequest::Boleto { .. } => PaymentMethod::Boleto,
            CaptureRequest::Crediario { .. } => PaymentMethod::Crediario,
            CaptureRequest::Cripto { .. } => PaymentMethod::Cripto,
            CaptureRequest::Cashback { .. } => PaymentMethod::Cashback,
        }
    }

    /// Checks the dialog's fields against the amount due and produces the
    /// details to store.
    pub fn confirm(self, due: Money) -> Result<PaymentDetails, CaptureError> {
        match self {
            CaptureRequest::Dinheiro { valor_recebido } => {
                if valor_recebido < due {
                    return Err(CaptureError::InsufficientCash {
                        received: valor_recebido,
                        due,
                    });
                }
                Ok(PaymentDetails::Dinheiro {
                    valor_recebido,
                    troco: valor_recebido - due,
                })
            }

            CaptureRequest::Cartao {
                ultimos_digitos,
                bandeira,
                parcelas,
            } => {
                let ultimos_digitos = non_blank("ultimos_digitos", &ultimos_digitos)?;
                if ultimos_digitos.len() != 4 || !ultimos_digitos.chars().all(|c| c.is_ascii_digit())
                {
                    return Err(CaptureError::invalid("ultimos_digitos", "must be 4 digits"));
                }
                let bandeira = non_blank("bandeira", &bandeira)?;
                if parcelas < 1 || parcelas > MAX_CARD_INSTALLMENTS {
                    return Err(CaptureError::invalid(
                        "parcelas",
                        format!("must be between 1 and {}", MAX_CARD_INSTALLMENTS),
                    ));
                }
                Ok(PaymentDetails::Cartao {
                    ultimos_digitos,
                    bandeira,
                    parcelas,
                })
            }

            CaptureRequest::Pix {
                valor_confirmado,
                id_transacao,
            } => {
                if valor_confirmado != due {
                    return Err(CaptureError::invalid(
                        "valor_confirmado",
                        format!("expected {}, got {}", due, valor_confirmado),
                    ));
                }
                Ok(PaymentDetails::Pix {
                    valor_confirmado,
                    id_transacao: optional_text(id_transacao),
                })
            }

            CaptureRequest::Transferencia { banco, comprovante } => {
                Ok(PaymentDetails::Transferencia {
                    banco: non_blank("banco", &banco)?,
                    comprovante: optional_text(comprovante),
                })
            }

            CaptureRequest::Boleto { data_vencimento } => Ok(PaymentDetails::Boleto {
                data_vencimento: data_vencimento
                    .ok_or_else(|| CaptureError::required("data_vencimento"))?,
            }),

            CaptureRequest::Crediario {
                parcelas,
                primeiro_vencimento,
            } => {
                if parcelas < 1 {
                    return Err(CaptureError::invalid("parcelas", "must be at least 1"));
                }
                Ok(PaymentDetails::Crediario {
                    parcelas,
                    valor_parcela: Money::from_cents(due.cents() / parcelas as i64),
                    primeiro_vencimento: primeiro_vencimento
                        .ok_or_else(|| CaptureError::required("primeiro_vencimento"))?,
                })
            }

            CaptureRequest::Cripto { moeda, endereco } => Ok(PaymentDetails::Cripto {
                moeda: non_blank("moeda", &moeda)?,
                endereco: non_blank("endereco", &endereco)?,
            }),

            CaptureRequest::Cashback { saldo_disponivel } => {
                if saldo_disponivel < due {
                    return Err(CaptureError::InsufficientCashback {
                        available: saldo_disponivel,
                        due,
                    });
                }
                Ok(PaymentDetails::Cashback {
                    saldo_utilizado: due,
                    saldo_restante: saldo_disponivel - due,
                })
            }
        }
    }
}

// =============================================================================
// Entry
// =============================================================================

/// One allocation of the total to a payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentEntry {
    #[serde(rename = "metodo")]
    pub method: PaymentMethod,
    #[serde(rename = "valor")]
    pub value: Money,
    #[serde(rename = "processado")]
    pub processed: bool,
    #[serde(rename = "detalhes")]
    pub details: Option<PaymentDetails>,
}

impl PaymentEntry {
    pub fn new(method: PaymentMethod, value: Money) -> Self {
        PaymentEntry {
            method,
            value,
            processed: false,
            details: None,
        }
    }

    fn invalidate(&mut self) {
        self.processed = false;
        self.details = None;
    }

    fn set_value(&mut self, value: Money) {
        if self.value != value {
            self.value = value;
            self.invalidate();
        }
    }
}

// =============================================================================
// Allocator
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAllocator {
    entries: Vec<PaymentEntry>,
    mode: DistributionMode,
    total: Money,
}

impl PaymentAllocator {
    /// Auto mode with a single cash entry.
    pub fn new() -> Self {
        PaymentAllocator {
            entries: vec![PaymentEntry::new(PaymentMethod::default(), Money::zero())],
            mode: DistributionMode::Auto,
            total: Money::zero(),
        }
    }

    pub fn entries(&self) -> &[PaymentEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Result<&PaymentEntry, PaymentError> {
        self.entries
            .get(index)
            .ok_or(PaymentError::EntryNotFound(index))
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut PaymentEntry, PaymentError> {
        self.entries
            .get_mut(index)
            .ok_or(PaymentError::EntryNotFound(index))
    }

    pub fn mode(&self) -> DistributionMode {
        self.mode
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Records a new transaction total. Auto mode resizes its entry.
    pub fn sync_total(&mut self, total: Money) {
        self.total = total;
        if self.mode == DistributionMode::Auto {
            if let Some(entry) = self.entries.first_mut() {
                entry.set_value(total);
            }
        }
    }

    /// Switches mode. Going to auto keeps only the first entry, sized to the total.
    pub fn set_mode(&mut self, mode: DistributionMode) {
        self.mode = mode;
        if mode == DistributionMode::Auto {
            self.entries.truncate(1);
            let total = self.total;
            if let Some(entry) = self.entries.first_mut() {
                entry.set_value(total);
            }
        }
    }

    /// Appends a cash entry valued at the remaining amount (floored at zero).
    ///
    /// In auto mode only allowed when the list is empty.
    pub fn add_entry(&mut self) -> Result<usize, PaymentError> {
        if self.mode == DistributionMode::Auto && !self.entries.is_empty() {
            return Err(PaymentError::AutoModeSingleEntry);
        }

        let remaining = self.remaining();
        let value = if remaining.is_negative() {
            Money::zero()
        } else {
            remaining
        };
        self.entries
            .push(PaymentEntry::new(PaymentMethod::default(), value));
        Ok(self.entries.len() - 1)
    }

    pub fn remove_entry(&mut self, index: usize) -> Result<PaymentEntry, PaymentError> {
        if index >= self.entries.len() {
            return Err(PaymentError::EntryNotFound(index));
        }
        Ok(self.entries.remove(index))
    }

    /// Changes the method. A different method drops any confirmation.
    pub fn change_method(
        &mut self,
        index: usize,
        method: PaymentMethod,
    ) -> Result<(), PaymentError> {
        let entry = self.entry_mut(index)?;
        if entry.method != method {
            entry.method = method;
            entry.invalidate();
        }
        Ok(())
    }

    /// Sets an entry's value. Manual mode only.
    pub fn set_value(&mut self, index: usize, value: Money) -> Result<(), PaymentError> {
        if self.mode == DistributionMode::Auto {
            return Err(PaymentError::ValueLockedInAutoMode);
        }
        if value.is_negative() {
            return Err(PaymentError::NegativeValue);
        }
        self.entry_mut(index)?.set_value(value);
        Ok(())
    }

    /// Applies a capture dialog's result. Only a valid request flips `processed`.
    pub fn process(
        &mut self,
        index: usize,
        request: CaptureRequest,
    ) -> Result<&PaymentEntry, PaymentError> {
        let entry = self.entry_mut(index)?;

        if request.method() != entry.method {
            return Err(PaymentError::MethodMismatch {
                expected: entry.method.to_string(),
                got: request.method().to_string(),
            });
        }

        let details = request.confirm(entry.value)?;
        entry.details = Some(details);
        entry.processed = true;
        Ok(entry)
    }

    pub fn total_allocated(&self) -> Money {
        self.entries.iter().map(|e| e.value).sum()
    }

    /// total − allocated. Negative when over-allocated.
    pub fn remaining(&self) -> Money {
        self.total - self.total_allocated()
    }

    /// Ready for a sale: at least one entry, all processed, and in auto
    /// mode the allocation equals the total to the centavo.
    pub fn is_complete(&self) -> bool {
        if self.entries.is_empty() || !self.entries.iter().all(|e| e.processed) {
            return false;
        }
        match self.mode {
            DistributionMode::Auto => self.total_allocated() == self.total,
            DistributionMode::Manual => true,
        }
    }

    /// Back to a single pending cash entry in auto mode.
    pub fn reset(&mut self) {
        *self = PaymentAllocator::new();
    }
}

impl Default for PaymentAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
