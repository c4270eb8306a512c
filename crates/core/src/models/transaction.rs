use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::storage::codec::{Draft, Entity};

use super::farm::FarmCollection;

/// Direction of money flow. Serialized with the labels the dashboard stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "Pemasukan")]
    Income,
    #[serde(rename = "Pengeluaran")]
    Expense,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "Pemasukan"),
            TransactionType::Expense => write!(f, "Pengeluaran"),
        }
    }
}

/// A single income or expense entry in the farm ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned identifier
    pub id: String,

    pub date: NaiveDate,

    pub description: String,

    /// Income or expense (wire name `type`)
    #[serde(rename = "type")]
    pub kind: TransactionType,

    /// Always positive; the sign comes from `kind`
    pub amount: f64,
}

impl Transaction {
    /// Amount with the sign of its direction (+income, −expense).
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: f64,
}

impl NewTransaction {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        kind: TransactionType,
        amount: f64,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            kind,
            amount,
        }
    }

    pub fn income(date: NaiveDate, description: impl Into<String>, amount: f64) -> Self {
        Self::new(date, description, TransactionType::Income, amount)
    }

    pub fn expense(date: NaiveDate, description: impl Into<String>, amount: f64) -> Self {
        Self::new(date, description, TransactionType::Expense, amount)
    }
}

fn validate_transaction(description: &str, amount: f64) -> Result<(), CoreError> {
    if description.trim().is_empty() {
        return Err(CoreError::ValidationError(
            "Transaction description must not be empty".into(),
        ));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Transaction amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

impl Entity for Transaction {
    const COLLECTION: FarmCollection = FarmCollection::Transactions;
    const DATE_FIELDS: &'static [&'static str] = &["date"];

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_transaction(&self.description, self.amount)
    }
}

impl Draft for NewTransaction {
    type Target = Transaction;

    fn validate(&self) -> Result<(), CoreError> {
        validate_transaction(&self.description, self.amount)
    }
}
