//! Journaled fund movement.
//!
//! A [`FundMover`] performs the backend calls of one manager operation,
//! tracking the manager's idle balance on a private copy and recording each
//! completed call. [`FundMover::commit`] hands back the new idle balance;
//! [`FundMover::rollback`] replays the journal in reverse with the opposite
//! call so backend balances return to where they started.

use tracing::{debug, error, warn};

use sluice_core::types::{Amount, BackendId};

use crate::error::ManagerError;
use crate::registry::BackendRegistry;

/// A completed backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// `amount` was deposited into `backend`.
    Deposited {
        /// Backend that accepted the deposit.
        backend: BackendId,
        /// Amount deposited.
        amount: Amount,
    },
    /// `actual` was withdrawn from `backend`.
    Withdrew {
        /// Backend that released funds.
        backend: BackendId,
        /// Amount released.
        actual: Amount,
    },
}

/// Executes deposits and withdrawals for a single operation.
#[derive(Debug)]
pub struct FundMover<'a> {
    registry: &'a BackendRegistry,
    idle: Amount,
    journal: Vec<JournalEntry>,
}

impl<'a> FundMover<'a> {
    /// Starts an operation with the manager's current idle balance.
    #[must_use]
    pub fn new(registry: &'a BackendRegistry, idle: Amount) -> Self {
        Self {
            registry,
            idle,
            journal: Vec::new(),
        }
    }

    /// Idle balance as of the last completed step.
    #[must_use]
    pub fn idle(&self) -> Amount {
        self.idle
    }

    /// Completed calls so far.
    #[must_use]
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Adds funds handed to the manager by the caller.
    pub fn credit_idle(&mut self, amount: Amount) -> Result<(), ManagerError> {
        self.idle = self
            .idle
            .checked_add(amount)
            .ok_or(ManagerError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Takes funds out of the idle balance, e.g. to forward to a receiver.
    pub fn debit_idle(&mut self, amount: Amount) -> Result<(), ManagerError> {
        self.idle = self
            .idle
            .checked_sub(amount)
            .ok_or(ManagerError::InsufficientIdle {
                required: amount,
                available: self.idle,
            })?;
        Ok(())
    }

    /// Deposits `amount` from the idle balance into `id`.
    ///
    /// Returns the shares reported by the backend.
    pub fn deposit(&mut self, id: &BackendId, amount: Amount) -> Result<Amount, ManagerError> {
        let backend = self
            .registry
            .get(id)
            .ok_or_else(|| ManagerError::BackendNotFound(id.clone()))?;
        let remaining = self
            .idle
            .checked_sub(amount)
            .ok_or(ManagerError::InsufficientIdle {
                required: amount,
                available: self.idle,
            })?;

        let shares = backend
            .deposit(amount)
            .map_err(|source| ManagerError::BackendCallFailed {
                backend: id.clone(),
                source,
            })?;

        self.idle = remaining;
        self.journal.push(JournalEntry::Deposited {
            backend: id.clone(),
            amount,
        });
        debug!(backend = %id, amount = %amount, shares = %shares, "Deposited");
        Ok(shares)
    }

    /// Withdraws up to `amount` from `id` into the idle balance.
    ///
    /// Returns the amount actually released.
    pub fn withdraw(&mut self, id: &BackendId, amount: Amount) -> Result<Amount, ManagerError> {
        let backend = self
            .registry
            .get(id)
            .ok_or_else(|| ManagerError::BackendNotFound(id.clone()))?;

        let actual = backend
            .withdraw(amount)
            .map_err(|source| ManagerError::BackendCallFailed {
                backend: id.clone(),
                source,
            })?;

        self.journal.push(JournalEntry::Withdrew {
            backend: id.clone(),
            actual,
        });
        self.idle = self
            .idle
            .checked_add(actual)
            .ok_or(ManagerError::ArithmeticOverflow)?;

        if actual < amount {
            warn!(backend = %id, requested = %amount, actual = %actual, "Short withdrawal");
        } else {
            debug!(backend = %id, amount = %actual, "Withdrew");
        }
        Ok(actual)
    }

    /// Finishes the operation, returning the new idle balance.
    #[must_use]
    pub fn commit(self) -> Amount {
        self.idle
    }

    /// Undoes every completed call, newest first.
    ///
    /// A compensating call that fails is logged and skipped; the remaining
    /// entries are still replayed.
    pub fn rollback(self) {
        if self.journal.is_empty() {
            return;
        }
        warn!(steps = self.journal.len(), "Rolling back fund movements");

        for entry in self.journal.into_iter().rev() {
            match entry {
                JournalEntry::Deposited { backend, amount } => {
                    let Some(handle) = self.registry.get(&backend) else {
                        error!(backend = %backend, "Cannot compensate deposit: backend missing");
                        continue;
                    };
                    match handle.withdraw(amount) {
                        Ok(actual) if actual == amount => {}
                        Ok(actual) => {
                            error!(backend = %backend, expected = %amount, actual = %actual,
                                "Partial compensation of deposit");
                        }
                        Err(e) => {
                            error!(backend = %backend, amount = %amount, error = %e,
                                "Failed to compensate deposit");
                        }
                    }
                }
                JournalEntry::Withdrew { backend, actual } => {
                    if actual.is_zero() {
                        continue;
                    }
                    let Some(handle) = self.registry.get(&backend) else {
                        error!(backend = %backend, "Cannot compensate withdrawal: backend missing");
                        continue;
                    };
                    if let Err(e) = handle.deposit(actual) {
                        error!(backend = %backend, amount = %actual, error = %e,
                            "Failed to compensate withdrawal");
                    }
                }
            }
        }
    }
}
