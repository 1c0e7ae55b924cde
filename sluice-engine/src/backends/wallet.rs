//! Receiver that counts what it is sent.

use parking_lot::Mutex;

use sluice_core::traits::AssetReceiver;
use sluice_core::types::Amount;

/// Accumulates forwarded withdrawals.
#[derive(Debug, Default)]
pub struct Wallet {
    inner: Mutex<WalletState>,
}

#[derive(Debug, Default)]
struct WalletState {
    balance: Amount,
    receipts: usize,
}

impl Wallet {
    /// Creates an empty wallet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total received so far.
    #[must_use]
    pub fn balance(&self) -> Amount {
        self.inner.lock().balance
    }

    /// Number of `receive` calls.
    #[must_use]
    pub fn receipts(&self) -> usize {
        self.inner.lock().receipts
    }
}

impl AssetReceiver for Wallet {
    fn receive(&self, amount: Amount) {
        let mut inner = self.inner.lock();
        inner.balance = inner.balance.checked_add(amount).unwrap_or(Amount::MAX);
        inner.receipts += 1;
    }
}
