//! In-memory yield backend.

use parking_lot::Mutex;
use tracing::trace;

use sluice_core::error::BackendError;
use sluice_core::math::{BPS_DENOMINATOR, mul_div_floor};
use sluice_core::traits::YieldBackend;
use sluice_core::types::{Amount, AssetId, BasisPoints};

const DAYS_PER_YEAR: u128 = 365;

/// Yield backend that keeps its balance in memory.
///
/// Shares are minted one-to-one with deposits. Withdrawals release at most
/// the current balance. Deposits and withdrawals can be switched to fail to
/// exercise the manager's rollback path.
#[derive(Debug)]
pub struct SimulatedBackend {
    name: String,
    asset: AssetId,
    state: Mutex<SimState>,
}

#[derive(Debug, Default)]
struct SimState {
    balance: Amount,
    apy: BasisPoints,
    fail_deposits: bool,
    fail_withdrawals: bool,
    deposit_calls: usize,
    withdraw_calls: usize,
}

impl SimulatedBackend {
    /// Creates an empty backend for `asset` yielding `apy`.
    #[must_use]
    pub fn new(name: impl Into<String>, asset: AssetId, apy: BasisPoints) -> Self {
        Self {
            name: name.into(),
            asset,
            state: Mutex::new(SimState {
                apy,
                ..SimState::default()
            }),
        }
    }

    /// Seeds the balance.
    #[must_use]
    pub fn with_balance(self, balance: Amount) -> Self {
        self.state.lock().balance = balance;
        self
    }

    /// Changes the reported yield.
    pub fn set_apy(&self, apy: BasisPoints) {
        self.state.lock().apy = apy;
    }

    /// Makes every following deposit fail, or succeed again.
    pub fn set_fail_deposits(&self, fail: bool) {
        self.state.lock().fail_deposits = fail;
    }

    /// Makes every following withdrawal fail, or succeed again.
    pub fn set_fail_withdrawals(&self, fail: bool) {
        self.state.lock().fail_withdrawals = fail;
    }

    /// Credits `days` of simple interest at the current yield.
    ///
    /// Returns the interest credited.
    pub fn accrue(&self, days: u32) -> Amount {
        let mut state = self.state.lock();
        let interest = mul_div_floor(
            state.balance.as_u128(),
            u128::from(state.apy.as_u32()) * u128::from(days),
            BPS_DENOMINATOR * DAYS_PER_YEAR,
        )
        .map_or(Amount::ZERO, Amount::new);
        state.balance = state.balance.checked_add(interest).unwrap_or(Amount::MAX);
        interest
    }

    /// Number of deposit calls received, failed ones included.
    #[must_use]
    pub fn deposit_calls(&self) -> usize {
        self.state.lock().deposit_calls
    }

    /// Number of withdraw calls received, failed ones included.
    #[must_use]
    pub fn withdraw_calls(&self) -> usize {
        self.state.lock().withdraw_calls
    }
}

impl YieldBackend for SimulatedBackend {
    fn deposit(&self, amount: Amount) -> Result<Amount, BackendError> {
        let mut state = self.state.lock();
        state.deposit_calls += 1;
        if state.fail_deposits {
            return Err(BackendError::deposit_failed(amount, "deposits disabled"));
        }
        state.balance = state
            .balance
            .checked_add(amount)
            .ok_or_else(|| BackendError::deposit_failed(amount, "balance overflow"))?;
        trace!(backend = %self.name, amount = %amount, balance = %state.balance, "Simulated deposit");
        Ok(amount)
    }

    fn withdraw(&self, amount: Amount) -> Result<Amount, BackendError> {
        let mut state = self.state.lock();
        state.withdraw_calls += 1;
        if state.fail_withdrawals {
            return Err(BackendError::withdraw_failed(amount, "withdrawals disabled"));
        }
        let actual = amount.min(state.balance);
        state.balance = state.balance.saturating_sub(actual);
        trace!(backend = %self.name, requested = %amount, actual = %actual, "Simulated withdrawal");
        Ok(actual)
    }

    fn total_assets(&self) -> Amount {
        self.state.lock().balance
    }

    fn apy(&self) -> BasisPoints {
        self.state.lock().apy
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn asset(&self) -> AssetId {
        self.asset.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SimulatedBackend {
        SimulatedBackend::new("sim", AssetId::new("USDC").unwrap(), BasisPoints::new(1_000))
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let sim = backend();
        assert_eq!(sim.deposit(Amount::new(100)).unwrap(), Amount::new(100));
        assert_eq!(sim.withdraw(Amount::new(30)).unwrap(), Amount::new(30));
        assert_eq!(sim.total_assets(), Amount::new(70));
    }

    #[test]
    fn test_withdraw_capped_at_balance() {
        let sim = backend().with_balance(Amount::new(50));
        assert_eq!(sim.withdraw(Amount::new(80)).unwrap(), Amount::new(50));
        assert_eq!(sim.total_assets(), Amount::ZERO);
    }

    #[test]
    fn test_failure_toggles() {
        let sim = backend().with_balance(Amount::new(50));
        sim.set_fail_deposits(true);
        assert!(matches!(
            sim.deposit(Amount::new(1)),
            Err(BackendError::DepositFailed { .. })
        ));
        sim.set_fail_withdrawals(true);
        assert!(sim.withdraw(Amount::new(1)).is_err());
        assert_eq!(sim.total_assets(), Amount::new(50));
        assert_eq!(sim.deposit_calls(), 1);
        assert_eq!(sim.withdraw_calls(), 1);

        sim.set_fail_deposits(false);
        assert!(sim.deposit(Amount::new(1)).is_ok());
    }

    #[test]
    fn test_accrue_simple_interest() {
        let sim = backend().with_balance(Amount::new(3_650_000));
        // 10% over 1 day of 365
        assert_eq!(sim.accrue(1), Amount::new(1_000));
        assert_eq!(sim.total_assets(), Amount::new(3_651_000));
    }

    #[test]
    fn test_set_apy() {
        let sim = backend();
        sim.set_apy(BasisPoints::new(42));
        assert_eq!(sim.apy(), BasisPoints::new(42));
        assert_eq!(sim.name(), "sim");
    }
}
