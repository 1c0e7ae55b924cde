//! Receiver of forwarded withdrawals.

use crate::types::Amount;

/// Destination that accepts assets forwarded by the manager.
///
/// Forwarding is the last step of a withdrawal and happens only after every
/// backend call has succeeded, so receivers cannot fail.
pub trait AssetReceiver: Send + Sync {
    /// Credits `amount` to the receiver.
    fn receive(&self, amount: Amount);
}
