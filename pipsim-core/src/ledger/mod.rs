//! Account ledger: position accounting, change application, reconciliation,
//! and the snapshot stream.

pub mod accounting;
pub mod changes;
pub mod snapshot;

pub use accounting::{LedgerError, ReconcileOutcome};
pub use changes::{AccountChangeSet, ExternalAccountState, TradeClosed, TradeOpened};
pub use snapshot::AccountSnapshot;
