//! Typed broker-gateway interface, consumed in live operation.
//!
//! The core never sees the wire format; it depends only on these typed
//! operations. Every call can fail with a [`RequestError`] carrying a
//! human-readable cause, which the caller's tick loop logs and retries on
//! the next tick.

use crate::domain::{
    Account, AccountId, CurrencyPair, ExpiryPolicy, OrderId, OrderKind, Pippettes, Trade,
    TransactionId, Units,
};
use crate::ledger::{AccountChangeSet, ExternalAccountState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("gateway request failed: {cause}")]
pub struct RequestError {
    pub cause: String,
}

impl RequestError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRequest {
    pub pairs: Vec<CurrencyPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingResponse {
    pub prices: HashMap<CurrencyPair, Pippettes>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub account: AccountId,
    pub pair: CurrencyPair,
    pub units: Units,
    pub kind: OrderKind,
    pub expiry: ExpiryPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseTradeRequest {
    pub account: AccountId,
    pub trade_id: crate::domain::TradeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseTradeResponse {
    pub trade: Trade,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTradesRequest {
    pub account: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTradesResponse {
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountChangesRequest {
    pub account: AccountId,
    pub since: TransactionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountChangesResponse {
    pub changes: AccountChangeSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAccountRequest {
    pub account: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAccountResponse {
    pub balance: Pippettes,
    pub state: ExternalAccountState,
}

/// The broker gateway. Implementations live outside the core and own all
/// marshalling; a live tick loop pulls changes and state through this trait
/// and feeds them to the ledger.
pub trait BrokerGateway: Send + Sync {
    fn get_pricing(&self, request: PricingRequest) -> Result<PricingResponse, RequestError>;
    fn create_order(&self, request: CreateOrderRequest) -> Result<CreateOrderResponse, RequestError>;
    fn close_trade(&self, request: CloseTradeRequest) -> Result<CloseTradeResponse, RequestError>;
    fn list_trades(&self, request: ListTradesRequest) -> Result<ListTradesResponse, RequestError>;
    fn account_changes(
        &self,
        request: AccountChangesRequest,
    ) -> Result<AccountChangesResponse, RequestError>;
    fn get_account(&self, request: GetAccountRequest) -> Result<GetAccountResponse, RequestError>;
}

/// Pull and apply everything an account needs for one live tick: changes
/// since the last known transaction, then reconciliation against the
/// reported state. A `RequestError` leaves the account untouched for this
/// tick.
pub fn refresh_account(
    gateway: &dyn BrokerGateway,
    account: &mut Account,
) -> Result<(), RequestError> {
    let changes = gateway.account_changes(AccountChangesRequest {
        account: account.id.clone(),
        since: account.last_transaction_id,
    })?;
    account
        .process_changes(&changes.changes)
        .map_err(|err| RequestError::new(format!("applying account changes: {err}")))?;

    let state = gateway.get_account(GetAccountRequest { account: account.id.clone() })?;
    account.reconcile(&state.state);
    Ok(())
}
