//! Write batches: the unit of atomicity.
//!
//! Every settlement operation describes its effect as one [`WriteBatch`].
//! The store checks the whole batch before applying any of it, and the
//! write-ahead log records whole batches, so a batch is either fully
//! visible or not at all.

use chrono::{DateTime, Utc};
use kernex_types::{
    AccountId, Currency, Fill, LedgerTransaction, Order, OrderId, OrderStatus, TransactionId,
    TransactionStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger_store::NetDeltas;

/// One primitive state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    OpenAccount {
        account: AccountId,
    },
    Adjust {
        account: AccountId,
        currency: Currency,
        delta: Decimal,
    },
    InsertOrder {
        order: Order,
    },
    RecordFill {
        fill: Fill,
        reserve_taken: Decimal,
    },
    ReleaseReserve {
        order_id: OrderId,
        amount: Decimal,
    },
    SetOrderStatus {
        order_id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    },
    AppendTransaction {
        tx: LedgerTransaction,
    },
    ResolveTransaction {
        id: TransactionId,
        status: TransactionStatus,
        external_ref: Option<String>,
    },
}

/// Ordered list of mutations applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    pub fn open_account(&mut self, account: AccountId) -> &mut Self {
        self.push(Mutation::OpenAccount { account })
    }

    pub fn adjust(&mut self, account: AccountId, currency: Currency, delta: Decimal) -> &mut Self {
        self.push(Mutation::Adjust {
            account,
            currency,
            delta,
        })
    }

    pub fn insert_order(&mut self, order: Order) -> &mut Self {
        self.push(Mutation::InsertOrder { order })
    }

    pub fn record_fill(&mut self, fill: Fill, reserve_taken: Decimal) -> &mut Self {
        self.push(Mutation::RecordFill {
            fill,
            reserve_taken,
        })
    }

    pub fn release_reserve(&mut self, order_id: OrderId, amount: Decimal) -> &mut Self {
        self.push(Mutation::ReleaseReserve { order_id, amount })
    }

    pub fn set_order_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> &mut Self {
        self.push(Mutation::SetOrderStatus {
            order_id,
            status,
            at,
        })
    }

    pub fn append_transaction(&mut self, tx: LedgerTransaction) -> &mut Self {
        self.push(Mutation::AppendTransaction { tx })
    }

    pub fn resolve_transaction(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
        external_ref: Option<String>,
    ) -> &mut Self {
        self.push(Mutation::ResolveTransaction {
            id,
            status,
            external_ref,
        })
    }

    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Net balance change per (account, currency) across the batch.
    #[must_use]
    pub fn net_deltas(&self) -> NetDeltas {
        let mut deltas = NetDeltas::new();
        for m in &self.mutations {
            if let Mutation::Adjust {
                account,
                currency,
                delta,
            } = m
            {
                *deltas.entry((*account, *currency)).or_insert(Decimal::ZERO) += *delta;
            }
        }
        deltas
    }

    /// Accounts opened by this batch.
    #[must_use]
    pub fn opened_accounts(&self) -> Vec<AccountId> {
        self.mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::OpenAccount { account } => Some(*account),
                _ => None,
            })
            .collect()
    }
}
