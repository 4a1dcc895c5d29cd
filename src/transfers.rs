use std::collections::HashMap;

use crate::classifier::ACCOUNT_MOVE;
use crate::models::{Bank, Transaction, TxnType};

/// Amount difference (won) still treated as the same transfer between banks.
pub const DEFAULT_TOLERANCE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// Memo carries the account-to-account marker.
    Marker,
    /// Paired with a same-day secondary-account withdrawal at this index.
    Paired { counterpart: usize },
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
    pub flagged: usize,
    /// Ledger index and reason for every flagged record.
    pub matches: Vec<(usize, Reason)>,
}

fn is_secondary_withdrawal(t: &Transaction) -> bool {
    t.bank == Bank::SecondaryAccountClosed && t.txn_type == TxnType::Expense && !t.is_safe_box
}

fn is_primary_deposit(t: &Transaction) -> bool {
    t.bank == Bank::PrimaryAccount && t.txn_type == TxnType::Income && !t.is_safe_box
}

/// Pick the withdrawal that mirrors `txn`: nearest amount within tolerance,
/// earliest ledger position on ties.
fn counterpart(
    txn: &Transaction,
    candidates: &[usize],
    transactions: &[Transaction],
    tolerance: i64,
) -> Option<usize> {
    candidates
        .iter()
        .copied()
        .map(|i| (i, (transactions[i].amount - txn.amount).abs()))
        .filter(|(_, diff)| *diff < tolerance)
        .min_by_key(|(i, diff)| (*diff, *i))
        .map(|(i, _)| i)
}

/// Flag records that only move money between the organization's own
/// accounts. Safe-box records are never flagged. Must run on the
/// date-ordered ledger; balances are left untouched.
pub fn flag_internal_transfers(transactions: &mut [Transaction], tolerance: i64) -> DetectResult {
    let mut withdrawals_by_date: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, t) in transactions.iter().enumerate() {
        if is_secondary_withdrawal(t) {
            withdrawals_by_date.entry(t.date.clone()).or_default().push(i);
        }
    }

    let mut decisions = Vec::with_capacity(transactions.len());
    for (i, t) in transactions.iter().enumerate() {
        let reason = if t.is_safe_box {
            None
        } else if t.description.contains(ACCOUNT_MOVE) {
            Some(Reason::Marker)
        } else if is_primary_deposit(t) {
            withdrawals_by_date
                .get(&t.date)
                .and_then(|c| counterpart(t, c, transactions, tolerance))
                .map(|counterpart| Reason::Paired { counterpart })
        } else {
            None
        };
        decisions.push((i, reason));
    }

    let mut result = DetectResult::default();
    for (i, reason) in decisions {
        let t = &mut transactions[i];
        t.is_internal_transfer = reason.is_some();
        if let Some(reason) = reason {
            if let Reason::Paired { counterpart } = &reason {
                tracing::debug!(
                    date = %t.date,
                    amount = t.amount,
                    counterpart = *counterpart,
                    "paired deposit with secondary-account withdrawal"
                );
            }
            result.flagged += 1;
            result.matches.push((i, reason));
        }
    }
    result
}
