use crate::models::{Transaction, TxnType};

/// Closing balances of the two sub-ledgers after a ledger walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balances {
    pub main: i64,
    pub safe_box: i64,
}

impl Balances {
    fn slot(&mut self, is_safe_box: bool) -> &mut i64 {
        if is_safe_box {
            &mut self.safe_box
        } else {
            &mut self.main
        }
    }
}

fn delta(txn: &Transaction) -> i64 {
    match txn.txn_type {
        TxnType::Income => txn.amount,
        TxnType::Expense => -txn.amount,
        TxnType::Transfer => 0,
    }
}

/// Sort by date (stable, so same-day records keep source order) and stamp
/// each record with its sub-ledger's running balance.
pub fn build_ledger(transactions: &mut [Transaction]) -> Balances {
    transactions.sort_by(|a, b| a.date.cmp(&b.date));

    let mut balances = Balances::default();
    for txn in transactions.iter_mut() {
        let slot = balances.slot(txn.is_safe_box);
        *slot += delta(txn);
        txn.balance_after = *slot;
    }
    tracing::debug!(
        main = balances.main,
        safe_box = balances.safe_box,
        "ledger walk complete"
    );
    balances
}

pub struct Discrepancy {
    pub index: usize,
    pub stamped: i64,
    pub expected: i64,
}

/// Replay an ordered ledger and return the first record whose stamped
/// balance disagrees with the re-summed deltas.
pub fn verify(transactions: &[Transaction]) -> Option<Discrepancy> {
    let mut balances = Balances::default();
    for (index, txn) in transactions.iter().enumerate() {
        let slot = balances.slot(txn.is_safe_box);
        *slot += delta(txn);
        if *slot != txn.balance_after {
            return Some(Discrepancy {
                index,
                stamped: txn.balance_after,
                expected: *slot,
            });
        }
    }
    None
}

/// Last stamped balance of each sub-ledger, 0 for an empty one.
pub fn closing_balances(transactions: &[Transaction]) -> Balances {
    let last = |safe: bool| {
        transactions
            .iter()
            .rev()
            .find(|t| t.is_safe_box == safe)
            .map_or(0, |t| t.balance_after)
    };
    Balances {
        main: last(false),
        safe_box: last(true),
    }
}
