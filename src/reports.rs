use std::collections::BTreeMap;

use crate::ledger::closing_balances;
use crate::models::{
    Category, CategoryStats, DetailedCategory, MemberStats, MonthlyStats, PaymentEntry, Summary,
    Transaction, TxnType,
};

fn counts_toward_totals(t: &Transaction) -> bool {
    !t.is_safe_box && !t.is_internal_transfer
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Income/expense totals exclude internal transfers and the safe box; the
/// balances come straight from the ledger walk, so they include both.
pub fn summarize(transactions: &[Transaction]) -> Summary {
    let mut summary = Summary {
        total_transactions: transactions.len(),
        ..Summary::default()
    };

    for t in transactions {
        if t.is_internal_transfer {
            summary.internal_transfers += 1;
        }
        if !counts_toward_totals(t) {
            continue;
        }
        match t.txn_type {
            TxnType::Income => {
                summary.total_income += t.amount;
                if t.category == Category::Interest {
                    summary.total_interest += t.amount;
                }
            }
            TxnType::Expense => summary.total_expense += t.amount,
            TxnType::Transfer => {}
        }
    }

    let balances = closing_balances(transactions);
    summary.main_balance = balances.main;
    summary.safebox_balance = balances.safe_box;
    summary.total_balance = balances.main + balances.safe_box;
    summary
}

// ---------------------------------------------------------------------------
// Member contributions
// ---------------------------------------------------------------------------

pub fn member_contributions(transactions: &[Transaction]) -> BTreeMap<String, MemberStats> {
    let mut members: BTreeMap<String, MemberStats> = BTreeMap::new();

    for t in transactions {
        if t.txn_type != TxnType::Income || !counts_toward_totals(t) {
            continue;
        }
        let Some(member) = &t.member_name else {
            continue;
        };
        let stats = members.entry(member.clone()).or_default();
        stats.total_paid += t.amount;
        stats.payment_count += 1;
        stats.payments.push(PaymentEntry::from(t));
        if stats.last_payment_date.as_deref().map_or(true, |last| t.date.as_str() > last) {
            stats.last_payment_date = Some(t.date.clone());
        }
    }

    for stats in members.values_mut() {
        if stats.payment_count > 0 {
            stats.average_amount = stats.total_paid as f64 / stats.payment_count as f64;
        }
    }
    members
}

/// Members ordered by total paid, largest first; name breaks ties.
pub fn top_members(members: &BTreeMap<String, MemberStats>, n: usize) -> Vec<(&str, &MemberStats)> {
    let mut ranked: Vec<(&str, &MemberStats)> =
        members.iter().map(|(name, s)| (name.as_str(), s)).collect();
    ranked.sort_by(|a, b| b.1.total_paid.cmp(&a.1.total_paid).then(a.0.cmp(b.0)));
    ranked.truncate(n);
    ranked
}

// ---------------------------------------------------------------------------
// Expense breakdown
// ---------------------------------------------------------------------------

pub fn expense_by_category(transactions: &[Transaction]) -> BTreeMap<String, CategoryStats> {
    let mut categories: BTreeMap<String, CategoryStats> = BTreeMap::new();

    for t in transactions {
        if t.txn_type != TxnType::Expense || t.is_safe_box {
            continue;
        }
        let label = t
            .detailed_category
            .as_ref()
            .unwrap_or(&DetailedCategory::OtherExpense)
            .to_string();
        let stats = categories.entry(label).or_default();
        stats.total += t.amount;
        stats.count += 1;
        stats.transactions.push(PaymentEntry::from(t));
    }
    categories
}

/// Categories ordered by total, largest first.
pub fn top_categories(
    categories: &BTreeMap<String, CategoryStats>,
    n: usize,
) -> Vec<(&str, &CategoryStats)> {
    let mut ranked: Vec<(&str, &CategoryStats)> =
        categories.iter().map(|(name, s)| (name.as_str(), s)).collect();
    ranked.sort_by(|a, b| b.1.total.cmp(&a.1.total).then(a.0.cmp(b.0)));
    ranked.truncate(n);
    ranked
}

// ---------------------------------------------------------------------------
// Monthly trends
// ---------------------------------------------------------------------------

pub fn monthly_trends(transactions: &[Transaction]) -> BTreeMap<String, MonthlyStats> {
    let mut months: BTreeMap<String, MonthlyStats> = BTreeMap::new();

    for t in transactions {
        if t.is_safe_box {
            continue;
        }
        let month = months.entry(t.year_month().to_string()).or_default();
        if t.is_internal_transfer {
            month.internal_transfers += t.amount;
            continue;
        }
        match t.txn_type {
            TxnType::Income => {
                month.income += t.amount;
                if t.member_name.is_some() {
                    month.member_payments += t.amount;
                    month.member_payment_count += 1;
                }
            }
            TxnType::Expense => month.expense += t.amount,
            TxnType::Transfer => {}
        }
    }

    // BTreeMap iterates YYYY-MM keys in chronological order.
    let mut running = 0;
    for month in months.values_mut() {
        running += month.income - month.expense;
        month.balance = running;
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::build_ledger;
    use crate::models::Bank;

    struct T {
        date: &'static str,
        txn_type: TxnType,
        amount: i64,
        member: Option<&'static str>,
        safe: bool,
        internal: bool,
    }

    fn t(date: &'static str, txn_type: TxnType, amount: i64) -> T {
        T { date, txn_type, amount, member: None, safe: false, internal: false }
    }

    impl T {
        fn member(mut self, name: &'static str) -> Self {
            self.member = Some(name);
            self
        }
        fn safe(mut self) -> Self {
            self.safe = true;
            self
        }
        fn internal(mut self) -> Self {
            self.internal = true;
            self
        }
        fn build(self) -> Transaction {
            Transaction {
                date: self.date.into(),
                amount: self.amount,
                description: String::new(),
                depositor_name: String::new(),
                bank: Bank::PrimaryAccount,
                is_safe_box: self.safe,
                txn_type: self.txn_type,
                category: if self.safe { Category::SafeBox } else { Category::Other },
                detailed_category: None,
                member_name: self.member.map(str::to_string),
                is_internal_transfer: self.internal,
                balance_after: 0,
            }
        }
    }

    fn ledger(rows: Vec<T>) -> Vec<Transaction> {
        let mut txns: Vec<Transaction> = rows.into_iter().map(T::build).collect();
        build_ledger(&mut txns);
        txns
    }

    #[test]
    fn test_empty_input() {
        let summary = summarize(&[]);
        assert_eq!(summary, Summary::default());
        assert!(member_contributions(&[]).is_empty());
        assert!(expense_by_category(&[]).is_empty());
        assert!(monthly_trends(&[]).is_empty());
    }

    #[test]
    fn test_summary_excludes_internal_but_balance_includes() {
        let txns = ledger(vec![
            t("2025-01-01", TxnType::Income, 10000),
            t("2025-01-02", TxnType::Income, 50000).internal(),
            t("2025-01-03", TxnType::Expense, 2000),
            t("2025-01-04", TxnType::Income, 7000).safe(),
        ]);
        let s = summarize(&txns);
        assert_eq!(s.total_income, 10000);
        assert_eq!(s.total_expense, 2000);
        assert_eq!(s.main_balance, 58000);
        assert_eq!(s.safebox_balance, 7000);
        assert_eq!(s.total_balance, 65000);
        assert_eq!(s.total_transactions, 4);
        assert_eq!(s.internal_transfers, 1);
    }

    #[test]
    fn test_interest_total() {
        let mut txns = ledger(vec![
            t("2025-01-01", TxnType::Income, 120),
            t("2025-01-02", TxnType::Income, 5000),
        ]);
        txns[0].category = Category::Interest;
        assert_eq!(summarize(&txns).total_interest, 120);
    }

    #[test]
    fn test_member_contributions() {
        let txns = ledger(vec![
            t("2025-02-10", TxnType::Income, 30000).member("김민주"),
            t("2025-01-10", TxnType::Income, 10000).member("김민주"),
            t("2025-01-11", TxnType::Income, 99999).member("김민주").internal(),
            t("2025-01-12", TxnType::Income, 5000).member("김민주").safe(),
            t("2025-01-13", TxnType::Expense, 5000).member("김민주"),
            t("2025-01-14", TxnType::Income, 20000).member("이동혁"),
        ]);
        let members = member_contributions(&txns);
        let kim = &members["김민주"];
        assert_eq!(kim.total_paid, 40000);
        assert_eq!(kim.payment_count, 2);
        assert_eq!(kim.last_payment_date.as_deref(), Some("2025-02-10"));
        assert_eq!(kim.average_amount, 20000.0);
        assert_eq!(kim.payments[0].date, "2025-01-10");

        let top = top_members(&members, 1);
        assert_eq!(top[0].0, "김민주");
    }

    #[test]
    fn test_expense_by_detailed_category() {
        let mut txns = ledger(vec![
            t("2025-01-01", TxnType::Expense, 1000),
            t("2025-01-02", TxnType::Expense, 3000),
            t("2025-01-03", TxnType::Expense, 500).safe(),
            t("2025-01-04", TxnType::Income, 700),
        ]);
        txns[0].detailed_category = Some(DetailedCategory::Fee);
        txns[1].detailed_category = Some(DetailedCategory::MemberRemittance("박진복".into()));
        let cats = expense_by_category(&txns);
        assert_eq!(cats.len(), 2);
        assert_eq!(cats["fee"].total, 1000);
        assert_eq!(cats["member_remittance(박진복)"].count, 1);
        assert_eq!(top_categories(&cats, 5)[0].0, "member_remittance(박진복)");
    }

    #[test]
    fn test_monthly_trends() {
        let txns = ledger(vec![
            t("2025-01-05", TxnType::Income, 10000).member("김민주"),
            t("2025-01-06", TxnType::Expense, 4000),
            t("2025-01-07", TxnType::Income, 50000).internal(),
            t("2025-02-01", TxnType::Expense, 1000),
            t("2025-02-02", TxnType::Income, 9000).safe(),
        ]);
        let months = monthly_trends(&txns);
        let keys: Vec<&str> = months.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["2025-01", "2025-02"]);
        let jan = &months["2025-01"];
        assert_eq!(jan.income, 10000);
        assert_eq!(jan.expense, 4000);
        assert_eq!(jan.internal_transfers, 50000);
        assert_eq!(jan.member_payments, 10000);
        assert_eq!(jan.member_payment_count, 1);
        assert_eq!(jan.balance, 6000);
        assert_eq!(months["2025-02"].balance, 5000);
    }
}
