use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::classifier::{categorize, classify_type, detailed_category};
use crate::error::{DuesError, Result};
use crate::importer::{load_source, SourceSpec};
use crate::ledger::{build_ledger, verify};
use crate::members::Roster;
use crate::models::{
    AccountInfo, Accounts, Bank, BaseDocument, EnhancedDocument, RawRow, Transaction, TxnType,
};
use crate::normalize::{normalize_amount, normalize_date};
use crate::reports;
use crate::settings::{AccountMeta, Settings};
use crate::transfers::flag_internal_transfers;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Rows from every source in command-line order, plus each file's digest.
pub struct Intake {
    pub rows: Vec<RawRow>,
    pub sources: BTreeMap<String, String>,
}

pub fn load_sources(specs: &[SourceSpec]) -> Result<Intake> {
    let mut intake = Intake {
        rows: Vec::new(),
        sources: BTreeMap::new(),
    };
    for spec in specs {
        for source in spec.resolve()? {
            let loaded = load_source(&source)?;
            intake.rows.extend(loaded.rows);
            intake.sources.insert(loaded.name, loaded.checksum);
        }
    }
    Ok(intake)
}

// ---------------------------------------------------------------------------
// Base stage
// ---------------------------------------------------------------------------

/// One typed record per usable row. Rows without a date or with a zero
/// amount are dropped here and never reach the ledger.
pub fn normalize_rows(rows: Vec<RawRow>, roster: &Roster) -> Vec<Transaction> {
    let mut skipped = 0usize;
    let mut transactions = Vec::with_capacity(rows.len());

    for raw in rows {
        let Some(date) = normalize_date(&raw.date) else {
            skipped += 1;
            continue;
        };
        let amount = normalize_amount(&raw.amount);
        if amount == 0 {
            skipped += 1;
            continue;
        }

        let description = raw.description.text();
        let depositor_name = raw.depositor_name.text();
        let txn_type = classify_type(&raw.kind.text(), &description);
        let category = categorize(txn_type, &description, raw.is_safe_box);
        let member_name = match txn_type {
            TxnType::Income => roster.extract(&description, &depositor_name),
            _ => None,
        };

        transactions.push(Transaction {
            date,
            amount: amount.abs(),
            description,
            depositor_name,
            bank: raw.bank.unwrap_or(Bank::PrimaryAccount),
            is_safe_box: raw.is_safe_box,
            txn_type,
            category,
            detailed_category: None,
            member_name,
            is_internal_transfer: false,
            balance_after: 0,
        });
    }

    if skipped > 0 {
        tracing::debug!(skipped, "dropped rows without a date or amount");
    }
    transactions
}

fn account_info(meta: &AccountMeta, balance: i64, is_closed: bool) -> AccountInfo {
    AccountInfo {
        account_number: meta.account_number.clone(),
        description: meta.description.clone(),
        balance,
        is_closed,
    }
}

/// Net movement of the secondary account's own records.
fn secondary_net(transactions: &[Transaction]) -> i64 {
    transactions
        .iter()
        .filter(|t| t.bank == Bank::SecondaryAccountClosed && !t.is_safe_box)
        .map(|t| match t.txn_type {
            TxnType::Income => t.amount,
            TxnType::Expense => -t.amount,
            TxnType::Transfer => 0,
        })
        .sum()
}

/// Normalize, order, reconcile and summarize. The result is the base
/// checkpoint document.
pub fn process(
    rows: Vec<RawRow>,
    settings: &Settings,
    sources: BTreeMap<String, String>,
) -> BaseDocument {
    let roster = settings.roster();
    let mut transactions = normalize_rows(rows, &roster);
    let balances = build_ledger(&mut transactions);
    let detected = flag_internal_transfers(&mut transactions, settings.transfer_tolerance);
    let summary = reports::summarize(&transactions);

    tracing::info!(
        transactions = transactions.len(),
        internal_transfers = detected.flagged,
        main_balance = balances.main,
        safebox_balance = balances.safe_box,
        "base stage complete"
    );

    let cfg = &settings.accounts;
    let accounts = Accounts {
        primary_account: account_info(&cfg.primary, balances.main, false),
        safe_box: account_info(&cfg.safe_box, balances.safe_box, false),
        secondary_account: account_info(&cfg.secondary, secondary_net(&transactions), true),
        sources,
    };

    BaseDocument {
        accounts,
        summary,
        transactions,
        last_updated: timestamp(),
    }
}

// ---------------------------------------------------------------------------
// Analysis stage
// ---------------------------------------------------------------------------

/// Attribute members with the current roster, refine categories and attach
/// the member, category and monthly views.
pub fn enhance(mut base: BaseDocument, roster: &Roster) -> EnhancedDocument {
    for t in base.transactions.iter_mut() {
        if t.txn_type == TxnType::Income {
            t.member_name = roster.extract(&t.description, &t.depositor_name);
        }
        t.detailed_category = detailed_category(t, roster);
    }

    let member_analysis = reports::member_contributions(&base.transactions);
    let expense_by_category = reports::expense_by_category(&base.transactions);
    let monthly_trends = reports::monthly_trends(&base.transactions);

    tracing::info!(
        members = member_analysis.len(),
        categories = expense_by_category.len(),
        months = monthly_trends.len(),
        "analysis stage complete"
    );

    EnhancedDocument {
        base,
        member_analysis,
        expense_by_category,
        monthly_trends,
        known_members: roster.names().to_vec(),
        enhanced_processing_date: timestamp(),
    }
}

// ---------------------------------------------------------------------------
// JSON documents
// ---------------------------------------------------------------------------

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, format!("{json}\n"))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

/// Load a base checkpoint. Stamped balances that no longer replay are
/// reported but not rewritten.
pub fn read_base(path: &Path) -> Result<BaseDocument> {
    let content = std::fs::read_to_string(path)?;
    let base: BaseDocument = serde_json::from_str(&content)?;
    if let Some(d) = verify(&base.transactions) {
        tracing::warn!(
            index = d.index,
            stamped = d.stamped,
            expected = d.expected,
            "{}: balance_after does not replay",
            path.display()
        );
    }
    Ok(base)
}

/// An analysed document. Base checkpoints are analysed in memory.
pub fn read_analysed(path: &Path, roster: &Roster) -> Result<EnhancedDocument> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    if !value.is_object() {
        return Err(DuesError::Other(format!(
            "{}: expected a JSON object",
            path.display()
        )));
    }
    if value.get("member_analysis").is_some() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(enhance(read_base(path)?, roster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, DetailedCategory, RawCell};

    fn row(date: &str, kind: &str, amount: &str, desc: &str) -> RawRow {
        RawRow {
            date: RawCell::from(date),
            kind: RawCell::from(kind),
            amount: RawCell::from(amount),
            description: RawCell::from(desc),
            bank: Some(Bank::PrimaryAccount),
            depositor_name: RawCell::Empty,
            is_safe_box: false,
        }
    }

    fn settings(members: &[&str]) -> Settings {
        Settings {
            known_members: members.iter().map(|m| m.to_string()).collect(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_cancelled_deposit_is_expense() {
        let doc = process(
            vec![row("2025-01-10", "입금취소", "-10,000", "정정")],
            &settings(&[]),
            BTreeMap::new(),
        );
        let t = &doc.transactions[0];
        assert_eq!(t.txn_type, TxnType::Expense);
        assert_eq!(t.amount, 10000);
        assert_eq!(t.balance_after, -10000);
    }

    #[test]
    fn test_member_attribution_through_both_stages() {
        let base = process(
            vec![row("2025.03.01 09:00:00", "입금", "30000", "간편이체(김민주)")],
            &settings(&["김민주"]),
            BTreeMap::new(),
        );
        assert_eq!(base.transactions[0].member_name.as_deref(), Some("김민주"));
        assert_eq!(base.transactions[0].date, "2025-03-01");

        let doc = enhance(base, &Roster::new(["김민주"]));
        let t = &doc.base.transactions[0];
        assert_eq!(
            t.detailed_category,
            Some(DetailedCategory::MemberDues("김민주".into()))
        );
        assert_eq!(doc.member_analysis["김민주"].total_paid, 30000);
        assert_eq!(doc.known_members, vec!["김민주".to_string()]);
    }

    #[test]
    fn test_cross_bank_pairing() {
        let mut withdrawal = row("2025-03-05", "출금", "50000", "오픈뱅킹");
        withdrawal.bank = Some(Bank::SecondaryAccountClosed);
        let deposit = row("2025-03-05", "입금", "50000", "입금");
        let doc = process(vec![deposit, withdrawal], &settings(&[]), BTreeMap::new());

        let deposit = doc
            .transactions
            .iter()
            .find(|t| t.bank == Bank::PrimaryAccount)
            .unwrap();
        assert!(deposit.is_internal_transfer);
        assert_eq!(doc.summary.internal_transfers, 1);
        assert_eq!(doc.summary.total_income, 0);
        assert_eq!(doc.summary.total_expense, 50000);
        assert_eq!(doc.accounts.secondary_account.balance, -50000);
        assert!(doc.accounts.secondary_account.is_closed);
    }

    #[test]
    fn test_empty_input() {
        let base = process(Vec::new(), &settings(&[]), BTreeMap::new());
        assert_eq!(base.summary.total_income, 0);
        assert_eq!(base.summary.total_balance, 0);
        let doc = enhance(base, &Roster::default());
        assert!(doc.member_analysis.is_empty());
        assert!(doc.expense_by_category.is_empty());
        assert!(doc.monthly_trends.is_empty());
    }

    #[test]
    fn test_dropped_rows() {
        let rows = vec![
            row("", "입금", "1000", "no date"),
            row("2025-01-01", "입금", "0", "zero"),
            row("2025-01-02", "입금", "abc", "junk amount"),
            row("2025-01-03", "출금", "2,500원", "수수료"),
        ];
        let txns = normalize_rows(rows, &Roster::default());
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].amount, 2500);
        assert_eq!(txns[0].category, Category::OtherExpense);
    }

    #[test]
    fn test_unrepresentable_amount_is_dropped() {
        let mut huge = row("2025-01-01", "출금", "", "overflow");
        huge.amount = RawCell::Float(-1e19);
        let mut serial_date = row("", "입금", "1000", "compact date");
        serial_date.date = RawCell::Serial(202503051200.0);
        let doc = process(vec![huge, serial_date], &settings(&[]), BTreeMap::new());
        assert_eq!(doc.transactions.len(), 1);
        assert_eq!(doc.transactions[0].date, "202503051200");
        assert_eq!(doc.summary.total_income, 1000);
    }

    #[test]
    fn test_safe_box_sub_ledger() {
        let mut safe = row("2025-01-02", "입금", "100000", "세이프박스");
        safe.is_safe_box = true;
        let doc = process(
            vec![row("2025-01-01", "입금", "20000", "회비"), safe],
            &settings(&[]),
            BTreeMap::new(),
        );
        assert_eq!(doc.summary.main_balance, 20000);
        assert_eq!(doc.summary.safebox_balance, 100000);
        assert_eq!(doc.summary.total_balance, 120000);
        assert_eq!(doc.summary.total_income, 20000);
        assert_eq!(doc.accounts.safe_box.balance, 100000);
        assert_eq!(doc.transactions[1].category, Category::SafeBox);
    }

    #[test]
    fn test_enhance_uses_current_roster() {
        let base = process(
            vec![row("2025-01-01", "입금", "10000", "이동혁")],
            &settings(&[]),
            BTreeMap::new(),
        );
        assert!(base.transactions[0].member_name.is_none());
        let doc = enhance(base, &Roster::new(["이동혁"]));
        assert_eq!(doc.base.transactions[0].member_name.as_deref(), Some("이동혁"));
        assert_eq!(doc.monthly_trends["2025-01"].member_payment_count, 1);
    }

    #[test]
    fn test_json_checkpoint_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("dashboard_data.json");
        let base = process(
            vec![row("2025-02-01", "입금", "5000", "간편이체(김민주)")],
            &settings(&["김민주"]),
            BTreeMap::new(),
        );
        write_json(&base, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("김민주"), "non-ASCII must not be escaped");

        assert_eq!(read_base(&path).unwrap(), base);
        let analysed = read_analysed(&path, &Roster::new(["김민주"])).unwrap();
        assert_eq!(analysed.member_analysis.len(), 1);
    }

    #[test]
    fn test_malformed_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(read_analysed(&path, &Roster::default()).is_err());
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(read_base(&path), Err(DuesError::Json(_))));
    }
}
