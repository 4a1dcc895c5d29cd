use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell as it comes out of a spreadsheet or CSV source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    /// Spreadsheet date serial (days since the 1899-12-30 epoch).
    Serial(f64),
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell, trimmed. Numbers print without a trailing `.0`.
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            Self::Float(f) | Self::Serial(f) => f.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

/// Intermediate representation from a source reader before normalization.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub date: RawCell,
    /// Explicit deposit/withdrawal indicator column, when the source has one.
    pub kind: RawCell,
    pub amount: RawCell,
    pub description: RawCell,
    pub bank: Option<Bank>,
    pub depositor_name: RawCell,
    pub is_safe_box: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bank {
    PrimaryAccount,
    SecondaryAccountClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnType {
    Income,
    Expense,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Interest,
    SafeBox,
    DuesPayment,
    TransferIncome,
    OtherIncome,
    AtmWithdrawal,
    GeneralTransfer,
    Remittance,
    OtherExpense,
    Other,
}

/// Refined label from the analysis stage. Member-attributed variants carry
/// the member's name and render as `dues_payment(<name>)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DetailedCategory {
    InterestIncome,
    MemberDues(String),
    DuesPayment,
    AccountMove,
    CardPoints,
    OtherIncome,
    MemberRemittance(String),
    GeneralTransfer,
    AtmWithdrawal,
    CardPayment,
    MobilePayment,
    Fee,
    OtherExpense,
}

impl fmt::Display for DetailedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InterestIncome => f.write_str("interest_income"),
            Self::MemberDues(name) => write!(f, "dues_payment({name})"),
            Self::DuesPayment => f.write_str("dues_payment"),
            Self::AccountMove => f.write_str("account_move"),
            Self::CardPoints => f.write_str("card_points"),
            Self::OtherIncome => f.write_str("other_income"),
            Self::MemberRemittance(name) => write!(f, "member_remittance({name})"),
            Self::GeneralTransfer => f.write_str("general_transfer"),
            Self::AtmWithdrawal => f.write_str("atm_withdrawal"),
            Self::CardPayment => f.write_str("card_payment"),
            Self::MobilePayment => f.write_str("mobile_payment"),
            Self::Fee => f.write_str("fee"),
            Self::OtherExpense => f.write_str("other_expense"),
        }
    }
}

impl DetailedCategory {
    pub fn parse(label: &str) -> Option<Self> {
        let member = |prefix: &str| {
            label
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('('))
                .and_then(|rest| rest.strip_suffix(')'))
                .map(str::to_string)
        };
        if let Some(name) = member("dues_payment") {
            return Some(Self::MemberDues(name));
        }
        if let Some(name) = member("member_remittance") {
            return Some(Self::MemberRemittance(name));
        }
        let plain = match label {
            "interest_income" => Self::InterestIncome,
            "dues_payment" => Self::DuesPayment,
            "account_move" => Self::AccountMove,
            "card_points" => Self::CardPoints,
            "other_income" => Self::OtherIncome,
            "general_transfer" => Self::GeneralTransfer,
            "atm_withdrawal" => Self::AtmWithdrawal,
            "card_payment" => Self::CardPayment,
            "mobile_payment" => Self::MobilePayment,
            "fee" => Self::Fee,
            "other_expense" => Self::OtherExpense,
            _ => return None,
        };
        Some(plain)
    }
}

impl Serialize for DetailedCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DetailedCategory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown detailed category: {label}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: String,
    pub amount: i64,
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub depositor_name: String,
    pub bank: Bank,
    pub is_safe_box: bool,
    #[serde(rename = "type")]
    pub txn_type: TxnType,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_category: Option<DetailedCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    #[serde(default)]
    pub is_internal_transfer: bool,
    #[serde(default)]
    pub balance_after: i64,
}

impl Transaction {
    pub fn year_month(&self) -> &str {
        self.date.get(..7).unwrap_or(&self.date)
    }
}

// ---------------------------------------------------------------------------
// Output document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    pub description: String,
    pub balance: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_closed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Accounts {
    pub primary_account: AccountInfo,
    pub safe_box: AccountInfo,
    pub secondary_account: AccountInfo,
    /// Source file name to SHA-256 digest.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: i64,
    pub total_expense: i64,
    pub total_interest: i64,
    pub main_balance: i64,
    pub safebox_balance: i64,
    pub total_balance: i64,
    pub total_transactions: usize,
    pub internal_transfers: usize,
}

/// A transaction as listed under a member or an expense category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub date: String,
    pub amount: i64,
    pub description: String,
    #[serde(default)]
    pub depositor_name: String,
}

impl From<&Transaction> for PaymentEntry {
    fn from(t: &Transaction) -> Self {
        Self {
            date: t.date.clone(),
            amount: t.amount,
            description: t.description.clone(),
            depositor_name: t.depositor_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberStats {
    pub total_paid: i64,
    pub payment_count: usize,
    pub payments: Vec<PaymentEntry>,
    pub last_payment_date: Option<String>,
    pub average_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: i64,
    pub count: usize,
    pub transactions: Vec<PaymentEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub income: i64,
    pub expense: i64,
    pub member_payments: i64,
    pub member_payment_count: usize,
    pub internal_transfers: i64,
    pub balance: i64,
}

/// Output of the base stage; also the checkpoint format read by `enhance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseDocument {
    pub accounts: Accounts,
    pub summary: Summary,
    pub transactions: Vec<Transaction>,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedDocument {
    #[serde(flatten)]
    pub base: BaseDocument,
    pub member_analysis: BTreeMap<String, MemberStats>,
    pub expense_by_category: BTreeMap<String, CategoryStats>,
    pub monthly_trends: BTreeMap<String, MonthlyStats>,
    pub known_members: Vec<String>,
    pub enhanced_processing_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_category_labels() {
        assert_eq!(
            DetailedCategory::MemberDues("김민주".into()).to_string(),
            "dues_payment(김민주)"
        );
        assert_eq!(
            DetailedCategory::parse("member_remittance(박진복)"),
            Some(DetailedCategory::MemberRemittance("박진복".into()))
        );
        assert_eq!(DetailedCategory::parse("fee"), Some(DetailedCategory::Fee));
        assert_eq!(DetailedCategory::parse("groceries"), None);
    }

    #[test]
    fn test_transaction_json_shape() {
        let t = Transaction {
            date: "2025-03-05".into(),
            amount: 50000,
            description: "간편이체(김민주)".into(),
            depositor_name: String::new(),
            bank: Bank::PrimaryAccount,
            is_safe_box: false,
            txn_type: TxnType::Income,
            category: Category::TransferIncome,
            detailed_category: Some(DetailedCategory::MemberDues("김민주".into())),
            member_name: Some("김민주".into()),
            is_internal_transfer: false,
            balance_after: 50000,
        };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "income");
        assert_eq!(json["bank"], "primary_account");
        assert_eq!(json["category"], "transfer_income");
        assert_eq!(json["detailed_category"], "dues_payment(김민주)");
        assert!(json.get("depositor_name").is_none());
        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_raw_cell_text() {
        assert_eq!(RawCell::Float(50000.0).text(), "50000");
        assert_eq!(RawCell::Text("  입금 ".into()).text(), "입금");
        assert!(RawCell::from("   ").is_empty());
    }
}
