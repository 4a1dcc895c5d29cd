//! Marker-based classification. Each decision is an ordered rule table;
//! the first rule whose predicate holds supplies the label.

use crate::members::Roster;
use crate::models::{Category, DetailedCategory, Transaction, TxnType};

const DEPOSIT: &str = "입금";
const WITHDRAWAL: &str = "출금";
const CANCELLED: &str = "취소";
const TRANSFER: &str = "이체";
const INTEREST: &str = "이자";
const SAFE_BOX: &str = "세이프박스";
const REMITTANCE: &str = "송금";
const ATM: &str = "atm";
/// Movement between the organization's own accounts.
pub const ACCOUNT_MOVE: &str = "대체";

const DUES: &[&str] = &["회비", "납부"];
const ASSOCIATION_DUES: &[&str] = &["사우회", "회비"];
const TRANSFER_APPS: &[&str] = &["간편이체", "오픈뱅킹", "이체", "송금"];
const CARD: &str = "카드";
const CARD_PAYMENTS: &[&str] = &["체크카드", "신용카드", CARD];
const MOBILE: &str = "모바일";
const FEE: &str = "수수료";

/// What a rule gets to look at.
#[derive(Debug, Clone)]
pub struct Subject<'a> {
    pub kind: &'a str,
    pub description: &'a str,
    lowered: String,
    pub is_safe_box: bool,
    pub txn_type: Option<TxnType>,
    pub member: Option<&'a str>,
}

impl<'a> Subject<'a> {
    pub fn new(kind: &'a str, description: &'a str) -> Self {
        Self {
            kind,
            description,
            lowered: description.to_lowercase(),
            is_safe_box: false,
            txn_type: None,
            member: None,
        }
    }

    pub fn safe_box(mut self, is_safe_box: bool) -> Self {
        self.is_safe_box = is_safe_box;
        self
    }

    pub fn typed(mut self, txn_type: TxnType) -> Self {
        self.txn_type = Some(txn_type);
        self
    }

    pub fn member(mut self, member: Option<&'a str>) -> Self {
        self.member = member;
        self
    }

    fn says(&self, marker: &str) -> bool {
        self.lowered.contains(marker)
    }

    fn says_any(&self, markers: &[&str]) -> bool {
        markers.iter().any(|m| self.says(m))
    }

    fn is(&self, txn_type: TxnType) -> bool {
        self.txn_type == Some(txn_type)
    }

    fn member_name(&self) -> String {
        self.member.unwrap_or_default().to_string()
    }
}

pub struct Rule<L> {
    pub name: &'static str,
    pub when: fn(&Subject<'_>) -> bool,
    pub then: fn(&Subject<'_>) -> L,
}

/// Evaluate `rules` in order and return the first rule that fires with its label.
pub fn first_match<'r, L>(rules: &'r [Rule<L>], subject: &Subject<'_>) -> Option<(&'r str, L)> {
    rules
        .iter()
        .find(|r| (r.when)(subject))
        .map(|r| (r.name, (r.then)(subject)))
}

pub static TYPE_RULES: &[Rule<TxnType>] = &[
    Rule {
        name: "cancelled_deposit",
        when: |s| s.kind.contains(DEPOSIT) && s.kind.contains(CANCELLED),
        then: |_| TxnType::Expense,
    },
    Rule {
        name: "deposit",
        when: |s| s.kind.contains(DEPOSIT),
        then: |_| TxnType::Income,
    },
    Rule {
        name: "cancelled_withdrawal",
        when: |s| s.kind.contains(WITHDRAWAL) && s.kind.contains(CANCELLED),
        then: |_| TxnType::Income,
    },
    Rule {
        name: "withdrawal",
        when: |s| s.kind.contains(WITHDRAWAL),
        then: |_| TxnType::Expense,
    },
    Rule {
        name: "transfer_memo",
        when: |s| s.says(TRANSFER),
        then: |_| TxnType::Transfer,
    },
];

pub static CATEGORY_RULES: &[Rule<Category>] = &[
    Rule {
        name: "interest",
        when: |s| s.says(INTEREST),
        then: |_| Category::Interest,
    },
    Rule {
        name: "safe_box",
        when: |s| s.is_safe_box || s.says(SAFE_BOX),
        then: |_| Category::SafeBox,
    },
    Rule {
        name: "dues",
        when: |s| s.is(TxnType::Income) && s.says_any(DUES),
        then: |_| Category::DuesPayment,
    },
    Rule {
        name: "transfer_income",
        when: |s| s.is(TxnType::Income) && s.says(TRANSFER),
        then: |_| Category::TransferIncome,
    },
    Rule {
        name: "other_income",
        when: |s| s.is(TxnType::Income),
        then: |_| Category::OtherIncome,
    },
    Rule {
        name: "atm",
        when: |s| s.is(TxnType::Expense) && s.says(ATM),
        then: |_| Category::AtmWithdrawal,
    },
    Rule {
        name: "general_transfer",
        when: |s| s.is(TxnType::Expense) && s.says(TRANSFER),
        then: |_| Category::GeneralTransfer,
    },
    Rule {
        name: "remittance",
        when: |s| s.is(TxnType::Expense) && s.says(REMITTANCE),
        then: |_| Category::Remittance,
    },
    Rule {
        name: "other_expense",
        when: |s| s.is(TxnType::Expense),
        then: |_| Category::OtherExpense,
    },
];

pub static INCOME_DETAIL_RULES: &[Rule<DetailedCategory>] = &[
    Rule {
        name: "interest",
        when: |s| s.says(INTEREST),
        then: |_| DetailedCategory::InterestIncome,
    },
    Rule {
        name: "member_dues",
        when: |s| s.member.is_some(),
        then: |s| DetailedCategory::MemberDues(s.member_name()),
    },
    Rule {
        name: "dues",
        when: |s| s.says_any(ASSOCIATION_DUES),
        then: |_| DetailedCategory::DuesPayment,
    },
    Rule {
        name: "account_move",
        when: |s| s.says(ACCOUNT_MOVE),
        then: |_| DetailedCategory::AccountMove,
    },
    Rule {
        name: "card_points",
        when: |s| s.says(CARD),
        then: |_| DetailedCategory::CardPoints,
    },
];

pub static EXPENSE_DETAIL_RULES: &[Rule<DetailedCategory>] = &[
    Rule {
        name: "member_remittance",
        when: |s| s.says_any(TRANSFER_APPS) && s.member.is_some(),
        then: |s| DetailedCategory::MemberRemittance(s.member_name()),
    },
    Rule {
        name: "general_transfer",
        when: |s| s.says_any(TRANSFER_APPS),
        then: |_| DetailedCategory::GeneralTransfer,
    },
    Rule {
        name: "atm",
        when: |s| s.says(ATM),
        then: |_| DetailedCategory::AtmWithdrawal,
    },
    Rule {
        name: "card_payment",
        when: |s| s.says_any(CARD_PAYMENTS),
        then: |_| DetailedCategory::CardPayment,
    },
    Rule {
        name: "mobile_payment",
        when: |s| s.says(MOBILE),
        then: |_| DetailedCategory::MobilePayment,
    },
    Rule {
        name: "fee",
        when: |s| s.says(FEE),
        then: |_| DetailedCategory::Fee,
    },
];

pub fn classify_type(kind: &str, description: &str) -> TxnType {
    let subject = Subject::new(kind, description);
    first_match(TYPE_RULES, &subject)
        .map(|(_, t)| t)
        .unwrap_or(TxnType::Income)
}

pub fn categorize(txn_type: TxnType, description: &str, is_safe_box: bool) -> Category {
    let subject = Subject::new("", description)
        .safe_box(is_safe_box)
        .typed(txn_type);
    first_match(CATEGORY_RULES, &subject)
        .map(|(_, c)| c)
        .unwrap_or(Category::Other)
}

/// Second-pass label for an already-typed transaction. Transfers get none.
pub fn detailed_category(txn: &Transaction, roster: &Roster) -> Option<DetailedCategory> {
    let (rules, fallback) = match txn.txn_type {
        TxnType::Income => (INCOME_DETAIL_RULES, DetailedCategory::OtherIncome),
        TxnType::Expense => (EXPENSE_DETAIL_RULES, DetailedCategory::OtherExpense),
        TxnType::Transfer => return None,
    };
    let member = roster.extract(&txn.description, &txn.depositor_name);
    let subject = Subject::new("", &txn.description)
        .safe_box(txn.is_safe_box)
        .typed(txn.txn_type)
        .member(member.as_deref());
    Some(first_match(rules, &subject).map(|(_, d)| d).unwrap_or(fallback))
}
