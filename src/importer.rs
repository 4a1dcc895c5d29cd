use std::path::{Path, PathBuf};
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::{DuesError, Result};
use crate::models::{Bank, RawCell, RawRow};
use crate::normalize::{is_plausible_serial, normalize_amount};

pub const LEDGER_SHEET: &str = "전체 거래 내역";
pub const SAFE_BOX_SHEET: &str = "세이프박스 거래내역";
const SAFE_BOX_MEMO: &str = "세이프박스";
const SECONDARY_BANK_MARKER: &str = "신한";

type Table = Vec<Vec<RawCell>>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn is_workbook(path: &Path) -> bool {
    matches!(extension(path).as_str(), "xlsx" | "xlsm" | "xls" | "xlsb" | "ods")
}

fn bank_from_label(label: &str) -> Bank {
    if label.contains(SECONDARY_BANK_MARKER) {
        Bank::SecondaryAccountClosed
    } else {
        Bank::PrimaryAccount
    }
}

/// Spreadsheet date columns sometimes hold bare serials without a date
/// format. Other numbers (`20250305`) are kept as text.
fn as_date_cell(cell: RawCell) -> RawCell {
    match cell {
        RawCell::Int(i) if is_plausible_serial(i as f64) => RawCell::Serial(i as f64),
        RawCell::Float(f) if is_plausible_serial(f) => RawCell::Serial(f),
        RawCell::Int(_) | RawCell::Float(_) => RawCell::Text(cell.text()),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Source kinds: enum dispatch instead of trait objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Consolidated sheet: date, type, amount, memo, bank.
    Ledger,
    /// Safe-box sheet: date, type, amount.
    SafeBox,
    /// One bank's own export with split deposit/withdrawal columns.
    BankExport(Bank),
}

#[derive(Debug, Default, Clone, Copy)]
struct Columns {
    date: Option<usize>,
    kind: Option<usize>,
    amount: Option<usize>,
    description: Option<usize>,
    bank: Option<usize>,
    deposit: Option<usize>,
    withdrawal: Option<usize>,
    depositor: Option<usize>,
}

const DATE_HEADERS: &[&str] = &["거래일시", "거래일자", "거래일", "일자", "date"];
const KIND_HEADERS: &[&str] = &["구분", "거래구분", "type"];
const AMOUNT_HEADERS: &[&str] = &["거래금액", "금액", "amount"];
const BANK_HEADERS: &[&str] = &["은행", "bank"];
const DEPOSIT_HEADERS: &[&str] = &["입금(원)", "입금액", "입금", "deposit"];
const WITHDRAWAL_HEADERS: &[&str] = &["출금(원)", "출금액", "출금", "withdrawal"];

impl SourceKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ledger => "ledger",
            Self::SafeBox => "safebox",
            Self::BankExport(Bank::PrimaryAccount) => "primary",
            Self::BankExport(Bank::SecondaryAccountClosed) => "secondary",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ledger => "Consolidated ledger sheet",
            Self::SafeBox => "Safe-box sheet",
            Self::BankExport(Bank::PrimaryAccount) => "Primary account export",
            Self::BankExport(Bank::SecondaryAccountClosed) => "Secondary account export",
        }
    }

    pub fn default_sheet(&self) -> Option<&'static str> {
        match self {
            Self::Ledger => Some(LEDGER_SHEET),
            Self::SafeBox => Some(SAFE_BOX_SHEET),
            Self::BankExport(_) => None,
        }
    }

    fn description_headers(&self) -> &'static [&'static str] {
        match self {
            // In bank exports `내용` is the counterparty, `적요` the memo.
            Self::BankExport(_) => &["적요", "거래내용", "description", "memo"],
            _ => &["내용", "적요", "description", "memo"],
        }
    }

    fn depositor_headers(&self) -> &'static [&'static str] {
        match self {
            Self::BankExport(_) => &["입금자명", "의뢰인/수취인", "보낸분/받는분", "내용", "depositor"],
            _ => &["입금자명", "depositor"],
        }
    }

    /// Column positions used when a consolidated sheet's header is unlabeled.
    fn positional(&self) -> Columns {
        match self {
            Self::Ledger => Columns {
                date: Some(0),
                kind: Some(1),
                amount: Some(2),
                description: Some(3),
                bank: Some(4),
                ..Columns::default()
            },
            Self::SafeBox => Columns {
                date: Some(0),
                kind: Some(1),
                amount: Some(2),
                ..Columns::default()
            },
            Self::BankExport(_) => Columns::default(),
        }
    }

    fn map_header(&self, header: &[RawCell]) -> Columns {
        let find = |aliases: &[&str]| {
            header.iter().position(|cell| {
                let text = cell.text().to_lowercase();
                aliases.iter().any(|a| text == *a)
            })
        };
        let fallback = self.positional();
        Columns {
            date: find(DATE_HEADERS).or(fallback.date),
            kind: find(KIND_HEADERS).or(fallback.kind),
            amount: find(AMOUNT_HEADERS).or(fallback.amount),
            description: find(self.description_headers()).or(fallback.description),
            bank: find(BANK_HEADERS).or(fallback.bank),
            deposit: find(DEPOSIT_HEADERS),
            withdrawal: find(WITHDRAWAL_HEADERS),
            depositor: find(self.depositor_headers()),
        }
    }

    fn validate(&self, cols: &Columns, source_name: &str) -> Result<()> {
        let missing = |column: &str| DuesError::MissingColumn {
            source_name: source_name.to_string(),
            column: column.to_string(),
        };
        if cols.date.is_none() {
            return Err(missing("date"));
        }
        let split = cols.deposit.is_some() && cols.withdrawal.is_some();
        if cols.amount.is_none() && !split {
            return Err(missing("amount"));
        }
        Ok(())
    }

    /// Turn a sheet into raw rows. Title rows above the header, blank rows
    /// and repeated header rows are skipped.
    pub fn parse_table(&self, table: &[Vec<RawCell>], source_name: &str) -> Result<Vec<RawRow>> {
        let header_idx = table.iter().position(|row| {
            row.iter()
                .any(|cell| DATE_HEADERS.contains(&cell.text().to_lowercase().as_str()))
        });
        let (cols, start) = match header_idx {
            Some(i) => (self.map_header(&table[i]), i + 1),
            None => (self.positional(), 0),
        };
        self.validate(&cols, source_name)?;

        let header_text = header_idx
            .and_then(|i| cols.date.and_then(|d| table[i].get(d)))
            .map(RawCell::text);

        let mut rows = Vec::new();
        for row in &table[start..] {
            let date = cell_at(row, cols.date);
            if date.is_empty() || header_text.as_deref() == Some(date.text().as_str()) {
                continue;
            }
            let (kind, amount) = kind_and_amount(row, &cols);
            let raw = match self {
                Self::Ledger => RawRow {
                    date: as_date_cell(date),
                    kind,
                    amount,
                    description: cell_at(row, cols.description),
                    bank: Some(bank_from_label(&cell_at(row, cols.bank).text())),
                    depositor_name: cell_at(row, cols.depositor),
                    is_safe_box: false,
                },
                Self::SafeBox => RawRow {
                    date: as_date_cell(date),
                    kind,
                    amount,
                    description: RawCell::Text(SAFE_BOX_MEMO.to_string()),
                    bank: Some(Bank::PrimaryAccount),
                    depositor_name: RawCell::Empty,
                    is_safe_box: true,
                },
                Self::BankExport(bank) => RawRow {
                    date: as_date_cell(date),
                    kind,
                    amount,
                    description: cell_at(row, cols.description),
                    bank: Some(*bank),
                    depositor_name: cell_at(row, cols.depositor),
                    is_safe_box: false,
                },
            };
            rows.push(raw);
        }
        tracing::debug!(source = source_name, rows = rows.len(), "parsed {}", self.name());
        Ok(rows)
    }
}

fn cell_at(row: &[RawCell], idx: Option<usize>) -> RawCell {
    idx.and_then(|i| row.get(i)).cloned().unwrap_or(RawCell::Empty)
}

/// Single amount column with a type indicator, or split deposit and
/// withdrawal columns that imply the indicator.
fn kind_and_amount(row: &[RawCell], cols: &Columns) -> (RawCell, RawCell) {
    if cols.deposit.is_some() && cols.withdrawal.is_some() {
        let deposit = cell_at(row, cols.deposit);
        let withdrawal = cell_at(row, cols.withdrawal);
        if normalize_amount(&deposit) != 0 {
            return (RawCell::Text("입금".to_string()), deposit);
        }
        if normalize_amount(&withdrawal) != 0 {
            return (RawCell::Text("출금".to_string()), withdrawal);
        }
        if cols.amount.is_none() {
            return (cell_at(row, cols.kind), RawCell::Empty);
        }
    }
    (cell_at(row, cols.kind), cell_at(row, cols.amount))
}

const ALL_KINDS: &[SourceKind] = &[
    SourceKind::Ledger,
    SourceKind::SafeBox,
    SourceKind::BankExport(Bank::PrimaryAccount),
    SourceKind::BankExport(Bank::SecondaryAccountClosed),
];

pub fn get_by_key(key: &str) -> Option<SourceKind> {
    ALL_KINDS.iter().find(|k| k.key() == key).copied()
}

// ---------------------------------------------------------------------------
// Source specs: `kind:path[#sheet]`, or a bare path to auto-detect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub kind: SourceKind,
    pub path: PathBuf,
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub kind: Option<SourceKind>,
    pub path: PathBuf,
    pub sheet: Option<String>,
}

impl FromStr for SourceSpec {
    type Err = DuesError;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, rest) = match s.split_once(':') {
            // Single letters are drive prefixes, not kinds.
            Some((key, rest)) if key.len() > 1 && key.chars().all(|c| c.is_ascii_alphabetic()) => {
                let kind = get_by_key(key).ok_or_else(|| DuesError::UnknownSource(key.to_string()))?;
                (Some(kind), rest)
            }
            _ => (None, s),
        };
        let (path, sheet) = match rest.rsplit_once('#') {
            Some((path, sheet)) if !sheet.is_empty() => (path, Some(sheet.to_string())),
            _ => (rest, None),
        };
        if path.is_empty() {
            return Err(DuesError::Other(format!("no path in source {s:?}")));
        }
        Ok(Self {
            kind,
            path: PathBuf::from(path),
            sheet,
        })
    }
}

impl SourceSpec {
    /// Resolve to concrete sources. A bare workbook path with the
    /// consolidated report sheets expands to both of them.
    pub fn resolve(&self) -> Result<Vec<Source>> {
        if let Some(kind) = self.kind {
            return Ok(vec![Source {
                kind,
                path: self.path.clone(),
                sheet: self.sheet.clone(),
            }]);
        }
        if !self.path.exists() {
            return Err(DuesError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", self.path.display()),
            )));
        }
        let kinds = if is_workbook(&self.path) {
            let sheets = sheet_names(&self.path)?;
            let mut kinds = Vec::new();
            if sheets.iter().any(|s| s == LEDGER_SHEET) {
                kinds.push(SourceKind::Ledger);
                if sheets.iter().any(|s| s == SAFE_BOX_SHEET) {
                    kinds.push(SourceKind::SafeBox);
                }
            } else {
                kinds.push(SourceKind::BankExport(Bank::PrimaryAccount));
            }
            kinds
        } else {
            vec![detect_csv_kind(&self.path)?]
        };
        Ok(kinds
            .into_iter()
            .map(|kind| Source {
                kind,
                path: self.path.clone(),
                sheet: self.sheet.clone(),
            })
            .collect())
    }
}

fn detect_csv_kind(path: &Path) -> Result<SourceKind> {
    let table = read_csv(path)?;
    let split = table.iter().take(20).any(|row| {
        let has = |aliases: &[&str]| row.iter().any(|c| aliases.contains(&c.text().as_str()));
        has(DEPOSIT_HEADERS) && has(WITHDRAWAL_HEADERS)
    });
    Ok(if split {
        SourceKind::BankExport(Bank::PrimaryAccount)
    } else {
        SourceKind::Ledger
    })
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut table = Vec::new();
    for result in rdr.records() {
        let record = result?;
        table.push(record.iter().map(RawCell::from).collect());
    }
    Ok(table)
}

#[cfg(feature = "xlsx")]
fn sheet_names(path: &Path) -> Result<Vec<String>> {
    use calamine::Reader;
    let workbook = calamine::open_workbook_auto(path)
        .map_err(|e| DuesError::Workbook(format!("{}: {e}", path.display())))?;
    Ok(workbook.sheet_names().to_vec())
}

#[cfg(not(feature = "xlsx"))]
fn sheet_names(path: &Path) -> Result<Vec<String>> {
    Err(DuesError::UnsupportedFile(path.display().to_string()))
}

#[cfg(feature = "xlsx")]
fn cell_from(data: &calamine::Data) -> RawCell {
    use calamine::Data;
    match data {
        Data::Int(i) => RawCell::Int(*i),
        Data::Float(f) => RawCell::Float(*f),
        Data::String(s) => RawCell::from(s.as_str()),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => RawCell::Serial(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(_) | Data::Empty => RawCell::Empty,
    }
}

#[cfg(feature = "xlsx")]
fn read_workbook(path: &Path, sheet: Option<&str>, fallback: Option<&str>) -> Result<Table> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| DuesError::Workbook(format!("{}: {e}", path.display())))?;
    let names = workbook.sheet_names().to_vec();

    let chosen = match (sheet, fallback) {
        (Some(explicit), _) => {
            if !names.iter().any(|n| n == explicit) {
                return Err(DuesError::MissingSheet(explicit.to_string()));
            }
            explicit.to_string()
        }
        (None, Some(default)) if names.iter().any(|n| n == default) => default.to_string(),
        (None, default) => {
            let first = names
                .first()
                .cloned()
                .ok_or_else(|| DuesError::Workbook(format!("{}: no sheets", path.display())))?;
            if let Some(default) = default {
                tracing::warn!("{}: no sheet {default:?}, reading {first:?}", path.display());
            }
            first
        }
    };

    let range = workbook
        .worksheet_range(&chosen)
        .map_err(|e| DuesError::Workbook(format!("{}[{chosen}]: {e}", path.display())))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_from).collect())
        .collect())
}

#[cfg(not(feature = "xlsx"))]
fn read_workbook(path: &Path, _sheet: Option<&str>, _fallback: Option<&str>) -> Result<Table> {
    Err(DuesError::UnsupportedFile(path.display().to_string()))
}

pub struct LoadedSource {
    pub name: String,
    pub checksum: String,
    pub rows: Vec<RawRow>,
}

pub fn load_source(source: &Source) -> Result<LoadedSource> {
    let path = &source.path;
    let checksum = compute_checksum(path)?;
    let table = match extension(path).as_str() {
        "csv" | "txt" => read_csv(path)?,
        _ if is_workbook(path) => {
            read_workbook(path, source.sheet.as_deref(), source.kind.default_sheet())?
        }
        other => return Err(DuesError::UnsupportedFile(format!("{} (.{other})", path.display()))),
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    let label = match &source.sheet {
        Some(sheet) => format!("{name}#{sheet}"),
        None => format!("{name}:{}", source.kind.key()),
    };
    let rows = source.kind.parse_table(&table, &label)?;
    tracing::info!(source = %label, rows = rows.len(), checksum = %&checksum[..12], "loaded source");

    Ok(LoadedSource {
        name: label,
        checksum,
        rows,
    })
}
