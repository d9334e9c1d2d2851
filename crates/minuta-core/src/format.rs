//! Masking and validation for Brazilian ID numbers, plus date formatting.
//!
//! Masks are progressive: a partially typed value is grouped as far as its
//! digits go, so the same function serves both live input and stored values.
//!
//! - CPF (individual taxpayer): `123.456.789-01`
//! - CNPJ (organization taxpayer): `12.345.678/0001-90`
//! - RG (identity card): `12.345.678-9`

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use regex::Regex;
use thiserror::Error;

use crate::model::Entity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid CPF: {0}")]
    InvalidCpf(String),
    #[error("invalid CNPJ: {0}")]
    InvalidCnpj(String),
    #[error("invalid RG: {0}")]
    InvalidRg(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// The ID kinds a variable or entity field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Cpf,
    Cnpj,
    Rg,
}

impl IdKind {
    pub fn format(self, value: &str) -> String {
        match self {
            Self::Cpf => format_cpf(value),
            Self::Cnpj => format_cnpj(value),
            Self::Rg => format_rg(value),
        }
    }

    pub fn validate(self, value: &str) -> Result<(), ValidationError> {
        match self {
            Self::Cpf => validate_cpf(value),
            Self::Cnpj => validate_cnpj(value),
            Self::Rg => validate_rg(value),
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpf => "CPF",
            Self::Cnpj => "CNPJ",
            Self::Rg => "RG",
        })
    }
}

impl std::str::FromStr for IdKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpf" => Ok(Self::Cpf),
            "cnpj" => Ok(Self::Cnpj),
            "rg" => Ok(Self::Rg),
            other => Err(format!("unknown ID kind: {other}")),
        }
    }
}

// ── Masks ──

type MaskStep = (Regex, &'static str);

fn step(pattern: &str, replacement: &'static str) -> MaskStep {
    (Regex::new(pattern).expect("mask pattern is valid"), replacement)
}

static CPF_MASK: LazyLock<Vec<MaskStep>> = LazyLock::new(|| {
    vec![
        step(r"([0-9]{3})([0-9])", "${1}.${2}"),
        step(r"([0-9]{3})([0-9])", "${1}.${2}"),
        step(r"([0-9]{3})([0-9]{1,2})$", "${1}-${2}"),
    ]
});

static CNPJ_MASK: LazyLock<Vec<MaskStep>> = LazyLock::new(|| {
    vec![
        step(r"([0-9]{2})([0-9])", "${1}.${2}"),
        step(r"([0-9]{3})([0-9])", "${1}.${2}"),
        step(r"([0-9]{3})([0-9])", "${1}/${2}"),
        step(r"([0-9]{4})([0-9]{1,2})$", "${1}-${2}"),
    ]
});

static RG_MASK: LazyLock<Vec<MaskStep>> = LazyLock::new(|| {
    vec![
        step(r"([0-9]{2})([0-9])", "${1}.${2}"),
        step(r"([0-9]{3})([0-9])", "${1}.${2}"),
        step(r"([0-9]{3})([0-9]{1,2})$", "${1}-${2}"),
    ]
});

fn digits(value: &str, max: usize) -> String {
    value.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// Each step rewrites only its first match.
fn apply_mask(digits: String, steps: &[MaskStep]) -> String {
    steps.iter().fold(digits, |acc, (re, replacement)| {
        re.replacen(&acc, 1, *replacement).into_owned()
    })
}

/// `12345678901` → `123.456.789-01`
pub fn format_cpf(value: &str) -> String {
    apply_mask(digits(value, 11), &CPF_MASK)
}

/// `12345678000190` → `12.345.678/0001-90`
pub fn format_cnpj(value: &str) -> String {
    apply_mask(digits(value, 14), &CNPJ_MASK)
}

/// `123456789` → `12.345.678-9`
pub fn format_rg(value: &str) -> String {
    apply_mask(digits(value, 9), &RG_MASK)
}

/// Which mask, if any, applies to a variable typed into the editor.
///
/// When a name mentions several kinds the RG mask wins over CNPJ, and CNPJ
/// over CPF. `rg` only counts as a whole `_`/`-` separated word.
pub fn mask_for_variable(name: &str) -> Option<IdKind> {
    let lower = name.to_ascii_lowercase();
    if lower.split(['_', '-']).any(|word| word == "rg") {
        Some(IdKind::Rg)
    } else if lower.contains("cnpj") {
        Some(IdKind::Cnpj)
    } else if lower.contains("cpf") {
        Some(IdKind::Cpf)
    } else {
        None
    }
}

// ── Validators ──

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn cpf_check_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();
    match (sum * 10) % 11 {
        10 => 0,
        d => d,
    }
}

pub fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidCpf(value.to_string());
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 || all_same(&digits) {
        return Err(invalid());
    }
    if cpf_check_digit(&digits[..9]) != digits[9] || cpf_check_digit(&digits[..10]) != digits[10] {
        return Err(invalid());
    }
    Ok(())
}

const CNPJ_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

fn cnpj_check_digit(digits: &[u32]) -> u32 {
    // First digit uses the last 12 weights, second uses all 13.
    let weights = &CNPJ_WEIGHTS[CNPJ_WEIGHTS.len() - digits.len()..];
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

pub fn validate_cnpj(value: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidCnpj(value.to_string());
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 14 || all_same(&digits) {
        return Err(invalid());
    }
    if cnpj_check_digit(&digits[..12]) != digits[12]
        || cnpj_check_digit(&digits[..13]) != digits[13]
    {
        return Err(invalid());
    }
    Ok(())
}

/// RG formats vary by issuing state; only the length of digits and `X` is checked.
pub fn validate_rg(value: &str) -> Result<(), ValidationError> {
    let len = value
        .chars()
        .filter(|c| c.is_ascii_digit() || c.eq_ignore_ascii_case(&'x'))
        .count();
    if (7..=9).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::InvalidRg(value.to_string()))
    }
}

/// Validate every ID an entity carries. Blank fields are skipped.
pub fn validate_entity(entity: &Entity) -> Vec<ValidationError> {
    [
        (IdKind::Cpf, entity.cpf.as_deref()),
        (IdKind::Rg, entity.rg.as_deref()),
        (IdKind::Cnpj, entity.cnpj.as_deref()),
    ]
    .into_iter()
    .filter_map(|(kind, value)| {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        kind.validate(value).err()
    })
    .collect()
}

// ── Dates ──

const MONTHS_PT: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp (taken in UTC).
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| {
            DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// `2025-10-23` → `23 de outubro de 2025`.
///
/// Empty input yields an empty string; unparseable input is returned trimmed.
pub fn format_long_date(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match parse_date(trimmed) {
        Ok(date) => format!(
            "{:02} de {} de {}",
            date.day(),
            MONTHS_PT[date.month0() as usize],
            date.year()
        ),
        Err(_) => trimmed.to_string(),
    }
}

/// History timestamps: `dd/mm/yyyy hh:mm` in the timestamp's own zone.
pub fn format_timestamp<Tz>(ts: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    ts.format("%d/%m/%Y %H:%M").to_string()
}
