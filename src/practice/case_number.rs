//! `CASE-<year>-<seq>` identifiers.
//!
//! The sequence restarts at 1 each calendar year and is padded to three
//! digits. Numbers that do not parse are ignored when picking the next one.

use std::collections::HashMap;

const PREFIX: &str = "CASE-";

pub fn format_case_number(year: i32, seq: u32) -> String {
    format!("{PREFIX}{year}-{seq:03}")
}

/// Split a case number into its year and sequence.
pub fn parse_case_number(raw: &str) -> Option<(i32, u32)> {
    let rest = raw.strip_prefix(PREFIX)?;
    let (year, seq) = rest.split_once('-')?;
    if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((year.parse().ok()?, seq.parse().ok()?))
}

fn highest_seq<'a>(year: i32, existing: impl IntoIterator<Item = &'a str>) -> u32 {
    existing
        .into_iter()
        .filter_map(parse_case_number)
        .filter(|(issued_year, _)| *issued_year == year)
        .map(|(_, seq)| seq)
        .max()
        .unwrap_or(0)
}

/// Next number for `year`, one past the highest sequence among `existing`.
pub fn next_case_number<'a>(year: i32, existing: impl IntoIterator<Item = &'a str>) -> String {
    format_case_number(year, highest_seq(year, existing).saturating_add(1))
}

/// Remembers the highest sequence handed out per year, so deleting the newest
/// case does not free its number.
#[derive(Debug, Default)]
pub struct CaseNumberSequence {
    highest: HashMap<i32, u32>,
}

impl CaseNumberSequence {
    pub fn issue<'a>(&mut self, year: i32, existing: impl IntoIterator<Item = &'a str>) -> String {
        let remembered = self.highest.get(&year).copied().unwrap_or(0);
        let seq = highest_seq(year, existing).max(remembered).saturating_add(1);
        self.highest.insert(year, seq);
        format_case_number(year, seq)
    }
}
