//! Output formatting for CLI commands.
//!
//! Two modes: human-readable tables (default) and JSON (`--json`).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::analysis::streaks::Streak;
use crate::analysis::BacktestEntry;
use crate::domain::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, OutputMode::Json)
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
    }
    Ok(())
}

/// Print a whole result as JSON. Table mode callers render their own view.
pub fn print_json<T: Serialize>(item: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

pub fn print_lines<S: AsRef<str>>(lines: &[S]) {
    for line in lines {
        println!("{}", line.as_ref());
    }
}

pub fn print_kv(key: &str, value: &str) {
    println!("{key}: {value}");
}

pub fn print_success(msg: &str) {
    println!("\x1b[32m{msg}\x1b[0m");
}

pub fn print_warn(msg: &str) {
    println!("\x1b[33m{msg}\x1b[0m");
}

#[derive(Debug, Serialize, Tabled)]
pub struct StreakRow {
    #[tabled(rename = "#")]
    pub position: usize,
    #[tabled(rename = "type")]
    pub classification: String,
    pub length: usize,
    pub current: String,
}

impl StreakRow {
    pub fn from_streak(streak: &Streak, is_current: bool) -> Self {
        Self {
            position: streak.position,
            classification: streak.classification.to_string(),
            length: streak.length,
            current: if is_current { "*".to_string() } else { String::new() },
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct CandidateRow {
    pub rank: usize,
    pub entity: String,
    pub threshold: String,
    pub direction: String,
    #[tabled(rename = "break %")]
    pub break_probability: String,
    pub confidence: i64,
    pub synergy: String,
    pub game: String,
}

impl CandidateRow {
    pub fn from_candidate(rank: usize, c: &Candidate) -> Self {
        Self {
            rank,
            entity: c.entity_name.clone(),
            threshold: format!("{:.1}", c.threshold),
            direction: c.direction.to_string(),
            break_probability: format!("{:.1}", c.break_probability),
            confidence: c.confidence,
            synergy: format!("{:.3}", c.synergy),
            game: c.group_key.clone().unwrap_or_else(|| "-".to_string()),
        }
    }

    pub fn ranked(candidates: &[Candidate]) -> Vec<Self> {
        candidates
            .iter()
            .enumerate()
            .map(|(i, c)| Self::from_candidate(i + 1, c))
            .collect()
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct BacktestRow {
    pub rank: usize,
    pub entity: String,
    pub threshold: String,
    pub direction: String,
    #[tabled(rename = "break %")]
    pub break_probability: String,
    pub confidence: i64,
    pub actual: String,
    pub result: String,
}

impl BacktestRow {
    pub fn from_entry(entry: &BacktestEntry) -> Self {
        let c = &entry.candidate;
        let result = if entry.filtered {
            format!("{} (below floor)", entry.outcome.label())
        } else {
            entry.outcome.label().to_string()
        };
        Self {
            rank: entry.rank,
            entity: c.entity_name.clone(),
            threshold: format!("{:.1}", c.threshold),
            direction: c.direction.to_string(),
            break_probability: format!("{:.1}", c.break_probability),
            confidence: c.confidence,
            actual: entry
                .outcome
                .actual()
                .map(|v| format!("{v:.1}"))
                .unwrap_or_else(|| "-".to_string()),
            result,
        }
    }
}
