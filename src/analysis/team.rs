//! Team-level report: points threshold streaks plus win/loss runs.

use serde::{Deserialize, Serialize};

use super::reversion::{estimate_reversion, Reversion};
use super::streaks::{extract_streaks, mean_len, run_lengths, Classification, StreakReport};
use crate::domain::{GameLog, GameResult, Metric};

/// Pattern positions per line in the wrapped pattern text.
const PATTERN_WRAP: usize = 20;

/// Win/loss run summary over a team's season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinLossSummary {
    pub current: GameResult,
    pub current_length: usize,
    /// Mean length over every win run, the current one included.
    pub mean_win_run: f64,
    pub mean_loss_run: f64,
}

impl WinLossSummary {
    pub fn describe(&self) -> String {
        let verb = match self.current {
            GameResult::Win => "WINNING",
            GameResult::Loss => "LOSING",
        };
        format!("Current run: {verb} for {} game(s).", self.current_length)
    }
}

/// Run-length grouping over the W/L flag. Rows without a result are dropped.
pub fn win_loss_streaks(logs: &[GameLog]) -> Option<WinLossSummary> {
    let results: Vec<GameResult> = logs.iter().filter_map(|l| l.result).collect();
    let runs = run_lengths(&results);
    let &(current, current_length) = runs.last()?;

    let mean_of = |kind: GameResult| {
        mean_len(
            runs.iter()
                .filter(move |(r, _)| *r == kind)
                .map(|(_, len)| *len),
        )
    };

    Some(WinLossSummary {
        current,
        current_length,
        mean_win_run: mean_of(GameResult::Win),
        mean_loss_run: mean_of(GameResult::Loss),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamReport {
    pub team_name: String,
    pub threshold: f64,
    pub games: usize,
    pub streaks: StreakReport,
    #[serde(default)]
    pub reversion: Option<Reversion>,
    #[serde(default)]
    pub win_loss: Option<WinLossSummary>,
}

impl TeamReport {
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("ANALYSIS: {}", self.team_name.to_uppercase()),
            format!("{} game rows found", self.games),
        ];
        let Some(a) = self.streaks.analysis() else {
            lines.push("Not enough games to analyse (at least 3 needed).".to_string());
            return lines;
        };

        lines.push(format!("POINTS THRESHOLD {:.1}", self.threshold));
        lines.push(format!(
            "  at or above: {} of {} games, completed runs average {:.2}",
            a.total_above,
            a.total,
            a.mean_length(Classification::Above)
        ));
        lines.push(format!(
            "  below: {} of {} games, completed runs average {:.2}",
            a.total_below,
            a.total,
            a.mean_length(Classification::Below)
        ));
        if let Some(r) = &self.reversion {
            lines.push(format!("  {}", r.describe()));
        }

        lines.push(format!("Pattern ({} games):", a.total));
        let parts: Vec<&str> = a.pattern.split('-').collect();
        for chunk in parts.chunks(PATTERN_WRAP) {
            lines.push(format!("  {}", chunk.join("-")));
        }

        lines.push("WIN / LOSS".to_string());
        match &self.win_loss {
            Some(wl) => {
                lines.push(format!("  {}", wl.describe()));
                lines.push(format!("  Mean win run: {:.2} game(s)", wl.mean_win_run));
                lines.push(format!("  Mean loss run: {:.2} game(s)", wl.mean_loss_run));
            }
            None => lines.push("  No win/loss data.".to_string()),
        }
        lines
    }
}

/// Threshold streaks and W/L runs for one team's game rows.
///
/// `logs` is the team's rows in date order.
pub fn analyze_team(team_name: &str, logs: &[GameLog], threshold: f64) -> TeamReport {
    let streaks = extract_streaks(logs, Metric::Points, threshold);
    let reversion = streaks.analysis().map(estimate_reversion);
    let win_loss = if streaks.is_insufficient() {
        None
    } else {
        win_loss_streaks(logs)
    };
    TeamReport {
        team_name: team_name.to_string(),
        threshold,
        games: logs.len(),
        streaks,
        reversion,
        win_loss,
    }
}
