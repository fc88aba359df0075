use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a player or team as supplied by the data source.
pub type EntityId = u64;

/// Identifier of a single game/event.
pub type GameId = String;

/// Metric columns the engine can build a threshold series from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Points,
    FieldGoalPct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Points => "PTS",
            Metric::FieldGoalPct => "FG_PCT",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Win/loss flag of a game row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
}

/// One game row for an entity (player or team).
///
/// Stat columns are optional: the source may leave them empty, and
/// non-finite values are treated the same as missing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLog {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub team_id: EntityId,
    pub game_id: GameId,
    pub game_date: NaiveDate,
    #[serde(default)]
    pub opponent_team_id: Option<EntityId>,
    #[serde(default)]
    pub points: Option<f64>,
    #[serde(default)]
    pub field_goal_pct: Option<f64>,
    #[serde(default)]
    pub result: Option<GameResult>,
}

impl GameLog {
    /// Raw metric value, `None` when missing.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Points => self.points,
            Metric::FieldGoalPct => self.field_goal_pct,
        }
    }
}

/// Season aggregate row for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonLine {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub team_id: EntityId,
    pub team_abbreviation: String,
    pub games_played: u32,
    /// Total minutes over the season.
    pub minutes: f64,
    /// Total points over the season.
    pub points: f64,
    pub field_goals_made: f64,
    pub field_goals_attempted: f64,
}

impl SeasonLine {
    pub fn average_points(&self) -> Option<f64> {
        if self.games_played == 0 {
            return None;
        }
        Some(self.points / self.games_played as f64)
    }

    /// FGM / FGA, 0.0 when no attempts.
    pub fn field_goal_ratio(&self) -> f64 {
        if self.field_goals_attempted > 0.0 {
            self.field_goals_made / self.field_goals_attempted
        } else {
            0.0
        }
    }

    pub fn minutes_per_game(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        self.minutes / self.games_played as f64
    }

    pub fn aggregates(&self) -> Option<SeasonAggregates> {
        Some(SeasonAggregates {
            games_played: self.games_played,
            average_value: self.average_points()?,
            efficiency_ratio: self.field_goal_ratio(),
        })
    }
}

/// Season-level features consumed by the confidence scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonAggregates {
    pub games_played: u32,
    pub average_value: f64,
    pub efficiency_ratio: f64,
}

/// Pick the in-progress season line for an entity: the one with the fewest
/// games played. A zero-games line wins, so callers see the empty season
/// instead of last season's averages.
pub fn current_season_line<'a, I>(lines: I, entity_id: EntityId) -> Option<&'a SeasonLine>
where
    I: IntoIterator<Item = &'a SeasonLine>,
{
    lines
        .into_iter()
        .filter(|l| l.entity_id == entity_id)
        .min_by_key(|l| l.games_played)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(gp: u32, fga: f64) -> SeasonLine {
        SeasonLine {
            entity_id: 7,
            entity_name: "Test Player".to_string(),
            team_id: 1,
            team_abbreviation: "TST".to_string(),
            games_played: gp,
            minutes: 300.0,
            points: 200.0,
            field_goals_made: 40.0,
            field_goals_attempted: fga,
        }
    }

    #[test]
    fn season_averages_guard_zero_denominators() {
        assert_eq!(line(0, 80.0).average_points(), None);
        assert_eq!(line(0, 80.0).minutes_per_game(), 0.0);
        assert_eq!(line(10, 0.0).field_goal_ratio(), 0.0);
        assert!((line(10, 80.0).field_goal_ratio() - 0.5).abs() < 1e-12);
        assert!((line(10, 80.0).average_points().unwrap() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn current_season_is_fewest_games() {
        let lines = vec![line(70, 80.0), line(12, 80.0)];
        let picked = current_season_line(&lines, 7).unwrap();
        assert_eq!(picked.games_played, 12);
        assert!(current_season_line(&lines, 99).is_none());
    }

    #[test]
    fn zero_games_line_shadows_last_season() {
        let lines = vec![line(70, 80.0), line(0, 80.0)];
        let picked = current_season_line(&lines, 7).unwrap();
        assert_eq!(picked.games_played, 0);
        assert!(picked.aggregates().is_none());
    }
}
