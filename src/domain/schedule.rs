use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::observation::{EntityId, GameId, GameLog};

/// A game on the day's slate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub game_id: GameId,
    pub home_team_id: EntityId,
    pub away_team_id: EntityId,
}

/// The day's fixture list plus team abbreviations for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub date: Option<NaiveDate>,
    pub games: Vec<ScheduledGame>,
    #[serde(default)]
    pub team_abbreviations: HashMap<EntityId, String>,
}

impl Schedule {
    pub fn new(date: NaiveDate, games: Vec<ScheduledGame>) -> Self {
        Self {
            date: Some(date),
            games,
            team_abbreviations: HashMap::new(),
        }
    }

    pub fn with_abbreviations(mut self, abbreviations: HashMap<EntityId, String>) -> Self {
        self.team_abbreviations = abbreviations;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn teams_playing(&self) -> HashSet<EntityId> {
        self.games
            .iter()
            .flat_map(|g| [g.home_team_id, g.away_team_id])
            .collect()
    }

    pub fn game_for_team(&self, team_id: EntityId) -> Option<&ScheduledGame> {
        self.games
            .iter()
            .find(|g| g.home_team_id == team_id || g.away_team_id == team_id)
    }

    pub fn opponent_of(&self, team_id: EntityId) -> Option<EntityId> {
        let game = self.game_for_team(team_id)?;
        if game.home_team_id == team_id {
            Some(game.away_team_id)
        } else {
            Some(game.home_team_id)
        }
    }

    fn abbreviation(&self, team_id: EntityId) -> String {
        self.team_abbreviations
            .get(&team_id)
            .cloned()
            .unwrap_or_else(|| format!("ID:{team_id}"))
    }

    /// Display string `AWAY @ HOME`.
    pub fn matchup(&self, game: &ScheduledGame) -> String {
        format!(
            "{} @ {}",
            self.abbreviation(game.away_team_id),
            self.abbreviation(game.home_team_id)
        )
    }
}

/// Which teams played on which dates, built from team game rows.
#[derive(Debug, Clone, Default)]
pub struct RestCalendar {
    played: HashSet<(EntityId, NaiveDate)>,
}

impl RestCalendar {
    pub fn from_team_logs<'a, I>(logs: I) -> Self
    where
        I: IntoIterator<Item = &'a GameLog>,
    {
        Self {
            played: logs
                .into_iter()
                .map(|l| (l.team_id, l.game_date))
                .collect(),
        }
    }

    pub fn insert(&mut self, team_id: EntityId, date: NaiveDate) {
        self.played.insert((team_id, date));
    }

    pub fn played_on(&self, team_id: EntityId, date: NaiveDate) -> bool {
        self.played.contains(&(team_id, date))
    }
}
