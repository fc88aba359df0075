//! Daily slate building and candidate scoring.
//!
//! A slate is the set of entities expected to play on a given date, with
//! the game, opponent and current season line attached. Scoring expands a
//! caller-supplied middle threshold into a band and scores every threshold
//! in it; rest and roster context are computed once per entity.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, TimeZone, Timelike};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::confidence::{
    ConfidenceScorer, EfficiencySignal, RestStatus, RosterDelta, ScoringInputs, ScoringWeights,
};
use super::ranking::{rank_candidates, select_diverse, sort_candidates};
use super::reversion::estimate_reversion;
use super::streaks::{extract_streaks, MIN_CLEAN_OBSERVATIONS};
use crate::config::AnalysisConfig;
use crate::domain::{
    current_season_line, synergy_score, Candidate, EntityId, GameId, GameLog, Metric, RestCalendar,
    RosterTag, Schedule, SeasonAggregates, SeasonLine,
};
use crate::error::SkipReason;

/// Slate date for a wall-clock time: before `rollover_hour` the previous
/// day's games are still the current slate.
pub fn effective_slate_date<Tz: TimeZone>(now: &DateTime<Tz>, rollover_hour: u32) -> NaiveDate {
    let date = now.date_naive();
    if now.hour() < rollover_hour {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// `[mid - range, mid, mid + range]` with non-positive thresholds removed.
pub fn threshold_band(middle: f64, range: f64) -> Vec<f64> {
    [middle - range, middle, middle + range]
        .into_iter()
        .filter(|t| *t > 0.0)
        .collect()
}

/// Case-insensitive name lookup over season lines.
pub fn find_entity_id(lines: &[SeasonLine], name: &str) -> Option<EntityId> {
    let wanted = name.trim();
    lines
        .iter()
        .find(|l| l.entity_name.eq_ignore_ascii_case(wanted))
        .map(|l| l.entity_id)
}

/// Game logs of one entity in date order.
pub fn entity_series(logs: &[GameLog], entity_id: EntityId) -> Vec<GameLog> {
    let mut series: Vec<GameLog> = logs
        .iter()
        .filter(|l| l.entity_id == entity_id)
        .cloned()
        .collect();
    series.sort_by_key(|l| l.game_date);
    series
}

/// An entity expected to play on the slate date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlateEntry {
    pub season: SeasonLine,
    pub game_id: GameId,
    /// `AWAY @ HOME`
    pub matchup: String,
    pub opponent_team_id: EntityId,
    pub minutes_per_game: f64,
}

impl SlateEntry {
    pub fn entity_id(&self) -> EntityId {
        self.season.entity_id
    }

    pub fn entity_name(&self) -> &str {
        &self.season.entity_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slate {
    pub date: NaiveDate,
    pub entries: Vec<SlateEntry>,
    /// Current season lines of every active entity, injured ones included.
    /// Roster deltas are computed against this pool.
    pub active_pool: Vec<SeasonLine>,
    pub injured: HashSet<String>,
    /// Human-readable build log.
    pub notes: Vec<String>,
}

impl Slate {
    fn empty(date: NaiveDate, injured: &HashSet<String>, notes: Vec<String>) -> Self {
        Self {
            date,
            entries: Vec::new(),
            active_pool: Vec::new(),
            injured: injured.clone(),
            notes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_by_name(&self, name: &str) -> Option<&SlateEntry> {
        let wanted = name.trim();
        self.entries
            .iter()
            .find(|e| e.entity_name().eq_ignore_ascii_case(wanted))
    }

    /// Entity-list key used to invalidate cached thresholds.
    pub fn entity_key(&self) -> String {
        let mut names: Vec<&str> = self.entries.iter().map(SlateEntry::entity_name).collect();
        names.sort_unstable();
        names.join("|")
    }
}

/// Select the entities worth scoring on `date`.
///
/// Active means at least `min_games_active` logs on or after
/// `season_start`. Injured names are dropped, only teams on the schedule are
/// kept, and each team contributes its top `top_n_per_group` by minutes per
/// game. Entries are ordered by game id, team id, then minutes descending.
pub fn build_slate(
    date: NaiveDate,
    schedule: &Schedule,
    season_lines: &[SeasonLine],
    logs: &[GameLog],
    injured: &HashSet<String>,
    cfg: &AnalysisConfig,
) -> Slate {
    let mut notes = Vec::new();

    if schedule.is_empty() {
        warn!(%date, "no games scheduled");
        notes.push(format!("No games scheduled for {date}."));
        return Slate::empty(date, injured, notes);
    }
    notes.push(format!("{} game(s) scheduled for {date}.", schedule.games.len()));
    let teams = schedule.teams_playing();

    let mut game_counts: HashMap<EntityId, usize> = HashMap::new();
    for log in logs
        .iter()
        .filter(|l| cfg.season_start.map_or(true, |start| l.game_date >= start))
    {
        *game_counts.entry(log.entity_id).or_default() += 1;
    }
    let active: HashSet<EntityId> = game_counts
        .into_iter()
        .filter(|(_, n)| *n >= cfg.min_games_active)
        .map(|(id, _)| id)
        .collect();

    if active.is_empty() {
        warn!(%date, min_games = cfg.min_games_active, "no active entities");
        notes.push(format!(
            "No entity has {} or more games since season start.",
            cfg.min_games_active
        ));
        return Slate::empty(date, injured, notes);
    }
    notes.push(format!("{} active entities found.", active.len()));

    let mut pool: Vec<SeasonLine> = active
        .iter()
        .filter_map(|id| current_season_line(season_lines, *id).cloned())
        .collect();
    pool.sort_by_key(|l| l.entity_id);

    let available: Vec<&SeasonLine> = pool
        .iter()
        .filter(|l| !injured.contains(&l.entity_name))
        .collect();
    let removed = pool.len() - available.len();
    if removed > 0 {
        notes.push(format!("Injury filter removed {removed} entities."));
    }

    let mut by_team: HashMap<EntityId, Vec<&SeasonLine>> = HashMap::new();
    for line in available.into_iter().filter(|l| teams.contains(&l.team_id)) {
        by_team.entry(line.team_id).or_default().push(line);
    }

    let mut entries = Vec::new();
    for (team_id, mut lines) in by_team {
        let Some(game) = schedule.game_for_team(team_id) else {
            continue;
        };
        let Some(opponent_team_id) = schedule.opponent_of(team_id) else {
            continue;
        };
        let matchup = schedule.matchup(game);

        lines.sort_by(|a, b| b.minutes_per_game().total_cmp(&a.minutes_per_game()));
        for line in lines.into_iter().take(cfg.top_n_per_group) {
            entries.push(SlateEntry {
                season: line.clone(),
                game_id: game.game_id.clone(),
                matchup: matchup.clone(),
                opponent_team_id,
                minutes_per_game: line.minutes_per_game(),
            });
        }
    }

    entries.sort_by(|a, b| {
        a.game_id
            .cmp(&b.game_id)
            .then(a.season.team_id.cmp(&b.season.team_id))
            .then(b.minutes_per_game.total_cmp(&a.minutes_per_game))
    });

    if entries.is_empty() {
        warn!(%date, "scheduled teams matched no active entity");
        notes.push("Scheduled teams matched no active entity.".to_string());
    } else {
        notes.push(format!("{} slate entries selected.", entries.len()));
    }
    info!(%date, entries = entries.len(), pool = pool.len(), "slate built");

    Slate {
        date,
        entries,
        active_pool: pool,
        injured: injured.clone(),
        notes,
    }
}

/// Key-teammate availability change for `entity`.
///
/// Key teammates are the top `key_per_team` of the entity's team by field
/// goal attempts, the entity itself removed. A key teammate with fewer than
/// half the entity's games played is a baseline absentee.
pub fn roster_delta(
    entity: &SeasonLine,
    pool: &[SeasonLine],
    injured: &HashSet<String>,
    key_per_team: usize,
) -> RosterDelta {
    let mut team: Vec<&SeasonLine> = pool
        .iter()
        .filter(|l| l.team_id == entity.team_id)
        .collect();
    team.sort_by(|a, b| b.field_goals_attempted.total_cmp(&a.field_goals_attempted));
    let key: Vec<&SeasonLine> = team
        .into_iter()
        .take(key_per_team)
        .filter(|l| l.entity_id != entity.entity_id)
        .collect();

    let out_today: BTreeSet<&str> = key
        .iter()
        .filter(|l| injured.contains(&l.entity_name))
        .map(|l| l.entity_name.as_str())
        .collect();
    let half = entity.games_played as f64 / 2.0;
    let baseline: BTreeSet<&str> = key
        .iter()
        .filter(|l| (l.games_played as f64) < half)
        .map(|l| l.entity_name.as_str())
        .collect();

    if let Some(name) = out_today.difference(&baseline).next() {
        RosterDelta {
            tag: RosterTag::UsageUp,
            teammate: Some(name.to_string()),
        }
    } else if let Some(name) = baseline.difference(&out_today).next() {
        RosterDelta {
            tag: RosterTag::UsageDown,
            teammate: Some(name.to_string()),
        }
    } else {
        RosterDelta::unchanged()
    }
}

/// Whether the entity's team and its opponent played the day before `date`.
pub fn rest_status(
    calendar: &RestCalendar,
    team_id: EntityId,
    opponent_team_id: EntityId,
    date: NaiveDate,
) -> RestStatus {
    match date.pred_opt() {
        Some(yesterday) => RestStatus {
            entity_played_yesterday: calendar.played_on(team_id, yesterday),
            opponent_played_yesterday: calendar.played_on(opponent_team_id, yesterday),
        },
        None => RestStatus::default(),
    }
}

/// FG% streak signal with the season ratio as threshold.
fn efficiency_signal(series: &[GameLog], ratio: f64) -> Option<EfficiencySignal> {
    let report = extract_streaks(series, Metric::FieldGoalPct, ratio);
    let reversion = estimate_reversion(report.analysis()?);
    Some(EfficiencySignal {
        break_probability: reversion.break_probability,
        direction: reversion.direction(),
    })
}

/// Per-entity context shared by every threshold in its band.
struct EntityContext {
    entity_id: EntityId,
    entity_name: String,
    group_key: Option<GameId>,
    season: SeasonAggregates,
    efficiency: Option<EfficiencySignal>,
    rest: Option<RestStatus>,
    roster: Option<RosterDelta>,
}

fn score_with_context(
    series: &[GameLog],
    threshold: f64,
    ctx: &EntityContext,
    scorer: &ConfidenceScorer,
) -> Result<Candidate, SkipReason> {
    let report = extract_streaks(series, Metric::Points, threshold);
    let analysis = report.analysis().ok_or(SkipReason::InsufficientSeries)?;
    let reversion = estimate_reversion(analysis);
    let direction = reversion.direction();

    let score = scorer.score(&ScoringInputs {
        direction,
        threshold,
        season_average: ctx.season.average_value,
        efficiency: ctx.efficiency,
        rest: ctx.rest,
        roster: ctx.roster.as_ref(),
    });

    let mut notes = score.notes;
    notes.pattern = reversion.describe();

    Ok(Candidate {
        entity_id: ctx.entity_id,
        entity_name: ctx.entity_name.clone(),
        threshold,
        direction,
        break_probability: reversion.break_probability,
        confidence: score.confidence,
        synergy: synergy_score(reversion.break_probability, score.confidence),
        group_key: ctx.group_key.clone(),
        streak_length: reversion.current.length,
        season_average: ctx.season.average_value,
        efficiency_ratio: ctx.season.efficiency_ratio,
        roster_tag: ctx.roster.as_ref().map_or(RosterTag::Unchanged, |d| d.tag),
        notes,
    })
}

/// Score one threshold for one entity without schedule or roster data.
///
/// `series` is the entity's logs in date order.
pub fn score_single_threshold(
    series: &[GameLog],
    threshold: f64,
    season: &SeasonAggregates,
    weights: &ScoringWeights,
) -> Result<Candidate, SkipReason> {
    if series.len() < MIN_CLEAN_OBSERVATIONS {
        return Err(SkipReason::TooFewGames {
            count: series.len(),
        });
    }
    let first = &series[0];
    let ctx = EntityContext {
        entity_id: first.entity_id,
        entity_name: first.entity_name.clone(),
        group_key: None,
        season: *season,
        efficiency: efficiency_signal(series, season.efficiency_ratio),
        rest: None,
        roster: None,
    };
    score_with_context(
        series,
        threshold,
        &ctx,
        &ConfidenceScorer::single_entity(weights.clone()),
    )
}

/// Ranked candidates for one entity over a threshold band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeAnalysis {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub middle_threshold: f64,
    pub range: f64,
    pub thresholds: Vec<f64>,
    pub candidates: Vec<Candidate>,
}

impl RangeAnalysis {
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("ANALYSIS: {}", self.entity_name.to_uppercase()),
            format!(
                "Middle threshold: {:.1} (range +/- {:.1})",
                self.middle_threshold, self.range
            ),
            "Factors: pattern, volume, efficiency (no rest or roster data)".to_string(),
        ];
        for (i, c) in self.candidates.iter().enumerate() {
            lines.push(format!("#{}: {}", i + 1, c.headline()));
            lines.push(format!("  pattern: {}", c.notes.pattern));
            lines.push(format!("  volume: {}", c.notes.volume));
            lines.push(format!("  efficiency: {}", c.notes.efficiency));
        }
        lines
    }
}

/// Score `mid - range`, `mid` and `mid + range` for one entity and sort the
/// results by the ranking keys. No shuffle and no diversity filter.
pub fn analyze_entity_range(
    entity_id: EntityId,
    middle_threshold: f64,
    logs: &[GameLog],
    season_lines: &[SeasonLine],
    cfg: &AnalysisConfig,
    weights: &ScoringWeights,
) -> Result<RangeAnalysis, SkipReason> {
    let series = entity_series(logs, entity_id);
    if series.len() < MIN_CLEAN_OBSERVATIONS {
        return Err(SkipReason::TooFewGames {
            count: series.len(),
        });
    }
    let line = current_season_line(season_lines, entity_id).ok_or(SkipReason::NoSeasonLine)?;
    let season = line.aggregates().ok_or(SkipReason::ZeroGamesPlayed)?;

    let ctx = EntityContext {
        entity_id,
        entity_name: line.entity_name.clone(),
        group_key: None,
        season,
        efficiency: efficiency_signal(&series, season.efficiency_ratio),
        rest: None,
        roster: None,
    };
    let scorer = ConfidenceScorer::single_entity(weights.clone());
    let thresholds = threshold_band(middle_threshold, cfg.analysis_range);

    let mut candidates = Vec::with_capacity(thresholds.len());
    for &threshold in &thresholds {
        match score_with_context(&series, threshold, &ctx, &scorer) {
            Ok(c) => candidates.push(c),
            Err(reason) => debug!(entity_id, threshold, %reason, "threshold skipped"),
        }
    }
    sort_candidates(&mut candidates);

    Ok(RangeAnalysis {
        entity_id,
        entity_name: line.entity_name.clone(),
        middle_threshold,
        range: cfg.analysis_range,
        thresholds,
        candidates,
    })
}

/// Caller-supplied middle threshold for a slate entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub entity_name: String,
    pub middle_threshold: f64,
}

/// Entity or threshold left out of a slate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipNotice {
    pub entity_name: String,
    #[serde(default)]
    pub threshold: Option<f64>,
    pub reason: SkipReason,
}

impl SkipNotice {
    pub fn line(&self) -> String {
        match self.threshold {
            Some(t) => format!("! {} ({t:.1}): {}, skipped.", self.entity_name, self.reason),
            None => format!("! {}: {}, skipped.", self.entity_name, self.reason),
        }
    }
}

/// Data a slate run reads.
#[derive(Debug, Clone, Copy)]
pub struct SlateInputs<'a> {
    pub slate: &'a Slate,
    /// Entity game logs (any order).
    pub logs: &'a [GameLog],
    /// Team game dates for the rest check.
    pub rest: &'a RestCalendar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlateOutcome {
    pub log_lines: Vec<String>,
    pub top_picks: Vec<Candidate>,
    /// Every scored candidate, ranked.
    pub candidates: Vec<Candidate>,
    pub skipped: Vec<SkipNotice>,
    pub tie_group: usize,
}

fn pick_block(rank: usize, c: &Candidate) -> Vec<String> {
    vec![
        String::new(),
        format!("PICK #{rank} - synergy {:.3}", c.synergy),
        format!(
            "  (pattern: {:.1}% | confidence: {}%)",
            c.break_probability, c.confidence
        ),
        format!("  {} ({:.1} {})", c.entity_name, c.threshold, c.direction),
        format!("  1. pattern: {}", c.notes.pattern),
        format!("  2. volume: {}", c.notes.volume),
        format!("  3. efficiency: {}", c.notes.efficiency),
        format!(
            "  4. fatigue: {}",
            c.notes.fatigue.as_deref().unwrap_or("n/a")
        ),
        format!("  5. roster: {}", c.notes.roster.as_deref().unwrap_or("n/a")),
    ]
}

/// Score every requested entity's threshold band, rank the results and pick the
/// diverse top list.
pub fn score_full_slate<R: Rng + ?Sized>(
    specs: &[CandidateSpec],
    inputs: &SlateInputs<'_>,
    cfg: &AnalysisConfig,
    weights: &ScoringWeights,
    rng: &mut R,
) -> SlateOutcome {
    let scorer = ConfidenceScorer::slate(weights.clone());
    let slate = inputs.slate;
    let mut log_lines = Vec::new();
    let mut skipped = Vec::new();
    let mut candidates = Vec::new();

    let mut skip = |log_lines: &mut Vec<String>, notice: SkipNotice| {
        warn!(entity = %notice.entity_name, threshold = ?notice.threshold, reason = %notice.reason, "skipping");
        log_lines.push(notice.line());
        skipped.push(notice);
    };

    for spec in specs {
        let Some(entry) = slate.entry_by_name(&spec.entity_name) else {
            skip(
                &mut log_lines,
                SkipNotice {
                    entity_name: spec.entity_name.clone(),
                    threshold: None,
                    reason: SkipReason::NotOnSlate,
                },
            );
            continue;
        };

        let series = entity_series(inputs.logs, entry.entity_id());
        if series.len() < MIN_CLEAN_OBSERVATIONS {
            skip(
                &mut log_lines,
                SkipNotice {
                    entity_name: spec.entity_name.clone(),
                    threshold: None,
                    reason: SkipReason::TooFewGames {
                        count: series.len(),
                    },
                },
            );
            continue;
        }

        let Some(season) = entry.season.aggregates() else {
            skip(
                &mut log_lines,
                SkipNotice {
                    entity_name: spec.entity_name.clone(),
                    threshold: None,
                    reason: SkipReason::ZeroGamesPlayed,
                },
            );
            continue;
        };

        let ctx = EntityContext {
            entity_id: entry.entity_id(),
            entity_name: entry.entity_name().to_string(),
            group_key: Some(entry.game_id.clone()),
            season,
            efficiency: efficiency_signal(&series, season.efficiency_ratio),
            rest: Some(rest_status(
                inputs.rest,
                entry.season.team_id,
                entry.opponent_team_id,
                slate.date,
            )),
            roster: Some(roster_delta(
                &entry.season,
                &slate.active_pool,
                &slate.injured,
                cfg.key_teammates_per_team,
            )),
        };

        for threshold in threshold_band(spec.middle_threshold, cfg.analysis_range) {
            match score_with_context(&series, threshold, &ctx, &scorer) {
                Ok(c) => {
                    debug!(
                        entity = %c.entity_name,
                        threshold,
                        probability = c.break_probability,
                        confidence = c.confidence,
                        "candidate scored"
                    );
                    candidates.push(c);
                }
                Err(reason) => skip(
                    &mut log_lines,
                    SkipNotice {
                        entity_name: spec.entity_name.clone(),
                        threshold: Some(threshold),
                        reason,
                    },
                ),
            }
        }
    }

    log_lines.push(format!(
        "Analysis finished: {} candidate(s) scored.",
        candidates.len()
    ));

    if candidates.is_empty() {
        log_lines.push("No candidates to rank.".to_string());
        info!(skipped = skipped.len(), "slate produced no candidates");
        return SlateOutcome {
            log_lines,
            top_picks: Vec::new(),
            candidates,
            skipped,
            tie_group: 0,
        };
    }

    log_lines.push("Ranking: 1. synergy, 2. pattern probability, 3. confidence".to_string());
    let ranking = rank_candidates(candidates, rng);
    if ranking.had_tie() {
        log_lines.push(format!(
            "WARNING: {} top candidates share an identical score; tied group shuffled.",
            ranking.tie_group
        ));
    }

    let top_picks = select_diverse(
        &ranking.ranked,
        cfg.top_picks,
        cfg.minimum_pattern_probability,
    );
    if top_picks.is_empty() {
        log_lines.push(format!(
            "No candidates with pattern probability >= {:.1}% from distinct games.",
            cfg.minimum_pattern_probability
        ));
    } else {
        log_lines.push(format!("TOP {} PICKS (distinct games)", cfg.top_picks));
        for (i, c) in top_picks.iter().enumerate() {
            log_lines.extend(pick_block(i + 1, c));
        }
    }

    info!(
        candidates = ranking.ranked.len(),
        top_picks = top_picks.len(),
        skipped = skipped.len(),
        "slate scored"
    );

    SlateOutcome {
        log_lines,
        top_picks,
        candidates: ranking.ranked,
        skipped,
        tie_group: ranking.tie_group,
    }
}
