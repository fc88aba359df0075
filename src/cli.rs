//! Command-line surface over a JSON data directory.
//!
//! Commands:
//! - `streaks`: threshold streaks and break probability for one player
//! - `player`: three-threshold range analysis for one player
//! - `team`: team points streaks plus win/loss runs
//! - `slate`: score the day's slate and record the ranked run
//! - `backtest`: settle recorded runs against realized results

pub mod output;

use anyhow::{anyhow, bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::analysis::slate::{entity_series, find_entity_id};
use crate::analysis::{
    analyze_entity_range, analyze_team, build_slate, effective_slate_date, estimate_reversion,
    evaluate_all, evaluate_backtest, extract_streaks, score_full_slate, tie_break_rng,
    CandidateSpec, Reversion, SlateInputs, StreakReport,
};
use crate::config::AppConfig;
use crate::domain::Metric;
use crate::persistence::{read_candidate_specs, AnalysisLogStore, SharedDataset, ThresholdCache};
use output::{BacktestRow, CandidateRow, OutputMode, StreakRow};

#[derive(Parser, Debug)]
#[command(name = "streakline")]
#[command(version, about = "Threshold streak analysis and confidence ranking", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and environment overrides
    #[arg(short, long, default_value = "config", global = true)]
    pub config: PathBuf,

    /// Data directory (overrides storage.data_dir)
    #[arg(long, env = "STREAKLINE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Threshold streaks and break probability for one player
    Streaks {
        /// Player name as it appears in the season lines
        name: String,
        /// Threshold the series is classified against
        threshold: f64,
        #[arg(long, value_enum, default_value = "points")]
        metric: MetricArg,
    },
    /// Score a player's threshold band (volume and efficiency only)
    Player {
        name: String,
        /// Middle threshold of the band
        threshold: f64,
    },
    /// Team points streaks and win/loss runs
    Team {
        name: String,
        threshold: f64,
    },
    /// Score the day's slate and record the ranked run
    Slate {
        /// TOML file with a [thresholds] table; cached thresholds are used when omitted
        #[arg(short, long)]
        lines: Option<PathBuf>,
        /// Slate date (defaults to the schedule's date, then today's slate)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Seed for the tie-break shuffle
        #[arg(long)]
        seed: Option<u64>,
        /// Do not record the run in the analysis log
        #[arg(long)]
        no_save: bool,
    },
    /// Settle recorded runs against realized results
    Backtest {
        /// Recorded date (defaults to the newest)
        #[arg(long, conflicts_with = "all")]
        date: Option<NaiveDate>,
        /// Aggregate every recorded date
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    Points,
    FgPct,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Points => Metric::Points,
            MetricArg::FgPct => Metric::FieldGoalPct,
        }
    }
}

/// Everything a command needs besides its own arguments.
pub struct CommandContext {
    pub config: AppConfig,
    pub data: SharedDataset,
    pub mode: OutputMode,
}

impl CommandContext {
    /// Resolve the data directory and load the dataset snapshot.
    pub async fn load(cli: &Cli, mut config: AppConfig) -> anyhow::Result<Self> {
        if let Some(dir) = &cli.data_dir {
            config.storage.data_dir = dir.clone();
        }
        let data = SharedDataset::default();
        data.refresh_from(&config.storage.data_dir)
            .await
            .with_context(|| {
                format!("loading data from {}", config.storage.data_dir.display())
            })?;
        Ok(Self {
            config,
            data,
            mode: OutputMode::from_json_flag(cli.json),
        })
    }
}

pub async fn run_command(command: &Commands, ctx: &CommandContext) -> anyhow::Result<()> {
    match command {
        Commands::Streaks {
            name,
            threshold,
            metric,
        } => show_streaks(ctx, name, *threshold, (*metric).into()).await,
        Commands::Player { name, threshold } => show_player_range(ctx, name, *threshold).await,
        Commands::Team { name, threshold } => show_team(ctx, name, *threshold).await,
        Commands::Slate {
            lines,
            date,
            seed,
            no_save,
        } => run_slate(ctx, lines.as_ref(), *date, *seed, *no_save).await,
        Commands::Backtest { date, all } => {
            if *all {
                run_backtest_all(ctx).await
            } else {
                run_backtest(ctx, *date).await
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct StreaksOutput<'a> {
    entity_name: &'a str,
    metric: Metric,
    report: &'a StreakReport,
    reversion: Option<Reversion>,
}

async fn show_streaks(
    ctx: &CommandContext,
    name: &str,
    threshold: f64,
    metric: Metric,
) -> anyhow::Result<()> {
    let data = ctx.data.read().await;
    let entity_id = find_entity_id(&data.season_lines, name)
        .ok_or_else(|| anyhow!("unknown player: {name}"))?;
    let series = entity_series(&data.player_logs, entity_id);
    let report = extract_streaks(&series, metric, threshold);
    let reversion = report.analysis().map(estimate_reversion);

    if ctx.mode.is_json() {
        return output::print_json(&StreaksOutput {
            entity_name: name,
            metric,
            report: &report,
            reversion,
        });
    }

    let Some(analysis) = report.analysis() else {
        output::print_warn(&format!(
            "{name}: fewer than 3 usable {} values, no streaks.",
            metric.as_str()
        ));
        return Ok(());
    };

    output::print_kv("Player", name);
    output::print_kv("Threshold", &format!("{threshold:.1} {}", metric.as_str()));
    output::print_kv(
        "Games",
        &format!(
            "{} ({} above, {} below, {} dropped)",
            analysis.total, analysis.total_above, analysis.total_below, analysis.dropped
        ),
    );
    output::print_kv("Pattern", &analysis.pattern);
    let last = analysis.streaks.len().saturating_sub(1);
    let rows: Vec<StreakRow> = analysis
        .streaks
        .iter()
        .enumerate()
        .map(|(i, s)| StreakRow::from_streak(s, i == last))
        .collect();
    output::print_items(&rows, ctx.mode)?;
    if let Some(r) = reversion {
        println!("{}", r.describe());
        output::print_kv("Next game lean", r.direction().as_str());
    }
    Ok(())
}

async fn show_player_range(ctx: &CommandContext, name: &str, threshold: f64) -> anyhow::Result<()> {
    let data = ctx.data.read().await;
    let entity_id = find_entity_id(&data.season_lines, name)
        .ok_or_else(|| anyhow!("unknown player: {name}"))?;
    let range = analyze_entity_range(
        entity_id,
        threshold,
        &data.player_logs,
        &data.season_lines,
        &ctx.config.analysis,
        &ctx.config.scoring,
    )
    .map_err(|reason| anyhow!("{name}: {reason}"))?;

    if ctx.mode.is_json() {
        return output::print_json(&range);
    }
    output::print_lines(&range.report_lines());
    println!();
    output::print_items(&CandidateRow::ranked(&range.candidates), ctx.mode)
}

async fn show_team(ctx: &CommandContext, name: &str, threshold: f64) -> anyhow::Result<()> {
    let data = ctx.data.read().await;
    let series = data.team_series(name);
    if series.is_empty() {
        bail!("unknown team: {name}");
    }
    let report = analyze_team(name, &series, threshold);
    if ctx.mode.is_json() {
        return output::print_json(&report);
    }
    output::print_lines(&report.report_lines());
    Ok(())
}

async fn run_slate(
    ctx: &CommandContext,
    lines: Option<&PathBuf>,
    date: Option<NaiveDate>,
    seed: Option<u64>,
    no_save: bool,
) -> anyhow::Result<()> {
    let cfg = &ctx.config;
    let data = ctx.data.read().await;

    let date = date
        .or(data.schedule.date)
        .unwrap_or_else(|| effective_slate_date(&Local::now(), cfg.analysis.rollover_hour));
    let injured = data.injured_set();
    let slate = build_slate(
        date,
        &data.schedule,
        &data.season_lines,
        &data.player_logs,
        &injured,
        &cfg.analysis,
    );
    output::print_lines(&slate.notes);
    if slate.is_empty() {
        output::print_warn(&format!("No slate entries for {date}."));
        return Ok(());
    }

    let cache = ThresholdCache::new(cfg.storage.cache_path());
    cache.load().await?;
    let reset = cache.sync_key(&slate.entity_key()).await;
    let specs: Vec<CandidateSpec> = match lines {
        Some(path) => {
            let specs = read_candidate_specs(path)
                .await
                .with_context(|| format!("reading thresholds from {}", path.display()))?;
            cache.remember(&specs).await;
            specs
        }
        None => {
            let specs = cache.specs().await;
            if specs.is_empty() {
                let why = if reset { " (entity list changed)" } else { "" };
                bail!("no cached thresholds for this slate{why}; pass --lines");
            }
            debug!(count = specs.len(), "using cached thresholds");
            specs
        }
    };
    cache.save().await?;

    let rest = data.rest_calendar();
    let inputs = SlateInputs {
        slate: &slate,
        logs: &data.player_logs,
        rest: &rest,
    };
    let mut rng = tie_break_rng(seed.or(cfg.analysis.tie_break_seed));
    let outcome = score_full_slate(&specs, &inputs, &cfg.analysis, &cfg.scoring, &mut rng);
    info!(
        %date,
        candidates = outcome.candidates.len(),
        picks = outcome.top_picks.len(),
        skipped = outcome.skipped.len(),
        "slate scored"
    );

    if !no_save {
        let log = AnalysisLogStore::new(cfg.storage.log_path());
        log.load().await?;
        log.record(
            date,
            cfg.analysis.minimum_pattern_probability,
            outcome.candidates.clone(),
        )
        .await;
        log.save().await?;
    }

    if ctx.mode.is_json() {
        return output::print_json(&outcome);
    }
    output::print_lines(&outcome.log_lines);
    println!();
    output::print_success(&format!("Top picks for {date}"));
    output::print_items(&CandidateRow::ranked(&outcome.top_picks), ctx.mode)?;
    if !no_save {
        output::print_kv("Recorded", &cfg.storage.log_path().display().to_string());
    }
    Ok(())
}

async fn run_backtest(ctx: &CommandContext, date: Option<NaiveDate>) -> anyhow::Result<()> {
    let cfg = &ctx.config;
    let log = AnalysisLogStore::new(cfg.storage.log_path());
    log.load().await?;

    let date = match date {
        Some(d) => d,
        None => log
            .dates()
            .await
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("analysis log is empty"))?,
    };
    let entry = log
        .get(date)
        .await
        .ok_or_else(|| anyhow!("no recorded analysis for {date}"))?;

    let outcomes = ctx.data.read().await.realized_points();
    let report = evaluate_backtest(
        &entry.candidates,
        &outcomes,
        entry.min_probability,
        cfg.analysis.backtest_top_k,
    );

    if ctx.mode.is_json() {
        return output::print_json(&report);
    }
    output::print_kv("Date", &date.to_string());
    output::print_success(&format!("Top {}", report.summary.k));
    let top: Vec<BacktestRow> = report.top.iter().map(BacktestRow::from_entry).collect();
    output::print_items(&top, ctx.mode)?;
    if !report.others.is_empty() {
        println!();
        output::print_kv("Other candidates", &report.others.len().to_string());
        let others: Vec<BacktestRow> = report.others.iter().map(BacktestRow::from_entry).collect();
        output::print_items(&others, ctx.mode)?;
    }
    println!();
    output::print_lines(&report.summary_lines());
    Ok(())
}

async fn run_backtest_all(ctx: &CommandContext) -> anyhow::Result<()> {
    let cfg = &ctx.config;
    let log = AnalysisLogStore::new(cfg.storage.log_path());
    log.load().await?;
    let entries = log.entries().await;
    if entries.is_empty() {
        bail!("analysis log is empty");
    }

    let outcomes = ctx.data.read().await.realized_points();
    let summary = evaluate_all(
        entries
            .values()
            .map(|e| (e.candidates.as_slice(), e.min_probability)),
        &outcomes,
        cfg.analysis.backtest_top_k,
    );

    if ctx.mode.is_json() {
        return output::print_json(&summary);
    }
    output::print_kv("Dates", &entries.len().to_string());
    output::print_lines(&summary.lines());
    Ok(())
}
