use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use serde::Serialize;

use forja_lib::commands;
use forja_lib::config::settings::{get_app_config, log_config_source};
use forja_lib::logging::init_logging;
use forja_lib::notify::{ensure_reflection_reminder, LogScheduler, ReminderScheduler, ReminderSpec, TokioScheduler};
use forja_lib::state::app::AppState;

#[derive(Parser)]
#[command(name = "forja")]
#[command(version, about = "Forja - forge your will, one day at a time")]
struct Cli {
    /// SQLite database to use instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        title: String,
        /// Trabajo, Salud, Estudio, Personal or Otros
        #[arg(short, long, default_value = "Otros")]
        category: String,
        /// YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
        /// HH:MM reminder time
        #[arg(short = 't', long)]
        due: Option<String>,
    },

    /// List the tasks and rituals of a day
    List {
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Mark a task completed
    Done { id: i64 },

    /// Mark a completed task pending again
    Undo { id: i64 },

    /// Delete a task
    Delete { id: i64 },

    /// Close a day and update the streak
    Close {
        #[arg(short, long)]
        date: Option<String>,
        /// How the day went
        #[arg(short, long)]
        reflection: Option<String>,
    },

    /// Show the Forja Index
    Index,

    /// Show the weekly trend report
    Report {
        /// Reference date (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Show the mascot
    Mascot,

    /// Show experience and category levels
    Stats,

    /// Show recent daily logs
    History {
        #[arg(short, long, default_value = "7")]
        limit: usize,
    },

    /// Show achievements
    Achievements,

    /// Show the annual recap
    Recap {
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Manage daily rituals
    Rituals {
        #[command(subcommand)]
        action: Option<RitualAction>,
    },

    /// Show the phrase of the day
    Phrase,

    /// Show the oldest day that still needs closing
    Pending,

    /// Stay in the foreground and deliver reminders until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum RitualAction {
    /// List today's rituals
    List {
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Add a ritual
    Add {
        title: String,
        #[arg(short, long, default_value = "Otros")]
        category: String,
        #[arg(short = 't', long)]
        due: Option<String>,
    },
    /// Mark a ritual done for a day
    Done {
        id: i64,
        #[arg(short, long)]
        date: Option<String>,
    },
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn check(mark: bool) -> &'static str {
    if mark {
        "[x]"
    } else {
        "[ ]"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = get_app_config().clone();
    if let Some(db) = cli.db.clone() {
        config.database_path = Some(db);
    }
    init_logging(&config);
    log_config_source();

    // one-shot commands exit before anything could fire
    let reminders: Arc<dyn ReminderScheduler> = match cli.command {
        Commands::Watch => Arc::new(TokioScheduler::new()),
        _ => Arc::new(LogScheduler::new()),
    };
    let state = AppState::open(config, reminders).context("Failed to open the Forja database")?;
    run(&state, cli).await
}

async fn run(state: &AppState, cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Add {
            title,
            category,
            date,
            due,
        } => {
            let task = commands::add_task(state, &title, &category, date.as_deref(), due.as_deref())
                .map_err(anyhow::Error::msg)?;
            emit(json, &task, |t| {
                println!("Added task {} '{}' ({}) for {}", t.id, t.title, t.category, t.date)
            })
        }
        Commands::List { date } => {
            let day = commands::list_day(state, date.as_deref()).map_err(anyhow::Error::msg)?;
            emit(json, &day, |d| {
                println!("{}  {}/{} ({}%)", d.date, d.stats.completed, d.stats.total, d.stats.percentage);
                for t in &d.tasks {
                    println!("  {} {:>4}  {} [{}]", check(t.completed), t.id, t.title, t.category);
                }
                for r in &d.rituals {
                    let note = if r.expired { " (expired)" } else { "" };
                    println!("  {} {:>4}  {} [ritual]{}", check(r.completed), r.ritual_id, r.title, note);
                }
            })
        }
        Commands::Done { id } => {
            let change = commands::complete_task(state, id).map_err(anyhow::Error::msg)?;
            emit(json, &change, |c| match &c.stats {
                Some(stats) => println!("Completed '{}'. Total experience: {}", c.task.title, stats.total_exp),
                None => println!("'{}' was already completed", c.task.title),
            })
        }
        Commands::Undo { id } => {
            let change = commands::reopen_task(state, id).map_err(anyhow::Error::msg)?;
            emit(json, &change, |c| match &c.stats {
                Some(stats) => println!("Reopened '{}'. Total experience: {}", c.task.title, stats.total_exp),
                None => println!("'{}' was not completed", c.task.title),
            })
        }
        Commands::Delete { id } => {
            commands::delete_task(state, id).map_err(anyhow::Error::msg)?;
            emit(json, &id, |id| println!("Deleted task {}", id))
        }
        Commands::Close { date, reflection } => {
            let closure = commands::close_day(state, date.as_deref(), reflection).map_err(anyhow::Error::msg)?;
            emit(json, &closure, |c| {
                let verdict = if c.goal_met { "goal met" } else { "goal missed" };
                println!(
                    "Closed {}: {}/{} ({}). Streak {} (best {})",
                    c.log.date, c.log.completed_count, c.log.total_count, verdict, c.streak.current, c.streak.best
                );
            })
        }
        Commands::Index => {
            let index = commands::get_forja_index(state).map_err(anyhow::Error::msg)?;
            emit(json, &index, |i| {
                println!(
                    "Forja Index {} (completion {}%, streak bonus {}%)",
                    i.index, i.avg_completion, i.streak_bonus
                )
            })
        }
        Commands::Report { date } => {
            let report = commands::get_weekly_report(state, date.as_deref()).map_err(anyhow::Error::msg)?;
            emit(json, &report, |r| {
                println!("{} .. {}", r.start_date, r.end_date);
                println!("Completion {}% ({}/{}), trend {:?}", r.avg_completion, r.completed_tasks, r.total_tasks, r.trend);
                println!("Best day {}, weakest day {}", r.peak_day, r.weak_day);
                println!("{}", r.sentiment_summary);
                println!("{}", r.advice);
            })
        }
        Commands::Mascot => {
            let mascot = commands::get_mascot(state).map_err(anyhow::Error::msg)?;
            emit(json, &mascot, |m| {
                println!("Varko: {} / {}", m.stage.label(), m.mood.label());
                println!("{}", m.description);
                println!("{}", m.message);
            })
        }
        Commands::Stats => {
            let stats = commands::get_stats(state).map_err(anyhow::Error::msg)?;
            emit(json, &stats, |s| {
                println!(
                    "Strength {}  Discipline {}  Wisdom {}  Total {}",
                    s.stats.strength, s.stats.discipline, s.stats.wisdom, s.stats.total_exp
                );
                for c in &s.categories {
                    let done = s.completed_by_category.get(&c.name).copied().unwrap_or(0);
                    println!("  {:<9} level {:>2}  exp {:>5}  completed {}", c.name, c.level, c.exp, done);
                }
            })
        }
        Commands::History { limit } => {
            let logs = commands::get_history(state, limit).map_err(anyhow::Error::msg)?;
            emit(json, &logs, |logs| {
                for l in logs {
                    println!("{}  {}/{}  {}", l.date, l.completed_count, l.total_count, l.reflection.as_deref().unwrap_or(""));
                }
            })
        }
        Commands::Achievements => {
            let list = commands::get_achievements(state).map_err(anyhow::Error::msg)?;
            emit(json, &list, |list| {
                for a in list {
                    println!("{} {} {} - {}", check(a.unlocked), a.icon, a.title, a.description);
                }
            })
        }
        Commands::Recap { year } => {
            let recap = commands::get_annual_recap(state, year).map_err(anyhow::Error::msg)?;
            emit(json, &recap, |r| {
                println!("{}: {} tasks completed, {} perfect days", r.year, r.total_tasks_completed, r.perfect_days);
                println!("Golden month: {} ({}%)", r.golden_month, r.golden_month_rate);
                println!("Varko reached: {}", r.mascot_stage.label());
            })
        }
        Commands::Rituals { action } => match action.unwrap_or(RitualAction::List { date: None }) {
            RitualAction::List { date } => {
                let items = commands::get_rituals(state, date.as_deref()).map_err(anyhow::Error::msg)?;
                emit(json, &items, |items| {
                    for r in items {
                        let note = if r.expired { " (expired)" } else { "" };
                        println!("{} {:>4}  {}{}", check(r.completed), r.ritual_id, r.title, note);
                    }
                })
            }
            RitualAction::Add { title, category, due } => {
                let ritual = commands::add_ritual(state, &title, &category, due.as_deref())
                    .map_err(anyhow::Error::msg)?;
                emit(json, &ritual, |r| println!("Added ritual {} '{}'", r.id, r.title))
            }
            RitualAction::Done { id, date } => {
                commands::complete_ritual(state, id, date.as_deref()).map_err(anyhow::Error::msg)?;
                emit(json, &id, |id| println!("Ritual {} done", id))
            }
        },
        Commands::Phrase => {
            let phrase = commands::get_daily_phrase(state).await.map_err(anyhow::Error::msg)?;
            emit(json, &phrase, |p| match p {
                Some(p) => println!("\"{}\" - {}", p.phrase, p.author),
                None => println!("No phrase available today"),
            })
        }
        Commands::Pending => {
            let pending = commands::get_pending_closure(state).map_err(anyhow::Error::msg)?;
            emit(json, &pending, |p| match p {
                Some(date) => println!("{} was never closed", date),
                None => println!("Every past day is closed"),
            })
        }
        Commands::Watch => watch(state).await,
    }
}

/// Foreground reminder loop
async fn watch(state: &AppState) -> Result<()> {
    let today = Local::now().date_naive();
    ensure_reflection_reminder(state.reminders(), state.config.reflection_reminder());
    forja_lib::tasks::refresh_task_prompt(state, today)?;
    for task in forja_lib::tasks::tasks_for(state, today)? {
        if task.completed {
            continue;
        }
        if let Some(spec) = ReminderSpec::for_task(&task) {
            state.reminders().schedule_reminder(spec);
        }
    }
    tracing::info!(date = %today, "Watching reminders, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    let metrics = state.metrics.snapshot();
    tracing::info!(metrics = ?metrics, "Forja watch stopped");
    Ok(())
}
