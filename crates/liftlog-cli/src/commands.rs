//! Command handlers.
//!
//! Each workout edit hydrates a `WorkoutBuilder`, applies one change, and
//! saves. The queued write is handed to the app so `main` can settle it.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use liftlog_core::database::exercises::parse_id;
use liftlog_core::database::ExerciseTable;
use liftlog_core::utils::{cmp_ignore_case, format_date, format_set_line, truncate_string};
use liftlog_core::{
    BuildError, Config, Exercise, ExerciseResolver, LogBuilder, MuscleGroup, SetPosition,
    WeightUnit, Workout, WorkoutBuilder,
};

use crate::app::App;
use crate::cli::{ExerciseCommand, HistoryCommand, LoggedSetArg, WorkoutCommand};

/// Column width for exercise names in listings
const NAME_WIDTH: usize = 28;

fn parse_muscles(csv: &str) -> Result<Vec<MuscleGroup>> {
    csv.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<MuscleGroup>().map_err(anyhow::Error::msg))
        .collect()
}

fn row_id(id: &str) -> Result<i64> {
    parse_id(id).ok_or_else(|| BuildError::ExerciseNotFound(id.to_string()).into())
}

/// Names of workouts with a set on exercise row `row`, however its id was written.
fn referencing_workouts<'w>(workouts: impl Iterator<Item = &'w Workout>, row: i64) -> Vec<&'w str> {
    workouts
        .filter(|w| w.exercise_ids().any(|e| parse_id(e) == Some(row)))
        .map(|w| w.name.as_str())
        .collect()
}

fn groups_label(exercise: &Exercise) -> String {
    if exercise.muscle_groups.is_empty() {
        String::new()
    } else {
        format!("[{}]", exercise.muscle_groups_csv())
    }
}

// ===== Exercises =====

pub fn exercise(app: &mut App, command: ExerciseCommand) -> Result<()> {
    match command {
        ExerciseCommand::Add { name, muscles } => {
            let groups = parse_muscles(muscles.as_deref().unwrap_or(""))?;
            let exercise = app.db.exercises().insert(&name, &groups)?;
            println!("Added exercise {}: {}", exercise.id, exercise.name);
        }
        ExerciseCommand::List { muscle } => {
            let filter = muscle
                .as_deref()
                .map(str::parse::<MuscleGroup>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let exercises = app.db.exercises().list()?;
            for exercise in exercises
                .iter()
                .filter(|e| filter.map_or(true, |g| e.trains(g)))
            {
                println!(
                    "{:>4}  {:<width$}  {}",
                    exercise.id,
                    truncate_string(&exercise.name, NAME_WIDTH),
                    groups_label(exercise),
                    width = NAME_WIDTH
                );
            }
        }
        ExerciseCommand::Rename { id, name, muscles } => {
            let table = app.db.exercises();
            let row = row_id(&id)?;
            let groups = match muscles {
                Some(csv) => parse_muscles(&csv)?,
                None => table.get(row)?.muscle_groups,
            };
            let exercise = table.update(row, &name, &groups)?;
            println!("Renamed exercise {} to {}", exercise.id, exercise.name);
        }
        ExerciseCommand::Delete { id } => {
            let row = row_id(&id)?;
            let history = app.db.exercises().delete(row)?;
            println!("Deleted exercise {} and {} history record(s)", row, history);

            let referencing = referencing_workouts(app.workouts.values(), row);
            if !referencing.is_empty() {
                warn!(exercise = row, workouts = referencing.len(), "Deleted exercise is still referenced");
                println!(
                    "Still referenced by: {}. Remove it from those workouts before opening them.",
                    referencing.join(", ")
                );
            }
        }
    }
    Ok(())
}

// ===== Workouts =====

/// Hydrate `id`, apply `edit`, save, and track the write.
fn edit_workout<F>(app: &mut App, id: &str, edit: F) -> Result<Workout>
where
    F: FnOnce(&mut WorkoutBuilder<'_, ExerciseTable<'_>>) -> Result<(), BuildError>,
{
    let saved = {
        let exercises = app.db.exercises();
        let mut builder = WorkoutBuilder::from_id(&exercises, &app.workouts, id)?;
        edit(&mut builder)?;
        builder.save(&mut app.workouts)?
    };
    app.track(saved.write);
    Ok(saved.workout)
}

fn print_workout<R: ExerciseResolver + ?Sized>(builder: &WorkoutBuilder<'_, R>) {
    println!("{} ({})", builder.name(), builder.id());
    for (i, set) in builder.sets().iter().enumerate() {
        println!(
            "{:>3}. {:<width$}  x{}",
            i + 1,
            truncate_string(&set.exercise.name, NAME_WIDTH),
            set.sets,
            width = NAME_WIDTH
        );
    }
}

pub fn workout(app: &mut App, command: WorkoutCommand) -> Result<()> {
    match command {
        WorkoutCommand::List => {
            let mut workouts: Vec<&Workout> = app.workouts.values().collect();
            workouts.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name));
            for w in workouts {
                println!(
                    "{:<20}  {}  ({} exercises, {} sets)",
                    w.id,
                    w.name,
                    w.sets.len(),
                    w.total_sets()
                );
            }
        }
        WorkoutCommand::Show { id } => {
            let exercises = app.db.exercises();
            let builder = WorkoutBuilder::from_id(&exercises, &app.workouts, &id)?;
            print_workout(&builder);
        }
        WorkoutCommand::Create { name, exercises } => {
            if app.workouts.name_exists(&name) {
                bail!("A workout named '{}' already exists", name);
            }
            let saved = {
                let table = app.db.exercises();
                let mut builder = WorkoutBuilder::empty(&table);
                builder.set_name(name);
                for exercise in &exercises {
                    builder.add_exercise(exercise, SetPosition::End)?;
                }
                builder.save(&mut app.workouts)?
            };
            println!("Created workout {} ({})", saved.workout.name, saved.workout.id);
            app.track(saved.write);
        }
        WorkoutCommand::Add {
            workout,
            exercise,
            at,
            replace,
        } => {
            let position = match (at, replace) {
                (Some(i), _) => SetPosition::Index(i),
                (None, Some(i)) => SetPosition::Replace(i),
                (None, None) => SetPosition::End,
            };
            let saved = edit_workout(app, &workout, |b| b.add_exercise(&exercise, position))?;
            println!("{} now has {} exercise(s)", saved.name, saved.sets.len());
        }
        WorkoutCommand::Remove { workout, position } => {
            let saved = edit_workout(app, &workout, |b| b.remove_set(position).map(|_| ()))?;
            println!("{} now has {} exercise(s)", saved.name, saved.sets.len());
        }
        WorkoutCommand::Count {
            workout,
            position,
            count,
        } => {
            edit_workout(app, &workout, |b| b.update_set_count(position, count))?;
            println!("Set {} of {} now has {} set(s)", position + 1, workout, count);
        }
        WorkoutCommand::Rename { workout, name } => {
            let saved = edit_workout(app, &workout, |b| {
                b.set_name(name);
                Ok(())
            })?;
            println!("Renamed {} to {}", saved.id, saved.name);
        }
        WorkoutCommand::Delete { workout } => {
            if !app.workouts.has(&workout) {
                return Err(BuildError::WorkoutNotFound(workout).into());
            }
            let write = app.workouts.delete(&workout)?;
            app.track(write);
            println!("Deleted workout {}", workout);
        }
    }
    Ok(())
}

// ===== Logging =====

pub fn log(app: &mut App, workout: &str, sets: &[LoggedSetArg], date: Option<String>) -> Result<()> {
    let date = match date {
        Some(d) => {
            NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", d))?;
            d
        }
        None => chrono::Local::now().format("%Y-%m-%d").to_string(),
    };

    let exercises = app.db.exercises();
    let builder = WorkoutBuilder::from_id(&exercises, &app.workouts, workout)?;
    let mut log = LogBuilder::from_workout(builder.workout());

    for set in sets {
        log.record_next(set.entry, set.reps, set.weight)?;
    }

    let entries = log.to_history(&date);
    if entries.is_empty() {
        bail!("Nothing to log: pass at least one --set EXERCISE:REPS@WEIGHT");
    }

    let session = log.commit(&app.db.history(), &date)?;
    debug!(session = ?session, workout, "Logged session");

    let unit = app.config.weight_unit.to_string();
    println!("Logged {} on {}", builder.name(), format_date(&date));
    for entry in log.entries().iter().filter(|e| e.rows.iter().any(|r| r.is_done())) {
        println!("{}", entry.exercise.name);
        for (i, row) in entry.rows.iter().filter(|r| r.is_done()).enumerate() {
            println!("  {}", format_set_line(i, row.weight, &unit, row.reps));
        }
    }
    Ok(())
}

// ===== History =====

pub fn history(app: &mut App, command: HistoryCommand) -> Result<()> {
    let history = app.db.history();
    let unit = app.config.weight_unit.to_string();

    match command {
        HistoryCommand::Exercise { id } => {
            let exercise = app.db.exercises().get(row_id(&id)?)?;
            let records = history.list_for_exercise(&id)?;
            if records.is_empty() {
                println!("No history was found for {}", exercise.name);
            }
            for record in records {
                println!("{}  #{}", format_date(&record.date), record.id);
                for (i, (reps, weight)) in record.reps.iter().zip(&record.weight).enumerate() {
                    println!("  {}", format_set_line(i, *weight, &unit, *reps));
                }
            }
        }
        HistoryCommand::Workout { id } => {
            let sessions = history.list_for_workout(&id)?;
            if sessions.is_empty() {
                println!("No history was found for {}", id);
            }
            for session in sessions {
                println!("{}  session #{}", format_date(&session.date), session.id);
                for entry in history.entries_for_session(session.id)? {
                    println!(
                        "  {:<width$}  {} set(s), {} {} volume",
                        truncate_string(&entry.exercise_name, NAME_WIDTH),
                        entry.set_count(),
                        entry.volume(),
                        unit,
                        width = NAME_WIDTH
                    );
                }
            }
        }
        HistoryCommand::DeleteSession { id } => {
            let entries = history.delete_workout_history(id)?;
            println!("Deleted session {} and {} entr(ies)", id, entries);
        }
        HistoryCommand::DeleteEntry { id } => {
            history.delete_exercise_history(id)?;
            println!("Deleted history entry {}", id);
        }
        HistoryCommand::Clear { exercise } => {
            let removed = history.delete_for_exercise(row_id(&exercise)?)?;
            println!("Deleted {} history record(s) for exercise {}", removed, exercise);
        }
    }
    Ok(())
}

// ===== Settings =====

/// Print the settings, or update and save them when any flag is given.
pub fn config(mut config: Config, unit: Option<WeightUnit>, store_dir: Option<String>) -> Result<()> {
    if unit.is_none() && store_dir.is_none() {
        println!("weight_unit = {}", config.weight_unit);
        println!("data_dir    = {}", config.data_dir()?.display());
        return Ok(());
    }

    if let Some(unit) = unit {
        config.weight_unit = unit;
    }
    if let Some(dir) = store_dir {
        config.data_dir = Some(dir.into());
    }
    config.save().context("Failed to save config")?;
    println!("Saved settings");
    Ok(())
}
