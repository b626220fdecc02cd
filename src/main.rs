use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand, ValueEnum};
use crossterm::{
    cursor, execute, queue,
    style::Print,
    terminal::{self, disable_raw_mode, enable_raw_mode, ClearType},
    tty::IsTty,
};
use liftlog::{
    config::{Config, ConfigStore, FileConfigStore},
    drag::{move_item, to_flat_drag_list, DragItem, DragItemKind},
    logging,
    model::{
        DropSetType, Exercise, ExerciseItem, GroupType, Set, SetRef, SetType, WeightUnit, Workout,
    },
    rest_timer::RestTimer,
    runtime::{
        CrosstermEventSource, FixedTicker, Runner, SessionEventSource, TestEventSource, Ticker,
    },
    store::{FileWorkoutStore, WorkoutStore},
    tree,
    util::format_clock,
    Error, WorkoutSession,
};
use std::{
    cell::RefCell,
    error::Error as StdError,
    fmt::Write as _,
    io::{self, stdin, Write},
    path::PathBuf,
    rc::Rc,
    sync::mpsc,
    time::Instant,
};
use unicode_width::UnicodeWidthStr;

const BAR_WIDTH: usize = 20;

/// log a workout from the terminal: sets, dropsets, supersets and rest timers
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Log a workout from the terminal. Exercises and sets can be grouped into dropsets and supersets, reordered, and rested between with a live countdown."
)]
pub struct Cli {
    /// workout file to operate on (defaults to the state directory)
    #[clap(short = 'f', long, global = true)]
    file: Option<PathBuf>,

    /// config file to use instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// start a new workout, replacing the current one
    New {
        #[clap(default_value = "Workout")]
        name: String,
    },
    /// print the workout tree
    Show,
    /// print the rows used for reordering, numbered for `move`
    Flat,
    /// append an exercise, optionally into an existing group
    AddExercise {
        name: String,
        #[clap(short, long, default_value = "General")]
        category: String,
        /// group instance id to add into
        #[clap(short, long)]
        group: Option<String>,
    },
    /// append a set to an exercise
    AddSet {
        exercise: String,
        #[clap(short, long)]
        weight: Option<f64>,
        #[clap(short, long)]
        reps: Option<u32>,
        /// rest period in seconds (0 for none; defaults to the configured rest)
        #[clap(long)]
        rest: Option<u32>,
        #[clap(long, value_enum, default_value_t = SetKind::Working)]
        kind: SetKind,
    },
    /// toggle a set's completed flag
    Complete {
        exercise: String,
        set: String,
        /// run the rest countdown straight away if one starts
        #[clap(long)]
        wait: bool,
    },
    /// group consecutive sets of one exercise into a dropset
    Dropset {
        exercise: String,
        #[clap(num_args = 0..)]
        sets: Vec<String>,
        /// dropset id to edit; the listed sets become its exact membership
        #[clap(long)]
        edit: Option<String>,
        #[clap(long, value_enum)]
        kind: Option<DropKind>,
    },
    /// group exercises into a superset or HIIT block
    Group {
        #[clap(num_args = 0..)]
        exercises: Vec<String>,
        /// group id to edit; the listed exercises become its exact membership
        #[clap(long)]
        edit: Option<String>,
        #[clap(long, value_enum)]
        kind: Option<GroupKind>,
    },
    /// dissolve a group back into plain exercises
    Ungroup { group: String },
    /// move a row of `flat` output to another position
    Move { from: usize, to: usize },
    /// run a live rest countdown for a set
    Rest {
        exercise: String,
        set: String,
        #[clap(short, long)]
        seconds: Option<u32>,
    },
    /// show or change settings
    Config {
        #[clap(long)]
        default_rest: Option<u32>,
        #[clap(long)]
        adjust_step: Option<u32>,
        #[clap(long)]
        tick_ms: Option<u64>,
        #[clap(long)]
        auto_start: Option<bool>,
        #[clap(long, value_enum)]
        unit: Option<Unit>,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum SetKind {
    Working,
    Warmup,
    Failure,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum DropKind {
    Warmup,
    Failure,
}

#[derive(Debug, Copy, Clone, Default, ValueEnum, strum_macros::Display)]
pub enum GroupKind {
    #[default]
    Superset,
    Hiit,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum Unit {
    Kg,
    Lbs,
}

impl From<SetKind> for SetType {
    fn from(k: SetKind) -> Self {
        match k {
            SetKind::Working => SetType::Working,
            SetKind::Warmup => SetType::Warmup,
            SetKind::Failure => SetType::Failure,
        }
    }
}

impl From<DropKind> for DropSetType {
    fn from(k: DropKind) -> Self {
        match k {
            DropKind::Warmup => DropSetType::Warmup,
            DropKind::Failure => DropSetType::Failure,
        }
    }
}

impl From<GroupKind> for GroupType {
    fn from(k: GroupKind) -> Self {
        match k {
            GroupKind::Superset => GroupType::Superset,
            GroupKind::Hiit => GroupType::Hiit,
        }
    }
}

impl From<Unit> for WeightUnit {
    fn from(u: Unit) -> Self {
        match u {
            Unit::Kg => WeightUnit::Kg,
            Unit::Lbs => WeightUnit::Lbs,
        }
    }
}

fn main() {
    logging::configure_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, e).exit();
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn StdError>> {
    let config_store = match &cli.config {
        Some(p) => FileConfigStore::with_path(p),
        None => FileConfigStore::new(),
    };
    let store = match &cli.file {
        Some(p) => FileWorkoutStore::with_path(p),
        None => FileWorkoutStore::new(),
    };
    let config = config_store.load();

    match &cli.command {
        Command::New { name } => {
            let workout = Workout::new(name.as_str());
            store.save(&workout)?;
            println!("started {:?} ({})", workout.name, workout.id);
            return Ok(());
        }
        Command::Config {
            default_rest,
            adjust_step,
            tick_ms,
            auto_start,
            unit,
        } => {
            let mut cfg = config;
            let changed = default_rest.is_some()
                || adjust_step.is_some()
                || tick_ms.is_some()
                || auto_start.is_some()
                || unit.is_some();
            if let Some(v) = default_rest {
                cfg.default_rest_seconds = *v;
            }
            if let Some(v) = adjust_step {
                cfg.adjust_step_seconds = *v;
            }
            if let Some(v) = tick_ms {
                cfg.tick_interval_ms = *v;
            }
            if let Some(v) = auto_start {
                cfg.auto_start_rest_timer = *v;
            }
            if let Some(v) = unit {
                cfg.weight_unit = (*v).into();
            }
            if changed {
                config_store.save(&cfg)?;
            }
            print!("{}", render_config(&cfg));
            return Ok(());
        }
        _ => {}
    }

    let workout = store.load()?;
    let pending: Rc<RefCell<Option<Workout>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&pending);
    let mut session = WorkoutSession::new(workout, config)
        .on_update(move |w| *sink.borrow_mut() = Some(w.clone()));

    let result = run_command(&cli.command, &mut session);

    // whatever was committed before a failure is still worth keeping
    if let Some(w) = pending.borrow_mut().take() {
        store.save(&w)?;
    }
    result
}

fn run_command(command: &Command, session: &mut WorkoutSession) -> Result<(), Box<dyn StdError>> {
    match command {
        Command::New { .. } | Command::Config { .. } => {}
        Command::Show => print!("{}", render_workout(session.workout())),
        Command::Flat => {
            let flat = to_flat_drag_list(session.items(), None);
            print!("{}", render_flat(&flat));
        }
        Command::AddExercise {
            name,
            category,
            group,
        } => {
            let mut exercise = Exercise::new(slug(name), name.as_str(), category.as_str());
            exercise.weight_unit = session.config().weight_unit;
            let id = exercise.instance_id.clone();
            match group {
                Some(g) => {
                    if !session.add_exercise_to_group(g, exercise) {
                        return Err(Error::GroupNotFound(g.clone()).into());
                    }
                }
                None => {
                    session.add_exercise(exercise);
                }
            }
            println!("{id}");
        }
        Command::AddSet {
            exercise,
            weight,
            reps,
            rest,
            kind,
        } => {
            let ex = resolve_exercise(session.items(), exercise)?.instance_id.clone();
            let mut set = Set {
                weight: *weight,
                reps: *reps,
                set_type: (*kind).into(),
                is_warmup: matches!(kind, SetKind::Warmup),
                is_failure: matches!(kind, SetKind::Failure),
                ..Set::new()
            };
            if let Some(r) = rest {
                set = set.with_rest(*r);
            }
            match session.add_set(&ex, set) {
                Some(set_ref) => println!("{}", set_ref.set_id),
                None => return Err(Error::ExerciseNotFound(ex).into()),
            }
        }
        Command::Complete {
            exercise,
            set,
            wait,
        } => {
            let set_ref = resolve_set(session.items(), exercise, set)?;
            session.toggle_set_completed(&set_ref, Instant::now());
            let done = tree::find_set(session.items(), &set_ref).is_some_and(|s| s.completed);
            println!("{} {}", set_ref.set_id, if done { "completed" } else { "not completed" });
            match session.rest_timer().map(|t| t.remaining_seconds) {
                Some(_) if *wait => run_rest_countdown(session)?,
                Some(remaining) => println!("rest {}", format_clock(remaining)),
                None => {}
            }
        }
        Command::Dropset {
            exercise,
            sets,
            edit,
            kind,
        } => {
            let ex = resolve_exercise(session.items(), exercise)?.clone();
            let wanted = sets
                .iter()
                .map(|s| resolve_set_in(&ex, s))
                .collect::<Result<Vec<_>, _>>()?;
            match edit {
                Some(drop_id) => {
                    if !session.begin_edit_dropset(&ex.instance_id, drop_id) {
                        return Err(Error::SetNotFound(drop_id.clone()).into());
                    }
                    for set in &ex.sets {
                        if session.grouping().is_selected(&set.id) != wanted.contains(&set.id) {
                            session.toggle_selection(&set.id);
                        }
                    }
                }
                None => {
                    session.begin_new_dropset(&ex.instance_id);
                    for id in &wanted {
                        session.toggle_selection(id);
                    }
                }
            }
            if let Some(k) = kind {
                session.set_dropset_type(Some((*k).into()));
            }
            report(session.commit_selection());
        }
        Command::Group {
            exercises,
            edit,
            kind,
        } => {
            let wanted = exercises
                .iter()
                .map(|e| resolve_exercise(session.items(), e).map(|ex| ex.instance_id.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            match edit {
                Some(group_id) => {
                    let current: Vec<String> = tree::find_group(session.items(), group_id)
                        .ok_or_else(|| Error::GroupNotFound(group_id.clone()))?
                        .children
                        .iter()
                        .map(|c| c.instance_id.clone())
                        .collect();
                    session.begin_edit_group(group_id);
                    for id in current.iter().chain(&wanted) {
                        if session.grouping().is_selected(id) != wanted.contains(id) {
                            session.toggle_selection(id);
                        }
                    }
                    if let Some(k) = kind {
                        session.set_group_type((*k).into());
                    }
                }
                None => {
                    session.begin_new_group(kind.unwrap_or_default().into());
                    for id in &wanted {
                        session.toggle_selection(id);
                    }
                }
            }
            report(session.commit_selection());
        }
        Command::Ungroup { group } => report(session.ungroup(group)),
        Command::Move { from, to } => {
            let flat = to_flat_drag_list(session.items(), None);
            let index = |n: usize| {
                n.checked_sub(1)
                    .filter(|i| *i < flat.len())
                    .ok_or(Error::InvalidIndex {
                        index: n,
                        len: flat.len(),
                    })
            };
            let (from, to) = (index(*from)?, index(*to)?);
            report(session.reorder(&move_item(&flat, from, to)));
        }
        Command::Rest {
            exercise,
            set,
            seconds,
        } => {
            let set_ref = resolve_set(session.items(), exercise, set)?;
            let seconds = seconds
                .or_else(|| tree::find_set(session.items(), &set_ref).and_then(Set::rest_seconds))
                .unwrap_or(session.config().default_rest_seconds);
            session.start_rest_timer(&set_ref, seconds, Instant::now());
            if session.rest_timer().is_some() {
                run_rest_countdown(session)?;
            }
        }
    }
    Ok(())
}

fn report(changed: bool) {
    println!("{}", if changed { "updated" } else { "unchanged" });
}

fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Matches an instance id, a 1-based position in `show` order, or a name
fn resolve_exercise<'a>(items: &'a [ExerciseItem], token: &str) -> liftlog::Result<&'a Exercise> {
    if let Some(ex) = tree::find(items, token) {
        return Ok(ex);
    }
    let mut all = items.iter().flat_map(ExerciseItem::exercises);
    if let Ok(n) = token.parse::<usize>() {
        if let Some(ex) = n.checked_sub(1).and_then(|i| all.nth(i)) {
            return Ok(ex);
        }
    } else if let Some(ex) = all.find(|e| e.name.eq_ignore_ascii_case(token)) {
        return Ok(ex);
    }
    Err(Error::ExerciseNotFound(token.to_string()))
}

/// Matches a set id or a 1-based position within the exercise
fn resolve_set_in(exercise: &Exercise, token: &str) -> liftlog::Result<String> {
    if exercise.set(token).is_some() {
        return Ok(token.to_string());
    }
    token
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| exercise.sets.get(i))
        .map(|s| s.id.clone())
        .ok_or_else(|| Error::SetNotFound(token.to_string()))
}

fn resolve_set(items: &[ExerciseItem], exercise: &str, set: &str) -> liftlog::Result<SetRef> {
    let ex = resolve_exercise(items, exercise)?;
    Ok(SetRef::new(ex.instance_id.clone(), resolve_set_in(ex, set)?))
}

fn run_rest_countdown(session: &mut WorkoutSession) -> io::Result<()> {
    let ticker = FixedTicker::new(session.config().tick_interval());
    if stdin().is_tty() {
        enable_raw_mode()?;
        let runner = Runner::new(CrosstermEventSource::new(), ticker);
        let result = countdown(session, &runner);
        disable_raw_mode()?;
        result
    } else {
        // no keyboard; the sender stays alive so the runner still waits between ticks
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(TestEventSource::new(rx), ticker);
        countdown(session, &runner)
    }
}

fn countdown<E: SessionEventSource, T: Ticker>(
    session: &mut WorkoutSession,
    runner: &Runner<E, T>,
) -> io::Result<()> {
    let mut stdout = io::stdout();
    loop {
        let now = Instant::now();
        if let Some(timer) = session.rest_timer() {
            queue!(
                stdout,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print(render_timer(timer, now))
            )?;
            stdout.flush()?;
        }
        let event = runner.next_command();
        if !session.handle_event(&event, Instant::now()) {
            break;
        }
    }
    execute!(stdout, Print("\r\n"))?;
    for event in session.take_timer_events() {
        tracing::debug!(?event, "rest timer event");
    }
    Ok(())
}

fn render_timer(timer: &RestTimer, now: Instant) -> String {
    let filled = (timer.progress(now) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!(
        "rest {} / {} [{}{}]{}  space pause  +/- adjust  s skip  q quit",
        format_clock(timer.remaining_at(now)),
        format_clock(timer.total_seconds),
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        if timer.is_paused { " paused" } else { "" },
    )
}

fn pad(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    format!("{s}{}", " ".repeat(width.saturating_sub(w)))
}

fn describe_set(set: &Set, unit: WeightUnit) -> String {
    let mut parts = Vec::new();
    match (set.weight, set.reps) {
        (Some(w), Some(r)) => parts.push(format!("{w}{unit} x {r}")),
        (Some(w), None) => parts.push(format!("{w}{unit}")),
        (None, Some(r)) => parts.push(format!("x {r}")),
        (None, None) => {}
    }
    if let Some(d) = set.duration {
        parts.push(format_clock(d));
    }
    if let Some(d) = set.distance {
        parts.push(format!("{d}m"));
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}

fn render_exercise(
    out: &mut String,
    position: usize,
    ex: &Exercise,
    indent: &str,
    name_width: usize,
) {
    let _ = writeln!(
        out,
        "{indent}{position:>2}. {}  {}",
        pad(&ex.name, name_width),
        ex.instance_id
    );
    for (i, set) in ex.sets.iter().enumerate() {
        let mut flags = Vec::new();
        if set.is_warmup || set.set_type == SetType::Warmup {
            flags.push("warmup".to_string());
        }
        if set.is_failure || set.set_type == SetType::Failure {
            flags.push("failure".to_string());
        }
        if let Some(d) = &set.drop_set_id {
            flags.push(format!("drop:{d}"));
        }
        if let Some(r) = set.rest_seconds() {
            let taken = if set.rest_timer_completed { " done" } else { "" };
            flags.push(format!("rest {}{taken}", format_clock(r)));
        }
        let check = if set.completed { "x" } else { " " };
        let _ = writeln!(
            out,
            "{indent}      [{check}] {:>2} {:<16} {}",
            i + 1,
            describe_set(set, ex.weight_unit),
            flags.join("  ")
        );
    }
}

fn render_workout(workout: &Workout) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  (started {})",
        workout.name,
        workout.started_at.format("%Y-%m-%d %H:%M")
    );
    let name_width = workout
        .exercises
        .iter()
        .flat_map(ExerciseItem::exercises)
        .map(|e| UnicodeWidthStr::width(e.name.as_str()))
        .max()
        .unwrap_or(0);
    let mut position = 0;
    for item in &workout.exercises {
        match item {
            ExerciseItem::Exercise(ex) => {
                position += 1;
                render_exercise(&mut out, position, ex, "", name_width);
            }
            ExerciseItem::Group(g) => {
                let _ = writeln!(out, "{} {}", g.group_type, g.instance_id);
                for ex in &g.children {
                    position += 1;
                    render_exercise(&mut out, position, ex, "  | ", name_width);
                }
            }
        }
    }
    out
}

fn render_flat(flat: &[DragItem]) -> String {
    let mut out = String::new();
    for (i, item) in flat.iter().enumerate() {
        let label = match &item.kind {
            DragItemKind::GroupHeader {
                group_type, ghosts, ..
            } if !ghosts.is_empty() => format!("[{group_type} +{}]", ghosts.len()),
            DragItemKind::GroupHeader { group_type, .. } => format!("[{group_type}"),
            DragItemKind::GroupFooter => "]".to_string(),
            DragItemKind::Exercise(ex) if item.group_id.is_some() => format!("  {}", ex.name),
            DragItemKind::Exercise(ex) => ex.name.clone(),
        };
        let _ = writeln!(out, "{:>3}  {}  {}", i + 1, pad(&label, 24), item.key);
    }
    out
}

fn render_config(cfg: &Config) -> String {
    format!(
        "default_rest_seconds  {}\nadjust_step_seconds   {}\ntick_interval_ms      {}\nauto_start_rest_timer {}\nweight_unit           {}\n",
        cfg.default_rest_seconds,
        cfg.adjust_step_seconds,
        cfg.tick_interval_ms,
        cfg.auto_start_rest_timer,
        cfg.weight_unit,
    )
}
