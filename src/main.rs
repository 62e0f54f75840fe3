use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Result, eyre};
use std::cell::Cell;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;
use taskboard::{
    BoardLock, Column, Document, FiltersPatch, NewTask, Priority, SqliteKv, Store, Task, TaskPatch, Theme,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "TaskBoard CLI - Column task board with undo/redo and local persistence")]
#[command(version)]
struct Cli {
    /// Directory holding the board (default: platform data directory)
    #[arg(short, long)]
    board_path: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Board(BoardCommand),

    /// Interactive session with undo/redo, one command per line
    Shell,
}

#[derive(Subcommand)]
enum BoardCommand {
    /// Print the board
    Show,

    /// Add a task
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        assignee: String,
        #[arg(short, long, default_value = "normal")]
        priority: String,
        /// Due date as YYYY-MM-DD
        #[arg(long, default_value = "")]
        due: String,
        #[arg(short, long, default_value = "backlog")]
        column: String,
    },

    /// Edit fields of a task
    Edit {
        /// Task id or unique id prefix
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        assignee: Option<String>,
        #[arg(short, long)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(short, long)]
        column: Option<String>,
    },

    /// Move a task to a column, at a position among that column's tasks
    Move {
        id: String,
        column: String,
        /// Position in the target column (default: end)
        index: Option<usize>,
    },

    /// Delete a task
    Delete { id: String },

    /// Set board filters; omitted flags keep their current value
    Filter {
        #[arg(short, long)]
        q: Option<String>,
        /// Priority to show, or "" for any
        #[arg(short, long)]
        priority: Option<String>,
        /// Assignee to show, or "" for anyone
        #[arg(short, long)]
        assignee: Option<String>,
        /// Reset every filter
        #[arg(long)]
        clear: bool,
    },

    /// Print the theme, or set it to light, dark or toggle
    Theme { value: Option<String> },
}

#[derive(Parser)]
#[command(name = "taskboard", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    #[command(flatten)]
    Board(BoardCommand),

    /// Revert the last change
    Undo,

    /// Re-apply the last undone change
    Redo,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let board_path = cli.board_path.unwrap_or_else(default_board_path);

    // Held until exit so a second process cannot write the same board
    let _lock = BoardLock::acquire(&board_path)?;
    let mut store = Store::open(SqliteKv::open(&board_path)?)?;

    match cli.command.unwrap_or(Commands::Board(BoardCommand::Show)) {
        Commands::Board(command) => {
            let changed = execute(&mut store, command)?;
            if changed {
                render_board(&store.get_state(), store.theme());
            }
        }
        Commands::Shell => run_shell(&mut store)?,
    }

    Ok(())
}

fn default_board_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("taskboard"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Run one board command; returns true when the board should be redrawn
fn execute(store: &mut Store, command: BoardCommand) -> Result<bool> {
    match command {
        BoardCommand::Show => {
            render_board(&store.get_state(), store.theme());
            Ok(false)
        }
        BoardCommand::Add {
            title,
            description,
            assignee,
            priority,
            due,
            column,
        } => {
            let title = require_title(&title)?;
            let task = NewTask {
                title,
                description,
                assignee: assignee.trim().to_string(),
                priority: priority.parse()?,
                due: due.trim().to_string(),
                column: column.parse()?,
            }
            .into_task();
            let id = task.id.clone();
            store.add_task(task)?;
            println!("Added {}", id);
            Ok(true)
        }
        BoardCommand::Edit {
            id,
            title,
            description,
            assignee,
            priority,
            due,
            column,
        } => {
            let id = resolve_id(&store.get_state(), &id)?;
            let patch = TaskPatch {
                title: title.as_deref().map(require_title).transpose()?,
                description,
                assignee: assignee.map(|a| a.trim().to_string()),
                priority: priority.as_deref().map(str::parse::<Priority>).transpose()?,
                due: due.map(|d| d.trim().to_string()),
                column: column.as_deref().map(str::parse::<Column>).transpose()?,
            };
            if patch.is_empty() {
                return Err(eyre!("Nothing to edit: pass at least one field"));
            }
            store.update_task(&id, patch)?;
            Ok(true)
        }
        BoardCommand::Move { id, column, index } => {
            let id = resolve_id(&store.get_state(), &id)?;
            store.move_task(&id, column.parse()?, index.unwrap_or(usize::MAX))?;
            Ok(true)
        }
        BoardCommand::Delete { id } => {
            let id = resolve_id(&store.get_state(), &id)?;
            store.delete_task(&id)?;
            Ok(true)
        }
        BoardCommand::Filter {
            q,
            priority,
            assignee,
            clear,
        } => {
            let patch = if clear {
                FiltersPatch::clear()
            } else {
                FiltersPatch {
                    q,
                    priority: priority.as_deref().map(parse_optional_priority).transpose()?,
                    assignee,
                }
            };
            store.set_filters(patch)?;
            Ok(true)
        }
        BoardCommand::Theme { value } => {
            match value.as_deref() {
                None => {}
                Some("toggle") => {
                    store.toggle_theme()?;
                }
                Some(name) => store.set_theme(name.parse()?)?,
            }
            println!("Theme: {}", store.theme());
            Ok(false)
        }
    }
}

fn run_shell(store: &mut Store) -> Result<()> {
    let theme = Rc::new(Cell::new(store.theme()));
    let render_theme = Rc::clone(&theme);
    let subscription = store.subscribe(move |document| render_board(document, render_theme.get()));

    println!("TaskBoard shell. Type `help` for commands, `quit` to leave.");
    render_board(&store.get_state(), theme.get());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;

        let words = match split_line(&line) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        // Subscription renders after each commit, so results are not redrawn here
        let result = match parsed.command {
            ShellCommand::Board(command) => execute(store, command).map(|_| ()),
            ShellCommand::Undo => {
                if !store.can_undo() {
                    println!("Nothing to undo");
                }
                store.undo()
            }
            ShellCommand::Redo => {
                if !store.can_redo() {
                    println!("Nothing to redo");
                }
                store.redo()
            }
            ShellCommand::Quit => break,
        };

        if let Err(e) = result {
            eprintln!("{} {:#}", "error:".red().bold(), e);
        }
        theme.set(store.theme());
    }

    subscription.unsubscribe();
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn require_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(eyre!("Title cannot be empty"));
    }
    Ok(title.to_string())
}

fn parse_optional_priority(raw: &str) -> Result<Option<Priority>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some)
}

/// Accept a full task id or a prefix matching exactly one task
///
/// Unknown ids are passed through untouched; the store ignores them.
fn resolve_id(document: &Document, id: &str) -> Result<String> {
    if document.get(id).is_some() {
        return Ok(id.to_string());
    }

    let matches: Vec<&Task> = document.tasks.iter().filter(|t| t.id.starts_with(id)).collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => {
            println!("No task matching {}", id);
            Ok(id.to_string())
        }
        _ => Err(eyre!("Ambiguous id prefix {} ({} tasks match)", id, matches.len())),
    }
}

/// Split a shell line into words with POSIX shell quoting rules
fn split_line(line: &str) -> Result<Vec<String>> {
    shell_words::split(line).map_err(|e| eyre!("Cannot parse line: {}", e))
}

// ============================================================================
// Rendering
// ============================================================================

fn render_board(document: &Document, theme: Theme) {
    let today = chrono::Local::now().date_naive();

    println!();
    if !document.filters.is_empty() {
        let filters = &document.filters;
        println!(
            "{} q=\"{}\" priority={} assignee=\"{}\"",
            "Filters:".dimmed(),
            filters.q,
            filters.priority.map(Priority::as_str).unwrap_or("any"),
            filters.assignee
        );
    }

    for column in Column::ALL {
        let visible: Vec<&Task> = document.visible_in(column).collect();
        let total = document.tasks_in(column).count();
        println!("{}", heading(&format!("{} ({}/{})", column.label(), visible.len(), total), theme));

        if visible.is_empty() {
            println!("  {}", "-".dimmed());
        }
        for task in visible {
            let mut line = format!("  {}  {} {}", short_id(&task.id).dimmed(), task.title, priority_tag(task.priority));
            if !task.assignee.is_empty() {
                line.push_str(&format!(" @{}", task.assignee));
            }
            if !task.due.is_empty() {
                let due = format!("due {}", task.due);
                if task.is_overdue(today) {
                    line.push_str(&format!(" {}", format!("{} (overdue)", due).red()));
                } else {
                    line.push_str(&format!(" {}", due));
                }
            }
            println!("{}", line);
        }
    }
}

fn heading(text: &str, theme: Theme) -> ColoredString {
    match theme {
        Theme::Light => text.bold().blue(),
        Theme::Dark => text.bold().bright_cyan(),
    }
}

fn priority_tag(priority: Priority) -> ColoredString {
    let tag = format!("[{}]", priority);
    match priority {
        Priority::High => tag.red(),
        Priority::Normal => tag.yellow(),
        Priority::Low => tag.green(),
    }
}

/// Shortest readable form of an id for display; prefixes are accepted as input
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard::MemoryKv;
    use taskboard::seed::seed_document;

    fn seeded_store() -> Store {
        Store::create(seed_document(), MemoryKv::new())
    }

    fn add_command(title: &str, priority: &str, column: &str) -> BoardCommand {
        BoardCommand::Add {
            title: title.to_string(),
            description: String::new(),
            assignee: String::new(),
            priority: priority.to_string(),
            due: String::new(),
            column: column.to_string(),
        }
    }

    fn filter_command(q: Option<&str>, priority: Option<&str>, clear: bool) -> BoardCommand {
        BoardCommand::Filter {
            q: q.map(str::to_string),
            priority: priority.map(str::to_string),
            assignee: None,
            clear,
        }
    }

    #[test]
    fn test_split_line_quotes() {
        let words = split_line(r#"add "Fix the build" -a 'sam smith'  --due 2024-05-01"#).unwrap();
        assert_eq!(
            words,
            vec!["add", "Fix the build", "-a", "sam smith", "--due", "2024-05-01"]
        );
        assert_eq!(split_line("filter -q \"\"").unwrap(), vec!["filter", "-q", ""]);
        assert!(split_line("   ").unwrap().is_empty());
        assert!(split_line("add \"oops").is_err());

        let words = split_line(r#"add Fix\ build -a "o\"neil""#).unwrap();
        assert_eq!(words, vec!["add", "Fix build", "-a", "o\"neil"]);
    }

    #[test]
    fn test_resolve_id_prefix() {
        let document = seed_document();
        assert_eq!(resolve_id(&document, "seed-3").unwrap(), "seed-3");
        assert!(resolve_id(&document, "seed-").is_err());
        assert_eq!(resolve_id(&document, "nope").unwrap(), "nope");
    }

    #[test]
    fn test_require_title() {
        assert_eq!(require_title("  Ship  ").unwrap(), "Ship");
        assert!(require_title("   ").is_err());
    }

    #[test]
    fn test_shell_line_parses() {
        let line = ShellLine::try_parse_from(["move", "seed-1", "todo", "0"]).unwrap();
        assert!(matches!(
            line.command,
            ShellCommand::Board(BoardCommand::Move { index: Some(0), .. })
        ));

        let line = ShellLine::try_parse_from(["undo"]).unwrap();
        assert!(matches!(line.command, ShellCommand::Undo));

        let line = ShellLine::try_parse_from(["exit"]).unwrap();
        assert!(matches!(line.command, ShellCommand::Quit));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("seed-1"), "seed-1");
        assert_eq!(short_id("t-0190abcdef0123456789"), "t-0190abcdef");
    }

    #[test]
    fn test_execute_add_parses_enums() {
        let mut store = seeded_store();

        assert!(execute(&mut store, add_command("  Ship  ", "HIGH", "InProgress")).unwrap());

        let state = store.get_state();
        let added = state.tasks.last().unwrap();
        assert_eq!(added.title, "Ship");
        assert_eq!(added.priority, Priority::High);
        assert_eq!(added.column, Column::InProgress);
    }

    #[test]
    fn test_execute_add_rejects_bad_input() {
        let mut store = seeded_store();
        let before = store.get_state();

        assert!(execute(&mut store, add_command("Ship", "urgent", "todo")).is_err());
        assert!(execute(&mut store, add_command("Ship", "low", "someday")).is_err());
        assert!(execute(&mut store, add_command("   ", "low", "todo")).is_err());

        assert_eq!(store.get_state(), before);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_execute_filter_priority_and_clear() {
        let mut store = seeded_store();

        execute(&mut store, filter_command(Some("login"), Some("high"), false)).unwrap();
        let filters = store.get_state().filters;
        assert_eq!(filters.q, "login");
        assert_eq!(filters.priority, Some(Priority::High));

        // Empty priority clears only that field
        execute(&mut store, filter_command(None, Some(""), false)).unwrap();
        let filters = store.get_state().filters;
        assert_eq!(filters.q, "login");
        assert_eq!(filters.priority, None);

        execute(&mut store, filter_command(None, Some("high"), false)).unwrap();
        execute(&mut store, filter_command(None, None, true)).unwrap();
        assert!(store.get_state().filters.is_empty());

        assert!(execute(&mut store, filter_command(None, Some("urgent"), false)).is_err());
    }

    #[test]
    fn test_execute_theme() {
        let mut store = seeded_store();

        assert!(!execute(&mut store, BoardCommand::Theme { value: None }).unwrap());
        assert_eq!(store.theme(), Theme::Light);

        execute(&mut store, BoardCommand::Theme { value: Some("toggle".to_string()) }).unwrap();
        assert_eq!(store.theme(), Theme::Dark);

        execute(&mut store, BoardCommand::Theme { value: Some("Light".to_string()) }).unwrap();
        assert_eq!(store.theme(), Theme::Light);

        assert!(execute(&mut store, BoardCommand::Theme { value: Some("sepia".to_string()) }).is_err());
        assert!(!store.can_undo());
    }

    #[test]
    fn test_execute_edit() {
        let mut store = seeded_store();

        let err = execute(
            &mut store,
            BoardCommand::Edit {
                id: "seed-3".to_string(),
                title: None,
                description: None,
                assignee: None,
                priority: None,
                due: None,
                column: None,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Nothing to edit"));

        execute(
            &mut store,
            BoardCommand::Edit {
                id: "seed-3".to_string(),
                title: Some("Fix login loop".to_string()),
                description: None,
                assignee: Some(" kim ".to_string()),
                priority: Some("low".to_string()),
                due: None,
                column: Some("done".to_string()),
            },
        )
        .unwrap();

        let state = store.get_state();
        let task = state.get("seed-3").unwrap();
        assert_eq!(task.title, "Fix login loop");
        assert_eq!(task.assignee, "kim");
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.column, Column::Done);
    }

    #[test]
    fn test_execute_unknown_id_passes_through() {
        let mut store = seeded_store();
        let before = store.get_state();

        execute(&mut store, BoardCommand::Delete { id: "nope".to_string() }).unwrap();
        execute(
            &mut store,
            BoardCommand::Move {
                id: "nope".to_string(),
                column: "done".to_string(),
                index: None,
            },
        )
        .unwrap();

        assert_eq!(store.get_state(), before);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_execute_move_defaults_to_column_end() {
        let mut store = seeded_store();

        execute(
            &mut store,
            BoardCommand::Move {
                id: "seed-1".to_string(),
                column: "done".to_string(),
                index: None,
            },
        )
        .unwrap();

        let state = store.get_state();
        let done: Vec<&str> = state.tasks_in(Column::Done).map(|t| t.id.as_str()).collect();
        assert_eq!(done, vec!["seed-4", "seed-1"]);
    }
}
