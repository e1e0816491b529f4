//! Line-oriented terminal front end over a [`Board`].
//!
//! Stdin commands drive board actions while a `watch` subscription prints
//! notification banners as they are posted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    select,
    sync::watch,
};
use tracing::{debug, warn};

use crate::{
    board::Board,
    cli::ShellArgs,
    gateway::Gateway,
    notification::{Kind, Notification},
    resource::{AnecdoteDraft, BlogDraft, Resource, UserProfile},
    session::Session,
};

/// Turns the argument of `add` into a draft.
pub trait DraftInput: Sized {
    const USAGE: &'static str;

    fn parse(input: &str) -> Result<Self, String>;
}

impl DraftInput for BlogDraft {
    const USAGE: &'static str = "add <title> | <author> | <url>";

    fn parse(input: &str) -> Result<Self, String> {
        let fields: Vec<&str> = input.split('|').map(str::trim).collect();
        match fields.as_slice() {
            [title, author, url] => Ok(Self {
                title: title.to_string(),
                author: author.to_string(),
                url: url.to_string(),
            }),
            _ => Err(format!("usage: {}", Self::USAGE)),
        }
    }
}

impl DraftInput for AnecdoteDraft {
    const USAGE: &'static str = "add <content>";

    fn parse(input: &str) -> Result<Self, String> {
        let content = input.trim();
        if content.is_empty() {
            return Err(format!("usage: {}", Self::USAGE));
        }
        Ok(Self {
            content: content.to_string(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand<D> {
    List,
    Add(D),
    Like(String),
    Delete(String),
    Filter(String),
    Login { username: String, password: String },
    Logout,
    WhoAmI,
    Users,
    User(String),
    Help,
    Quit,
}

impl<D: DraftInput> ShellCommand<D> {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => Ok(Self::List),
            "add" | "new" => D::parse(rest).map(Self::Add),
            "like" | "vote" => single_id(rest, "like <id>").map(Self::Like),
            "delete" | "rm" => single_id(rest, "delete <id>").map(Self::Delete),
            "filter" => Ok(Self::Filter(rest.to_string())),
            "login" => match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
                [username, password] => Ok(Self::Login {
                    username: username.to_string(),
                    password: password.to_string(),
                }),
                _ => Err("usage: login <username> <password>".to_string()),
            },
            "logout" => Ok(Self::Logout),
            "whoami" => Ok(Self::WhoAmI),
            "users" => Ok(Self::Users),
            "user" => single_id(rest, "user <id>").map(Self::User),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "/quit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}', try 'help'")),
        }
    }
}

fn single_id(rest: &str, usage: &str) -> Result<String, String> {
    match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [id] => Ok(id.to_string()),
        _ => Err(format!("usage: {usage}")),
    }
}

/// Builds a board from the shell arguments and runs it until `quit`, EOF or
/// ctrl-c.
pub async fn run<R>(args: ShellArgs) -> Result<()>
where
    R: Resource,
    R::Draft: DraftInput,
{
    let session = Arc::new(
        Session::restore(&args.session)
            .with_context(|| format!("failed to restore session from {}", args.session.display()))?,
    );
    // No request timeout: a slow backend only delays that one update.
    let gateway = Gateway::<R>::new(reqwest::Client::new(), args.server.clone(), session.clone());
    let board = Board::new(gateway, session).with_notification_delay(args.notification_delay());

    if let Some(user) = board.session().user() {
        write_stdout(&format!("*** logged in as {}", user.name)).await?;
    }

    let mut notifications = board.notifier().subscribe();
    if board.initialize().await.is_ok() {
        render_records(&board).await?;
    }

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    run_shell_loop(&board, &mut notifications, &mut stdin, &mut input).await
}

async fn run_shell_loop<R>(
    board: &Board<R>,
    notifications: &mut watch::Receiver<Option<Notification>>,
    stdin: &mut BufReader<tokio::io::Stdin>,
    input: &mut String,
) -> Result<()>
where
    R: Resource,
    R::Draft: DraftInput,
{
    loop {
        select! {
            changed = notifications.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = notifications.borrow_and_update().clone();
                render_notification(current).await?;
            }
            // A partially read line stays in `input` if another branch wins.
            bytes_read = stdin.read_line(input) => {
                let keep_going = handle_stdin_input(bytes_read, input, board).await?;
                input.clear();
                if !keep_going {
                    break;
                }
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(error) = ctrl_c {
                    warn!(?error, "ctrl-c handler failed");
                }
                break;
            }
        }
    }
    Ok(())
}

async fn handle_stdin_input<R>(
    bytes_read: io::Result<usize>,
    input: &str,
    board: &Board<R>,
) -> Result<bool>
where
    R: Resource,
    R::Draft: DraftInput,
{
    if bytes_read? == 0 {
        return Ok(false);
    }
    let line = input.trim();
    if line.is_empty() {
        return Ok(true);
    }

    let command = match ShellCommand::<R::Draft>::parse(line) {
        Ok(command) => command,
        Err(message) => {
            write_stderr(&format!("!!! {message}")).await?;
            return Ok(true);
        }
    };

    execute(command, board).await
}

async fn execute<R>(command: ShellCommand<R::Draft>, board: &Board<R>) -> Result<bool>
where
    R: Resource,
    R::Draft: DraftInput,
{
    // Board failures are already posted as notifications; the render loop
    // prints them.
    let changed = match command {
        ShellCommand::List => {
            render_records(board).await?;
            false
        }
        ShellCommand::Add(draft) => board.create(draft).await.is_ok(),
        ShellCommand::Like(id) => board.like(&id).await.is_ok(),
        ShellCommand::Delete(id) => board.remove(&id).await.is_ok(),
        ShellCommand::Filter(needle) => {
            board.set_filter(&needle);
            true
        }
        ShellCommand::Login { username, password } => {
            board.login(&username, &password).await.is_ok()
        }
        ShellCommand::Logout => board.logout().await.is_ok(),
        ShellCommand::WhoAmI => {
            let line = match board.session().user() {
                Some(user) => format!("*** {} ({})", user.name, user.username),
                None => "*** not logged in".to_string(),
            };
            write_stdout(&line).await?;
            false
        }
        ShellCommand::Users => {
            if let Ok(users) = board.users().await {
                write_stdout(&format_users(&users)).await?;
            }
            false
        }
        ShellCommand::User(id) => {
            if let Ok(user) = board.user(&id).await {
                write_stdout(&format_user_blogs(&user)).await?;
            }
            false
        }
        ShellCommand::Help => {
            write_stdout(&help_text::<R>()).await?;
            false
        }
        ShellCommand::Quit => {
            write_stdout("*** bye").await?;
            return Ok(false);
        }
    };

    debug!(changed, "command handled");
    if changed {
        render_records(board).await?;
    }
    Ok(true)
}

fn help_text<R>() -> String
where
    R: Resource,
    R::Draft: DraftInput,
{
    [
        "commands:".to_string(),
        "  list".to_string(),
        format!("  {}", <R::Draft as DraftInput>::USAGE),
        "  like <id>".to_string(),
        "  delete <id>".to_string(),
        "  filter [text]".to_string(),
        "  login <username> <password>".to_string(),
        "  logout".to_string(),
        "  whoami".to_string(),
        "  users".to_string(),
        "  user <id>".to_string(),
        "  quit".to_string(),
    ]
    .join("\n")
}

/// One line per record: id, label, rank, and a marker when the logged-in
/// user may delete it.
pub fn format_record<R: Resource>(record: &R, removable: bool) -> String {
    let marker = if removable { "  [delete]" } else { "" };
    format!(
        "[{}] {} ({} {}){marker}",
        record.id(),
        record.label(),
        record.rank(),
        R::RANK_FIELD
    )
}

/// One line per user with the number of blogs they created.
pub fn format_users(users: &[UserProfile]) -> String {
    if users.is_empty() {
        return "--- no users".to_string();
    }
    users
        .iter()
        .map(|user| {
            format!(
                "[{}] {} ({}): {} blogs",
                user.id,
                user.name,
                user.username,
                user.blogs.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_user_blogs(user: &UserProfile) -> String {
    if user.blogs.is_empty() {
        return format!("--- {} has added no blogs", user.name);
    }
    let mut lines = vec![format!("--- blogs added by {}", user.name)];
    lines.extend(user.blogs.iter().map(|blog| format!("  {}", blog.title)));
    lines.join("\n")
}

async fn render_records<R: Resource>(board: &Board<R>) -> io::Result<()> {
    let records = board.visible();
    let filter = board.filter();
    let mut lines = Vec::with_capacity(records.len() + 1);
    if !filter.is_empty() {
        lines.push(format!("--- {} matching '{filter}'", R::COLLECTION));
    }
    if records.is_empty() {
        lines.push(format!("--- no {}", R::COLLECTION));
    }
    lines.extend(
        records
            .iter()
            .map(|record| format_record(record, board.can_remove(record))),
    );
    write_stdout(&lines.join("\n")).await
}

async fn render_notification(notification: Option<Notification>) -> io::Result<()> {
    match notification {
        Some(Notification {
            kind: Kind::Success,
            message,
        }) => write_stdout(&format!("*** {message}")).await,
        Some(Notification {
            kind: Kind::Failure,
            message,
        }) => write_stderr(&format!("!!! {message}")).await,
        None => Ok(()),
    }
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

async fn write_stderr(line: &str) -> io::Result<()> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(line.as_bytes()).await?;
    stderr.write_all(b"\n").await?;
    stderr.flush().await
}
