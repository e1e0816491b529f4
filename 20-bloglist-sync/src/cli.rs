use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use reqwest::Url;

use crate::server::Account;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the in-memory reference backend.
    Serve(ServeArgs),
    /// Open an interactive shell over the blog list.
    Blogs(ShellArgs),
    /// Open an interactive shell over the anecdote list.
    Anecdotes(ShellArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Socket address the backend should bind to. Use 0 for an ephemeral port.
    #[arg(long, default_value = "127.0.0.1:3003")]
    pub listen: SocketAddr,

    /// Accounts accepted at /api/login, as username:password[:name]. Repeatable.
    #[arg(long = "user", value_name = "USERNAME:PASSWORD[:NAME]")]
    pub users: Vec<Account>,
}

#[derive(Args, Debug, Clone)]
pub struct ShellArgs {
    /// Base URL of the backend.
    #[arg(long, env = "BLOGLIST_URL", default_value = "http://127.0.0.1:3003/")]
    pub server: Url,

    /// File the logged-in user is kept in between runs.
    #[arg(long, env = "BLOGLIST_SESSION", default_value = ".bloglist-session.json")]
    pub session: PathBuf,

    /// How long a notification stays up, in milliseconds.
    #[arg(long = "notify-ms", default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..))]
    pub notify_ms: u64,
}

impl ShellArgs {
    pub fn notification_delay(&self) -> Duration {
        Duration::from_millis(self.notify_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_collects_repeated_users() {
        let cli = Cli::try_parse_from([
            "bloglist-sync",
            "serve",
            "--listen",
            "127.0.0.1:0",
            "--user",
            "root:sekret:Superuser",
            "--user",
            "mluukkai:salainen",
        ])
        .expect("parse serve");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.users.len(), 2);
        assert_eq!(args.users[0].name, "Superuser");
        assert_eq!(args.users[1].name, "mluukkai");
    }

    #[test]
    fn shell_defaults() {
        let cli = Cli::try_parse_from(["bloglist-sync", "blogs", "--notify-ms", "250"])
            .expect("parse blogs");
        let Command::Blogs(args) = cli.command else {
            panic!("expected blogs");
        };
        assert_eq!(args.notification_delay(), Duration::from_millis(250));
        assert_eq!(args.server.port(), Some(3003));
    }

    #[test]
    fn requests_have_no_timeout_flag() {
        assert!(
            Cli::try_parse_from(["bloglist-sync", "blogs", "--timeout-secs", "10"]).is_err()
        );
    }

    #[test]
    fn zero_delay_is_rejected() {
        assert!(Cli::try_parse_from(["bloglist-sync", "anecdotes", "--notify-ms", "0"]).is_err());
    }
}
