use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use bloglist_sync::{
    cli::{Cli, Command},
    resource::{Anecdote, Blog},
    server, shell,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    // Logs go to stderr so the shell's stdout stays readable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let listener = TcpListener::bind(args.listen).await?;
            let backend = server::Backend::new(listener, args.users);
            let addr = backend.local_addr()?;
            info!("backend listening on {}", addr);
            println!("listening on {addr}");
            if let Err(err) = backend.run_until_ctrl_c().await {
                warn!("backend exited with error: {err:?}");
                return Err(err);
            }
        }
        Command::Blogs(args) => shell::run::<Blog>(args).await?,
        Command::Anecdotes(args) => shell::run::<Anecdote>(args).await?,
    }

    Ok(())
}
