//! A small CLI that answers user and ping queries through errand.
//!
//! ```text
//! errand-example users list
//! errand-example users get --id 1
//! errand-example ping --value 42
//! ```
//!
//! Every command becomes one request sent through a shared [`Errand`]; the
//! response is printed as JSON.

pub mod ping;
pub mod users;

use clap::{Parser, Subcommand};
use errand::{Dispatch, Errand, ErrandOptions, Lifetime, ServiceRegistry};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use ping::{Ping, PingModule};
use users::{GetUserById, GetUserQuery, UsersModule};

#[derive(Debug, Parser)]
#[command(name = "errand-example", about = "Dispatch queries through errand")]
pub struct Cli {
    /// Log dispatcher activity at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query users
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    /// Echo a non-negative value
    Ping {
        #[arg(long)]
        value: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List every user
    List,
    /// Show one user
    Get {
        #[arg(long)]
        id: Option<usize>,
    },
}

/// Builds a dispatcher with every module of this application registered.
pub fn build_errand() -> errand::Result<Errand> {
    let registry = ServiceRegistry::new();
    let options = ErrandOptions::new()
        .handler_lifetime(Lifetime::Singleton)
        .behavior_lifetime(Lifetime::Transient);
    registry.add_errand(&options, &[&UsersModule, &PingModule])?;
    Ok(Errand::new(Arc::new(registry)))
}

/// Runs one command and returns its JSON output.
pub async fn run(
    errand: &impl Dispatch,
    command: Command,
    cancel: &CancellationToken,
) -> anyhow::Result<Value> {
    let value = match command {
        Command::Users {
            command: UsersCommand::List,
        } => serde_json::to_value(errand.send(GetUserQuery, cancel).await?)?,
        Command::Users {
            command: UsersCommand::Get { id },
        } => {
            let request = id.map(|id| GetUserById { id });
            serde_json::to_value(errand.send_opt(request, cancel).await?)?
        }
        Command::Ping { value } => {
            serde_json::to_value(errand.send(Ping { value }, cancel).await?)?
        }
    };
    Ok(value)
}
