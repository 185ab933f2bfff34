pub mod category;
pub mod doctor;
pub mod session;
pub mod sum;
pub mod task;

use crate::db::db::{Db, OpenOutcome};
use crate::libs::config::Config;
use crate::libs::error::{Error, ErrorKind};
use crate::libs::messages::Message;
use crate::{msg_error, msg_info, msg_warning};
use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Manage tasks", arg_required_else_help = true)]
    Task(task::TaskArgs),
    #[command(about = "Manage categories", arg_required_else_help = true)]
    Category(category::CategoryArgs),
    #[command(about = "Start, pause, resume or stop the session timer", arg_required_else_help = true)]
    Session(session::SessionArgs),
    #[command(about = "Get summary of tracked time")]
    Sum(sum::SumArgs),
    #[command(about = "Check and maintain the database")]
    Doctor(doctor::DoctorArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> anyhow::Result<()> {
        let cli = Self::parse();
        let config = Config::read()?;
        let db = open(&config).await?;

        let result = match cli.command {
            Commands::Task(args) => task::cmd(&db, args).await,
            Commands::Category(args) => category::cmd(&db, args).await,
            Commands::Session(args) => session::cmd(&db, args).await,
            Commands::Sum(args) => sum::cmd(&db, args).await,
            Commands::Doctor(args) => doctor::cmd(&db, &config, args).await,
        };
        db.close().await?;

        if let Err(err) = &result {
            if let Some(kind) = err.downcast_ref::<Error>().map(Error::kind) {
                match kind {
                    ErrorKind::Transient => msg_error!(Message::StorageBusy),
                    ErrorKind::Corruption => msg_warning!(Message::DatabaseRecreated(err.to_string())),
                    _ => {}
                }
            }
        }
        result
    }
}

async fn open(config: &Config) -> anyhow::Result<Db> {
    let (db, outcome) = Db::open(config).await?;
    match outcome {
        OpenOutcome::Created => msg_info!(Message::DatabaseCreated(db.path().display().to_string())),
        OpenOutcome::Recreated(reason) => msg_warning!(Message::DatabaseRecreated(reason.to_string())),
        OpenOutcome::Opened => {}
    }
    Ok(db)
}
