use crate::db::db::Db;
use crate::libs::clock::SystemClock;
use crate::libs::formatter::format_duration;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::{msg_debug, msg_info, msg_success};
use clap::{Args, Subcommand};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Debug, Subcommand)]
enum SessionCommand {
    #[command(about = "Start timing a task (id or name; a new name creates the task)")]
    Start { task: Option<String> },
    #[command(about = "Pause the running session")]
    Pause,
    #[command(about = "Resume the paused session")]
    Resume,
    #[command(about = "Stop the session")]
    Stop {
        #[arg(short, long)]
        notes: Option<String>,
    },
    #[command(about = "Show the timer")]
    Status,
    #[command(about = "List sessions")]
    List {
        #[arg(long, help = "Only sessions of this task id")]
        task: Option<i64>,
        #[arg(long, conflicts_with = "task", help = "Only sessions left open")]
        open: bool,
    },
}

pub async fn cmd(db: &Db, args: SessionArgs) -> anyhow::Result<()> {
    let timer = db.timer(Arc::new(SystemClock));
    if let Some(snapshot) = timer.restore().await? {
        msg_debug!(format!("restored session {:?} in state {}", snapshot.session_id, snapshot.state));
    }

    match args.command {
        SessionCommand::Start { task } => {
            let task_id = match task.as_deref() {
                None => None,
                Some(value) => match value.trim().parse::<i64>() {
                    Ok(id) => Some(id),
                    Err(_) => Some(db.tasks().create_or_get(value, None).await?),
                },
            };
            let session_id = timer.start(task_id).await?;
            if let Some(task_id) = task_id {
                let task = db.tasks().get(task_id).await?;
                msg_success!(Message::SessionStarted(session_id, task.name));
            }
        }
        SessionCommand::Pause => {
            let elapsed = timer.pause().await?;
            msg_success!(Message::SessionPaused(format_duration(&elapsed)));
        }
        SessionCommand::Resume => {
            timer.resume().await?;
            msg_success!(Message::SessionResumed);
        }
        SessionCommand::Stop { notes } => {
            let stopped = timer.stop(notes.as_deref()).await?;
            msg_success!(Message::SessionStopped(format_duration(&stopped.elapsed)));
        }
        SessionCommand::Status => {
            let snapshot = timer.snapshot().await;
            if snapshot.state.is_open() {
                if let Some(id) = snapshot.session_id {
                    msg_info!(Message::SessionActive(id));
                }
                View::timer(&snapshot);
            } else {
                msg_info!(Message::TimerIdle);
            }
        }
        SessionCommand::List { task, open } => {
            let sessions = db.sessions();
            let list = match (task, open) {
                (Some(task_id), _) => sessions.for_task(task_id).await?,
                (None, true) => sessions.open_sessions().await?,
                (None, false) => sessions.list_all().await?,
            };
            if list.is_empty() {
                msg_info!(Message::SessionsNotFound);
            } else {
                View::sessions(&list);
            }
        }
    }

    Ok(())
}
