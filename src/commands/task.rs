use crate::db::db::Db;
use crate::libs::messages::Message;
use crate::libs::task::{parse_tag_list, TaskFilter};
use crate::libs::view::View;
use crate::{msg_bail_anyhow, msg_info, msg_success};
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    command: TaskCommand,
}

#[derive(Debug, Subcommand)]
enum TaskCommand {
    #[command(about = "Create a task, or show the id of an existing one")]
    Add {
        name: String,
        #[arg(short, long, help = "Category name")]
        category: Option<String>,
        #[arg(short, long, help = "Comma-separated tags")]
        tags: Option<String>,
    },
    #[command(about = "List tasks")]
    List {
        #[arg(long, conflicts_with = "open", help = "Only completed tasks")]
        done: bool,
        #[arg(long, help = "Only incomplete tasks")]
        open: bool,
    },
    #[command(about = "Mark a task complete")]
    Done {
        id: i64,
        #[arg(long, help = "Mark incomplete instead")]
        undo: bool,
    },
    #[command(about = "Replace the tags of a task")]
    Tag {
        id: i64,
        #[arg(help = "Comma-separated tags; empty clears them")]
        tags: String,
    },
    #[command(about = "Set or clear the category of a task")]
    Category { id: i64, name: Option<String> },
    #[command(about = "Delete a task with its tags and sessions")]
    Delete { id: i64 },
}

pub async fn cmd(db: &Db, args: TaskArgs) -> anyhow::Result<()> {
    let tasks = db.tasks();

    match args.command {
        TaskCommand::Add { name, category, tags } => {
            let category_id = resolve_category(db, category.as_deref()).await?;
            let id = tasks.create_or_get(&name, category_id).await?;
            if let Some(tags) = tags {
                tasks.replace_tags(id, parse_tag_list(&tags)).await?;
            }
            msg_success!(Message::TaskCreated(id, name.trim().to_string()));
        }
        TaskCommand::List { done, open } => {
            let filter = match (done, open) {
                (true, _) => TaskFilter::Complete,
                (_, true) => TaskFilter::Incomplete,
                _ => TaskFilter::All,
            };
            let list = tasks.filter_by_completion(filter).await?;
            if list.is_empty() {
                msg_info!(Message::TasksNotFound);
            } else {
                View::tasks(&list);
            }
        }
        TaskCommand::Done { id, undo } => {
            tasks.set_complete(id, !undo).await?;
            if undo {
                msg_success!(Message::TaskMarkedIncomplete(id));
            } else {
                msg_success!(Message::TaskMarkedComplete(id));
            }
        }
        TaskCommand::Tag { id, tags } => {
            let tags = parse_tag_list(&tags);
            let count = tags.len();
            tasks.replace_tags(id, tags).await?;
            msg_success!(Message::TaskTagsReplaced(id, count));
        }
        TaskCommand::Category { id, name } => {
            let category_id = resolve_category(db, name.as_deref()).await?;
            tasks.set_category(id, category_id).await?;
            msg_success!(Message::TaskCategoryChanged(id));
        }
        TaskCommand::Delete { id } => {
            tasks.delete(id).await?;
            msg_success!(Message::TaskDeleted(id));
        }
    }

    Ok(())
}

async fn resolve_category(db: &Db, name: Option<&str>) -> anyhow::Result<Option<i64>> {
    let Some(name) = name else {
        return Ok(None);
    };
    match db.categories().get_by_name(name).await? {
        Some(category) => Ok(Some(category.id)),
        None => msg_bail_anyhow!(Message::CategoryNotFound(name.to_string())),
    }
}
