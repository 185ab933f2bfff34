use crate::db::db::Db;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::{msg_info, msg_success};
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct CategoryArgs {
    #[command(subcommand)]
    command: CategoryCommand,
}

#[derive(Debug, Subcommand)]
enum CategoryCommand {
    #[command(about = "Create a category")]
    Add {
        name: String,
        #[arg(short, long, help = "Color as #RRGGBB")]
        color: Option<String>,
    },
    #[command(about = "List categories")]
    List,
    #[command(about = "Delete a category; its tasks become uncategorized")]
    Delete { id: i64 },
}

pub async fn cmd(db: &Db, args: CategoryArgs) -> anyhow::Result<()> {
    let categories = db.categories();

    match args.command {
        CategoryCommand::Add { name, color } => {
            let id = categories.create(&name, color.as_deref()).await?;
            msg_success!(Message::CategoryCreated(id, name.trim().to_string()));
        }
        CategoryCommand::List => {
            let list = categories.list().await?;
            if list.is_empty() {
                msg_info!(Message::CategoriesNotFound);
            } else {
                View::categories(&list);
            }
        }
        CategoryCommand::Delete { id } => {
            categories.delete(id).await?;
            msg_success!(Message::CategoryDeleted(id));
        }
    }

    Ok(())
}
