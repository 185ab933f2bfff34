use crate::db::db::Db;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::{msg_info, msg_print};
use clap::Args;

#[derive(Debug, Args)]
pub struct SumArgs {
    #[arg(long, help = "Group by category instead of task")]
    by_category: bool,
}

pub async fn cmd(db: &Db, args: SumArgs) -> anyhow::Result<()> {
    let sessions = db.sessions();

    if args.by_category {
        let summary = sessions.summary_by_category().await?;
        if summary.is_empty() {
            msg_info!(Message::SummaryEmpty);
            return Ok(());
        }
        msg_print!(Message::SummaryByCategoryHeader, true);
        View::category_summary(&summary);
    } else {
        let summary = sessions.summary().await?;
        if summary.is_empty() {
            msg_info!(Message::SummaryEmpty);
            return Ok(());
        }
        msg_print!(Message::SummaryByTaskHeader, true);
        View::task_summary(&summary);
    }

    Ok(())
}
