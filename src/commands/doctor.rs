use crate::db::db::{Db, RepairOutcome};
use crate::libs::config::Config;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::{msg_info, msg_success, msg_warning};
use clap::Args;

#[derive(Debug, Args)]
pub struct DoctorArgs {
    #[arg(long, help = "Run VACUUM and ANALYZE after the check")]
    optimize: bool,
    #[arg(long, help = "Rebuild the database if the check finds damage")]
    repair: bool,
    #[arg(long, requires = "repair", help = "Rebuild even a healthy database, deleting all history")]
    force: bool,
}

pub async fn cmd(db: &Db, config: &Config, args: DoctorArgs) -> anyhow::Result<()> {
    if args.repair {
        match db.repair(args.force, config.database.seed_default_categories).await? {
            RepairOutcome::Healthy => msg_info!(Message::DatabaseNeedsNoRepair),
            RepairOutcome::Rebuilt(reason) => msg_warning!(Message::DatabaseRepaired(reason.to_string())),
        }
    }

    let report = db.health().await?;
    View::health(&report);

    if report.is_healthy() {
        msg_success!(Message::DatabaseHealthy);
    } else {
        msg_warning!(Message::DatabaseUnhealthy(report.integrity.clone()));
    }

    if args.optimize {
        db.optimize().await?;
        msg_success!(Message::DatabaseOptimized);
    }

    Ok(())
}
