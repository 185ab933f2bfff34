use super::category::Category;
use super::formatter::{format_duration, FormattedSession};
use super::session::{CategorySummary, Session, TaskSummary};
use super::task::Task;
use crate::db::db::HealthReport;
use crate::timer::TimerSnapshot;
use prettytable::{row, Table};

pub struct View {}

impl View {
    pub fn tasks(tasks: &[Task]) {
        let mut table = Table::new();

        table.add_row(row!["ID", "NAME", "CATEGORY", "TAGS", "DONE", "CREATED"]);
        for task in tasks {
            let tags: Vec<&str> = task.tags.iter().map(String::as_str).collect();
            table.add_row(row![
                task.id,
                task.name,
                task.category_name.as_deref().unwrap_or("-"),
                tags.join(", "),
                if task.is_complete { "yes" } else { "no" },
                task.created_at.format("%Y-%m-%d")
            ]);
        }
        table.printstd();
    }

    pub fn categories(categories: &[Category]) {
        let mut table = Table::new();

        table.add_row(row!["ID", "NAME", "COLOR"]);
        for category in categories {
            table.add_row(row![category.id, category.name, category.color]);
        }
        table.printstd();
    }

    pub fn sessions(sessions: &[Session]) {
        let mut table = Table::new();

        table.add_row(row!["ID", "TASK ID", "START", "END", "DURATION", "STATE", "NOTES"]);
        for session in sessions.iter().map(FormattedSession::from) {
            table.add_row(row![
                session.id,
                session.task_id,
                session.start,
                session.end,
                session.duration,
                session.state,
                session.notes
            ]);
        }
        table.printstd();
    }

    pub fn task_summary(summary: &[TaskSummary]) {
        let mut table = Table::new();

        table.add_row(row!["TASK", "CATEGORY", "SESSIONS", "TOTAL"]);
        for item in summary {
            table.add_row(row![
                item.task_name,
                item.category_name.as_deref().unwrap_or("-"),
                item.session_count,
                format_duration(&item.total_duration)
            ]);
        }
        table.printstd();
    }

    pub fn category_summary(summary: &[CategorySummary]) {
        let mut table = Table::new();

        table.add_row(row!["CATEGORY", "SESSIONS", "TOTAL"]);
        for item in summary {
            table.add_row(row![
                item.category_name.as_deref().unwrap_or("(none)"),
                item.session_count,
                format_duration(&item.total_duration)
            ]);
        }
        table.printstd();
    }

    pub fn timer(snapshot: &TimerSnapshot) {
        let mut table = Table::new();

        table.add_row(row!["STATE", "SESSION", "TASK", "ELAPSED", "PAUSED"]);
        table.add_row(row![
            snapshot.state,
            snapshot.session_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            snapshot.task_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            format_duration(&snapshot.elapsed),
            format_duration(&snapshot.paused_total)
        ]);
        table.printstd();
    }

    pub fn health(report: &HealthReport) {
        let mut table = Table::new();

        table.add_row(row!["CHECK", "VALUE"]);
        table.add_row(row!["Path", report.path.display()]);
        table.add_row(row!["Size (bytes)", report.file_size]);
        table.add_row(row!["Tables", report.tables.join(", ")]);
        table.add_row(row!["Schema version", report.schema_version]);
        table.add_row(row!["WAL file", report.wal_present]);
        table.add_row(row!["SHM file", report.shm_present]);
        table.add_row(row!["Integrity", report.integrity]);
        table.printstd();
    }
}
