#[cfg(test)]
mod tests {
    use pricis::db::db::Db;
    use pricis::libs::config::Config;
    use pricis::libs::error::{Error, ErrorKind};
    use pricis::libs::task::TaskFilter;
    use std::collections::BTreeSet;
    use tempfile::TempDir;
    use test_context::{test_context, AsyncTestContext};

    struct TaskTestContext {
        temp_dir: TempDir,
    }

    impl AsyncTestContext for TaskTestContext {
        async fn setup() -> Self {
            TaskTestContext {
                temp_dir: tempfile::tempdir().unwrap(),
            }
        }
    }

    impl TaskTestContext {
        fn config(&self) -> Config {
            let mut config = Config::in_dir(self.temp_dir.path());
            config.database.retry_delay_ms = 1;
            config
        }

        async fn db(&self) -> Db {
            Db::open(&self.config()).await.unwrap().0
        }
    }

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|tag| tag.to_string()).collect()
    }

    #[test_context(TaskTestContext)]
    #[tokio::test]
    async fn test_create_or_get_is_idempotent(ctx: &mut TaskTestContext) {
        let tasks = ctx.db().await.tasks();

        let first = tasks.create_or_get("Write report", None).await.unwrap();
        let second = tasks.create_or_get("Write report", None).await.unwrap();
        let trimmed = tasks.create_or_get("  Write report  ", None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, trimmed);
        assert_eq!(tasks.list().await.unwrap().len(), 1);
    }

    #[test_context(TaskTestContext)]
    #[tokio::test]
    async fn test_create_duplicate_is_rejected(ctx: &mut TaskTestContext) {
        let tasks = ctx.db().await.tasks();

        tasks.create("Write report", None).await.unwrap();
        let err = tasks.create("Write report", None).await.unwrap_err();

        assert!(matches!(err, Error::DuplicateName { entity: "task", .. }));
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test_context(TaskTestContext)]
    #[tokio::test]
    async fn test_invalid_names_never_reach_the_store(ctx: &mut TaskTestContext) {
        let tasks = ctx.db().await.tasks();

        let too_long = "x".repeat(101);
        for name in ["ab", "   ", "notes/today", "back\\slash", too_long.as_str()] {
            let err = tasks.create(name, None).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{name:?} should be rejected");
        }
        assert!(tasks.create(&"x".repeat(100), None).await.is_ok());
        assert!(tasks.create("abc", None).await.is_ok());
    }

    #[test_context(TaskTestContext)]
    #[tokio::test]
    async fn test_list_is_ordered_and_filtered(ctx: &mut TaskTestContext) {
        let db = ctx.db().await;
        let tasks = db.tasks();
        let work = db.categories().create("Work", None).await.unwrap();

        let report = tasks.create("Write report", Some(work)).await.unwrap();
        tasks.create("Answer mail", None).await.unwrap();
        tasks.create("Book flights", None).await.unwrap();
        tasks.set_complete(report, true).await.unwrap();

        let names: Vec<_> = tasks.list().await.unwrap().into_iter().map(|task| task.name).collect();
        assert_eq!(names, vec!["Answer mail", "Book flights", "Write report"]);

        let done = tasks.filter_by_completion(TaskFilter::Complete).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].category_name.as_deref(), Some("Work"));
        assert_eq!(tasks.filter_by_completion(TaskFilter::Incomplete).await.unwrap().len(), 2);
    }

    #[test_context(TaskTestContext)]
    #[tokio::test]
    async fn test_set_category(ctx: &mut TaskTestContext) {
        let db = ctx.db().await;
        let tasks = db.tasks();
        let work = db.categories().create("Work", None).await.unwrap();
        let id = tasks.create("Write report", None).await.unwrap();

        tasks.set_category(id, Some(work)).await.unwrap();
        assert_eq!(tasks.get(id).await.unwrap().category_id, Some(work));

        tasks.set_category(id, None).await.unwrap();
        assert_eq!(tasks.get(id).await.unwrap().category_id, None);

        let err = tasks.set_category(404, Some(work)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "task", id: 404 }));
    }

    #[test_context(TaskTestContext)]
    #[tokio::test]
    async fn test_replace_tags(ctx: &mut TaskTestContext) {
        let tasks = ctx.db().await.tasks();
        let id = tasks.create("Write report", None).await.unwrap();

        tasks.replace_tags(id, ["urgent", " q3 ", "urgent", ""]).await.unwrap();
        assert_eq!(tasks.tags(id).await.unwrap(), tags(&["q3", "urgent"]));

        tasks.replace_tags(id, ["review"]).await.unwrap();
        assert_eq!(tasks.get(id).await.unwrap().tags, tags(&["review"]));

        tasks.replace_tags(id, Vec::<String>::new()).await.unwrap();
        assert!(tasks.tags(id).await.unwrap().is_empty());
    }

    #[test_context(TaskTestContext)]
    #[tokio::test]
    async fn test_replace_tags_is_atomic(ctx: &mut TaskTestContext) {
        let db = ctx.db().await;
        let tasks = db.tasks();
        let id = tasks.create("Write report", None).await.unwrap();
        tasks.replace_tags(id, ["draft", "q3"]).await.unwrap();

        // Make the store reject one tag partway through the insert loop.
        let side = rusqlite::Connection::open(db.path()).unwrap();
        side.execute_batch(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON TaskTags
             WHEN NEW.Tag = 'boom'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
        drop(side);

        let err = tasks.replace_tags(id, ["alpha", "boom", "zeta"]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        assert_eq!(tasks.tags(id).await.unwrap(), tags(&["draft", "q3"]));
    }

    #[test_context(TaskTestContext)]
    #[tokio::test]
    async fn test_delete_cascades_to_sessions_and_tags(ctx: &mut TaskTestContext) {
        let db = ctx.db().await;
        let tasks = db.tasks();
        let sessions = db.sessions();
        let work = db.categories().create("Work", Some("#FF5733")).await.unwrap();

        let id = tasks.create("Write report", Some(work)).await.unwrap();
        let keep = tasks.create("Answer mail", Some(work)).await.unwrap();
        tasks.replace_tags(id, ["draft", "q3"]).await.unwrap();

        let start = chrono::Utc::now() - chrono::Duration::hours(3);
        for hour in 0..3 {
            let at = start + chrono::Duration::hours(hour);
            let session = sessions.insert_open(id, at, None).await.unwrap();
            sessions.close(session, at + chrono::Duration::minutes(30), None).await.unwrap();
        }
        let other = sessions.insert_open(keep, start, None).await.unwrap();
        assert_eq!(sessions.for_task(id).await.unwrap().len(), 3);

        tasks.delete(id).await.unwrap();

        assert!(matches!(tasks.get(id).await, Err(Error::NotFound { .. })));
        assert!(sessions.for_task(id).await.unwrap().is_empty());
        assert!(tasks.tags(id).await.unwrap().is_empty());

        let category = db.categories().get(work).await.unwrap();
        assert_eq!(category.name, "Work");
        assert_eq!(category.color, "#FF5733");
        assert_eq!(tasks.get(keep).await.unwrap().category_id, Some(work));
        assert_eq!(sessions.get(other).await.unwrap().task_id, keep);

        assert!(matches!(tasks.delete(id).await, Err(Error::NotFound { .. })));
    }
}
