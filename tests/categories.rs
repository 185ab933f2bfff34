#[cfg(test)]
mod tests {
    use pricis::db::db::{Db, OpenOutcome};
    use pricis::libs::config::Config;
    use pricis::libs::error::{Error, ErrorKind};
    use tempfile::TempDir;
    use test_context::{test_context, AsyncTestContext};

    struct CategoryTestContext {
        temp_dir: TempDir,
    }

    impl AsyncTestContext for CategoryTestContext {
        async fn setup() -> Self {
            CategoryTestContext {
                temp_dir: tempfile::tempdir().unwrap(),
            }
        }
    }

    impl CategoryTestContext {
        fn config(&self) -> Config {
            let mut config = Config::in_dir(self.temp_dir.path());
            config.database.retry_delay_ms = 1;
            config
        }
    }

    #[test_context(CategoryTestContext)]
    #[tokio::test]
    async fn test_create_and_list(ctx: &mut CategoryTestContext) {
        let (db, _) = Db::open(&ctx.config()).await.unwrap();
        let categories = db.categories();

        categories.create("Work", Some("#ff5733")).await.unwrap();
        categories.create("Personal", None).await.unwrap();

        let list = categories.list().await.unwrap();
        let names: Vec<_> = list.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Personal", "Work"]);
        assert_eq!(list[0].color, "#FFFFFF");
        assert_eq!(list[1].color, "#FF5733");
    }

    #[test_context(CategoryTestContext)]
    #[tokio::test]
    async fn test_invalid_input_is_rejected(ctx: &mut CategoryTestContext) {
        let (db, _) = Db::open(&ctx.config()).await.unwrap();
        let categories = db.categories();

        assert!(matches!(categories.create("Work", Some("orange")).await, Err(Error::InvalidColor(_))));
        assert_eq!(categories.create(" ", None).await.unwrap_err().kind(), ErrorKind::Validation);

        categories.create("Work", None).await.unwrap();
        assert!(matches!(
            categories.create("Work", Some("#000000")).await,
            Err(Error::DuplicateName { entity: "category", .. })
        ));
    }

    #[test_context(CategoryTestContext)]
    #[tokio::test]
    async fn test_delete_leaves_tasks_uncategorized(ctx: &mut CategoryTestContext) {
        let (db, _) = Db::open(&ctx.config()).await.unwrap();
        let work = db.categories().create("Work", None).await.unwrap();
        let task = db.tasks().create("Write report", Some(work)).await.unwrap();

        db.categories().delete(work).await.unwrap();

        let task = db.tasks().get(task).await.unwrap();
        assert_eq!(task.category_id, None);
        assert_eq!(task.category_name, None);
        assert!(db.categories().get_by_name("Work").await.unwrap().is_none());
        assert!(matches!(db.categories().delete(work).await, Err(Error::NotFound { .. })));
    }

    #[test_context(CategoryTestContext)]
    #[tokio::test]
    async fn test_defaults_are_seeded_only_on_creation(ctx: &mut CategoryTestContext) {
        let mut config = ctx.config();
        config.database.seed_default_categories = true;

        let (db, outcome) = Db::open(&config).await.unwrap();
        assert_eq!(outcome, OpenOutcome::Created);
        let work = db.categories().get_by_name("Work").await.unwrap().unwrap();
        assert_eq!(work.color, "#FF5733");
        db.categories().delete(work.id).await.unwrap();
        db.close().await.unwrap();

        let (db, outcome) = Db::open(&config).await.unwrap();
        assert_eq!(outcome, OpenOutcome::Opened);
        let names: Vec<_> = db.categories().list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Personal", "Study"]);
    }
}
