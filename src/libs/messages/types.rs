/// Every user-facing line the binary prints.
#[derive(Debug, Clone)]
pub enum Message {
    // === DATABASE MESSAGES ===
    DatabaseCreated(String),  // path
    DatabaseRecreated(String), // reason
    DatabaseOptimized,
    DatabaseHealthy,
    DatabaseUnhealthy(String), // quick_check verdict
    DatabaseRepaired(String),  // reason
    DatabaseNeedsNoRepair,
    StorageBusy,

    // === TASK MESSAGES ===
    TaskCreated(i64, String), // id, name
    TaskMarkedComplete(i64),
    TaskMarkedIncomplete(i64),
    TaskTagsReplaced(i64, usize),
    TaskCategoryChanged(i64),
    TaskDeleted(i64),
    TasksNotFound,

    // === CATEGORY MESSAGES ===
    CategoryCreated(i64, String),
    CategoryDeleted(i64),
    CategoryNotFound(String),
    CategoriesNotFound,

    // === SESSION MESSAGES ===
    SessionStarted(i64, String), // session id, task name
    SessionPaused(String),       // elapsed
    SessionResumed,
    SessionStopped(String), // elapsed
    SessionActive(i64),
    SessionsNotFound,
    TimerIdle,

    // === SUMMARY MESSAGES ===
    SummaryByTaskHeader,
    SummaryByCategoryHeader,
    SummaryEmpty,
}
