use celery::{prelude::TaskError, task::Task};
use tracing::error;

pub async fn failure_callback<T: Task>(task: &T, err: &TaskError) {
    match err {
        TaskError::TimeoutError => error!("Task {} timed out", task.name()),
        _ => error!("Task {} failed with {:?}", task.name(), err),
    };
}
