use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub period: Duration,
    pub run_on_startup: bool,
}

/// Runs `job` once per period until `shutdown` resolves. A job that outlives
/// its period pushes the next tick back instead of stacking runs, and a
/// shutdown request waits for the running job. Returns the number of runs.
pub async fn run_until<Job, Fut, Shutdown>(
    schedule: Schedule,
    shutdown: Shutdown,
    mut job: Job,
) -> usize
where
    Job: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    Shutdown: Future<Output = ()>,
{
    let first_tick = match schedule.run_on_startup {
        true => Instant::now(),
        false => Instant::now() + schedule.period,
    };
    let mut interval = time::interval_at(first_tick, schedule.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);
    let mut runs = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = interval.tick() => {
                job().await;
                runs += 1;
            }
        }
    }
    runs
}
