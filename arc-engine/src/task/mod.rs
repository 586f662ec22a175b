pub mod tasks;

pub use tasks::{BalanceSyncTask, DeltaNeutralTask, IcebergTask, SpotFuturesArbitrageTask};

use arc_instrument::{ExchangeId, Side, Symbol};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// `{timestamp}_{task_type}_{symbol}_{side}`, greppable by design.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(timestamp_ms: i64, task_type: &str, symbol: &Symbol, side: Side) -> Self {
        Self(format!("{timestamp_ms}_{task_type}_{symbol}_{side}"))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Return value of one [`Task::execute_once`] tick - the manager reads `next_delay` to
/// decide when to poll this task again, and drops it once `should_continue` is false.
#[derive(Debug, Clone)]
pub struct TaskStepOutcome {
    pub next_delay: Duration,
    pub should_continue: bool,
    pub state: String,
}

/// Free-form deltas applied to a running task's context - eg/ a revised
/// `max_exposure_usd` or an operator-issued exit-now flag. Kept as a JSON
/// value since each task type interprets its own shape.
pub type ContextDeltas = serde_json::Value;

/// Every Task Manager-supervised long-running operation. `async_trait` is used here
/// (rather than this workspace's usual async-fn-in-trait) because the manager holds a
/// heterogeneous `Vec<Box<dyn Task>>` and needs dynamic dispatch across task types.
#[async_trait]
pub trait Task: Send + Sync {
    fn id(&self) -> &TaskId;
    fn task_type(&self) -> &'static str;

    fn start(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn update(&mut self, deltas: ContextDeltas);

    async fn execute_once(&mut self) -> TaskStepOutcome;

    /// Serializable snapshot of this task's context, written to durable storage on
    /// every state transition.
    fn snapshot(&self) -> serde_json::Value;
}

/// One persisted task, as stored one-file-per-task under the task store directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub task_type: String,
    pub context: serde_json::Value,
}

fn snapshot_path(store_dir: &Path, task_id: &TaskId) -> PathBuf {
    store_dir.join(format!("{}.json", task_id.0))
}

/// Write `task`'s current snapshot to `store_dir`, one JSON file per task id.
pub fn persist_task(store_dir: &Path, task: &dyn Task) -> std::io::Result<()> {
    let snapshot = TaskSnapshot {
        task_id: task.id().clone(),
        task_type: task.task_type().to_string(),
        context: task.snapshot(),
    };
    std::fs::create_dir_all(store_dir)?;
    let payload = serde_json::to_vec_pretty(&snapshot)
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidData, error))?;
    std::fs::write(snapshot_path(store_dir, &snapshot.task_id), payload)
}

/// Delete a task's persisted snapshot, eg/ after it reaches a terminal
/// state and is dropped from the manager.
pub fn remove_persisted_task(store_dir: &Path, task_id: &TaskId) -> std::io::Result<()> {
    let path = snapshot_path(store_dir, task_id);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

/// Enumerate every persisted task under `store_dir`, for startup recovery.
pub fn load_persisted_tasks(store_dir: &Path) -> std::io::Result<Vec<TaskSnapshot>> {
    if !store_dir.exists() {
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::new();
    for entry in std::fs::read_dir(store_dir)? {
        let entry = entry?;
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let bytes = std::fs::read(entry.path())?;
        match serde_json::from_slice::<TaskSnapshot>(&bytes) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(error) => error!(?error, path = %entry.path().display(), "failed to parse persisted task, skipping"),
        }
    }
    Ok(snapshots)
}

/// Supervises N concurrent long-lived tasks, looping `execute_once` per task at its own
/// requested cadence and persisting on every tick.
pub struct TaskManager {
    store_dir: PathBuf,
    tasks: HashMap<TaskId, Box<dyn Task>>,
    /// When each task last ticked and how long it asked to wait before the next one.
    schedule: HashMap<TaskId, (Instant, Duration)>,
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("store_dir", &self.store_dir)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl TaskManager {
    pub fn new(store_dir: PathBuf) -> Self {
        Self {
            store_dir,
            tasks: HashMap::new(),
            schedule: HashMap::new(),
        }
    }

    pub fn spawn(&mut self, mut task: Box<dyn Task>) {
        task.start();
        let id = task.id().clone();
        if let Err(error) = persist_task(&self.store_dir, task.as_ref()) {
            warn!(%error, %id, "failed to persist newly spawned task");
        }
        // Due immediately: a freshly spawned task should get its first tick on the
        // manager's very next call to `tick_all`, not wait out a stale delay.
        self.schedule.insert(id.clone(), (Instant::now() - Duration::from_secs(3600), Duration::ZERO));
        self.tasks.insert(id, task);
    }

    pub fn stop(&mut self, task_id: &TaskId) {
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.stop();
        }
    }

    pub fn update(&mut self, task_id: &TaskId, deltas: ContextDeltas) {
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.update(deltas);
        }
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drive every supervised task that is due through exactly one `execute_once`
    /// tick, persisting its new context and dropping it if it reports
    /// `should_continue = false`. A task is due once `next_delay` has elapsed
    /// since its last tick - the caller is free to invoke this as often as it
    /// likes (eg/ once per scan interval) without over-polling a task that
    /// asked for a much longer cadence, such as a periodic balance sync.
    pub async fn tick_all(&mut self) -> Vec<(TaskId, TaskStepOutcome)> {
        let mut outcomes = Vec::new();
        let mut finished = Vec::new();
        let now = Instant::now();

        for (id, task) in self.tasks.iter_mut() {
            let due = self
                .schedule
                .get(id)
                .map(|(last_run, next_delay)| now.saturating_duration_since(*last_run) >= *next_delay)
                .unwrap_or(true);
            if !due {
                continue;
            }

            let outcome = task.execute_once().await;
            self.schedule.insert(id.clone(), (now, outcome.next_delay));

            if let Err(error) = persist_task(&self.store_dir, task.as_ref()) {
                warn!(%error, %id, "failed to persist task after tick");
            }

            if !outcome.should_continue {
                finished.push(id.clone());
            }
            outcomes.push((id.clone(), outcome));
        }

        for id in finished {
            self.tasks.remove(&id);
            self.schedule.remove(&id);
            if let Err(error) = remove_persisted_task(&self.store_dir, &id) {
                warn!(%error, %id, "failed to remove persisted snapshot for finished task");
            }
            info!(%id, "task finished and was dropped from the manager");
        }

        outcomes
    }
}

/// Reconciliation hooks a recovered task needs before it can safely resume. Concrete
/// task constructors call into this during recovery; kept as a trait so tests can stub
/// it without a live exchange.
#[async_trait]
pub trait ReconciliationSource: Send + Sync {
    async fn open_orders(&self, exchange: ExchangeId, symbol: &Symbol) -> Vec<arc_execution::Order>;
}
