use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;

use crate::models::{Achievement, HistoryStore, Session};
use crate::settings::Settings;
use migrations::run_migrations;

const HISTORY_KEY: &str = "history";

type StoreTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StoreCommand {
    Execute(StoreTask),
    Shutdown,
}

struct StoreInner {
    sender: mpsc::Sender<StoreCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StoreCommand::Shutdown) {
                error!("Failed to send shutdown to store thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join store thread: {join_err:?}");
            }
        }
    }
}

/// Durable home of the whole application state: the `HistoryStore` blob
/// lives as one JSON value in SQLite, owned by a dedicated worker thread.
/// All access goes through that thread, so blob read-modify-write cycles
/// never race.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
    db_path: Arc<PathBuf>,
}

impl Store {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<StoreCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("sitwell-store".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run store migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("Store initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StoreCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        StoreCommand::Shutdown => break,
                    }
                }

                info!("Store thread shutting down");
            })
            .with_context(|| "failed to spawn store worker thread")?;

        ready_rx
            .recv()
            .context("store worker exited before signaling readiness")??;

        info!("Store initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(StoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Store caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to store thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("store thread terminated unexpectedly"))?
    }

    /// Load the full history. A missing or unreadable blob yields defaults;
    /// settings stored by older versions merge over the current defaults.
    pub async fn load(&self) -> Result<HistoryStore> {
        self.execute(|conn| Ok(read_history(conn))).await
    }

    pub async fn save(&self, history: HistoryStore) -> Result<()> {
        self.execute(move |conn| {
            let mut record = history;
            record.last_save = Some(Utc::now());
            write_history(conn, &record)
        })
        .await
    }

    /// Replace-or-append one session in the stored history. Last write wins;
    /// the tracker is the only writer for a given session id.
    pub async fn upsert_session(&self, session: Session) -> Result<()> {
        self.execute(move |conn| {
            let mut history = read_history(conn);
            history.upsert_session(session);
            history.last_save = Some(Utc::now());
            write_history(conn, &history)
        })
        .await
    }

    pub async fn append_achievements(&self, achievements: Vec<Achievement>) -> Result<()> {
        self.execute(move |conn| {
            let mut history = read_history(conn);
            history.append_achievements(achievements);
            history.last_save = Some(Utc::now());
            write_history(conn, &history)
        })
        .await
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        self.execute(move |conn| {
            let mut history = read_history(conn);
            history.settings = settings;
            history.last_save = Some(Utc::now());
            write_history(conn, &history)
        })
        .await
    }

    /// Reset the stored history to defaults. Irreversible.
    pub async fn clear(&self) -> Result<()> {
        self.execute(|conn| write_history(conn, &HistoryStore::default()))
            .await
    }
}

fn read_history(conn: &Connection) -> HistoryStore {
    let stored: Option<String> = match conn
        .query_row(
            "SELECT value FROM app_state WHERE key = ?1",
            params![HISTORY_KEY],
            |row| row.get(0),
        )
        .optional()
    {
        Ok(value) => value,
        Err(err) => {
            error!("Failed to read stored history: {err}");
            None
        }
    };

    match stored {
        Some(raw) => match serde_json::from_str::<HistoryStore>(&raw) {
            Ok(history) => history,
            Err(err) => {
                warn!("Stored history is unreadable, starting fresh: {err}");
                HistoryStore::default()
            }
        },
        None => HistoryStore::default(),
    }
}

fn write_history(conn: &Connection, history: &HistoryStore) -> Result<()> {
    let serialized = serde_json::to_string(history).context("failed to serialize history")?;
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![HISTORY_KEY, serialized],
    )
    .with_context(|| "failed to write history")?;
    Ok(())
}
