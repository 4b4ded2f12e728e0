use anyhow::Result;
use bincode;
use brewpress_api::notify::{Notification, Severity};
use brewpress_api::remote::{HostEvent, Snapshot};
use brewpress_api::sensor::SensorReading;
use futures_util::{SinkExt, StreamExt};
use std::fmt::Debug;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Message;
use tracing::{event, Level};

// Lines buffered before the history file is written
const HISTORY_BATCH: usize = 16;

/// Main tokio runtime loop. Everything that must not stall a poll loop runs here.
///
/// Returns once every sensor has dropped its end of `event_rx` and the backlog is written.
pub async fn tokio_main(
    event_rx: mpsc::Receiver<HostEvent>,
    listener: TcpListener,
    history: HistoryLog,
) -> Result<()> {
    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

    let feed = tokio::task::spawn(serve_state_feed(listener, snapshot_rx));
    let events = tokio::task::spawn(process_events(event_rx, snapshot_tx, history));

    // The state feed has no natural end, it goes down with the event channel
    let result = events.await;
    feed.abort();
    result?;

    Ok(())
}

/// Apply sensor events: live values go to the snapshot, history to disk, notifications to the log.
pub async fn process_events(
    mut event_rx: mpsc::Receiver<HostEvent>,
    snapshot_tx: watch::Sender<Snapshot>,
    mut history: HistoryLog,
) {
    while let Some(host_event) = event_rx.recv().await {
        match host_event {
            HostEvent::Live(reading) => {
                snapshot_tx.send_modify(|snapshot| {
                    snapshot.readings.insert(reading.sensor.clone(), reading);
                });
            }
            HostEvent::History(reading) => {
                if let Err(e) = history.append(&reading).await {
                    event!(
                        Level::ERROR,
                        "failed to append history for {}: {}",
                        reading.sensor,
                        e
                    );
                }
            }
            HostEvent::Notify(notification) => log_notification(&notification),
        }
    }

    if let Err(e) = history.flush().await {
        event!(Level::ERROR, "failed to flush history: {}", e);
    }

    event!(Level::INFO, "event channel closed");
}

/// Surface a user notification in the process log at a matching level.
pub fn log_notification(notification: &Notification) {
    match notification.severity {
        Severity::Error => event!(
            Level::ERROR,
            title = %notification.title,
            "{}",
            notification.message
        ),
        Severity::Warning => event!(
            Level::WARN,
            title = %notification.title,
            "{}",
            notification.message
        ),
    }
}

/// Append-only history in InfluxDB line protocol.
///
/// Entries are buffered and written in batches, `flush` writes whatever is pending.
pub struct HistoryLog {
    file: File,
    buf: String,
    entries: usize,
}

impl HistoryLog {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        event!(Level::INFO, "appending history to {}", path.display());

        Ok(Self {
            file,
            buf: String::new(),
            entries: 0,
        })
    }

    pub async fn append(&mut self, reading: &SensorReading) -> Result<()> {
        self.buf.push_str(&reading.to_line_protocol());
        self.buf.push('\n');
        self.entries += 1;

        if self.entries >= HISTORY_BATCH {
            self.flush().await?;
        }

        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }

        self.file.write_all(self.buf.as_bytes()).await?;
        self.file.flush().await?;
        self.buf.clear();
        self.entries = 0;

        Ok(())
    }
}

/// Serve the state feed until the listener fails or the task is aborted.
///
/// Clients are tracked in a `JoinSet`, so aborting the feed disconnects all of them.
async fn serve_state_feed(listener: TcpListener, snapshot_rx: watch::Receiver<Snapshot>) {
    let mut clients = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        event!(Level::ERROR, "state feed listener failed: {}", e);
                        break;
                    }
                };

                let snapshot_rx = snapshot_rx.clone();
                clients.spawn(async move {
                    match stream_snapshots(stream, snapshot_rx).await {
                        Ok(()) => event!(Level::INFO, "state feed client {} disconnected", peer),
                        Err(e) => event!(Level::WARN, "state feed client {} dropped: {}", peer, e),
                    }
                });
                event!(
                    Level::INFO,
                    "state feed client {} connected, {} open",
                    peer,
                    clients.len()
                );
            }
            Some(joined) = clients.join_next() => {
                if let Err(e) = joined {
                    event!(Level::ERROR, "state feed client task failed: {}", e);
                }
            }
        }
    }
}

/// Upgrade one client to a WebSocket and push snapshots to it until either side hangs up.
async fn stream_snapshots(
    stream: TcpStream,
    snapshot_rx: watch::Receiver<Snapshot>,
) -> Result<()> {
    let (ws_tx, ws_rx) = tokio_tungstenite::accept_async(stream).await?.split();

    // The read half only watches for the close
    tokio::select! {
        r = ws_read(ws_rx) => r,
        r = ws_write(ws_tx, snapshot_rx) => r,
    }
}

/// Drain incoming messages until the client closes the connection.
///
/// The feed is read-only, anything other than control frames is ignored.
async fn ws_read<
    R: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
>(
    mut ws_rx: R,
) -> Result<()> {
    while let Some(msg) = ws_rx.next().await {
        let msg = msg?;

        if msg.is_close() {
            break;
        }
        if msg.is_binary() || msg.is_text() {
            event!(Level::DEBUG, "ignoring message on read-only state feed");
        }
    }

    Ok(())
}

/// Send the current snapshot, then every change to it, bincode encoded.
async fn ws_write<T: SinkExt<Message> + Unpin + Debug>(
    mut ws_tx: T,
    mut snapshot_rx: watch::Receiver<Snapshot>,
) -> Result<()>
where
    <T as futures_util::Sink<Message>>::Error:
        'static + std::error::Error + std::marker::Send + Sync,
{
    loop {
        let snapshot = snapshot_rx.borrow_and_update().clone();

        match bincode::serialize(&snapshot) {
            Ok(msg) => ws_tx.send(Message::Binary(msg)).await?,
            Err(e) => event!(
                Level::ERROR,
                "failed to serialize outgoing snapshot: {}",
                e
            ),
        }

        if snapshot_rx.changed().await.is_err() {
            break;
        }
    }

    Ok(())
}
