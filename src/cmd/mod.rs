use crate::cmd::notify::KeyspaceNotifier;
use crate::conf::Config;
use crate::pubsub::PubSub;
use crate::resp::Resp;
use crate::store::{Database, StoreError};
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

mod command;
mod connection;
mod dump;
mod hash;
mod key;
mod list;
pub mod notify;
mod pubsub;
pub mod resolve;
pub mod scan;
mod set;
mod string;
mod zset;

pub use command::lookup;

#[derive(Debug, Error)]
pub enum CmdError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),
    #[error("ERR syntax error")]
    Syntax,
    #[error("ERR value is not an integer or out of range")]
    NotInteger,
    #[error("ERR value is not a valid float")]
    NotFloat,
    #[error("ERR no such key")]
    NoSuchKey,
    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpire(&'static str),
    #[error("ERR Invalid TTL value, must be >= 0")]
    InvalidTtl,
    #[error("BUSYKEY Target key name already exists.")]
    BusyKey,
    #[error("ERR DB index is out of range")]
    DbIndexOutOfRange,
    #[error("ERR unknown command '{0}'")]
    Unknown(String),
    #[error("ERR unknown subcommand '{0}'")]
    UnknownSubcommand(String),
    #[error("ERR Protocol error: {0}")]
    Protocol(&'static str),
    #[error("ERR {0}")]
    Storage(#[from] StoreError),
}

pub type CmdResult = Result<(), CmdError>;

pub type Handler = fn(&mut ConnectionContext, &ServerContext) -> CmdResult;

/// Outgoing side of a connection. Replies pushed here are written to the
/// socket by the connection's writer task, in order.
#[derive(Clone, Debug)]
pub struct ReplySink {
    tx: mpsc::UnboundedSender<Resp>,
}

impl ReplySink {
    pub fn new(tx: mpsc::UnboundedSender<Resp>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Resp>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// False once the connection is gone.
    pub fn send(&self, resp: Resp) -> bool {
        self.tx.send(resp).is_ok()
    }
}

pub struct ConnectionContext {
    pub id: u64,
    pub addr: String,
    pub db_index: usize,
    /// Arguments of the command being executed, name excluded.
    pub args: Vec<Bytes>,
    pub sink: ReplySink,
    pub subscriptions: HashSet<Bytes>,
    pub psubscriptions: HashSet<Bytes>,
}

impl ConnectionContext {
    pub fn new(id: u64, addr: String, sink: ReplySink) -> Self {
        Self {
            id,
            addr,
            db_index: 0,
            args: Vec::new(),
            sink,
            subscriptions: HashSet::new(),
            psubscriptions: HashSet::new(),
        }
    }

    pub fn reply(&self, resp: Resp) {
        self.sink.send(resp);
    }

    pub fn subscription_count(&self) -> i64 {
        (self.subscriptions.len() + self.psubscriptions.len()) as i64
    }
}

#[derive(Clone)]
pub struct ServerContext {
    pub databases: Arc<Vec<Database>>,
    pub config: Arc<Config>,
    pub pubsub: Arc<PubSub>,
    pub client_count: Arc<AtomicU64>,
    pub notifier: Arc<KeyspaceNotifier>,
}

impl ServerContext {
    pub fn new(config: Config) -> Self {
        let databases = (0..config.databases)
            .map(|i| Database::new(i, config.type_index_cache))
            .collect();
        let pubsub = Arc::new(PubSub::new());
        Self {
            databases: Arc::new(databases),
            config: Arc::new(config),
            notifier: Arc::new(KeyspaceNotifier::start(pubsub.clone())),
            pubsub,
            client_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn db(&self, conn: &ConnectionContext) -> &Database {
        &self.databases[conn.db_index]
    }
}

/// A connected client counted in `client_count`. Dropping the session, also
/// when unwinding out of a handler, uncounts it and forgets its subscriptions.
pub struct ClientSession {
    pub conn: ConnectionContext,
    server: ServerContext,
}

impl ClientSession {
    pub fn open(server: &ServerContext, conn: ConnectionContext) -> Self {
        server.client_count.fetch_add(1, Ordering::Relaxed);
        Self { conn, server: server.clone() }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.server
            .pubsub
            .remove_client(self.conn.id, &self.conn.subscriptions, &self.conn.psubscriptions);
        self.server.client_count.fetch_sub(1, Ordering::Relaxed);
    }
}

fn frame_to_args(frame: Resp) -> Result<(String, Vec<Bytes>), CmdError> {
    let items = match frame {
        Resp::Array(Some(items)) => items,
        _ => return Err(CmdError::Protocol("expected array of bulk strings")),
    };
    let mut args = Vec::with_capacity(items.len());
    for item in items {
        let arg = match item {
            Resp::BulkString(Some(b)) | Resp::SimpleString(b) => b,
            Resp::Integer(i) => Bytes::from(i.to_string()),
            _ => return Err(CmdError::Protocol("invalid argument type")),
        };
        args.push(arg);
    }
    if args.is_empty() {
        return Err(CmdError::Protocol("empty command"));
    }
    let name = String::from_utf8_lossy(&args.remove(0)).to_ascii_lowercase();
    Ok((name, args))
}

fn dispatch(name: &str, conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let Some(info) = lookup(name) else {
        return Err(CmdError::Unknown(name.to_string()));
    };
    let argc = conn.args.len() as i64 + 1;
    if (info.arity > 0 && argc != info.arity) || (info.arity < 0 && argc < -info.arity) {
        return Err(CmdError::WrongArity(info.name.to_string()));
    }
    (info.handler)(conn, server)
}

/// Runs one request frame. Replies (including the error reply on failure)
/// are written to the connection's sink.
pub fn process_frame(frame: Resp, conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let started = Instant::now();
    let (name, result) = match frame_to_args(frame) {
        Ok((name, args)) => {
            conn.args = args;
            let result = dispatch(&name, conn, server);
            (name, result)
        }
        Err(e) => (String::new(), Err(e)),
    };
    conn.args.clear();

    if let Err(e) = &result {
        conn.reply(Resp::Error(e.to_string()));
    }
    debug!(
        target: "access",
        "{} db={} cmd={} {}us {}",
        conn.addr,
        conn.db_index,
        name,
        started.elapsed().as_micros(),
        match &result {
            Ok(()) => "OK".to_string(),
            Err(e) => e.to_string(),
        }
    );
    result
}

pub(crate) fn parse_int(arg: &[u8]) -> Result<i64, CmdError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(CmdError::NotInteger)
}

pub(crate) fn parse_float(arg: &[u8]) -> Result<f64, CmdError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| !f.is_nan())
        .ok_or(CmdError::NotFloat)
}
