#![allow(dead_code)]
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
#[path = "../cmd/mod.rs"]
mod cmd;
#[path = "../conf.rs"]
mod conf;
#[path = "../pattern.rs"]
mod pattern;
#[path = "../pubsub.rs"]
mod pubsub;
#[path = "../resp.rs"]
mod resp;
#[path = "../store/mod.rs"]
mod store;

#[cfg(test)]
#[path = "../tests/mod.rs"]
mod tests;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && (args[1] == "-v" || args[1] == "--version") {
        println!("v{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let cfg_path = args.get(1);
    let cfg = match conf::load_config(cfg_path.map(|s| s.as_str())) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config {:?}, using default: {}", cfg_path, e);
            conf::Config::default()
        }
    };

    // RUST_LOG wins over the loglevel directive.
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.loglevel));
    if let Some(path) = cfg.logfile.clone() {
        let file_appender = tracing_appender::rolling::never(".", path);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(non_blocking)
            .with_ansi(false)
            .init();
        // Dropping the guard flushes the log, so it lives as long as the server.
        run_server(cfg, Some(guard)).await;
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
        run_server(cfg, None).await;
    }
}

async fn run_server(cfg: conf::Config, _guard: Option<tracing_appender::non_blocking::WorkerGuard>) {
    let addr = cfg.address();
    info!("starting server, listen on {}", addr);
    if let Some(path) = &cfg.logfile {
        info!("logging to file: {}", path);
    }
    info!(
        "{} databases, scan batch size {}, type index cache {}",
        cfg.databases,
        cfg.scan_batch_size,
        if cfg.type_index_cache { "on" } else { "off" }
    );

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {}: {}", addr, e);
            return;
        }
    };

    let server_ctx = cmd::ServerContext::new(cfg);

    // Background task to drop expired keys
    let databases_for_cleanup = server_ctx.databases.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            for db in databases_for_cleanup.iter() {
                let purged = db.purge_expired();
                if purged > 0 {
                    debug!("db {}: purged {} expired keys", db.index(), purged);
                }
            }
        }
    });

    let next_connection_id = Arc::new(AtomicU64::new(1));

    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
                break;
            }
        };
        let (mut socket, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        info!("accepted connection from {}", addr);

        let current_clients = server_ctx.client_count.load(Ordering::Relaxed);
        if current_clients >= server_ctx.config.maxclients {
            warn!("max number of clients reached, rejecting connection from {}", addr);
            let _ = socket.write_all(b"-ERR max number of clients reached\r\n").await;
            continue;
        }

        let server_ctx_cloned = server_ctx.clone();
        let connection_id = next_connection_id.fetch_add(1, Ordering::Relaxed);
        let (sink, rx) = cmd::ReplySink::channel();
        let session = cmd::ClientSession::open(
            &server_ctx,
            cmd::ConnectionContext::new(connection_id, addr.to_string(), sink),
        );

        tokio::spawn(async move {
            handle_connection(socket, session, rx, &server_ctx_cloned).await;
            info!("connection {} from {} closed", connection_id, addr);
        });
    }
}

async fn handle_connection(
    socket: TcpStream,
    mut session: cmd::ClientSession,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<resp::Resp>,
    server_ctx: &cmd::ServerContext,
) {
    let (read_half, write_half) = socket.into_split();

    // Writer task
    tokio::spawn(async move {
        let mut writer = BufWriter::new(write_half);
        while let Some(resp) = rx.recv().await {
            if resp::write_frame(&mut writer, &resp).await.is_err() {
                break;
            }
            // Flush once the queue is drained so pipelined replies share a write.
            if rx.is_empty() && writer.flush().await.is_err() {
                break;
            }
        }
    });

    // Frame channel
    let (frame_tx, mut frame_rx) = tokio::sync::mpsc::channel(32);

    // Reader task
    let reader_addr = session.conn.addr.clone();
    tokio::spawn(async move {
        let mut reader = BufReader::new(read_half);
        loop {
            match resp::read_frame(&mut reader).await {
                Ok(Some(frame)) => {
                    if frame_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    debug!("read error from {}: {}", reader_addr, e);
                    break;
                }
            }
        }
    });

    while let Some(frame) = frame_rx.recv().await {
        let _ = cmd::process_frame(frame, &mut session.conn, server_ctx);
    }
}
