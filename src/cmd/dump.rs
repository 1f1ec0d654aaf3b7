use crate::cmd::notify::{self, EVENT_RENAME_FROM, EVENT_RENAME_TO};
use crate::cmd::resolve::{owners, resolve};
use crate::cmd::{CmdError, CmdResult, ConnectionContext, ServerContext, parse_int};
use crate::resp::Resp;
use crate::store::{DataType, StoreError};

pub fn dump(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let db = server.db(conn);
    let key = &conn.args[0];
    let blob = match resolve(db, key)? {
        Some(t) => db.store(t).dump(key)?,
        None => None,
    };
    let blob = blob.ok_or(CmdError::NoSuchKey)?;
    conn.reply(Resp::bulk(blob));
    Ok(())
}

/// RENAME src dst
///
/// Moves the value within the store that owns `src`: dump, read the TTL,
/// clear, restore under `dst`. These are separate store calls. The TTL moves
/// in milliseconds so a key about to expire keeps what it has left. When
/// `src` does not exist nothing is written back at all.
pub fn rename(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let db = server.db(conn);
    let (src, dst) = (&conn.args[0], &conn.args[1]);
    let Some(t) = resolve(db, src)? else {
        return Ok(());
    };
    let store = db.store(t);
    let Some(blob) = store.dump(src)? else {
        return Ok(());
    };
    let ttl_ms = store.pttl(src)?;
    if ttl_ms == -2 {
        // Expired between the dump and the TTL read.
        return Ok(());
    }
    store.clear(src)?;
    db.forget_type(src, t);
    store.restore(dst, ttl_ms, &blob)?;
    db.record_type(dst, t);

    conn.reply(Resp::ok());
    notify::notify_keyspace_event(server, db.index(), src, EVENT_RENAME_FROM);
    notify::notify_keyspace_event(server, db.index(), dst, EVENT_RENAME_TO);
    Ok(())
}

/// RESTORE key ttl-ms blob [REPLACE]
///
/// The store is picked from the type tag at the head of the blob. A TTL of 0
/// means no expiry.
pub fn restore(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let ttl_ms = parse_int(&conn.args[1])?;
    if ttl_ms < 0 {
        return Err(CmdError::InvalidTtl);
    }
    let mut replace = false;
    for opt in &conn.args[3..] {
        if opt.eq_ignore_ascii_case(b"replace") {
            replace = true;
        } else {
            return Err(CmdError::Syntax);
        }
    }
    let blob = &conn.args[2];
    let t = blob
        .first()
        .and_then(|&tag| DataType::from_tag(tag))
        .ok_or(StoreError::BadPayload)?;

    let db = server.db(conn);
    let key = &conn.args[0];
    let existing = owners(db, key)?;
    if !existing.is_empty() {
        if !replace {
            return Err(CmdError::BusyKey);
        }
        for o in existing {
            db.store(o).clear(key)?;
        }
        db.forget_key(key);
    }
    let ttl_ms = if ttl_ms == 0 { -1 } else { ttl_ms };
    db.store(t).restore(key, ttl_ms, blob)?;
    db.record_type(key, t);
    conn.reply(Resp::ok());
    Ok(())
}
