use crate::cmd::notify::{self, EVENT_DEL, EVENT_EXPIRE};
use crate::cmd::resolve::{owners, resolve};
use crate::cmd::scan::{collect_keys, count_keys, scan_once};
use crate::cmd::{CmdError, CmdResult, ConnectionContext, ServerContext, parse_int};
use crate::pattern::KeyPattern;
use crate::resp::Resp;
use bytes::Bytes;

pub fn type_(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let db = server.db(conn);
    let name = match resolve(db, &conn.args[0])? {
        Some(t) => t.name(),
        None => "none",
    };
    conn.reply(Resp::SimpleString(Bytes::from_static(name.as_bytes())));
    Ok(())
}

pub fn ttl(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let db = server.db(conn);
    let key = &conn.args[0];
    let ttl = match resolve(db, key)? {
        Some(t) => db.store(t).ttl(key)?,
        None => -2,
    };
    conn.reply(Resp::Integer(ttl));
    Ok(())
}

pub fn pttl(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let db = server.db(conn);
    let key = &conn.args[0];
    let ttl = match resolve(db, key)? {
        Some(t) => db.store(t).pttl(key)?,
        None => -2,
    };
    conn.reply(Resp::Integer(ttl));
    Ok(())
}

pub fn expire(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let seconds = parse_int(&conn.args[1])?;
    let db = server.db(conn);
    let key = &conn.args[0];
    let Some(t) = resolve(db, key)? else {
        conn.reply(Resp::Integer(-2));
        return Ok(());
    };
    let applied = db.store(t).expire(key, seconds)?;
    conn.reply(Resp::Integer(applied));
    if applied == 1 {
        if seconds > 0 {
            notify::notify_keyspace_event(server, db.index(), key, EVENT_EXPIRE);
        } else {
            db.forget_type(key, t);
            notify::notify_keyspace_event(server, db.index(), key, EVENT_DEL);
        }
    }
    Ok(())
}

pub fn persist(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let db = server.db(conn);
    let key = &conn.args[0];
    let removed = match resolve(db, key)? {
        Some(t) => db.store(t).persist(key)?,
        None => 0,
    };
    conn.reply(Resp::Integer(removed));
    Ok(())
}

/// Counts one hit per store holding each key.
pub fn exists(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let db = server.db(conn);
    let mut hits = 0;
    for key in &conn.args {
        hits += owners(db, key)?.len() as i64;
    }
    conn.reply(Resp::Integer(hits));
    Ok(())
}

/// Clears each key from every store holding it.
pub fn del(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let db = server.db(conn);
    let mut removed = 0;
    let mut deleted_keys = Vec::new();
    for key in &conn.args {
        let mut cleared = 0;
        for t in owners(db, key)? {
            cleared += db.store(t).clear(key)?;
        }
        if cleared > 0 {
            db.forget_key(key);
            deleted_keys.push(key.clone());
        }
        removed += cleared;
    }
    conn.reply(Resp::Integer(removed));
    for key in deleted_keys {
        notify::notify_keyspace_event(server, db.index(), &key, EVENT_DEL);
    }
    Ok(())
}

/// SCAN cursor [COUNT n] [MATCH pattern]
pub fn scan(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let cursor = &conn.args[0];
    let mut count: i64 = -1;
    let mut pattern = KeyPattern::all();
    for opt in conn.args[1..].chunks(2) {
        let [name, value] = opt else {
            return Err(CmdError::Syntax);
        };
        if name.eq_ignore_ascii_case(b"count") {
            count = parse_int(value)?;
        } else if name.eq_ignore_ascii_case(b"match") {
            pattern = KeyPattern::compile(value);
        } else {
            return Err(CmdError::Syntax);
        }
    }

    let page = scan_once(server.db(conn), cursor, count, &pattern)?;
    conn.reply(Resp::array(vec![
        Resp::bulk(page.cursor),
        Resp::bulk_array(page.keys),
    ]));
    Ok(())
}

pub fn keys(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let pattern = KeyPattern::compile(&conn.args[0]);
    let keys = collect_keys(server.db(conn), server.config.scan_batch_size, &pattern)?;
    conn.reply(Resp::bulk_array(keys));
    Ok(())
}

pub fn dbsize(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let total = count_keys(server.db(conn), server.config.scan_batch_size)?;
    conn.reply(Resp::Integer(total as i64));
    Ok(())
}

pub fn flushdb(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    server.db(conn).flush()?;
    conn.reply(Resp::ok());
    Ok(())
}

pub fn flushall(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    for db in server.databases.iter() {
        db.flush()?;
    }
    conn.reply(Resp::ok());
    Ok(())
}
