use crate::cmd::{CmdError, CmdResult, ConnectionContext, ServerContext};
use crate::resp::Resp;
use crate::store::DataType;

/// HSET key field value [field value ...]
pub fn hset(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let fields = &conn.args[1..];
    if fields.len() % 2 != 0 {
        return Err(CmdError::WrongArity("hset".to_string()));
    }
    let pairs: Vec<_> = fields
        .chunks_exact(2)
        .map(|p| (p[0].clone(), p[1].clone()))
        .collect();
    let db = server.db(conn);
    let key = conn.args[0].clone();
    let added = db.hash.hset(key.clone(), &pairs);
    db.record_type(&key, DataType::Hash);
    conn.reply(Resp::Integer(added as i64));
    Ok(())
}

pub fn hget(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let value = server.db(conn).hash.hget(&conn.args[0], &conn.args[1]);
    conn.reply(value.map_or_else(Resp::null, Resp::bulk));
    Ok(())
}

pub fn hgetall(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let pairs = server.db(conn).hash.hgetall(&conn.args[0]);
    conn.reply(Resp::bulk_array(pairs.into_iter().flat_map(|(f, v)| [f, v])));
    Ok(())
}

pub fn hdel(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let removed = server.db(conn).hash.hdel(&conn.args[0], &conn.args[1..]);
    conn.reply(Resp::Integer(removed as i64));
    Ok(())
}

pub fn hexists(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let found = server.db(conn).hash.hexists(&conn.args[0], &conn.args[1]);
    conn.reply(Resp::Integer(found as i64));
    Ok(())
}

pub fn hlen(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let len = server.db(conn).hash.hlen(&conn.args[0]);
    conn.reply(Resp::Integer(len as i64));
    Ok(())
}
