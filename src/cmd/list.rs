use crate::cmd::{CmdResult, ConnectionContext, ServerContext, parse_int};
use crate::resp::Resp;
use crate::store::DataType;

fn push(conn: &mut ConnectionContext, server: &ServerContext, front: bool) -> CmdResult {
    let db = server.db(conn);
    let key = conn.args[0].clone();
    let len = db.list.push(key.clone(), &conn.args[1..], front);
    db.record_type(&key, DataType::List);
    conn.reply(Resp::Integer(len as i64));
    Ok(())
}

pub fn lpush(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    push(conn, server, true)
}

pub fn rpush(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    push(conn, server, false)
}

pub fn lrange(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let start = parse_int(&conn.args[1])?;
    let stop = parse_int(&conn.args[2])?;
    let items = server.db(conn).list.range(&conn.args[0], start, stop);
    conn.reply(Resp::bulk_array(items));
    Ok(())
}

pub fn llen(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let len = server.db(conn).list.llen(&conn.args[0]);
    conn.reply(Resp::Integer(len as i64));
    Ok(())
}

/// LREM key count value
///
/// Every occurrence is removed whatever `count` says; it only has to be an
/// integer. The remaining elements keep their order and the key its TTL.
pub fn lrem(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    parse_int(&conn.args[1])?;
    let removed = server.db(conn).list.remove_all(&conn.args[0], &conn.args[2]);
    conn.reply(Resp::Integer(removed as i64));
    Ok(())
}

pub fn lset(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let index = parse_int(&conn.args[1])?;
    server
        .db(conn)
        .list
        .set_index(&conn.args[0], index, conn.args[2].clone())?;
    conn.reply(Resp::ok());
    Ok(())
}
