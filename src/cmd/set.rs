use crate::cmd::{CmdResult, ConnectionContext, ServerContext};
use crate::resp::Resp;
use crate::store::DataType;
use bytes::Bytes;

pub fn sadd(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let db = server.db(conn);
    let key = conn.args[0].clone();
    let added = db.set.sadd(key.clone(), &conn.args[1..]);
    db.record_type(&key, DataType::Set);
    conn.reply(Resp::Integer(added as i64));
    Ok(())
}

/// Empty members are dropped before removal.
pub fn srem(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let members: Vec<Bytes> = conn.args[1..].iter().filter(|m| !m.is_empty()).cloned().collect();
    let removed = if members.is_empty() {
        0
    } else {
        server.db(conn).set.srem(&conn.args[0], &members)
    };
    conn.reply(Resp::Integer(removed as i64));
    Ok(())
}

pub fn smembers(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let members = server.db(conn).set.smembers(&conn.args[0]);
    conn.reply(Resp::bulk_array(members));
    Ok(())
}

pub fn scard(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let len = server.db(conn).set.scard(&conn.args[0]);
    conn.reply(Resp::Integer(len as i64));
    Ok(())
}

pub fn sismember(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let found = server.db(conn).set.sismember(&conn.args[0], &conn.args[1]);
    conn.reply(Resp::Integer(found as i64));
    Ok(())
}
