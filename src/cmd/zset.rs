use crate::cmd::{CmdError, CmdResult, ConnectionContext, ServerContext, parse_float, parse_int};
use crate::resp::Resp;
use crate::store::DataType;
use bytes::Bytes;

fn format_score(score: f64) -> Bytes {
    if score.is_infinite() {
        return Bytes::from_static(if score > 0.0 { b"inf" } else { b"-inf" });
    }
    Bytes::from(score.to_string())
}

/// ZADD key score member [score member ...]
pub fn zadd(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let rest = &conn.args[1..];
    if rest.len() % 2 != 0 {
        return Err(CmdError::Syntax);
    }
    let mut pairs = Vec::with_capacity(rest.len() / 2);
    for p in rest.chunks_exact(2) {
        pairs.push((parse_float(&p[0])?, p[1].clone()));
    }
    let db = server.db(conn);
    let key = conn.args[0].clone();
    let added = db.zset.zadd(key.clone(), &pairs);
    db.record_type(&key, DataType::ZSet);
    conn.reply(Resp::Integer(added as i64));
    Ok(())
}

/// Empty members are dropped before removal.
pub fn zrem(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let members: Vec<Bytes> = conn.args[1..].iter().filter(|m| !m.is_empty()).cloned().collect();
    let removed = if members.is_empty() {
        0
    } else {
        server.db(conn).zset.zrem(&conn.args[0], &members)
    };
    conn.reply(Resp::Integer(removed as i64));
    Ok(())
}

/// ZRANGE key start stop [WITHSCORES]
pub fn zrange(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let with_scores = match &conn.args[3..] {
        [] => false,
        [opt] if opt.eq_ignore_ascii_case(b"WITHSCORES") => true,
        _ => return Err(CmdError::Syntax),
    };
    let start = parse_int(&conn.args[1])?;
    let stop = parse_int(&conn.args[2])?;
    let items = server.db(conn).zset.zrange(&conn.args[0], start, stop);
    let reply = if with_scores {
        Resp::bulk_array(items.into_iter().flat_map(|(m, s)| [m, format_score(s)]))
    } else {
        Resp::bulk_array(items.into_iter().map(|(m, _)| m))
    };
    conn.reply(reply);
    Ok(())
}

pub fn zscore(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let score = server.db(conn).zset.zscore(&conn.args[0], &conn.args[1]);
    conn.reply(Resp::BulkString(score.map(format_score)));
    Ok(())
}

pub fn zcard(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let len = server.db(conn).zset.zcard(&conn.args[0]);
    conn.reply(Resp::Integer(len as i64));
    Ok(())
}
