use crate::cmd::notify::{self, EVENT_SET};
use crate::cmd::{CmdError, CmdResult, ConnectionContext, ServerContext, parse_int};
use crate::resp::Resp;
use crate::store::DataType;

/// SET key value [EX seconds]
pub fn set(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let mut ttl_secs = None;
    match &conn.args[2..] {
        [] => {}
        [opt, secs] if opt.eq_ignore_ascii_case(b"EX") => {
            let secs = parse_int(secs)?;
            if secs <= 0 {
                return Err(CmdError::InvalidExpire("set"));
            }
            ttl_secs = Some(secs as u64);
        }
        _ => return Err(CmdError::Syntax),
    }

    let db = server.db(conn);
    let key = conn.args[0].clone();
    db.kv.set(key.clone(), conn.args[1].clone(), ttl_secs);
    db.record_type(&key, DataType::Kv);
    conn.reply(Resp::ok());
    notify::notify_keyspace_event(server, db.index(), &key, EVENT_SET);
    Ok(())
}

pub fn get(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let value = server.db(conn).kv.get(&conn.args[0]);
    conn.reply(value.map_or_else(Resp::null, Resp::bulk));
    Ok(())
}
