use crate::cmd::{CmdError, CmdResult, ConnectionContext, ServerContext, parse_int};
use crate::resp::Resp;
use bytes::Bytes;

pub fn ping(conn: &mut ConnectionContext, _server: &ServerContext) -> CmdResult {
    match conn.args.as_slice() {
        [] => conn.reply(Resp::SimpleString(Bytes::from_static(b"PONG"))),
        [msg] => conn.reply(Resp::bulk(msg.clone())),
        _ => return Err(CmdError::WrongArity("ping".to_string())),
    }
    Ok(())
}

pub fn echo(conn: &mut ConnectionContext, _server: &ServerContext) -> CmdResult {
    conn.reply(Resp::bulk(conn.args[0].clone()));
    Ok(())
}

pub fn select(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let index = parse_int(&conn.args[0])?;
    if index < 0 || index as usize >= server.databases.len() {
        return Err(CmdError::DbIndexOutOfRange);
    }
    conn.db_index = index as usize;
    conn.reply(Resp::ok());
    Ok(())
}
