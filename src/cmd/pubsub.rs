use crate::cmd::{CmdError, CmdResult, ConnectionContext, ServerContext};
use crate::pattern::KeyPattern;
use crate::resp::Resp;
use bytes::Bytes;

fn confirmation(kind: &'static str, name: Option<Bytes>, count: i64) -> Resp {
    Resp::array(vec![
        Resp::bulk(Bytes::from_static(kind.as_bytes())),
        Resp::BulkString(name),
        Resp::Integer(count),
    ])
}

fn sorted(names: impl Iterator<Item = Bytes>) -> Vec<Bytes> {
    let mut names: Vec<Bytes> = names.collect();
    names.sort();
    names
}

pub fn publish(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let delivered = server.pubsub.publish(&conn.args[0], &conn.args[1]);
    conn.reply(Resp::Integer(delivered as i64));
    Ok(())
}

pub fn subscribe(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    for channel in std::mem::take(&mut conn.args) {
        if conn.subscriptions.insert(channel.clone()) {
            server.pubsub.subscribe(channel.clone(), conn.id, &conn.sink);
        }
        conn.reply(confirmation("subscribe", Some(channel), conn.subscription_count()));
    }
    Ok(())
}

/// Without arguments, drops every channel subscription of the connection.
pub fn unsubscribe(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let mut channels = std::mem::take(&mut conn.args);
    if channels.is_empty() {
        channels = sorted(conn.subscriptions.iter().cloned());
        if channels.is_empty() {
            conn.reply(confirmation("unsubscribe", None, conn.subscription_count()));
            return Ok(());
        }
    }
    for channel in channels {
        if conn.subscriptions.remove(&channel) {
            server.pubsub.unsubscribe(&channel, conn.id);
        }
        conn.reply(confirmation("unsubscribe", Some(channel), conn.subscription_count()));
    }
    Ok(())
}

pub fn psubscribe(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    for pattern in std::mem::take(&mut conn.args) {
        if conn.psubscriptions.insert(pattern.clone()) {
            server.pubsub.psubscribe(pattern.clone(), conn.id, &conn.sink);
        }
        conn.reply(confirmation("psubscribe", Some(pattern), conn.subscription_count()));
    }
    Ok(())
}

pub fn punsubscribe(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let mut patterns = std::mem::take(&mut conn.args);
    if patterns.is_empty() {
        patterns = sorted(conn.psubscriptions.iter().cloned());
        if patterns.is_empty() {
            conn.reply(confirmation("punsubscribe", None, conn.subscription_count()));
            return Ok(());
        }
    }
    for pattern in patterns {
        if conn.psubscriptions.remove(&pattern) {
            server.pubsub.punsubscribe(&pattern, conn.id);
        }
        conn.reply(confirmation("punsubscribe", Some(pattern), conn.subscription_count()));
    }
    Ok(())
}

/// PUBSUB CHANNELS [pattern] | NUMSUB [channel ...] | NUMPAT
pub fn pubsub(conn: &mut ConnectionContext, server: &ServerContext) -> CmdResult {
    let sub = conn.args[0].to_ascii_lowercase();
    let rest = &conn.args[1..];
    let reply = match sub.as_slice() {
        b"channels" => {
            let pattern = match rest {
                [] => None,
                [p] => Some(KeyPattern::compile(p)),
                _ => return Err(CmdError::WrongArity("pubsub|channels".to_string())),
            };
            Resp::bulk_array(server.pubsub.channels(pattern.as_ref()))
        }
        b"numsub" => {
            let mut items = Vec::with_capacity(rest.len() * 2);
            for channel in rest {
                items.push(Resp::bulk(channel.clone()));
                items.push(Resp::Integer(server.pubsub.numsub(channel) as i64));
            }
            Resp::array(items)
        }
        b"numpat" if rest.is_empty() => Resp::Integer(server.pubsub.numpat() as i64),
        b"numpat" => return Err(CmdError::WrongArity("pubsub|numpat".to_string())),
        _ => {
            return Err(CmdError::UnknownSubcommand(
                String::from_utf8_lossy(&conn.args[0]).into_owned(),
            ));
        }
    };
    conn.reply(reply);
    Ok(())
}
