use super::{Handler, connection, dump, hash, key, list, pubsub, set, string, zset};
use std::collections::HashMap;
use std::sync::LazyLock;

pub struct CommandInfo {
    pub name: &'static str,
    /// Redis convention: positive is the exact argc including the name,
    /// negative is a minimum.
    pub arity: i64,
    pub handler: Handler,
}

static COMMAND_TABLE: &[CommandInfo] = &[
    // Connection
    CommandInfo { name: "ping", arity: -1, handler: connection::ping },
    CommandInfo { name: "echo", arity: 2, handler: connection::echo },
    CommandInfo { name: "select", arity: 2, handler: connection::select },

    // Keyspace
    CommandInfo { name: "type", arity: 2, handler: key::type_ },
    CommandInfo { name: "ttl", arity: 2, handler: key::ttl },
    CommandInfo { name: "pttl", arity: 2, handler: key::pttl },
    CommandInfo { name: "expire", arity: 3, handler: key::expire },
    CommandInfo { name: "persist", arity: 2, handler: key::persist },
    CommandInfo { name: "exists", arity: -2, handler: key::exists },
    CommandInfo { name: "del", arity: -2, handler: key::del },
    CommandInfo { name: "scan", arity: -2, handler: key::scan },
    CommandInfo { name: "keys", arity: 2, handler: key::keys },
    CommandInfo { name: "dbsize", arity: 1, handler: key::dbsize },
    CommandInfo { name: "flushdb", arity: 1, handler: key::flushdb },
    CommandInfo { name: "flushall", arity: 1, handler: key::flushall },
    CommandInfo { name: "rename", arity: 3, handler: dump::rename },
    CommandInfo { name: "dump", arity: 2, handler: dump::dump },
    CommandInfo { name: "restore", arity: -4, handler: dump::restore },

    // String
    CommandInfo { name: "set", arity: -3, handler: string::set },
    CommandInfo { name: "get", arity: 2, handler: string::get },

    // List
    CommandInfo { name: "lpush", arity: -3, handler: list::lpush },
    CommandInfo { name: "rpush", arity: -3, handler: list::rpush },
    CommandInfo { name: "lrange", arity: 4, handler: list::lrange },
    CommandInfo { name: "llen", arity: 2, handler: list::llen },
    CommandInfo { name: "lrem", arity: 4, handler: list::lrem },
    CommandInfo { name: "lset", arity: 4, handler: list::lset },

    // Hash
    CommandInfo { name: "hset", arity: -4, handler: hash::hset },
    CommandInfo { name: "hget", arity: 3, handler: hash::hget },
    CommandInfo { name: "hgetall", arity: 2, handler: hash::hgetall },
    CommandInfo { name: "hdel", arity: -3, handler: hash::hdel },
    CommandInfo { name: "hexists", arity: 3, handler: hash::hexists },
    CommandInfo { name: "hlen", arity: 2, handler: hash::hlen },

    // Set
    CommandInfo { name: "sadd", arity: -3, handler: set::sadd },
    CommandInfo { name: "srem", arity: -3, handler: set::srem },
    CommandInfo { name: "smembers", arity: 2, handler: set::smembers },
    CommandInfo { name: "scard", arity: 2, handler: set::scard },
    CommandInfo { name: "sismember", arity: 3, handler: set::sismember },

    // ZSet
    CommandInfo { name: "zadd", arity: -4, handler: zset::zadd },
    CommandInfo { name: "zrem", arity: -3, handler: zset::zrem },
    CommandInfo { name: "zrange", arity: -4, handler: zset::zrange },
    CommandInfo { name: "zscore", arity: 3, handler: zset::zscore },
    CommandInfo { name: "zcard", arity: 2, handler: zset::zcard },

    // Pub/Sub
    CommandInfo { name: "publish", arity: 3, handler: pubsub::publish },
    CommandInfo { name: "subscribe", arity: -2, handler: pubsub::subscribe },
    CommandInfo { name: "unsubscribe", arity: -1, handler: pubsub::unsubscribe },
    CommandInfo { name: "psubscribe", arity: -2, handler: pubsub::psubscribe },
    CommandInfo { name: "punsubscribe", arity: -1, handler: pubsub::punsubscribe },
    CommandInfo { name: "pubsub", arity: -2, handler: pubsub::pubsub },
];

static COMMANDS: LazyLock<HashMap<&'static str, &'static CommandInfo>> =
    LazyLock::new(|| COMMAND_TABLE.iter().map(|c| (c.name, c)).collect());

/// Finds a command by its lowercase name.
pub fn lookup(name: &str) -> Option<&'static CommandInfo> {
    COMMANDS.get(name).copied()
}
