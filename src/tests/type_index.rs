use crate::cmd::ServerContext;
use crate::resp::Resp;
use crate::tests::helper::{TestClient, create_server_context_with, sorted_keys, status};

fn server_pair() -> (ServerContext, ServerContext) {
    (
        create_server_context_with(|c| c.type_index_cache = false),
        create_server_context_with(|c| c.type_index_cache = true),
    )
}

/// Runs the same command against both servers and checks the replies agree.
fn both(plain: &ServerContext, cached: &ServerContext, client: &mut TestClient, args: &[&str]) -> Resp {
    let expected = client.exec(plain, args);
    let got = client.exec(cached, args);
    assert_eq!(expected, got, "{:?} differs with the type index on", args);
    expected.into_iter().next().unwrap_or(Resp::Array(None))
}

#[tokio::test]
async fn test_type_and_exists_match_without_index() {
    let (plain, cached) = server_pair();
    let mut client = TestClient::new(1);

    let script: &[&[&str]] = &[
        &["SET", "k", "v"],
        &["TYPE", "k"],
        &["RPUSH", "k", "x"],
        &["TYPE", "k"],
        &["EXISTS", "k"],
        &["ZADD", "k", "1", "m"],
        &["TYPE", "k"],
        &["LREM", "k", "0", "x"],
        &["TYPE", "k"],
        &["EXISTS", "k"],
        &["ZREM", "k", "m"],
        &["TYPE", "k"],
        &["DEL", "k"],
        &["TYPE", "k"],
        &["EXISTS", "k"],
        &["HSET", "h", "f", "v"],
        &["HDEL", "h", "f"],
        &["TYPE", "h"],
        &["SADD", "h", "m"],
        &["TYPE", "h"],
    ];
    for args in script {
        both(&plain, &cached, &mut client, args);
    }
    assert_eq!(both(&plain, &cached, &mut client, &["TYPE", "h"]), status("set"));
}

#[tokio::test]
async fn test_expire_zero_and_rename_keep_parity() {
    let (plain, cached) = server_pair();
    let mut client = TestClient::new(1);

    let script: &[&[&str]] = &[
        &["SET", "a", "1"],
        &["SADD", "a", "m"],
        &["TYPE", "a"],
        // Drops only the set half of "a".
        &["EXPIRE", "a", "0"],
        &["TYPE", "a"],
        &["EXISTS", "a"],
        &["RENAME", "a", "b"],
        &["TYPE", "a"],
        &["TYPE", "b"],
        &["EXISTS", "a", "b"],
        &["FLUSHDB"],
        &["TYPE", "b"],
        &["EXISTS", "b"],
        &["DBSIZE"],
    ];
    for args in script {
        both(&plain, &cached, &mut client, args);
    }
}

#[tokio::test]
async fn test_index_sees_expired_keys_as_gone() {
    let (plain, cached) = server_pair();
    let mut client = TestClient::new(1);

    both(&plain, &cached, &mut client, &["RPUSH", "l", "x"]);
    both(&plain, &cached, &mut client, &["SET", "l", "v", "EX", "1"]);
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    assert_eq!(
        both(&plain, &cached, &mut client, &["TYPE", "l"]),
        status("list")
    );
    assert_eq!(both(&plain, &cached, &mut client, &["EXISTS", "l"]), Resp::Integer(1));

    both(&plain, &cached, &mut client, &["SET", "s", "v", "EX", "1"]);
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    assert_eq!(both(&plain, &cached, &mut client, &["TYPE", "s"]), status("none"));
    assert_eq!(both(&plain, &cached, &mut client, &["EXISTS", "s"]), Resp::Integer(0));
    assert!(cached.databases[0].type_index().is_some_and(|i| i.candidates(b"s", &crate::cmd::resolve::PROBE_ORDER).is_none()));
}

#[tokio::test]
async fn test_keys_and_dbsize_ignore_index() {
    let (plain, cached) = server_pair();
    let mut client = TestClient::new(1);

    let writes: &[&[&str]] = &[
        &["SET", "x", "1"],
        &["RPUSH", "y", "1"],
        &["HSET", "z", "f", "v"],
        &["SADD", "x", "m"],
    ];
    for args in writes {
        both(&plain, &cached, &mut client, args);
    }
    let keys = both(&plain, &cached, &mut client, &["KEYS", "*"]);
    assert_eq!(sorted_keys(&keys), vec!["x", "x", "y", "z"]);
    assert_eq!(both(&plain, &cached, &mut client, &["DBSIZE"]), Resp::Integer(4));

    let db = &cached.databases[0];
    let index = db.type_index().expect("index enabled");
    assert!(!index.is_empty());
    both(&plain, &cached, &mut client, &["FLUSHALL"]);
    assert!(index.is_empty());
}
