use crate::resp::Resp;
use crate::tests::helper::{TestClient, bulk, create_server_context, create_server_context_with, sorted_keys, status};

#[tokio::test]
async fn test_missing_key() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    assert_eq!(client.call(&server_ctx, &["TYPE", "nope"]), status("none"));
    assert_eq!(client.call(&server_ctx, &["TTL", "nope"]), Resp::Integer(-2));
    assert_eq!(client.call(&server_ctx, &["EXISTS", "nope"]), Resp::Integer(0));
    assert_eq!(client.call(&server_ctx, &["EXPIRE", "nope", "10"]), Resp::Integer(-2));
    assert_eq!(client.call(&server_ctx, &["PERSIST", "nope"]), Resp::Integer(0));
    assert_eq!(
        client.call(&server_ctx, &["DUMP", "nope"]),
        Resp::Error("ERR no such key".to_string())
    );
}

#[tokio::test]
async fn test_type_follows_probe_order() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    client.call(&server_ctx, &["SET", "s", "v"]);
    client.call(&server_ctx, &["HSET", "h", "f", "v"]);
    client.call(&server_ctx, &["RPUSH", "l", "a"]);
    client.call(&server_ctx, &["SADD", "st", "m"]);
    client.call(&server_ctx, &["ZADD", "z", "1", "m"]);
    assert_eq!(client.call(&server_ctx, &["TYPE", "s"]), status("string"));
    assert_eq!(client.call(&server_ctx, &["TYPE", "h"]), status("hash"));
    assert_eq!(client.call(&server_ctx, &["TYPE", "l"]), status("list"));
    assert_eq!(client.call(&server_ctx, &["TYPE", "st"]), status("set"));
    assert_eq!(client.call(&server_ctx, &["TYPE", "z"]), status("zset"));

    // A name held by two stores is attributed to the list first.
    client.call(&server_ctx, &["RPUSH", "s", "x"]);
    assert_eq!(client.call(&server_ctx, &["TYPE", "s"]), status("list"));
}

#[tokio::test]
async fn test_exists_and_del_count_every_store() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    client.call(&server_ctx, &["SET", "k", "v"]);
    client.call(&server_ctx, &["SADD", "k", "m"]);
    client.call(&server_ctx, &["SET", "other", "v"]);

    assert_eq!(client.call(&server_ctx, &["EXISTS", "k", "other", "missing"]), Resp::Integer(3));
    assert_eq!(client.call(&server_ctx, &["DEL", "k", "missing"]), Resp::Integer(2));
    assert_eq!(client.call(&server_ctx, &["EXISTS", "k"]), Resp::Integer(0));
    assert_eq!(client.call(&server_ctx, &["GET", "k"]), Resp::BulkString(None));
    assert_eq!(client.call(&server_ctx, &["SCARD", "k"]), Resp::Integer(0));
    assert_eq!(client.call(&server_ctx, &["DEL", "k"]), Resp::Integer(0));
}

#[tokio::test]
async fn test_ttl_and_expire() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    client.call(&server_ctx, &["RPUSH", "l", "a"]);
    assert_eq!(client.call(&server_ctx, &["TTL", "l"]), Resp::Integer(-1));
    assert_eq!(client.call(&server_ctx, &["EXPIRE", "l", "100"]), Resp::Integer(1));
    assert_eq!(client.call(&server_ctx, &["TTL", "l"]), Resp::Integer(100));
    assert_eq!(client.call(&server_ctx, &["PERSIST", "l"]), Resp::Integer(1));
    assert_eq!(client.call(&server_ctx, &["TTL", "l"]), Resp::Integer(-1));

    client.call(&server_ctx, &["SET", "s", "v", "EX", "50"]);
    assert_eq!(client.call(&server_ctx, &["TTL", "s"]), Resp::Integer(50));

    assert_eq!(client.call(&server_ctx, &["EXPIRE", "l", "0"]), Resp::Integer(1));
    assert_eq!(client.call(&server_ctx, &["EXISTS", "l"]), Resp::Integer(0));
}

#[tokio::test]
async fn test_expire_validates_seconds_first() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    let res = client.call(&server_ctx, &["EXPIRE", "nope", "soon"]);
    match res {
        Resp::Error(e) => assert_eq!(e, "ERR value is not an integer or out of range"),
        _ => panic!("expected value error, got {:?}", res),
    }
    let res = client.call(&server_ctx, &["TTL"]);
    match res {
        Resp::Error(e) => assert_eq!(e, "ERR wrong number of arguments for 'ttl' command"),
        _ => panic!("expected arity error, got {:?}", res),
    }
}

#[tokio::test]
async fn test_keys_across_types() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    client.call(&server_ctx, &["SET", "user:1", "a"]);
    client.call(&server_ctx, &["HSET", "user:2", "name", "b"]);
    client.call(&server_ctx, &["LPUSH", "user:other", "c"]);
    client.call(&server_ctx, &["SET", "item:1", "d"]);

    let res = client.call(&server_ctx, &["KEYS", "user:*"]);
    assert_eq!(sorted_keys(&res), vec!["user:1", "user:2", "user:other"]);

    let res = client.call(&server_ctx, &["KEYS", "*"]);
    assert_eq!(sorted_keys(&res).len(), 4);

    for pattern in ["", "a[]b", "user\\"] {
        let res = client.call(&server_ctx, &["KEYS", pattern]);
        assert_eq!(res, Resp::Array(Some(vec![])), "pattern {:?}", pattern);
    }
}

#[tokio::test]
async fn test_keys_pages_through_small_batches() {
    let server_ctx = create_server_context_with(|c| c.scan_batch_size = 3);
    let mut client = TestClient::new(1);

    for i in 0..10 {
        client.call(&server_ctx, &["SET", format!("k{}", i).as_str(), "v"]);
    }
    for i in 0..4 {
        client.call(&server_ctx, &["SADD", format!("s{}", i).as_str(), "m"]);
    }
    let res = client.call(&server_ctx, &["KEYS", "*"]);
    assert_eq!(sorted_keys(&res).len(), 14);
    assert_eq!(client.call(&server_ctx, &["DBSIZE"]), Resp::Integer(14));
}

#[tokio::test]
async fn test_dbsize_matches_exists_sum() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    client.call(&server_ctx, &["SET", "a", "1"]);
    client.call(&server_ctx, &["RPUSH", "a", "1"]);
    client.call(&server_ctx, &["ZADD", "b", "1", "m"]);
    client.call(&server_ctx, &["HSET", "c", "f", "v"]);

    let mut keys = sorted_keys(&client.call(&server_ctx, &["KEYS", "*"]));
    // "a" is listed once per store holding it.
    assert_eq!(keys, vec!["a", "a", "b", "c"]);
    keys.dedup();

    let mut total = 0;
    for key in &keys {
        match client.call(&server_ctx, &["EXISTS", key.as_str()]) {
            Resp::Integer(n) => total += n,
            other => panic!("expected integer, got {:?}", other),
        }
    }
    assert_eq!(client.call(&server_ctx, &["DBSIZE"]), Resp::Integer(total));
    assert_eq!(total, 4);
}

#[tokio::test]
async fn test_flushdb_and_flushall() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    client.call(&server_ctx, &["SET", "a", "1"]);
    assert_eq!(client.call(&server_ctx, &["SELECT", "1"]), status("OK"));
    client.call(&server_ctx, &["SADD", "b", "1"]);

    assert_eq!(client.call(&server_ctx, &["FLUSHDB"]), status("OK"));
    assert_eq!(client.call(&server_ctx, &["DBSIZE"]), Resp::Integer(0));
    client.call(&server_ctx, &["SELECT", "0"]);
    assert_eq!(client.call(&server_ctx, &["GET", "a"]), bulk("1"));

    client.call(&server_ctx, &["SELECT", "2"]);
    client.call(&server_ctx, &["HSET", "h", "f", "v"]);
    assert_eq!(client.call(&server_ctx, &["FLUSHALL"]), status("OK"));
    for db in ["0", "1", "2"] {
        client.call(&server_ctx, &["SELECT", db]);
        assert_eq!(client.call(&server_ctx, &["DBSIZE"]), Resp::Integer(0));
    }
}
