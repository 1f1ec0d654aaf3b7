use crate::resp::Resp;
use crate::tests::helper::{TestClient, create_server_context};
use bytes::Bytes;
use std::collections::BTreeSet;

fn split_scan_reply(res: Resp) -> (Bytes, Vec<Bytes>) {
    let Resp::Array(Some(mut parts)) = res else {
        panic!("expected array reply");
    };
    assert_eq!(parts.len(), 2);
    let keys = match parts.pop() {
        Some(Resp::Array(Some(items))) => items
            .into_iter()
            .map(|i| match i {
                Resp::BulkString(Some(b)) => b,
                other => panic!("expected bulk key, got {:?}", other),
            })
            .collect(),
        other => panic!("expected key array, got {:?}", other),
    };
    let cursor = match parts.pop() {
        Some(Resp::BulkString(Some(c))) => c,
        other => panic!("expected bulk cursor, got {:?}", other),
    };
    (cursor, keys)
}

#[tokio::test]
async fn test_scan_reply_shape() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    client.call(&server_ctx, &["SET", "a", "1"]);
    client.call(&server_ctx, &["RPUSH", "b", "1"]);
    let (cursor, keys) = split_scan_reply(client.call(&server_ctx, &["SCAN", ""]));
    assert!(cursor.is_empty());
    assert_eq!(keys, vec![Bytes::from("a"), Bytes::from("b")]);
}

#[tokio::test]
async fn test_scan_walks_whole_keyspace() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    let mut expected = BTreeSet::new();
    for i in 0..12 {
        let key = format!("key:{:02}", i);
        let cmd = match i % 4 {
            0 => vec!["SET", key.as_str(), "v"],
            1 => vec!["RPUSH", key.as_str(), "v"],
            2 => vec!["SADD", key.as_str(), "v"],
            _ => vec!["HSET", key.as_str(), "f", "v"],
        };
        client.call(&server_ctx, &cmd);
        expected.insert(Bytes::from(key));
    }

    let mut seen = BTreeSet::new();
    let mut cursor = Bytes::new();
    for _ in 0..20 {
        let cursor_str = String::from_utf8(cursor.to_vec()).unwrap();
        let res = client.call(&server_ctx, &["SCAN", cursor_str.as_str(), "COUNT", "2"]);
        let (next, keys) = split_scan_reply(res);
        // No single store hands out more than COUNT keys.
        assert!(keys.len() <= 2 * 5);
        seen.extend(keys);
        if next.is_empty() {
            break;
        }
        cursor = next;
    }
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_scan_is_repeatable() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    for i in 0..30 {
        client.call(&server_ctx, &["SET", format!("k{:02}", i).as_str(), "v"]);
    }
    let first = client.call(&server_ctx, &["SCAN", "k05", "COUNT", "4"]);
    let again = client.call(&server_ctx, &["SCAN", "k05", "COUNT", "4"]);
    assert_eq!(first, again);

    let (cursor, keys) = split_scan_reply(first);
    assert_eq!(keys.len(), 4);
    assert_eq!(keys[0], Bytes::from("k06"));
    assert_eq!(cursor, Bytes::from("k09"));
}

#[tokio::test]
async fn test_scan_default_count_and_match() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    for i in 0..15 {
        client.call(&server_ctx, &["SET", format!("user:{:02}", i).as_str(), "v"]);
        client.call(&server_ctx, &["SET", format!("item:{:02}", i).as_str(), "v"]);
    }
    let (cursor, keys) = split_scan_reply(client.call(&server_ctx, &["SCAN", ""]));
    assert_eq!(keys.len(), 10);
    assert_eq!(cursor, Bytes::from("item:09"));

    let (cursor, keys) = split_scan_reply(client.call(&server_ctx, &["SCAN", "", "MATCH", "user:1*", "COUNT", "-1"]));
    assert_eq!(keys.len(), 5);
    assert!(keys.iter().all(|k| k.starts_with(b"user:1")));
    assert!(cursor.is_empty());
}

#[tokio::test]
async fn test_scan_bad_options() {
    let server_ctx = create_server_context();
    let mut client = TestClient::new(1);

    let syntax = Resp::Error("ERR syntax error".to_string());
    assert_eq!(client.call(&server_ctx, &["SCAN", "", "COUNT"]), syntax);
    assert_eq!(client.call(&server_ctx, &["SCAN", "", "LIMIT", "3"]), syntax);
    assert_eq!(
        client.call(&server_ctx, &["SCAN", "", "COUNT", "many"]),
        Resp::Error("ERR value is not an integer or out of range".to_string())
    );
    assert_eq!(
        client.call(&server_ctx, &["SCAN"]),
        Resp::Error("ERR wrong number of arguments for 'scan' command".to_string())
    );
}
