//! Many simultaneous clients against one server.

mod common;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use common::{encode, TestServer};

const CLIENTS: usize = 16;
const KEYS_PER_CLIENT: usize = 50;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_disjoint_sets_all_persist() {
    let server = TestServer::start();
    let addr = server.addr;

    let tasks: Vec<_> = (0..CLIENTS)
        .map(|client| {
            tokio::spawn(async move {
                let mut stream = TcpStream::connect(addr).await.unwrap();
                for i in 0..KEYS_PER_CLIENT {
                    let key = format!("client{}:key{}", client, i);
                    let value = format!("{}", client * KEYS_PER_CLIENT + i);
                    stream
                        .write_all(&encode(&[b"SET", key.as_bytes(), value.as_bytes()]))
                        .await
                        .unwrap();

                    let mut reply = [0u8; 5];
                    stream.read_exact(&mut reply).await.unwrap();
                    assert_eq!(&reply, b"+OK\r\n");
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(server.keyspace.len(), CLIENTS * KEYS_PER_CLIENT);
    assert_eq!(
        server.keyspace.get(b"client15:key49"),
        Some(Bytes::from((15 * KEYS_PER_CLIENT + 49).to_string()))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pipelined_batches_from_many_clients() {
    let server = TestServer::start();
    let addr = server.addr;

    let tasks: Vec<_> = (0..CLIENTS)
        .map(|client| {
            tokio::spawn(async move {
                let key = format!("counter{}", client);
                let mut batch = Vec::new();
                for i in 0..KEYS_PER_CLIENT {
                    batch.extend(encode(&[b"SET", key.as_bytes(), i.to_string().as_bytes()]));
                }
                batch.extend(encode(&[b"STRLEN", key.as_bytes()]));

                let mut stream = TcpStream::connect(addr).await.unwrap();
                stream.write_all(&batch).await.unwrap();

                let expected_len = KEYS_PER_CLIENT * 5 + b":2\r\n".len();
                let mut replies = vec![0u8; expected_len];
                stream.read_exact(&mut replies).await.unwrap();
                assert!(replies.ends_with(b":2\r\n"));
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(server.keyspace.len(), CLIENTS);
    assert_eq!(server.keyspace.get(b"counter3"), Some(Bytes::from("49")));
}
