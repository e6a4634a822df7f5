//! Whole-system exercise: a real MDS and datanode served over HTTP on
//! ephemeral ports, driven through the remote client.

use common::error::FsError;
use common::layout::BlockLayout;
use common::protocol::CommitRequest;
use datanode::store::BlockStore;
use mds::state::MdsState;
use sfs::client::FsClient;
use sfs::remote::{RemoteBlockService, RemoteMetaService};
use sfs::service::MetaService;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

async fn spawn_mds(journal: &Path) -> (String, JoinHandle<()>) {
    let state = Arc::new(MdsState::open(journal).await.unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let router = mds::server::create_router(state);
    let task = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, task)
}

async fn spawn_datanode(data_dir: &Path) -> (String, JoinHandle<()>) {
    let store = Arc::new(BlockStore::open(data_dir).await.unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let router = datanode::server::create_router(store);
    let task = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, task)
}

fn remote_client(
    mds_addr: &str,
    datanode_addr: &str,
    block_size: u32,
) -> FsClient<RemoteBlockService, RemoteMetaService> {
    let timeout = Duration::from_secs(5);
    FsClient::new(
        BlockLayout::new(block_size),
        RemoteBlockService::new(datanode_addr, timeout).unwrap(),
        RemoteMetaService::new(mds_addr, timeout).unwrap(),
    )
}

#[tokio::test]
async fn write_read_stat_list_delete_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (mds_addr, _mds) = spawn_mds(&dir.path().join("journal.log")).await;
    let (dn_addr, _dn) = spawn_datanode(&dir.path().join("datanode")).await;
    let client = remote_client(&mds_addr, &dn_addr, 16);

    for addr in [&mds_addr, &dn_addr] {
        let probe = reqwest::get(format!("http://{addr}/healthz")).await.unwrap();
        assert_eq!(probe.text().await.unwrap(), "ok");
    }

    let body: Vec<u8> = (0..100).map(|b| b as u8).collect();
    let response = client.write("/docs/hello.txt", &body).await.unwrap();
    assert_eq!(response.version, 1);
    assert_eq!(client.read("/docs/hello.txt").await.unwrap(), body);

    let record = client.stat("/docs/hello.txt").await.unwrap();
    assert_eq!(record.size, 100);
    assert_eq!(record.block_ids.len(), 7);

    client.write("/docs/empty", b"").await.unwrap();
    assert_eq!(client.read("/docs/empty").await.unwrap(), Vec::<u8>::new());
    assert_eq!(client.stat("/docs/empty").await.unwrap().block_ids.len(), 1);

    client.write("/notes.md", b"elsewhere").await.unwrap();
    assert_eq!(
        client.list("/docs/").await.unwrap(),
        vec!["/docs/empty", "/docs/hello.txt"]
    );

    let removed = client.delete("/docs/hello.txt").await.unwrap();
    assert_eq!(removed.size, 100);
    assert!(matches!(
        client.read("/docs/hello.txt").await.unwrap_err(),
        FsError::NotFound(_)
    ));
    assert_eq!(client.list("/docs/").await.unwrap(), vec!["/docs/empty"]);
}

#[tokio::test]
async fn server_side_errors_travel_intact() {
    let dir = tempfile::tempdir().unwrap();
    let (mds_addr, _mds) = spawn_mds(&dir.path().join("journal.log")).await;
    let (dn_addr, _dn) = spawn_datanode(&dir.path().join("datanode")).await;
    let client = remote_client(&mds_addr, &dn_addr, 16);

    // The MDS rejects the commit; the client sees the same kind and message
    // the server produced, not a generic HTTP failure.
    let err = client.write("relative/path", b"data").await.unwrap_err();
    assert!(matches!(err, FsError::InvalidArgument(_)), "got {err:?}");

    match client.stat("/absent").await.unwrap_err() {
        FsError::NotFound(message) => assert_eq!(message, "no such file: /absent"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn dangling_metadata_reads_as_corrupted() {
    let dir = tempfile::tempdir().unwrap();
    let (mds_addr, _mds) = spawn_mds(&dir.path().join("journal.log")).await;
    let (dn_addr, _dn) = spawn_datanode(&dir.path().join("datanode")).await;
    let client = remote_client(&mds_addr, &dn_addr, 16);

    let meta = RemoteMetaService::new(&mds_addr, Duration::from_secs(5)).unwrap();
    meta.commit(CommitRequest {
        path: "/dangling".to_string(),
        block_ids: vec!["never-written".to_string()],
        size: 4,
        block_lengths: Some(vec![4]),
    })
    .await
    .unwrap();

    let err = client.read("/dangling").await.unwrap_err();
    assert!(matches!(err, FsError::CorruptedRead(_)), "got {err:?}");
}

#[tokio::test]
async fn namespace_survives_mds_restart() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("journal.log");
    let (dn_addr, _dn) = spawn_datanode(&dir.path().join("datanode")).await;

    let (mds_addr, serve_task) = spawn_mds(&journal).await;
    let client = remote_client(&mds_addr, &dn_addr, 8);
    client.write("/persist/a", b"alpha").await.unwrap();
    client.write("/persist/b", b"beta bytes").await.unwrap();

    serve_task.abort();
    let _ = serve_task.await;

    let (mds_addr, _mds) = spawn_mds(&journal).await;
    let client = remote_client(&mds_addr, &dn_addr, 8);
    assert_eq!(client.read("/persist/a").await.unwrap(), b"alpha");
    assert_eq!(client.read("/persist/b").await.unwrap(), b"beta bytes");
    assert_eq!(
        client.list("/persist/").await.unwrap(),
        vec!["/persist/a", "/persist/b"]
    );

    // Versions continue where the journal left off.
    let response = client.write("/persist/c", b"gamma").await.unwrap();
    assert_eq!(response.version, 3);
}
