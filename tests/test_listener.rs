//! Listener tests over real TCP and TLS, using the certificates in
//! `tests/fixtures` (a test CA and a `localhost` leaf signed by it).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use gemserve::gemini::connection::ConnectionSettings;
use gemserve::resolver::FileResolver;
use gemserve::server::listener;
use gemserve::server::tls::{load_certs, load_tls_acceptor};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

const INDEX: &str = "# Capsule\r\n";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn temp_root(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("gemserve-listen-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("index.gmi"), INDEX).unwrap();
    root
}

/// Starts the listener on an ephemeral port with a 100 ms idle timeout.
async fn start(name: &str) -> (SocketAddr, JoinHandle<anyhow::Result<()>>) {
    let acceptor = load_tls_acceptor(&fixture("server.crt"), &fixture("server.key")).unwrap();
    let resolver = Arc::new(FileResolver::new(temp_root(name), "index.gmi"));
    let settings = ConnectionSettings {
        idle_timeout: Duration::from_millis(100),
        ..ConnectionSettings::default()
    };

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let server = tokio::spawn(listener::run(tcp, acceptor, resolver, settings));
    (addr, server)
}

async fn connect(addr: SocketAddr) -> TlsStream<TcpStream> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(&fixture("ca.crt")).unwrap() {
        roots.add(cert).unwrap();
    }
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let tcp = TcpStream::connect(addr).await.unwrap();
    let name = ServerName::try_from("localhost").unwrap();
    connector.connect(name, tcp).await.unwrap()
}

#[tokio::test]
async fn test_index_over_tls() {
    let (addr, server) = start("index").await;
    let mut stream = connect(addr).await;

    stream.write_all(b"gemini://localhost/\r\n").await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();

    let expected = format!("20 text/gemini;charset=utf-8\r\n{}", INDEX);
    assert_eq!(String::from_utf8(reply).unwrap(), expected);
    server.abort();
}

#[tokio::test]
async fn test_missing_document_over_tls() {
    let (addr, server) = start("missing").await;
    let mut stream = connect(addr).await;

    stream.write_all(b"gemini://localhost/nowhere.gmi\r\n").await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();

    assert_eq!(reply, b"40 File not found\r\n");
    server.abort();
}

#[tokio::test]
async fn test_idle_tls_client_closed_silently() {
    let (addr, server) = start("idle").await;
    let mut stream = connect(addr).await;

    // The socket is dropped without close_notify, which the client may
    // report as an unexpected EOF. Either way nothing was written.
    let mut reply = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut reply))
        .await
        .expect("server never closed the idle connection");

    if let Err(e) = read {
        assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof);
    }
    assert!(reply.is_empty());
    server.abort();
}

#[tokio::test]
async fn test_silent_tcp_client_dropped_during_handshake() {
    let (addr, server) = start("handshake").await;
    let mut tcp = TcpStream::connect(addr).await.unwrap();

    let mut reply = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(2), tcp.read_to_end(&mut reply))
        .await
        .expect("server never gave up on the handshake");

    assert!(read.is_ok());
    assert!(reply.is_empty());
    server.abort();
}
