//! In-process scripted FTP server used by the unit tests. Binds
//! `127.0.0.1:0` and plays back a fixed exchange per accepted
//! connection, panicking (and so failing the test) on any deviation.

use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::session::Session;

/// One step of a scripted control-channel exchange.
pub enum Step {
    /// Send a reply line unprompted (banners, delayed-ready).
    Send(&'static str),
    /// Read one command line, assert it starts with the prefix, reply.
    Expect(&'static str, &'static str),
    /// Read a PASV command, bind a data listener, announce it (227).
    Pasv,
    /// Read a transfer command (prefix), send the preliminary reply,
    /// serve the data connection, then send the final reply.
    ExpectData(&'static str, &'static str, DataAction, &'static str),
    /// Drop the control connection immediately.
    Close,
}

/// What the scripted server does on the accepted data connection.
pub enum DataAction {
    /// Send these bytes, then close.
    Write(Vec<u8>),
    /// Read until EOF and assert the received bytes.
    ReadExpect(Vec<u8>),
}

/// Runs one script per successive control connection.
pub async fn script_server(scripts: Vec<Vec<Step>>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        for script in scripts {
            let (stream, _) = listener.accept().await.unwrap();
            play_script(stream, script).await;
        }
    });

    (addr, handle)
}

/// Single-connection convenience wrapper for transfer tests.
pub async fn pasv_script_server(script: Vec<Step>) -> (SocketAddr, JoinHandle<()>) {
    script_server(vec![script]).await
}

/// Connects a session with test-friendly settings: plain PASV (the
/// scripted server announces 127.0.0.1 directly) and short timeouts.
pub async fn connect(addr: SocketAddr) -> Session {
    connect_with(addr, |_| {}).await
}

/// Like [`connect`], with a hook to adjust the configuration first.
pub async fn connect_with(
    addr: SocketAddr,
    adjust: impl FnOnce(&mut ClientConfig),
) -> Session {
    let mut config = ClientConfig {
        port: addr.port(),
        passive: true,
        extended: false,
        connect_timeout_secs: 5,
        reply_timeout_secs: 5,
        ..ClientConfig::default()
    };
    adjust(&mut config);
    Session::connect("127.0.0.1", config).await.unwrap()
}

async fn play_script(stream: TcpStream, script: Vec<Step>) {
    let (rd, mut wr) = stream.into_split();
    let mut reader = BufReader::new(rd);
    let mut data_listener: Option<TcpListener> = None;

    for step in script {
        match step {
            Step::Send(reply) => send_reply(&mut wr, reply).await,
            Step::Expect(prefix, reply) => {
                expect_line(&mut reader, prefix).await;
                send_reply(&mut wr, reply).await;
            }
            Step::Pasv => {
                expect_line(&mut reader, "PASV").await;
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                let reply = format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{})",
                    port >> 8,
                    port & 0xff
                );
                data_listener = Some(listener);
                send_reply(&mut wr, &reply).await;
            }
            Step::ExpectData(prefix, preliminary, action, fin) => {
                expect_line(&mut reader, prefix).await;
                send_reply(&mut wr, preliminary).await;

                let listener = data_listener
                    .take()
                    .expect("ExpectData without a preceding Pasv step");
                let (mut data, _) = listener.accept().await.unwrap();
                match action {
                    DataAction::Write(bytes) => {
                        data.write_all(&bytes).await.unwrap();
                        data.shutdown().await.unwrap();
                    }
                    DataAction::ReadExpect(expected) => {
                        let mut got = Vec::new();
                        data.read_to_end(&mut got).await.unwrap();
                        assert_eq!(got, expected, "data channel payload mismatch");
                    }
                }
                drop(data);
                send_reply(&mut wr, fin).await;
            }
            Step::Close => return,
        }
    }
}

async fn send_reply(wr: &mut OwnedWriteHalf, reply: &str) {
    wr.write_all(format!("{}\r\n", reply).as_bytes())
        .await
        .unwrap();
}

async fn expect_line(reader: &mut BufReader<OwnedReadHalf>, prefix: &str) {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await.unwrap();
    assert!(n > 0, "client closed while server expected {:?}", prefix);
    let line = line.trim_end();
    assert!(
        line.starts_with(prefix),
        "expected command starting with {:?}, got {:?}",
        prefix,
        line
    );
}
