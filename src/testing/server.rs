use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const MAX_REQUEST_HEAD: usize = 16 * 1024;

/// Canned answer for one path
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with the given body
    Body(Vec<u8>),
    /// Any status with a short text body
    Status(u16, &'static str),
    /// 3xx with a `Location` header (absolute or relative)
    Redirect(u16, String),
    /// Accept the connection and never answer
    Hang,
    /// 200 announcing the given `Content-Length`, but only the body bytes
    /// are sent before the connection goes silent
    Stall(Vec<u8>, usize),
}

type Routes = Arc<Mutex<HashMap<String, Reply>>>;

/// Loopback HTTP server for download tests.
///
/// Each connection serves one request and is closed. Unknown paths get 404.
/// The server stops when dropped.
pub struct StubServer {
    addr: SocketAddr,
    routes: Routes,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start<P: Into<String>>(
        routes: impl IntoIterator<Item = (P, Reply)>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let routes: Routes = Arc::new(Mutex::new(
            routes.into_iter().map(|(p, r)| (p.into(), r)).collect(),
        ));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let table = Arc::clone(&routes);
        let log = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&table), Arc::clone(&log)));
            }
        });

        Ok(Self {
            addr,
            routes,
            requests,
            task,
        })
    }

    /// Add or replace the reply for `path`
    pub fn route(&self, path: impl Into<String>, reply: Reply) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(path.into(), reply);
        }
    }

    /// Absolute URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Paths requested so far, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, routes: Routes, log: Arc<Mutex<Vec<String>>>) {
    let Some(path) = read_request_path(&mut stream).await else {
        return;
    };
    if let Ok(mut paths) = log.lock() {
        paths.push(path.clone());
    }

    let reply = routes
        .lock()
        .ok()
        .and_then(|routes| routes.get(&path).cloned())
        .unwrap_or(Reply::Status(404, "Not Found"));

    // `declared` is set only for stalling replies
    let (status, reason, headers, body, declared) = match reply {
        Reply::Body(body) => (200, "OK", String::new(), body, None),
        Reply::Status(status, reason) => {
            let body = reason.as_bytes().to_vec();
            (status, reason, String::new(), body, None)
        }
        Reply::Redirect(status, location) => (
            status,
            "Found",
            format!("Location: {location}\r\n"),
            Vec::new(),
            None,
        ),
        Reply::Stall(partial, declared) => (200, "OK", String::new(), partial, Some(declared)),
        Reply::Hang => {
            go_silent().await;
            return;
        }
    };

    let head = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Length: {}\r\n\
         Content-Type: application/octet-stream\r\n\
         Connection: close\r\n\
         {headers}\r\n",
        declared.unwrap_or(body.len())
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(&body).await;
    if declared.is_some() {
        let _ = stream.flush().await;
        go_silent().await;
        return;
    }
    let _ = stream.shutdown().await;
}

async fn go_silent() {
    tokio::time::sleep(Duration::from_secs(3600)).await;
}

/// Read the request head and return the path from the request line.
async fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.ok()?;
        if n == 0 || head.len() > MAX_REQUEST_HEAD {
            return None;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head);
    let request_line = head.lines().next()?;
    request_line.split_whitespace().nth(1).map(str::to_string)
}
