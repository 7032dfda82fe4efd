//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use finam_exporter::fetcher::{HttpResponse, HttpTransport, TransportError};
use finam_exporter::output::{FileSystem, OutputError, OutputResult};
use reqwest::StatusCode;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted transport reply
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, &'static str),
    Body(String),
    Transport(TransportError),
    Hang,
}

/// Transport that plays back a fixed list of replies and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Vec<(&'static str, String)>>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn statuses(codes: &[u16]) -> Self {
        Self::new(codes.iter().map(|code| Reply::Status(*code, "")))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Value of `name` in the `call`-th request
    pub fn param(&self, call: usize, name: &str) -> Option<String> {
        self.calls.lock().unwrap().get(call).and_then(|params| {
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
        })
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(
        &self,
        _url: &str,
        params: &[(&'static str, String)],
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(params.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Status(500, "script exhausted"));

        match reply {
            Reply::Status(code, body) => Ok(HttpResponse {
                status: StatusCode::from_u16(code).unwrap(),
                body: Bytes::from_static(body.as_bytes()),
            }),
            Reply::Body(body) => Ok(HttpResponse {
                status: StatusCode::OK,
                body: Bytes::from(body),
            }),
            Reply::Transport(err) => Err(err),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// In-memory file system
#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
    dirs: Mutex<Vec<PathBuf>>,
    read_only: bool,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// File system whose writes always fail
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn file(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn dirs_created(&self) -> usize {
        self.dirs.lock().unwrap().len()
    }
}

impl FileSystem for MemoryFileSystem {
    fn create_dir_all(&self, path: &Path) -> OutputResult<()> {
        self.dirs.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn write(&self, path: &Path, contents: &str) -> OutputResult<()> {
        if self.read_only {
            return Err(OutputError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> OutputResult<String> {
        self.file(path).ok_or_else(|| OutputError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        })
    }

    fn remove_file(&self, path: &Path) -> OutputResult<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }
}

/// Segment body with a header row and `rows` data rows
pub fn candles(first_day: u32, rows: u32) -> String {
    let mut body = String::from("<TICKER>,<PER>,<DATE>,<TIME>,<CLOSE>\n");
    for i in 0..rows {
        body.push_str(&format!("SBER,60,202301{:02},100000,{}\n", first_day + i, 250 + i));
    }
    body
}
