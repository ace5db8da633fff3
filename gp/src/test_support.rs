//! Fakes shared by unit tests

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::domain::{BuildConfig, CommitRecord};
use crate::git::{Git, GitError};
use crate::hook::{DispatchError, Notifier};
use crate::source::{BuildConfigSource, SourceError};
use crate::watcher::CommitListener;

/// Build a `git log` line for the given hash
pub fn log_line(sha: &str) -> String {
    format!("{}|Ada|ada@example.com|Bob|bob@example.com|commit {}\n", sha, sha)
}

fn failed(command: &str) -> GitError {
    GitError::Failed {
        command: command.to_string(),
        stderr: "scripted failure".to_string(),
    }
}

#[derive(Default)]
struct FakeGitState {
    clone_failures: usize,
    checkout_failures: usize,
    pull_failures: usize,
    logs: VecDeque<Option<String>>,
    calls: Vec<String>,
}

/// Scripted [`Git`] implementation
///
/// `log` outputs are consumed in order; `None` or an empty script is a
/// command failure.
#[derive(Default)]
pub struct FakeGit {
    state: Mutex<FakeGitState>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logs<I, S>(logs: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let fake = Self::new();
        fake.state.lock().unwrap().logs = logs.into_iter().map(|l| l.map(Into::into)).collect();
        fake
    }

    pub fn push_log(&self, output: Option<String>) {
        self.state.lock().unwrap().logs.push_back(output);
    }

    pub fn fail_clones(&self, count: usize) {
        self.state.lock().unwrap().clone_failures = count;
    }

    pub fn fail_checkouts(&self, count: usize) {
        self.state.lock().unwrap().checkout_failures = count;
    }

    pub fn fail_pulls(&self, count: usize) {
        self.state.lock().unwrap().pull_failures = count;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| c.starts_with(call)).count()
    }
}

#[async_trait]
impl Git for FakeGit {
    async fn clone_repo(&self, uri: &str, _dest: &Path) -> Result<(), GitError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("clone {}", uri));
        if state.clone_failures > 0 {
            state.clone_failures -= 1;
            return Err(failed("clone"));
        }
        Ok(())
    }

    async fn checkout(&self, _dir: &Path, git_ref: &str) -> Result<(), GitError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("checkout {}", git_ref));
        if state.checkout_failures > 0 {
            state.checkout_failures -= 1;
            return Err(failed("checkout"));
        }
        Ok(())
    }

    async fn run(&self, _dir: &Path, args: &[&str]) -> Result<String, GitError> {
        let mut state = self.state.lock().unwrap();
        let command = args.first().copied().unwrap_or("");
        state.calls.push(command.to_string());
        match command {
            "pull" if state.pull_failures > 0 => {
                state.pull_failures -= 1;
                Err(failed("pull"))
            }
            "pull" => Ok(String::new()),
            "log" => state.logs.pop_front().flatten().ok_or_else(|| failed("log")),
            other => Err(failed(other)),
        }
    }
}

/// Records every commit it is handed
#[derive(Default)]
pub struct RecordingListener {
    commits: Mutex<Vec<CommitRecord>>,
}

impl RecordingListener {
    pub fn shas(&self) -> Vec<String> {
        self.commits.lock().unwrap().iter().map(|c| c.sha.clone()).collect()
    }
}

#[async_trait]
impl CommitListener for RecordingListener {
    async fn commit_available(&self, commit: &CommitRecord) {
        self.commits.lock().unwrap().push(commit.clone());
    }
}

/// Records `(config id, sha)` for every notification
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, config: &BuildConfig, commit: &CommitRecord) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push((config.id.clone(), commit.sha.clone()));
        Ok(())
    }
}

/// Returns scripted poll results; `None` is a fetch failure, an exhausted
/// script keeps returning the last successful list
#[derive(Default)]
pub struct FakeSource {
    responses: Mutex<VecDeque<Option<Vec<BuildConfig>>>>,
    last: Mutex<Vec<BuildConfig>>,
}

impl FakeSource {
    pub fn new(responses: Vec<Option<Vec<BuildConfig>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BuildConfigSource for FakeSource {
    async fn list(&self) -> Result<Vec<BuildConfig>, SourceError> {
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Some(configs)) => {
                *self.last.lock().unwrap() = configs.clone();
                Ok(configs)
            }
            Some(None) => Err(SourceError::InvalidResponse("scripted failure".to_string())),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

/// An HTTP request captured by [`spawn_responder`]
#[derive(Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// HTTP client that ignores proxy settings from the environment
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Serve exactly one HTTP request with the given status and body
///
/// Returns the base URL and a handle resolving to the captured request.
pub async fn spawn_responder(status: u16, body: &'static str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before request headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap_or_default().split_whitespace();
        let method = request_line.next().unwrap_or_default().to_string();
        let path = request_line.next().unwrap_or_default().to_string();

        let headers: HashMap<String, String> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let content_length: usize = headers.get("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before request body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&buf[header_end..header_end + content_length]).into_owned();

        let reason = if status == 200 { "OK" } else { "Status" };
        let response = format!(
            "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            reason,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;

        CapturedRequest {
            method,
            path,
            headers,
            body: request_body,
        }
    });

    (format!("http://{}", addr), handle)
}
