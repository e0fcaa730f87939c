//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex};

use pulith_rest::{HttpClient, Method, Progress, ReadMode, Request, Response, ResponseHead};

/// Canned response returned by [`TestHttpClient`].
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub content_length: Option<u64>,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status,
            headers: Vec::new(),
            content_length: Some(body.len() as u64),
            body,
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::new(status, body).header("Content-Type", "application/json")
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn without_length(mut self) -> Self {
        self.content_length = None;
        self
    }
}

/// What the mock transport saw for one request.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub mode: ReadMode,
    pub headers: Vec<(String, String)>,
    pub body_headers: Vec<(String, String)>,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn body_header(&self, name: &str) -> Option<&str> {
        self.body_headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("connection refused")]
    Refused,

    #[error("request body failed")]
    Body(#[source] io::Error),
}

/// Mock HTTP client: drains request bodies into memory, then answers with a fixed reply.
#[derive(Debug, Clone)]
pub struct TestHttpClient {
    reply: Option<Reply>,
    stalled: bool,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl TestHttpClient {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply: Some(reply),
            stalled: false,
            recorded: Arc::default(),
        }
    }

    /// A client whose every request fails before a response.
    pub fn refusing() -> Self {
        Self {
            reply: None,
            stalled: false,
            recorded: Arc::default(),
        }
    }

    /// A client that records each request and then never answers.
    pub fn stalled() -> Self {
        Self {
            reply: None,
            stalled: true,
            recorded: Arc::default(),
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.recorded().pop().expect("no request recorded")
    }
}

impl HttpClient for TestHttpClient {
    type Error = TestError;

    fn send(
        &self,
        request: Request,
        mode: ReadMode,
    ) -> impl Future<Output = std::result::Result<Response, Self::Error>> + Send {
        let reply = self.reply.clone();
        let stalled = self.stalled;
        let recorded = Arc::clone(&self.recorded);
        async move {
            let mut body = Vec::new();
            let (body_headers, content_length) = match request.body {
                Some(mut content) => {
                    let headers = content.headers().to_vec();
                    let length = content.content_length();
                    content.write_to(&mut body).await.map_err(TestError::Body)?;
                    (headers, length)
                }
                None => (Vec::new(), None),
            };

            recorded.lock().unwrap().push(Recorded {
                method: request.method,
                path: request.path,
                mode,
                headers: request.headers,
                body_headers,
                content_length,
                body,
            });

            if stalled {
                std::future::pending::<()>().await;
            }

            let reply = reply.ok_or(TestError::Refused)?;
            let head = ResponseHead {
                status: reply.status,
                headers: reply.headers,
                content_length: reply.content_length,
            };
            Ok(Response {
                head,
                body: Box::new(io::Cursor::new(reply.body)),
            })
        }
    }
}

/// Progress callback that records every snapshot.
pub fn progress_log() -> (Arc<dyn Fn(&Progress) + Send + Sync>, Arc<Mutex<Vec<Progress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (
        Arc::new(move |progress: &Progress| sink.lock().unwrap().push(*progress)),
        seen,
    )
}

pub fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}
