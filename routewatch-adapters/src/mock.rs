//! Scripted transport for tests and offline demos.
//!
//! Responses are matched by method and path prefix. Each route replays its
//! queued replies in order and then keeps repeating the last one.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{FetchError, HttpResponse, Transport};

/// A canned outcome for one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with a response.
    Respond(HttpResponse),
    /// Fail without a response.
    Fail(FetchError),
    /// Wait, then produce the inner reply.
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    /// A response with a JSON (or any text) body.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Reply::Respond(HttpResponse::new(status, body))
    }

    /// A response with an empty body.
    pub fn status(status: u16) -> Self {
        Reply::Respond(HttpResponse::new(status, ""))
    }

    /// A network-level failure.
    pub fn error(err: FetchError) -> Self {
        Reply::Fail(err)
    }

    /// Delay this reply by `delay`.
    pub fn after(self, delay: Duration) -> Self {
        Reply::Delayed(delay, Box::new(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug)]
struct Route {
    method: Method,
    prefix: String,
    queue: VecDeque<Reply>,
    last: Option<Reply>,
}

/// A [`Transport`] that answers from a script.
///
/// # Example
///
/// ```
/// use routewatch_adapters::{Reply, ScriptedTransport, Transport};
///
/// # tokio_test::block_on(async {
/// let transport = ScriptedTransport::new()
///     .on_get("/metrics/mini", Reply::status(500))
///     .on_get("/metrics/mini", Reply::json(200, "{}"));
///
/// assert_eq!(transport.get("/metrics/mini?exp_id=a").await.unwrap().status, 500);
/// assert_eq!(transport.get("/metrics/mini?exp_id=a").await.unwrap().status, 200);
/// assert_eq!(transport.get("/metrics/mini?exp_id=a").await.unwrap().status, 200);
/// assert_eq!(transport.call_count("/metrics/mini"), 3);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Create an empty script. Unmatched requests answer 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for GET requests whose path starts with `prefix`.
    pub fn on_get(self, prefix: &str, reply: Reply) -> Self {
        self.push(Method::Get, prefix, reply);
        self
    }

    /// Queue a reply for POST requests whose path starts with `prefix`.
    pub fn on_post(self, prefix: &str, reply: Reply) -> Self {
        self.push(Method::Post, prefix, reply);
        self
    }

    /// Queue a GET reply on a shared transport.
    pub fn push_get(&self, prefix: &str, reply: Reply) {
        self.push(Method::Get, prefix, reply);
    }

    /// Queue a POST reply on a shared transport.
    pub fn push_post(&self, prefix: &str, reply: Reply) {
        self.push(Method::Post, prefix, reply);
    }

    /// Every request made so far, as `"METHOD path"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of requests whose path starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.split_once(' ').is_some_and(|(_, path)| path.starts_with(prefix)))
            .count()
    }

    fn push(&self, method: Method, prefix: &str, reply: Reply) {
        let mut routes = self.routes.lock();
        if let Some(route) = routes.iter_mut().find(|r| r.method == method && r.prefix == prefix) {
            route.queue.push_back(reply);
            return;
        }
        routes.push(Route {
            method,
            prefix: prefix.to_string(),
            queue: VecDeque::from([reply]),
            last: None,
        });
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .filter(|r| r.method == method && path.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len())?;
        if let Some(reply) = route.queue.pop_front() {
            route.last = Some(reply.clone());
            return Some(reply);
        }
        route.last.clone()
    }

    async fn answer(&self, method: Method, path: &str) -> Result<HttpResponse, FetchError> {
        self.calls.lock().push(format!("{} {}", method.as_str(), path));
        let mut reply = match self.next_reply(method, path) {
            Some(reply) => reply,
            None => return Ok(HttpResponse::new(404, "no scripted response")),
        };
        loop {
            match reply {
                Reply::Respond(response) => return Ok(response),
                Reply::Fail(err) => return Err(err),
                Reply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str) -> Result<HttpResponse, FetchError> {
        self.answer(Method::Get, path).await
    }

    async fn post(&self, path: &str) -> Result<HttpResponse, FetchError> {
        self.answer(Method::Post, path).await
    }
}
