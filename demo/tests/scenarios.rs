use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::panic::{self as unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;
use svcwrap::{Call, CallError, Response, ServiceClient, ServiceDsl};
use svcwrap_demo::models::{GithubRepo, Item, User};
use svcwrap_demo::{ExampleService, ExampleServiceDslExtensions, GithubService};
use tokio::runtime::{Handle, Runtime};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Busy(bool),
    Success(Item),
    Fail(String),
}

#[derive(Debug, Clone, Copy)]
enum Reply {
    Body(u32),
    Empty,
    Status(u16, &'static str),
    Transport,
    Panic,
}

struct FakeExample {
    reply: Reply,
    handle: Handle,
}

#[derive(Debug)]
struct ConnectionReset;

impl std::fmt::Display for ConnectionReset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("connection reset")
    }
}

impl std::error::Error for ConnectionReset {}

impl FakeExample {
    fn outcome(&self) -> Result<Response<Item>, CallError> {
        match self.reply {
            Reply::Body(n) => Ok(Response::success(Item(n))),
            Reply::Empty => Ok(Response::new(204, "No Content", None)),
            Reply::Status(code, message) => Ok(Response::error(code, message)),
            Reply::Transport => Err(CallError::transport(ConnectionReset)),
            Reply::Panic => panic!("service exploded"),
        }
    }
}

#[async_trait::async_trait]
impl ExampleService for FakeExample {
    fn fetch(&self, _id: String) -> Call<Item> {
        let outcome = self.outcome();
        Call::spawn(self.handle.clone(), async move { outcome })
    }

    fn fetch_now(&self, _id: String) -> Response<Item> {
        match self.outcome() {
            Ok(response) => response,
            Err(err) => panic!("{}", err),
        }
    }

    fn fetch_bare(&self) -> Item {
        match self.outcome() {
            Ok(response) => response.into_body().unwrap_or(Item(0)),
            Err(err) => panic!("{}", err),
        }
    }

    async fn fetch_later(&self, id: u32) -> Item {
        if let Reply::Panic = self.reply {
            panic!("deferred exploded");
        }
        Item(id)
    }
}

struct Harness {
    dsl: ServiceDsl,
    events: Arc<Mutex<Vec<Event>>>,
    _runtime: Runtime,
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .build()
        .unwrap()
}

fn harness(reply: Reply) -> Harness {
    let runtime = runtime();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let dsl = ServiceDsl::new()
        .with_busy_sink(move |busy| sink.lock().push(Event::Busy(busy)))
        .with_runtime(runtime.handle().clone());
    let fake = FakeExample {
        reply,
        handle: runtime.handle().clone(),
    };
    dsl.client(
        ServiceClient::builder()
            .bind::<dyn ExampleService>(Arc::new(fake))
            .build(),
    )
    .unwrap();
    Harness {
        dsl,
        events,
        _runtime: runtime,
    }
}

/// Handlers that record the outcome and signal `done`
fn recorder(
    events: &Arc<Mutex<Vec<Event>>>,
) -> (
    impl FnOnce(&mut svcwrap::Continuation<Item>),
    Receiver<()>,
) {
    let (done, finished) = mpsc::channel();
    let on_success = Arc::clone(events);
    let on_fail = Arc::clone(events);
    let done_fail = done.clone();
    let block = move |result: &mut svcwrap::Continuation<Item>| {
        result
            .on_success(move |item| {
                on_success.lock().push(Event::Success(item));
                let _ = done.send(());
            })
            .on_fail(move |error| {
                on_fail.lock().push(Event::Fail(error.to_string()));
                let _ = done_fail.send(());
            });
    };
    (block, finished)
}

fn wait(finished: &Receiver<()>) {
    finished
        .recv_timeout(Duration::from_secs(5))
        .expect("continuation never completed");
}

fn outcomes(events: &[Event]) -> Vec<Event> {
    events
        .iter()
        .filter(|e| !matches!(e, Event::Busy(_)))
        .cloned()
        .collect()
}

fn busy(events: &[Event]) -> Vec<Event> {
    events
        .iter()
        .filter(|e| matches!(e, Event::Busy(_)))
        .cloned()
        .collect()
}

fn run_async(reply: Reply) -> Vec<Event> {
    let h = harness(reply);
    let (block, finished) = recorder(&h.events);
    h.dsl.fetch("item-1".to_string(), block);
    wait(&finished);
    let events = h.events.lock().clone();
    events
}

#[test]
fn async_call_success_delivers_body() {
    let events = run_async(Reply::Body(7));
    assert_eq!(outcomes(&events), vec![Event::Success(Item(7))]);
    assert_eq!(busy(&events), vec![Event::Busy(true), Event::Busy(false)]);
}

#[test]
fn async_call_error_status_fails_with_http_message() {
    let events = run_async(Reply::Status(404, "Not Found"));
    assert_eq!(
        outcomes(&events),
        vec![Event::Fail("HTTP Error: 404 - Not Found".to_string())]
    );
    assert_eq!(busy(&events), vec![Event::Busy(true), Event::Busy(false)]);
}

#[test]
fn async_call_transport_failure_passes_cause() {
    let events = run_async(Reply::Transport);
    assert_eq!(
        outcomes(&events),
        vec![Event::Fail("connection reset".to_string())]
    );
}

#[test]
fn async_call_success_without_body_fails() {
    let events = run_async(Reply::Empty);
    assert_eq!(
        outcomes(&events),
        vec![Event::Fail("response body was empty".to_string())]
    );
}

#[test]
fn async_call_dispatch_panic_fails_and_clears_busy() {
    let events = run_async(Reply::Panic);
    assert_eq!(
        events,
        vec![
            Event::Busy(true),
            Event::Fail("call panicked: service exploded".to_string()),
            Event::Busy(false),
        ]
    );
}

#[test]
fn sync_response_is_delivered_before_busy_clears() {
    let h = harness(Reply::Body(3));
    let (block, finished) = recorder(&h.events);
    h.dsl.fetch_now("item-3".to_string(), block);
    wait(&finished);
    assert_eq!(
        *h.events.lock(),
        vec![
            Event::Busy(true),
            Event::Success(Item(3)),
            Event::Busy(false),
        ]
    );
}

#[test]
fn sync_response_error_status() {
    let h = harness(Reply::Status(500, "Internal Server Error"));
    let (block, finished) = recorder(&h.events);
    h.dsl.fetch_now("item-3".to_string(), block);
    wait(&finished);
    assert_eq!(
        outcomes(&h.events.lock()),
        vec![Event::Fail("HTTP Error: 500 - Internal Server Error".to_string())]
    );
}

#[test]
fn bare_value_always_succeeds() {
    let h = harness(Reply::Status(500, "ignored"));
    let (block, finished) = recorder(&h.events);
    h.dsl.fetch_bare(block);
    wait(&finished);
    assert_eq!(
        *h.events.lock(),
        vec![
            Event::Busy(true),
            Event::Success(Item(0)),
            Event::Busy(false),
        ]
    );
}

#[test]
fn bare_value_panic_becomes_failure() {
    let h = harness(Reply::Panic);
    let (block, finished) = recorder(&h.events);
    h.dsl.fetch_bare(block);
    wait(&finished);
    assert_eq!(
        *h.events.lock(),
        vec![
            Event::Busy(true),
            Event::Fail("call panicked: service exploded".to_string()),
            Event::Busy(false),
        ]
    );
}

/// Run `wrapper`, expecting it to unwind, and return the panic message
fn unwinds(wrapper: impl FnOnce()) -> String {
    let payload = unwind::catch_unwind(AssertUnwindSafe(wrapper))
        .expect_err("wrapper should have propagated the panic");
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default()
}

/// Failures are recorded; successes panic
fn exploding_success(
    events: &Arc<Mutex<Vec<Event>>>,
) -> impl FnOnce(&mut svcwrap::Continuation<Item>) {
    let on_fail = Arc::clone(events);
    move |result: &mut svcwrap::Continuation<Item>| {
        result
            .on_success(|_| panic!("handler exploded"))
            .on_fail(move |error| on_fail.lock().push(Event::Fail(error.to_string())));
    }
}

#[test]
fn sync_response_handler_panic_reaches_caller() {
    let h = harness(Reply::Body(3));
    let block = exploding_success(&h.events);
    let message = unwinds(|| h.dsl.fetch_now("item-3".to_string(), block));
    assert_eq!(message, "handler exploded");
    // Not reported as a failed call, and busy still clears
    assert_eq!(
        *h.events.lock(),
        vec![Event::Busy(true), Event::Busy(false)]
    );
}

#[test]
fn bare_value_handler_panic_reaches_caller() {
    let h = harness(Reply::Body(3));
    let block = exploding_success(&h.events);
    let message = unwinds(|| h.dsl.fetch_bare(block));
    assert_eq!(message, "handler exploded");
    assert_eq!(
        *h.events.lock(),
        vec![Event::Busy(true), Event::Busy(false)]
    );
}

#[test]
fn block_panic_reaches_caller_and_clears_busy() {
    let h = harness(Reply::Body(3));
    let message = unwinds(|| {
        h.dsl
            .fetch("item-3".to_string(), |_| panic!("registration exploded"))
    });
    assert_eq!(message, "registration exploded");
    assert_eq!(
        *h.events.lock(),
        vec![Event::Busy(true), Event::Busy(false)]
    );
}

#[test]
fn deferred_value_resolves_on_runtime() {
    let h = harness(Reply::Body(0));
    let (block, finished) = recorder(&h.events);
    h.dsl.fetch_later(42, block);
    wait(&finished);
    let events = h.events.lock().clone();
    assert_eq!(outcomes(&events), vec![Event::Success(Item(42))]);
    assert_eq!(busy(&events), vec![Event::Busy(true), Event::Busy(false)]);
}

#[test]
fn deferred_value_panic_becomes_failure() {
    let h = harness(Reply::Panic);
    let (block, finished) = recorder(&h.events);
    h.dsl.fetch_later(1, block);
    wait(&finished);
    assert_eq!(
        outcomes(&h.events.lock()),
        vec![Event::Fail("call panicked: deferred exploded".to_string())]
    );
}

#[test]
fn deferred_value_without_runtime_fails() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let dsl = ServiceDsl::new();
    let runtime = runtime();
    dsl.client(
        ServiceClient::builder()
            .bind::<dyn ExampleService>(Arc::new(FakeExample {
                reply: Reply::Body(0),
                handle: runtime.handle().clone(),
            }))
            .build(),
    )
    .unwrap();

    let (block, finished) = recorder(&events);
    dsl.fetch_later(5, block);
    wait(&finished);
    assert_eq!(
        outcomes(&events.lock()),
        vec![Event::Fail(
            "no tokio runtime available for deferred call".to_string()
        )]
    );
}

#[test]
fn unbound_service_fails_without_panicking() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let dsl = ServiceDsl::new();
    let (block, finished) = recorder(&events);
    dsl.fetch("x".to_string(), block);
    wait(&finished);
    assert_eq!(
        outcomes(&events.lock()),
        vec![Event::Fail(
            "service unavailable: no service client has been set".to_string()
        )]
    );
}

#[test]
fn missing_handlers_discard_outcome() {
    let h = harness(Reply::Body(1));
    h.dsl.fetch_bare(|_| {});
    assert_eq!(
        *h.events.lock(),
        vec![Event::Busy(true), Event::Busy(false)]
    );
}

struct FakeGithub;

impl GithubService for FakeGithub {
    fn get_repo(&self, owner: String, repo: String) -> Call<GithubRepo> {
        Call::new(move |completion| {
            std::thread::spawn(move || {
                completion(Ok(Response::success(GithubRepo {
                    id: 892275,
                    name: repo.clone(),
                    full_name: Some(format!("{}/{}", owner, repo)),
                    description: None,
                    open_issues_count: 0,
                    stargazers_count: 42,
                    owner: User {
                        id: 82592,
                        login: Some(owner),
                        avatar_url: None,
                    },
                })));
            });
        })
    }
}

#[test]
fn github_repo_is_described() {
    let busy = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&busy);
    let dsl = svcwrap_demo::github_dsl(Arc::new(FakeGithub), move |b| sink.lock().push(b));

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    svcwrap_demo::describe_repo(&dsl, "square", "retrofit", move |text| {
        let _ = tx.lock().send(text);
    });

    let text = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(text, "square/retrofit (42 stars)");
    assert_eq!(*busy.lock(), vec![true, false]);
}

#[test]
fn app_dsl_selects_service() {
    let dsl = svcwrap_demo::app_dsl(
        ServiceClient::builder()
            .bind::<dyn GithubService>(Arc::new(FakeGithub))
            .build(),
    );
    let mut selected = false;
    let service = dsl
        .service::<dyn GithubService, _>(|_| selected = true)
        .unwrap();
    assert!(selected);
    let repo = service
        .get_repo("square".into(), "retrofit".into())
        .execute()
        .unwrap()
        .into_body()
        .unwrap();
    assert_eq!(repo.stargazers_count, 42);
}
