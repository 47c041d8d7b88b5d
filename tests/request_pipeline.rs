use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse as _, Response},
    routing::get,
    Extension, Router,
};
use axum_test::TestServer;
use scopewire::{
    axum::{activated, setup, Activate, ActivateErrorKind, RequestContextAccessor, ScopedMiddleware},
    ActivationProvider, HostServices, Inject, Instance, Lifetime, LoggerFactory, RegistryBuilder, ResolutionBackend, ResolveErrorKind,
    ScopeContext, ScopeErrorKind, ScopeHandle, TaggedScopeBackend, TypeInfo,
};
use std::{
    future::IntoFuture as _,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing_test::traced_test;

struct UserService {
    id: usize,
    path: String,
}

impl UserService {
    fn greet(&self) -> String {
        format!("user service {} for {}", self.id, self.path)
    }
}

struct HomeController {
    users: Arc<UserService>,
    logger: scopewire::Logger,
}

struct RequestLogging {
    users: Arc<UserService>,
}

impl ScopedMiddleware for RequestLogging {
    async fn invoke(self: Arc<Self>, request: Request, next: Next) -> Response {
        let mut response = next.run(request).await;
        response.headers_mut().insert("x-user-service", HeaderValue::from(self.users.id));
        response
    }
}

struct CartSummary;

struct RecordingBackend {
    inner: Arc<dyn ResolutionBackend>,
    begun: AtomicUsize,
    ended: AtomicUsize,
}

impl ResolutionBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn begin_scope(&self) -> Result<ScopeHandle, ScopeErrorKind> {
        let scope = self.inner.begin_scope()?;
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(scope)
    }

    fn resolve(&self, scope: &ScopeHandle, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind> {
        self.inner.resolve(scope, type_info)
    }

    fn end_scope(&self, scope: &ScopeHandle) {
        self.ended.fetch_add(1, Ordering::SeqCst);
        self.inner.end_scope(scope);
    }
}

struct App {
    backend: Arc<RecordingBackend>,
    created: Arc<AtomicUsize>,
    finalized: Arc<AtomicUsize>,
}

fn app() -> App {
    let created = Arc::new(AtomicUsize::new(0));
    let finalized = Arc::new(AtomicUsize::new(0));

    let mut host = HostServices::new();
    host.insert(LoggerFactory::new("shop"));

    let registry = RegistryBuilder::new()
        .cross_wire::<LoggerFactory>(host)
        .cross_wire_with(|| Some(Arc::new(RequestContextAccessor)))
        .provide(
            {
                let created = created.clone();
                move |Inject(accessor): Inject<RequestContextAccessor>| {
                    let path = accessor.current().map(|parts| parts.uri.path().to_owned()).unwrap_or_default();
                    Ok(UserService {
                        id: created.fetch_add(1, Ordering::SeqCst),
                        path,
                    })
                }
            },
            Lifetime::Scoped,
        )
        .provide(
            |Inject(users): Inject<UserService>, Inject(loggers): Inject<LoggerFactory>| {
                Ok(HomeController {
                    users,
                    logger: loggers.logger_for::<HomeController>(),
                })
            },
            Lifetime::Transient,
        )
        .provide(|Inject(users): Inject<UserService>| Ok(RequestLogging { users }), Lifetime::Transient)
        .add_finalizer({
            let finalized = finalized.clone();
            move |_: Arc<UserService>| {
                finalized.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            }
        });

    App {
        backend: Arc::new(RecordingBackend {
            inner: Arc::new(TaggedScopeBackend::new(registry)),
            begun: AtomicUsize::new(0),
            ended: AtomicUsize::new(0),
        }),
        created,
        finalized,
    }
}

async fn home(Activate(controller): Activate<HomeController>) -> String {
    controller.logger.info("Index requested");
    tokio::time::sleep(Duration::from_millis(10)).await;
    controller.users.greet()
}

async fn cart(Extension(provider): Extension<ActivationProvider>) -> Response {
    match provider.view_component::<CartSummary>() {
        Ok(_) => StatusCode::OK.into_response(),
        Err(err) => ActivateErrorKind::Resolve(err).into_response(),
    }
}

fn router(backend: Arc<dyn ResolutionBackend>) -> Router {
    let router = Router::new()
        .route("/", get(home))
        .route("/cart", get(cart))
        .layer(from_fn(activated::<RequestLogging>));

    setup(router, ActivationProvider::new(backend))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[traced_test]
async fn test_scope_per_request() {
    let App {
        backend,
        created,
        finalized,
    } = app();
    let server = TestServer::new(router(backend.clone())).unwrap();

    let (response_1, response_2) = tokio::join!(server.get("/").into_future(), server.get("/").into_future());

    for response in [&response_1, &response_2] {
        response.assert_status_ok();
        let id = response.header("x-user-service").to_str().unwrap().to_owned();
        response.assert_text(format!("user service {id} for /"));
    }
    assert_ne!(response_1.header("x-user-service"), response_2.header("x-user-service"));

    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert_eq!(finalized.load(Ordering::SeqCst), 2);
    assert_eq!(backend.begun.load(Ordering::SeqCst), 2);
    assert_eq!(backend.ended.load(Ordering::SeqCst), 2);
}

#[tokio::test]
#[traced_test]
async fn test_unregistered_view_component() {
    let App { backend, finalized, .. } = app();
    let server = TestServer::new(router(backend.clone())).unwrap();

    let response = server.get("/cart").expect_failure().await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().contains("CartSummary"));
    assert_eq!(backend.begun.load(Ordering::SeqCst), 1);
    assert_eq!(backend.ended.load(Ordering::SeqCst), 1);
    assert_eq!(finalized.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[traced_test]
async fn test_no_scope_outside_request() {
    let App { backend, .. } = app();
    let provider = ActivationProvider::new(backend);

    assert!(ScopeContext::try_current().is_none());
    assert!(matches!(provider.controller::<HomeController>(), Err(ResolveErrorKind::NoActiveScope)));
}

#[tokio::test]
#[traced_test]
async fn test_scope_allocation_failure() {
    let called = Arc::new(AtomicBool::new(false));
    let backend = Arc::new(TaggedScopeBackend::new(RegistryBuilder::new()).with_max_active_scopes(0));

    let router = Router::new().route(
        "/",
        get({
            let called = called.clone();
            move || async move {
                called.store(true, Ordering::SeqCst);
            }
        }),
    );
    let server = TestServer::new(setup(router, ActivationProvider::new(backend))).unwrap();

    let response = server.get("/").expect_failure().await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
#[traced_test]
async fn test_verify_at_startup() {
    let App { backend, .. } = app();

    assert!(backend.inner.verify().is_ok());
}
