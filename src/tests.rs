use crate::{
    async_factory, async_trait, constant, define_module, factory,
    fallible_factory, interface, scoped, Arg, Context, ContextState,
    InjectError, InjectResult, ResolutionMode, Scope, ScopedResource,
    Service, ServiceInfo, Svc,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    fn record(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// A scoped resource that records its lifecycle into an [`EventLog`].
struct Lifecycle<T: Service> {
    name: &'static str,
    log: Svc<EventLog>,
    value: Option<T>,
    fail_exit: bool,
}

fn lifecycle<T: Service>(
    name: &'static str,
    log: &Svc<EventLog>,
    value: T,
) -> Lifecycle<T> {
    Lifecycle {
        name,
        log: log.clone(),
        value: Some(value),
        fail_exit: false,
    }
}

/// Like [`lifecycle`], but the resource refuses to close.
fn failing_lifecycle<T: Service>(
    name: &'static str,
    log: &Svc<EventLog>,
    value: T,
) -> Lifecycle<T> {
    Lifecycle {
        fail_exit: true,
        ..lifecycle(name, log, value)
    }
}

#[async_trait]
impl<T: Service> ScopedResource for Lifecycle<T> {
    type Target = T;

    async fn enter(&mut self) -> InjectResult<T> {
        self.log.record(format!("enter {}", self.name));
        Ok(self.value.take().expect("entered twice"))
    }

    async fn exit(&mut self, error: Option<&InjectError>) -> InjectResult<()> {
        let suffix = if error.is_some() { " (failed)" } else { "" };
        self.log.record(format!("exit {}{suffix}", self.name));
        if self.fail_exit {
            return Err(InjectError::InternalError(format!(
                "{} refused to close",
                self.name
            )));
        }

        Ok(())
    }
}

struct Config {
    url: String,
}

struct Database {
    config: Svc<Config>,
}

struct UserService {
    database: Svc<Database>,
}

trait Plugin: Service {
    fn name(&self) -> &'static str;
}

interface!(Plugin);

struct MetricsPlugin;
struct TracePlugin;
struct AuditPlugin;

impl Plugin for MetricsPlugin {
    fn name(&self) -> &'static str {
        "metrics"
    }
}

impl Plugin for TracePlugin {
    fn name(&self) -> &'static str {
        "trace"
    }
}

impl Plugin for AuditPlugin {
    fn name(&self) -> &'static str {
        "audit"
    }
}

struct PluginHost(Vec<Svc<dyn Plugin>>);

fn local_config() -> Config {
    Config {
        url: "db://local".to_owned(),
    }
}

#[tokio::test]
async fn container_instances_share_their_dependencies() -> InjectResult<()> {
    let mut builder = Context::builder();
    builder.provide(constant(local_config()))?;
    builder.provide(factory(|config: Svc<Config>| Database { config }))?;
    builder
        .provide(factory(|database: Svc<Database>| UserService { database }))?;

    let mut context = builder.build();
    context.enter().await?;

    let config = context.get_instance::<Config>()?;
    let database = context.get_instance::<Database>()?;
    let service = context.get_instance::<UserService>()?;
    assert_eq!("db://local", config.url);
    assert!(Svc::ptr_eq(&config, &database.config));
    assert!(Svc::ptr_eq(&database, &service.database));

    context.exit(None).await
}

#[tokio::test]
async fn construction_follows_dependency_order() -> InjectResult<()> {
    struct First;
    struct Second;
    struct Third;

    let log = Svc::new(EventLog::default());
    let mut builder = Context::builder();
    builder.provide(factory({
        let log = log.clone();
        move |_second: Svc<Second>| {
            log.record("first");
            First
        }
    }))?;
    builder.provide(factory({
        let log = log.clone();
        move || {
            log.record("second");
            Second
        }
    }))?;
    builder.provide(factory({
        let log = log.clone();
        move |_second: Svc<Second>| {
            log.record("third");
            Third
        }
    }))?;

    let mut context = builder.build();
    context.enter().await?;

    // Dependencies come first; ties break by registration order.
    assert_eq!(vec!["second", "first", "third"], log.take());
    context.exit(None).await
}

#[tokio::test]
async fn teardown_runs_in_reverse_construction_order() -> InjectResult<()> {
    struct Conn;
    struct Channel(#[allow(dead_code)] Svc<Conn>);
    struct Consumer(#[allow(dead_code)] Svc<Channel>);

    let log = Svc::new(EventLog::default());
    let mut builder = Context::builder();
    builder.provide(scoped({
        let log = log.clone();
        move || lifecycle("conn", &log, Conn)
    }))?;
    builder.provide(scoped({
        let log = log.clone();
        move |conn: Svc<Conn>| lifecycle("channel", &log, Channel(conn))
    }))?;
    builder.provide(scoped({
        let log = log.clone();
        move |channel: Svc<Channel>| {
            lifecycle("consumer", &log, Consumer(channel))
        }
    }))?;

    let mut context = builder.build();
    context.enter().await?;
    context.exit(None).await?;

    assert_eq!(
        vec![
            "enter conn",
            "enter channel",
            "enter consumer",
            "exit consumer",
            "exit channel",
            "exit conn",
        ],
        log.take(),
    );
    Ok(())
}

#[tokio::test]
async fn failed_construction_unwinds_the_partial_scope() {
    struct Conn;
    struct Broken;

    let log = Svc::new(EventLog::default());
    let mut builder = Context::builder();
    builder
        .provide(scoped({
            let log = log.clone();
            move || lifecycle("conn", &log, Conn)
        }))
        .unwrap();
    builder
        .provide(fallible_factory(
            |_conn: Svc<Conn>| -> Result<Broken, std::io::Error> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            },
        ))
        .unwrap();

    let mut context = builder.build();
    let error = context.enter().await.unwrap_err();
    assert!(matches!(error, InjectError::ActivationFailed { .. }));

    // The resource built before the failure is exited, and is told why.
    assert_eq!(vec!["enter conn", "exit conn (failed)"], log.take());
    assert_eq!(ContextState::Closed, context.state());
}

#[tokio::test]
async fn teardown_attempts_every_handle_and_surfaces_the_first_failure() {
    struct Conn;
    struct Channel;
    struct Consumer;

    let log = Svc::new(EventLog::default());
    let mut builder = Context::builder();
    builder
        .provide(scoped({
            let log = log.clone();
            move || lifecycle("conn", &log, Conn)
        }))
        .unwrap();
    builder
        .provide(scoped({
            let log = log.clone();
            move || failing_lifecycle("channel", &log, Channel)
        }))
        .unwrap();
    builder
        .provide(scoped({
            let log = log.clone();
            move || lifecycle("consumer", &log, Consumer)
        }))
        .unwrap();

    let mut context = builder.build();
    context.enter().await.unwrap();

    let error = context.exit(None).await.unwrap_err();
    assert!(
        matches!(error, InjectError::InternalError(ref message) if message.contains("channel"))
    );

    // The failing exit does not stop the sweep.
    assert_eq!(
        vec![
            "enter conn",
            "enter channel",
            "enter consumer",
            "exit consumer",
            "exit channel",
            "exit conn",
        ],
        log.take(),
    );
}

#[tokio::test]
async fn construction_failures_outrank_teardown_failures() {
    struct Conn;
    struct Broken;

    let log = Svc::new(EventLog::default());
    let mut builder = Context::builder();
    builder
        .provide(scoped({
            let log = log.clone();
            move || failing_lifecycle("conn", &log, Conn)
        }))
        .unwrap();
    builder
        .provide(fallible_factory(
            |_conn: Svc<Conn>| -> Result<Broken, std::io::Error> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            },
        ))
        .unwrap();

    let mut context = builder.build();
    let error = context.enter().await.unwrap_err();

    // The unwind is attempted, but its failure never masks the
    // construction error.
    assert!(matches!(error, InjectError::ActivationFailed { .. }));
    assert_eq!(vec!["enter conn", "exit conn (failed)"], log.take());
}

#[tokio::test]
async fn dependency_cycles_are_rejected_in_any_order() {
    struct Chicken(#[allow(dead_code)] Svc<Egg>);
    struct Egg(#[allow(dead_code)] Svc<Chicken>);

    for flipped in [false, true] {
        let mut builder = Context::builder();
        if flipped {
            builder
                .provide(factory(|chicken: Svc<Chicken>| Egg(chicken)))
                .unwrap();
            builder
                .provide(factory(|egg: Svc<Egg>| Chicken(egg)))
                .unwrap();
        } else {
            builder
                .provide(factory(|egg: Svc<Egg>| Chicken(egg)))
                .unwrap();
            builder
                .provide(factory(|chicken: Svc<Chicken>| Egg(chicken)))
                .unwrap();
        }

        let mut context = builder.build();
        let error = context.enter().await.unwrap_err();
        assert!(
            matches!(error, InjectError::CycleDetected { ref cycle } if cycle.len() == 2)
        );
    }
}

#[tokio::test]
async fn missing_direct_dependencies_fail_validation() {
    struct Missing;
    struct Orphan(#[allow(dead_code)] Svc<Missing>);

    let mut builder = Context::builder();
    builder
        .provide(factory(|missing: Svc<Missing>| Orphan(missing)))
        .unwrap();

    let mut context = builder.build();
    match context.enter().await.unwrap_err() {
        InjectError::MissingDependency {
            service_info,
            dependency_info,
        } => {
            assert_eq!(ServiceInfo::of::<Orphan>(), service_info);
            assert_eq!(ServiceInfo::of::<Missing>(), dependency_info);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn container_consumers_reject_function_scoped_providers() {
    let mut builder = Context::builder();
    builder
        .provide(factory(|| MetricsPlugin).with_interface::<dyn Plugin>())
        .unwrap();
    builder
        .provide(
            factory(|| TracePlugin)
                .in_scope(Scope::Function)
                .with_interface::<dyn Plugin>(),
        )
        .unwrap();
    // Container-scoped, but one element of the collection would not
    // outlive a function scope.
    builder
        .provide(factory(|plugins: Vec<Svc<dyn Plugin>>| PluginHost(plugins)))
        .unwrap();

    let mut context = builder.build();
    let error = context.enter().await.unwrap_err();
    assert!(matches!(error, InjectError::ScopeViolation { .. }));
}

#[tokio::test]
async fn direct_scope_violations_are_rejected_in_any_order() {
    struct Session;
    struct Dashboard(#[allow(dead_code)] Svc<Session>);

    for flipped in [false, true] {
        let mut builder = Context::builder();
        if flipped {
            builder
                .provide(
                    factory(|session: Svc<Session>| Dashboard(session)),
                )
                .unwrap();
            builder
                .provide(factory(|| Session).in_scope(Scope::Function))
                .unwrap();
        } else {
            builder
                .provide(factory(|| Session).in_scope(Scope::Function))
                .unwrap();
            builder
                .provide(
                    factory(|session: Svc<Session>| Dashboard(session)),
                )
                .unwrap();
        }

        let mut context = builder.build();
        let error = context.enter().await.unwrap_err();
        assert!(matches!(error, InjectError::ScopeViolation { .. }));
    }
}

#[tokio::test]
async fn conflicting_dependency_kinds_fail_validation() {
    struct Entry;
    #[allow(dead_code)]
    struct Registry {
        first: Svc<Entry>,
        rest: Vec<Svc<Entry>>,
    }

    let mut builder = Context::builder();
    builder.provide(factory(|| Entry)).unwrap();
    builder
        .provide(factory(|first: Svc<Entry>, rest: Vec<Svc<Entry>>| {
            Registry { first, rest }
        }))
        .unwrap();

    let mut context = builder.build();
    match context.enter().await.unwrap_err() {
        InjectError::ConflictingDependencyKinds {
            service_info,
            dependency_info,
        } => {
            assert_eq!(ServiceInfo::of::<Registry>(), service_info);
            assert_eq!(ServiceInfo::of::<Entry>(), dependency_info);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn collections_resolve_every_live_instance() -> InjectResult<()> {
    let mut builder = Context::builder();
    builder.provide(factory(|| MetricsPlugin).with_interface::<dyn Plugin>())?;
    builder.provide(factory(|| AuditPlugin).with_interface::<dyn Plugin>())?;
    builder.provide(
        factory(|| TracePlugin)
            .in_scope(Scope::Function)
            .with_interface::<dyn Plugin>(),
    )?;
    builder.provide(
        factory(|plugins: Vec<Svc<dyn Plugin>>| PluginHost(plugins))
            .in_scope(Scope::Function),
    )?;

    let mut context = builder.build();
    context.enter().await?;

    let scope = context.function_scope().await?;
    let host = scope.get_instance::<PluginHost>()?;
    let names: Vec<_> = host.0.iter().map(|plugin| plugin.name()).collect();
    // Container-scoped instances come before the scope's own.
    assert_eq!(vec!["metrics", "audit", "trace"], names);

    scope.close(None).await?;
    context.exit(None).await
}

#[tokio::test]
async fn multi_interface_definitions_construct_once() -> InjectResult<()> {
    trait Reader: Service {}
    trait Writer: Service {}
    interface!(Reader);
    interface!(Writer);

    struct Store;
    impl Reader for Store {}
    impl Writer for Store {}

    let constructed = Svc::new(AtomicUsize::new(0));
    let mut builder = Context::builder();
    builder.provide(
        factory({
            let constructed = constructed.clone();
            move || {
                constructed.fetch_add(1, Ordering::SeqCst);
                Store
            }
        })
        .with_interface::<dyn Reader>()
        .with_interface::<dyn Writer>(),
    )?;

    let mut context = builder.build();
    context.enter().await?;

    let store = context.get_instance::<Store>()?;
    let reader = context.get_instance::<dyn Reader>()?;
    let _writer = context.get_instance::<dyn Writer>()?;
    assert_eq!(1, constructed.load(Ordering::SeqCst));
    assert!(std::ptr::eq(
        Svc::as_ptr(&store).cast::<()>(),
        Svc::as_ptr(&reader) as *const (),
    ));

    context.exit(None).await
}

#[tokio::test]
async fn function_scopes_isolate_their_instances() -> InjectResult<()> {
    struct Session;

    let constructed = Svc::new(AtomicUsize::new(0));
    let mut builder = Context::builder();
    builder.provide(constant(local_config()))?;
    builder.provide(
        factory({
            let constructed = constructed.clone();
            move || {
                constructed.fetch_add(1, Ordering::SeqCst);
                Session
            }
        })
        .in_scope(Scope::Function),
    )?;

    let mut context = builder.build();
    context.enter().await?;

    // Function-scoped definitions are invisible to the container itself.
    assert!(matches!(
        context.get_instance::<Session>(),
        Err(InjectError::ComponentNotFound { .. })
    ));

    let first_scope = context.function_scope().await?;
    let second_scope = context.function_scope().await?;
    let first = first_scope.get_instance::<Session>()?;
    let second = second_scope.get_instance::<Session>()?;
    assert!(!Svc::ptr_eq(&first, &second));
    assert_eq!(2, constructed.load(Ordering::SeqCst));

    // Container-scoped instances are shared into every scope.
    let config = context.get_instance::<Config>()?;
    assert!(Svc::ptr_eq(&config, &first_scope.get_instance::<Config>()?));
    assert!(Svc::ptr_eq(&config, &second_scope.get_instance::<Config>()?));

    first_scope.close(None).await?;
    second_scope.close(None).await?;
    context.exit(None).await
}

#[tokio::test]
async fn bound_callables_inject_instances_and_arguments() -> InjectResult<()> {
    struct Greeter {
        greeting: String,
    }

    struct Flag;

    async fn greet(
        greeter: Svc<Greeter>,
        name: Arg<String>,
        flag: Option<Svc<Flag>>,
    ) -> String {
        assert!(flag.is_none());
        format!("{}, {}", greeter.greeting, *name)
    }

    let mut builder = Context::builder();
    builder.provide(factory(|| Greeter {
        greeting: "hello".to_owned(),
    }))?;

    let mut context = builder.build();
    context.enter().await?;

    let message = context
        .bind(greet)
        .with_arg("world".to_owned())
        .call()
        .await?;
    assert_eq!("hello, world", message);

    // An argument the caller did not bind fails the call.
    let error = context.bind(greet).call().await.unwrap_err();
    assert!(matches!(error, InjectError::ComponentNotFound { .. }));

    context.exit(None).await
}

#[tokio::test]
async fn callable_scopes_close_even_when_resolution_fails() {
    struct Session;
    struct Missing;

    let log = Svc::new(EventLog::default());
    let mut builder = Context::builder();
    builder
        .provide(
            scoped({
                let log = log.clone();
                move || lifecycle("session", &log, Session)
            })
            .in_scope(Scope::Function),
        )
        .unwrap();

    let mut context = builder.build();
    context.enter().await.unwrap();

    let error = context
        .call(|missing: Svc<Missing>| async move {
            drop(missing);
        })
        .await
        .unwrap_err();
    assert!(matches!(error, InjectError::ComponentNotFound { .. }));
    assert_eq!(vec!["enter session", "exit session (failed)"], log.take());

    context.exit(None).await.unwrap();
}

#[tokio::test]
async fn duplicate_factories_are_rejected() {
    fn make_config() -> Config {
        local_config()
    }

    let mut builder = Context::builder();
    builder.provide(factory(make_config)).unwrap();
    let error = builder.provide(factory(make_config)).unwrap_err();
    assert!(matches!(error, InjectError::DuplicateRegistration { .. }));
}

#[tokio::test]
async fn ambiguous_requests_follow_the_resolution_mode() -> InjectResult<()> {
    fn primary() -> Config {
        Config {
            url: "db://primary".to_owned(),
        }
    }

    fn replica() -> Config {
        Config {
            url: "db://replica".to_owned(),
        }
    }

    let mut builder = Context::builder();
    builder.provide(factory(primary))?;
    builder.provide(factory(replica))?;
    let mut context = builder.build();
    context.enter().await?;

    assert!(matches!(
        context.get_instance::<Config>(),
        Err(InjectError::AmbiguousResult { count: 2, .. })
    ));
    let all = context.get_instances::<Config>()?;
    assert_eq!(2, all.len());
    assert_eq!("db://primary", all[0].url);
    context.exit(None).await?;

    let mut builder = Context::builder();
    builder.provide(factory(primary))?;
    builder.provide(factory(replica))?;
    builder.set_resolution_mode(ResolutionMode::FirstMatch);
    let mut context = builder.build();
    context.enter().await?;

    assert_eq!("db://primary", context.get_instance::<Config>()?.url);
    context.exit(None).await
}

#[tokio::test]
async fn lifecycle_operations_require_the_right_state() {
    let mut context = Context::builder().build();
    assert!(matches!(
        context.get_instance::<Config>(),
        Err(InjectError::InvalidState {
            state: ContextState::Initializing,
            ..
        })
    ));
    assert!(matches!(
        context.exit(None).await,
        Err(InjectError::InvalidState { .. })
    ));

    context.enter().await.unwrap();
    assert!(matches!(
        context.enter().await,
        Err(InjectError::InvalidState {
            state: ContextState::Servicing,
            ..
        })
    ));

    context.exit(None).await.unwrap();
    assert!(matches!(
        context.exit(None).await,
        Err(InjectError::InvalidState {
            state: ContextState::Closed,
            ..
        })
    ));
    assert!(matches!(
        context.get_instance::<Config>(),
        Err(InjectError::InvalidState { .. })
    ));
    assert!(matches!(
        context.function_scope().await,
        Err(InjectError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn async_factories_are_awaited_during_resolution() -> InjectResult<()> {
    async fn connect(config: Svc<Config>) -> Database {
        tokio::task::yield_now().await;
        Database { config }
    }

    let mut builder = Context::builder();
    builder.provide(constant(local_config()))?;
    builder.provide(async_factory(connect))?;

    let mut context = builder.build();
    context.enter().await?;

    let database = context.get_instance::<Database>()?;
    assert_eq!("db://local", database.config.url);
    context.exit(None).await
}

#[tokio::test]
async fn modules_register_their_definitions() -> InjectResult<()> {
    let module = define_module! {
        services = [
            constant(local_config()),
            factory(|config: Svc<Config>| Database { config }),
        ],
    };

    let mut builder = Context::builder();
    builder.add_module(module)?;
    let mut context = builder.build();

    let satisfied = context.get_satisfied_types();
    assert_eq!(
        vec![ServiceInfo::of::<Config>(), ServiceInfo::of::<Database>()],
        satisfied,
    );

    context.enter().await?;
    let database = context.get_instance::<Database>()?;
    assert_eq!("db://local", database.config.url);
    context.exit(None).await
}
