//! Environment, configurator and module wiring

use light_injection::environment::{self, Environment};
use light_injection::config::Settings;
use light_injection::{
    declare_module, ContainerChoice, ContractId, Dependency, DependencyContainer, FailureHandler,
    FailureReport, Module, ResolutionError, ResolverExt,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Tests in this file swap the process-wide environment
static ENV_LOCK: Mutex<()> = parking_lot::const_mutex(());

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {}!", name)
    }
}

struct Missing;

fn spy() -> (FailureHandler, Arc<Mutex<Vec<FailureReport>>>) {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let handler: FailureHandler = Arc::new(move |report: &FailureReport| {
        sink.lock().push(report.clone());
    });
    (handler, reports)
}

/// Installs an environment over a fresh container; the previous one is restored on drop
struct TestEnvironment {
    container: Arc<DependencyContainer>,
    reports: Arc<Mutex<Vec<FailureReport>>>,
    previous: Option<Environment>,
}

impl TestEnvironment {
    fn install() -> Self {
        let container = Arc::new(DependencyContainer::new());
        let (handler, reports) = spy();

        let mut env = Environment::from_settings(&Settings::default());
        env.global_container = container.clone();
        env.library_failure_handler = handler.clone();
        env.module_failure_handler = handler.clone();
        env.dependency_failure_handler = handler;

        let previous = environment::replace(env);
        Self {
            container,
            reports,
            previous: Some(previous),
        }
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            environment::replace(previous);
        }
    }
}

#[test]
fn test_global_configurator_round_trip() {
    let _lock = ENV_LOCK.lock();
    let env = TestEnvironment::install();

    light_injection::register(Arc::new(English) as Arc<dyn Greeter>);

    let greeter = light_injection::resolve::<dyn Greeter>().unwrap();
    assert_eq!(greeter.greet("Ada"), "Hello, Ada!");
    assert!(env.container.is_registered::<dyn Greeter>());

    let handle: Dependency<dyn Greeter> = Dependency::new();
    assert_eq!(handle.value().greet("Lin"), "Hello, Lin!");
    assert!(env.reports.lock().is_empty());
}

#[test]
fn test_global_duplicate_goes_to_library_handler() {
    let _lock = ENV_LOCK.lock();
    let env = TestEnvironment::install();

    light_injection::register_lazy(|| Arc::new(English) as Arc<dyn Greeter>);
    light_injection::register(Arc::new(English) as Arc<dyn Greeter>);

    let reports = env.reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].message(),
        format!("Trying to register `{}` twice!", ContractId::of::<dyn Greeter>().name())
    );
}

#[test]
fn test_default_handle_reports_missing_contract() {
    let _lock = ENV_LOCK.lock();
    let env = TestEnvironment::install();

    let handle: Dependency<Missing> = Dependency::default();
    let err = handle.try_value().err().unwrap();

    assert_eq!(err, ResolutionError::NotFound(ContractId::of::<Missing>()));
    assert_eq!(env.reports.lock()[0].contract(), Some(ContractId::of::<Missing>()));
}

declare_module!(Greetings);
declare_module!(Isolated);

#[test]
fn test_modules_on_global_and_exclusive_containers() {
    let _lock = ENV_LOCK.lock();
    let env = TestEnvironment::install();

    Greetings::initialize(Some(ContainerChoice::Global), None);
    Isolated::initialize(Some(ContainerChoice::Exclusive), None);

    Greetings::register(Arc::new(English) as Arc<dyn Greeter>);
    Isolated::register_lazy(|| Arc::new(English) as Arc<dyn Greeter>);

    // each module sees its own registration, the global one only the first
    assert!(env.container.is_registered::<dyn Greeter>());
    assert_eq!(env.container.len(), 1);
    assert_eq!(Greetings::dependency::<dyn Greeter>().value().greet("Kim"), "Hello, Kim!");
    assert_eq!(Isolated::dependency::<dyn Greeter>().value().greet("Sam"), "Hello, Sam!");
    assert!(!Arc::ptr_eq(
        &Greetings::scope().resolver(),
        &Isolated::scope().resolver()
    ));

    Isolated::initialize(None, None);
    let reports = env.reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].message(), "The container should not be initialized twice!");
}

#[test]
fn test_module_with_custom_container_and_handler() {
    let _lock = ENV_LOCK.lock();
    let _env = TestEnvironment::install();

    declare_module!(Custom);
    let container = Arc::new(DependencyContainer::new());
    let (handler, reports) = spy();
    Custom::initialize(Some(ContainerChoice::Custom(container.clone())), Some(handler));

    let handle = Custom::dependency::<Missing>();
    assert!(handle.try_value().is_err());
    assert!(container.resolve::<Missing>().is_err());

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].contract(), Some(ContractId::of::<Missing>()));
}
