//! Wiring a small application
//!
//! Run with `RUST_LOG=light_injection=debug cargo run --example wiring` to see
//! registrations and lazy builds as they happen.

use light_injection::module::ContainerChoice;
use light_injection::{declare_module, Dependency, Module};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Config {
    app_name: String,
    version: String,
}

trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

struct ConsoleLogger {
    app_name: String,
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        println!("[{}] {}", self.app_name, message);
    }
}

struct DatabaseService {
    config: Dependency<Config>,
    logger: Dependency<dyn Logger>,
}

impl DatabaseService {
    fn connect(&self) {
        let config = self.config.value();
        self.logger
            .value()
            .log(&format!("Connecting to database for {} v{}", config.app_name, config.version));
    }
}

declare_module!(Storage);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Shared services live in the global container
    light_injection::register(Arc::new(Config {
        app_name: "MyApp".to_string(),
        version: "1.0.0".to_string(),
    }));

    // Factories may resolve what they need when they first run
    light_injection::register_lazy(|| {
        let config: Dependency<Config> = Dependency::new();
        Arc::new(ConsoleLogger {
            app_name: config.value().app_name.clone(),
        }) as Arc<dyn Logger>
    });

    // The storage module keeps its own services apart
    Storage::initialize(Some(ContainerChoice::Exclusive), None);
    Storage::register_lazy(|| {
        Arc::new(DatabaseService {
            config: Dependency::new(),
            logger: Dependency::new(),
        })
    });

    let database = Storage::dependency::<DatabaseService>();
    database.value().connect();
    database.value().connect();

    let stats = light_injection::DependencyContainer::global().stats();
    println!(
        "global container: {} resolutions, {} factory runs, hit rate {:.0}%",
        stats.total_resolutions,
        stats.factory_invocations,
        stats.hit_rate() * 100.0
    );
}
