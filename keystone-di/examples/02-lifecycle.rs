use keystone_di::config::InjectorConfig;
use keystone_di::injector::{Injector, InjectorBuilder};
use keystone_di::instance::InstancePtr;
use keystone_di::Injectable;
use tracing_subscriber::EnvFilter;

struct Logger;

impl Logger {
    fn log(&self, message: &str) {
        println!("[log] {message}");
    }
}

// a "base class" for other components - it needs to implement Default, since it's always created
// together with the component embedding it
#[derive(Injectable, Default)]
#[injectable(post_construct = ["start"], pre_destroy = ["stop"])]
struct Worker {
    // properties are injected after construction
    #[inject(property)]
    logger: Option<InstancePtr<Logger>>,
    #[inject(property, optional)]
    injector: Option<InstancePtr<Injector>>,
}

impl Worker {
    fn log(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.log(message);
        }
    }

    fn start(&mut self) {
        if self.injector.is_some() {
            self.log("worker started");
        }
    }

    fn stop(&mut self) {
        self.log("worker stopped");
    }
}

#[derive(Injectable)]
#[injectable(post_construct = ["configure"])]
struct Mailer {
    #[inject(base)]
    worker: Worker,
    #[inject(default = "default_batch_size")]
    batch_size: usize,
}

fn default_batch_size() -> usize {
    16
}

impl Mailer {
    fn configure(&mut self) {
        self.worker
            .log(&format!("mailer configured with batch size {}", self.batch_size));
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // configuration can also be read from keystone.json or KEYSTONE_* environment variables
    let config = InjectorConfig::init_from_environment().expect("error reading configuration");
    let injector = InjectorBuilder::new()
        .expect("error initializing InjectorBuilder")
        .with_config(config)
        .build();

    injector
        .map::<Logger>()
        .expect("error mapping Logger")
        .to_value(InstancePtr::new(Logger))
        .expect("error configuring Logger");

    // prints "mailer configured..." followed by "worker started" - base methods come last
    let mut mailer = injector
        .instantiate_instance::<Mailer>()
        .expect("error creating Mailer");

    // pre-destroy methods of the whole chain are called - prints "worker stopped"
    injector
        .destroy_instance(&mut mailer)
        .expect("error destroying Mailer");

    injector.destroy().expect("error destroying Injector");
}
