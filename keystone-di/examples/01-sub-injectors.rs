use keystone_di::event::{MAPPING_CREATED, MAPPING_OVERRIDE};
use keystone_di::injector::Injector;
use keystone_di::instance::InstancePtr;
use keystone_di::Injectable;
use tracing_subscriber::EnvFilter;

struct Environment {
    name: &'static str,
}

#[derive(Injectable)]
struct Report {
    #[inject]
    environment: InstancePtr<Environment>,
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let root = Injector::new().expect("error initializing Injector");

    // observers can follow what happens with mappings
    root.events()
        .add_event_listener(MAPPING_CREATED, |event| {
            println!("Root mapped: {}", event.mapped_type())
        })
        .expect("error adding listener");

    // sealed mappings cannot be changed in the injector which owns them
    root.map::<Environment>()
        .expect("error mapping Environment")
        .to_value(InstancePtr::new(Environment { name: "production" }))
        .and_then(|mapping| mapping.seal())
        .expect("error configuring Environment");

    if let Err(error) = root.map::<Environment>() {
        println!("Expected error: {error}");
    }

    // but can be shadowed in sub-injectors, without affecting the parent
    let test = root
        .create_sub_injector()
        .expect("error creating sub-injector");

    test.events()
        .add_event_listener(MAPPING_OVERRIDE, |event| {
            println!("Test overrides: {}", event.mapped_type())
        })
        .expect("error adding listener");

    test.map::<Environment>()
        .expect("error mapping Environment")
        .to_value(InstancePtr::new(Environment { name: "test" }))
        .expect("error configuring Environment");

    // prints "Test overrides: ..." - unsealed mappings can be overridden
    test.map::<Environment>()
        .expect("error mapping Environment")
        .to_value(InstancePtr::new(Environment { name: "integration" }))
        .expect("error configuring Environment");

    let root_report = root
        .instantiate_instance::<Report>()
        .expect("error creating Report");
    let test_report = test
        .instantiate_instance::<Report>()
        .expect("error creating Report");

    // prints "production integration"
    println!(
        "{} {}",
        root_report.environment.name, test_report.environment.name
    );

    test.destroy().expect("error destroying sub-injector");

    // destroying a child never touches its parent
    println!(
        "{}",
        root.get::<Environment>()
            .expect("error resolving Environment")
            .name
    );
}
