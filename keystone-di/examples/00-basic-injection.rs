use keystone_di::injector::Injector;
use keystone_di::instance::InstancePtr;
use keystone_di::Injectable;
use tracing_subscriber::EnvFilter;

// this is a trait we would like to inject into our components
trait Greeter {
    fn greet(&self) -> String;
}

// an injectable implementation of the above trait - no dependencies, so the struct is empty
#[derive(Injectable)]
struct EnglishGreeter;

impl Greeter for EnglishGreeter {
    fn greet(&self) -> String {
        "Hello world!".to_string()
    }
}

struct Punctuation {
    suffix: &'static str,
}

// a component with a required and an optional dependency
#[derive(Injectable)]
struct Reception {
    // required - instantiation fails if dyn Greeter is not mapped
    #[inject]
    greeter: InstancePtr<dyn Greeter>,
    // optional - None if not mapped
    #[inject]
    punctuation: Option<InstancePtr<Punctuation>>,
}

impl Reception {
    fn welcome(&self) -> String {
        let suffix = self
            .punctuation
            .as_ref()
            .map(|punctuation| punctuation.suffix)
            .unwrap_or_default();

        format!("{}{}", self.greeter.greet(), suffix)
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // run with RUST_LOG=keystone_di=trace to see what the injector is doing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let injector = Injector::new().expect("error initializing Injector");

    // dyn Greeter will be resolved to a single, lazily created EnglishGreeter
    injector
        .map::<dyn Greeter>()
        .expect("error mapping dyn Greeter")
        .to_singleton_as::<dyn Greeter, EnglishGreeter>(|greeter| {
            greeter as InstancePtr<dyn Greeter>
        })
        .expect("error configuring dyn Greeter");

    let reception = injector
        .instantiate_instance::<Reception>()
        .expect("error creating Reception");

    // prints "Hello world!"
    println!("{}", reception.welcome());

    injector
        .map::<Punctuation>()
        .expect("error mapping Punctuation")
        .to_value(InstancePtr::new(Punctuation { suffix: "!!" }))
        .expect("error configuring Punctuation");

    let reception = injector
        .instantiate_instance::<Reception>()
        .expect("error creating Reception");

    // prints "Hello world!!!"
    println!("{}", reception.welcome());
}
