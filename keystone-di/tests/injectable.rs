#[cfg(feature = "derive")]
mod injectable_derive_test {
    use keystone_di::component::InjectionTarget;
    use keystone_di::error::InjectorError;
    use keystone_di::injector::Injector;
    use keystone_di::instance::{erase, InstancePtr, TypeKey};
    use keystone_di::metadata::{MetadataProvider, StaticMetadataRegistry};
    use keystone_di::Injectable;

    #[derive(Debug, Eq, PartialEq)]
    struct Logger {
        name: &'static str,
    }

    struct Config {
        verbose: bool,
    }

    trait Service {
        fn describe(&self) -> String;
    }

    #[derive(Injectable)]
    #[injectable(post_construct = ["init"])]
    struct ServiceImpl {
        #[inject]
        logger: InstancePtr<Logger>,
        #[inject]
        config: Option<InstancePtr<Config>>,
        initialized: bool,
    }

    impl ServiceImpl {
        fn init(&mut self) {
            self.initialized = true;
        }
    }

    impl Service for ServiceImpl {
        fn describe(&self) -> String {
            let verbose = self
                .config
                .as_ref()
                .map(|config| config.verbose)
                .unwrap_or(false);
            format!("{} {} {}", self.logger.name, verbose, self.initialized)
        }
    }

    #[derive(Injectable, Default)]
    #[injectable(post_construct = ["base_init", "init"], pre_destroy = ["close"])]
    struct BaseComponent {
        #[inject(property, optional)]
        config: Option<InstancePtr<Config>>,
        #[inject(property)]
        logger: Option<InstancePtr<Logger>>,
        calls: Vec<&'static str>,
    }

    impl BaseComponent {
        fn base_init(&mut self) {
            self.calls.push("base_init");
        }

        fn init(&mut self) {
            self.calls.push("base_overridden_init");
        }

        fn close(&mut self) {
            self.calls.push("close");
        }
    }

    #[derive(Injectable)]
    #[injectable(post_construct = ["init"])]
    struct DerivedComponent {
        #[inject(base)]
        base: BaseComponent,
        #[inject(property)]
        config: Option<InstancePtr<Config>>,
        #[inject(default = "default_retries")]
        retries: u8,
    }

    fn default_retries() -> u8 {
        3
    }

    impl DerivedComponent {
        fn init(&mut self) {
            self.base.calls.push("init");
        }
    }

    #[derive(Injectable)]
    struct Marker;

    #[derive(Injectable)]
    struct InjectorAware {
        #[inject]
        injector: InstancePtr<Injector>,
    }

    #[derive(Injectable)]
    struct CycleStart {
        #[inject]
        _next: InstancePtr<CycleEnd>,
    }

    #[derive(Injectable)]
    struct CycleEnd {
        #[inject]
        _next: InstancePtr<CycleStart>,
    }

    fn map_logger(injector: &Injector, name: &'static str) {
        injector
            .map::<Logger>()
            .unwrap()
            .to_value(InstancePtr::new(Logger { name }))
            .unwrap();
    }

    fn map_config(injector: &Injector) {
        injector
            .map::<Config>()
            .unwrap()
            .to_value(InstancePtr::new(Config { verbose: true }))
            .unwrap();
    }

    #[test]
    fn should_register_derived_metadata() {
        let registry = StaticMetadataRegistry::new(false).unwrap();

        let metadata = registry
            .type_descriptor(TypeKey::of::<ServiceImpl>())
            .unwrap();
        assert_eq!(metadata.constructor_arguments.len(), 2);
        assert_eq!(
            metadata.constructor_arguments[0].type_key,
            TypeKey::of::<Logger>()
        );
        assert!(!metadata.constructor_arguments[0].is_optional);
        assert_eq!(
            metadata.constructor_arguments[1].type_key,
            TypeKey::of::<Config>()
        );
        assert!(metadata.constructor_arguments[1].is_optional);
        assert_eq!(metadata.post_construct_methods, vec!["init".to_string()]);

        let metadata = registry
            .type_descriptor(TypeKey::of::<BaseComponent>())
            .unwrap();
        assert_eq!(metadata.property_injections.len(), 2);
        assert_eq!(metadata.property_injections[0].name, "config");
        assert!(metadata.property_injections[0].is_optional);
        assert_eq!(metadata.property_injections[1].name, "logger");
        assert!(!metadata.property_injections[1].is_optional);
        assert_eq!(metadata.pre_destroy_methods, vec!["close".to_string()]);

        assert!(registry.has_metadata(TypeKey::of::<Marker>()));
    }

    #[test]
    fn should_report_type_chain() {
        let component = DerivedComponent {
            base: Default::default(),
            config: None,
            retries: 0,
        };

        assert_eq!(
            component.type_chain(),
            vec![
                TypeKey::of::<DerivedComponent>(),
                TypeKey::of::<BaseComponent>()
            ]
        );
    }

    #[test]
    fn should_resolve_sealed_logger_for_singleton_service() {
        let injector = Injector::new().unwrap();
        map_logger(&injector, "root");
        injector.mapping::<Logger>().unwrap().seal().unwrap();
        injector
            .map::<dyn Service>()
            .unwrap()
            .to_singleton_as::<dyn Service, ServiceImpl>(|service| {
                service as InstancePtr<dyn Service>
            })
            .unwrap();

        let first = injector.get::<dyn Service>().unwrap();
        let second = injector.get::<dyn Service>().unwrap();

        assert!(InstancePtr::ptr_eq(&first, &second));
        assert_eq!(first.describe(), "root false true");
        assert_eq!(
            injector.map::<Logger>().unwrap_err(),
            InjectorError::SealedMappingOverride(TypeKey::of::<Logger>())
        );
        assert_eq!(
            injector.unmap::<Logger>().unwrap_err(),
            InjectorError::SealedMappingRemoval(TypeKey::of::<Logger>())
        );
    }

    #[test]
    fn should_resolve_config_mapped_only_on_child() {
        let root = Injector::new().unwrap();
        map_logger(&root, "root");
        root.map::<dyn Service>()
            .unwrap()
            .to_singleton_as::<dyn Service, ServiceImpl>(|service| {
                service as InstancePtr<dyn Service>
            })
            .unwrap();

        let child = root.create_sub_injector().unwrap();
        map_config(&child);

        assert!(child.has_mapping::<Config>().unwrap());
        assert!(!root.has_mapping::<Config>().unwrap());

        // the singleton is created by its owning injector, which doesn't see child mappings
        assert_eq!(child.get::<dyn Service>().unwrap().describe(), "root false true");

        let service = child.instantiate_instance::<ServiceImpl>().unwrap();
        assert_eq!(service.describe(), "root true true");
    }

    #[test]
    fn should_shadow_parent_mapping_in_child() {
        let root = Injector::new().unwrap();
        map_logger(&root, "root");
        root.mapping::<Logger>().unwrap().seal().unwrap();

        let child = root.create_sub_injector().unwrap();
        map_logger(&child, "child");

        assert_eq!(
            child
                .instantiate_instance::<ServiceImpl>()
                .unwrap()
                .logger
                .name,
            "child"
        );
        assert_eq!(
            root.instantiate_instance::<ServiceImpl>()
                .unwrap()
                .logger
                .name,
            "root"
        );
    }

    #[test]
    fn should_fail_on_missing_constructor_argument() {
        let injector = Injector::new().unwrap();

        assert_eq!(
            injector
                .instantiate_instance::<ServiceImpl>()
                .err()
                .unwrap(),
            InjectorError::MissingDependency {
                dependency: TypeKey::of::<Logger>(),
                owner: TypeKey::of::<ServiceImpl>(),
            }
        );
    }

    #[test]
    fn should_inject_with_base() {
        let injector = Injector::new().unwrap();
        map_logger(&injector, "root");

        let component = injector
            .instantiate_instance::<DerivedComponent>()
            .unwrap();

        assert_eq!(component.retries, 3);
        assert!(component.config.is_none());
        assert!(component.base.config.is_none());
        assert_eq!(component.base.logger.as_ref().unwrap().name, "root");
        assert_eq!(component.base.calls, vec!["init", "base_init"]);
    }

    #[test]
    fn should_inject_merged_property_once() {
        let injector = Injector::new().unwrap();
        map_logger(&injector, "root");
        map_config(&injector);

        let component = injector
            .instantiate_instance::<DerivedComponent>()
            .unwrap();

        // the derived definition of "config" shadows the base one
        assert!(component.config.is_some());
        assert!(component.base.config.is_none());
    }

    #[test]
    fn should_fail_on_missing_required_property() {
        let injector = Injector::new().unwrap();

        assert_eq!(
            injector
                .instantiate_instance::<DerivedComponent>()
                .err()
                .unwrap(),
            InjectorError::MissingDependency {
                dependency: TypeKey::of::<Logger>(),
                owner: TypeKey::of::<DerivedComponent>(),
            }
        );
    }

    #[test]
    fn should_call_inherited_pre_destroy_methods() {
        let injector = Injector::new().unwrap();
        map_logger(&injector, "root");

        let mut component = injector
            .instantiate_instance::<DerivedComponent>()
            .unwrap();
        injector.destroy_instance(&mut component).unwrap();

        assert_eq!(component.base.calls, vec!["init", "base_init", "close"]);
    }

    #[test]
    fn should_reject_unknown_injection_points() {
        let mut component = BaseComponent::default();

        assert_eq!(
            component
                .inject_property("unknown", erase(InstancePtr::new(1u8)))
                .unwrap_err(),
            InjectorError::UnknownInjectionPoint {
                target: TypeKey::of::<BaseComponent>(),
                name: "unknown".to_string(),
            }
        );
        assert_eq!(
            component.invoke_lifecycle_method("unknown").unwrap_err(),
            InjectorError::UnknownLifecycleMethod {
                target: TypeKey::of::<BaseComponent>(),
                name: "unknown".to_string(),
            }
        );
        assert!(matches!(
            component.inject_property("logger", erase(InstancePtr::new(1u8))),
            Err(InjectorError::IncompatibleInstance(..))
        ));
    }

    #[test]
    fn should_instantiate_unit_struct() {
        let injector = Injector::new().unwrap();
        assert!(injector.instantiate_instance::<Marker>().is_ok());
    }

    #[test]
    fn should_inject_owning_injector() {
        let root = Injector::new().unwrap();
        let child = root.create_sub_injector().unwrap();

        let component = child.instantiate_instance::<InjectorAware>().unwrap();
        assert!(component.injector.ptr_eq(&child));
    }

    #[test]
    fn should_detect_dependency_cycle() {
        let injector = Injector::new().unwrap();
        injector
            .map::<CycleStart>()
            .unwrap()
            .to_type::<CycleStart>()
            .unwrap();
        injector
            .map::<CycleEnd>()
            .unwrap()
            .to_type::<CycleEnd>()
            .unwrap();

        assert_eq!(
            injector.get::<CycleStart>().err().unwrap(),
            InjectorError::DependencyCycle(TypeKey::of::<CycleStart>())
        );

        // nothing is left under construction
        assert_eq!(
            injector.instantiate_instance::<CycleEnd>().err().unwrap(),
            InjectorError::DependencyCycle(TypeKey::of::<CycleEnd>())
        );
    }

    #[test]
    fn should_fail_after_destroy() {
        let injector = Injector::new().unwrap();
        map_logger(&injector, "root");
        injector.destroy().unwrap();

        assert_eq!(
            injector.destroy().unwrap_err(),
            InjectorError::DestroyedInjector
        );
        assert_eq!(
            injector
                .instantiate_instance::<ServiceImpl>()
                .err()
                .unwrap(),
            InjectorError::DestroyedInjector
        );
    }
}
