use quill::prelude::*;
use quill::{ModuleType, discover};

#[derive(Injectable)]
pub struct Economy;

#[module]
impl Economy {
    fn new() -> Self {
        Economy
    }
}

#[derive(Injectable)]
pub struct Arena {
    economy: Arc<Economy>,
}

#[module]
impl Arena {
    fn new(economy: Arc<Economy>) -> Self {
        Arena { economy }
    }
}

#[derive(Injectable)]
pub struct Broken;

#[module]
impl Broken {
    fn new() -> anyhow::Result<Self> {
        Err(anyhow::anyhow!("missing world"))
    }
}

#[derive(Injectable)]
pub struct Hidden;

#[module(discover = false)]
impl Hidden {
    fn new() -> Self {
        Hidden
    }
}

fn short_names(types: &[ModuleType]) -> Vec<&'static str> {
    types.iter().map(|ty| ty.short_name()).collect()
}

#[test]
fn test_discover_is_sorted_and_skips_hidden_modules() {
    assert_eq!(short_names(&discover()), vec!["Arena", "Broken", "Economy"]);
}

#[test]
fn test_register_all_aborts_on_first_failure_by_default() {
    let container = Container::new();
    let err = container.register_all(discover()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Construction);
    assert_eq!(short_names(&container.registration_order()), vec!["Economy", "Arena"]);
}

#[test]
fn test_register_all_can_skip_failures() {
    let container = ContainerBuilder::new()
        .config(ContainerConfig {
            continue_on_failure: true,
            ..Default::default()
        })
        .build();

    let failures = container.register_all(discover()).unwrap();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0.short_name(), "Broken");
    assert_eq!(
        short_names(&container.registration_order()),
        vec!["Economy", "Arena"]
    );
    let arena = container.get_module::<Arena>().unwrap();
    assert!(Arc::ptr_eq(&arena.economy, &container.get_module::<Economy>().unwrap()));

    let names: Vec<_> = container.modules().into_iter().map(|info| info.short_name).collect();
    assert_eq!(names, vec!["Economy", "Arena"]);
}

#[test]
fn test_hidden_module_still_registers_explicitly() {
    let container = Container::new();
    container.register_module::<Hidden>().unwrap();
    assert!(container.contains::<Hidden>());
}

#[tokio::test]
async fn test_application_discovers_modules() {
    let app = Application::builder()
        .config(ContainerConfig {
            continue_on_failure: true,
            ..Default::default()
        })
        .discover(true)
        .build()
        .unwrap();

    assert!(app.container().contains::<Arena>());
    assert!(!app.container().contains::<Broken>());

    let report = app.run_until(async {}).await;
    assert_eq!(short_names(&report.destroyed), vec!["Arena", "Economy"]);
}
