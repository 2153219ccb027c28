use super::*;
use crate::testing::{MockTopology, Registration, RecordingRunner};
use crate::topology::{FromResource, TopologyError};
use pretty_assertions::assert_eq;

struct Controller {
    name: &'static str,
}

#[derive(Default)]
struct LinkSuite {
    rig: Option<Arc<Controller>>,
    log: Vec<&'static str>,
}

impl LinkSuite {
    fn check_link(&mut self) {
        self.log.push("check_link");
    }
}

fn shared(mock: &Arc<MockTopology>) -> SharedTopology {
    let topology: SharedTopology = mock.clone();
    topology
}

fn bind_rig(suite: &mut Suite<LinkSuite>) {
    suite.inject_topo("rig", "controller-3dut", |s: &mut LinkSuite, resource| {
        s.rig = Some(Arc::from_resource(resource)?);
        Ok(())
    });
}

const SIXTY: Option<Duration> = Some(TOPOLOGY_TIMEOUT);

#[test]
fn tables_keep_first_registration_order() {
    let mut suite = Suite::<LinkSuite>::new();
    suite.add_test("a", |_: &mut LinkSuite| (), "first a", None);
    suite.add_test("b", |_: &mut LinkSuite| (), "b", None);
    suite.add_test("c", |_: &mut LinkSuite| (), "c", None);
    suite.add_test("a", |_: &mut LinkSuite| (), "second a", Some(Duration::from_millis(10)));

    let tests: Vec<_> = suite.tests().map(|t| (t.method(), t.message())).collect();
    assert_eq!(tests, vec![("a", "second a"), ("b", "b"), ("c", "c")]);
    assert_eq!(
        suite.tests().next().unwrap().timeout(),
        Some(Duration::from_millis(10))
    );
}

#[test]
fn hook_re_registration_replaces_in_place() {
    let mut suite = Suite::<LinkSuite>::new();
    suite.add_before_each("open", |_: &mut LinkSuite| ());
    suite.add_before_each("reset", |_: &mut LinkSuite| ());
    suite.add_before_each("open", |_: &mut LinkSuite| ());

    let methods: Vec<_> = suite.hooks(HookKind::BeforeEach).map(HookEntry::method).collect();
    assert_eq!(methods, vec!["open", "reset"]);
    assert_eq!(suite.hooks(HookKind::AfterEach).len(), 0);
}

#[test]
fn link_scenario_emits_one_test_and_two_topology_steps() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    suite.add_test(
        "checkLink",
        LinkSuite::check_link,
        "link is up",
        Some(Duration::from_millis(5000)),
    );
    suite.message("Link Tests");

    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();

    assert_eq!(runner.describe_count(), 1);
    let scope = runner.scope(0);
    assert_eq!(scope.title.as_deref(), Some("Link Tests"));
    assert_eq!(
        scope.log,
        vec![
            Registration::Hook(HookKind::BeforeAll, SIXTY),
            Registration::Hook(HookKind::AfterAll, SIXTY),
            Registration::Test(
                "link is up".into(),
                TestMode::Normal,
                Some(Duration::from_millis(5000))
            ),
        ]
    );
}

#[test]
fn empty_suite_still_has_topology_steps() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();

    let scope = runner.scope(0);
    assert_eq!(scope.title, None);
    assert_eq!(
        scope.log,
        vec![
            Registration::Hook(HookKind::BeforeAll, SIXTY),
            Registration::Hook(HookKind::AfterAll, SIXTY),
        ]
    );

    // No binding: acquire builds the fixture only, terminate still runs.
    scope.first_hook(HookKind::BeforeAll).unwrap().run().unwrap();
    scope.first_hook(HookKind::AfterAll).unwrap().run().unwrap();
    assert!(mock.required().is_empty());
    assert_eq!(mock.terminated(), 1);
}

#[test]
fn emission_order_ignores_registration_order() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    suite.add_test_only("focus", |_: &mut LinkSuite| (), "focus", None);
    suite.add_after_each("ae", |_: &mut LinkSuite| ());
    suite.add_test("t", |_: &mut LinkSuite| (), "t", None);
    suite.add_after_all("aa", |_: &mut LinkSuite| ());
    suite.add_before_each("be", |_: &mut LinkSuite| ());
    suite.add_before_all("ba", |_: &mut LinkSuite| ());

    let compiled = suite.compile(&shared(&mock)).unwrap();
    let shape: Vec<_> = compiled
        .emissions()
        .iter()
        .map(|e| match e {
            Emission::Hook { kind, method, .. } => format!("{kind}:{}", method.unwrap_or("*")),
            Emission::Test { method, mode, .. } => format!("{mode:?}:{method}"),
        })
        .collect();
    assert_eq!(
        shape,
        vec![
            "before all:*",
            "after all:*",
            "before all:ba",
            "after all:aa",
            "before each:be",
            "after each:ae",
            "Normal:t",
            "Exclusive:focus",
        ]
    );
    assert!(compiled.emissions()[0].is_synthetic());
    assert!(!compiled.emissions()[2].is_synthetic());
}

#[test]
fn injection_sets_property_and_terminate_runs_once() {
    let mock = Arc::new(
        MockTopology::new().with_resource("controller-3dut", Arc::new(Controller { name: "3dut" })),
    );
    let mut suite = Suite::<LinkSuite>::new();
    bind_rig(&mut suite);
    suite.add_test(
        "uses_rig",
        |s: &mut LinkSuite| match &s.rig {
            Some(rig) if rig.name == "3dut" => Ok(()),
            _ => Err("rig not injected"),
        },
        "uses rig",
        None,
    );
    suite.add_test("ignores_rig", |_: &mut LinkSuite| (), "ignores rig", None);

    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();
    let scope = runner.scope(0);

    scope.first_hook(HookKind::BeforeAll).unwrap().run().unwrap();
    scope.test("uses rig").unwrap().run().unwrap();
    scope.first_hook(HookKind::AfterAll).unwrap().run().unwrap();

    assert_eq!(mock.required(), vec![TopoKind::new("controller-3dut")]);
    assert_eq!(mock.terminated(), 1);
}

#[test]
fn last_topology_binding_wins() {
    let mut suite = Suite::<LinkSuite>::new();
    suite.inject_topo("first", "a", |_: &mut LinkSuite, _| Ok(()));
    bind_rig(&mut suite);

    let binding = suite.topo_binding().unwrap();
    assert_eq!(binding.property(), "rig");
    assert_eq!(binding.kind().as_str(), "controller-3dut");
}

#[test]
fn duplicate_test_keeps_later_payload() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    suite.add_test("x", |_: &mut LinkSuite| (), "first", None);
    suite.add_test("x", |_: &mut LinkSuite| (), "second", None);

    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();
    let titles: Vec<_> = runner.scope(0).tests.iter().map(|t| t.title.clone()).collect();
    assert_eq!(titles, vec!["second".to_string()]);
}

#[test]
fn exclusive_tests_are_marked() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    suite.add_test("plain", |_: &mut LinkSuite| (), "plain", None);
    suite.add_test_only("focus", |_: &mut LinkSuite| (), "focus", None);

    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();
    let scope = runner.scope(0);
    assert_eq!(scope.test("plain").unwrap().mode, TestMode::Normal);
    assert_eq!(scope.test("focus").unwrap().mode, TestMode::Exclusive);
}

#[test]
fn hooks_and_tests_share_one_instance() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    suite.add_before_all("setup", |s: &mut LinkSuite| s.log.push("setup"));
    suite.add_test(
        "sees_setup",
        |s: &mut LinkSuite| {
            if s.log == ["setup"] {
                Ok(())
            } else {
                Err(format!("unexpected log {:?}", s.log))
            }
        },
        "sees setup",
        None,
    );

    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();
    let scope = runner.scope(0);
    scope.run_hooks(HookKind::BeforeAll).unwrap();
    scope.test("sees setup").unwrap().run().unwrap();
}

#[test]
fn each_run_gets_a_fresh_instance() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    suite.add_test(
        "count",
        |s: &mut LinkSuite| {
            s.log.push("run");
            if s.log.len() == 1 {
                Ok(())
            } else {
                Err("state leaked between runs")
            }
        },
        "count",
        None,
    );

    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();
    let scope = runner.scope(0);
    for _ in 0..2 {
        scope.first_hook(HookKind::BeforeAll).unwrap().run().unwrap();
        scope.test("count").unwrap().run().unwrap();
        scope.first_hook(HookKind::AfterAll).unwrap().run().unwrap();
    }
    assert_eq!(mock.terminated(), 2);
}

#[test]
fn acquire_failure_propagates_and_leaves_tests_without_context() {
    let kind = TopoKind::new("controller-3dut");
    let mock = Arc::new(
        MockTopology::new().with_failure("controller-3dut", TopologyError::acquire(&kind, "busy")),
    );
    let mut suite = Suite::<LinkSuite>::new();
    bind_rig(&mut suite);
    suite.add_test("t", LinkSuite::check_link, "t", None);

    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();
    let scope = runner.scope(0);

    let err = scope.first_hook(HookKind::BeforeAll).unwrap().run().unwrap_err();
    assert!(matches!(err, StepError::Topology(TopologyError::Acquire { .. })));

    // Teardown clears the fixture and still releases the topology.
    scope.first_hook(HookKind::AfterAll).unwrap().run().unwrap();
    let err = scope.test("t").unwrap().run().unwrap_err();
    assert!(matches!(err, StepError::ContextUnavailable { .. }));
    assert_eq!(mock.terminated(), 1);
}

#[test]
fn resource_type_mismatch_fails_acquire_step() {
    let mock = Arc::new(MockTopology::new().with_resource("controller-3dut", Arc::new(42_u8)));
    let mut suite = Suite::<LinkSuite>::new();
    bind_rig(&mut suite);

    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();
    let err = runner
        .scope(0)
        .first_hook(HookKind::BeforeAll)
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, StepError::ResourceType { .. }));
}

#[test]
fn terminate_failure_surfaces_from_after_all() {
    let mock = Arc::new(MockTopology::new().with_terminate_error(TopologyError::terminate("stuck")));
    let mut suite = Suite::<LinkSuite>::new();
    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();

    let scope = runner.scope(0);
    scope.first_hook(HookKind::BeforeAll).unwrap().run().unwrap();
    let err = scope.first_hook(HookKind::AfterAll).unwrap().run().unwrap_err();
    assert_eq!(err.to_string(), "failed to terminate topology: stuck");
}

#[test]
fn test_error_message_reaches_runner() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    suite.add_test("bad", |_: &mut LinkSuite| Err::<(), _>("no carrier"), "bad", None);

    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();
    let scope = runner.scope(0);
    scope.first_hook(HookKind::BeforeAll).unwrap().run().unwrap();
    let err = scope.test("bad").unwrap().run().unwrap_err();
    assert_eq!(err.to_string(), "no carrier");
}

#[test]
fn second_generate_is_rejected() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();

    let err = suite.generate(&mut runner, &shared(&mock)).unwrap_err();
    assert!(matches!(err, SuiteError::AlreadyGenerated { .. }));
    assert_eq!(runner.describe_count(), 1);
    assert!(suite.is_generated());
}

#[test]
fn late_registration_does_not_reach_emitted_suite() {
    let mock = Arc::new(MockTopology::new());
    let mut suite = Suite::<LinkSuite>::new();
    let mut runner = RecordingRunner::new();
    suite.generate(&mut runner, &shared(&mock)).unwrap();
    suite.add_test("late", |_: &mut LinkSuite| (), "late", None);

    assert!(runner.scope(0).tests.is_empty());
    assert_eq!(suite.tests().len(), 1);
}

#[test]
fn context_lifecycle() {
    let ctx = SuiteContext::<LinkSuite>::new();
    assert!(!ctx.is_live());
    assert!(ctx.with(|_| ()).is_err());

    ctx.start();
    ctx.with(|s| s.log.push("x")).unwrap();
    let shared = ctx.clone();
    assert_eq!(shared.with(|s| s.log.len()).unwrap(), 1);

    ctx.finish();
    assert!(!shared.is_live());
}

#[test]
fn held_instance_is_busy_not_blocking() {
    let ctx = SuiteContext::<LinkSuite>::new();
    ctx.start();

    let nested = ctx
        .with(|_| {
            let inner = ctx.with(|s| s.log.push("never"));
            // Teardown while the instance is held must not wait for it.
            ctx.finish();
            inner
        })
        .unwrap();
    let err = nested.unwrap_err();
    assert!(matches!(err, StepError::ContextBusy { .. }));
    assert_eq!(err.to_string(), "`LinkSuite` instance is still held by an earlier step");
    assert!(!ctx.is_live());
}
