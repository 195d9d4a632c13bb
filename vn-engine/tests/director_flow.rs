//! Director 端到端行为：确定性、快进、存档等价、构建错误

use std::sync::Arc;

use vn_engine::{
    BuildError, ChoiceOption, Director, EngineConfig, ExecutionStatus, InputEvent, RuntimeEvent,
    Script, ScriptBuilder, Settings, VnError, parse_script,
};

fn miko_script() -> Script<()> {
    ScriptBuilder::new("miko")
        .label("start")
        .say("Miko", "Welcome.")
        .menu([ChoiceOption::new("pray", "Pray", "pray")])
        .label("pray")
        .wait(500)
        .jump("start")
        .finalize()
        .unwrap()
}

#[test]
fn test_miko_end_to_end() {
    let mut director = Director::new(miko_script(), ());

    let events = director.tick(0, None).unwrap();
    insta::assert_debug_snapshot!(events, @r#"
    [
        Said {
            speaker: Some(
                "Miko",
            ),
            text: "Welcome.",
        },
        ChoicePrompt {
            options: [
                ChoiceItem {
                    id: "pray",
                    text: "Pray",
                },
            ],
        },
    ]
    "#);
    assert!(matches!(
        director.status(),
        ExecutionStatus::WaitingChoice { .. }
    ));

    let events = director.tick(0, Some(InputEvent::choice(0))).unwrap();
    assert_eq!(events, vec![RuntimeEvent::WaitStarted { remaining_ms: 500 }]);
    assert_eq!(
        director.status(),
        &ExecutionStatus::WaitingTimer { remaining_ms: 500 }
    );

    let events = director.tick(500, None).unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], RuntimeEvent::Said { text, .. } if text == "Welcome."));
    assert!(matches!(&events[1], RuntimeEvent::ChoicePrompt { .. }));
}

/// 固定 (dt, input) 轨迹
fn trace() -> Vec<(u64, Option<InputEvent>)> {
    vec![
        (16, None),
        (16, Some(InputEvent::choice(1))),
        (16, Some(InputEvent::text("Aoi"))),
        (300, None),
        (16, Some(InputEvent::click())),
        (16, None),
        (16, None),
    ]
}

fn branching_script() -> Script<()> {
    ScriptBuilder::<()>::new("branching")
        .scene("shrine")
        .animate("miko", "alpha", 1.0, 200, vn_engine::Easing::EaseInOut)
        .label("menu")
        .menu([
            ChoiceOption::new("a", "A", "menu"),
            ChoiceOption::new("b", "B", "route_b"),
        ])
        .label("route_b")
        .run_code("count", |state| {
            let visits = state.int_var("visits", 0);
            state.set_int_var("visits", visits + 1);
        })
        .load_text("Name?", "player")
        .wait(250)
        .wait_click()
        .jump_if("done", |state| state.int_var("visits", 0) > 0)
        .narrate("unreachable")
        .label("done")
        .finalize()
        .unwrap()
}

fn replay(script: Arc<Script<()>>) -> (Vec<Vec<RuntimeEvent>>, Director<()>) {
    let mut director = Director::new(script, ());
    let events = trace()
        .into_iter()
        .map(|(dt, input)| director.tick(dt, input).unwrap())
        .collect();
    (events, director)
}

#[test]
fn test_replay_is_deterministic() {
    let script = Arc::new(branching_script());

    let (first_events, first) = replay(Arc::clone(&script));
    let (second_events, second) = replay(script);

    assert_eq!(first_events, second_events);
    assert_eq!(first.state(), second.state());
    assert_eq!(first.history(), second.history());
    assert!(first.is_finished());
    assert_eq!(first.state().text_var("player", ""), "Aoi");
    assert_eq!(first.state().int_var("visits", 0), 1);
}

#[test]
fn test_skip_mode_resolves_long_wait_in_one_tick() {
    let script = parse_script::<()>("skip", "narrate: before\nwait: 1000\nnarrate: after\n").unwrap();
    let settings = Settings {
        skip_mode: true,
        ..Settings::default()
    };
    let mut director = Director::with_config(script, (), settings, EngineConfig::default());

    let events = director.tick(16, None).unwrap();
    assert_eq!(
        events,
        vec![
            RuntimeEvent::Said {
                speaker: None,
                text: "before".to_string()
            },
            RuntimeEvent::WaitStarted { remaining_ms: 0 },
            RuntimeEvent::Said {
                speaker: None,
                text: "after".to_string()
            },
            RuntimeEvent::ScriptEnded,
        ]
    );
}

#[test]
fn test_skip_mode_timer_loop_returns_every_tick() {
    let script =
        parse_script::<()>("loop", "label: loop\nsay: Miko | ...\nwait: 1000\njump: loop\n")
            .unwrap();
    let settings = Settings {
        skip_mode: true,
        ..Settings::default()
    };
    let mut director = Director::with_config(script, (), settings, EngineConfig::default());

    for _ in 0..3 {
        let events = director.tick(16, None).unwrap();
        assert_eq!(
            events,
            vec![
                RuntimeEvent::Said {
                    speaker: Some("Miko".to_string()),
                    text: "...".to_string()
                },
                RuntimeEvent::WaitStarted { remaining_ms: 0 },
            ]
        );
    }
    assert_eq!(director.history().dialogue_count(), 3);

    // 关闭快进后恢复正常计时
    director.set_skip_mode(false);
    let events = director.tick(16, None).unwrap();
    assert_eq!(events[1], RuntimeEvent::WaitStarted { remaining_ms: 1000 });
    assert!(director.tick(16, None).unwrap().is_empty());
}

fn chapter_script() -> Script<()> {
    ScriptBuilder::<()>::new("chapter")
        .narrate("prologue")
        .run_code("remember", |state| state.set_flag("a", true))
        .label("L")
        .wait_click()
        .branch("yes", "no", |state| state.flag("a"))
        .label("yes")
        .say("Miko", "You remembered.")
        .menu([
            ChoiceOption::new("stay", "Stay", "end"),
            ChoiceOption::new("go", "Go", "no"),
        ])
        .label("no")
        .narrate("Forgotten.")
        .wait_click()
        .label("end")
        .finalize()
        .unwrap()
}

#[test]
fn test_restore_matches_uninterrupted_run() {
    let script = Arc::new(chapter_script());
    let inputs = [
        Some(InputEvent::click()),
        Some(InputEvent::choice(1)),
        Some(InputEvent::click()),
    ];

    let mut uninterrupted = Director::new(Arc::clone(&script), ());
    let first = uninterrupted.tick(0, None).unwrap();
    assert_eq!(first.last(), Some(&RuntimeEvent::WaitForClickStarted));

    let saved = uninterrupted.save(1);
    assert_eq!(saved.snapshot.current_label.as_deref(), Some("L"));
    assert_eq!(saved.snapshot.flags.get("a"), Some(&true));

    // 读档后从 L 的下一条指令重新执行
    let mut restored = Director::restore(Arc::clone(&script), &saved, EngineConfig::default())
        .unwrap();
    assert_eq!(
        restored.tick(0, None).unwrap(),
        vec![RuntimeEvent::WaitForClickStarted]
    );
    assert_eq!(restored.runtime().ip(), uninterrupted.runtime().ip());

    for input in inputs {
        let expected = uninterrupted.tick(16, input.clone()).unwrap();
        let actual = restored.tick(16, input).unwrap();
        assert_eq!(actual, expected);
    }

    assert!(uninterrupted.is_finished());
    assert!(restored.is_finished());
    assert_eq!(restored.state(), uninterrupted.state());
}

#[test]
fn test_finalize_reports_label_errors() {
    let duplicate = ScriptBuilder::<()>::new("dup")
        .label("a")
        .label("a")
        .finalize();
    assert!(matches!(
        duplicate,
        Err(BuildError::DuplicateLabel { name }) if name == "a"
    ));

    let missing = ScriptBuilder::<()>::new("missing")
        .menu([ChoiceOption::new("x", "X", "nowhere")])
        .finalize();
    assert!(matches!(
        missing,
        Err(BuildError::LabelNotFound { name }) if name == "nowhere"
    ));

    let parsed = parse_script::<()>("text", "label: a\njump: b\n");
    assert!(matches!(
        parsed,
        Err(VnError::Build(BuildError::LabelNotFound { name })) if name == "b"
    ));
}
