//! # Engine 模块
//!
//! 脚本执行状态机。
//!
//! ## 执行模型
//!
//! ```text
//! step(dt_ms, input, &mut GameState) -> Result<Vec<RuntimeEvent>, RuntimeError>
//! ```
//!
//! 1. 校验输入是否与当前等待状态匹配（不匹配的选择/文本提交是宿主的编程错误）
//! 2. 根据 input 与 dt 决定是否解除等待
//! 3. 若不再等待，连续执行指令直到下一个阻塞点或脚本结束
//! 4. 返回执行过程中产生的事件
//!
//! 同一次 step 中每条指令最多执行一次：再次回到已执行过的指令时以
//! `WaitingTimer { remaining_ms: 0 }` 让出，下一次 step 从该指令继续。
//! 快进模式下只靠 `Wait` 挂起的循环因此不会卡死调用方。

use std::collections::BTreeSet;
use std::mem;
use std::sync::Arc;

use tracing::{debug, info};

use crate::animation::AnimationRequest;
use crate::config::EngineConfig;
use crate::error::{RuntimeError, SaveError};
use crate::event::RuntimeEvent;
use crate::input::InputEvent;
use crate::runtime::executor::{Executor, SideEffect};
use crate::script::instruction::Script;
use crate::state::{ExecutionStatus, GameState};

/// 脚本执行引擎
///
/// # 使用示例
///
/// ```ignore
/// let script = Arc::new(parse_script::<()>("main", text)?);
/// let mut runtime = ScriptRuntime::new(script);
/// let mut state = GameState::new(());
///
/// loop {
///     let events = runtime.step(16, input.take(), &mut state)?;
///     // Host 处理 events...
/// }
/// ```
pub struct ScriptRuntime<U> {
    /// 当前脚本
    script: Arc<Script<U>>,
    /// 指令指针，取值范围 [0, len]
    ip: usize,
    /// 执行状态
    status: ExecutionStatus,
    /// 调用栈（预留，目前始终为空）
    call_stack: Vec<usize>,
    /// 最近经过的标签
    last_label: Option<String>,
    /// 指令执行器
    executor: Executor,
    /// 本次 step 中排队的补间请求，由 Director 取走
    pending_animations: Vec<AnimationRequest>,
    /// 已解锁的 CG
    unlocked_gallery: BTreeSet<String>,
    /// 阻塞音效已结束，下一次 step 先发出 `SfxStopped`
    sfx_stop_pending: bool,
}

impl<U> ScriptRuntime<U> {
    /// 以默认引擎配置创建
    pub fn new(script: Arc<Script<U>>) -> Self {
        Self::with_config(script, &EngineConfig::default())
    }

    /// 创建新的 Runtime 实例
    pub fn with_config(script: Arc<Script<U>>, config: &EngineConfig) -> Self {
        Self {
            script,
            ip: 0,
            status: ExecutionStatus::Running,
            call_stack: Vec::new(),
            last_label: None,
            executor: Executor::new(config.gate_blocking_sfx),
            pending_animations: Vec::new(),
            unlocked_gallery: BTreeSet::new(),
            sfx_stop_pending: false,
        }
    }

    /// 从存档位置恢复
    ///
    /// `label` 为 None 时从脚本开头执行；否则定位到该标签的下一条指令。
    pub fn restore_at_label(
        script: Arc<Script<U>>,
        label: Option<&str>,
        unlocked_gallery: BTreeSet<String>,
        config: &EngineConfig,
    ) -> Result<Self, SaveError> {
        let mut runtime = Self::with_config(script, config);
        if let Some(label) = label {
            let index = runtime
                .script
                .find_label(label)
                .ok_or_else(|| SaveError::UnknownLabel {
                    label: label.to_string(),
                })?;
            runtime.ip = index + 1;
            runtime.last_label = Some(label.to_string());
        }
        runtime.unlocked_gallery = unlocked_gallery;

        debug!(script = %runtime.script.id, label = ?label, ip = runtime.ip, "从存档恢复执行位置");
        Ok(runtime)
    }

    /// 核心驱动函数
    ///
    /// # 参数
    ///
    /// - `dt_ms`: 距上一次调用经过的时间
    /// - `input`: Host 传入的输入（可选）
    /// - `state`: 游戏状态，只在本次调用期间被修改
    ///
    /// # 错误
    ///
    /// 选择索引越界或在不等待选择/文本时提交选择/文本，返回 `RuntimeError`，
    /// 此时状态保持不变。
    pub fn step(
        &mut self,
        dt_ms: u64,
        input: Option<InputEvent>,
        state: &mut GameState<U>,
    ) -> Result<Vec<RuntimeEvent>, RuntimeError> {
        let mut events = Vec::new();

        if self.status.is_ended() {
            return Ok(events);
        }

        // 1. 处理输入，尝试解除等待
        if let Some(input) = input {
            self.handle_input(input, state)?;
        }

        // 2. 计时等待
        if let ExecutionStatus::WaitingTimer { remaining_ms } = self.status {
            let remaining_ms = if self.executor.skip_waits() {
                0
            } else {
                remaining_ms.saturating_sub(dt_ms)
            };
            self.status = if remaining_ms == 0 {
                ExecutionStatus::Running
            } else {
                ExecutionStatus::WaitingTimer { remaining_ms }
            };
        }

        // 3. 仍在等待，直接返回
        if self.status.is_waiting() {
            return Ok(events);
        }

        if mem::take(&mut self.sfx_stop_pending) {
            events.push(RuntimeEvent::SfxStopped);
        }

        // 4. 继续执行脚本直到阻塞或结束
        self.run(state, &mut events);
        Ok(events)
    }

    fn run(&mut self, state: &mut GameState<U>, events: &mut Vec<RuntimeEvent>) {
        let script = Arc::clone(&self.script);
        let mut visited = vec![false; script.len()];

        loop {
            let Some(instruction) = script.get(self.ip) else {
                // 脚本执行完毕
                self.status = ExecutionStatus::Ended;
                events.push(RuntimeEvent::ScriptEnded);
                info!(script = %script.id, "脚本执行完毕");
                return;
            };

            if mem::replace(&mut visited[self.ip], true) {
                debug!(ip = self.ip, "本次 step 内回到已执行的指令，让出");
                self.status = ExecutionStatus::WaitingTimer { remaining_ms: 0 };
                return;
            }

            if let Some(name) = instruction.as_label() {
                self.last_label = Some(name.to_string());
            }

            let result = self.executor.execute(self.ip, instruction, &script, state);

            if let Some(event) = result.event {
                events.push(event);
            }

            match result.effect {
                Some(SideEffect::Animate(request)) => self.pending_animations.push(request),
                Some(SideEffect::UnlockGallery(id)) => {
                    if self.unlocked_gallery.insert(id.clone()) {
                        debug!(id = %id, "解锁 CG");
                    }
                }
                None => {}
            }

            // 处理跳转
            if let Some(target) = result.jump_to {
                debug!(from = self.ip, to = target, "跳转");
                self.ip = target;
                continue;
            }

            // 前进到下一条指令
            self.ip += 1;

            // 如果需要等待，停止执行
            if let Some(waiting) = result.waiting {
                debug!(status = waiting.name(), ip = self.ip, "进入等待");
                self.status = waiting;
                return;
            }
        }
    }

    /// 检查输入是否能被当前状态接受，不修改任何状态
    ///
    /// 点击总是合法的（非等待点击时被忽略）；等待点击时其他输入也被忽略。
    pub fn check_input(&self, input: &InputEvent) -> Result<(), RuntimeError> {
        match (&self.status, input) {
            (_, InputEvent::Click) | (ExecutionStatus::WaitingClick, _) => Ok(()),
            (ExecutionStatus::WaitingChoice { options }, InputEvent::ChoiceSelected { index }) => {
                if *index < options.len() {
                    Ok(())
                } else {
                    Err(RuntimeError::InvalidChoiceIndex {
                        index: *index,
                        max: options.len(),
                    })
                }
            }
            (ExecutionStatus::WaitingTextInput { .. }, InputEvent::TextSubmitted { .. }) => Ok(()),
            (status, InputEvent::ChoiceSelected { .. }) => Err(RuntimeError::StateMismatch {
                expected: "WaitingChoice".to_string(),
                actual: status.name().to_string(),
            }),
            (status, InputEvent::TextSubmitted { .. }) => Err(RuntimeError::StateMismatch {
                expected: "WaitingTextInput".to_string(),
                actual: status.name().to_string(),
            }),
        }
    }

    /// 处理输入，解除等待状态
    fn handle_input(
        &mut self,
        input: InputEvent,
        state: &mut GameState<U>,
    ) -> Result<(), RuntimeError> {
        self.check_input(&input)?;

        match (&self.status, input) {
            // 点击解除 WaitingClick，其他状态下的点击忽略
            (ExecutionStatus::WaitingClick, InputEvent::Click) => {
                self.status = ExecutionStatus::Running;
            }

            // 选择解除 WaitingChoice，直接跳到已解析的目标
            (ExecutionStatus::WaitingChoice { options }, InputEvent::ChoiceSelected { index }) => {
                if let Some(choice) = options.get(index) {
                    debug!(index, id = %choice.id, target = choice.target, "选择分支");
                    self.ip = choice.target;
                    self.status = ExecutionStatus::Running;
                }
            }

            // 文本提交解除 WaitingTextInput
            (ExecutionStatus::WaitingTextInput { var_name }, InputEvent::TextSubmitted { text }) => {
                state.set_text_var(var_name.clone(), text);
                self.status = ExecutionStatus::Running;
            }

            _ => {}
        }
        Ok(())
    }

    /// 外部通知：音效播放完毕
    ///
    /// 只有当前正被同名阻塞音效挡住时才生效，返回是否解除了阻塞。
    pub fn sfx_finished(&mut self, track: &str) -> bool {
        match &self.status {
            ExecutionStatus::Blocked { active_sfx } if active_sfx == track => {
                debug!(track, "阻塞音效结束");
                self.status = ExecutionStatus::Running;
                self.sfx_stop_pending = true;
                true
            }
            _ => false,
        }
    }

    /// 快进模式
    pub fn set_skip_waits(&mut self, skip: bool) {
        self.executor.set_skip_waits(skip);
    }

    pub fn skip_waits(&self) -> bool {
        self.executor.skip_waits()
    }

    /// 取走本次 step 排队的补间请求
    pub fn take_animation_requests(&mut self) -> Vec<AnimationRequest> {
        mem::take(&mut self.pending_animations)
    }

    pub fn script(&self) -> &Arc<Script<U>> {
        &self.script
    }

    /// 当前执行状态
    pub fn status(&self) -> &ExecutionStatus {
        &self.status
    }

    /// 指令指针
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// 最近经过的标签
    pub fn last_label(&self) -> Option<&str> {
        self.last_label.as_deref()
    }

    pub fn call_stack(&self) -> &[usize] {
        &self.call_stack
    }

    pub fn unlocked_gallery(&self) -> &BTreeSet<String> {
        &self.unlocked_gallery
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_ended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Easing;
    use crate::event::ChoiceItem;
    use crate::script::ScriptBuilder;
    use crate::script::instruction::ChoiceOption;

    fn runtime(builder: &mut ScriptBuilder<()>) -> ScriptRuntime<()> {
        ScriptRuntime::new(Arc::new(builder.finalize().unwrap()))
    }

    fn said(speaker: Option<&str>, text: &str) -> RuntimeEvent {
        RuntimeEvent::Said {
            speaker: speaker.map(str::to_string),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_runtime_creation() {
        let runtime = runtime(ScriptBuilder::<()>::new("test").narrate("hi"));
        assert_eq!(runtime.ip(), 0);
        assert_eq!(runtime.status(), &ExecutionStatus::Running);
        assert!(runtime.call_stack().is_empty());
    }

    #[test]
    fn test_non_blocking_run_to_end() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .say("Miko", "Hello")
                .narrate("World"),
        );
        let mut state = GameState::new(());

        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(
            events,
            vec![
                said(Some("Miko"), "Hello"),
                said(None, "World"),
                RuntimeEvent::ScriptEnded
            ]
        );
        assert!(runtime.is_finished());

        // 结束后 step 不再产生事件
        assert!(runtime.step(16, Some(InputEvent::Click), &mut state).unwrap().is_empty());
    }

    #[test]
    fn test_end_to_end_choice_loop() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .label("start")
                .say("Miko", "Welcome.")
                .menu(vec![ChoiceOption::new("pray", "Pray", "pray")])
                .label("pray")
                .wait(500)
                .jump("start"),
        );
        let mut state = GameState::new(());
        let prompt = RuntimeEvent::ChoicePrompt {
            options: vec![ChoiceItem {
                id: "pray".to_string(),
                text: "Pray".to_string(),
            }],
        };

        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(events, vec![said(Some("Miko"), "Welcome."), prompt.clone()]);
        assert!(matches!(runtime.status(), ExecutionStatus::WaitingChoice { .. }));

        let events = runtime.step(0, Some(InputEvent::choice(0)), &mut state).unwrap();
        assert_eq!(events, vec![RuntimeEvent::WaitStarted { remaining_ms: 500 }]);
        assert_eq!(
            runtime.status(),
            &ExecutionStatus::WaitingTimer { remaining_ms: 500 }
        );
        assert_eq!(runtime.last_label(), Some("pray"));

        let events = runtime.step(500, None, &mut state).unwrap();
        assert_eq!(events, vec![said(Some("Miko"), "Welcome."), prompt]);
        assert_eq!(runtime.last_label(), Some("start"));
    }

    #[test]
    fn test_timer_counts_down_across_steps() {
        let mut runtime = runtime(ScriptBuilder::<()>::new("test").wait(100).narrate("done"));
        let mut state = GameState::new(());

        runtime.step(0, None, &mut state).unwrap();
        assert!(runtime.step(40, None, &mut state).unwrap().is_empty());
        assert_eq!(
            runtime.status(),
            &ExecutionStatus::WaitingTimer { remaining_ms: 60 }
        );
        // 点击不影响计时等待
        assert!(runtime.step(0, Some(InputEvent::Click), &mut state).unwrap().is_empty());

        let events = runtime.step(100, None, &mut state).unwrap();
        assert_eq!(events, vec![said(None, "done"), RuntimeEvent::ScriptEnded]);
    }

    #[test]
    fn test_skip_waits_collapses_pending_timer() {
        let mut runtime = runtime(ScriptBuilder::<()>::new("test").wait(1000).narrate("after"));
        let mut state = GameState::new(());

        runtime.step(0, None, &mut state).unwrap();
        runtime.set_skip_waits(true);
        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(events, vec![said(None, "after"), RuntimeEvent::ScriptEnded]);
    }

    #[test]
    fn test_wait_click() {
        let mut runtime = runtime(ScriptBuilder::<()>::new("test").wait_click().narrate("next"));
        let mut state = GameState::new(());

        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(events, vec![RuntimeEvent::WaitForClickStarted]);
        assert!(runtime.step(1000, None, &mut state).unwrap().is_empty());

        let events = runtime.step(0, Some(InputEvent::Click), &mut state).unwrap();
        assert_eq!(events[0], said(None, "next"));
    }

    #[test]
    fn test_wait_click_ignores_other_inputs() {
        let mut runtime = runtime(ScriptBuilder::<()>::new("test").wait_click().narrate("next"));
        let mut state = GameState::new(());
        runtime.step(0, None, &mut state).unwrap();

        assert!(runtime.step(0, Some(InputEvent::choice(0)), &mut state).unwrap().is_empty());
        assert!(runtime.step(0, Some(InputEvent::text("x")), &mut state).unwrap().is_empty());
        assert_eq!(runtime.status(), &ExecutionStatus::WaitingClick);
        assert!(state.text_vars().is_empty());

        let events = runtime.step(0, Some(InputEvent::Click), &mut state).unwrap();
        assert_eq!(events, vec![said(None, "next"), RuntimeEvent::ScriptEnded]);
    }

    #[test]
    fn test_skip_mode_wait_loop_yields_each_step() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .label("loop")
                .say("Miko", "...")
                .wait(1000)
                .jump("loop"),
        );
        runtime.set_skip_waits(true);
        let mut state = GameState::new(());
        let round = vec![
            said(Some("Miko"), "..."),
            RuntimeEvent::WaitStarted { remaining_ms: 0 },
        ];

        for _ in 0..3 {
            assert_eq!(runtime.step(16, None, &mut state).unwrap(), round);
            assert_eq!(
                runtime.status(),
                &ExecutionStatus::WaitingTimer { remaining_ms: 0 }
            );
            assert_eq!(runtime.ip(), 0);
        }
    }

    #[test]
    fn test_zero_wait_and_bare_jump_loops_yield() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .label("tick")
                .narrate("tick")
                .wait(0)
                .jump("tick"),
        );
        let mut state = GameState::new(());
        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(
            events,
            vec![said(None, "tick"), RuntimeEvent::WaitStarted { remaining_ms: 0 }]
        );
        assert_eq!(runtime.step(0, None, &mut state).unwrap(), events);

        let mut bare = self::runtime(ScriptBuilder::<()>::new("test").label("a").jump("a"));
        assert!(bare.step(0, None, &mut state).unwrap().is_empty());
        assert_eq!(
            bare.status(),
            &ExecutionStatus::WaitingTimer { remaining_ms: 0 }
        );
    }

    #[test]
    fn test_counting_loop_runs_one_round_per_step() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .label("count")
                .run_code("inc", |s| {
                    let n = s.int_var("n", 0);
                    s.set_int_var("n", n + 1);
                })
                .jump_if("count", |s| s.int_var("n", 0) < 3)
                .narrate("done"),
        );
        let mut state = GameState::new(());

        runtime.step(0, None, &mut state).unwrap();
        runtime.step(0, None, &mut state).unwrap();
        assert_eq!(state.int_var("n", 0), 2);

        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(state.int_var("n", 0), 3);
        assert_eq!(events[1..], [said(None, "done"), RuntimeEvent::ScriptEnded]);
    }

    #[test]
    fn test_text_input_stores_variable() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .load_text("Your name?", "player")
                .wait_click(),
        );
        let mut state = GameState::new(());

        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(
            events,
            vec![RuntimeEvent::TextInputPrompt {
                prompt: "Your name?".to_string(),
                var_name: "player".to_string()
            }]
        );

        runtime.step(0, Some(InputEvent::text("Aoi")), &mut state).unwrap();
        assert_eq!(state.text_var("player", ""), "Aoi");
        assert_eq!(runtime.status(), &ExecutionStatus::WaitingClick);
    }

    #[test]
    fn test_invalid_inputs_are_errors() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .menu(vec![
                    ChoiceOption::new("a", "A", "end"),
                    ChoiceOption::new("b", "B", "end"),
                ])
                .label("end"),
        );
        let mut state = GameState::new(());
        runtime.step(0, None, &mut state).unwrap();

        assert_eq!(
            runtime.step(0, Some(InputEvent::choice(2)), &mut state),
            Err(RuntimeError::InvalidChoiceIndex { index: 2, max: 2 })
        );
        assert_eq!(
            runtime.step(0, Some(InputEvent::text("x")), &mut state),
            Err(RuntimeError::StateMismatch {
                expected: "WaitingTextInput".to_string(),
                actual: "WaitingChoice".to_string()
            })
        );
        // 出错后状态不变
        assert!(matches!(runtime.status(), ExecutionStatus::WaitingChoice { .. }));

        let events = runtime.step(0, Some(InputEvent::choice(1)), &mut state).unwrap();
        assert_eq!(events, vec![RuntimeEvent::ScriptEnded]);
    }

    #[test]
    fn test_blocking_sfx_until_finished() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .play_sfx("bell", true)
                .narrate("after bell"),
        );
        let mut state = GameState::new(());

        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(
            events,
            vec![RuntimeEvent::SfxPlayed {
                asset_id: "bell".to_string(),
                blocking: true
            }]
        );
        assert!(runtime.status().is_blocked());
        assert!(runtime.step(5000, Some(InputEvent::Click), &mut state).unwrap().is_empty());

        assert!(!runtime.sfx_finished("gong"));
        assert!(runtime.sfx_finished("bell"));

        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(
            events,
            vec![
                RuntimeEvent::SfxStopped,
                said(None, "after bell"),
                RuntimeEvent::ScriptEnded
            ]
        );
    }

    #[test]
    fn test_ungated_blocking_sfx_does_not_block() {
        let script = ScriptBuilder::<()>::new("test")
            .play_sfx("bell", true)
            .finalize()
            .unwrap();
        let config = EngineConfig {
            gate_blocking_sfx: false,
            ..EngineConfig::default()
        };
        let mut runtime = ScriptRuntime::with_config(Arc::new(script), &config);
        let events = runtime.step(0, None, &mut GameState::new(())).unwrap();
        assert_eq!(events.len(), 2);
        assert!(runtime.is_finished());
    }

    #[test]
    fn test_branching_and_hooks() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .run_code("visit", |s| s.set_flag("visited", true))
                .branch("yes", "no", |s| s.flag("visited"))
                .label("no")
                .narrate("not visited")
                .jump("end")
                .label("yes")
                .narrate("visited")
                .label("end"),
        );
        let mut state = GameState::new(());

        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(
            events,
            vec![
                RuntimeEvent::Noop,
                said(None, "visited"),
                RuntimeEvent::ScriptEnded
            ]
        );
        assert!(state.flag("visited"));
        assert_eq!(runtime.last_label(), Some("end"));
    }

    #[test]
    fn test_animation_requests_and_gallery() {
        let mut runtime = runtime(
            ScriptBuilder::<()>::new("test")
                .animate("miko", "alpha", 1.0, 300, Easing::EaseOut)
                .unlock_cg("cg_01")
                .unlock_cg("cg_01"),
        );
        let mut state = GameState::new(());

        let events = runtime.step(0, None, &mut state).unwrap();
        assert_eq!(events.iter().filter(|e| e.is_noop()).count(), 3);

        let requests = runtime.take_animation_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target_id, "miko");
        assert!(runtime.take_animation_requests().is_empty());
        assert_eq!(runtime.unlocked_gallery().len(), 1);
    }

    #[test]
    fn test_restore_at_label() {
        let script = Arc::new(
            ScriptBuilder::<()>::new("test")
                .narrate("intro")
                .label("chapter2")
                .narrate("chapter two")
                .finalize()
                .unwrap(),
        );
        let config = EngineConfig::default();

        let mut runtime =
            ScriptRuntime::restore_at_label(script.clone(), Some("chapter2"), BTreeSet::new(), &config)
                .unwrap();
        assert_eq!(runtime.ip(), 2);
        let events = runtime.step(0, None, &mut GameState::new(())).unwrap();
        assert_eq!(events[0], said(None, "chapter two"));

        let result =
            ScriptRuntime::restore_at_label(script, Some("missing"), BTreeSet::new(), &config);
        assert!(matches!(result, Err(SaveError::UnknownLabel { label }) if label == "missing"));
    }
}
