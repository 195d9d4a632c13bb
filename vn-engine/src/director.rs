//! # Director 模块
//!
//! 把脚本状态机与补间调度器组合成宿主每帧调用一次的 `tick`。
//!
//! ## 每帧流程
//!
//! ```text
//! tick(dt, input)
//!   ├─ 校验输入（不合法时直接返回错误，本帧不推进任何东西）
//!   ├─ 同步快进设置到 Runtime
//!   ├─ AnimationScheduler::update(dt)       -> 动画事件
//!   ├─ ScriptRuntime::step(dt, input)       -> 脚本事件（Blocked 时跳过）
//!   ├─ 记录历史
//!   └─ 本帧 Animate 指令产生的请求提交给调度器（下一帧开始推进）
//! ```
//!
//! 返回值中动画事件总在脚本事件之前。

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::animation::AnimationScheduler;
use crate::assets::{validate_script_assets, AssetLookup};
use crate::config::{EngineConfig, Settings};
use crate::error::{AssetError, RuntimeError, SaveError};
use crate::event::RuntimeEvent;
use crate::history::{History, HistoryEvent};
use crate::input::InputEvent;
use crate::runtime::ScriptRuntime;
use crate::save::{GameSnapshot, SaveData};
use crate::script::Script;
use crate::state::{ExecutionStatus, GameState, UserData};

/// 每帧驱动器
pub struct Director<U> {
    runtime: ScriptRuntime<U>,
    scheduler: AnimationScheduler,
    state: GameState<U>,
    settings: Settings,
    config: EngineConfig,
    history: History,
}

impl<U> Director<U> {
    /// 以默认设置和配置创建
    pub fn new(script: impl Into<Arc<Script<U>>>, user_data: U) -> Self {
        Self::with_config(
            script,
            user_data,
            Settings::default(),
            EngineConfig::default(),
        )
    }

    pub fn with_config(
        script: impl Into<Arc<Script<U>>>,
        user_data: U,
        settings: Settings,
        config: EngineConfig,
    ) -> Self {
        let runtime = ScriptRuntime::with_config(script.into(), &config);
        Self {
            runtime,
            scheduler: AnimationScheduler::new(),
            state: GameState::new(user_data),
            settings: settings.clamped(),
            history: History::with_capacity(config.history_capacity),
            config,
        }
    }

    /// 先校验脚本引用的资源，全部存在才创建
    pub fn with_validation(
        script: impl Into<Arc<Script<U>>>,
        user_data: U,
        lookup: &impl AssetLookup,
        settings: Settings,
        config: EngineConfig,
    ) -> Result<Self, AssetError> {
        let script = script.into();
        validate_script_assets(&script, lookup)?;
        Ok(Self::with_config(script, user_data, settings, config))
    }

    /// 推进一帧
    ///
    /// # 错误
    ///
    /// 输入与当前等待状态不匹配时返回 `RuntimeError`，此时调度器、
    /// 脚本位置和游戏状态都保持不变。
    pub fn tick(
        &mut self,
        dt_ms: u64,
        input: Option<InputEvent>,
    ) -> Result<Vec<RuntimeEvent>, RuntimeError> {
        if let Some(input) = &input {
            self.runtime.check_input(input)?;
        }

        self.runtime.set_skip_waits(self.settings.skip_mode);

        let mut events = self.scheduler.update(dt_ms);

        if self.runtime.status().is_blocked() {
            return Ok(events);
        }

        let input_record = self.input_history(input.as_ref());
        let script_events = self.runtime.step(dt_ms, input, &mut self.state)?;

        if let Some(record) = input_record {
            self.history.push(record);
        }
        for event in &script_events {
            if let RuntimeEvent::Said { speaker, text } = event {
                self.history
                    .push(HistoryEvent::dialogue(speaker.clone(), text.as_str()));
            }
        }

        for request in self.runtime.take_animation_requests() {
            debug!(target = %request.target_id, property = %request.property, "提交补间请求");
            self.scheduler.submit(request);
        }

        events.extend(script_events);
        Ok(events)
    }

    /// 输入对应的历史记录（选择文本要在 step 之前取，之后等待状态就没了）
    fn input_history(&self, input: Option<&InputEvent>) -> Option<HistoryEvent> {
        match (input?, self.runtime.status()) {
            (
                InputEvent::ChoiceSelected { index },
                ExecutionStatus::WaitingChoice { options },
            ) => Some(HistoryEvent::choice_made(
                options.iter().map(|o| o.text.clone()).collect(),
                *index,
            )),
            (
                InputEvent::TextSubmitted { text },
                ExecutionStatus::WaitingTextInput { var_name },
            ) => Some(HistoryEvent::text_submitted(var_name.as_str(), text.as_str())),
            _ => None,
        }
    }

    /// 外部通知：阻塞音效播放完毕，下一帧恢复执行并发出 `SfxStopped`
    pub fn sfx_finished(&mut self, track: &str) -> bool {
        self.runtime.sfx_finished(track)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// 替换设置（音量会被限制到合法范围）
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings.clamped();
    }

    /// 开关快进模式，下一次 tick 生效
    pub fn set_skip_mode(&mut self, skip: bool) {
        self.settings.skip_mode = skip;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState<U> {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn runtime(&self) -> &ScriptRuntime<U> {
        &self.runtime
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn status(&self) -> &ExecutionStatus {
        self.runtime.status()
    }

    pub fn unlocked_gallery(&self) -> &BTreeSet<String> {
        self.runtime.unlocked_gallery()
    }

    pub fn is_finished(&self) -> bool {
        self.runtime.is_finished()
    }
}

impl<U: UserData> Director<U> {
    /// 当前状态的快照
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            current_label: self.runtime.last_label().map(str::to_string),
            flags: self.state.flags().clone(),
            int_vars: self.state.int_vars().clone(),
            text_vars: self.state.text_vars().clone(),
            user_data: self.state.user_data().encode(),
            unlocked_gallery_ids: self.runtime.unlocked_gallery().clone(),
            settings: self.settings.clone(),
        }
    }

    /// 生成存档数据（时间戳由存储实现填写）
    pub fn save(&self, slot: u32) -> SaveData {
        let data = SaveData::new(slot, self.snapshot()).with_history(self.history.clone());
        info!(slot, label = ?data.snapshot.current_label, "生成存档");
        data
    }

    /// 从存档恢复
    ///
    /// 执行位置为存档标签的下一条指令，状态为 Running，调度器为空。
    pub fn restore(
        script: impl Into<Arc<Script<U>>>,
        data: &SaveData,
        config: EngineConfig,
    ) -> Result<Self, SaveError> {
        let snapshot = &data.snapshot;
        let state = GameState::from_parts(
            snapshot.flags.clone(),
            snapshot.int_vars.clone(),
            snapshot.text_vars.clone(),
            &snapshot.user_data,
        )?;
        let runtime = ScriptRuntime::restore_at_label(
            script.into(),
            snapshot.current_label.as_deref(),
            snapshot.unlocked_gallery_ids.clone(),
            &config,
        )?;

        let mut history = History::with_capacity(config.history_capacity);
        for event in data.history.events() {
            history.push(event.clone());
        }

        info!(slot = data.metadata.slot, label = ?snapshot.current_label, "读取存档");
        Ok(Self {
            runtime,
            scheduler: AnimationScheduler::new(),
            state,
            settings: snapshot.settings.clone().clamped(),
            config,
            history,
        })
    }
}
