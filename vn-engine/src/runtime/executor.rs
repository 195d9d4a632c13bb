//! # Executor 模块
//!
//! 执行单条指令，产生事件。
//!
//! ## 职责
//!
//! - 读取 Instruction
//! - 产生对应的 RuntimeEvent（控制流指令不产生事件）
//! - 决定是否需要等待、是否跳转
//! - 把动画请求、CG 解锁这类副作用交还给引擎

use crate::animation::AnimationRequest;
use crate::event::{ChoiceItem, RuntimeEvent};
use crate::script::instruction::{Instruction, JumpSlot, Script};
use crate::state::{ExecutionStatus, GameState, PendingChoice};

/// 需要由引擎落地的副作用
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// 排队一个补间请求
    Animate(AnimationRequest),
    /// 解锁 CG
    UnlockGallery(String),
}

/// 执行结果
#[derive(Debug, Default)]
pub struct ExecuteResult {
    /// 产生的事件
    pub event: Option<RuntimeEvent>,
    /// 等待状态（如果需要等待）
    pub waiting: Option<ExecutionStatus>,
    /// 跳转目标（如果需要跳转）
    pub jump_to: Option<usize>,
    /// 副作用
    pub effect: Option<SideEffect>,
}

impl ExecuteResult {
    /// 创建空结果
    fn empty() -> Self {
        Self::default()
    }

    /// 创建带事件的结果
    fn with_event(event: RuntimeEvent) -> Self {
        Self {
            event: Some(event),
            ..Self::default()
        }
    }

    /// 创建带等待的结果
    fn with_wait(event: RuntimeEvent, waiting: ExecutionStatus) -> Self {
        Self {
            event: Some(event),
            waiting: Some(waiting),
            ..Self::default()
        }
    }

    /// 创建跳转结果
    fn with_jump(jump_to: Option<usize>) -> Self {
        Self {
            jump_to,
            ..Self::default()
        }
    }

    /// 创建带副作用的结果（事件固定为 `Noop`）
    fn with_effect(effect: SideEffect) -> Self {
        Self {
            event: Some(RuntimeEvent::Noop),
            effect: Some(effect),
            ..Self::default()
        }
    }
}

/// 指令执行器
///
/// 负责将单条 Instruction 转换为事件与状态转换。
#[derive(Debug, Clone)]
pub struct Executor {
    /// 阻塞音效是否进入 `Blocked`
    gate_blocking_sfx: bool,
    /// 快进模式下计时等待不挂起
    skip_waits: bool,
}

impl Executor {
    /// 创建新的执行器
    pub fn new(gate_blocking_sfx: bool) -> Self {
        Self {
            gate_blocking_sfx,
            skip_waits: false,
        }
    }

    pub fn set_skip_waits(&mut self, skip: bool) {
        self.skip_waits = skip;
    }

    pub fn skip_waits(&self) -> bool {
        self.skip_waits
    }

    /// 执行单条指令
    ///
    /// # 返回
    ///
    /// `ExecuteResult` 包含：
    /// - `event`: 产生的事件
    /// - `waiting`: 如果需要等待，返回新的执行状态
    /// - `jump_to`: 如果需要跳转，返回目标位置
    /// - `effect`: 需要引擎落地的副作用
    pub fn execute<U>(
        &self,
        index: usize,
        instruction: &Instruction<U>,
        script: &Script<U>,
        state: &mut GameState<U>,
    ) -> ExecuteResult {
        match instruction {
            Instruction::ShowBackground { id } => {
                ExecuteResult::with_event(RuntimeEvent::BackgroundShown {
                    asset_id: id.clone(),
                })
            }

            Instruction::ShowFigure {
                id,
                position,
                layer,
                opacity,
            } => ExecuteResult::with_event(RuntimeEvent::FigureShown {
                asset_id: id.clone(),
                position: *position,
                layer: *layer,
                opacity: *opacity,
            }),

            Instruction::HideFigure { id } => ExecuteResult::with_event(RuntimeEvent::FigureHidden {
                asset_id: id.clone(),
            }),

            Instruction::PlayMusic { track, looping } => {
                ExecuteResult::with_event(RuntimeEvent::MusicPlayed {
                    asset_id: track.clone(),
                    looping: *looping,
                })
            }

            Instruction::StopMusic => ExecuteResult::with_event(RuntimeEvent::MusicStopped),

            Instruction::PlaySfx { track, blocking } => {
                let event = RuntimeEvent::SfxPlayed {
                    asset_id: track.clone(),
                    blocking: *blocking,
                };
                if *blocking && self.gate_blocking_sfx {
                    ExecuteResult::with_wait(
                        event,
                        ExecutionStatus::Blocked {
                            active_sfx: track.clone(),
                        },
                    )
                } else {
                    ExecuteResult::with_event(event)
                }
            }

            Instruction::Say { speaker, text } => ExecuteResult::with_event(RuntimeEvent::Said {
                speaker: Some(speaker.clone()),
                text: text.clone(),
            }),

            Instruction::Narrate { text } => ExecuteResult::with_event(RuntimeEvent::Said {
                speaker: None,
                text: text.clone(),
            }),

            Instruction::Choice { options } => {
                let targets = match script.jump_slot(index) {
                    JumpSlot::Choice(targets) => targets.as_slice(),
                    _ => &[],
                };
                let pending = options
                    .iter()
                    .zip(targets)
                    .map(|(option, &target)| PendingChoice {
                        id: option.id.clone(),
                        text: option.label_text.clone(),
                        target,
                    })
                    .collect();
                let items = options
                    .iter()
                    .map(|option| ChoiceItem {
                        id: option.id.clone(),
                        text: option.label_text.clone(),
                    })
                    .collect();

                ExecuteResult::with_wait(
                    RuntimeEvent::ChoicePrompt { options: items },
                    ExecutionStatus::WaitingChoice { options: pending },
                )
            }

            Instruction::TextInput { prompt, var_name } => ExecuteResult::with_wait(
                RuntimeEvent::TextInputPrompt {
                    prompt: prompt.clone(),
                    var_name: var_name.clone(),
                },
                ExecutionStatus::WaitingTextInput {
                    var_name: var_name.clone(),
                },
            ),

            Instruction::Label { .. } => {
                // 标签不产生事件，只是跳转目标
                ExecuteResult::empty()
            }

            Instruction::Jump { .. } => ExecuteResult::with_jump(Self::target(script, index)),

            Instruction::JumpIf { predicate, .. } => {
                if predicate(&*state) {
                    ExecuteResult::with_jump(Self::target(script, index))
                } else {
                    ExecuteResult::empty()
                }
            }

            Instruction::Branch { predicate, .. } => match script.jump_slot(index) {
                JumpSlot::Branch {
                    then_index,
                    else_index,
                } => {
                    let target = if predicate(&*state) {
                        *then_index
                    } else {
                        *else_index
                    };
                    ExecuteResult::with_jump(Some(target))
                }
                _ => ExecuteResult::empty(),
            },

            Instruction::Wait { ms } => {
                if self.skip_waits || *ms == 0 {
                    ExecuteResult::with_event(RuntimeEvent::WaitStarted { remaining_ms: 0 })
                } else {
                    ExecuteResult::with_wait(
                        RuntimeEvent::WaitStarted { remaining_ms: *ms },
                        ExecutionStatus::WaitingTimer { remaining_ms: *ms },
                    )
                }
            }

            Instruction::WaitClick => ExecuteResult::with_wait(
                RuntimeEvent::WaitForClickStarted,
                ExecutionStatus::WaitingClick,
            ),

            Instruction::Animate {
                target_id,
                property,
                from,
                to,
                duration_ms,
                easing,
            } => ExecuteResult::with_effect(SideEffect::Animate(AnimationRequest {
                target_id: target_id.clone(),
                property: property.clone(),
                from: *from,
                to: *to,
                duration_ms: *duration_ms,
                easing: *easing,
            })),

            Instruction::RunCode { hook, .. } => {
                hook(state);
                ExecuteResult::with_event(RuntimeEvent::Noop)
            }

            Instruction::UnlockGallery { id } => {
                ExecuteResult::with_effect(SideEffect::UnlockGallery(id.clone()))
            }
        }
    }

    fn target<U>(script: &Script<U>, index: usize) -> Option<usize> {
        match script.jump_slot(index) {
            JumpSlot::Target(target) => Some(*target),
            _ => None,
        }
    }
}
