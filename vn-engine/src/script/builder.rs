//! # Builder 模块
//!
//! 增量编写指令序列，`finalize()` 时一次性解析所有标签引用。
//!
//! ## 两阶段构建
//!
//! ```text
//! 追加指令（跳转目标只记录名字） → finalize: 建立标签索引 → 解析跳转表
//! ```
//!
//! 标签可以先引用后定义（向前跳转）。

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::debug;

use super::instruction::{ChoiceOption, Instruction, JumpSlot, Script};
use crate::animation::Easing;
use crate::error::BuildError;
use crate::event::Position;
use crate::state::GameState;

/// 脚本构建器
///
/// # 使用示例
///
/// ```rust,ignore
/// let script = ScriptBuilder::<()>::new("shrine")
///     .label("start")
///     .say("Miko", "Welcome.")
///     .menu(vec![ChoiceOption::new("pray", "Pray", "pray")])
///     .label("pray")
///     .wait(500)
///     .jump("start")
///     .finalize()?;
/// ```
pub struct ScriptBuilder<U> {
    id: String,
    instructions: Vec<Instruction<U>>,
    source_map: Vec<Option<usize>>,
    current_line: Option<usize>,
}

impl<U> ScriptBuilder<U> {
    /// 创建构建器
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            instructions: Vec::new(),
            source_map: Vec::new(),
            current_line: None,
        }
    }

    /// 设置后续指令对应的源文件行号（文本前端使用）
    pub fn at_line(&mut self, line: usize) -> &mut Self {
        self.current_line = Some(line);
        self
    }

    /// 追加任意指令
    pub fn push(&mut self, instruction: Instruction<U>) -> &mut Self {
        self.instructions.push(instruction);
        self.source_map.push(self.current_line);
        self
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn label(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(Instruction::Label { name: name.into() })
    }

    pub fn jump(&mut self, target_label: impl Into<String>) -> &mut Self {
        self.push(Instruction::Jump {
            target_label: target_label.into(),
        })
    }

    /// 条件跳转：谓词为真时跳到 `target_label`，否则顺序执行
    pub fn jump_if<F>(&mut self, target_label: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&GameState<U>) -> bool + Send + Sync + 'static,
    {
        self.push(Instruction::JumpIf {
            target_label: target_label.into(),
            predicate: Arc::new(predicate),
        })
    }

    pub fn branch<F>(
        &mut self,
        then_label: impl Into<String>,
        else_label: impl Into<String>,
        predicate: F,
    ) -> &mut Self
    where
        F: Fn(&GameState<U>) -> bool + Send + Sync + 'static,
    {
        self.push(Instruction::Branch {
            then_label: then_label.into(),
            else_label: else_label.into(),
            predicate: Arc::new(predicate),
        })
    }

    pub fn wait(&mut self, ms: u64) -> &mut Self {
        self.push(Instruction::Wait { ms })
    }

    pub fn wait_click(&mut self) -> &mut Self {
        self.push(Instruction::WaitClick)
    }

    pub fn say(&mut self, speaker: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.push(Instruction::Say {
            speaker: speaker.into(),
            text: text.into(),
        })
    }

    pub fn narrate(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Instruction::Narrate { text: text.into() })
    }

    /// 切换背景
    pub fn scene(&mut self, id: impl Into<String>) -> &mut Self {
        self.push(Instruction::ShowBackground { id: id.into() })
    }

    pub fn show_figure(
        &mut self,
        id: impl Into<String>,
        position: Position,
        layer: i32,
        opacity: f32,
    ) -> &mut Self {
        self.push(Instruction::ShowFigure {
            id: id.into(),
            position,
            layer,
            opacity,
        })
    }

    pub fn hide_figure(&mut self, id: impl Into<String>) -> &mut Self {
        self.push(Instruction::HideFigure { id: id.into() })
    }

    pub fn play_music(&mut self, track: impl Into<String>, looping: bool) -> &mut Self {
        self.push(Instruction::PlayMusic {
            track: track.into(),
            looping,
        })
    }

    pub fn stop_music(&mut self) -> &mut Self {
        self.push(Instruction::StopMusic)
    }

    pub fn play_sfx(&mut self, track: impl Into<String>, blocking: bool) -> &mut Self {
        self.push(Instruction::PlaySfx {
            track: track.into(),
            blocking,
        })
    }

    /// 属性动画，从属性当前值开始
    pub fn animate(
        &mut self,
        target_id: impl Into<String>,
        property: impl Into<String>,
        to: f32,
        duration_ms: u64,
        easing: Easing,
    ) -> &mut Self {
        self.push(Instruction::Animate {
            target_id: target_id.into(),
            property: property.into(),
            from: None,
            to,
            duration_ms,
            easing,
        })
    }

    /// 属性动画，显式指定起始值
    pub fn animate_from(
        &mut self,
        target_id: impl Into<String>,
        property: impl Into<String>,
        from: f32,
        to: f32,
        duration_ms: u64,
        easing: Easing,
    ) -> &mut Self {
        self.push(Instruction::Animate {
            target_id: target_id.into(),
            property: property.into(),
            from: Some(from),
            to,
            duration_ms,
            easing,
        })
    }

    pub fn run_code<F>(&mut self, id: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&mut GameState<U>) + Send + Sync + 'static,
    {
        self.push(Instruction::RunCode {
            id: id.into(),
            hook: Arc::new(hook),
        })
    }

    /// 选择分支
    pub fn menu(&mut self, options: impl IntoIterator<Item = ChoiceOption>) -> &mut Self {
        self.push(Instruction::Choice {
            options: options.into_iter().collect(),
        })
    }

    /// 解锁 CG
    pub fn unlock_cg(&mut self, id: impl Into<String>) -> &mut Self {
        self.push(Instruction::UnlockGallery { id: id.into() })
    }

    /// 请求玩家输入文本，结果写入 `var_name`
    pub fn load_text(&mut self, prompt: impl Into<String>, var_name: impl Into<String>) -> &mut Self {
        self.push(Instruction::TextInput {
            prompt: prompt.into(),
            var_name: var_name.into(),
        })
    }

    /// 完成构建
    ///
    /// 1. 建立标签索引，重复定义返回 `DuplicateLabel`
    /// 2. 解析所有 Jump/JumpIf/Branch/Choice 目标，缺失返回 `LabelNotFound`
    ///
    /// 构建器被清空，可继续用于下一个脚本。
    pub fn finalize(&mut self) -> Result<Script<U>, BuildError> {
        let instructions = std::mem::take(&mut self.instructions);
        let source_map = std::mem::take(&mut self.source_map);
        self.current_line = None;

        let mut label_index = HashMap::new();
        for (index, instruction) in instructions.iter().enumerate() {
            if let Some(name) = instruction.as_label() {
                match label_index.entry(name.to_string()) {
                    Entry::Occupied(_) => {
                        return Err(BuildError::DuplicateLabel {
                            name: name.to_string(),
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(index);
                    }
                }
            }
        }

        let resolve = |name: &str| -> Result<usize, BuildError> {
            label_index
                .get(name)
                .copied()
                .ok_or_else(|| BuildError::LabelNotFound {
                    name: name.to_string(),
                })
        };

        let mut jumps = Vec::with_capacity(instructions.len());
        for instruction in &instructions {
            let slot = match instruction {
                Instruction::Jump { target_label } | Instruction::JumpIf { target_label, .. } => {
                    JumpSlot::Target(resolve(target_label)?)
                }
                Instruction::Branch {
                    then_label,
                    else_label,
                    ..
                } => JumpSlot::Branch {
                    then_index: resolve(then_label)?,
                    else_index: resolve(else_label)?,
                },
                Instruction::Choice { options } => JumpSlot::Choice(
                    options
                        .iter()
                        .map(|o| resolve(&o.target_label))
                        .collect::<Result<_, _>>()?,
                ),
                _ => JumpSlot::None,
            };
            jumps.push(slot);
        }

        debug!(
            script = %self.id,
            instructions = instructions.len(),
            labels = label_index.len(),
            "脚本构建完成"
        );

        Ok(Script::from_parts(
            self.id.clone(),
            instructions,
            label_index,
            jumps,
            source_map,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_backward_jumps_resolve() {
        let script = ScriptBuilder::<()>::new("test")
            .label("start")
            .jump("end")
            .say("Miko", "skipped")
            .label("end")
            .jump("start")
            .finalize()
            .unwrap();

        assert_eq!(script.len(), 5);
        assert_eq!(script.find_label("start"), Some(0));
        assert_eq!(script.find_label("end"), Some(3));
        assert_eq!(script.jump_slot(1), &JumpSlot::Target(3));
        assert_eq!(script.jump_slot(4), &JumpSlot::Target(0));
        assert_eq!(script.jump_slot(2), &JumpSlot::None);
    }

    #[test]
    fn test_duplicate_label() {
        let result = ScriptBuilder::<()>::new("test")
            .label("start")
            .narrate("hi")
            .label("start")
            .finalize();

        assert_eq!(
            result.unwrap_err(),
            BuildError::DuplicateLabel {
                name: "start".to_string()
            }
        );
    }

    #[test]
    fn test_missing_jump_target() {
        let result = ScriptBuilder::<()>::new("test").jump("nowhere").finalize();
        assert_eq!(
            result.unwrap_err(),
            BuildError::LabelNotFound {
                name: "nowhere".to_string()
            }
        );
    }

    #[test]
    fn test_missing_choice_and_branch_targets() {
        let result = ScriptBuilder::<()>::new("test")
            .label("a")
            .menu(vec![
                ChoiceOption::new("a", "A", "a"),
                ChoiceOption::new("b", "B", "b"),
            ])
            .finalize();
        assert!(matches!(result, Err(BuildError::LabelNotFound { name }) if name == "b"));

        let result = ScriptBuilder::<()>::new("test")
            .label("yes")
            .branch("yes", "no", |s| s.flag("x"))
            .finalize();
        assert!(matches!(result, Err(BuildError::LabelNotFound { name }) if name == "no"));
    }

    #[test]
    fn test_choice_and_branch_slots() {
        let script = ScriptBuilder::<()>::new("test")
            .menu(vec![
                ChoiceOption::new("left", "Left", "l"),
                ChoiceOption::new("right", "Right", "r"),
            ])
            .label("l")
            .branch("r", "l", |s| s.flag("x"))
            .label("r")
            .finalize()
            .unwrap();

        assert_eq!(script.jump_slot(0), &JumpSlot::Choice(vec![1, 3]));
        assert_eq!(
            script.jump_slot(2),
            &JumpSlot::Branch {
                then_index: 3,
                else_index: 1
            }
        );
    }

    #[test]
    fn test_source_lines_follow_at_line() {
        let mut builder = ScriptBuilder::<()>::new("test");
        builder.at_line(3).label("start");
        builder.at_line(5).narrate("hi");
        let script = builder.finalize().unwrap();

        assert_eq!(script.source_line(0), Some(3));
        assert_eq!(script.source_line(1), Some(5));
        assert_eq!(script.source_line(2), None);
    }

    #[test]
    fn test_builder_is_reusable_after_finalize() {
        let mut builder = ScriptBuilder::<()>::new("test");
        builder.narrate("one");
        let first = builder.finalize().unwrap();
        assert_eq!(first.len(), 1);
        assert!(builder.is_empty());
    }
}
