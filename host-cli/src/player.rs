//! # Player 模块
//!
//! 无界面的播放循环：以固定帧长驱动 [`Director`]，把每个事件作为一行 JSON 输出。
//!
//! ## 输入来源
//!
//! - 输入轨迹：按顺序消费的 `InputEvent` 列表，只在脚本等待输入时取下一条
//! - 自动推进：点击、选择第一项、提交默认文本
//!
//! 没有音频后端，阻塞音效在下一帧视为播放完毕。

use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info};
use vn_engine::{Director, ExecutionStatus, InputEvent, RuntimeEvent};

/// 输入来源
#[derive(Debug, Clone)]
pub enum InputSource {
    /// 预先录制的输入轨迹
    Trace(VecDeque<InputEvent>),
    /// 自动推进
    Auto { default_text: String },
}

impl InputSource {
    /// 从 JSON 文件加载输入轨迹
    ///
    /// ```json
    /// ["Click", { "ChoiceSelected": { "index": 1 } }, { "TextSubmitted": { "text": "Aoi" } }]
    /// ```
    pub fn from_trace_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取输入轨迹: {}", path.display()))?;
        let inputs: Vec<InputEvent> = serde_json::from_str(&content)
            .with_context(|| format!("无法解析输入轨迹: {}", path.display()))?;
        Ok(Self::Trace(inputs.into()))
    }

    /// 当前状态需要的输入
    fn next_for(&mut self, status: &ExecutionStatus) -> NextInput {
        let needs_input = matches!(
            status,
            ExecutionStatus::WaitingClick
                | ExecutionStatus::WaitingChoice { .. }
                | ExecutionStatus::WaitingTextInput { .. }
        );
        if !needs_input {
            return NextInput::Idle;
        }

        match self {
            Self::Trace(inputs) => inputs
                .pop_front()
                .map_or(NextInput::Exhausted, NextInput::Input),
            Self::Auto { default_text } => NextInput::Input(match status {
                ExecutionStatus::WaitingChoice { .. } => InputEvent::choice(0),
                ExecutionStatus::WaitingTextInput { .. } => InputEvent::text(default_text.clone()),
                _ => InputEvent::click(),
            }),
        }
    }
}

/// 本帧要交给 Director 的输入
#[derive(Debug, Clone, PartialEq)]
enum NextInput {
    /// 脚本没有在等待输入
    Idle,
    Input(InputEvent),
    /// 脚本在等待输入，但轨迹已耗尽
    Exhausted,
}

/// 播放结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 脚本执行完毕
    Finished,
    /// 输入轨迹已耗尽，脚本仍在等待输入
    InputExhausted,
    /// 达到最大帧数
    FrameLimit,
}

/// 播放结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOutcome {
    pub frames: u64,
    pub reason: StopReason,
}

/// 输出的一行
#[derive(Serialize)]
struct EventLine<'a> {
    frame: u64,
    event: &'a RuntimeEvent,
}

/// 无界面播放器
pub struct Player<W> {
    frame_ms: u64,
    max_frames: u64,
    out: W,
}

impl<W: Write> Player<W> {
    pub fn new(frame_ms: u64, max_frames: u64, out: W) -> Self {
        Self {
            frame_ms,
            max_frames,
            out,
        }
    }

    /// 驱动 Director 直到脚本结束、输入耗尽或达到帧数上限
    pub fn play<U>(
        &mut self,
        director: &mut Director<U>,
        inputs: &mut InputSource,
    ) -> anyhow::Result<PlayOutcome> {
        let mut frame = 0;

        while frame < self.max_frames {
            if director.is_finished() {
                return Ok(self.stop(frame, StopReason::Finished));
            }

            if let ExecutionStatus::Blocked { active_sfx } = director.status() {
                let track = active_sfx.clone();
                debug!(track = %track, "模拟阻塞音效播放完毕");
                director.sfx_finished(&track);
            }

            let input = match inputs.next_for(director.status()) {
                NextInput::Idle => None,
                NextInput::Input(input) => Some(input),
                NextInput::Exhausted => {
                    return Ok(self.stop(frame, StopReason::InputExhausted));
                }
            };

            let events = director
                .tick(self.frame_ms, input)
                .with_context(|| format!("第 {} 帧执行失败", frame))?;
            for event in &events {
                serde_json::to_writer(&mut self.out, &EventLine { frame, event })?;
                writeln!(self.out)?;
            }
            frame += 1;
        }

        let reason = if director.is_finished() {
            StopReason::Finished
        } else {
            StopReason::FrameLimit
        };
        Ok(self.stop(frame, reason))
    }

    fn stop(&self, frames: u64, reason: StopReason) -> PlayOutcome {
        info!(frames, reason = ?reason, "播放结束");
        PlayOutcome { frames, reason }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
