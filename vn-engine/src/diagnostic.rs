//! # 诊断模块
//!
//! 提供脚本静态检查和诊断 API，不依赖 IO 或引擎。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 检查的是构建完成的 [`Script`]，文本前端与 Builder 产出的脚本一视同仁

use std::collections::HashSet;
use std::fmt;

use crate::assets::{find_missing_assets, AssetLookup};
use crate::script::{Instruction, Script};

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 脚本 ID / 文件路径
    pub script_id: String,
    /// 行号（如果可定位，从 1 开始）
    pub line: Option<usize>,
    /// 诊断消息
    pub message: String,
    /// 诊断详情（可选，如原始行内容）
    pub detail: Option<String>,
}

impl Diagnostic {
    /// 创建错误诊断
    pub fn error(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            script_id: script_id.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建警告诊断
    pub fn warn(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warn,
            script_id: script_id.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建信息诊断
    pub fn info(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            script_id: script_id.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 设置行号（可能不存在，Builder 构建的脚本没有源码位置）
    fn at(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.script_id)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    /// 创建空结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加诊断
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .count()
    }

    /// 获取警告数量
    pub fn warn_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warn)
            .count()
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// 分析脚本，返回诊断结果
///
/// 检查项：
/// - 从未被跳转引用的标签（Info）
/// - 无条件 `Jump` 之后、下一个标签之前的不可达指令（Warn）
/// - 选项 id 重复（Warn）
/// - 没有任何选项的选择（Error）
/// - 向回跳转形成的循环中没有任何等待指令（Warn）
pub fn analyze_script<U>(script: &Script<U>) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let script_id = script.id.as_str();
    let instructions = script.instructions();

    let targeted: HashSet<&str> = instructions
        .iter()
        .flat_map(|instruction| instruction.jump_targets())
        .collect();

    let mut after_jump = false;
    for (index, instruction) in instructions.iter().enumerate() {
        let line = script.source_line(index);

        if let Some(name) = instruction.as_label() {
            after_jump = false;
            if !targeted.contains(name) {
                result.push(
                    Diagnostic::info(script_id, format!("标签 '{}' 没有被任何跳转引用", name))
                        .at(line),
                );
            }
            continue;
        }

        // 一段不可达区域只报告第一条
        if after_jump {
            result.push(
                Diagnostic::warn(script_id, "不可达的指令")
                    .at(line)
                    .with_detail(format!("{:?}", instruction)),
            );
            after_jump = false;
        }

        match instruction {
            Instruction::Jump { target_label } => {
                after_jump = true;
                if is_busy_loop(script, index, target_label) {
                    result.push(
                        Diagnostic::warn(
                            script_id,
                            format!("跳回 '{}' 的循环中没有等待指令", target_label),
                        )
                        .at(line),
                    );
                }
            }
            Instruction::Choice { options } if options.is_empty() => {
                result.push(Diagnostic::error(script_id, "选择没有任何选项").at(line));
            }
            Instruction::Choice { options } => {
                let mut seen = HashSet::new();
                for option in options {
                    if !seen.insert(option.id.as_str()) {
                        result.push(
                            Diagnostic::warn(script_id, format!("选项 id '{}' 重复", option.id))
                                .at(line),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    result
}

/// 无条件跳回 `target_label`，且 [标签, 跳转] 区间内没有会挂起的指令
fn is_busy_loop<U>(script: &Script<U>, jump_index: usize, target_label: &str) -> bool {
    match script.find_label(target_label) {
        Some(target) if target <= jump_index => !script.instructions()[target..=jump_index]
            .iter()
            .any(Instruction::causes_wait),
        _ => false,
    }
}

/// 检查脚本引用的资源是否存在，每个缺失资源一条 Error
pub fn analyze_assets<U>(script: &Script<U>, lookup: &impl AssetLookup) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    for reference in find_missing_assets(script, lookup) {
        result.push(
            Diagnostic::error(
                script.id.as_str(),
                format!("{}资源 '{}' 不存在", reference.resource_type, reference.id),
            )
            .at(script.source_line(reference.index)),
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetManifest;
    use crate::script::{parse_script, ChoiceOption, ScriptBuilder};

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error("test.vns", "测试错误")
            .at(Some(10))
            .with_detail("原始内容");

        let display = diag.to_string();
        assert_eq!(display, "[ERROR] test.vns:10: 测试错误\n  | 原始内容");
    }

    #[test]
    fn test_diagnostic_result() {
        let mut result = DiagnosticResult::new();
        result.push(Diagnostic::error("a", "err"));
        result.push(Diagnostic::warn("a", "warn"));
        result.push(Diagnostic::info("a", "info"));

        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warn_count(), 1);
        assert!(result.has_errors());

        let mut other = DiagnosticResult::new();
        other.push(Diagnostic::error("b", "err"));
        result.merge(other);
        assert_eq!(result.error_count(), 2);
    }

    #[test]
    fn test_clean_script() {
        let script = ScriptBuilder::<()>::new("clean")
            .label("start")
            .say("Miko", "hi")
            .wait_click()
            .jump("start")
            .finalize()
            .unwrap();
        assert!(analyze_script(&script).is_empty());
    }

    #[test]
    fn test_loop_without_wait_is_warned() {
        let text = "\
label: loop
say: Miko | ...
wait: 0
jump: loop
label: idle
jump: idle
";
        let script = parse_script::<()>("loops", text).unwrap();
        let result = analyze_script(&script);

        let lines: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warn)
            .map(|d| d.line)
            .collect();
        assert_eq!(lines, vec![Some(4), Some(6)]);
        assert!(result.diagnostics[0].message.contains("loop"));
    }

    #[test]
    fn test_loop_with_timer_is_clean() {
        let script = parse_script::<()>("loop", "label: loop
wait: 1000
jump: loop
").unwrap();
        assert!(analyze_script(&script).is_empty());
    }

    #[test]
    fn test_unused_label_is_info() {
        let script = ScriptBuilder::<()>::new("test")
            .label("start")
            .narrate("...")
            .finalize()
            .unwrap();

        let result = analyze_script(&script);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].level, DiagnosticLevel::Info);
        assert!(result.diagnostics[0].message.contains("start"));
        assert!(!result.has_errors());
    }

    #[test]
    fn test_unreachable_after_jump() {
        let text = "\
jump: end
say: Miko | 永远不会显示
narrate: 这句也不会
label: end
";
        let script = parse_script::<()>("unreachable", text).unwrap();
        let result = analyze_script(&script);

        assert_eq!(result.warn_count(), 1);
        let warn = &result.diagnostics[0];
        assert_eq!(warn.line, Some(2));
        assert!(warn.detail.as_deref().unwrap_or_default().contains("Say"));
    }

    #[test]
    fn test_empty_and_duplicate_choice() {
        let script = ScriptBuilder::<()>::new("test")
            .label("a")
            .menu(Vec::new())
            .menu([
                ChoiceOption::new("x", "一", "a"),
                ChoiceOption::new("x", "二", "a"),
            ])
            .finalize()
            .unwrap();

        let result = analyze_script(&script);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warn_count(), 1);
        assert_eq!(result.diagnostics[0].line, None);
    }

    #[test]
    fn test_analyze_assets() {
        let text = "\
scene: shrine_day
music: theme
";
        let script = parse_script::<()>("assets", text).unwrap();
        let manifest = AssetManifest::new().with_image("shrine_day");

        let result = analyze_assets(&script, &manifest);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.diagnostics[0].line, Some(2));
        assert!(result.diagnostics[0].message.contains("theme"));
    }
}
