//! # 阶段 1：块识别
//!
//! 将原始文本按行分组为块（单行指令、选择块）。
//! 空行与 `#` 注释行在这一阶段被丢弃。

/// 块类型（阶段 1 输出）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// 单行指令
    SingleLine { line: String, line_number: usize },
    /// 选择块：`choice:` 以及紧随其后的缩进 `- ` 条目
    Choice {
        /// 条目列表 (去掉 `-` 前缀后的内容, 行号)
        entries: Vec<(String, usize)>,
        start_line: usize,
    },
}

/// 是否为选择块开头（`choice:`，冒号后不带内容）
fn is_choice_header(trimmed: &str) -> bool {
    trimmed
        .strip_suffix(':')
        .is_some_and(|head| head.trim().eq_ignore_ascii_case("choice"))
}

/// 是否为选择条目：必须缩进且以 `-` 开头
fn as_choice_entry(raw: &str) -> Option<&str> {
    if !raw.starts_with([' ', '\t']) {
        return None;
    }
    raw.trim().strip_prefix('-').map(str::trim)
}

/// 识别文本中的块
pub fn recognize_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current_choice: Option<(Vec<(String, usize)>, usize)> = None;

    for (line_idx, raw) in text.lines().enumerate() {
        let line_number = line_idx + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some((entries, _)) = &mut current_choice {
            if let Some(entry) = as_choice_entry(raw) {
                entries.push((entry.to_string(), line_number));
                continue;
            }
            if let Some((entries, start_line)) = current_choice.take() {
                blocks.push(Block::Choice {
                    entries,
                    start_line,
                });
            }
        }

        if is_choice_header(trimmed) {
            current_choice = Some((Vec::new(), line_number));
            continue;
        }

        blocks.push(Block::SingleLine {
            line: trimmed.to_string(),
            line_number,
        });
    }

    // 处理末尾的选择块
    if let Some((entries, start_line)) = current_choice {
        blocks.push(Block::Choice {
            entries,
            start_line,
        });
    }

    blocks
}
