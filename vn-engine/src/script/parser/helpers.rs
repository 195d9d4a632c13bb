//! # 辅助解析函数
//!
//! 手写的字符串解析辅助函数，无正则依赖。

use std::str::FromStr;

use crate::error::ParseError;

/// 拆分 `command: args` 行
///
/// 输入: `"say: Miko | Welcome."`
/// 输出: `Some(("say", "Miko | Welcome."))`
///
/// 没有冒号时整行视为无参数指令（如 `wait_click`）。
/// 指令名为空或包含空白时返回 None。
pub fn split_command(line: &str) -> Option<(String, &str)> {
    let (head, args) = match line.find(':') {
        Some(pos) => (&line[..pos], line[pos + 1..].trim()),
        None => (line, ""),
    };

    let command = head.trim();
    if command.is_empty() || command.chars().any(char::is_whitespace) {
        return None;
    }

    Some((command.to_ascii_lowercase(), args))
}

/// 按第一个 `|` 拆分为两段并去除两侧空白
///
/// 输入: `"Miko | Welcome."`
/// 输出: `Some(("Miko", "Welcome."))`
pub fn split_pipe(s: &str) -> Option<(&str, &str)> {
    let pos = s.find('|')?;
    Some((s[..pos].trim(), s[pos + 1..].trim()))
}

/// 拆分选择条目 `id / text / target`
///
/// 文本中间允许出现 `/`：第一段为 id，最后一段为目标，中间部分整体为显示文本。
pub fn split_choice_entry(s: &str) -> Option<(&str, &str, &str)> {
    let first = s.find('/')?;
    let last = s.rfind('/')?;
    if first == last {
        return None;
    }

    let id = s[..first].trim();
    let text = s[first + 1..last].trim();
    let target = s[last + 1..].trim();
    if id.is_empty() || text.is_empty() || target.is_empty() {
        return None;
    }
    Some((id, text, target))
}

/// 要求参数非空
pub fn require<'a>(
    value: Option<&'a str>,
    line: usize,
    command: &str,
    param: &str,
) -> Result<&'a str, ParseError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ParseError::MissingParameter {
            line,
            command: command.to_string(),
            param: param.to_string(),
        }),
    }
}

/// 解析数值参数
pub fn parse_number<T: FromStr>(value: &str, line: usize, param: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidParameter {
        line,
        param: param.to_string(),
        message: format!("无法解析数值 '{}'", value),
    })
}

/// 是否为合法的标签/变量名（非空，不含空白与 `|`）
pub fn is_valid_name(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c == '|')
}
