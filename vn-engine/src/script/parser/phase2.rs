//! # 阶段 2：块解析
//!
//! 将块转换为 `ScriptBuilder` 调用。文本前端与手写构建走同一条路径，
//! 标签解析统一留到 `finalize()`。

use crate::animation::Easing;
use crate::error::ParseError;
use crate::event::Position;
use crate::script::builder::ScriptBuilder;
use crate::script::instruction::ChoiceOption;

use super::helpers::{
    is_valid_name, parse_number, require, split_choice_entry, split_command, split_pipe,
};
use super::phase1::Block;

/// 阶段 2 解析器
pub struct Phase2Parser {
    /// 解析警告（非致命错误）
    pub warnings: Vec<String>,
}

impl Phase2Parser {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// 解析单个块并追加到构建器
    pub fn parse_block<U>(
        &mut self,
        block: Block,
        builder: &mut ScriptBuilder<U>,
    ) -> Result<(), ParseError> {
        match block {
            Block::SingleLine { line, line_number } => {
                builder.at_line(line_number);
                self.parse_single_line(&line, line_number, builder)
            }
            Block::Choice {
                entries,
                start_line,
            } => {
                builder.at_line(start_line);
                self.parse_choice(&entries, start_line, builder)
            }
        }
    }

    /// 解析单行指令
    fn parse_single_line<U>(
        &mut self,
        line: &str,
        line_number: usize,
        builder: &mut ScriptBuilder<U>,
    ) -> Result<(), ParseError> {
        let (command, args) =
            split_command(line).ok_or_else(|| ParseError::MalformedLine {
                line: line_number,
                raw: line.to_string(),
            })?;

        match command.as_str() {
            "label" => {
                let name = self.parse_name(args, line_number, "label", "name")?;
                builder.label(name);
            }
            "jump" => {
                let target = self.parse_name(args, line_number, "jump", "target")?;
                builder.jump(target);
            }
            "say" => {
                let (speaker, text) = split_pipe(args).ok_or_else(|| {
                    ParseError::MissingParameter {
                        line: line_number,
                        command: "say".to_string(),
                        param: "text".to_string(),
                    }
                })?;
                let speaker = require(Some(speaker), line_number, "say", "speaker")?;
                let text = require(Some(text), line_number, "say", "text")?;
                builder.say(speaker, text);
            }
            "narrate" => {
                let text = require(Some(args), line_number, "narrate", "text")?;
                builder.narrate(text);
            }
            "scene" => {
                let id = self.parse_name(args, line_number, "scene", "id")?;
                builder.scene(id);
            }
            "show" => self.parse_show(args, line_number, builder)?,
            "hide" => {
                let id = self.parse_name(args, line_number, "hide", "id")?;
                builder.hide_figure(id);
            }
            "music" => self.parse_music(args, line_number, builder)?,
            "stop_music" => {
                self.ignore_args(args, line_number, "stop_music");
                builder.stop_music();
            }
            "sfx" => self.parse_sfx(args, line_number, builder)?,
            "wait" => {
                let ms = require(Some(args), line_number, "wait", "ms")?;
                builder.wait(parse_number(ms, line_number, "ms")?);
            }
            "wait_click" => {
                self.ignore_args(args, line_number, "wait_click");
                builder.wait_click();
            }
            "animate" => self.parse_animate(args, line_number, builder)?,
            "unlock_cg" => {
                let id = self.parse_name(args, line_number, "unlock_cg", "id")?;
                builder.unlock_cg(id);
            }
            "load_text" => {
                let (var_name, prompt) = split_pipe(args).ok_or_else(|| {
                    ParseError::MissingParameter {
                        line: line_number,
                        command: "load_text".to_string(),
                        param: "prompt".to_string(),
                    }
                })?;
                let var_name = require(Some(var_name), line_number, "load_text", "var")?;
                if !is_valid_name(var_name) {
                    return Err(ParseError::InvalidParameter {
                        line: line_number,
                        param: "var".to_string(),
                        message: format!("变量名不能包含空白，实际: '{}'", var_name),
                    });
                }
                let prompt = require(Some(prompt), line_number, "load_text", "prompt")?;
                builder.load_text(prompt, var_name);
            }
            // 选择条目必须写在 `choice:` 下方的缩进行里
            "choice" => {
                return Err(ParseError::MalformedLine {
                    line: line_number,
                    raw: line.to_string(),
                });
            }
            _ => {
                return Err(ParseError::UnknownCommand {
                    line: line_number,
                    command,
                });
            }
        }

        Ok(())
    }

    /// 单个名字参数（标签、资源 id）
    fn parse_name<'a>(
        &self,
        args: &'a str,
        line_number: usize,
        command: &str,
        param: &str,
    ) -> Result<&'a str, ParseError> {
        let name = require(Some(args), line_number, command, param)?;
        if !is_valid_name(name) {
            return Err(ParseError::InvalidParameter {
                line: line_number,
                param: param.to_string(),
                message: format!("'{}' 不能包含空白", name),
            });
        }
        Ok(name)
    }

    fn ignore_args(&mut self, args: &str, line_number: usize, command: &str) {
        if !args.is_empty() {
            self.warnings.push(format!(
                "第 {} 行：指令 '{}' 不接受参数，已忽略: {}",
                line_number, command, args
            ));
        }
    }

    fn warn_extra(&mut self, extra: &[&str], line_number: usize, command: &str) {
        if !extra.is_empty() {
            self.warnings.push(format!(
                "第 {} 行：指令 '{}' 的多余参数已忽略: {}",
                line_number,
                command,
                extra.join(" ")
            ));
        }
    }

    /// 解析 show 指令
    ///
    /// 语法: `show: id x y [layer] [opacity]`
    fn parse_show<U>(
        &mut self,
        args: &str,
        line_number: usize,
        builder: &mut ScriptBuilder<U>,
    ) -> Result<(), ParseError> {
        let parts: Vec<&str> = args.split_whitespace().collect();
        let id = require(parts.first().copied(), line_number, "show", "id")?;
        let x: f32 = parse_number(
            require(parts.get(1).copied(), line_number, "show", "x")?,
            line_number,
            "x",
        )?;
        let y: f32 = parse_number(
            require(parts.get(2).copied(), line_number, "show", "y")?,
            line_number,
            "y",
        )?;
        let layer: i32 = match parts.get(3) {
            Some(v) => parse_number(v, line_number, "layer")?,
            None => 0,
        };
        let opacity: f32 = match parts.get(4) {
            Some(v) => parse_number(v, line_number, "opacity")?,
            None => 1.0,
        };
        if !(0.0..=1.0).contains(&opacity) {
            return Err(ParseError::InvalidParameter {
                line: line_number,
                param: "opacity".to_string(),
                message: format!("必须在 0 到 1 之间，实际: {}", opacity),
            });
        }
        self.warn_extra(parts.get(5..).unwrap_or_default(), line_number, "show");

        builder.show_figure(id, Position::new(x, y), layer, opacity);
        Ok(())
    }

    /// 解析 music 指令
    ///
    /// 语法: `music: track [loop|once]`，默认循环
    fn parse_music<U>(
        &mut self,
        args: &str,
        line_number: usize,
        builder: &mut ScriptBuilder<U>,
    ) -> Result<(), ParseError> {
        let parts: Vec<&str> = args.split_whitespace().collect();
        let track = require(parts.first().copied(), line_number, "music", "track")?;
        let looping = match parts.get(1).map(|s| s.to_ascii_lowercase()) {
            None => true,
            Some(mode) if mode == "loop" => true,
            Some(mode) if mode == "once" => false,
            Some(mode) => {
                return Err(ParseError::InvalidParameter {
                    line: line_number,
                    param: "mode".to_string(),
                    message: format!("应为 'loop' 或 'once'，实际: '{}'", mode),
                });
            }
        };
        self.warn_extra(parts.get(2..).unwrap_or_default(), line_number, "music");

        builder.play_music(track, looping);
        Ok(())
    }

    /// 解析 sfx 指令
    ///
    /// 语法: `sfx: track [blocking]`
    fn parse_sfx<U>(
        &mut self,
        args: &str,
        line_number: usize,
        builder: &mut ScriptBuilder<U>,
    ) -> Result<(), ParseError> {
        let parts: Vec<&str> = args.split_whitespace().collect();
        let track = require(parts.first().copied(), line_number, "sfx", "track")?;
        let blocking = match parts.get(1) {
            None => false,
            Some(flag) if flag.eq_ignore_ascii_case("blocking") => true,
            Some(flag) => {
                return Err(ParseError::InvalidParameter {
                    line: line_number,
                    param: "blocking".to_string(),
                    message: format!("未知的音效选项 '{}'", flag),
                });
            }
        };
        self.warn_extra(parts.get(2..).unwrap_or_default(), line_number, "sfx");

        builder.play_sfx(track, blocking);
        Ok(())
    }

    /// 解析 animate 指令
    ///
    /// 语法: `animate: target property to duration_ms [easing]`
    fn parse_animate<U>(
        &mut self,
        args: &str,
        line_number: usize,
        builder: &mut ScriptBuilder<U>,
    ) -> Result<(), ParseError> {
        let parts: Vec<&str> = args.split_whitespace().collect();
        let target = require(parts.first().copied(), line_number, "animate", "target")?;
        let property = require(parts.get(1).copied(), line_number, "animate", "property")?;
        let to: f32 = parse_number(
            require(parts.get(2).copied(), line_number, "animate", "to")?,
            line_number,
            "to",
        )?;
        let duration_ms: u64 = parse_number(
            require(parts.get(3).copied(), line_number, "animate", "duration_ms")?,
            line_number,
            "duration_ms",
        )?;
        let easing = match parts.get(4) {
            Some(name) => name
                .parse::<Easing>()
                .map_err(|_| ParseError::InvalidParameter {
                    line: line_number,
                    param: "easing".to_string(),
                    message: format!("未知的缓动函数 '{}'", name),
                })?,
            None => Easing::default(),
        };
        self.warn_extra(parts.get(5..).unwrap_or_default(), line_number, "animate");

        builder.animate(target, property, to, duration_ms, easing);
        Ok(())
    }

    /// 解析选择块
    ///
    /// ```text
    /// choice:
    ///   - pray / Pray at the shrine / pray
    ///   - leave / Walk away / ending
    /// ```
    fn parse_choice<U>(
        &mut self,
        entries: &[(String, usize)],
        start_line: usize,
        builder: &mut ScriptBuilder<U>,
    ) -> Result<(), ParseError> {
        if entries.is_empty() {
            self.warnings
                .push(format!("第 {} 行：选择块没有任何选项", start_line));
        }

        let mut options = Vec::with_capacity(entries.len());
        for (entry, line_number) in entries {
            let (id, text, target) =
                split_choice_entry(entry).ok_or_else(|| ParseError::MalformedLine {
                    line: *line_number,
                    raw: format!("- {}", entry),
                })?;
            options.push(ChoiceOption::new(id, text, target));
        }

        builder.menu(options);
        Ok(())
    }
}

impl Default for Phase2Parser {
    fn default() -> Self {
        Self::new()
    }
}
