//! 書式付き文書の文字列表現
//!
//! 端末向けの ANSI 表現と、下線位置を `^` で示す注記表現を提供する。

use crate::document::{CharFormat, Color, Document};
use crossterm::style::{self, Attribute, ContentStyle, StyledContent};
use unicode_width::UnicodeWidthChar;

/// 下線位置を次の行に `^` で示す
///
/// 全角文字は表示幅ぶんの `^` で示す。下線のない行には注記行を付けない。
pub fn with_carets(document: &Document) -> String {
    let mut lines = Vec::with_capacity(document.block_count());
    for block in document.blocks() {
        lines.push(block.text());

        if block.formats().iter().any(CharFormat::is_underlined) {
            let mut carets = String::new();
            for (ch, format) in block.chars().iter().zip(block.formats()) {
                let width = ch.width().unwrap_or(0);
                let mark = if format.is_underlined() { '^' } else { ' ' };
                carets.extend(std::iter::repeat(mark).take(width));
            }
            lines.push(carets.trim_end().to_string());
        }
    }
    lines.join("\n")
}

/// 下線を ANSI エスケープで表現する
pub fn to_ansi(document: &Document) -> String {
    let mut lines = Vec::with_capacity(document.block_count());
    for block in document.blocks() {
        let mut line = String::new();
        let mut run = String::new();
        let mut run_format = CharFormat::default();

        for (&ch, &format) in block.chars().iter().zip(block.formats()) {
            if format != run_format && !run.is_empty() {
                push_run(&mut line, &run, run_format);
                run.clear();
            }
            run_format = format;
            run.push(ch);
        }
        if !run.is_empty() {
            push_run(&mut line, &run, run_format);
        }
        lines.push(line);
    }
    lines.join("\n")
}

fn push_run(line: &mut String, run: &str, format: CharFormat) {
    if !format.is_underlined() {
        line.push_str(run);
        return;
    }

    let mut content_style = ContentStyle::new();
    content_style.attributes.set(Attribute::Underlined);
    content_style.underline_color = format.underline_color.map(terminal_color);
    line.push_str(&StyledContent::new(content_style, run).to_string());
}

fn terminal_color(color: Color) -> style::Color {
    style::Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}
