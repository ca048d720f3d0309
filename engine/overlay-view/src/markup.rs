//! Serializes rendered units.
//!
//! Every token element carries `data-token-index`, which is how selection and
//! context-menu events are mapped back to tokens.

use std::fmt::{self, Write};

use overlay_protocol::MarkFlags;
use pulldown_cmark_escape::{escape_html, FmtWriter};

use crate::render::{RenderedToken, RenderedUnit, TokenSlot};

fn write_token_html<W: Write>(out: &mut W, token: &RenderedToken) -> fmt::Result {
    write!(out, "<span class=\"tok\" data-token-index=\"{}\">", token.index)?;

    if token.newline_count > 0 {
        for _ in 0..token.newline_count {
            out.write_str("<br/>")?;
        }
    } else {
        escape_html(FmtWriter(&mut *out), &token.text)?;
    }

    for mark in &token.marks {
        out.write_str("<span class=\"mark")?;
        if mark.flags.contains(MarkFlags::ROUNDED_START) {
            out.write_str(" rounded-start")?;
        }
        if mark.flags.contains(MarkFlags::ROUNDED_END) {
            out.write_str(" rounded-end")?;
        }
        write!(
            out,
            "\" data-span-key=\"{}\" style=\"top:{}%;height:{}%;background-color:",
            mark.key, mark.offset_percent, mark.height_percent,
        )?;
        escape_html(FmtWriter(&mut *out), &mark.color)?;
        out.write_str("\"></span>")?;

        if mark.shows_tag() {
            write!(out, "<span class=\"tag\" data-span-key=\"{}\" style=\"color:", mark.key)?;
            escape_html(FmtWriter(&mut *out), &mark.color)?;
            out.write_str("\">")?;
            escape_html(FmtWriter(&mut *out), &mark.label)?;
            out.write_str("</span>")?;
        }
    }

    out.write_str("</span>")?;
    if token.whitespace_after {
        out.write_char(' ')?;
    }
    Ok(())
}

/// Writes the HTML fragment of one unit into `out`.
pub fn write_html_to<W: Write>(out: &mut W, unit: &RenderedUnit) -> fmt::Result {
    write!(out, "<div class=\"unit\" data-unit-index=\"{}\">", unit.unit)?;
    for slot in &unit.slots {
        match slot {
            TokenSlot::Present(token) => write_token_html(out, token)?,
            TokenSlot::Missing { index } => {
                write!(out, "<span class=\"tok tok-missing\" data-token-index=\"{index}\">\u{fffd}</span>")?
            }
        }
    }
    out.write_str("</div>")
}

/// HTML fragment for one unit.
pub fn write_html(unit: &RenderedUnit) -> String {
    let mut out = String::new();
    // fmt::Write for String never fails.
    let _ = write_html_to(&mut out, unit);
    out
}

/// Writes the plain-text rendering of one unit into `out`.
pub fn write_plain_to<W: Write>(out: &mut W, unit: &RenderedUnit) -> fmt::Result {
    for slot in &unit.slots {
        match slot {
            TokenSlot::Present(token) => {
                for _ in token.marks.iter().filter(|m| m.shows_tag()) {
                    out.write_char('[')?;
                }
                out.write_str(&token.text)?;
                for mark in token.marks.iter().rev().filter(|m| m.ends_at(token.index)) {
                    write!(out, "]{{{}}}", mark.label)?;
                }
                if token.whitespace_after {
                    out.write_char(' ')?;
                }
            }
            TokenSlot::Missing { index } => write!(out, "<missing {index}>")?,
        }
    }
    Ok(())
}

/// Plain-text rendering: annotated runs are bracketed and labeled with their
/// code, e.g. `The [cat]{Animal} sat`.
pub fn write_plain(unit: &RenderedUnit) -> String {
    let mut out = String::new();
    let _ = write_plain_to(&mut out, unit);
    out
}
