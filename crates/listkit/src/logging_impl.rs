//! What interpreter log events may contain
//!
//! The interpreter emits `tracing` events at its seams:
//!
//! - **ERROR**: Fatal errors ending a run
//! - **WARN**: Policy warnings and other diagnostics
//! - **INFO**: Run lifecycle, listfiles and directories entered and left
//! - **DEBUG**: Dispatch, scope and policy push/pop, block replays
//! - **TRACE**: Expanded arguments, `-D` defines and environment entries
//!
//! Every value goes through [`LogConfig`] on its way into an event. Values
//! are written on one line and clipped. Listfile text is reduced to its
//! size unless asked for. Defines and environment entries whose names look
//! like credentials are masked.

use std::fmt::{self, Write as _};

/// Name fragments that mark a define or environment entry as secret.
const SECRET_MARKERS: &[&str] = &[
    "PASSWORD",
    "PASSWD",
    "SECRET",
    "TOKEN",
    "CREDENTIAL",
    "API_KEY",
    "PRIVATE_KEY",
    "AUTH",
];

/// Controls what values log events carry.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Longest value, in bytes of source text, before clipping (default: 160)
    pub max_value_len: usize,

    /// Log listfile text instead of its line and byte counts (default: false)
    pub listfile_text: bool,

    /// Mask the values of secret-looking names (default: true)
    pub mask_secrets: bool,

    /// Upper-case name fragments that make a name secret
    pub secret_markers: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_value_len: 160,
            listfile_text: false,
            mask_secrets: true,
            secret_markers: SECRET_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_value_len(mut self, len: usize) -> Self {
        self.max_value_len = len;
        self
    }

    /// Log whole listfiles when they are parsed.
    pub fn with_listfile_text(mut self) -> Self {
        self.listfile_text = true;
        self
    }

    /// Treat names containing `marker` as secret too.
    pub fn secret_marker(mut self, marker: &str) -> Self {
        self.secret_markers.push(marker.to_ascii_uppercase());
        self
    }

    /// Log secret-looking values in the clear. Debugging only.
    pub fn show_secrets(mut self) -> Self {
        self.mask_secrets = false;
        self
    }

    pub fn is_secret(&self, name: &str) -> bool {
        let upper = name.to_ascii_uppercase();
        self.mask_secrets && self.secret_markers.iter().any(|m| upper.contains(m.as_str()))
    }

    /// A named value (define or environment entry) for a log event.
    pub fn named_value<'a>(&self, name: &str, value: &'a str) -> LogValue<'a> {
        LogValue {
            text: (!self.is_secret(name)).then_some(value),
            max: self.max_value_len,
        }
    }

    /// Expanded command arguments for a log event.
    pub fn arguments<'a>(&self, args: &'a [String]) -> LogArgs<'a> {
        LogArgs {
            args,
            max: self.max_value_len,
        }
    }

    /// Listfile text for a log event.
    pub fn listfile<'a>(&self, text: &'a str) -> LogListfile<'a> {
        LogListfile {
            text,
            full: self.listfile_text,
            max: self.max_value_len,
        }
    }
}

/// Writes text on a single line within a byte budget.
struct OneLine<'f, 'o> {
    f: &'f mut fmt::Formatter<'o>,
    left: usize,
    cut: usize,
}

impl<'f, 'o> OneLine<'f, 'o> {
    fn new(f: &'f mut fmt::Formatter<'o>, max: usize) -> Self {
        Self { f, left: max, cut: 0 }
    }

    fn push(&mut self, text: &str) -> fmt::Result {
        if self.cut > 0 {
            self.cut += text.len();
            return Ok(());
        }
        for (i, c) in text.char_indices() {
            if c.len_utf8() > self.left {
                self.cut = text.len() - i;
                return Ok(());
            }
            self.left -= c.len_utf8();
            match c {
                '\n' => self.f.write_str("\\n")?,
                '\r' => self.f.write_str("\\r")?,
                '\t' => self.f.write_str("\\t")?,
                c if c.is_control() => {}
                c => self.f.write_char(c)?,
            }
        }
        Ok(())
    }

    fn finish(self) -> fmt::Result {
        if self.cut > 0 {
            write!(self.f, "...[{} more bytes]", self.cut)?;
        }
        Ok(())
    }
}

/// See [`LogConfig::named_value`].
pub struct LogValue<'a> {
    text: Option<&'a str>,
    max: usize,
}

impl fmt::Display for LogValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(text) = self.text else {
            return f.write_str("[masked]");
        };
        let mut line = OneLine::new(f, self.max);
        line.push(text)?;
        line.finish()
    }
}

/// See [`LogConfig::arguments`].
pub struct LogArgs<'a> {
    args: &'a [String],
    max: usize,
}

impl fmt::Display for LogArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = OneLine::new(f, self.max);
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                line.push(" ")?;
            }
            line.push(arg)?;
        }
        line.finish()
    }
}

/// See [`LogConfig::listfile`].
pub struct LogListfile<'a> {
    text: &'a str,
    full: bool,
    max: usize,
}

impl fmt::Display for LogListfile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.full {
            return write!(
                f,
                "[{} lines, {} bytes]",
                self.text.lines().count(),
                self.text.len()
            );
        }
        let mut line = OneLine::new(f, self.max);
        line.push(self.text)?;
        line.finish()
    }
}
