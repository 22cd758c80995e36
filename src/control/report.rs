use std::fmt::{Display, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Normal,
    Warning,
    Good,
}

impl Level {
    pub fn suffix(self) -> &'static str {
        match self {
            Level::Normal => "",
            Level::Warning => "!",
            Level::Good => "+",
        }
    }

    pub fn warn_if(condition: bool) -> Self {
        if condition {
            Level::Warning
        } else {
            Level::Normal
        }
    }
}

pub const UNKNOWN: &str = "???";

#[derive(Debug, Default)]
pub struct ValueWriter {
    out: String,
}

impl ValueWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&mut self, name: &str, value: impl Display) {
        self.marked(name, value, Level::Normal);
    }

    pub fn marked(&mut self, name: &str, value: impl Display, level: Level) {
        // writing into a String cannot fail
        let _ = writeln!(self.out, "{}={}{}", name, value, level.suffix());
    }

    pub fn blank(&mut self, name: &str) {
        self.value(name, "");
    }

    pub fn unknown(&mut self, name: &str) {
        self.value(name, format_args!("{} !", UNKNOWN));
    }

    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

pub fn sexagesimal(hours: f64) -> String {
    let sign = if hours < 0.0 { "-" } else { "" };
    let total = (hours.abs() * 3600.0) as u64;
    format!("{}{}", sign, hms(total / 3600, (total / 60 % 60) as u32, (total % 60) as u32))
}

pub fn hms(hour: u64, minute: u32, second: u32) -> String {
    format!("{}:{:02}:{:02}", hour, minute, second)
}
