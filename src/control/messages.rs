use std::fmt::Display;

#[derive(Debug, Default)]
pub struct MessageBoard {
    current: String,
}

impl MessageBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, message: impl Display) {
        self.current = message.to_string();
        if self.current.ends_with('!') {
            log::warn!("Operator: {}", self.current);
        } else {
            log::info!("Operator: {}", self.current);
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }
}
