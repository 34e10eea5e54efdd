/// Search-as-you-type debouncer. The caller supplies the clock in
/// milliseconds so firing is deterministic.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay_ms: u64,
    pending: Option<(String, u64)>,
    last_fired: Option<String>,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Debouncer {
            delay_ms,
            pending: None,
            last_fired: None,
        }
    }

    /// Records a keystroke and returns when the text becomes due.
    pub fn input(&mut self, text: String, now_ms: u64) -> u64 {
        let due = now_ms.saturating_add(self.delay_ms);
        self.pending = Some((text, due));
        due
    }

    /// Returns the text to search for once the quiet period has passed.
    /// Text equal to the last fired value does not fire again.
    pub fn poll(&mut self, now_ms: u64) -> Option<String> {
        match &self.pending {
            Some((_, due)) if now_ms >= *due => {}
            _ => return None,
        }
        let (text, _) = self.pending.take()?;
        if self.last_fired.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.last_fired = Some(text.clone());
        Some(text)
    }

    pub fn due_at(&self) -> Option<u64> {
        self.pending.as_ref().map(|(_, due)| *due)
    }
}
