use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Paragraph, Widget},
};

#[derive(Default)]
pub struct DebugState {
    pub num_events: usize,
    pub num_frames: usize,
    pub num_key_events: usize,
    pub last_key_event_name: String,
    pub last_type_name: String,
    /// Last action taken (e.g. "select_year") for debugging key handling.
    pub last_action: String,
    /// Filter of the most recent recomputation.
    pub last_filter: String,
    /// Wall time of the most recent page recomputation.
    pub last_compute_ms: Option<u128>,
    pub enabled: bool,
    pub show_performance: bool,
    pub show_filter: bool,
}

impl DebugState {
    pub fn on_key(&mut self, event: &crossterm::event::KeyEvent) {
        self.num_key_events += 1;
        self.last_key_event_name = format!("{:?}", event.code);
        self.last_type_name = format!("{:?}", event.kind);
    }

    pub fn on_compute(&mut self, filter: String, elapsed: std::time::Duration) {
        self.last_filter = filter;
        self.last_compute_ms = Some(elapsed.as_millis());
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut text = format!(
            "events={} keys={} last_key={} kind={} last_action={} frames={}",
            self.num_events,
            self.num_key_events,
            self.last_key_event_name,
            self.last_type_name,
            self.last_action,
            self.num_frames,
        );
        if self.show_filter {
            text.push_str(&format!(" filter={}", self.last_filter));
        }
        if self.show_performance {
            match self.last_compute_ms {
                Some(ms) => text.push_str(&format!(" compute={}ms", ms)),
                None => text.push_str(" compute=-"),
            }
        }
        Paragraph::new(text).render(area, buf);
    }
}
