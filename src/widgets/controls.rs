use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

use crate::Page;

const SALES_CONTROLS: &[(&str, &str)] = &[
    ("Tab", "Page"),
    ("←→", "Year"),
    ("e", "Export"),
    ("q", "Quit"),
];

const MALLS_CONTROLS: &[(&str, &str)] = &[
    ("Tab", "Page"),
    ("↑↓", "Move"),
    ("Space", "Toggle"),
    ("c", "Clear"),
    ("e", "Export"),
];

/// Bottom bar: key hints for the current page and a right-aligned status message.
pub struct Controls<'a> {
    pub page: Page,
    pub status: Option<&'a str>,
    pub row_count: Option<usize>,
    pub background: Color,
    pub error: bool,
    pub info_color: Color,
    pub error_color: Color,
}

impl<'a> Controls<'a> {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            status: None,
            row_count: None,
            background: Color::DarkGray,
            error: false,
            info_color: Color::White,
            error_color: Color::Red,
        }
    }

    pub fn with_status(mut self, status: Option<&'a str>, error: bool) -> Self {
        self.status = status;
        self.error = error;
        self
    }

    pub fn with_row_count(mut self, row_count: Option<usize>) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_status_colors(mut self, info: Color, error: Color) -> Self {
        self.info_color = info;
        self.error_color = error;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    fn controls(&self) -> Vec<(&'static str, &'static str)> {
        let page_controls = match self.page {
            Page::Sales => SALES_CONTROLS,
            Page::Malls => MALLS_CONTROLS,
        };
        let mut controls = page_controls.to_vec();
        if !controls.iter().any(|(key, _)| *key == "q") {
            controls.push(("q", "Quit"));
        }
        controls
    }
}

impl Widget for &Controls<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let controls = self.controls();
        let mut constraints = controls.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });
        constraints.push(Constraint::Fill(1));
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(15));
        }

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);
        let base_style = Style::default();

        for (i, (key, action)) in controls.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(base_style.bold())
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(base_style.bg(self.background))
                .render(layout[j + 1], buf);
        }

        let fill_idx = controls.len() * 2;
        let status_style = if self.error {
            base_style.bg(self.background).fg(self.error_color)
        } else {
            base_style.bg(self.background).fg(self.info_color)
        };
        Paragraph::new(self.status.unwrap_or(""))
            .style(status_style)
            .right_aligned()
            .render(layout[fill_idx], buf);

        if let Some(count) = self.row_count {
            Paragraph::new(format!("Rows: {}", count))
                .style(base_style.bg(self.background).fg(Color::White))
                .right_aligned()
                .render(layout[fill_idx + 1], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_specific_hints() {
        let sales = Controls::new(Page::Sales).controls();
        assert!(sales.contains(&("←→", "Year")));
        assert_eq!(sales.last(), Some(&("q", "Quit")));

        let malls = Controls::new(Page::Malls).controls();
        assert!(malls.contains(&("Space", "Toggle")));
        assert!(malls.contains(&("q", "Quit")));
    }

    #[test]
    fn status_uses_configured_colors() {
        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);
        Controls::new(Page::Sales)
            .with_status(Some("Export failed"), true)
            .with_status_colors(Color::Green, Color::Magenta)
            .render(area, &mut buf);
        let cell = &buf[(79, 0)];
        assert_eq!(cell.symbol(), "d");
        assert_eq!(cell.fg, Color::Magenta);
    }
}
