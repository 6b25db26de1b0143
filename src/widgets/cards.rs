use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Style, Stylize},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::config::Theme;
use crate::view_model::CardView;

/// A row of equally sized headline cards.
pub struct CardRow<'a> {
    cards: &'a [CardView],
    theme: &'a Theme,
}

impl<'a> CardRow<'a> {
    pub fn new(cards: &'a [CardView], theme: &'a Theme) -> Self {
        Self { cards, theme }
    }
}

impl Widget for CardRow<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.cards.is_empty() {
            return;
        }
        let constraints = vec![Constraint::Ratio(1, self.cards.len() as u32); self.cards.len()];
        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        for (card, slot) in self.cards.iter().zip(layout.iter()) {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.get("card_border")))
                .title(format!(" {} ", card.label))
                .title_style(Style::default().fg(self.theme.get("text_secondary")));
            Paragraph::new(card.value.as_str())
                .style(Style::default().fg(self.theme.get("card_value")).bold())
                .centered()
                .block(block)
                .render(*slot, buf);
        }
    }
}
