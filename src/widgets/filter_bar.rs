//! Filter widgets: the year tabs of the Sales page and the mall checklist of the Malls page.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget, Tabs, Widget},
};

use crate::config::Theme;
use crate::filter::{MallFilter, YearFilter};

/// "All Years" followed by each year; the active filter is highlighted.
pub struct YearSelector<'a> {
    filter: YearFilter,
    years: &'a [i32],
    theme: &'a Theme,
}

impl<'a> YearSelector<'a> {
    pub fn new(filter: YearFilter, years: &'a [i32], theme: &'a Theme) -> Self {
        Self {
            filter,
            years,
            theme,
        }
    }

    fn options(&self) -> Vec<YearFilter> {
        std::iter::once(YearFilter::All)
            .chain(self.years.iter().map(|y| YearFilter::Year(*y)))
            .collect()
    }
}

impl Widget for YearSelector<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let options = self.options();
        let selected = options.iter().position(|o| *o == self.filter);
        let titles: Vec<Line> = options.iter().map(|o| Line::from(o.label())).collect();

        let mut tabs = Tabs::new(titles)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.get("card_border")))
                    .title(" Year "),
            )
            .style(Style::default().fg(self.theme.get("text_secondary")))
            .highlight_style(
                Style::default()
                    .fg(self.theme.get("tab_active"))
                    .add_modifier(Modifier::BOLD),
            );
        if let Some(idx) = selected {
            tabs = tabs.select(idx);
        }
        tabs.render(area, buf);
    }
}

/// Cursor over the mall checklist; wraps at both ends.
#[derive(Debug, Default)]
pub struct MallListState {
    pub list: ListState,
}

impl MallListState {
    pub fn cursor(&self) -> Option<usize> {
        self.list.selected()
    }

    pub fn next(&mut self, len: usize) {
        if len == 0 {
            self.list.select(None);
            return;
        }
        let next = match self.list.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list.select(Some(next));
    }

    pub fn previous(&mut self, len: usize) {
        if len == 0 {
            self.list.select(None);
            return;
        }
        let previous = match self.list.selected() {
            Some(i) if i > 0 && i < len => i - 1,
            _ => len - 1,
        };
        self.list.select(Some(previous));
    }

    /// Keeps the cursor on a valid row after the list changed.
    pub fn clamp(&mut self, len: usize) {
        match self.list.selected() {
            _ if len == 0 => self.list.select(None),
            Some(i) if i >= len => self.list.select(Some(len - 1)),
            None => self.list.select(Some(0)),
            _ => {}
        }
    }
}

/// Multi-select list of malls; an empty selection means every mall.
pub struct MallList<'a> {
    malls: &'a [String],
    selected: &'a MallFilter,
    theme: &'a Theme,
}

impl<'a> MallList<'a> {
    pub fn new(malls: &'a [String], selected: &'a MallFilter, theme: &'a Theme) -> Self {
        Self {
            malls,
            selected,
            theme,
        }
    }
}

impl StatefulWidget for MallList<'_> {
    type State = MallListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let items: Vec<ListItem> = self
            .malls
            .iter()
            .map(|mall| {
                let mark = if self.selected.contains(mall) { "[x]" } else { "[ ]" };
                ListItem::new(format!("{} {}", mark, mall))
            })
            .collect();

        let title = if self.selected.is_empty() {
            " Malls (all) ".to_string()
        } else {
            format!(" Malls ({}) ", self.selected.len())
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.get("card_border")))
                    .title(title),
            )
            .style(Style::default().fg(self.theme.get("text_primary")))
            .highlight_style(self.theme.selected_style());

        StatefulWidget::render(list, area, buf, &mut state.list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps() {
        let mut state = MallListState::default();
        state.next(3);
        assert_eq!(state.cursor(), Some(0));
        state.previous(3);
        assert_eq!(state.cursor(), Some(2));
        state.next(3);
        assert_eq!(state.cursor(), Some(0));
    }

    #[test]
    fn clamp_handles_shrinking_and_empty_lists() {
        let mut state = MallListState::default();
        state.list.select(Some(5));
        state.clamp(2);
        assert_eq!(state.cursor(), Some(1));
        state.clamp(0);
        assert_eq!(state.cursor(), None);
        state.clamp(4);
        assert_eq!(state.cursor(), Some(0));
    }
}
