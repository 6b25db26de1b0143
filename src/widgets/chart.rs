//! Terminal rendering of chart views: bar charts via `BarChart`, the monthly line via `Chart`,
//! and the category-by-mall table.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
        Row, Table, Widget,
    },
};

use crate::config::Theme;
use crate::view_model::{
    format_si, ChartKind, ChartView, TableView, MALL_SALES_COLOR, NO_DATA,
};

pub struct ChartPanel<'a> {
    view: &'a ChartView,
    theme: &'a Theme,
}

impl<'a> ChartPanel<'a> {
    pub fn new(view: &'a ChartView, theme: &'a Theme) -> Self {
        Self { view, theme }
    }

    fn block(&self) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.get("card_border")))
            .title(Line::from(format!(" {} ", self.view.title)).alignment(Alignment::Center))
            .title_style(
                Style::default()
                    .fg(self.theme.get("primary"))
                    .add_modifier(Modifier::BOLD),
            )
    }

    fn bar_style(&self, series: usize, index: usize) -> Style {
        let hex = self
            .view
            .series
            .get(series)
            .and_then(|s| s.colors.get(index).or_else(|| s.colors.first()))
            .copied()
            .unwrap_or(MALL_SALES_COLOR);
        Style::default().fg(self.theme.chart(hex))
    }

    fn render_bars(&self, inner: Rect, buf: &mut Buffer) {
        let view = self.view;
        let horizontal = view.kind == ChartKind::HorizontalBar;
        let labels = view.value_labels(0);

        let bars: Vec<Bar> = view.series[0]
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                Bar::default()
                    .value(v.round().max(0.0) as u64)
                    .text_value(labels.get(i).cloned().unwrap_or_default())
                    .label(Line::from(
                        view.categories.get(i).cloned().unwrap_or_default(),
                    ))
                    .style(self.bar_style(0, i))
            })
            .collect();

        let n = bars.len().max(1) as u16;
        let mut chart = BarChart::default()
            .data(BarGroup::default().bars(&bars))
            .value_style(
                Style::default()
                    .fg(self.theme.get("text_inverse"))
                    .add_modifier(Modifier::BOLD),
            )
            .label_style(Style::default().fg(self.theme.get("text_primary")));

        chart = if horizontal {
            chart
                .direction(Direction::Horizontal)
                .bar_width(1)
                .bar_gap(if inner.height >= n * 2 { 1 } else { 0 })
        } else {
            let width = (inner.width.saturating_sub(n) / n).clamp(1, 16);
            chart.bar_width(width).bar_gap(1)
        };
        chart.render(inner, buf);
    }

    fn render_grouped(&self, inner: Rect, buf: &mut Buffer) {
        let view = self.view;
        let groups: Vec<Vec<Bar>> = view
            .categories
            .iter()
            .enumerate()
            .map(|(i, _)| {
                view.series
                    .iter()
                    .enumerate()
                    .map(|(si, s)| {
                        let v = s.values.get(i).copied().unwrap_or(0.0);
                        Bar::default()
                            .value(v.round().max(0.0) as u64)
                            .text_value(format_si(v, 3))
                            .style(self.bar_style(si, i))
                    })
                    .collect()
            })
            .collect();

        // One line reserved for the series legend
        let legend: Vec<Span> = view
            .series
            .iter()
            .enumerate()
            .flat_map(|(si, s)| {
                [
                    Span::styled("■ ", self.bar_style(si, 0)),
                    Span::raw(format!("{}  ", s.name)),
                ]
            })
            .collect();
        Paragraph::new(Line::from(legend)).render(Rect { height: 1, ..inner }, buf);
        let plot = Rect {
            y: inner.y + 1,
            height: inner.height.saturating_sub(1),
            ..inner
        };

        let series_count = view.series.len().max(1) as u16;
        let group_count = view.categories.len().max(1) as u16;
        let slots = group_count * series_count + group_count * 2;
        let width = (plot.width / slots.max(1)).clamp(1, 8);

        let mut chart = BarChart::default()
            .bar_width(width)
            .bar_gap(0)
            .group_gap(2)
            .label_style(Style::default().fg(self.theme.get("text_primary")))
            .value_style(Style::default().fg(self.theme.get("text_inverse")));
        for (category, bars) in view.categories.iter().zip(groups.iter()) {
            chart = chart.data(
                BarGroup::default()
                    .label(Line::from(category.clone()))
                    .bars(bars),
            );
        }
        chart.render(plot, buf);
    }

    fn render_line(&self, inner: Rect, buf: &mut Buffer) {
        let view = self.view;
        let points: Vec<(f64, f64)> = view.series[0]
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as f64, *v))
            .collect();
        let y_max = view.max_value().max(1.0) * 1.1;
        let x_max = (points.len() as f64 - 1.0).max(1.0);

        let label_style = Style::default().fg(self.theme.get("text_secondary"));
        let x_labels: Vec<Span> = view
            .categories
            .iter()
            .map(|c| Span::styled(c.clone(), label_style))
            .collect();
        let y_labels = vec![
            Span::styled("0", label_style),
            Span::styled(format_si(y_max / 2.0, 3), label_style),
            Span::styled(format_si(y_max, 3), label_style),
        ];

        let dataset = Dataset::default()
            .name(view.series[0].name.as_str())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(self.bar_style(0, 0))
            .data(&points);

        Chart::new(vec![dataset])
            .x_axis(
                Axis::default()
                    .title(view.x_label.as_str())
                    .bounds([0.0, x_max])
                    .style(label_style)
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .bounds([0.0, y_max])
                    .style(label_style)
                    .labels(y_labels),
            )
            .legend_position(None)
            .render(inner, buf);
    }
}

impl Widget for ChartPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = self.block();
        let inner = block.inner(area);
        block.render(area, buf);

        if self.view.is_empty() {
            Paragraph::new(NO_DATA)
                .style(Style::default().fg(self.theme.get("dimmed")))
                .centered()
                .render(inner, buf);
            return;
        }

        match self.view.kind {
            ChartKind::Line => self.render_line(inner, buf),
            ChartKind::GroupedBar => self.render_grouped(inner, buf),
            ChartKind::Bar | ChartKind::HorizontalBar | ChartKind::Share => {
                self.render_bars(inner, buf)
            }
        }
    }
}

pub struct TablePanel<'a> {
    view: &'a TableView,
    theme: &'a Theme,
}

impl<'a> TablePanel<'a> {
    pub fn new(view: &'a TableView, theme: &'a Theme) -> Self {
        Self { view, theme }
    }
}

impl Widget for TablePanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.get("card_border")))
            .title(Line::from(format!(" {} ", self.view.title)).alignment(Alignment::Center))
            .title_style(
                Style::default()
                    .fg(self.theme.get("primary"))
                    .add_modifier(Modifier::BOLD),
            );

        if self.view.rows.is_empty() {
            Paragraph::new(NO_DATA)
                .style(Style::default().fg(self.theme.get("dimmed")))
                .centered()
                .block(block)
                .render(area, buf);
            return;
        }

        let header = Row::new(
            self.view
                .headers
                .iter()
                .map(|h| Cell::from(*h))
                .collect::<Vec<_>>(),
        )
        .style(
            Style::default()
                .fg(self.theme.get("table_header"))
                .add_modifier(Modifier::BOLD),
        );
        let rows = self
            .view
            .rows
            .iter()
            .map(|r| Row::new(r.iter().map(|c| Cell::from(c.as_str())).collect::<Vec<_>>()));

        Table::new(
            rows,
            [
                Constraint::Fill(2),
                Constraint::Fill(2),
                Constraint::Length(10),
            ],
        )
        .header(header)
        .block(block)
        .style(Style::default().fg(self.theme.get("text_primary")))
        .render(area, buf);
    }
}
