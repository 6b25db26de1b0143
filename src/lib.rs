use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::Instant;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, StatefulWidget, Tabs};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

pub mod chart_export;
pub mod config;
pub mod dataset;
pub mod filter;
pub mod logging;
pub mod query;
pub mod view_model;
pub mod widgets;

pub use chart_export::ChartExportFormat;
pub use config::{
    rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, Theme,
};
pub use dataset::{Dataset, LoadOptions};
pub use filter::{MallFilter, Selection, Subset, YearFilter};
pub use query::{MallsReport, SalesReport};
pub use shopdash_cli::Args;
pub use view_model::{MallsPage, SalesPage};

use widgets::cards::CardRow;
use widgets::chart::{ChartPanel, TablePanel};
use widgets::controls::Controls;
use widgets::debug::DebugState;
use widgets::filter_bar::{MallList, MallListState, YearSelector};

/// Application name used for config, cache and log paths
pub const APP_NAME: &str = "shopdash";

/// Dataset read when neither the command line nor the config names one
pub const DEFAULT_DATASET: &str = "customer_shopping_data.csv";

pub const BRAND: &str = "Customers Shopping Dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Sales,
    Malls,
}

impl Page {
    pub const ALL: [Self; 2] = [Self::Sales, Self::Malls];

    pub fn title(self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::Malls => "Shopping Malls",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Sales => Self::Malls,
            Self::Malls => Self::Sales,
        }
    }

    pub fn previous(self) -> Self {
        // Two pages: stepping back is the same as stepping forward
        self.next()
    }
}

impl From<shopdash_cli::PageArg> for Page {
    fn from(arg: shopdash_cli::PageArg) -> Self {
        match arg {
            shopdash_cli::PageArg::Sales => Self::Sales,
            shopdash_cli::PageArg::Malls => Self::Malls,
        }
    }
}

impl From<shopdash_cli::ExportFormatArg> for ChartExportFormat {
    fn from(arg: shopdash_cli::ExportFormatArg) -> Self {
        match arg {
            shopdash_cli::ExportFormatArg::Png => Self::Png,
            shopdash_cli::ExportFormatArg::Eps => Self::Eps,
        }
    }
}

impl LoadOptions {
    /// CLI delimiter overrides the configured one.
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> Self {
        let mut opts = LoadOptions::new();
        if let Some(delimiter) = args.delimiter.or(config.data.delimiter) {
            opts = opts.with_delimiter(delimiter);
        }
        opts
    }
}

/// Resolved output settings for chart export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub directory: PathBuf,
    pub format: ChartExportFormat,
    pub size: (u32, u32),
}

impl ExportSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            directory: config.export.directory.clone(),
            format: config.export_format()?,
            size: (config.export.width, config.export.height),
        })
    }
}

pub enum AppEvent {
    Key(KeyEvent),
    Open(PathBuf, LoadOptions),
    SelectYear(YearFilter),
    SelectMalls(MallFilter),
    Export,
    Exit,
    Crash(String),
    Resize(u16, u16),
}

/// Last message shown in the controls bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

pub struct App {
    events: Sender<AppEvent>,
    path: Option<PathBuf>,
    dataset: Option<Dataset>,
    page: Page,
    year: YearFilter,
    malls: MallFilter,
    mall_list: MallListState,
    sales_view: Option<SalesPage>,
    malls_view: Option<MallsPage>,
    status: Option<Status>,
    export: ExportSettings,
    debug: DebugState,
    theme: Theme,
}

impl App {
    pub fn new(events: Sender<AppEvent>) -> App {
        let config = AppConfig::default();
        let export = ExportSettings {
            directory: config.export.directory.clone(),
            format: ChartExportFormat::default(),
            size: (config.export.width, config.export.height),
        };
        Self::build(events, Theme::default(), &config, export)
    }

    /// App with a validated config; fails if the theme or export format is invalid.
    pub fn with_config(events: Sender<AppEvent>, config: &AppConfig) -> Result<App> {
        let theme = Theme::from_config(&config.theme)?;
        let export = ExportSettings::from_config(config)?;
        Ok(Self::build(events, theme, config, export))
    }

    fn build(
        events: Sender<AppEvent>,
        theme: Theme,
        config: &AppConfig,
        export: ExportSettings,
    ) -> App {
        let mut debug = DebugState {
            show_performance: config.debug.show_performance,
            show_filter: config.debug.show_filter,
            ..Default::default()
        };
        debug.enabled = config.debug.enabled;
        App {
            events,
            path: None,
            dataset: None,
            page: Page::default(),
            year: YearFilter::default(),
            malls: MallFilter::default(),
            mall_list: MallListState::default(),
            sales_view: None,
            malls_view: None,
            status: None,
            export,
            debug,
            theme,
        }
    }

    pub fn send_event(&mut self, event: AppEvent) -> Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    /// Filters and page applied once the dataset is open.
    pub fn with_initial_state(mut self, page: Page, year: YearFilter, malls: MallFilter) -> Self {
        self.page = page;
        self.year = year;
        self.malls = malls;
        self
    }

    pub fn set_export_format(&mut self, format: ChartExportFormat) {
        self.export.format = format;
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn year(&self) -> YearFilter {
        self.year
    }

    pub fn mall_filter(&self) -> &MallFilter {
        &self.malls
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn sales_view(&self) -> Option<&SalesPage> {
        self.sales_view.as_ref()
    }

    pub fn malls_view(&self) -> Option<&MallsPage> {
        self.malls_view.as_ref()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn mall_cursor(&self) -> Option<usize> {
        self.mall_list.cursor()
    }

    fn open(&mut self, path: &Path, options: &LoadOptions) -> Result<()> {
        let dataset = Dataset::load(path, options)?;
        self.path = Some(path.to_path_buf());
        self.mall_list.clamp(dataset.malls().len());
        self.dataset = Some(dataset);
        self.refresh_sales();
        self.refresh_malls();
        Ok(())
    }

    fn refresh_sales(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            return;
        };
        let start = Instant::now();
        match SalesReport::compute(dataset, self.year) {
            Ok(report) => {
                self.sales_view = Some(SalesPage::from_report(&report));
                self.debug.on_compute(self.year.describe(), start.elapsed());
            }
            Err(e) => {
                tracing::error!(error = %e, filter = %self.year.describe(), "sales report failed");
                self.status = Some(Status::Error(format!("Error: {}", e)));
            }
        }
    }

    fn refresh_malls(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            return;
        };
        let start = Instant::now();
        match MallsReport::compute(dataset, &self.malls) {
            Ok(report) => {
                self.malls_view = Some(MallsPage::from_report(&report));
                self.debug.on_compute(self.malls.describe(), start.elapsed());
            }
            Err(e) => {
                tracing::error!(error = %e, filter = %self.malls.describe(), "malls report failed");
                self.status = Some(Status::Error(format!("Error: {}", e)));
            }
        }
    }

    /// Writes the current page's charts using the export settings.
    pub fn export_current_page(&mut self) -> Result<Vec<PathBuf>> {
        let charts = match self.page {
            Page::Sales => self.sales_view.as_ref().map(|p| p.charts()),
            Page::Malls => self.malls_view.as_ref().map(|p| p.charts()),
        }
        .unwrap_or_default();
        chart_export::export_page(
            &self.export.directory,
            &charts,
            self.export.format,
            self.export.size,
        )
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        self.debug.on_key(event);

        match event.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(AppEvent::Exit),
            KeyCode::Tab => {
                self.page = self.page.next();
                self.debug.last_action = "next_page".to_string();
                return None;
            }
            KeyCode::BackTab => {
                self.page = self.page.previous();
                self.debug.last_action = "previous_page".to_string();
                return None;
            }
            KeyCode::Char('e') => return Some(AppEvent::Export),
            _ => {}
        }

        let dataset = self.dataset.as_ref()?;
        match (self.page, event.code) {
            (Page::Sales, KeyCode::Right) | (Page::Sales, KeyCode::Left) => {
                let forward = event.code == KeyCode::Right;
                self.debug.last_action = "select_year".to_string();
                Some(AppEvent::SelectYear(self.year.cycle(dataset.years(), forward)))
            }
            (Page::Malls, KeyCode::Down) | (Page::Malls, KeyCode::Char('j')) => {
                self.mall_list.next(dataset.malls().len());
                self.debug.last_action = "mall_down".to_string();
                None
            }
            (Page::Malls, KeyCode::Up) | (Page::Malls, KeyCode::Char('k')) => {
                self.mall_list.previous(dataset.malls().len());
                self.debug.last_action = "mall_up".to_string();
                None
            }
            (Page::Malls, KeyCode::Char(' ')) | (Page::Malls, KeyCode::Enter) => {
                let mall = dataset.malls().get(self.mall_list.cursor()?)?;
                self.debug.last_action = "toggle_mall".to_string();
                Some(AppEvent::SelectMalls(self.malls.toggled(mall)))
            }
            (Page::Malls, KeyCode::Char('c')) => {
                self.debug.last_action = "clear_malls".to_string();
                Some(AppEvent::SelectMalls(MallFilter::default()))
            }
            _ => None,
        }
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;

        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Open(path, options) => match self.open(path, options) {
                Ok(()) => None,
                Err(e) => Some(AppEvent::Crash(e.to_string())),
            },
            AppEvent::SelectYear(year) => {
                self.year = *year;
                self.status = None;
                self.refresh_sales();
                None
            }
            AppEvent::SelectMalls(malls) => {
                self.malls = malls.clone();
                self.status = None;
                self.refresh_malls();
                None
            }
            AppEvent::Export => {
                self.status = Some(match self.export_current_page() {
                    Ok(paths) => Status::Info(format!(
                        "Exported {} chart(s) to {}",
                        paths.len(),
                        self.export.directory.display()
                    )),
                    Err(e) => {
                        tracing::warn!(error = %e, "export failed");
                        Status::Error(format!("Export failed: {}", e))
                    }
                });
                None
            }
            AppEvent::Resize(_, _) | AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(BRAND.len() as u16 + 2),
                Constraint::Fill(1),
            ])
            .split(area);
        Paragraph::new(BRAND)
            .style(
                Style::default()
                    .fg(self.theme.get("primary"))
                    .add_modifier(Modifier::BOLD),
            )
            .render(layout[0], buf);

        let titles: Vec<Line> = Page::ALL.iter().map(|p| Line::from(p.title())).collect();
        let selected = Page::ALL.iter().position(|p| *p == self.page).unwrap_or(0);
        Tabs::new(titles)
            .select(selected)
            .style(Style::default().fg(self.theme.get("text_secondary")))
            .highlight_style(
                Style::default()
                    .fg(self.theme.get("tab_active"))
                    .add_modifier(Modifier::BOLD),
            )
            .render(layout[1], buf);
    }

    fn render_sales(&self, area: Rect, buf: &mut Buffer) {
        let (Some(dataset), Some(view)) = (self.dataset.as_ref(), self.sales_view.as_ref()) else {
            return;
        };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Fill(1),
                Constraint::Fill(1),
                Constraint::Fill(1),
            ])
            .split(area);

        YearSelector::new(self.year, dataset.years(), &self.theme).render(rows[0], buf);
        CardRow::new(&view.cards, &self.theme).render(rows[1], buf);
        ChartPanel::new(&view.timeline, &self.theme).render(rows[2], buf);

        let pairs = [(&view.gender, &view.category), (&view.payment, &view.malls)];
        for ((left, right), row) in pairs.into_iter().zip([rows[3], rows[4]]) {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(row);
            ChartPanel::new(left, &self.theme).render(cols[0], buf);
            ChartPanel::new(right, &self.theme).render(cols[1], buf);
        }
    }

    fn render_malls(&mut self, area: Rect, buf: &mut Buffer) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(30), Constraint::Fill(1)])
            .split(area);

        if let Some(dataset) = self.dataset.as_ref() {
            MallList::new(dataset.malls(), &self.malls, &self.theme).render(
                cols[0],
                buf,
                &mut self.mall_list,
            );
        }

        let Some(view) = self.malls_view.as_ref() else {
            return;
        };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Fill(1),
                Constraint::Fill(1),
            ])
            .split(cols[1]);
        CardRow::new(&view.cards, &self.theme).render(rows[0], buf);
        ChartPanel::new(&view.gender, &self.theme).render(rows[1], buf);
        TablePanel::new(&view.category_table, &self.theme).render(rows[2], buf);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let mut constraints = vec![
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ];
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_header(layout[0], buf);

        if self.dataset.is_none() {
            let message = match &self.path {
                Some(path) => format!("Loading {}", path.display()),
                None => "Loading dataset...".to_string(),
            };
            Paragraph::new(message).centered().render(layout[1], buf);
        } else {
            match self.page {
                Page::Sales => self.render_sales(layout[1], buf),
                Page::Malls => self.render_malls(layout[1], buf),
            }
        }

        let (status, error) = match &self.status {
            Some(Status::Info(msg)) => (Some(msg.as_str()), false),
            Some(Status::Error(msg)) => (Some(msg.as_str()), true),
            None => (None, false),
        };
        Controls::new(self.page)
            .with_status(status, error)
            .with_row_count(self.dataset.as_ref().map(|d| d.height()))
            .with_status_colors(self.theme.get("success"), self.theme.get("error"))
            .with_background(self.theme.get("controls_bg"))
            .render(layout[2], buf);

        if self.debug.enabled {
            (&self.debug).render(layout[3], buf);
        }
    }
}

/// Both page reports for one pair of filters, formatted for display.
pub fn build_pages(
    dataset: &Dataset,
    year: YearFilter,
    malls: &MallFilter,
) -> Result<(SalesPage, MallsPage)> {
    let sales = SalesReport::compute(dataset, year)?;
    let malls = MallsReport::compute(dataset, malls)?;
    Ok((SalesPage::from_report(&sales), MallsPage::from_report(&malls)))
}

/// Text rendering of every aggregate of both pages.
pub fn render_summary(dataset: &Dataset, year: YearFilter, malls: &MallFilter) -> Result<String> {
    let (sales, malls) = build_pages(dataset, year, malls)?;
    Ok(view_model::summary_text(&sales, &malls))
}

/// Writes every chart of both pages and returns the written paths.
pub fn export_dashboard(
    dataset: &Dataset,
    year: YearFilter,
    malls: &MallFilter,
    settings: &ExportSettings,
) -> Result<Vec<PathBuf>> {
    let (sales, malls) = build_pages(dataset, year, malls)?;
    let mut charts = sales.charts();
    charts.extend(malls.charts());
    chart_export::export_page(&settings.directory, &charts, settings.format, settings.size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use polars::prelude::*;
    use std::sync::mpsc::channel;

    fn dataset() -> Dataset {
        let raw = df!(
            "invoice_no" => ["I1", "I2", "I3"],
            "customer_id" => ["C1", "C2", "C3"],
            "gender" => ["Female", "Male", "Female"],
            "age" => [30_i64, 40, 50],
            "category" => ["Books", "Shoes", "Books"],
            "quantity" => [1_i64, 2, 3],
            "price" => [10.0_f64, 20.0, 30.0],
            "payment_method" => ["Cash", "Cash", "Credit Card"],
            "invoice_date" => ["01/01/2021", "01/02/2022", "01/03/2022"],
            "shopping_mall" => ["Kanyon", "Zorlu", "Kanyon"]
        )
        .unwrap();
        Dataset::from_frame(raw).unwrap()
    }

    fn app() -> App {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        app.dataset = Some(dataset());
        app.refresh_sales();
        app.refresh_malls();
        app
    }

    fn press(app: &mut App, code: KeyCode) -> Option<AppEvent> {
        app.event(&AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    #[test]
    fn tab_switches_pages() {
        let mut app = app();
        assert_eq!(app.page(), Page::Sales);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.page(), Page::Malls);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.page(), Page::Sales);
    }

    #[test]
    fn arrow_cycles_year_and_recomputes() {
        let mut app = app();
        let event = press(&mut app, KeyCode::Right).expect("select year");
        assert!(press(&mut app, KeyCode::Char('x')).is_none());
        app.event(&event);
        assert_eq!(app.year(), YearFilter::Year(2021));
        let view = app.sales_view().unwrap();
        assert_eq!(view.cards[0].value, "10");
        assert_eq!(view.timeline.title, "Total Sales Per Month via Year 2021");
    }

    #[test]
    fn space_toggles_mall_under_cursor() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.mall_cursor(), Some(1));
        let event = press(&mut app, KeyCode::Char(' ')).expect("toggle");
        app.event(&event);
        assert_eq!(app.mall_filter().malls(), &["Zorlu".to_string()]);
        assert_eq!(
            app.malls_view().unwrap().gender.title,
            "Counts of Gender per Zorlu"
        );

        let event = press(&mut app, KeyCode::Char('c')).expect("clear");
        app.event(&event);
        assert!(app.mall_filter().is_empty());
    }

    #[test]
    fn quit_keys_exit() {
        let mut app = app();
        assert!(matches!(press(&mut app, KeyCode::Char('q')), Some(AppEvent::Exit)));
        assert!(matches!(press(&mut app, KeyCode::Esc), Some(AppEvent::Exit)));
    }

    #[test]
    fn missing_file_crashes_on_open() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        let event = app.event(&AppEvent::Open(
            PathBuf::from("/nonexistent/shopdash.csv"),
            LoadOptions::new(),
        ));
        assert!(matches!(event, Some(AppEvent::Crash(_))));
    }

    #[test]
    fn renders_without_panicking() {
        let mut app = app();
        app.enable_debug();
        let area = Rect::new(0, 0, 120, 40);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        press(&mut app, KeyCode::Tab);
        (&mut app).render(area, &mut buf);
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains(BRAND));
    }
}
