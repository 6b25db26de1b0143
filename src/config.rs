use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use supports_color::Stream;
use tracing_subscriber::EnvFilter;

use crate::chart_export::ChartExportFormat;
use crate::view_model::{LATEST_YEAR_COLOR, MALL_SALES_COLOR};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the default configuration to `config.toml`
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version
    pub version: String,
    pub data: DataConfig,
    pub export: ExportConfig,
    pub performance: PerformanceConfig,
    pub theme: ThemeConfig,
    pub logging: LoggingConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DataConfig {
    /// Dataset path used when none is given on the command line
    pub path: Option<PathBuf>,
    pub delimiter: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: PathBuf,
    /// "png" or "eps"
    pub format: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub event_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "shopdash=debug"
    pub level: String,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub show_performance: bool,
    pub show_filter: bool,
}

/// Declares the theme colour table once; generates the struct, its defaults,
/// merge, validation and `Theme` construction.
macro_rules! color_config {
    ($($field:ident => $default:expr),* $(,)?) => {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(default)]
        pub struct ColorConfig {
            $(pub $field: String,)*
        }

        impl Default for ColorConfig {
            fn default() -> Self {
                Self {
                    $($field: $default.to_string(),)*
                }
            }
        }

        impl ColorConfig {
            fn validate(&self, parser: &ColorParser) -> Result<()> {
                $(
                    parser.parse(&self.$field).map_err(|e| {
                        eyre!("Invalid color value for '{}': {}", stringify!($field), e)
                    })?;
                )*
                Ok(())
            }

            pub fn merge(&mut self, other: Self) {
                let default = ColorConfig::default();
                $(
                    if other.$field != default.$field {
                        self.$field = other.$field;
                    }
                )*
            }

            fn parse_all(&self, parser: &ColorParser) -> Result<HashMap<String, Color>> {
                let mut colors = HashMap::new();
                $(
                    colors.insert(stringify!($field).to_string(), parser.parse(&self.$field)?);
                )*
                Ok(colors)
            }
        }
    };
}

color_config! {
    primary => "cyan",
    success => "green",
    error => "red",
    dimmed => "dark_gray",
    text_primary => "white",
    text_secondary => "dark_gray",
    text_inverse => "black",
    controls_bg => "indexed(236)",
    card_border => "cyan",
    card_value => "white",
    chart_bar => "#1879F4",
    chart_highlight => "#008B8B",
    table_header => "white",
    table_selected => "reversed",
    tab_active => "yellow",
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            data: DataConfig::default(),
            export: ExportConfig::default(),
            performance: PerformanceConfig::default(),
            theme: ThemeConfig::default(),
            logging: LoggingConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("charts"),
            format: "png".to_string(),
            width: 1024,
            height: 640,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            event_poll_interval_ms: 25,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            colors: ColorConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            show_performance: true,
            show_filter: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_with(&manager)
    }

    /// Load from the given config directory. A missing file yields defaults; a file
    /// that fails to parse or validate is an error.
    pub fn load_with(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        if let Some(user_config) = Self::load_user_config(manager)? {
            config.merge(user_config);
        }
        config.validate()?;
        Ok(config)
    }

    fn load_user_config(manager: &ConfigManager) -> Result<Option<AppConfig>> {
        let config_path = manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        let parsed = toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })?;
        Ok(Some(parsed))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.data.merge(other.data);
        self.export.merge(other.export);
        self.performance.merge(other.performance);
        self.theme.merge(other.theme);
        self.logging.merge(other.logging);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.performance.event_poll_interval_ms == 0 {
            return Err(eyre!("event_poll_interval_ms must be greater than 0"));
        }

        self.export_format()?;
        if self.export.width < 100 || self.export.height < 100 {
            return Err(eyre!(
                "export width and height must be at least 100 pixels (got {}x{})",
                self.export.width,
                self.export.height
            ));
        }

        EnvFilter::try_new(&self.logging.level).map_err(|e| {
            eyre!(
                "Invalid logging level '{}': {}",
                self.logging.level,
                e
            )
        })?;

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }

    pub fn export_format(&self) -> Result<ChartExportFormat> {
        ChartExportFormat::from_name(&self.export.format).ok_or_else(|| {
            eyre!(
                "Invalid export format: {}. Must be 'png' or 'eps'",
                self.export.format
            )
        })
    }
}

impl DataConfig {
    pub fn merge(&mut self, other: Self) {
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
    }
}

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ExportConfig::default();
        if other.directory != default.directory {
            self.directory = other.directory;
        }
        if other.format != default.format {
            self.format = other.format;
        }
        if other.width != default.width {
            self.width = other.width;
        }
        if other.height != default.height {
            self.height = other.height;
        }
    }
}

impl PerformanceConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PerformanceConfig::default();
        if other.event_poll_interval_ms != default.event_poll_interval_ms {
            self.event_poll_interval_ms = other.event_poll_interval_ms;
        }
    }
}

impl ThemeConfig {
    pub fn merge(&mut self, other: Self) {
        self.colors.merge(other.colors);
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LoggingConfig::default();
        if other.level != default.level {
            self.level = other.level;
        }
        if other.file.is_some() {
            self.file = other.file;
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DebugConfig::default();
        if other.enabled != default.enabled {
            self.enabled = other.enabled;
        }
        if other.show_performance != default.show_performance {
            self.show_performance = other.show_performance;
        }
        if other.show_filter != default.show_filter {
            self.show_filter = other.show_filter;
        }
    }
}

/// Color parser with terminal capability detection
#[derive(Debug, Clone)]
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parser for a terminal with known capabilities, ignoring `NO_COLOR`
    pub fn with_capabilities(supports_true_color: bool, supports_256: bool) -> Self {
        Self {
            supports_true_color,
            supports_256,
            no_color: false,
        }
    }

    /// Parse a color string (hex, `indexed(n)` or named) into a terminal color
    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }

        let trimmed = s.trim();

        if trimmed.starts_with('#') && trimmed.len() == 7 {
            let (r, g, b) = parse_hex(trimmed)?;
            return Ok(self.convert_rgb_to_terminal_color(r, g, b));
        }

        if trimmed.to_lowercase().starts_with("indexed(") && trimmed.ends_with(')') {
            let num = trimmed[8..trimmed.len() - 1].parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(Color::Indexed(num));
        }

        match trimmed.to_lowercase().as_str() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),

            "bright_red" | "bright red" => Ok(Color::Indexed(9)),
            "bright_green" | "bright green" => Ok(Color::Indexed(10)),
            "bright_yellow" | "bright yellow" => Ok(Color::Indexed(11)),
            "bright_blue" | "bright blue" => Ok(Color::Indexed(12)),
            "bright_cyan" | "bright cyan" => Ok(Color::Indexed(14)),

            "gray" | "grey" | "dark_gray" | "dark gray" | "dark_grey" | "dark grey" => {
                Ok(Color::Indexed(8))
            }
            "light_gray" | "light gray" | "light_grey" | "light grey" => Ok(Color::Indexed(7)),

            // Rendered as a modifier by the widgets
            "reset" | "reversed" => Ok(Color::Reset),

            _ => Err(eyre!(
                "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                 bright variants (bright_red, etc.), indexed(n) or hex colors (#ff0000)",
                trimmed
            )),
        }
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a hex color string (#ff0000) to RGB components
pub(crate) fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    if !s.starts_with('#') || s.len() != 7 {
        return Err(eyre!(
            "Invalid hex color format: '{}'. Expected format: #rrggbb",
            s
        ));
    }

    let component = |range: std::ops::Range<usize>, name: &str| {
        u8::from_str_radix(&s[range], 16)
            .map_err(|_| eyre!("Invalid {} component in hex color: {}", name, s))
    };

    Ok((
        component(1..3, "red")?,
        component(3..5, "green")?,
        component(5..7, "blue")?,
    ))
}

/// Nearest index in the xterm 256-color palette
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 10 {
        // Grayscale ramp (232-255)
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        if gray < 8 {
            return 16;
        } else if gray > 247 {
            return 231;
        } else {
            return 232 + ((gray - 8) * 24 / 240) as u8;
        }
    }

    // 6x6x6 color cube (16-231)
    let r_idx = (r as u16 * 5 / 255) as u8;
    let g_idx = (g as u16 * 5 / 255) as u8;
    let b_idx = (b as u16 * 5 / 255) as u8;

    16 + 36 * r_idx + 6 * g_idx + b_idx
}

/// Nearest of the 8 basic ANSI colors
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 30 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        return if avg < 64 { Color::Black } else { Color::White };
    }

    match (r > 128, g > 128, b > 128) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
    parser: ColorParser,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        Self::with_parser(config, ColorParser::new())
    }

    pub fn with_parser(config: &ThemeConfig, parser: ColorParser) -> Result<Self> {
        Ok(Self {
            colors: config.colors.parse_all(&parser)?,
            parser,
        })
    }

    /// Color by name, `Reset` if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    pub fn get_optional(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }

    /// Terminal color for a palette hex string used by the view models,
    /// downgraded to what the terminal supports
    pub fn hex(&self, hex: &str) -> Color {
        self.parser.parse(hex).unwrap_or(Color::Reset)
    }

    /// Bar color in the terminal. The sales bar and latest-year colors follow
    /// `chart_bar` and `chart_highlight`; the rest of the palette is used as is.
    pub fn chart(&self, hex: &str) -> Color {
        let key = if hex.eq_ignore_ascii_case(MALL_SALES_COLOR) {
            "chart_bar"
        } else if hex.eq_ignore_ascii_case(LATEST_YEAR_COLOR) {
            "chart_highlight"
        } else {
            return self.hex(hex);
        };
        self.get_optional(key).unwrap_or_else(|| self.hex(hex))
    }

    /// Highlight for the selected list row; `reversed` (parsed as `Reset`) inverts the row
    pub fn selected_style(&self) -> Style {
        match self.get("table_selected") {
            Color::Reset => Style::default().add_modifier(Modifier::REVERSED),
            color => Style::default().bg(color),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_config(&ThemeConfig::default()).unwrap_or_else(|_| Self {
            colors: HashMap::new(),
            parser: ColorParser::new(),
        })
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_parses_and_validates() {
        let parsed: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.version, "0.1");
    }

    #[test]
    fn hex_components() {
        assert_eq!(parse_hex("#1879F4").unwrap(), (0x18, 0x79, 0xF4));
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#zz0000").is_err());
    }

    #[test]
    fn palette_hex_follows_terminal_support() {
        let config = ThemeConfig::default();
        let true_color =
            Theme::with_parser(&config, ColorParser::with_capabilities(true, true)).unwrap();
        assert_eq!(true_color.hex("#FF0000"), Color::Rgb(255, 0, 0));

        let indexed =
            Theme::with_parser(&config, ColorParser::with_capabilities(false, true)).unwrap();
        assert_eq!(indexed.hex("#FF0000"), Color::Indexed(196));

        let basic =
            Theme::with_parser(&config, ColorParser::with_capabilities(false, false)).unwrap();
        assert_eq!(basic.hex("#00C8C8"), Color::Cyan);
    }

    #[test]
    fn chart_colors_follow_theme_keys() {
        let mut config = ThemeConfig::default();
        config.colors.chart_bar = "magenta".to_string();
        config.colors.chart_highlight = "indexed(30)".to_string();
        let theme =
            Theme::with_parser(&config, ColorParser::with_capabilities(true, true)).unwrap();

        assert_eq!(theme.chart(MALL_SALES_COLOR), Color::Magenta);
        assert_eq!(theme.chart(LATEST_YEAR_COLOR), Color::Indexed(30));
        assert_eq!(theme.chart("#2ED381"), Color::Rgb(0x2E, 0xD3, 0x81));
    }

    #[test]
    fn selected_row_style() {
        let parser = ColorParser::with_capabilities(true, true);
        let theme = Theme::with_parser(&ThemeConfig::default(), parser.clone()).unwrap();
        assert!(theme
            .selected_style()
            .add_modifier
            .contains(Modifier::REVERSED));

        let mut config = ThemeConfig::default();
        config.colors.table_selected = "blue".to_string();
        let theme = Theme::with_parser(&config, parser).unwrap();
        assert_eq!(theme.selected_style().bg, Some(Color::Blue));
    }

    #[test]
    fn color_cube_mapping() {
        assert_eq!(rgb_to_256_color(255, 0, 0), 196);
        assert_eq!(rgb_to_256_color(0, 0, 0), 16);
        assert_eq!(rgb_to_basic_ansi(0, 200, 200), Color::Cyan);
    }
}
