use clap::{CommandFactory, Parser, ValueEnum};
use std::path::PathBuf;

/// Dashboard page shown at startup
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PageArg {
    /// Sales overview filtered by year
    Sales,
    /// Shopping mall comparison filtered by mall
    Malls,
}

/// Output format for exported charts
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExportFormatArg {
    /// PNG bitmap (plotters)
    Png,
    /// Encapsulated PostScript
    Eps,
}

/// Command-line arguments for shopdash
#[derive(Parser, Debug)]
#[command(version, about = "Customers Shopping Dashboard in the Terminal")]
pub struct Args {
    /// Path to the transactions CSV (default: config [data] path, then customer_shopping_data.csv)
    pub path: Option<PathBuf>,

    /// Specify the delimiter to use when reading the CSV
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Initial year filter for the Sales page (default: all years)
    #[arg(long = "year", value_name = "YEAR")]
    pub year: Option<i32>,

    /// Initial mall selection for the Malls page (repeatable; default: all malls)
    #[arg(long = "mall", value_name = "NAME")]
    pub mall: Vec<String>,

    /// Page to show at startup
    #[arg(long = "page", value_enum)]
    pub page: Option<PageArg>,

    /// Write every chart of both pages to this directory and exit
    #[arg(long = "export", value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Format for --export and the in-app export key (default: config [export] format)
    #[arg(long = "export-format", value_enum)]
    pub export_format: Option<ExportFormatArg>,

    /// Print every aggregate of both pages as text and exit
    #[arg(long = "summary", action)]
    pub summary: bool,

    /// Generate default configuration file at ~/.config/shopdash/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,

    /// Write log output to this file (default: config [logging] file)
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    out.push_str(&cmd.render_usage().to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            format!("[{placeholder}]")
        } else {
            let op = arg
                .get_long()
                .map(|l| format!("--{l}"))
                .unwrap_or_default();
            if arg.get_action().takes_values() && !placeholder.is_empty() {
                format!("{op} {placeholder}")
            } else {
                op
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}
