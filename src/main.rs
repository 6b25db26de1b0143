use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::DefaultTerminal;
use shopdash::{
    logging, App, AppConfig, AppEvent, Args, ChartExportFormat, ConfigManager, Dataset,
    ExportSettings, LoadOptions, MallFilter, Page, YearFilter, APP_NAME, DEFAULT_DATASET,
};
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::time::Duration;

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

/// Initial filters from the command line.
fn initial_filters(args: &Args) -> (YearFilter, MallFilter) {
    let year = args.year.map(YearFilter::Year).unwrap_or_default();
    (year, MallFilter::new(args.mall.iter().cloned()))
}

fn dataset_path(args: &Args, config: &AppConfig) -> PathBuf {
    args.path
        .clone()
        .or_else(|| config.data.path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET))
}

fn export_settings(args: &Args, config: &AppConfig) -> Result<ExportSettings> {
    let mut settings = ExportSettings::from_config(config)?;
    if let Some(format) = args.export_format {
        settings.format = ChartExportFormat::from(format);
    }
    if let Some(dir) = &args.export {
        settings.directory = dir.clone();
    }
    Ok(settings)
}

fn run(mut terminal: DefaultTerminal, args: &Args, config: &AppConfig) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let (year, malls) = initial_filters(args);
    let page = args.page.map(Page::from).unwrap_or_default();
    let mut app = App::with_config(tx.clone(), config)?.with_initial_state(page, year, malls);
    app.set_export_format(export_settings(args, config)?.format);
    if args.debug {
        app.enable_debug();
    }

    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Open(
        dataset_path(args, config),
        LoadOptions::from_args_and_config(args, config),
    ))?;

    let poll_interval = Duration::from_millis(config.performance.event_poll_interval_ms);
    loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

/// `--summary` and `--export`: compute, print, exit without starting the TUI.
fn run_headless(args: &Args, config: &AppConfig) -> Result<()> {
    let path = dataset_path(args, config);
    let dataset = Dataset::load(&path, &LoadOptions::from_args_and_config(args, config))?;
    let (year, malls) = initial_filters(args);

    if args.summary {
        print!("{}", shopdash::render_summary(&dataset, year, &malls)?);
    }
    if args.export.is_some() {
        let settings = export_settings(args, config)?;
        for path in shopdash::export_dashboard(&dataset, year, &malls, &settings)? {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        match manager.write_default_config(args.force) {
            Ok(path) => {
                println!("Wrote default configuration to {}", path.display());
                return Ok(Some(()));
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;
    let config = AppConfig::load(APP_NAME)?;

    let log_path = logging::resolve_log_path(args.log_file.as_deref(), &config.logging)?;
    if let Err(e) = logging::init(&log_path, &config.logging, args.debug) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    if args.summary || args.export.is_some() {
        return run_headless(&args, &config);
    }

    let terminal = ratatui::init();
    let result = run(terminal, &args, &config);
    ratatui::restore();
    if let Err(e) = result {
        tracing::error!(error = %e, "shopdash exited with an error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
