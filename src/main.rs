use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdfolio::catalog::CatalogState;
use pdfolio::controller::{PreviewController, PreviewSurface};
use pdfolio::error::Notice;
use pdfolio::render::Bitmap;
use pdfolio::session::{self, Session};
use pdfolio::zoom::ZoomDirection;

/// Folder-watching PDF previewer
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Folder to preview; defaults to the last-used one
    folder: Option<PathBuf>,

    /// Write rendered previews and thumbnails as PNGs into this directory
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Watcher debounce window in milliseconds
    #[arg(long, default_value_t = 200)]
    debounce_ms: u64,

    /// Verbosity of the log file
    #[arg(long, default_value = "debug")]
    log_level: LevelFilter,
}

/// Line-oriented stand-in for the GUI collaborators: prints catalog and
/// render events, optionally dumps bitmaps as PNG files.
struct ConsoleSurface {
    dump_dir: Option<PathBuf>,
}

impl ConsoleSurface {
    fn dump(&self, name: &str, bitmap: &Bitmap) {
        let Some(dir) = &self.dump_dir else {
            return;
        };
        let path = dir.join(name);
        match image::RgbImage::from_raw(bitmap.width, bitmap.height, bitmap.pixels.clone()) {
            Some(img) => {
                if let Err(err) = img.save(&path) {
                    error!("failed to write {}: {err}", path.display());
                } else {
                    println!("  wrote {}", path.display());
                }
            }
            None => error!("bitmap buffer mismatch for {name}"),
        }
    }
}

impl PreviewSurface for ConsoleSurface {
    fn catalog_changed(&mut self, state: &CatalogState) {
        println!("{} ({} documents)", state.folder.display(), state.documents.len());
        for (index, doc) in state.documents.iter().enumerate() {
            let marker = match &state.selected {
                Some(selected) if doc.matches_path(selected) => '>',
                _ => ' ',
            };
            println!("{marker} [{index}] {}", doc.display_name);
        }
    }

    fn preview_ready(&mut self, bitmap: Arc<Bitmap>) {
        println!("preview ready ({}x{})", bitmap.width, bitmap.height);
        self.dump("preview.png", &bitmap);
    }

    fn thumbnail_ready(&mut self, page_index: usize, bitmap: Arc<Bitmap>) {
        self.dump(&format!("thumb_{page_index:03}.png"), &bitmap);
    }

    fn selection_cleared(&mut self) {
        println!("selection cleared");
    }

    fn report(&mut self, notice: &Notice) {
        match &notice.path {
            Some(path) => eprintln!("[{:?}] {} ({})", notice.kind, notice.message, path.display()),
            None => eprintln!("[{:?}] {}", notice.kind, notice.message),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = session::resolve_log_path()?;
    WriteLogger::init(
        args.log_level,
        Config::default(),
        std::fs::File::create(&log_path)
            .with_context(|| format!("creating {}", log_path.display()))?,
    )?;
    info!("starting pdfolio");

    let mut session = Session::load_default();
    let folder = match args.folder.or_else(|| session.last_folder.clone()) {
        Some(folder) => folder,
        None => bail!("no folder given and no previous session; run: pdfolio <folder>"),
    };

    if let Some(dir) = &args.dump_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut surface = ConsoleSurface {
        dump_dir: args.dump_dir,
    };
    let mut controller =
        PreviewController::with_debounce(Duration::from_millis(args.debounce_ms));
    controller.set_folder(&folder, &mut surface);
    session.remember_folder(&folder);
    if !controller.watching() {
        println!("folder watch unavailable; use `refresh` to reload manually");
    }

    // Blocking stdin reads live on their own thread so the main loop can
    // keep pumping watcher signals and render results.
    let (line_tx, line_rx) = flume::unbounded::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    println!("commands: list select <n> page <n> rename <name> zoom +|- open refresh folder <path> quit");
    loop {
        controller.pump(&mut surface);

        let line = match line_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(line) => line,
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        };

        let mut parts = line.trim().splitn(2, ' ');
        let command = parts.next().unwrap_or_default();
        let argument = parts.next().map(str::trim).unwrap_or_default();

        match command {
            "" => {}
            "list" | "l" => {
                if let Some(state) = controller.catalog_state() {
                    surface.catalog_changed(&state);
                }
            }
            "select" | "s" => match parse_index(argument, &controller) {
                Some(path) => controller.select_document(&path, &mut surface),
                None => eprintln!("usage: select <index>"),
            },
            "page" | "p" => match argument.parse::<usize>() {
                Ok(page_index) => controller.show_page(page_index, &mut surface),
                Err(_) => eprintln!("usage: page <index>"),
            },
            "rename" | "r" => {
                if argument.is_empty() {
                    eprintln!("usage: rename <new base name>");
                } else if controller.rename_selected(argument, &mut surface).is_ok() {
                    println!("renamed");
                }
            }
            "zoom" => {
                let factor = match argument {
                    "+" => controller.apply_zoom_delta(ZoomDirection::In),
                    "-" => controller.apply_zoom_delta(ZoomDirection::Out),
                    _ => {
                        eprintln!("usage: zoom +|-");
                        continue;
                    }
                };
                println!("zoom {:.0}%", factor * 100.0);
            }
            "open" | "o" => controller.open_selected(&mut surface),
            "refresh" => controller.refresh(&mut surface),
            "folder" => {
                if argument.is_empty() {
                    eprintln!("usage: folder <path>");
                } else {
                    let folder = PathBuf::from(argument);
                    controller.set_folder(&folder, &mut surface);
                    session.remember_folder(&folder);
                }
            }
            "quit" | "q" => break,
            other => eprintln!("unknown command: {other}"),
        }
    }

    info!("shutting down pdfolio");
    Ok(())
}

fn parse_index(argument: &str, controller: &PreviewController) -> Option<PathBuf> {
    let index: usize = argument.parse().ok()?;
    let state = controller.catalog_state()?;
    state.documents.get(index).map(|doc| doc.path.clone())
}
