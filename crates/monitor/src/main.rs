//! Console routing-matrix monitor.
//!
//! Runs a view over an in-memory router defined in `monitor.toml` and
//! drives it from stdin. The matrix is printed to stdout whenever the view
//! repaints; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use bfc_engine::{MemoryRouter, ViewEvent, ViewHandle, open_view};
use bfc_model::{RouterId, RouterSummary};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

mod config;
mod console;

use config::MonitorConfig;
use console::{Command, HELP, parse_command, render, render_pending, render_routers};

/// Monitor command line arguments.
#[derive(Parser, Debug)]
#[command(name = "bfc-monitor")]
#[command(about = "Watch and edit a routing matrix from the console")]
struct Args {
	/// Configuration file (defaults to <config dir>/bfc/monitor.toml)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn log_level(args: &Args, config: &MonitorConfig) -> tracing::Level {
	if args.verbose {
		return tracing::Level::DEBUG;
	}
	config
		.log_level
		.as_deref()
		.and_then(|level| level.parse().ok())
		.unwrap_or(tracing::Level::INFO)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	let config = MonitorConfig::load(args.config.as_deref())?;

	let subscriber = tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_max_level(log_level(&args, &config))
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	info!(routers = config.routers.len(), "Starting bfc-monitor");

	let backend = MemoryRouter::new(config.definitions());
	let (events_tx, events) = mpsc::unbounded_channel();
	let view = open_view(Arc::new(backend.clone()), events_tx, config.engine);

	let mut monitor = Monitor {
		backend,
		view,
		routers: Vec::new(),
		active: None,
	};
	monitor.run(events).await;
	monitor.view.close().await;
	Ok(())
}

struct Monitor {
	backend: MemoryRouter,
	view: ViewHandle,
	routers: Vec<RouterSummary>,
	active: Option<RouterId>,
}

impl Monitor {
	async fn run(&mut self, mut events: mpsc::UnboundedReceiver<ViewEvent>) {
		let mut lines = BufReader::new(tokio::io::stdin()).lines();
		loop {
			tokio::select! {
				event = events.recv() => match event {
					Some(event) => self.on_event(event),
					None => break,
				},
				line = lines.next_line() => match line {
					Ok(Some(line)) => {
						if !self.on_line(&line).await {
							break;
						}
					}
					Ok(None) => break,
					Err(err) => {
						tracing::warn!(error = %err, "stdin read failed");
						break;
					}
				},
			}
		}
	}

	fn on_event(&mut self, event: ViewEvent) {
		match event {
			ViewEvent::Display(matrix) => {
				self.active = Some(matrix.router);
				let name = self
					.routers
					.iter()
					.find(|router| router.id == matrix.router)
					.map_or("", |router| router.display_name.as_str());
				println!("== router {} {name}", matrix.router);
				print!("{}", render(&matrix));
			}
			ViewEvent::Notice(notice) => eprintln!("! {notice}"),
			ViewEvent::Routers(routers) => {
				print!("{}", render_routers(&routers));
				self.routers = routers;
			}
		}
	}

	/// Handles one input line. Returns false to quit.
	async fn on_line(&mut self, line: &str) -> bool {
		let command = match parse_command(line) {
			Ok(Some(command)) => command,
			Ok(None) => return true,
			Err(err) => {
				eprintln!("{err}");
				return true;
			}
		};

		let result = match command {
			Command::Help => {
				println!("{HELP}");
				Ok(())
			}
			Command::Routers => {
				print!("{}", render_routers(&self.routers));
				Ok(())
			}
			Command::Select(router) => self.view.select_router(router),
			Command::Edit { destination, level, text } => self.view.edit(destination, level, text).await.map(|_| ()),
			Command::Withdraw(key) => self.view.withdraw(key),
			Command::Pending => self.view.pending().await.map(|pending| print!("{}", render_pending(&pending))),
			Command::Take => self.view.take().await.map(|issued| println!("submitted {issued} change(s)")),
			Command::Lock(selection) => self.view.toggle_lock_range(selection).await.map(|issued| println!("toggled {issued} lock(s)")),
			Command::Filter(needle) => self.view.set_filter(needle),
			Command::Inject(update) => {
				let Some(router) = self.active else {
					eprintln!("no router selected yet");
					return true;
				};
				if let Err(err) = self.backend.inject(router, update) {
					eprintln!("{err}");
				}
				Ok(())
			}
			Command::Quit => return false,
		};
		if let Err(err) = result {
			eprintln!("{err}");
		}
		true
	}
}
