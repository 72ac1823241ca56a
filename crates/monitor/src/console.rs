//! Line commands and text rendering for the console monitor.

use std::fmt::Write as _;

use bfc_engine::{CellOverlay, CellSelection, DisplayMatrix, PendingChange};
use bfc_model::{CrosspointKey, CrosspointUpdate, DestinationId, LevelId, RouterId, RouterSummary, SourceId};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  routers                               list routers
  select <router>                       switch router
  edit <dest> <level> <source.level>    queue an edit
  withdraw <dest> <level>               drop a queued edit
  pending                               list queued edits
  take                                  commit queued edits
  lock <row> <level> [<row> <level>]    toggle locks over a row/level range
  filter [text]                         show destinations containing text
  inject <dest> <level> <src> <src-level> [locked]
                                        route from another panel
  quit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Help,
	Routers,
	Select(RouterId),
	Edit {
		destination: DestinationId,
		level: LevelId,
		text: String,
	},
	Withdraw(CrosspointKey),
	Pending,
	Take,
	Lock(CellSelection),
	Filter(String),
	Inject(CrosspointUpdate),
	Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("unknown command {0:?}, try `help`")]
	Unknown(String),
	#[error("usage: {0}")]
	Usage(&'static str),
}

fn number<T: From<u32>>(word: Option<&str>, usage: &'static str) -> Result<T, ParseError> {
	word.and_then(|word| word.parse::<u32>().ok()).map(T::from).ok_or(ParseError::Usage(usage))
}

fn row(word: Option<&str>, usage: &'static str) -> Result<usize, ParseError> {
	word.and_then(|word| word.parse().ok()).ok_or(ParseError::Usage(usage))
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
	let line = line.trim();
	let Some(verb) = line.split_whitespace().next() else {
		return Ok(None);
	};
	let rest = line[verb.len()..].trim_start();
	let mut words = rest.split_whitespace();

	let command = match verb {
		"help" | "?" => Command::Help,
		"routers" => Command::Routers,
		"select" => Command::Select(number(words.next(), "select <router>")?),
		"edit" => {
			const USAGE: &str = "edit <dest> <level> <source.level>";
			let mut parts = rest.splitn(3, char::is_whitespace);
			let destination = number(parts.next(), USAGE)?;
			let level = number(parts.next(), USAGE)?;
			let text = parts.next().map(str::trim).filter(|text| !text.is_empty()).ok_or(ParseError::Usage(USAGE))?;
			Command::Edit {
				destination,
				level,
				text: text.to_string(),
			}
		}
		"withdraw" => {
			const USAGE: &str = "withdraw <dest> <level>";
			Command::Withdraw(CrosspointKey::new(number(words.next(), USAGE)?, number(words.next(), USAGE)?))
		}
		"pending" => Command::Pending,
		"take" => Command::Take,
		"lock" => {
			const USAGE: &str = "lock <row> <level> [<row> <level>]";
			let from_row = row(words.next(), USAGE)?;
			let from_level: LevelId = number(words.next(), USAGE)?;
			let selection = match words.next() {
				None => CellSelection::cell(from_row, from_level),
				to_row => CellSelection::new(from_row, row(to_row, USAGE)?, from_level, number(words.next(), USAGE)?),
			};
			Command::Lock(selection)
		}
		"filter" => Command::Filter(rest.to_string()),
		"inject" => {
			const USAGE: &str = "inject <dest> <level> <src> <src-level> [locked]";
			let destination = number(words.next(), USAGE)?;
			let destination_level = number(words.next(), USAGE)?;
			let source: SourceId = number(words.next(), USAGE)?;
			let source_level = number(words.next(), USAGE)?;
			let locked = match words.next() {
				None => false,
				Some("locked") => true,
				Some(_) => return Err(ParseError::Usage(USAGE)),
			};
			Command::Inject(CrosspointUpdate {
				destination,
				destination_level,
				source,
				source_level,
				locked,
			})
		}
		"quit" | "exit" | "q" => Command::Quit,
		other => return Err(ParseError::Unknown(other.to_string())),
	};
	Ok(Some(command))
}

fn marker(overlay: CellOverlay) -> &'static str {
	match overlay {
		CellOverlay::Normal => "",
		CellOverlay::Queued => "*",
		CellOverlay::Locked => "!",
		CellOverlay::QueuedAndLocked => "*!",
	}
}

/// Renders the matrix as an aligned text table.
///
/// The first column is the display row used by `lock`. Queued cells are
/// suffixed `*`, locked cells `!`; cells the destination cannot carry show `-`.
pub fn render(matrix: &DisplayMatrix) -> String {
	let mut header = vec!["#".to_string()];
	header.extend(matrix.headers.iter().cloned());

	let mut table = vec![header];
	for (index, display_row) in matrix.rows.iter().enumerate() {
		let mut line = vec![index.to_string(), display_row.destination.to_string(), display_row.name.clone()];
		line.extend(display_row.cells.iter().map(|cell| {
			if !cell.editable && cell.text.is_empty() {
				"-".to_string()
			} else {
				format!("{}{}", cell.text, marker(cell.overlay))
			}
		}));
		table.push(line);
	}

	let columns = table.iter().map(Vec::len).max().unwrap_or_default();
	let widths: Vec<usize> = (0..columns)
		.map(|column| table.iter().filter_map(|line| line.get(column)).map(|cell| cell.chars().count()).max().unwrap_or_default())
		.collect();

	let mut out = String::new();
	for line in &table {
		let mut text = String::new();
		for (cell, width) in line.iter().zip(&widths) {
			let _ = write!(text, "{cell:<width$}  ");
		}
		out.push_str(text.trim_end());
		out.push('\n');
	}
	out
}

pub fn render_routers(routers: &[RouterSummary]) -> String {
	let mut out = String::new();
	for router in routers {
		let _ = writeln!(out, "{:>4}  {:<8}  {}", router.id, router.short_name, router.display_name);
	}
	out
}

pub fn render_pending(pending: &[PendingChange]) -> String {
	if pending.is_empty() {
		return "nothing pending\n".to_string();
	}
	let mut out = String::new();
	for change in pending {
		let _ = writeln!(out, "{} <- {}.{}", change.key, change.value.source, change.value.level);
	}
	out
}

#[cfg(test)]
mod tests {
	use bfc_engine::{DisplayCell, DisplayRow};
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn edit_keeps_the_rest_of_the_line_as_text() {
		assert_eq!(
			parse_command("edit 5 2 SourceX.L2"),
			Ok(Some(Command::Edit {
				destination: DestinationId(5),
				level: LevelId(2),
				text: "SourceX.L2".into(),
			}))
		);
		assert_eq!(
			parse_command("edit 5 2 Studio Cam.Video"),
			Ok(Some(Command::Edit {
				destination: DestinationId(5),
				level: LevelId(2),
				text: "Studio Cam.Video".into(),
			}))
		);
		assert!(matches!(parse_command("edit 5 2"), Err(ParseError::Usage(_))));
	}

	#[test]
	fn lock_accepts_a_cell_or_a_range() {
		assert_eq!(parse_command("lock 0 1"), Ok(Some(Command::Lock(CellSelection::cell(0, LevelId(1))))));
		assert_eq!(
			parse_command("lock 3 2 1 1"),
			Ok(Some(Command::Lock(CellSelection::new(3, 1, LevelId(2), LevelId(1)))))
		);
		assert!(parse_command("lock 3 2 1").is_err());
	}

	#[test]
	fn inject_parses_an_optional_lock_flag() {
		let Ok(Some(Command::Inject(update))) = parse_command("inject 1 1 3 1 locked") else {
			panic!("inject did not parse");
		};
		assert!(update.locked);
		assert_eq!(update.source, SourceId(3));
		assert!(parse_command("inject 1 1 3 1 maybe").is_err());
	}

	#[test]
	fn blank_and_unknown_lines() {
		assert_eq!(parse_command("   "), Ok(None));
		assert_eq!(parse_command("filter"), Ok(Some(Command::Filter(String::new()))));
		assert_eq!(parse_command("launch"), Err(ParseError::Unknown("launch".into())));
	}

	#[test]
	fn render_marks_queued_and_locked_cells() {
		let cell = |text: &str, overlay, editable| DisplayCell {
			text: text.into(),
			overlay,
			editable,
		};
		let matrix = DisplayMatrix {
			router: RouterId(1),
			headers: vec!["ID".into(), "Destination".into(), "SDI".into(), "AES".into()],
			rows: vec![
				DisplayRow {
					destination: DestinationId(1),
					name: "PGM".into(),
					cells: vec![cell("CAM1.SDI", CellOverlay::Queued, true), cell("MIC.AES", CellOverlay::QueuedAndLocked, true)],
				},
				DisplayRow {
					destination: DestinationId(3),
					name: "MON-A".into(),
					cells: vec![cell("VTR.SDI", CellOverlay::Locked, true), cell("", CellOverlay::Normal, false)],
				},
			],
		};

		assert_eq!(
			render(&matrix),
			"\
#  ID  Destination  SDI        AES
0  1   PGM          CAM1.SDI*  MIC.AES*!
1  3   MON-A        VTR.SDI!   -
"
		);
	}
}
