//! Settings commands read from stdin while the driver runs.

use spritewatch::{CaptureRegion, DrawSwitch, RegionHandle, ScreenBounds};
use std::io::BufRead;
use std::sync::mpsc::Sender;

#[derive(Debug, PartialEq)]
pub enum Command {
    Region {
        top: i64,
        left: i64,
        width: i64,
        height: i64,
    },
    Move {
        x_pct: u32,
        y_pct: u32,
    },
    Draw(bool),
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next().ok_or("empty command")?;
    let args: Vec<&str> = parts.collect();
    match (keyword, args.as_slice()) {
        ("region", [top, left, width, height]) => Ok(Command::Region {
            top: parse_num(top)?,
            left: parse_num(left)?,
            width: parse_num(width)?,
            height: parse_num(height)?,
        }),
        ("move", [x, y]) => Ok(Command::Move {
            x_pct: parse_num(x)?,
            y_pct: parse_num(y)?,
        }),
        ("draw", ["on"]) => Ok(Command::Draw(true)),
        ("draw", ["off"]) => Ok(Command::Draw(false)),
        ("quit", []) => Ok(Command::Quit),
        _ => Err(format!("unrecognized command {line:?} (expected: {USAGE})")),
    }
}

const USAGE: &str = "region T L W H | move X Y | draw on|off | quit";

fn parse_num<T: std::str::FromStr>(text: &str) -> Result<T, String> {
    text.parse()
        .map_err(|_| format!("{text:?} is not a valid number"))
}

/// Applies commands from `input` until it closes or `quit` is read.
pub fn run_control<R: BufRead>(
    input: R,
    region: RegionHandle,
    screen: ScreenBounds,
    draw: DrawSwitch,
    stop_tx: Sender<()>,
) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let result = parse_command(&line).and_then(|cmd| match cmd {
            Command::Region {
                top,
                left,
                width,
                height,
            } => CaptureRegion::new(top, left, width, height)
                .map_err(|err| err.to_string())
                .and_then(|next| apply_region(&region, screen, next)),
            Command::Move { x_pct, y_pct } => {
                let (top, left) = screen.offset_from_percent(x_pct, y_pct);
                apply_region(&region, screen, region.get().with_offset(top, left))
            }
            Command::Draw(enabled) => {
                draw.set(enabled);
                Ok(())
            }
            Command::Quit => {
                let _ = stop_tx.send(());
                Ok(())
            }
        });
        match result {
            Ok(()) => tracing::info!(command = line.trim(), "settings updated"),
            Err(err) => eprintln!("ignored: {err}"),
        }
        if line.trim() == "quit" {
            break;
        }
    }
}

fn apply_region(
    handle: &RegionHandle,
    screen: ScreenBounds,
    next: CaptureRegion,
) -> Result<(), String> {
    if !screen.contains(&next) {
        return Err(format!(
            "region {}x{}+{}+{} does not fit the {}x{} screen",
            next.width(),
            next.height(),
            next.left(),
            next.top(),
            screen.width,
            screen.height
        ));
    }
    handle.set(next).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{parse_command, Command};

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            parse_command("region 10 20 300 200"),
            Ok(Command::Region {
                top: 10,
                left: 20,
                width: 300,
                height: 200
            })
        );
        assert_eq!(
            parse_command("move 50 25"),
            Ok(Command::Move {
                x_pct: 50,
                y_pct: 25
            })
        );
        assert_eq!(parse_command("draw off"), Ok(Command::Draw(false)));
        assert_eq!(parse_command("  quit "), Ok(Command::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("region 1 2 3").is_err());
        assert!(parse_command("move left 3").is_err());
        assert!(parse_command("draw maybe").is_err());
        assert!(parse_command("").is_err());
    }
}
