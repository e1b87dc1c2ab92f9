//! Line-based command console.
//!
//! One command per line on stdin:
//!
//! ```text
//! scan on | scan off
//! connect AA:BB:CC:DD:EE:FF
//! disconnect
//! left 0-100 | right 0-100
//! name <text>
//! color <r> <g> <b>
//! save
//! status
//! quit
//! ```

use bristlebot_app::controller::Command;
use bristlebot_domain::settings::Rgb;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Status,
    Quit,
    Empty,
}

/// Why a console line was not understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one line of console input.
///
/// # Errors
///
/// Returns [`ParseError`] for unknown verbs or malformed arguments.
pub fn parse_line(line: &str) -> Result<Input, ParseError> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb {
        "" => return Ok(Input::Empty),
        "status" => return Ok(Input::Status),
        "quit" | "exit" => return Ok(Input::Quit),
        "scan" => match rest {
            "on" | "" => Command::Scan(true),
            "off" => Command::Scan(false),
            _ => return Err(ParseError::Usage("scan on|off")),
        },
        "connect" => {
            let address = rest
                .parse()
                .map_err(|_| ParseError::Usage("connect AA:BB:CC:DD:EE:FF"))?;
            Command::Connect(address)
        }
        "disconnect" => Command::Disconnect,
        "left" => Command::SetLeftMotor(percent(rest, "left 0-100")?),
        "right" => Command::SetRightMotor(percent(rest, "right 0-100")?),
        "name" if !rest.is_empty() => Command::SetName(rest.to_owned()),
        "name" => return Err(ParseError::Usage("name <text>")),
        "color" => Command::SetColor(color(rest)?),
        "save" => Command::SaveAndDisconnect,
        other => return Err(ParseError::Unknown(other.to_owned())),
    };
    Ok(Input::Command(command))
}

fn percent(arg: &str, usage: &'static str) -> Result<i32, ParseError> {
    arg.parse().map_err(|_| ParseError::Usage(usage))
}

fn color(args: &str) -> Result<Rgb, ParseError> {
    const USAGE: &str = "color <r> <g> <b> (0-255 each)";
    let channels: Vec<u8> = args
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| ParseError::Usage(USAGE))?;
    match channels.as_slice() {
        [red, green, blue] => Ok(Rgb::new(*red, *green, *blue)),
        _ => Err(ParseError::Usage(USAGE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_scan_toggle() {
        assert_eq!(parse_line("scan on"), Ok(Input::Command(Command::Scan(true))));
        assert_eq!(parse_line("scan off"), Ok(Input::Command(Command::Scan(false))));
        assert!(parse_line("scan maybe").is_err());
    }

    #[test]
    fn should_parse_connect_with_valid_address() {
        assert_eq!(
            parse_line("connect c0:ff:ee:00:00:01"),
            Ok(Input::Command(Command::Connect(
                "C0:FF:EE:00:00:01".parse().unwrap()
            )))
        );
        assert!(parse_line("connect nowhere").is_err());
    }

    #[test]
    fn should_pass_motor_percent_through_unvalidated() {
        assert_eq!(
            parse_line("left 150"),
            Ok(Input::Command(Command::SetLeftMotor(150)))
        );
        assert_eq!(
            parse_line("right 0"),
            Ok(Input::Command(Command::SetRightMotor(0)))
        );
        assert!(parse_line("left fast").is_err());
    }

    #[test]
    fn should_keep_spaces_in_name() {
        assert_eq!(
            parse_line("name  Bristle Bot "),
            Ok(Input::Command(Command::SetName("Bristle Bot".to_owned())))
        );
        assert!(parse_line("name").is_err());
    }

    #[test]
    fn should_parse_color_triplet() {
        assert_eq!(
            parse_line("color 255 0 128"),
            Ok(Input::Command(Command::SetColor(Rgb::new(255, 0, 128))))
        );
        assert!(parse_line("color 1 2").is_err());
        assert!(parse_line("color 1 2 300").is_err());
    }

    #[test]
    fn should_parse_control_words() {
        assert_eq!(parse_line("   "), Ok(Input::Empty));
        assert_eq!(parse_line("status"), Ok(Input::Status));
        assert_eq!(parse_line("quit"), Ok(Input::Quit));
        assert_eq!(
            parse_line("save"),
            Ok(Input::Command(Command::SaveAndDisconnect))
        );
        assert_eq!(
            parse_line("jump"),
            Err(ParseError::Unknown("jump".to_owned()))
        );
    }
}
