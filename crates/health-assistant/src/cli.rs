use health_common::api::Coordinates;

use crate::error::AppError;

pub const HELP: &str = "\
Commands:
  /open /minimize /close /remove   chat widget visibility
  /reset                           start a new conversation
  <text>                           send a chat message (widget must be open)
  /analyze [text]                  analyze symptoms, optionally replacing the description
  /symptom <name>                  select a common symptom
  /symptoms                        list common symptoms and the current selection
  /location <address>              search for doctors near an address
  /here <lat> <lng>                search for doctors near a position
  /specialty <name|all>            filter by specialty
  /radius <km>                     search radius (1-50)
  /clear-filters                   reset specialty and radius
  /select <n>                      pick the n-th doctor from the results
  /specialties                     list available specialties
  /status                          check backend health
  /help                            show this help
  /quit                            exit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open,
    Minimize,
    Close,
    Remove,
    Reset,
    Chat(String),
    Analyze(Option<String>),
    Symptom(String),
    Symptoms,
    Location(String),
    Here(Coordinates),
    Specialty(String),
    Radius(u32),
    ClearFilters,
    /// Zero-based position in the result list.
    Select(usize),
    Specialties,
    Status,
    Help,
    Quit,
}

impl Command {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, AppError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Chat(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "open" => Command::Open,
            "minimize" => Command::Minimize,
            "close" => Command::Close,
            "remove" => Command::Remove,
            "reset" => Command::Reset,
            "analyze" => Command::Analyze((!arg.is_empty()).then(|| arg.to_string())),
            "symptom" => Command::Symptom(required(name, arg)?.to_string()),
            "symptoms" => Command::Symptoms,
            "location" => Command::Location(arg.to_string()),
            "here" => Command::Here(parse_coordinates(arg)?),
            "specialty" => {
                let specialty = required(name, arg)?;
                // "all" clears the filter
                if specialty.eq_ignore_ascii_case("all") {
                    Command::Specialty(String::new())
                } else {
                    Command::Specialty(specialty.to_string())
                }
            }
            "radius" => Command::Radius(
                required(name, arg)?
                    .parse()
                    .map_err(|_| AppError::Validation(format!("invalid radius: {arg}")))?,
            ),
            "clear-filters" => Command::ClearFilters,
            "select" => Command::Select(parse_position(required(name, arg)?)?),
            "specialties" => Command::Specialties,
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(AppError::Validation(format!("unknown command: /{other}"))),
        };
        Ok(Some(command))
    }
}

fn required<'a>(name: &str, arg: &'a str) -> Result<&'a str, AppError> {
    if arg.is_empty() {
        Err(AppError::Validation(format!("/{name} needs an argument")))
    } else {
        Ok(arg)
    }
}

/// Result numbers are shown starting at 1.
fn parse_position(arg: &str) -> Result<usize, AppError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(AppError::Validation(format!("invalid result number: {arg}"))),
    }
}

fn parse_coordinates(arg: &str) -> Result<Coordinates, AppError> {
    let invalid = || AppError::Validation(format!("expected `<lat> <lng>`, got: {arg}"));
    let mut parts = arg.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty());
    let lat = parts.next().and_then(|p| p.parse::<f64>().ok()).ok_or_else(invalid)?;
    let lng = parts.next().and_then(|p| p.parse::<f64>().ok()).ok_or_else(invalid)?;
    let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng);
    if parts.next().is_some() || !in_range {
        return Err(invalid());
    }
    Ok(Coordinates { lat, lng })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            Command::parse("  I have a headache ").unwrap(),
            Some(Command::Chat("I have a headache".to_string()))
        );
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            Command::parse("/analyze").unwrap(),
            Some(Command::Analyze(None))
        );
        assert_eq!(
            Command::parse("/analyze fever since yesterday").unwrap(),
            Some(Command::Analyze(Some("fever since yesterday".to_string())))
        );
        assert_eq!(
            Command::parse("/location  San Francisco, CA").unwrap(),
            Some(Command::Location("San Francisco, CA".to_string()))
        );
        assert_eq!(Command::parse("/radius 25").unwrap(), Some(Command::Radius(25)));
        assert_eq!(Command::parse("/select 2").unwrap(), Some(Command::Select(1)));
        assert_eq!(
            Command::parse("/specialty ALL").unwrap(),
            Some(Command::Specialty(String::new()))
        );
        assert_eq!(
            Command::parse("/here 37.5, -122.25").unwrap(),
            Some(Command::Here(Coordinates {
                lat: 37.5,
                lng: -122.25,
            }))
        );
    }

    #[test]
    fn test_blank_location_is_left_to_the_panel() {
        assert_eq!(
            Command::parse("/location").unwrap(),
            Some(Command::Location(String::new()))
        );
    }

    #[test]
    fn test_bad_input_is_validation_error() {
        assert!(matches!(Command::parse("/radius far"), Err(AppError::Validation(_))));
        assert!(matches!(Command::parse("/here 91 0"), Err(AppError::Validation(_))));
        assert!(matches!(Command::parse("/symptom"), Err(AppError::Validation(_))));
        assert!(matches!(Command::parse("/select 0"), Err(AppError::Validation(_))));
        let err = Command::parse("/teleport").unwrap_err();
        assert_eq!(err.to_string(), "unknown command: /teleport");
    }
}
