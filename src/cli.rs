//! CLI host — a stdin/stdout driver for the wizards, for local testing.
//!
//! One command per line. Field values are staged with `set` and sent with
//! `next`, the way a screen collects inputs before the primary button.

use serde_json::Value;

use crate::flow::{Draft, FlowHost, StepView, ValidationResult};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Flows,
    Start(String),
    Set { field: String, value: Value },
    Next,
    Back,
    Jump(String),
    Reset(Vec<String>),
    Show,
    Save,
    Resume(String),
    Suspended,
    Submit,
    Discard(Option<String>),
    Quit,
}

pub const HELP: &str = "\
commands:
  flows                 list wizards
  start <flow>          start a wizard
  set <field> <value>   stage a value for the current step
  next                  submit staged values
  back                  previous step
  jump <step>           return to a completed step
  reset <field>...      clear fields not yet committed
  show                  redisplay the current step
  save                  save & exit
  suspended             list saved runs
  resume <run_id>       continue a saved run
  submit                send a completed run
  discard [run_id]      drop the current or a saved run
  quit";

/// Parse one line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let Some((cmd, rest)) = split_word(line) else {
        return Ok(None);
    };
    let arg = |name: &str| {
        split_word(rest)
            .map(|(a, _)| a.to_string())
            .ok_or_else(|| format!("usage: {cmd} <{name}>"))
    };

    let command = match cmd {
        "help" | "?" => Command::Help,
        "flows" => Command::Flows,
        "start" => Command::Start(arg("flow")?),
        "set" => {
            let (field, raw) =
                split_word(rest).ok_or_else(|| "usage: set <field> <value>".to_string())?;
            Command::Set {
                field: field.to_string(),
                value: parse_value(raw),
            }
        }
        "next" | "n" => Command::Next,
        "back" | "b" => Command::Back,
        "jump" => Command::Jump(arg("step")?),
        "reset" => {
            let fields: Vec<String> = rest.split_whitespace().map(String::from).collect();
            if fields.is_empty() {
                return Err("usage: reset <field>...".into());
            }
            Command::Reset(fields)
        }
        "show" => Command::Show,
        "save" => Command::Save,
        "suspended" => Command::Suspended,
        "resume" => Command::Resume(arg("run_id")?),
        "submit" => Command::Submit,
        "discard" => Command::Discard(split_word(rest).map(|(id, _)| id.to_string())),
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(command))
}

fn split_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((s, "")),
    }
}

/// Lists, objects, quoted strings and literals are JSON. Everything else,
/// numbers included, stays text so phone numbers keep their leading zero.
pub fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    let json_like = raw.starts_with(['[', '{', '"']) || matches!(raw, "true" | "false" | "null");
    json_like
        .then(|| serde_json::from_str::<Value>(raw).ok())
        .flatten()
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Renders views as plain text on stdout.
#[derive(Debug, Default)]
pub struct CliHost;

impl CliHost {
    pub fn new() -> Self {
        Self
    }

    fn print_values(values: &Draft) {
        for (field, value) in values.iter() {
            println!("    {field} = {value}");
        }
    }
}

impl FlowHost for CliHost {
    fn render(&mut self, view: &StepView) {
        println!();
        println!("[{} #{}] {}", view.flow_id, view.position, view.title);
        if view.informational {
            println!("  (nothing to fill in, `next` to continue)");
        } else {
            println!("  fields: {}", view.fields.join(", "));
            Self::print_values(&view.values);
        }
        if view.can_go_back {
            println!("  `back` for the previous step");
        }
    }

    fn show_errors(&mut self, errors: &ValidationResult) {
        for (field, reason) in &errors.errors {
            println!("  ✗ {field} {reason}");
        }
    }

    fn finished(&mut self, view: &StepView) {
        println!();
        println!("[{}] complete. `submit` to send it.", view.flow_id);
        println!("  run: {}", view.run_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(
            parse_command("start ListingCreation").unwrap(),
            Some(Command::Start("ListingCreation".into()))
        );
        assert_eq!(parse_command("n").unwrap(), Some(Command::Next));
        assert_eq!(
            parse_command("reset city postalCode").unwrap(),
            Some(Command::Reset(vec!["city".into(), "postalCode".into()]))
        );
        assert_eq!(parse_command("discard").unwrap(), Some(Command::Discard(None)));
        assert_eq!(
            parse_command("discard abc").unwrap(),
            Some(Command::Discard(Some("abc".into())))
        );
        assert!(parse_command("start").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn set_keeps_the_rest_of_the_line() {
        assert_eq!(
            parse_command("set title Cozy flat near the lake").unwrap(),
            Some(Command::Set {
                field: "title".into(),
                value: json!("Cozy flat near the lake"),
            })
        );
    }

    #[test]
    fn values_keep_leading_zeros() {
        assert_eq!(parse_value("03001234567"), json!("03001234567"));
        assert_eq!(parse_value("16"), json!("16"));
        assert_eq!(parse_value(r#"["a","b"]"#), json!(["a", "b"]));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("[not json"), json!("[not json"));
    }
}
