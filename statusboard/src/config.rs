//! Configuration
//!
//! The daemon is configured by a YAML file with a `main` paragraph, a
//! `pages` list and, in manual mode, a `buttons` list. Loading validates
//! everything up front; each failure names the paragraph and key at fault.

use crate::display::Icon;
use crate::pages::{PageArgs, PageKind, PageSpec};
use crate::runtime::PowerAction;

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde_yaml::{Mapping, Value};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No config found!")]
    NotFound,
    #[error("Failed to read config: {0}")]
    IO(#[from] io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Config is not a yaml file!")]
    NotYaml,
    #[error("Config does not contain a '{0}' paragraph!")]
    MissingParagraph(&'static str),
    #[error("Config paragraph '{paragraph}' does not contain a '{key}' key!")]
    MissingKey {
        paragraph: &'static str,
        key: &'static str,
    },
    #[error("Config paragraph '{paragraph}' key '{key}' is not setup correctly!")]
    InvalidKey { paragraph: &'static str, key: String },
    #[error("Config paragraph '{paragraph}' key '{key}' is not a number!")]
    NotANumber {
        paragraph: &'static str,
        key: &'static str,
    },
    #[error("Config paragraph '{0}' is not setup correctly!")]
    InvalidParagraph(&'static str),
    #[error("You need to setup at least one page!")]
    NoPages,
    #[error("You need to setup at least one push button!")]
    NoButtons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeConfig {
    Auto { delay: Duration },
    Manual { screensaver_minutes: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavFunc {
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Pressed,
    Hold {
        hold_time: Duration,
        action: PowerAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonConfig {
    pub gpio: u8,
    pub func: NavFunc,
    pub kind: ButtonKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: ModeConfig,
    pub show_icons: bool,
    pub pages: Vec<PageSpec>,
    /// Empty in auto mode.
    pub buttons: Vec<ButtonConfig>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound);
        }
        let text = fs::read_to_string(path)?;
        Config::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Config, ConfigError> {
        if text.trim().is_empty() {
            return Err(ConfigError::NotYaml);
        }
        let doc: Value = serde_yaml::from_str(text)?;
        let Value::Mapping(doc) = doc else {
            return Err(ConfigError::NotYaml);
        };

        let main = paragraph(&doc, "main")?;
        let mode = parse_mode(main)?;
        let show_icons = parse_show_icons(main)?;

        let pages = match doc.get("pages") {
            Some(Value::Sequence(list)) => list
                .iter()
                .map(parse_page)
                .collect::<Result<Vec<_>, _>>()?,
            Some(Value::Null) => Vec::new(),
            Some(_) => return Err(ConfigError::InvalidParagraph("pages")),
            None => return Err(ConfigError::MissingParagraph("pages")),
        };
        if pages.is_empty() {
            return Err(ConfigError::NoPages);
        }

        let buttons = match mode {
            ModeConfig::Auto { .. } => Vec::new(),
            ModeConfig::Manual { .. } => match doc.get("buttons") {
                None => return Err(ConfigError::MissingParagraph("buttons")),
                Some(Value::Null) => return Err(ConfigError::NoButtons),
                Some(Value::Sequence(list)) if list.is_empty() => {
                    return Err(ConfigError::NoButtons)
                }
                Some(Value::Sequence(list)) => list
                    .iter()
                    .map(parse_button)
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => return Err(ConfigError::InvalidParagraph("buttons")),
            },
        };

        Ok(Config {
            mode,
            show_icons,
            pages,
            buttons,
        })
    }
}

fn paragraph<'a>(doc: &'a Mapping, name: &'static str) -> Result<&'a Mapping, ConfigError> {
    match doc.get(name) {
        Some(Value::Mapping(m)) => Ok(m),
        Some(_) => Err(ConfigError::InvalidParagraph(name)),
        None => Err(ConfigError::MissingParagraph(name)),
    }
}

fn required<'a>(
    map: &'a Mapping,
    paragraph: &'static str,
    key: &'static str,
) -> Result<&'a Value, ConfigError> {
    map.get(key)
        .ok_or(ConfigError::MissingKey { paragraph, key })
}

fn invalid(paragraph: &'static str, key: impl Into<String>) -> ConfigError {
    ConfigError::InvalidKey {
        paragraph,
        key: key.into(),
    }
}

/// Integers, floats (truncated) and numeric strings; the sign is dropped.
fn number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.unsigned_abs())
            } else if let Some(u) = n.as_u64() {
                Some(u)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc().abs() as u64)
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(i64::unsigned_abs),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(|s| s.to_lowercase())
}

fn parse_mode(main: &Mapping) -> Result<ModeConfig, ConfigError> {
    let mode = required(main, "main", "mode")?;
    match text(mode).as_deref() {
        Some("auto") => {
            let delay = required(main, "main", "autodelay")?;
            let secs = number(delay).ok_or(ConfigError::NotANumber {
                paragraph: "main",
                key: "autodelay",
            })?;
            Ok(ModeConfig::Auto {
                delay: Duration::from_secs(secs),
            })
        }
        Some("manual") => {
            let minutes = required(main, "main", "screensaver")?;
            let minutes = number(minutes).ok_or(ConfigError::NotANumber {
                paragraph: "main",
                key: "screensaver",
            })?;
            Ok(ModeConfig::Manual {
                screensaver_minutes: minutes,
            })
        }
        _ => Err(invalid("main", "mode")),
    }
}

fn parse_show_icons(main: &Mapping) -> Result<bool, ConfigError> {
    match required(main, "main", "showicons")? {
        Value::Bool(b) => Ok(*b),
        v => match text(v).as_deref() {
            Some("yes") => Ok(true),
            Some("no") => Ok(false),
            _ => Err(invalid("main", "showicons")),
        },
    }
}

fn parse_page(entry: &Value) -> Result<PageSpec, ConfigError> {
    let Value::Mapping(entry) = entry else {
        return Err(ConfigError::InvalidParagraph("pages"));
    };
    let kind = entry
        .get("type")
        .and_then(text)
        .and_then(|t| PageKind::from_name(&t))
        .ok_or(ConfigError::InvalidParagraph("pages"))?;
    let bad = || invalid("pages", kind.name());

    let icon = entry.get("icon");
    let value = entry.get("value");
    if !kind.is_advanced() {
        if icon.is_some() || value.is_some() {
            return Err(bad());
        }
        return Ok(PageSpec { kind, args: None });
    }

    let icon = icon
        .and_then(Value::as_str)
        .and_then(Icon::from_name)
        .filter(|icon| kind.icons().contains(icon))
        .ok_or_else(bad)?;
    let value = value
        .and_then(Value::as_str)
        .filter(|v| kind.accepts_value(v))
        .ok_or_else(bad)?;
    Ok(PageSpec {
        kind,
        args: Some(PageArgs {
            icon,
            value: value.to_string(),
        }),
    })
}

fn parse_button(entry: &Value) -> Result<ButtonConfig, ConfigError> {
    let Value::Mapping(entry) = entry else {
        return Err(ConfigError::InvalidParagraph("buttons"));
    };
    let (Some(gpio), Some(func), Some(kind)) =
        (entry.get("gpio"), entry.get("func"), entry.get("type"))
    else {
        return Err(ConfigError::InvalidParagraph("buttons"));
    };

    let gpio = number(gpio)
        .and_then(|n| u8::try_from(n).ok())
        .ok_or(ConfigError::NotANumber {
            paragraph: "buttons",
            key: "gpio",
        })?;
    let func = match text(func).as_deref() {
        Some("next") => NavFunc::Next,
        Some("previous") => NavFunc::Previous,
        _ => return Err(invalid("buttons", "func")),
    };

    let kind = match text(kind).as_deref() {
        Some("pressed") => ButtonKind::Pressed,
        Some("hold") => {
            let (Some(action), Some(hold_time)) = (entry.get("holdfunc"), entry.get("holdtime"))
            else {
                return Err(ConfigError::InvalidParagraph("buttons"));
            };
            let action = match text(action).as_deref() {
                Some("poweroff") => PowerAction::Poweroff,
                Some("reboot") => PowerAction::Reboot,
                _ => return Err(invalid("buttons", "holdfunc")),
            };
            let secs = number(hold_time).ok_or(ConfigError::NotANumber {
                paragraph: "buttons",
                key: "holdtime",
            })?;
            ButtonKind::Hold {
                hold_time: Duration::from_secs(secs),
                action,
            }
        }
        _ => return Err(invalid("buttons", "type")),
    };

    Ok(ButtonConfig { gpio, func, kind })
}
