use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentColor {
    #[default]
    Blue,
    Purple,
    Green,
    Orange,
}

/// What the notification capability has reported so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Never asked
    #[default]
    Default,
    Granted,
    Denied,
}

macro_rules! keyword_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(format!("invalid {} '{}'", $what, other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyword_enum!(Theme, "theme", { Light => "light", Dark => "dark" });
keyword_enum!(AccentColor, "accent color", {
    Blue => "blue",
    Purple => "purple",
    Green => "green",
    Orange => "orange",
});
keyword_enum!(Permission, "permission", {
    Default => "default",
    Granted => "granted",
    Denied => "denied",
});

/// User settings from settings.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: Theme,
    pub accent_color: AccentColor,
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
    pub notification_permission: Permission,
    /// Day the last daily reminder was shown
    pub last_notification_date: Option<NaiveDate>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: Theme::Light,
            accent_color: AccentColor::Blue,
            sound_enabled: true,
            notifications_enabled: false,
            notification_permission: Permission::Default,
            last_notification_date: None,
        }
    }
}

impl Settings {
    /// Read settings from a parsed TOML table. Every key is optional and a
    /// missing, mistyped or unknown value falls back to its default.
    pub fn from_table(table: &toml::Table) -> Settings {
        let defaults = Settings::default();
        let str_key = |key: &str| table.get(key).and_then(|v| v.as_str());
        let bool_key = |key: &str| table.get(key).and_then(|v| v.as_bool());

        Settings {
            theme: str_key("theme")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.theme),
            accent_color: str_key("accent_color")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.accent_color),
            sound_enabled: bool_key("sound_enabled").unwrap_or(defaults.sound_enabled),
            notifications_enabled: bool_key("notifications_enabled")
                .unwrap_or(defaults.notifications_enabled),
            notification_permission: str_key("notification_permission")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.notification_permission),
            last_notification_date: match table.get("last_notification_date") {
                Some(toml::Value::Datetime(dt)) => dt.date.and_then(|d| {
                    NaiveDate::from_ymd_opt(d.year as i32, d.month as u32, d.day as u32)
                }),
                Some(toml::Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
                _ => None,
            },
        }
    }
}
