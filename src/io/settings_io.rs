use toml_edit::{DocumentMut, Item, value};

use crate::model::settings::Settings;

pub const SETTINGS_FILE: &str = "settings.toml";

/// Parse settings.toml, returning both the coerced settings and the raw
/// document for round-trip-safe editing.
pub fn parse_settings(text: &str) -> Result<(Settings, DocumentMut), String> {
    let doc: DocumentMut = text.parse().map_err(|e: toml_edit::TomlError| e.to_string())?;
    let table: toml::Table = toml::from_str(text).map_err(|e| e.to_string())?;
    Ok((Settings::from_table(&table), doc))
}

fn set_str(doc: &mut DocumentMut, key: &str, new: &str) {
    if doc.get(key).and_then(Item::as_str) != Some(new) {
        doc[key] = value(new);
    }
}

fn set_bool(doc: &mut DocumentMut, key: &str, new: bool) {
    if doc.get(key).and_then(Item::as_bool) != Some(new) {
        doc[key] = value(new);
    }
}

/// Write `settings` into `doc`. Keys whose stored value already matches are
/// left alone so their comments and formatting survive.
pub fn apply_settings(doc: &mut DocumentMut, settings: &Settings) {
    set_str(doc, "theme", settings.theme.as_str());
    set_str(doc, "accent_color", settings.accent_color.as_str());
    set_bool(doc, "sound_enabled", settings.sound_enabled);
    set_bool(doc, "notifications_enabled", settings.notifications_enabled);
    set_str(
        doc,
        "notification_permission",
        settings.notification_permission.as_str(),
    );
    match settings.last_notification_date {
        Some(date) => {
            let stamp = date.format("%Y-%m-%d").to_string();
            let unchanged = doc
                .get("last_notification_date")
                .and_then(Item::as_value)
                .is_some_and(|v| v.to_string().trim().trim_matches('"') == stamp);
            if !unchanged {
                doc["last_notification_date"] = value(stamp);
            }
        }
        None => {
            doc.remove("last_notification_date");
        }
    }
}

/// Render settings into the existing file text, or a fresh document when
/// there is none (or it no longer parses).
pub fn render_settings(existing: Option<&str>, settings: &Settings) -> String {
    let mut doc = existing
        .and_then(|text| text.parse::<DocumentMut>().ok())
        .unwrap_or_default();
    apply_settings(&mut doc, settings);
    doc.to_string()
}
