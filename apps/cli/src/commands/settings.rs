//! Settings command implementation.

use super::SettingsCommand;
use crate::config::CliContext;
use colored::Colorize;
use promptbatch_core::storage::keys;
use tabled::{Table, Tabled, settings::Style};

/// Execute the settings command.
pub fn execute(context: &CliContext, command: SettingsCommand) -> anyhow::Result<()> {
    let store = &context.store;
    match command {
        SettingsCommand::Get { key } => {
            match store.get_setting(&key)? {
                Some(value) => println!("{}", value),
                None => eprintln!("{}", format!("'{}' is not set", key).yellow()),
            }
        }
        SettingsCommand::Set { key, value } => {
            store.set_setting(&key, &value)?;
            let shown = if key == keys::API_KEY { mask(&value) } else { value };
            println!("{} {} = {}", "✓".green(), key.cyan(), shown);
        }
        SettingsCommand::List { json, reveal } => {
            let settings: Vec<(String, String)> = store
                .list_settings()?
                .into_iter()
                .map(|(k, v)| {
                    let v = if k == keys::API_KEY && !reveal { mask(&v) } else { v };
                    (k, v)
                })
                .collect();

            if json || context.config.output.is_json() {
                let map: serde_json::Map<String, serde_json::Value> =
                    settings.into_iter().map(|(k, v)| (k, serde_json::Value::String(v))).collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else if settings.is_empty() {
                println!("{}", "No settings stored.".yellow());
                println!();
                println!("Valid keys: {}", keys::ALL.join(", "));
            } else {
                #[derive(Tabled)]
                struct SettingRow {
                    #[tabled(rename = "Key")]
                    key: String,
                    #[tabled(rename = "Value")]
                    value: String,
                }

                let rows = settings.into_iter().map(|(key, value)| SettingRow { key, value });
                let table = Table::new(rows).with(Style::rounded()).to_string();
                println!("{}", table);
            }
        }
    }
    Ok(())
}

/// Masks all but the last four characters.
fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}
