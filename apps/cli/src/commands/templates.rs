//! Templates command implementation.
//!
//! Templates are named system messages that `run`, `submit` and `encode` can
//! use through `--template`.

use super::TemplatesCommand;
use crate::config::CliContext;
use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use tabled::{Table, Tabled, settings::Style};

/// Execute the templates command.
pub fn execute(context: &CliContext, command: TemplatesCommand) -> anyhow::Result<()> {
    let store = &context.store;
    match command {
        TemplatesCommand::List { json } => {
            let templates = store.list_templates()?;

            if json || context.config.output.is_json() {
                let list: Vec<_> = templates
                    .iter()
                    .map(|t| json!({ "name": t.name, "content": t.content }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
                return Ok(());
            }

            if templates.is_empty() {
                println!("{}", "No templates found.".yellow());
                println!();
                println!("Create one with:  promptbatch templates save <name> <text>");
                return Ok(());
            }

            #[derive(Tabled)]
            struct TemplateRow {
                #[tabled(rename = "Name")]
                name: String,
                #[tabled(rename = "Content")]
                content: String,
            }

            let count = templates.len();
            let rows = templates.into_iter().map(|t| TemplateRow {
                name: t.name,
                content: preview(&t.content, 60),
            });
            println!();
            println!("{}", format!("Found {} templates", count).bold().green());
            println!();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        TemplatesCommand::Show { name } => {
            let template = store
                .get_template(&name)?
                .ok_or_else(|| anyhow::anyhow!("Template '{}' not found", name))?;
            println!("{}", template.content);
        }
        TemplatesCommand::Save { name, content, file } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Template text or --file is required"),
            };
            store.save_template(&name, &content)?;
            println!("{} Saved template {}", "✓".green(), name.trim().cyan());
        }
        TemplatesCommand::Delete { name } => {
            store.delete_template(&name)?;
            println!("{} Deleted template {}", "✓".green(), name.cyan());
        }
    }
    Ok(())
}

/// First line of `text`, cut to `max` characters.
fn preview(text: &str, max: usize) -> String {
    let first = text.lines().next().unwrap_or_default();
    if first.chars().count() > max || text.lines().nth(1).is_some() {
        let cut: String = first.chars().take(max).collect();
        format!("{}…", cut)
    } else {
        first.to_string()
    }
}
