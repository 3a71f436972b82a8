//! CLI command handlers for saved export templates
//!
//! Templates are created with `codereel export --save-template <name>`.

use clap::Subcommand;

use crate::error::ReelResult;
use crate::services::ProjectManager;

/// Template subcommands
#[derive(Subcommand)]
pub enum TemplateCommands {
    /// List saved templates
    List,

    /// Show one template's options
    Show {
        /// Template name or id
        template: String,
    },

    /// Delete a template
    Delete {
        /// Template name or id
        template: String,
    },
}

/// Handle a template command
pub fn handle_template_command(manager: &ProjectManager, cmd: TemplateCommands) -> ReelResult<()> {
    let templates = manager.templates();

    match cmd {
        TemplateCommands::List => {
            let list = templates.list();
            if list.is_empty() {
                println!("No templates saved.");
                println!("Save one with: codereel export --save-template <name>");
                return Ok(());
            }

            println!("Export Templates");
            println!("================");
            for template in &list {
                println!(
                    "  {:<20} {:<5} {}",
                    template.name,
                    template.options.format.to_string(),
                    template.description.as_deref().unwrap_or("")
                );
            }
        }

        TemplateCommands::Show { template } => {
            let template = templates.get(&template)?;
            println!("{} ({})", template.name, template.id);
            println!("{}", serde_json::to_string_pretty(&template.options)?);
        }

        TemplateCommands::Delete { template } => {
            let deleted = templates.delete(&template)?;
            println!("Deleted template '{}'", deleted.name);
        }
    }

    Ok(())
}
