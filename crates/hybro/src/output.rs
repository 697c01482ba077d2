use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hybro_bridge::ModuleDescriptor;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PackagesOutput<'a> {
    modules: &'a [ModuleDescriptor],
}

pub fn render_packages(modules: &[ModuleDescriptor], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(&PackagesOutput { modules })
            .unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PACKAGE", "MODULE", "METHODS", "EVENTS"]);
            for module in modules {
                table.add_row(vec![
                    module.package.clone(),
                    module.module.clone(),
                    join_or_dash(&module.methods),
                    join_or_dash(&module.events),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Pretty => modules
            .iter()
            .map(|module| {
                format!(
                    "{}.{} methods=[{}] events=[{}]",
                    module.package,
                    module.module,
                    module.methods.join(", "),
                    module.events.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn join_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
