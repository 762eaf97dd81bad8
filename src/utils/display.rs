use crate::tools::ToolDefinition;
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_tool(definition: &ToolDefinition) {
    println!("{} - {}", definition.name.bold(), definition.description);
    for (name, property) in &definition.input_schema.properties {
        let required = if definition.input_schema.required.contains(name) {
            "required".yellow()
        } else {
            "optional".dimmed()
        };
        println!(
            "  - {} ({}): {} [{}]",
            name, property.property_type, property.description, required
        );
    }
}
