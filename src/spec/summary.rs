//! Human-readable overview of a loaded description: servers, operations and
//! component schemas. Backs the `inspect` subcommand.

use crate::spec::model::SpecModel;
use std::fmt;

/// Borrowing view over a [`SpecModel`] that renders as a text report.
#[derive(Debug, Clone, Copy)]
pub struct SpecSummary<'a> {
    model: &'a SpecModel,
    include_schemas: bool,
}

impl<'a> SpecSummary<'a> {
    pub fn new(model: &'a SpecModel) -> Self {
        Self {
            model,
            include_schemas: false,
        }
    }

    pub fn with_schemas(mut self, include: bool) -> Self {
        self.include_schemas = include;
        self
    }
}

impl fmt::Display for SpecSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.model.title {
            match &self.model.version {
                Some(version) => writeln!(f, "{} ({})", title, version)?,
                None => writeln!(f, "{}", title)?,
            }
        }

        writeln!(f, "\nApplication servers:")?;
        for server in &self.model.servers {
            let url = if server.url.is_empty() { "No URL" } else { &server.url };
            writeln!(
                f,
                "  {} - {}",
                server.description.as_deref().unwrap_or("No description"),
                url
            )?;
        }

        writeln!(f, "\nAPI Paths:")?;
        for item in &self.model.paths {
            writeln!(f, "\n{}:", item.path)?;
            for (method, op) in &item.operations {
                writeln!(
                    f,
                    "  {}: {}",
                    method.as_str().to_uppercase(),
                    op.summary.as_deref().unwrap_or("No summary")
                )?;
            }
        }

        if self.include_schemas {
            writeln!(f, "\nSchemas:")?;
            for (name, schema) in &self.model.schemas {
                writeln!(f, "\n{}:", name)?;
                let required = schema.required_names();
                if !required.is_empty() {
                    writeln!(f, "  Required: {}", required.join(", "))?;
                }
                writeln!(f, "  Properties:")?;
                for (prop, ty) in schema.property_types() {
                    writeln!(f, "    - {}: {}", prop, ty.unwrap_or("No type"))?;
                }
            }
        }

        Ok(())
    }
}
