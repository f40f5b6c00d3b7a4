use std::io::Write;

use crate::analysis::ElasticFlameGraph;
use crate::domain::ExportError;

/// JSON exporter for the flame graph payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter {
    pretty: bool,
}

impl JsonExporter {
    #[must_use]
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Serialize `graph` followed by a newline.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn export<W: Write>(&self, graph: &ElasticFlameGraph, mut writer: W) -> Result<(), ExportError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, graph)?;
        } else {
            serde_json::to_writer(&mut writer, graph)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
