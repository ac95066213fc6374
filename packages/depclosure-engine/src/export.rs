//! Machine-readable JSON export of a closure run.
//!
//! ```json
//! {
//!     "affected_packages": {
//!         "bar-src": [
//!             "libfoo"
//!         ],
//!         "libfoo": []
//!     },
//!     "status_change": {
//!         "libfoo": "2020-09-13T12:26:40+00:00"
//!     }
//! }
//! ```

use crate::error::Result;
use crate::report::ClosureReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedExport {
    /// package → sorted names whose removal pulled it in
    pub affected_packages: BTreeMap<String, Vec<String>>,
    /// package → ISO-8601 status change, for every package with metadata
    pub status_change: BTreeMap<String, String>,
}

impl AffectedExport {
    pub fn from_report(report: &ClosureReport) -> Self {
        let status_change = report
            .metadata
            .iter()
            .filter_map(|(name, meta)| {
                meta.as_ref()
                    .map(|m| (name.clone(), m.status_change.to_rfc3339()))
            })
            .collect();

        let affected_packages = report
            .dep_chain
            .iter()
            .map(|(name, reasons)| (name.clone(), reasons.iter().cloned().collect()))
            .collect();

        Self {
            affected_packages,
            status_change,
        }
    }

    /// Pretty JSON with 4-space indentation; keys sorted (fields are declared
    /// in alphabetical order).
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Write the export, logging instead of failing. Returns whether it was saved.
    pub fn save_json(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        info!("Saving {} with machine readable info", path.display());
        match self.write_json(path) {
            Ok(()) => true,
            Err(e) => {
                error!("Cannot save {}: {}", path.display(), e);
                false
            }
        }
    }
}
