// External collaborators of the reconciliation core: registry storage,
// structured export and report rendering

pub mod registry;
pub mod report;
pub mod xml;

pub use registry::SqliteRegistry;
pub use report::{render_report, RenderError, RenderOptions, RenderedReport};
pub use xml::{export_xml, ExportError, ExportOptions};
