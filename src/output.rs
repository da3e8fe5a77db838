use crate::report::ReportBlock;
use anyhow::Result;

pub mod chart;
pub mod console;
pub mod format;
pub mod html;

/// Output sinks consume the whole block sequence in order, preserving
/// heading levels, emphasis and image references.
pub trait Render {
    fn render(&mut self, blocks: &[ReportBlock]) -> Result<()>;
}
