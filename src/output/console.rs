use crate::output::Render;
use crate::report::ReportBlock;
use anyhow::Result;
use std::io::Write;

const HEADING_WIDTH: usize = 50;

/// Renders the report as plain terminal text: centered underlined headings,
/// paragraphs as-is.
pub struct ConsoleRenderer<W> {
    writer: W,
}

impl<W> ConsoleRenderer<W>
where
    W: Write,
{
    pub fn new(writer: W) -> ConsoleRenderer<W> {
        ConsoleRenderer { writer }
    }
}

impl<W> Render for ConsoleRenderer<W>
where
    W: Write,
{
    fn render(&mut self, blocks: &[ReportBlock]) -> Result<()> {
        for block in blocks {
            match block {
                ReportBlock::Heading { text, .. } => {
                    writeln!(self.writer)?;
                    writeln!(self.writer, "{text:^width$}", width = HEADING_WIDTH)?;
                    writeln!(
                        self.writer,
                        "{:^width$}",
                        "-".repeat(text.len()),
                        width = HEADING_WIDTH
                    )?;
                }
                ReportBlock::Paragraph { text, .. } => {
                    writeln!(self.writer, "{text}")?;
                }
                ReportBlock::Image { path } => {
                    writeln!(self.writer)?;
                    writeln!(self.writer, "Plot saved to: {}", path.display())?;
                }
            }
        }
        Ok(())
    }
}
