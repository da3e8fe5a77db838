use crate::output::Render;
use crate::report::ReportBlock;
use anyhow::Result;
use std::io::Write;

/// Renders the report as a standalone HTML document, monospace-styled so
/// the fixed-width tables line up in a browser.
pub struct HtmlRenderer<W> {
    writer: W,
    paragraph_open: bool,
}

impl<W> HtmlRenderer<W>
where
    W: Write,
{
    pub fn new(writer: W) -> HtmlRenderer<W> {
        HtmlRenderer {
            writer,
            paragraph_open: false,
        }
    }

    fn open_paragraph(&mut self) -> Result<()> {
        if !self.paragraph_open {
            write!(self.writer, "<p>")?;
            self.paragraph_open = true;
        }
        Ok(())
    }

    fn close_paragraph(&mut self) -> Result<()> {
        if self.paragraph_open {
            write!(self.writer, "</p>")?;
            self.paragraph_open = false;
        }
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl<W> Render for HtmlRenderer<W>
where
    W: Write,
{
    fn render(&mut self, blocks: &[ReportBlock]) -> Result<()> {
        write!(
            self.writer,
            "<!DOCTYPE html>\n<html><head><meta charset=\"UTF-8\"><style>  \
             p{{ font-family: 'Courier New', monospace;}}</style></head><body>"
        )?;

        for block in blocks {
            match block {
                ReportBlock::Heading { level, text } => {
                    self.close_paragraph()?;
                    let level = (*level).clamp(1, 6);
                    write!(self.writer, "<h{level}>{}</h{level}>", escape(text))?;
                }
                ReportBlock::Paragraph { text, emphasized } => {
                    self.open_paragraph()?;
                    // Spaces become &nbsp; so the table columns keep their
                    // alignment.
                    let text = escape(text).replace(' ', "&nbsp;");
                    if *emphasized {
                        writeln!(self.writer, "<strong>{text}</strong><br>")?;
                    } else {
                        writeln!(self.writer, "{text}<br>")?;
                    }
                }
                ReportBlock::Image { path } => {
                    self.close_paragraph()?;
                    write!(self.writer, "<img src=\"{}\" >", path.display())?;
                }
            }
        }

        self.close_paragraph()?;
        write!(self.writer, "</body></html>")?;
        Ok(())
    }
}
