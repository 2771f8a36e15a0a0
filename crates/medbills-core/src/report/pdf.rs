//! PDF rendering of a report table.
//!
//! Layout is computed in millimetres measured from the top edge, then
//! flipped into PDF user space (origin bottom-left) when drawing.

use std::io::BufWriter;

use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point,
};
use tracing::debug;

use super::{ReportError, ReportResult, ReportTable, COLUMNS, COLUMN_WIDTHS_MM, ROW_HEIGHT_MM};

pub const REPORT_TITLE: &str = "Medical Bills Report";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
/// Rows may not extend past this distance from the top.
const BREAK_AT_MM: f32 = PAGE_HEIGHT_MM - 20.0;

const TITLE_SIZE: f32 = 12.0;
const CELL_SIZE: f32 = 10.0;

/// Points to millimetres.
const PT_TO_MM: f32 = 0.3528;
/// Rough Helvetica advance per character, in ems.
const AVG_CHAR_EM: f32 = 0.5;

/// Where things go on one page. Offsets are from the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// Title and header row, first page only
    pub header_top: Option<f32>,
    /// `(row index, top offset)` in table order
    pub rows: Vec<(usize, f32)>,
}

/// Distribute `row_count` rows over pages.
///
/// The first page carries the title and header; later pages start at the
/// top margin. Always returns at least one page.
pub fn paginate(row_count: usize) -> Vec<PageLayout> {
    let header_top = MARGIN_MM + ROW_HEIGHT_MM;
    let mut pages = vec![PageLayout {
        header_top: Some(header_top),
        rows: Vec::new(),
    }];
    let mut top = header_top + ROW_HEIGHT_MM;

    for index in 0..row_count {
        if top + ROW_HEIGHT_MM > BREAK_AT_MM {
            pages.push(PageLayout {
                header_top: None,
                rows: Vec::new(),
            });
            top = MARGIN_MM;
        }
        if let Some(page) = pages.last_mut() {
            page.rows.push((index, top));
        }
        top += ROW_HEIGHT_MM;
    }
    pages
}

/// Render the table as an A4 portrait PDF.
pub fn render_pdf(table: &ReportTable) -> ReportResult<Vec<u8>> {
    let layout = paginate(table.len());
    debug!(rows = table.len(), pages = layout.len(), "Rendering report");

    let (doc, page1, layer1) =
        PdfDocument::new(REPORT_TITLE, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(format!("font: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Pdf(format!("font: {e}")))?;

    for (page_no, page) in layout.iter().enumerate() {
        let layer = if page_no == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (p, l) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(p).get_layer(l)
        };
        layer.set_outline_thickness(0.2);

        if let Some(header_top) = page.header_top {
            let title_width = text_width(REPORT_TITLE, TITLE_SIZE);
            layer.use_text(
                REPORT_TITLE,
                TITLE_SIZE,
                Mm((PAGE_WIDTH_MM - title_width) / 2.0),
                Mm(PAGE_HEIGHT_MM - (MARGIN_MM + 6.5)),
                &bold,
            );
            draw_row(&layer, &bold, header_top, COLUMNS.iter().copied());
        }

        for &(index, top) in &page.rows {
            let cells = table.rows[index].cells.iter().map(String::as_str);
            draw_row(&layer, &font, top, cells);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Pdf(format!("save: {e}")))?;
    buf.into_inner()
        .map_err(|e| ReportError::Pdf(format!("buffer: {e}")))
}

fn draw_row<'a>(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    top: f32,
    cells: impl Iterator<Item = &'a str>,
) {
    let mut left = MARGIN_MM;
    for (text, width) in cells.zip(COLUMN_WIDTHS_MM) {
        draw_cell_border(layer, left, top, width);
        let text = fit_to_width(text, width - 2.0, CELL_SIZE);
        if !text.is_empty() {
            layer.use_text(
                text,
                CELL_SIZE,
                Mm(left + 1.0),
                Mm(PAGE_HEIGHT_MM - (top + 6.5)),
                font,
            );
        }
        left += width;
    }
}

fn draw_cell_border(layer: &PdfLayerReference, left: f32, top: f32, width: f32) {
    let y_top = PAGE_HEIGHT_MM - top;
    let y_bottom = y_top - ROW_HEIGHT_MM;
    let right = left + width;
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(left), Mm(y_top)), false),
            (Point::new(Mm(right), Mm(y_top)), false),
            (Point::new(Mm(right), Mm(y_bottom)), false),
            (Point::new(Mm(left), Mm(y_bottom)), false),
        ],
        is_closed: true,
    });
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_CHAR_EM * PT_TO_MM
}

/// Cut `text` so it stays inside a cell of `width` mm.
fn fit_to_width(text: &str, width: f32, size: f32) -> String {
    let max_chars = (width / (size * AVG_CHAR_EM * PT_TO_MM)).floor() as usize;
    text.chars().take(max_chars).collect()
}
