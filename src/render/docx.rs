// src/render/docx.rs
//
// Materializes accumulated layout state into DOCX bytes via docx-rs.
// Geometry is fixed: two 3.75in columns, exact row heights so two rows
// fill one page and successive grids flow onto successive pages.

use std::io::Cursor;

use docx_rs::{
    AlignmentType, BreakType, Docx, HeightRule, Paragraph, Pic, Run, RunFonts, Table, TableCell,
    TableLayoutType, TableRow, WidthType,
};

use crate::{
    error::AppError,
    render::layout::{
        CELL_WIDTH_DXA, CellBlock, Grid, ROW_HEIGHT_TWIPS, RunSpec, TableFlowManager,
    },
};

const FONT_NAME: &str = "Times New Roman";
/// 9pt body text, in half-points.
const FONT_SIZE: usize = 18;
/// Box insets span ~50% of the parent cell.
const BOX_WIDTH_DXA: usize = 2700;

/// Packs the finished layout into DOCX bytes.
pub fn pack_document(flow: &TableFlowManager) -> Result<Vec<u8>, AppError> {
    let mut docx = Docx::new();

    for grid in flow.grids() {
        docx = docx.add_table(build_grid_table(grid));
    }

    if !flow.answers().is_empty() {
        docx = docx.add_paragraph(
            Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
        );
        docx = docx.add_paragraph(
            Paragraph::new().add_run(
                Run::new()
                    .add_text("정답")
                    .bold()
                    .size(FONT_SIZE)
                    .fonts(RunFonts::new().ascii(FONT_NAME)),
            ),
        );
        for (number, answer) in flow.answers() {
            docx = docx.add_paragraph(
                Paragraph::new().add_run(
                    Run::new()
                        .add_text(format!("({}) {}", number, answer))
                        .size(FONT_SIZE)
                        .fonts(RunFonts::new().ascii(FONT_NAME)),
                ),
            );
        }
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| AppError::InternalServerError(format!("Failed to pack document: {}", e)))?;

    Ok(cursor.into_inner())
}

fn build_grid_table(grid: &Grid) -> Table {
    let mut rows = Vec::with_capacity(2);
    for row_cells in &grid.cells {
        let cells: Vec<TableCell> = row_cells.iter().map(|cell| build_cell(cell)).collect();
        rows.push(
            TableRow::new(cells)
                .row_height(ROW_HEIGHT_TWIPS as f32)
                .height_rule(HeightRule::Exact),
        );
    }

    Table::new(rows)
        .set_grid(vec![CELL_WIDTH_DXA, CELL_WIDTH_DXA])
        .layout(TableLayoutType::Fixed)
        .width(CELL_WIDTH_DXA * 2, WidthType::Dxa)
}

fn build_cell(blocks: &[CellBlock]) -> TableCell {
    let mut cell = TableCell::new().width(CELL_WIDTH_DXA, WidthType::Dxa);

    for block in blocks {
        match block {
            CellBlock::Paragraph { runs, justify } => {
                cell = cell.add_paragraph(build_paragraph(runs, *justify));
            }
            CellBlock::BoxInset { runs } => {
                let inset = Table::new(vec![TableRow::new(vec![
                    TableCell::new()
                        .add_paragraph(build_paragraph(runs, false))
                        .width(BOX_WIDTH_DXA, WidthType::Dxa),
                ])])
                .set_grid(vec![BOX_WIDTH_DXA])
                .layout(TableLayoutType::Fixed)
                .width(BOX_WIDTH_DXA, WidthType::Dxa);
                cell = cell.add_table(inset);
            }
            CellBlock::Image {
                image,
                width_emu,
                height_emu,
            } => {
                let pic = Pic::new(&image.bytes).size(*width_emu, *height_emu);
                cell = cell.add_paragraph(
                    Paragraph::new().add_run(Run::new().add_image(pic)),
                );
            }
        }
    }

    cell
}

fn build_paragraph(runs: &[RunSpec], justify: bool) -> Paragraph {
    let mut paragraph = Paragraph::new();
    for spec in runs {
        paragraph = paragraph.add_run(build_run(spec));
    }
    paragraph.align(if justify {
        AlignmentType::Both
    } else {
        AlignmentType::Left
    })
}

fn build_run(spec: &RunSpec) -> Run {
    let mut run = Run::new()
        .add_text(spec.text.as_str())
        .size(FONT_SIZE)
        .fonts(RunFonts::new().ascii(FONT_NAME));
    if spec.bold {
        run = run.bold();
    }
    // Math fragments are set in italics, conventional for formula runs.
    if spec.italic || spec.math {
        run = run.italic();
    }
    if spec.underline {
        run = run.underline("single");
    }
    run
}
