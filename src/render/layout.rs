// src/render/layout.rs
//
// Grid-flow pagination. Each page is one 2x2 table; cells are filled
// top-left, bottom-left, top-right, bottom-right. Every subquestion
// occupies exactly one cell; a new grid starts as soon as the
// bottom-right cell has been used. All state is call-scoped: one
// manager per export, never shared.

use crate::{
    error::AppError,
    render::{
        math::render_math,
        media::ProbedImage,
        rich_text::{Segment, SpanAttributes, parse_rich_text, segment_latex},
    },
};

/// Fill order within a grid: top-left, bottom-left, top-right, bottom-right.
pub const CELL_ORDER: [(usize, usize); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

/// Cell capacity estimate, matching the fixed cell geometry.
pub const MAX_LINES_PER_CELL: usize = 20;
pub const MAX_CHARS_PER_LINE: usize = 70;

/// Column width in twentieths of a point (3.75 inches).
pub const CELL_WIDTH_DXA: usize = 5400;
/// Exact row height in twips (12.62 cm).
pub const ROW_HEIGHT_TWIPS: u32 = 7150;
/// Embedded images are scaled to half the cell width (1.875 inches).
pub const IMAGE_WIDTH_EMU: u32 = 1_714_500;

/// One styled run of cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Rendered math fragment; set in italics when materialized.
    pub math: bool,
}

impl RunSpec {
    fn plain(text: impl Into<String>) -> Self {
        RunSpec {
            text: text.into(),
            bold: false,
            italic: false,
            underline: false,
            math: false,
        }
    }

    fn styled(text: impl Into<String>, attributes: &SpanAttributes) -> Self {
        RunSpec {
            text: text.into(),
            bold: attributes.bold,
            italic: attributes.italic,
            underline: attributes.underline,
            math: false,
        }
    }

    fn math(text: impl Into<String>) -> Self {
        RunSpec {
            text: text.into(),
            bold: false,
            italic: false,
            underline: false,
            math: true,
        }
    }
}

/// One block of cell content, in flow order.
#[derive(Debug, Clone, PartialEq)]
pub enum CellBlock {
    Paragraph { runs: Vec<RunSpec>, justify: bool },
    /// Box spans rendered as a bordered inset at ~50% of the cell width.
    BoxInset { runs: Vec<RunSpec> },
    Image { image: ProbedImage, width_emu: u32, height_emu: u32 },
}

pub type Cell = Vec<CellBlock>;

/// One 2x2 page of cells, indexed `[row][col]`.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    pub cells: [[Cell; 2]; 2],
}

/// A sub-question to place: its rich-markup text and up to 5 option markups.
#[derive(Debug, Clone)]
pub struct SubquestionInput {
    pub text_markup: String,
    pub option_markups: Vec<String>,
}

/// Call-scoped pagination state for one export.
#[derive(Debug, Default)]
pub struct TableFlowManager {
    grids: Vec<Grid>,
    cell_index: usize,
    question_number: u32,
    answers: Vec<(u32, i64)>,
}

impl TableFlowManager {
    pub fn new() -> Self {
        TableFlowManager {
            grids: Vec::new(),
            // Start exhausted so the first cell allocates the first grid.
            cell_index: CELL_ORDER.len(),
            question_number: 0,
            answers: Vec::new(),
        }
    }

    pub fn grids(&self) -> &[Grid] {
        &self.grids
    }

    pub fn answers(&self) -> &[(u32, i64)] {
        &self.answers
    }

    /// Advances to the next cell coordinate, allocating a new grid when
    /// the previous one is exhausted.
    pub fn next_cell(&mut self) -> (usize, usize) {
        if self.cell_index >= CELL_ORDER.len() {
            self.grids.push(Grid::default());
            self.cell_index = 0;
        }
        let coordinate = CELL_ORDER[self.cell_index];
        self.cell_index += 1;
        coordinate
    }

    /// Places one question's sub-questions, one cell each.
    ///
    /// The first sub-question's cell additionally carries the shared
    /// passage and, when present, the embedded image (scaled to half the
    /// cell width). Option lines are numbered `(1)`..`(5)`; every
    /// sub-question line is prefixed with the next running number.
    pub fn add_question(
        &mut self,
        passage_text: &str,
        subquestions: &[SubquestionInput],
        image: Option<&ProbedImage>,
    ) -> Result<(), AppError> {
        for (index, subquestion) in subquestions.iter().enumerate() {
            self.question_number += 1;
            let number = self.question_number;

            let mut blocks: Vec<CellBlock> = Vec::new();

            // Question line: "{n}. " + rendered markup.
            let prefix = RunSpec::plain(format!("{}. ", number));
            append_markup(&mut blocks, &subquestion.text_markup, Some(prefix), false)?;

            if index == 0 {
                if !passage_text.is_empty() {
                    blocks.push(CellBlock::Paragraph {
                        runs: vec![RunSpec::plain(passage_text)],
                        justify: true,
                    });
                }
                if let Some(probed) = image {
                    let (width_emu, height_emu) = probed.scaled_to_width(IMAGE_WIDTH_EMU);
                    blocks.push(CellBlock::Image {
                        image: probed.clone(),
                        width_emu,
                        height_emu,
                    });
                }
            }

            for (option_index, option_markup) in subquestion.option_markups.iter().enumerate() {
                if option_markup.trim().is_empty() {
                    continue;
                }
                let flattened = option_markup.replace('\n', "");
                let prefix = RunSpec::plain(format!("({}) ", option_index + 1));
                append_markup(&mut blocks, &flattened, Some(prefix), false)?;
            }

            let blocks = fit_to_cell(blocks, number);

            let (row, col) = self.next_cell();
            self.grids
                .last_mut()
                .expect("next_cell allocated a grid")
                .cells[row][col] = blocks;
        }

        Ok(())
    }

    /// Records the answer key, rendered as a dedicated trailing section
    /// after a forced page break.
    pub fn add_answers(&mut self, answers: &[(u32, i64)]) {
        self.answers.extend_from_slice(answers);
    }
}

/// Renders one markup string into paragraph/box blocks, splitting LaTeX
/// spans into math runs and buffering box spans until a non-box span (or
/// the end of the list) flushes them as one bordered inset. Blocks are
/// emitted in span order: text before a box stays above the inset, text
/// after it starts a fresh paragraph below.
fn append_markup(
    blocks: &mut Vec<CellBlock>,
    markup: &str,
    prefix: Option<RunSpec>,
    justify: bool,
) -> Result<(), AppError> {
    let spans = parse_rich_text(markup)?;

    let mut runs: Vec<RunSpec> = prefix.into_iter().collect();
    let mut box_runs: Vec<RunSpec> = Vec::new();

    for span in &spans {
        if !span.attributes.boxed && !box_runs.is_empty() {
            if !runs.is_empty() {
                blocks.push(CellBlock::Paragraph {
                    runs: std::mem::take(&mut runs),
                    justify,
                });
            }
            blocks.push(CellBlock::BoxInset {
                runs: std::mem::take(&mut box_runs),
            });
        }

        let target = if span.attributes.boxed {
            &mut box_runs
        } else {
            &mut runs
        };

        for segment in segment_latex(&span.insert) {
            match segment {
                Segment::Text(text) => {
                    let text = text.trim_end_matches('\n');
                    if !text.is_empty() {
                        target.push(RunSpec::styled(text, &span.attributes));
                    }
                }
                Segment::Latex(latex) => {
                    let fragment = render_math(&latex)?;
                    target.push(RunSpec::math(fragment.text));
                }
            }
        }
    }

    if !box_runs.is_empty() {
        if !runs.is_empty() {
            blocks.push(CellBlock::Paragraph {
                runs: std::mem::take(&mut runs),
                justify,
            });
        }
        blocks.push(CellBlock::BoxInset { runs: box_runs });
    } else if !runs.is_empty() {
        blocks.push(CellBlock::Paragraph { runs, justify });
    }

    Ok(())
}

fn block_chars(runs: &[RunSpec]) -> usize {
    runs.iter().map(|r| r.text.chars().count()).sum()
}

fn estimated_lines(block: &CellBlock) -> usize {
    match block {
        CellBlock::Paragraph { runs, .. } => block_chars(runs).div_ceil(MAX_CHARS_PER_LINE).max(1),
        // Half-width inset wraps twice as often, plus its border padding.
        CellBlock::BoxInset { runs } => {
            block_chars(runs).div_ceil(MAX_CHARS_PER_LINE / 2).max(1) + 1
        }
        CellBlock::Image { height_emu, .. } => {
            // One text line is roughly 357 twips of the 7150-twip cell.
            let height_twips = height_emu / 635;
            (height_twips / 357).max(1) as usize
        }
    }
}

/// Overflow policy: content past the cell's estimated capacity is
/// truncated with an ellipsis rather than spilling into the next cell.
fn fit_to_cell(blocks: Vec<CellBlock>, question_number: u32) -> Vec<CellBlock> {
    let mut used = 0usize;
    let mut fitted: Vec<CellBlock> = Vec::new();
    let mut truncated = false;

    for block in blocks {
        let lines = estimated_lines(&block);
        if used + lines <= MAX_LINES_PER_CELL {
            used += lines;
            fitted.push(block);
            continue;
        }

        truncated = true;

        // A paragraph can be cut to the remaining line budget; other
        // block kinds are dropped whole.
        if let CellBlock::Paragraph { runs, justify } = block {
            let remaining_chars = (MAX_LINES_PER_CELL - used) * MAX_CHARS_PER_LINE;
            if remaining_chars > 0 {
                let mut kept: Vec<RunSpec> = Vec::new();
                let mut budget = remaining_chars;
                for mut run in runs {
                    let len = run.text.chars().count();
                    if len <= budget {
                        budget -= len;
                        kept.push(run);
                    } else {
                        run.text = run
                            .text
                            .chars()
                            .take(budget.saturating_sub(1))
                            .collect::<String>()
                            + "\u{2026}";
                        kept.push(run);
                        break;
                    }
                }
                fitted.push(CellBlock::Paragraph { runs: kept, justify });
            }
        }
        break;
    }

    if truncated {
        tracing::warn!(
            "Sub-question {} exceeds cell capacity, content truncated",
            question_number
        );
    }

    fitted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subquestion(text: &str) -> SubquestionInput {
        SubquestionInput {
            text_markup: text.to_string(),
            option_markups: vec![
                "option one".to_string(),
                "option two".to_string(),
                "option three".to_string(),
                "option four".to_string(),
                "option five".to_string(),
            ],
        }
    }

    #[test]
    fn cell_order_cycles_through_grid() {
        let mut flow = TableFlowManager::new();
        let visited: Vec<(usize, usize)> = (0..6).map(|_| flow.next_cell()).collect();
        assert_eq!(
            visited,
            vec![(0, 0), (1, 0), (0, 1), (1, 1), (0, 0), (1, 0)]
        );
        assert_eq!(flow.grids().len(), 2);
    }

    #[test]
    fn n_subquestions_allocate_ceil_n_over_4_grids() {
        for n in 1usize..=9 {
            let mut flow = TableFlowManager::new();
            let subs: Vec<SubquestionInput> = (0..n).map(|_| subquestion("q")).collect();
            flow.add_question("passage", &subs, None).unwrap();
            assert_eq!(flow.grids().len(), n.div_ceil(4), "n = {}", n);
        }
    }

    #[test]
    fn nth_subquestion_lands_in_expected_cell() {
        let mut flow = TableFlowManager::new();
        let subs: Vec<SubquestionInput> =
            (0..7).map(|i| subquestion(&format!("question {}", i))).collect();
        flow.add_question("", &subs, None).unwrap();

        for (n, expected_cell) in CELL_ORDER.iter().cycle().take(7).enumerate() {
            let grid = &flow.grids()[n / 4];
            let cell = &grid.cells[expected_cell.0][expected_cell.1];
            assert!(!cell.is_empty(), "sub-question {} missing", n);
        }
    }

    #[test]
    fn question_numbers_run_across_calls() {
        let mut flow = TableFlowManager::new();
        flow.add_question("", &[subquestion("a"), subquestion("b")], None)
            .unwrap();
        flow.add_question("", &[subquestion("c")], None).unwrap();

        let first_cell = &flow.grids()[0].cells[0][1]; // third sub-question
        let CellBlock::Paragraph { runs, .. } = &first_cell[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(runs[0].text, "3. ");
    }

    #[test]
    fn passage_and_options_go_to_first_cell_only() {
        let mut flow = TableFlowManager::new();
        flow.add_question("shared passage", &[subquestion("a"), subquestion("b")], None)
            .unwrap();

        let first = &flow.grids()[0].cells[0][0];
        let second = &flow.grids()[0].cells[1][0];

        let first_text: Vec<String> = first
            .iter()
            .filter_map(|b| match b {
                CellBlock::Paragraph { runs, .. } => {
                    Some(runs.iter().map(|r| r.text.clone()).collect::<String>())
                }
                _ => None,
            })
            .collect();
        assert!(first_text.iter().any(|t| t == "shared passage"));

        let second_text: Vec<String> = second
            .iter()
            .filter_map(|b| match b {
                CellBlock::Paragraph { runs, .. } => {
                    Some(runs.iter().map(|r| r.text.clone()).collect::<String>())
                }
                _ => None,
            })
            .collect();
        assert!(!second_text.iter().any(|t| t == "shared passage"));
        // Options render in both cells, numbered from (1).
        assert!(second_text.iter().any(|t| t.starts_with("(1) ")));
    }

    #[test]
    fn latex_spans_become_math_runs() {
        let mut flow = TableFlowManager::new();
        let sub = SubquestionInput {
            text_markup: r#"[{"insert":"area [:x^{2}] here"}]"#.to_string(),
            option_markups: Vec::new(),
        };
        flow.add_question("", &[sub], None).unwrap();

        let cell = &flow.grids()[0].cells[0][0];
        let CellBlock::Paragraph { runs, .. } = &cell[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(runs.len(), 4); // prefix, text, math, text
        assert!(runs[2].math);
        assert_eq!(runs[2].text, "x\u{b2}");
    }

    #[test]
    fn math_failure_aborts_placement() {
        let mut flow = TableFlowManager::new();
        let sub = SubquestionInput {
            text_markup: r#"[{"insert":"bad [:\\nope] math"}]"#.to_string(),
            option_markups: Vec::new(),
        };
        let err = flow.add_question("", &[sub], None).unwrap_err();
        assert!(matches!(err, AppError::RenderError(_)));
    }

    #[test]
    fn box_spans_flush_as_inset() {
        let mut flow = TableFlowManager::new();
        let sub = SubquestionInput {
            text_markup: concat!(
                r#"[{"insert":"before "},"#,
                r#"{"insert":"boxed text","attributes":{"box":true}},"#,
                r#"{"insert":" after"}]"#
            )
            .to_string(),
            option_markups: Vec::new(),
        };
        flow.add_question("", &[sub], None).unwrap();

        let cell = &flow.grids()[0].cells[0][0];
        assert!(cell.iter().any(|b| matches!(
            b,
            CellBlock::BoxInset { runs } if runs[0].text == "boxed text"
        )));
    }

    #[test]
    fn box_inset_keeps_surrounding_text_order() {
        let mut flow = TableFlowManager::new();
        let sub = SubquestionInput {
            text_markup: concat!(
                r#"[{"insert":"before "},"#,
                r#"{"insert":"boxed","attributes":{"box":true}},"#,
                r#"{"insert":" after"}]"#
            )
            .to_string(),
            option_markups: Vec::new(),
        };
        flow.add_question("", &[sub], None).unwrap();

        let cell = &flow.grids()[0].cells[0][0];
        assert_eq!(cell.len(), 3);

        let CellBlock::Paragraph { runs, .. } = &cell[0] else {
            panic!("text before the box must render first");
        };
        assert_eq!(runs.last().unwrap().text, "before ");

        let CellBlock::BoxInset { runs } = &cell[1] else {
            panic!("box inset must follow the leading text");
        };
        assert_eq!(runs[0].text, "boxed");

        let CellBlock::Paragraph { runs, .. } = &cell[2] else {
            panic!("text after the box must start a new paragraph");
        };
        assert_eq!(runs[0].text, " after");
    }

    #[test]
    fn trailing_box_span_renders_below_its_text() {
        let mut flow = TableFlowManager::new();
        let sub = SubquestionInput {
            text_markup: concat!(
                r#"[{"insert":"lead-in"},"#,
                r#"{"insert":"summary box","attributes":{"box":true}}]"#
            )
            .to_string(),
            option_markups: Vec::new(),
        };
        flow.add_question("", &[sub], None).unwrap();

        let cell = &flow.grids()[0].cells[0][0];
        assert_eq!(cell.len(), 2);
        assert!(matches!(&cell[0], CellBlock::Paragraph { .. }));
        assert!(matches!(
            &cell[1],
            CellBlock::BoxInset { runs } if runs[0].text == "summary box"
        ));
    }

    #[test]
    fn oversized_subquestion_is_truncated() {
        let mut flow = TableFlowManager::new();
        let long = "x".repeat(MAX_LINES_PER_CELL * MAX_CHARS_PER_LINE * 2);
        let sub = SubquestionInput {
            text_markup: long,
            option_markups: Vec::new(),
        };
        flow.add_question("", &[sub], None).unwrap();

        let cell = &flow.grids()[0].cells[0][0];
        let total: usize = cell.iter().map(estimated_lines).sum();
        assert!(total <= MAX_LINES_PER_CELL);
        let CellBlock::Paragraph { runs, .. } = &cell[0] else {
            panic!("expected paragraph");
        };
        assert!(runs.last().unwrap().text.ends_with('\u{2026}'));
    }

    #[test]
    fn answers_are_recorded_in_order() {
        let mut flow = TableFlowManager::new();
        flow.add_answers(&[(1, 3), (2, 5)]);
        assert_eq!(flow.answers(), &[(1, 3), (2, 5)]);
    }
}
