// src/render/math.rs
//
// LaTeX to math-fragment conversion. The layout engine treats this as a
// pure collaborator: any failure here is a hard RenderError that aborts
// the whole export, so a document is either complete or not produced.

use crate::error::AppError;

/// A rendered math run: the original LaTeX source plus the Unicode text
/// embedded into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathFragment {
    pub latex: String,
    pub text: String,
}

/// Converts a LaTeX expression into a Unicode math fragment.
///
/// Supports the command subset that occurs in exam material: fractions,
/// roots, super/subscripts, greek letters, and common operators.
/// Unbalanced braces or unknown commands are rejected.
pub fn render_math(latex: &str) -> Result<MathFragment, AppError> {
    let source = latex.trim();
    if source.is_empty() {
        return Err(AppError::RenderError("Empty LaTeX span".to_string()));
    }

    let chars: Vec<char> = source.chars().collect();
    let mut pos = 0;
    let text = parse_sequence(&chars, &mut pos, None)?;

    if pos < chars.len() {
        return Err(AppError::RenderError(format!(
            "Unbalanced braces in LaTeX: {}",
            source
        )));
    }

    Ok(MathFragment {
        latex: source.to_string(),
        text,
    })
}

/// Parses until end of input or the given closing delimiter.
fn parse_sequence(
    chars: &[char],
    pos: &mut usize,
    until: Option<char>,
) -> Result<String, AppError> {
    let mut out = String::new();

    while *pos < chars.len() {
        let c = chars[*pos];

        if Some(c) == until {
            *pos += 1;
            return Ok(out);
        }

        match c {
            '\\' => {
                *pos += 1;
                let command = read_command(chars, pos);
                out.push_str(&expand_command(&command, chars, pos)?);
            }
            '{' => {
                *pos += 1;
                out.push_str(&parse_sequence(chars, pos, Some('}'))?);
            }
            '}' => {
                return Err(AppError::RenderError(
                    "Unbalanced braces in LaTeX".to_string(),
                ));
            }
            '^' => {
                *pos += 1;
                let arg = parse_argument(chars, pos)?;
                out.push_str(&script(&arg, SUPERSCRIPTS, '^'));
            }
            '_' => {
                *pos += 1;
                let arg = parse_argument(chars, pos)?;
                out.push_str(&script(&arg, SUBSCRIPTS, '_'));
            }
            _ => {
                out.push(c);
                *pos += 1;
            }
        }
    }

    if until.is_some() {
        return Err(AppError::RenderError(
            "Unbalanced braces in LaTeX".to_string(),
        ));
    }

    Ok(out)
}

/// Reads one `{...}` group or a single character.
fn parse_argument(chars: &[char], pos: &mut usize) -> Result<String, AppError> {
    match chars.get(*pos) {
        Some('{') => {
            *pos += 1;
            parse_sequence(chars, pos, Some('}'))
        }
        Some('\\') => {
            *pos += 1;
            let command = read_command(chars, pos);
            expand_command(&command, chars, pos)
        }
        Some(&c) => {
            *pos += 1;
            Ok(c.to_string())
        }
        None => Err(AppError::RenderError(
            "Missing script argument in LaTeX".to_string(),
        )),
    }
}

fn read_command(chars: &[char], pos: &mut usize) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.get(*pos) {
        if c.is_ascii_alphabetic() {
            name.push(c);
            *pos += 1;
        } else {
            break;
        }
    }
    // Single-symbol escapes like `\{`.
    if name.is_empty() {
        if let Some(&c) = chars.get(*pos) {
            name.push(c);
            *pos += 1;
        }
    }
    name
}

fn expand_command(command: &str, chars: &[char], pos: &mut usize) -> Result<String, AppError> {
    match command {
        "frac" => {
            let numerator = parse_argument(chars, pos)?;
            let denominator = parse_argument(chars, pos)?;
            Ok(format!("{}/{}", group(&numerator), group(&denominator)))
        }
        "sqrt" => {
            let radicand = parse_argument(chars, pos)?;
            Ok(format!("\u{221a}({})", radicand))
        }
        // Sizing commands carry no content of their own.
        "left" | "right" => Ok(String::new()),
        _ => SYMBOLS
            .iter()
            .find(|(name, _)| *name == command)
            .map(|(_, symbol)| symbol.to_string())
            .ok_or_else(|| {
                AppError::RenderError(format!("Unknown LaTeX command: \\{}", command))
            }),
    }
}

/// Parenthesizes multi-character operands of a fraction.
fn group(operand: &str) -> String {
    if operand.chars().count() > 1 {
        format!("({})", operand)
    } else {
        operand.to_string()
    }
}

/// Maps every character through the given script table, falling back to
/// `marker(...)` notation when any character has no script form.
fn script(arg: &str, table: &[(char, char)], marker: char) -> String {
    let mapped: Option<String> = arg
        .chars()
        .map(|c| table.iter().find(|(from, _)| *from == c).map(|(_, to)| *to))
        .collect();

    match mapped {
        Some(scripted) => scripted,
        None => format!("{}({})", marker, arg),
    }
}

const SYMBOLS: &[(&str, &str)] = &[
    ("times", "\u{d7}"),
    ("div", "\u{f7}"),
    ("pm", "\u{b1}"),
    ("cdot", "\u{b7}"),
    ("le", "\u{2264}"),
    ("leq", "\u{2264}"),
    ("ge", "\u{2265}"),
    ("geq", "\u{2265}"),
    ("ne", "\u{2260}"),
    ("neq", "\u{2260}"),
    ("infty", "\u{221e}"),
    ("pi", "\u{3c0}"),
    ("theta", "\u{3b8}"),
    ("alpha", "\u{3b1}"),
    ("beta", "\u{3b2}"),
    ("gamma", "\u{3b3}"),
    ("delta", "\u{3b4}"),
    ("lambda", "\u{3bb}"),
    ("mu", "\u{3bc}"),
    ("sigma", "\u{3c3}"),
    ("sum", "\u{2211}"),
    ("int", "\u{222b}"),
    ("rightarrow", "\u{2192}"),
    ("leftarrow", "\u{2190}"),
    ("degree", "\u{b0}"),
    ("circ", "\u{b0}"),
    ("{", "{"),
    ("}", "}"),
    ("\\", " "),
    (",", " "),
    (" ", " "),
];

const SUPERSCRIPTS: &[(char, char)] = &[
    ('0', '\u{2070}'),
    ('1', '\u{b9}'),
    ('2', '\u{b2}'),
    ('3', '\u{b3}'),
    ('4', '\u{2074}'),
    ('5', '\u{2075}'),
    ('6', '\u{2076}'),
    ('7', '\u{2077}'),
    ('8', '\u{2078}'),
    ('9', '\u{2079}'),
    ('n', '\u{207f}'),
    ('+', '\u{207a}'),
    ('-', '\u{207b}'),
];

const SUBSCRIPTS: &[(char, char)] = &[
    ('0', '\u{2080}'),
    ('1', '\u{2081}'),
    ('2', '\u{2082}'),
    ('3', '\u{2083}'),
    ('4', '\u{2084}'),
    ('5', '\u{2085}'),
    ('6', '\u{2086}'),
    ('7', '\u{2087}'),
    ('8', '\u{2088}'),
    ('9', '\u{2089}'),
    ('n', '\u{2099}'),
];
