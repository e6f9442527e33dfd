//! Reference table of common CAT commands.
//!
//! Templates carry at most one printf-style integer placeholder (`%d`,
//! `%03d`, `%07d`, ...) which [`render`] fills in. The table is the default
//! command set; user-defined templates go through the same functions.

use crate::error::{CatError, CatResult};

/// A single catalog command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Command template, e.g. `FA%07d;`.
    pub template: &'static str,
    /// Human-readable description.
    pub description: &'static str,
}

/// A named group of catalog commands.
#[derive(Debug, Clone, Copy)]
pub struct CatalogGroup {
    /// Group name shown to the operator.
    pub name: &'static str,
    /// Commands in the group.
    pub entries: &'static [CatalogEntry],
}

const fn entry(template: &'static str, description: &'static str) -> CatalogEntry {
    CatalogEntry { template, description }
}

/// All catalog groups, in display order.
pub const CATALOG: &[CatalogGroup] = &[
    CatalogGroup {
        name: "Frequency Control",
        entries: &[
            entry("FA%07d;", "Set VFO A frequency (Hz)"),
            entry("FB%07d;", "Set VFO B frequency (Hz)"),
            entry("FT0;", "Select VFO A"),
            entry("FT1;", "Select VFO B"),
        ],
    },
    CatalogGroup {
        name: "Mode Control",
        entries: &[
            entry(
                "MD%02d;",
                "Set mode (0=LSB,1=USB,2=AM,3=CW,4=FM,5=RY,6=ECSS,7=FM-N,8=DV,9=FM-D,10=FM-W)",
            ),
            entry("MD;", "Get mode"),
        ],
    },
    CatalogGroup {
        name: "Memory",
        entries: &[
            entry("LM1%d;", "Recall memory channel"),
            entry("MS%d;", "Set memory channel"),
            entry("MR;", "Recall memory"),
        ],
    },
    CatalogGroup {
        name: "Power and Audio",
        entries: &[
            entry("PC%d;", "Set power level"),
            entry("AG0%03d;", "Set AF gain (volume) 0-255"),
        ],
    },
    CatalogGroup {
        name: "Other",
        entries: &[
            entry("PB0%d;", "Pushbutton macro"),
            entry("KC14;", "Left arrow"),
            entry("KC13;", "Up arrow"),
            entry("KC15;", "Right arrow"),
            entry("KC16;", "Down arrow"),
            entry("BI0;", "Break-In off"),
            entry("BI1;", "Break-In on"),
            entry("ML1;", "Get Monitor Level"),
        ],
    },
];

/// Parsed `%[0][width]d` placeholder.
#[derive(Debug, PartialEq, Eq)]
struct Placeholder {
    start: usize,
    end: usize,
    zero_pad: bool,
    width: usize,
}

/// Whether a command template contains a placeholder.
pub fn takes_value(template: &str) -> bool {
    find_placeholder(template).is_some()
}

/// Fill the placeholder of any command template.
///
/// Fails when a placeholder has no value, or a value is given for a
/// template without one.
pub fn render(template: &str, value: Option<u32>) -> CatResult<String> {
    match (find_placeholder(template), value) {
        (None, None) => Ok(template.to_string()),
        (None, Some(_)) => Err(CatError::InvalidCommand(format!(
            "{} takes no value",
            template
        ))),
        (Some(_), None) => Err(CatError::InvalidCommand(format!(
            "{} needs a value",
            template
        ))),
        (Some(p), Some(value)) => {
            let digits = if p.zero_pad {
                format!("{:0width$}", value, width = p.width)
            } else {
                format!("{:width$}", value, width = p.width)
            };
            Ok(format!("{}{}{}", &template[..p.start], digits, &template[p.end..]))
        }
    }
}

fn find_placeholder(template: &str) -> Option<Placeholder> {
    let start = template.find('%')?;
    let conversion = &template[start + 1..];
    let d = conversion.find('d')?;
    let flags = &conversion[..d];
    if !flags.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let zero_pad = flags.starts_with('0');
    let width = flags.parse().unwrap_or(0);
    Some(Placeholder {
        start,
        end: start + 1 + d + 1,
        zero_pad,
        width,
    })
}
