use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::io::{BufRead, Write};

/// What the session does with every frame. Picked once before the loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Report the color under the center box, no telemetry.
    #[serde(rename = "calibration")]
    Calibration,
    /// Aim at the largest goal in view.
    #[serde(rename = "shooting")]
    TrackingShooting,
    /// Aim between the two blocks flanking the gear peg.
    #[serde(rename = "gear")]
    TrackingGear,
}

impl Mode {
    pub fn is_tracking(&self) -> bool {
        !matches!(self, Mode::Calibration)
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Calibration => "calibration",
            Mode::TrackingShooting => "shooting",
            Mode::TrackingGear => "gear",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calibration" | "cal" => Ok(Mode::Calibration),
            "shooting" | "shoot" => Ok(Mode::TrackingShooting),
            "gear" | "gears" => Ok(Mode::TrackingGear),
            other => Err(Error::Config(format!("unknown mode '{other}'"))),
        }
    }
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> crate::Result<bool> {
    write!(output, "{question} (y/n) ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    Ok(line.trim().eq_ignore_ascii_case("y"))
}

/// Walks the operator through the startup questions.
///
/// Calibration wins over tracking, and shooting wins over gear when both are
/// answered yes. Saying no to every tracking flavour is an error rather than a
/// session that publishes nothing.
pub fn prompt_mode<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> crate::Result<Mode> {
    if ask(input, output, "Calibration mode on?")? {
        return Ok(Mode::Calibration);
    }
    if !ask(input, output, "Tracking mode on?")? {
        return Err(Error::NoMode);
    }
    if ask(input, output, "Shooting mode on?")? {
        return Ok(Mode::TrackingShooting);
    }
    if ask(input, output, "Gears mode on?")? {
        return Ok(Mode::TrackingGear);
    }

    Err(Error::NoMode)
}
