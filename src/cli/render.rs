//! Plain-text rendering of a prediction for terminal output.

use crate::domain::PredictionResult;

const BAR_WIDTH: usize = 50;

/// Render a result card: probability, risk tier and a progress bar.
///
/// With `color`, the tier line and bar are painted in the tier's colour
/// using 24-bit ANSI escapes.
#[must_use]
pub fn render_card(result: &PredictionResult, color: bool) -> String {
    let pct = result.progress_percent();
    let filled = usize::from(pct) * BAR_WIDTH / 100;

    let tier_line = format!(
        "{} RISK - {}",
        result.risk_tier,
        result.risk_tier.description()
    );
    let bar = format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        pct
    );
    let (tier_line, bar) = if color {
        let (r, g, b) = result.risk_tier.color();
        (paint(&tier_line, r, g, b), paint(&bar, r, g, b))
    } else {
        (tier_line, bar)
    };

    format!(
        "Probability: {:.2}%\n{tier_line}\n{bar}\n\nNot a medical device. For educational use only.\n",
        result.probability,
    )
}

fn paint(text: &str, r: u8, g: u8, b: u8) -> String {
    format!("\x1b[1;38;2;{r};{g};{b}m{text}\x1b[0m")
}
