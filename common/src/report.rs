//! Plain-text rendering of prediction results for terminals.
//!
use std::fmt;

use crate::protocol::{ClassScore, PredictResponse};

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Number of cells in a score bar. Each cell stands for five percent.
pub const BAR_CELLS: usize = 20;

/// Render a percentage as a fixed-width bar of full and empty cells.
pub fn score_bar(percent: f32) -> String {
    let filled = ((percent / 5.0).floor().max(0.0) as usize).min(BAR_CELLS);
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(BAR_CELLS - filled));
    bar
}

/// Ranked list of all class scores, one line per class.
pub struct Ranking<'a>(pub &'a [ClassScore]);

impl fmt::Display for Ranking<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for score in self.0.iter() {
            writeln!(
                f,
                "{:20} {:5.1}% {}",
                score.name,
                score.percent,
                score_bar(score.percent)
            )?;
        }
        Ok(())
    }
}

/// Full prediction report with diagnosis, advice and ranking.
pub struct Report<'a>(pub &'a PredictResponse);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resp = self.0;

        writeln!(f, "{} DETECTED DISEASE", resp.icon)?;
        writeln!(f, "{DIVIDER}")?;
        writeln!(f, "Disease:    {}", resp.predicted_disease)?;
        writeln!(f, "Confidence: {:.1}%", resp.confidence)?;
        writeln!(f, "Severity:   {} {}", resp.severity.icon(), resp.severity)?;
        writeln!(f, "{DIVIDER}")?;
        writeln!(f, "Type: {}\n", resp.kind)?;
        writeln!(f, "Description:\n{}\n", resp.description)?;
        writeln!(f, "Causes:\n{}\n", resp.causes)?;
        writeln!(f, "Treatment Recommendations:")?;
        for step in resp.treatment.iter() {
            writeln!(f, "• {step}")?;
        }
        writeln!(f, "\nPrevention:\n{}\n", resp.prevention)?;
        writeln!(f, "{DIVIDER}")?;
        writeln!(f, "ALL PREDICTIONS (Ranked):")?;
        writeln!(f, "{DIVIDER}")?;
        write!(f, "{}", Ranking(&resp.all_predictions.0))?;
        writeln!(
            f,
            "\nModel {} ({} accuracy)",
            resp.model_version, resp.model_accuracy
        )
    }
}

/// Render a full prediction report.
pub fn render_prediction(resp: &PredictResponse) -> String {
    Report(resp).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RankedPredictions, Severity};

    #[test]
    fn test_score_bar_widths() {
        assert_eq!(score_bar(0.0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(score_bar(4.99).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(score_bar(52.0).chars().filter(|c| *c == '█').count(), 10);
        assert_eq!(score_bar(100.0), "█".repeat(BAR_CELLS));
        for pct in [0.0, 12.5, 99.9, 100.0] {
            assert_eq!(score_bar(pct).chars().count(), BAR_CELLS);
        }
    }

    #[test]
    fn test_render_prediction_lists_everything() {
        let resp = PredictResponse {
            success: true,
            predicted_disease: "Powdery Mildew".into(),
            confidence: 97.31,
            icon: "⚪".into(),
            severity: Severity::Medium,
            kind: "Fungal Disease".into(),
            description: "White powdery coating".into(),
            causes: "Fungal infection".into(),
            treatment: vec!["Apply sulfur spray".into(), "Improve air circulation".into()],
            prevention: "Proper spacing".into(),
            all_predictions: RankedPredictions(vec![
                ClassScore {
                    name: "Powdery Mildew".into(),
                    percent: 97.31,
                },
                ClassScore {
                    name: "Healthy".into(),
                    percent: 2.69,
                },
            ]),
            model_version: "v7".into(),
            model_accuracy: "99.87%".into(),
        };

        let text = render_prediction(&resp);
        assert!(text.contains("Disease:    Powdery Mildew"));
        assert!(text.contains("Confidence: 97.3%"));
        assert!(text.contains("Severity:   🟠 MEDIUM"));
        assert!(text.contains("• Apply sulfur spray\n• Improve air circulation\n"));

        let top = text
            .find(&format!("{:20} {:5.1}%", "Powdery Mildew", 97.31))
            .unwrap();
        let second = text
            .find(&format!("{:20} {:5.1}%", "Healthy", 2.69))
            .unwrap();
        assert!(top < second);
    }

    #[test]
    fn test_ranking_lines() {
        let scores = [
            ClassScore {
                name: "Die Back".into(),
                percent: 60.0,
            },
            ClassScore {
                name: "Healthy".into(),
                percent: 40.0,
            },
        ];
        let text = Ranking(&scores).to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&format!("{:20}  60.0%", "Die Back")));
        assert!(lines[1].ends_with(&score_bar(40.0)));
    }
}
