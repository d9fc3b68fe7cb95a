//! SVG waterfall plots for additive attributions.
//!
//! The chart starts at the base value and stacks one bar per feature, largest
//! magnitude at the top, ending at the model output. Features beyond
//! `max_rows` are folded into a single "other features" bar. Output depends
//! only on the attribution, so identical inputs render identical bytes.

use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::domain::{Attribution, FeatureScore};
use crate::ports::{ExplanationRenderer, RenderError};

const WIDTH: u32 = 820;
const ROW_HEIGHT: u32 = 34;
const HEADER: u32 = 56;
const FOOTER: u32 = 44;
const LABEL_WIDTH: i32 = 260;
const RIGHT_MARGIN: i32 = 90;

const POSITIVE: RGBColor = RGBColor(255, 13, 87);
const NEGATIVE: RGBColor = RGBColor(30, 136, 229);
const AXIS: RGBColor = RGBColor(120, 120, 120);

/// Renders [`Attribution`]s as SVG waterfall charts.
#[derive(Debug, Clone)]
pub struct SvgWaterfallRenderer {
    max_rows: usize,
}

impl Default for SvgWaterfallRenderer {
    fn default() -> Self {
        Self { max_rows: 10 }
    }
}

impl SvgWaterfallRenderer {
    /// Renderer that draws at most `max_rows` bars (at least 1).
    #[must_use]
    pub fn new(max_rows: usize) -> Self {
        Self {
            max_rows: max_rows.max(1),
        }
    }
}

struct Bar {
    label: String,
    start: f64,
    delta: f64,
}

/// Bars in drawing order (top first). Cumulative values run from the bottom
/// bar, which starts at `base`.
fn layout(base: f64, ranking: &[FeatureScore], max_rows: usize) -> Vec<Bar> {
    let mut rows: Vec<(String, f64)> = Vec::new();
    if ranking.len() > max_rows {
        let shown = max_rows.saturating_sub(1);
        rows.extend(
            ranking[..shown]
                .iter()
                .map(|s| (s.feature.clone(), s.score)),
        );
        let rest = &ranking[shown..];
        rows.push((
            format!("{} other features", rest.len()),
            rest.iter().map(|s| s.score).sum(),
        ));
    } else {
        rows.extend(ranking.iter().map(|s| (s.feature.clone(), s.score)));
    }

    let mut cumulative = base;
    let mut bars: Vec<Bar> = rows
        .into_iter()
        .rev()
        .map(|(label, delta)| {
            let bar = Bar {
                label,
                start: cumulative,
                delta,
            };
            cumulative += delta;
            bar
        })
        .collect();
    bars.reverse();
    bars
}

fn drawing_error<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> RenderError {
    RenderError::Drawing(e.to_string())
}

impl ExplanationRenderer for SvgWaterfallRenderer {
    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }

    fn render_waterfall(&self, attribution: &Attribution) -> Result<Vec<u8>, RenderError> {
        let base = attribution.base_value.ok_or(RenderError::MissingBaseValue)?;
        let bars = layout(base, &attribution.ranking, self.max_rows);
        let output = base + attribution.total();

        let (lo, hi) = bars
            .iter()
            .flat_map(|b| [b.start, b.start + b.delta])
            .chain([base, output])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let pad = ((hi - lo) * 0.08).max(1e-6);
        let (lo, hi) = (lo - pad, hi + pad);

        let plot_left = LABEL_WIDTH;
        let plot_right = WIDTH as i32 - RIGHT_MARGIN;
        let x_of = |v: f64| -> i32 {
            let t = (v - lo) / (hi - lo);
            plot_left + (t * f64::from(plot_right - plot_left)).round() as i32
        };

        let height = HEADER + ROW_HEIGHT * bars.len() as u32 + FOOTER;
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (WIDTH, height)).into_drawing_area();
            root.fill(&WHITE).map_err(drawing_error)?;

            let title = ("sans-serif", 16).into_font().color(&BLACK);
            let label = ("sans-serif", 13).into_font().color(&BLACK);
            let small = ("sans-serif", 12).into_font().color(&AXIS);

            root.draw(&Text::new(
                format!("f(x) = {output:.3}    E[f(x)] = {base:.3}    ({})", attribution.strategy),
                (16, 18),
                title,
            ))
            .map_err(drawing_error)?;

            let axis_y = (HEADER + ROW_HEIGHT * bars.len() as u32) as i32 + 6;
            root.draw(&PathElement::new(
                vec![(plot_left, axis_y), (plot_right, axis_y)],
                AXIS,
            ))
            .map_err(drawing_error)?;

            for (marker, value) in [("E[f(x)]", base), ("f(x)", output)] {
                let x = x_of(value);
                root.draw(&PathElement::new(
                    vec![(x, HEADER as i32 - 6), (x, axis_y)],
                    AXIS.mix(0.6),
                ))
                .map_err(drawing_error)?;
                root.draw(&Text::new(
                    format!("{marker} = {value:.3}"),
                    (x - 30, axis_y + 10),
                    small.clone(),
                ))
                .map_err(drawing_error)?;
            }

            for (row, bar) in bars.iter().enumerate() {
                let top = (HEADER + ROW_HEIGHT * row as u32) as i32 + 6;
                let bottom = top + ROW_HEIGHT as i32 - 12;
                let (x0, x1) = (x_of(bar.start), x_of(bar.start + bar.delta));
                let color = if bar.delta >= 0.0 { POSITIVE } else { NEGATIVE };

                root.draw(&Rectangle::new(
                    [(x0.min(x1), top), (x0.max(x1).max(x0.min(x1) + 1), bottom)],
                    color.filled(),
                ))
                .map_err(drawing_error)?;
                root.draw(&Text::new(bar.label.clone(), (12, top + 4), label.clone()))
                    .map_err(drawing_error)?;
                root.draw(&Text::new(
                    format!("{:+.3}", bar.delta),
                    (x0.max(x1) + 6, top + 4),
                    small.clone(),
                ))
                .map_err(drawing_error)?;
            }

            root.present().map_err(drawing_error)?;
        }
        Ok(svg.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttributionStrategy;

    fn attribution(base: Option<f64>, scores: &[(&str, f64)]) -> Attribution {
        let scores: Vec<FeatureScore> = scores
            .iter()
            .map(|(n, s)| FeatureScore::new(*n, *s))
            .collect();
        let mut ranking = scores.clone();
        ranking.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));
        Attribution {
            strategy: AttributionStrategy::TreeShap,
            scores,
            ranking,
            base_value: base,
        }
    }

    #[test]
    fn test_renders_deterministic_svg() {
        let a = attribution(
            Some(-0.4),
            &[("BMI", 0.9), ("Cycle(R/I)", -0.35), ("Hair loss(Y/N)", 0.12)],
        );
        let renderer = SvgWaterfallRenderer::default();
        let first = renderer.render_waterfall(&a).expect("render");
        let second = renderer.render_waterfall(&a).expect("render");
        assert_eq!(first, second);

        let svg = String::from_utf8(first).expect("utf8");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("BMI"));
        assert!(svg.contains("+0.900"));
        assert!(svg.contains("-0.350"));
    }

    #[test]
    fn test_requires_base_value() {
        let a = attribution(None, &[("BMI", 0.9)]);
        let err = SvgWaterfallRenderer::default()
            .render_waterfall(&a)
            .expect_err("must fail");
        assert!(matches!(err, RenderError::MissingBaseValue));
    }

    #[test]
    fn test_layout_folds_tail_and_ends_at_output() {
        let a = attribution(
            Some(1.0),
            &[("a", 0.5), ("b", -0.4), ("c", 0.3), ("d", -0.2), ("e", 0.1)],
        );
        let bars = layout(1.0, &a.ranking, 3);
        let labels: Vec<_> = bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["a", "b", "3 other features"]);

        // Bottom bar starts at the base value; top bar ends at the output.
        let bottom = bars.last().expect("bars");
        assert!((bottom.start - 1.0).abs() < 1e-12);
        assert!((bottom.delta - 0.2).abs() < 1e-12);
        let top = &bars[0];
        assert!((top.start + top.delta - (1.0 + a.total())).abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_contributions_render() {
        let a = attribution(Some(0.0), &[("a", 0.0), ("b", 0.0)]);
        assert!(SvgWaterfallRenderer::new(0).render_waterfall(&a).is_ok());
    }
}
