use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::buffer::HistoricalData;
use crate::error::OximeterError;

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub red: RGBColor,
    pub ir: RGBColor,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            red: RED,
            ir: BLUE,
        }
    }
}

/// Render the buffered red and ir series as a PNG.
///
/// Each series is drawn around its own mean so both pulsatile components
/// share one axis even though their baselines differ. No text is drawn.
pub fn render_history_png(
    history: &HistoricalData,
    style: PlotStyle,
) -> Result<Vec<u8>, OximeterError> {
    if history.is_empty() {
        return Err(OximeterError::Plot("history has no samples".into()));
    }
    let red = centered(&history.red);
    let ir = centered(&history.ir);
    let (y_min, y_max) = red
        .iter()
        .chain(&ir)
        .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let y_bounds = if (y_max - y_min).abs() < f64::EPSILON {
        (-1.0, 1.0)
    } else {
        (y_min, y_max)
    };
    let duration = history.duration_seconds();
    let x_max = if duration > 0.0 { duration } else { 1.0 };

    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(0f64..x_max, y_bounds.0..y_bounds.1)?;
        for (series, color) in [(&red, style.red), (&ir, style.ir)] {
            let points = history.times.iter().copied().zip(series.iter().copied());
            chart.draw_series(LineSeries::new(points, &color))?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn centered(series: &[f64]) -> Vec<f64> {
    let mean = series.iter().sum::<f64>() / series.len().max(1) as f64;
    series.iter().map(|v| v - mean).collect()
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, OximeterError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| OximeterError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    image.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_png() {
        let history = HistoricalData {
            red: (0..60).map(|i| 150.0 + (i as f64 * 0.3).sin()).collect(),
            ir: (0..60).map(|i| 90.0 + 0.5 * (i as f64 * 0.3).sin()).collect(),
            times: (0..60).map(|i| i as f64 / 30.0).collect(),
        };
        let style = PlotStyle {
            width: 200,
            height: 100,
            ..Default::default()
        };
        let png = render_history_png(&history, style).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn flat_and_single_sample_histories_render() {
        let history = HistoricalData {
            red: vec![100.0],
            ir: vec![80.0],
            times: vec![0.0],
        };
        assert!(render_history_png(&history, PlotStyle::default()).is_ok());
    }

    #[test]
    fn empty_history_is_an_error() {
        let result = render_history_png(&HistoricalData::default(), PlotStyle::default());
        assert!(matches!(result, Err(OximeterError::Plot(_))));
    }
}
