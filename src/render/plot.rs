use image::RgbImage;
use plotters::{
    prelude::*,
    style::{register_font, FontStyle},
};

use super::{Layout, RenderError, Result, DEJAVU_SANS};
use crate::ctffind::AvrotSeries;

const LEGENDS: [&str; 3] = ["Power spectrum", "CTF fit", "Quality of fit"];

type Point = (f64, f64);

fn plot_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Plot(e.to_string())
}

/// Clips the segment `[p0,p1]` to the box `[0,x_max]x[0,1]`
///
/// Returns the clipped end points and whether they are the original ones.
fn clip(p0: Point, p1: Point, x_max: f64) -> Option<(Point, Point, bool, bool)> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let (mut t0, mut t1) = (0f64, 1f64);
    for (p, q) in [
        (-dx, p0.0),
        (dx, x_max - p0.0),
        (-dy, p0.1),
        (dy, 1. - p0.1),
    ] {
        if p == 0. {
            if q < 0. {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0. {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }
    let at = |t: f64| (p0.0 + t * dx, p0.1 + t * dy);
    Some((at(t0), at(t1), t0 == 0., t1 == 1.))
}

/// Splits a polyline into the runs visible in the box `[0,x_max]x[0,1]`
///
/// Runs end where the line leaves the box, at the interpolated crossing point.
fn visible_runs(x: &[f64], y: &[f64], x_max: f64) -> Vec<Vec<Point>> {
    let points: Vec<Point> = x.iter().copied().zip(y.iter().copied()).collect();
    let mut runs: Vec<Vec<Point>> = Vec::new();
    let mut open = false;
    for w in points.windows(2) {
        match clip(w[0], w[1], x_max) {
            Some((a, b, start_inside, end_inside)) => {
                match runs.last_mut() {
                    Some(run) if open && start_inside => run.push(b),
                    _ => runs.push(vec![a, b]),
                }
                open = end_inside;
            }
            None => open = false,
        }
    }
    runs
}

/// Rotational average, CTF fit and fit quality versus spatial frequency
///
/// Samples outside of the `[0,max_spat_freq]x[0,1]` frame are cropped.
pub fn rotational_average_plot(avrot: &AvrotSeries, layout: &Layout) -> Result<RgbImage> {
    layout.check()?;
    if avrot.spatial_frequency.iter().any(|x| !x.is_finite()) {
        return Err(RenderError::NonFinite("spatial frequency"));
    }
    for (name, samples) in avrot.plotted() {
        if samples.iter().any(|x| !x.is_finite()) {
            return Err(RenderError::NonFinite(name));
        }
    }
    register_font("sans-serif", FontStyle::Normal, DEJAVU_SANS).map_err(|_| RenderError::Font)?;

    let (width, height) = layout.plot_size;
    let x_max = layout.max_spat_freq;
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let plot = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        plot.fill(&WHITE).map_err(plot_error)?;

        let mut chart = ChartBuilder::on(&plot)
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(0f64..x_max, 0f64..1f64)
            .map_err(plot_error)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Spatial frequency (1/Å)")
            .y_desc("Power or cross-correlation")
            .draw()
            .map_err(plot_error)?;

        let colors = [BLACK, CYAN, MAGENTA];
        for (((_, samples), legend), color) in avrot.plotted().zip(LEGENDS).zip(colors) {
            chart
                .draw_series(std::iter::empty::<PathElement<Point>>())
                .map_err(plot_error)?
                .label(legend)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            for run in visible_runs(&avrot.spatial_frequency, samples, x_max) {
                chart
                    .draw_series(LineSeries::new(run, &color))
                    .map_err(plot_error)?;
            }
        }
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .map_err(plot_error)?;
        plot.present().map_err(plot_error)?;
    }
    RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer)
}
