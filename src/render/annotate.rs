use anyhow::Result;
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc;
use opencv::prelude::*;

use super::overlay::FrameOverlay;
use super::skeleton::Rgb;

/// RGB → OpenCV の BGR Scalar
fn bgr(color: Rgb) -> Scalar {
    Scalar::new(color[2] as f64, color[1] as f64, color[0] as f64, 0.0)
}

/// オーバーレイを BGR フレームに描き込む（線 → 点 → 文字 → バナーの順）
pub fn draw_overlay(frame: &mut Mat, overlay: &FrameOverlay) -> Result<()> {
    for segment in &overlay.segments {
        imgproc::line(
            frame,
            Point::new(segment.from.0, segment.from.1),
            Point::new(segment.to.0, segment.to.1),
            bgr(segment.color),
            segment.thickness,
            imgproc::LINE_8,
            0,
        )?;
    }

    for marker in &overlay.markers {
        imgproc::circle(
            frame,
            Point::new(marker.center.0, marker.center.1),
            marker.radius,
            bgr(marker.color),
            -1,
            imgproc::LINE_8,
            0,
        )?;
    }

    for line in &overlay.texts {
        imgproc::put_text(
            frame,
            &line.text,
            Point::new(line.origin.0, line.origin.1),
            imgproc::FONT_HERSHEY_SIMPLEX,
            line.scale,
            bgr(line.color),
            line.thickness,
            imgproc::LINE_8,
            false,
        )?;
    }

    if let Some(banner) = &overlay.banner {
        let size = imgproc::get_text_size(
            &banner.text,
            imgproc::FONT_HERSHEY_SIMPLEX,
            banner.scale,
            banner.thickness,
            &mut 0,
        )?;
        let x = (frame.cols() - size.width) / 2;
        let y = frame.rows() / 2;
        imgproc::put_text(
            frame,
            &banner.text,
            Point::new(x, y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            banner.scale,
            bgr(banner.color),
            banner.thickness,
            imgproc::LINE_8,
            false,
        )?;
    }

    Ok(())
}
