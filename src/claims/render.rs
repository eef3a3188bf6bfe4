use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, Line, Mm, PdfDocument, PdfLayerReference, Point,
    Polygon, Rgb,
};

use super::layout::{ClaimLayout, Element, PAGE_HEIGHT, PAGE_WIDTH};
use crate::design::FontName;

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

fn color([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn builtin(font: FontName) -> BuiltinFont {
    match font {
        FontName::HelveticaBold => BuiltinFont::HelveticaBold,
        FontName::TimesRoman => BuiltinFont::TimesRoman,
        FontName::Courier => BuiltinFont::Courier,
    }
}

fn point(x: f32, y: f32) -> (Point, bool) {
    (Point::new(mm(x), mm(y)), false)
}

/// Write a laid-out claim as a single US-Letter page.
pub fn write_pdf(layout: &ClaimLayout, destination: &Path) -> Result<()> {
    let (doc, page, layer) =
        PdfDocument::new(&layout.title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "claim");
    let font = doc
        .add_builtin_font(builtin(layout.font))
        .map_err(|e| anyhow!("Failed to load font {:?}: {:?}", layout.font, e))?;
    let canvas = doc.get_page(page).get_layer(layer);

    for element in &layout.elements {
        match element {
            Element::Text {
                x,
                y,
                size,
                color: c,
                text,
            } => {
                canvas.set_fill_color(color(*c));
                canvas.use_text(text.as_str(), *size, mm(*x), mm(*y), &font);
            }
            Element::Line {
                from,
                to,
                color: c,
                width,
            } => {
                canvas.set_outline_color(color(*c));
                canvas.set_outline_thickness(*width);
                canvas.add_line(Line {
                    points: vec![point(from.0, from.1), point(to.0, to.1)],
                    is_closed: false,
                });
            }
            Element::Fill { x, y, w, h, color: c } => {
                canvas.set_fill_color(color(*c));
                canvas.add_polygon(Polygon {
                    rings: vec![vec![
                        point(*x, *y),
                        point(x + w, *y),
                        point(x + w, y + h),
                        point(*x, y + h),
                    ]],
                    mode: PaintMode::Fill,
                    winding_order: WindingOrder::NonZero,
                });
            }
            Element::Image { path, x, y, w, h } => {
                place_image(&canvas, path, *x, *y, *w, *h)?;
            }
        }
    }

    let file = File::create(destination)
        .with_context(|| format!("Failed to create {:?}", destination))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| anyhow!("Failed to write {:?}: {:?}", destination, e))?;
    Ok(())
}

/// Draw an image stretched to `w`×`h` points.
fn place_image(canvas: &PdfLayerReference, path: &Path, x: f32, y: f32, w: f32, h: f32) -> Result<()> {
    let decoded = image::open(path).with_context(|| format!("Failed to read image {:?}", path))?;
    let (px_w, px_h) = (decoded.width() as f32, decoded.height() as f32);

    // at 72 dpi one pixel is one point
    Image::from_dynamic_image(&decoded).add_to_layer(
        canvas.clone(),
        ImageTransform {
            translate_x: Some(mm(x)),
            translate_y: Some(mm(y)),
            scale_x: Some(w / px_w),
            scale_y: Some(h / px_h),
            dpi: Some(72.0),
            ..Default::default()
        },
    );
    Ok(())
}
