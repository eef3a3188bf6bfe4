//! Page layout of a claim, in PDF points with the origin at the bottom left.
//! Kept separate from PDF output so the content can be checked directly.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

use super::billing::{format_total, total_amount};
use super::patient::Patient;
use crate::data::{BillingLine, Clinic, Doctor};
use crate::design::{parse_hex_color, Design, FontName};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

const TABLE_X: f32 = 50.0;
const TABLE_BOTTOM: f32 = 400.0;
const TABLE_WIDTH: f32 = 480.0;
const COLUMN_SHARES: [f32; 5] = [0.15, 0.35, 0.10, 0.20, 0.20];
const HEADER_ROW_HEIGHT: f32 = 20.0;
const ROW_HEIGHT: f32 = 16.0;
const CELL_PADDING: f32 = 4.0;
const TABLE_FONT_SIZE: f32 = 8.0;
const TABLE_HEADERS: [&str; 5] = ["Item", "Description", "Quantity", "Unit Price (Rs)", "Total (Rs)"];

pub const BLACK: [u8; 3] = [0, 0, 0];
const WHITESMOKE: [u8; 3] = [245, 245, 245];

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: f32,
        y: f32,
        size: f32,
        color: [u8; 3],
        text: String,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: [u8; 3],
        width: f32,
    },
    /// Filled rectangle, lower-left corner at (x, y).
    Fill {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: [u8; 3],
    },
    Image {
        path: PathBuf,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

#[derive(Debug, Clone)]
pub struct ClaimLayout {
    pub title: String,
    pub font: FontName,
    pub elements: Vec<Element>,
}

impl ClaimLayout {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Everything that appears on one claim.
pub struct ClaimContent<'a> {
    pub clinic: &'a Clinic,
    pub doctor: &'a Doctor,
    pub diagnosis: &'a str,
    pub patient: &'a Patient,
    pub design: &'a Design,
    pub billing: &'a [BillingLine],
    pub date_of_service: NaiveDate,
    pub logo: Option<PathBuf>,
}

struct Pen {
    elements: Vec<Element>,
}

impl Pen {
    fn text(&mut self, x: f32, y: f32, size: f32, color: [u8; 3], text: impl Into<String>) {
        self.elements.push(Element::Text {
            x,
            y,
            size,
            color,
            text: text.into(),
        });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: [u8; 3], width: f32) {
        self.elements.push(Element::Line {
            from,
            to,
            color,
            width,
        });
    }

    fn fill(&mut self, x: f32, y: f32, w: f32, h: f32, color: [u8; 3]) {
        self.elements.push(Element::Fill { x, y, w, h, color });
    }
}

pub fn build_layout(content: &ClaimContent<'_>) -> Result<ClaimLayout> {
    let ClaimContent {
        clinic,
        doctor,
        diagnosis,
        patient,
        design,
        billing,
        ..
    } = content;
    let total = total_amount(billing)?;
    let primary = parse_hex_color(&design.primary_color).unwrap_or(BLACK);
    let secondary = parse_hex_color(&design.secondary_color).unwrap_or(WHITESMOKE);

    let mut pen = Pen { elements: Vec::new() };

    if let Some(path) = &content.logo {
        pen.elements.push(Element::Image {
            path: path.clone(),
            x: 50.0,
            y: 700.0,
            w: 100.0,
            h: 50.0,
        });
    }

    // clinic header
    pen.text(170.0, 730.0, 16.0, primary, clinic.name.as_str());
    pen.text(170.0, 710.0, 12.0, BLACK, clinic.address.as_str());
    pen.text(170.0, 690.0, 12.0, BLACK, format!("Phone: {}", clinic.telephone));
    pen.text(170.0, 670.0, 12.0, BLACK, format!("Email: {}", clinic.email));

    pen.text(50.0, 640.0, 14.0, primary, "Medical Bill Receipt");
    pen.line((50.0, 635.0), (550.0, 635.0), primary, 1.0);

    pen.text(50.0, 610.0, 12.0, primary, format!("Patient Name: {}", patient.name));
    pen.text(50.0, 590.0, 12.0, primary, format!("Patient ID: {}", patient.id));
    pen.text(
        50.0,
        570.0,
        12.0,
        primary,
        format!("Date of Service: {}", content.date_of_service.format("%Y-%m-%d")),
    );
    pen.text(
        50.0,
        540.0,
        12.0,
        primary,
        format!("Doctor: {} ({})", doctor.name, doctor.specialty),
    );
    pen.text(50.0, 520.0, 12.0, primary, format!("Diagnosis: {}", diagnosis));

    draw_table(&mut pen, billing, primary, secondary);

    pen.text(
        400.0,
        370.0,
        12.0,
        primary,
        format!("Total Amount: {}", format_total(total)),
    );

    pen.text(
        50.0,
        50.0,
        10.0,
        BLACK,
        format!("Thank you for choosing {}!", clinic.name),
    );
    pen.text(
        50.0,
        35.0,
        10.0,
        BLACK,
        format!(
            "For any queries, please contact us at {} or {}",
            clinic.telephone, clinic.email
        ),
    );

    Ok(ClaimLayout {
        title: format!("Medical Bill - {}", clinic.name),
        font: design.font,
        elements: pen.elements,
    })
}

/// The table grows upward from `TABLE_BOTTOM`: header band in the primary
/// colour, body rows on the secondary colour, then a full grid.
fn draw_table(pen: &mut Pen, billing: &[BillingLine], primary: [u8; 3], secondary: [u8; 3]) {
    let widths = COLUMN_SHARES.map(|share| TABLE_WIDTH * share);
    let body_height = ROW_HEIGHT * billing.len() as f32;
    let top = TABLE_BOTTOM + body_height + HEADER_ROW_HEIGHT;
    let header_bottom = top - HEADER_ROW_HEIGHT;

    pen.fill(TABLE_X, header_bottom, TABLE_WIDTH, HEADER_ROW_HEIGHT, primary);
    if !billing.is_empty() {
        pen.fill(TABLE_X, TABLE_BOTTOM, TABLE_WIDTH, body_height, secondary);
    }

    let mut x = TABLE_X;
    for (header, w) in TABLE_HEADERS.iter().zip(widths) {
        pen.text(x + CELL_PADDING, header_bottom + 8.0, TABLE_FONT_SIZE, WHITESMOKE, *header);
        x += w;
    }

    for (i, line) in billing.iter().enumerate() {
        let row_bottom = header_bottom - ROW_HEIGHT * (i as f32 + 1.0);
        let mut x = TABLE_X;
        for (cell, w) in line.cells().iter().zip(widths) {
            pen.text(x + CELL_PADDING, row_bottom + 5.0, TABLE_FONT_SIZE, BLACK, *cell);
            x += w;
        }
    }

    // horizontal rules: top, below header, below each row
    let right = TABLE_X + TABLE_WIDTH;
    pen.line((TABLE_X, top), (right, top), BLACK, 1.0);
    for i in 0..=billing.len() {
        let y = header_bottom - ROW_HEIGHT * i as f32;
        pen.line((TABLE_X, y), (right, y), BLACK, 1.0);
    }
    // vertical rules
    let mut x = TABLE_X;
    pen.line((x, TABLE_BOTTOM), (x, top), BLACK, 1.0);
    for w in widths {
        x += w;
        pen.line((x, TABLE_BOTTOM), (x, top), BLACK, 1.0);
    }
}
