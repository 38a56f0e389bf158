/*
 *  render/svg.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Vector backend: the same frame as SVG markup
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fmt::{self, Write};

use crate::color::Rgba;
use crate::render::canvas::{Canvas, TextLabel};

/// Collects primitives as SVG elements. `crispEdges` keeps rectangles on
/// pixel boundaries so a rasterized copy matches the raster backend.
#[derive(Debug)]
pub struct SvgCanvas {
    width: u32,
    height: u32,
    stroke: u32,
    body: String,
    failed: Option<fmt::Error>,
}

impl SvgCanvas {
    pub fn new(width: u32, height: u32, bar_width: u32) -> Self {
        Self {
            width,
            height,
            stroke: (bar_width / 15).max(1),
            body: String::new(),
            failed: None,
        }
    }

    /// Outline width used on text
    pub fn text_stroke(&self) -> u32 {
        self.stroke
    }

    /// Wrap the collected elements into a document
    pub fn finish(self) -> Result<String, fmt::Error> {
        if let Some(e) = self.failed {
            return Err(e);
        }
        let mut doc = String::with_capacity(self.body.len() + 256);
        writeln!(
            doc,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" shape-rendering="crispEdges">"#,
            w = self.width,
            h = self.height
        )?;
        doc.push_str(&self.body);
        doc.push_str("</svg>\n");
        Ok(doc)
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        if self.failed.is_some() {
            return;
        }
        if let Err(e) = self.body.write_fmt(args) {
            self.failed = Some(e);
        }
    }
}

fn opacity(color: Rgba) -> String {
    if color.a == 0xFF {
        String::new()
    } else {
        format!(r#" fill-opacity="{:.3}""#, color.a as f32 / 255.0)
    }
}

/// Minimal XML escaping for text content
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

impl Canvas for SvgCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.body.clear();
        self.failed = None;
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba) {
        if width == 0 || height == 0 {
            return;
        }
        self.emit(format_args!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"{}\"{}/>\n",
            color.svg_hex(),
            opacity(color)
        ));
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgba) {
        // a one pixel line covers whole pixels, so draw it as a thin rect
        let (x0, x1) = (from.0.min(to.0), from.0.max(to.0));
        let (y0, y1) = (from.1.min(to.1), from.1.max(to.1));
        if x0 != x1 && y0 != y1 {
            self.emit(format_args!(
                "<line x1=\"{}.5\" y1=\"{}.5\" x2=\"{}.5\" y2=\"{}.5\" stroke=\"{}\" stroke-width=\"1\"/>\n",
                from.0,
                from.1,
                to.0,
                to.1,
                color.svg_hex()
            ));
            return;
        }
        self.fill_rect(x0, y0, (x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32, color);
    }

    fn text(&mut self, label: &TextLabel) {
        let stroke = self.stroke;
        self.emit(format_args!(
            "<text x=\"{}\" y=\"{}\" font-family=\"sans-serif\" font-size=\"{}\" dominant-baseline=\"hanging\" \
             fill=\"#ffffff\" stroke=\"#000000\" stroke-width=\"{stroke}\" paint-order=\"stroke\">{}</text>\n",
            label.x,
            label.y,
            label.font_size,
            escape_xml(&label.text)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;
    use crate::render::canvas::LabelKind;

    #[test]
    fn test_document_shape() {
        let mut c = SvgCanvas::new(40, 20, 30);
        c.fill_rect(1, 2, 3, 4, color::BRIGHT_GREEN);
        let doc = c.finish().unwrap();
        assert!(doc.starts_with("<svg "));
        assert!(doc.contains(r#"width="40" height="20""#));
        assert!(doc.contains("crispEdges"));
        assert!(doc.contains(r##"<rect x="1" y="2" width="3" height="4" fill="#00ff00"/>"##));
        assert!(doc.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_horizontal_line_becomes_rect() {
        let mut c = SvgCanvas::new(10, 10, 30);
        c.draw_line((6, 3), (4, 3), color::WHITE);
        let doc = c.finish().unwrap();
        assert!(doc.contains(r##"<rect x="4" y="3" width="3" height="1" fill="#ffffff"/>"##));
    }

    #[test]
    fn test_text_is_escaped_and_stroked() {
        let mut c = SvgCanvas::new(10, 10, 60);
        assert_eq!(c.text_stroke(), 4);
        c.text(&TextLabel { kind: LabelKind::Stream, text: "a<b & \"c\"".into(), x: 3, y: 4, font_size: 30 });
        let doc = c.finish().unwrap();
        assert!(doc.contains("a&lt;b &amp; &quot;c&quot;"));
        assert!(doc.contains(r#"stroke-width="4""#));
        assert!(doc.contains(r#"font-size="30""#));
    }

    #[test]
    fn test_stroke_minimum() {
        assert_eq!(SvgCanvas::new(1, 1, 3).text_stroke(), 1);
    }

    #[test]
    fn test_translucent_fill() {
        let mut c = SvgCanvas::new(4, 4, 30);
        c.fill_rect(0, 0, 1, 1, Rgba::new(255, 0, 0, 0));
        assert!(c.finish().unwrap().contains(r#"fill-opacity="0.000""#));
    }
}
