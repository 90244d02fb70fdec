//! Canvas2D surface for the browser
//!
//! Images are looked up by id and created lazily from the asset root. An
//! image that has not finished loading is simply skipped for that frame.

use std::collections::HashMap;

use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use super::{DrawCommand, Surface};

pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
    images: HashMap<String, HtmlImageElement>,
    asset_root: String,
}

impl CanvasSurface {
    pub fn new(canvas: &HtmlCanvasElement, asset_root: impl Into<String>) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            ctx,
            images: HashMap::new(),
            asset_root: asset_root.into(),
        })
    }

    /// Start loading images ahead of their first draw
    pub fn preload<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.image(id);
        }
    }

    fn image(&mut self, id: &str) -> Option<&HtmlImageElement> {
        if !self.images.contains_key(id) {
            let img = HtmlImageElement::new().ok()?;
            img.set_src(&self.asset_url(id));
            self.images.insert(id.to_string(), img);
        }
        self.images.get(id)
    }

    fn asset_url(&self, id: &str) -> String {
        if id.contains('.') {
            format!("{}/{}", self.asset_root, id)
        } else {
            format!("{}/{}.png", self.asset_root, id)
        }
    }
}

impl Surface for CanvasSurface {
    fn draw(&mut self, cmd: DrawCommand) {
        match cmd {
            DrawCommand::Clear { size } => {
                self.ctx.clear_rect(0.0, 0.0, size.x as f64, size.y as f64);
            }
            DrawCommand::Image { id, pos, size, alpha } => {
                if alpha <= 0.0 {
                    return;
                }
                let ctx = self.ctx.clone();
                let Some(img) = self.image(&id) else {
                    return;
                };
                if !img.complete() || img.natural_width() == 0 {
                    return;
                }
                ctx.set_global_alpha(alpha.clamp(0.0, 1.0) as f64);
                let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    img,
                    pos.x as f64,
                    pos.y as f64,
                    size.x as f64,
                    size.y as f64,
                );
                ctx.set_global_alpha(1.0);
            }
            DrawCommand::Circle { center, radius, color } => {
                self.ctx.set_fill_style_str(&color);
                self.ctx.begin_path();
                let _ = self.ctx.arc(
                    center.x as f64,
                    center.y as f64,
                    radius as f64,
                    0.0,
                    std::f64::consts::TAU,
                );
                self.ctx.fill();
            }
            DrawCommand::Polygon { points, color } => {
                let Some((first, rest)) = points.split_first() else {
                    return;
                };
                self.ctx.set_fill_style_str(&color);
                self.ctx.begin_path();
                self.ctx.move_to(first.x as f64, first.y as f64);
                for p in rest {
                    self.ctx.line_to(p.x as f64, p.y as f64);
                }
                self.ctx.close_path();
                self.ctx.fill();
            }
        }
    }
}
