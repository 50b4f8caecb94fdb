//! Bitmap rendering of an exported graph.
//!
//! Rendering is best effort: an empty graph or a broken backend (no fonts,
//! unwritable temp dir) yields no image, never an error to the caller.

use anyhow::{Context, Result};
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::view::GraphView;

const NODE_COLOR: RGBColor = RGBColor(100, 149, 237);
const EDGE_COLOR: RGBColor = RGBColor(160, 160, 160);
const MARGIN: i32 = 60;

/// Turns a graph view into encoded image bytes.
pub trait GraphRenderer: Send + Sync {
    fn render(&self, view: &GraphView) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub iterations: usize,
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
            iterations: 100,
            seed: 42,
        }
    }
}

/// Image payload; the bytes serialize as a base64 string or `null`.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageExport {
    #[serde_as(as = "Option<Base64>")]
    pub graph_image: Option<Vec<u8>>,
}

/// Render `view`, degrading every failure to "no image".
pub fn render_image(view: &GraphView, renderer: &dyn GraphRenderer) -> ImageExport {
    if view.is_empty() {
        debug!("Graph is empty, skipping render");
        return ImageExport::default();
    }

    let attempt = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(view)));
    let graph_image = match attempt {
        Ok(Ok(bytes)) => Some(bytes),
        Ok(Err(e)) => {
            warn!(error = %e, "Graph renderer unavailable");
            None
        }
        Err(_) => {
            warn!("Graph renderer panicked");
            None
        }
    };

    ImageExport { graph_image }
}

/// Force-directed layout drawn with plotters into a PNG.
pub struct PlottersRenderer {
    config: RenderConfig,
}

impl PlottersRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    fn draw(&self, view: &GraphView, path: &std::path::Path) -> Result<()> {
        let (width, height) = (self.config.width, self.config.height);
        let positions = spring_layout(view, self.config.iterations, self.config.seed);

        let to_pixel = |(x, y): (f64, f64)| -> (i32, i32) {
            let w = (width as i32 - 2 * MARGIN).max(1) as f64;
            let h = (height as i32 - 2 * MARGIN).max(1) as f64;
            (MARGIN + (x * w) as i32, MARGIN + (y * h) as i32)
        };

        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let index: HashMap<&str, usize> = view
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let edge_font = ("sans-serif", 11).into_font().color(&EDGE_COLOR);
        for edge in &view.edges {
            let (Some(&s), Some(&t)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str()))
            else {
                continue;
            };
            let (a, b) = (to_pixel(positions[s]), to_pixel(positions[t]));
            root.draw(&PathElement::new(vec![a, b], ShapeStyle::from(&EDGE_COLOR).stroke_width(1)))?;

            let mid = ((a.0 + b.0) / 2, (a.1 + b.1) / 2);
            root.draw(&Text::new(edge.label.clone(), mid, edge_font.clone()))?;
        }

        let node_font = ("sans-serif", 14).into_font().color(&BLACK);
        for (node, &position) in view.nodes.iter().zip(&positions) {
            let center = to_pixel(position);
            let radius = node_radius(node.size);
            root.draw(&Circle::new(center, radius, NODE_COLOR.mix(0.85).filled()))?;
            root.draw(&Text::new(
                node.label.clone(),
                (center.0 + radius + 2, center.1 - 7),
                node_font.clone(),
            ))?;
        }

        root.present()?;
        Ok(())
    }
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl GraphRenderer for PlottersRenderer {
    fn render(&self, view: &GraphView) -> Result<Vec<u8>> {
        let file = tempfile::Builder::new()
            .prefix("knowledge-graph-")
            .suffix(".png")
            .tempfile()
            .context("Failed to create temporary image file")?;

        self.draw(view, file.path())?;

        let bytes = std::fs::read(file.path()).context("Failed to read rendered image")?;
        debug!(bytes = bytes.len(), nodes = view.node_count, "Rendered graph image");
        Ok(bytes)
    }
}

fn node_radius(size: f64) -> i32 {
    (size.max(0.0).sqrt() * 2.0).clamp(4.0, 30.0) as i32
}

/// Fruchterman-Reingold layout, normalised into the unit square. The same
/// seed always gives the same positions.
pub fn spring_layout(view: &GraphView, iterations: usize, seed: u64) -> Vec<(f64, f64)> {
    let n = view.nodes.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![(0.5, 0.5)];
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut pos: Vec<(f64, f64)> = (0..n).map(|_| (rng.r#gen(), rng.r#gen())).collect();

    let index: HashMap<&str, usize> = view
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();
    let links: Vec<(usize, usize)> = view
        .edges
        .iter()
        .filter_map(|e| Some((*index.get(e.source.as_str())?, *index.get(e.target.as_str())?)))
        .collect();

    let k = (1.0 / n as f64).sqrt();
    let mut temperature = 0.1;
    let cooling = temperature / (iterations as f64 + 1.0);

    for _ in 0..iterations {
        let mut disp = vec![(0.0f64, 0.0f64); n];

        for i in 0..n {
            for j in (i + 1)..n {
                let (dx, dy) = (pos[i].0 - pos[j].0, pos[i].1 - pos[j].1);
                let dist = (dx * dx + dy * dy).sqrt().max(0.01);
                let force = k * k / dist;
                let (fx, fy) = (dx / dist * force, dy / dist * force);
                disp[i].0 += fx;
                disp[i].1 += fy;
                disp[j].0 -= fx;
                disp[j].1 -= fy;
            }
        }

        for &(s, t) in &links {
            let (dx, dy) = (pos[s].0 - pos[t].0, pos[s].1 - pos[t].1);
            let dist = (dx * dx + dy * dy).sqrt().max(0.01);
            let force = dist * dist / k;
            let (fx, fy) = (dx / dist * force, dy / dist * force);
            disp[s].0 -= fx;
            disp[s].1 -= fy;
            disp[t].0 += fx;
            disp[t].1 += fy;
        }

        for (p, d) in pos.iter_mut().zip(&disp) {
            let len = (d.0 * d.0 + d.1 * d.1).sqrt();
            if len > 0.0 {
                let step = len.min(temperature);
                p.0 += d.0 / len * step;
                p.1 += d.1 / len * step;
            }
        }

        temperature -= cooling;
    }

    normalize(&mut pos);
    pos
}

fn normalize(pos: &mut [(f64, f64)]) {
    let (min_x, max_x) = bounds(pos.iter().map(|p| p.0));
    let (min_y, max_y) = bounds(pos.iter().map(|p| p.1));

    for p in pos.iter_mut() {
        p.0 = scale(p.0, min_x, max_x);
        p.1 = scale(p.1, min_y, max_y);
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn scale(v: f64, lo: f64, hi: f64) -> f64 {
    if hi - lo < f64::EPSILON {
        0.5
    } else {
        (v - lo) / (hi - lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{EdgeView, NodeView};

    fn triangle() -> GraphView {
        let nodes: Vec<NodeView> = ["A", "B", "C"]
            .iter()
            .map(|l| NodeView {
                id: l.to_string(),
                label: l.to_string(),
                size: 20.0,
            })
            .collect();
        let edges = vec![
            EdgeView {
                source: "A".into(),
                target: "B".into(),
                label: "r".into(),
            },
            EdgeView {
                source: "B".into(),
                target: "C".into(),
                label: "r".into(),
            },
        ];
        GraphView {
            node_count: nodes.len(),
            edge_count: edges.len(),
            nodes,
            edges,
        }
    }

    struct BrokenRenderer;

    impl GraphRenderer for BrokenRenderer {
        fn render(&self, _view: &GraphView) -> Result<Vec<u8>> {
            anyhow::bail!("no font backend")
        }
    }

    struct PanickingRenderer;

    impl GraphRenderer for PanickingRenderer {
        fn render(&self, _view: &GraphView) -> Result<Vec<u8>> {
            panic!("backend crashed")
        }
    }

    #[test]
    fn test_layout_is_deterministic_and_bounded() {
        let view = triangle();
        let first = spring_layout(&view, 50, 7);
        let second = spring_layout(&view, 50, 7);

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        for (x, y) in first {
            assert!((0.0..=1.0).contains(&x));
            assert!((0.0..=1.0).contains(&y));
        }
    }

    #[test]
    fn test_empty_graph_has_no_image() {
        let export = render_image(&GraphView::empty(), &PanickingRenderer);
        assert_eq!(export.graph_image, None);
        assert_eq!(serde_json::to_string(&export).unwrap(), r#"{"graph_image":null}"#);
    }

    #[test]
    fn test_renderer_failure_degrades_to_none() {
        assert_eq!(render_image(&triangle(), &BrokenRenderer).graph_image, None);
        assert_eq!(render_image(&triangle(), &PanickingRenderer).graph_image, None);
    }

    #[test]
    fn test_image_serializes_as_base64() {
        let export = ImageExport {
            graph_image: Some(b"png".to_vec()),
        };
        assert_eq!(serde_json::to_string(&export).unwrap(), r#"{"graph_image":"cG5n"}"#);
    }

    #[test]
    fn test_plotters_renderer_produces_png_or_nothing() {
        let renderer = PlottersRenderer::new(RenderConfig {
            width: 320,
            height: 240,
            iterations: 20,
            seed: 1,
        });

        // Hosts without system fonts cannot draw labels; that must not panic.
        if let Some(bytes) = render_image(&triangle(), &renderer).graph_image {
            assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        }
    }
}
