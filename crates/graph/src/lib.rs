pub mod aggregator;
pub mod builder;
pub mod render;
pub mod view;

pub use aggregator::{GraphEdge, GraphNode, KnowledgeGraph};
pub use builder::{BuildConfig, BuildStats, GraphBuilder};
pub use render::{GraphRenderer, ImageExport, PlottersRenderer, RenderConfig, render_image};
pub use view::{DisplayConfig, EdgeView, GraphView, NodeView};
