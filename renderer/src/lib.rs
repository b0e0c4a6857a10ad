pub mod asset;
pub mod components;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod markup;
pub mod tree;
pub mod walker;
pub mod zoom;

pub use components::{Capability, Component, ComponentOverride, ComponentProps};
pub use config::{Configuration, RenderOptions};
pub use context::{ContextHandle, ContextProvider};
pub use error::{BuildMode, Diagnostics, RenderWarning};
pub use markup::{Element, Markup};
pub use tree::{RenderTree, RenderedTree};
pub use walker::{BlockRenderOptions, MAX_DEPTH, RenderNode, RenderPass, render, walk};
