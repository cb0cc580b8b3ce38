//! WGSL sources for the update and render programs.
//!
//! Sources are referenced by stable logical names so diagnostics point at the
//! right file whether the text is built in or supplied by the host.

/// Update (capture) stage.
pub const UPDATE: &str = "particle-update.wgsl";
/// Render vertex stage.
pub const RENDER_VERT: &str = "particle-render-vert.wgsl";
/// Render fragment stage.
pub const RENDER_FRAG: &str = "particle-render-frag.wgsl";

/// Captured outputs of the update stage, in record order.
pub const CAPTURED_OUTPUTS: [&str; 2] = ["v_Position", "v_Velocity"];

/// Source text for every stage the simulation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub update: String,
    pub render_vertex: String,
    pub render_fragment: String,
}

impl ShaderSources {
    /// Sources compiled into the crate.
    pub fn builtin() -> Self {
        Self {
            update: include_str!("shaders/particle-update.wgsl").to_string(),
            render_vertex: include_str!("shaders/particle-render-vert.wgsl").to_string(),
            render_fragment: include_str!("shaders/particle-render-frag.wgsl").to_string(),
        }
    }

    /// Replaces the source registered under `name`.
    ///
    /// Returns `false` when `name` is not one of the logical stage names.
    pub fn set(&mut self, name: &str, source: String) -> bool {
        let slot = match name {
            UPDATE => &mut self.update,
            RENDER_VERT => &mut self.render_vertex,
            RENDER_FRAG => &mut self.render_fragment,
            _ => return false,
        };
        *slot = source;
        true
    }
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self::builtin()
    }
}
