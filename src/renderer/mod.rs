pub mod gpu;
pub mod mesh;
pub mod overlay;
pub mod postprocessing;
pub mod render_target;
pub mod resources;
pub mod samplers;
pub mod scene_pass;
