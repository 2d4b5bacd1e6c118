pub mod stage0_load;
pub mod stage1_align;
pub mod stage2_merge;
pub mod stage3_project;

pub use stage0_load::*;
pub use stage1_align::*;
pub use stage2_merge::*;
pub use stage3_project::*;
